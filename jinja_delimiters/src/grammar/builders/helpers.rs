//! Small parsing utilities shared by the builders

use crate::grammar::ast::NodeKind;
use crate::grammar::builders::atomic::Parser;
use crate::syntax::SyntaxError;
use crate::tokens::TokenKind;

pub fn at(parser: &dyn Parser, kind: TokenKind) -> bool {
    parser.current() == Some(kind)
}

pub fn at_any(parser: &dyn Parser, kinds: &[TokenKind]) -> bool {
    parser.current().is_some_and(|kind| kinds.contains(&kind))
}

/// Delimiters and line ends close the construct they belong to and are never
/// swallowed by an expression.
pub fn is_structural(kind: TokenKind) -> bool {
    kind.is_delimiter() || kind == TokenKind::Newline
}

/// Consume `closer` or record an unclosed group
pub fn expect_closer(parser: &mut dyn Parser, closer: TokenKind, message: &str) {
    if at(parser, closer) {
        parser.bump();
    } else {
        parser.error(SyntaxError::UnclosedGroup, message);
    }
}

/// Consume an identifier or record `message`
pub fn expect_name(parser: &mut dyn Parser, message: &str) -> bool {
    if at(parser, TokenKind::Identifier) {
        parser.bump();
        true
    } else {
        parser.error(SyntaxError::ExpectedName, message);
        false
    }
}

/// Consume `keyword` when present
pub fn eat(parser: &mut dyn Parser, keyword: TokenKind) -> bool {
    if at(parser, keyword) {
        parser.bump();
        true
    } else {
        false
    }
}

/// target ::= name ('.' name)* ; target_list ::= target (',' target)*
pub fn parse_target_list(parser: &mut dyn Parser, message: &str) {
    parser.start_node(NodeKind::TargetList);

    loop {
        if !expect_name(parser, message) {
            break;
        }
        while at(parser, TokenKind::Dot) {
            parser.bump();
            if !expect_name(parser, "Expected attribute name") {
                break;
            }
        }
        if !eat(parser, TokenKind::Comma) {
            break;
        }
    }

    parser.finish_node();
}

/// Move everything up to `terminator` (exclusive) into an error node
pub fn skip_until(parser: &mut dyn Parser, terminator: TokenKind) {
    if parser.current().is_none() || at(parser, terminator) {
        return;
    }

    parser.start_node(NodeKind::Error);
    while let Some(kind) = parser.current() {
        if kind == terminator {
            break;
        }
        parser.bump();
    }
    parser.finish_node();
}
