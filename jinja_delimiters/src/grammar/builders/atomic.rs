//! Parser seam and atomic expression builders
//!
//! Builders are free functions over `&mut dyn Parser`. They never fail:
//! problems are reported through [`Parser::error`] and the tree is completed
//! with whatever was found, using [`NodeKind::Error`] placeholders where an
//! expression was required.

use crate::grammar::ast::{Checkpoint, NodeKind};
use crate::grammar::builders::expressions::parse_expression;
use crate::grammar::builders::helpers::{at, expect_closer, is_structural};
use crate::syntax::SyntaxError;
use crate::tokens::{LexState, TokenKind};

/// Operations the builders need from a concrete parser
pub trait Parser {
    // === NAVIGATION ===
    // Whitespace tokens are invisible to lookahead and attached on the next
    // bump, so builders only see significant tokens.

    /// Kind of the `n`-th significant token ahead (0 = current)
    fn nth(&self, n: usize) -> Option<TokenKind>;

    fn current(&self) -> Option<TokenKind> {
        self.nth(0)
    }

    /// Lexer state the current token left behind
    fn next_state(&self) -> Option<LexState>;

    /// Start offset of the current significant token, or the input length
    fn offset(&self) -> usize;

    /// Attach pending whitespace and the current token to the open node
    fn bump(&mut self);

    /// Attach pending whitespace only
    fn eat_trivia(&mut self);

    // === TREE ===
    fn start_node(&mut self, kind: NodeKind);
    fn checkpoint(&mut self) -> Checkpoint;
    fn start_node_at(&mut self, checkpoint: Checkpoint, kind: NodeKind);
    fn finish_node(&mut self);

    // === DIAGNOSTICS ===
    fn error_at(&mut self, offset: usize, error: SyntaxError, message: &str);

    fn error(&mut self, error: SyntaxError, message: &str) {
        let offset = self.offset();
        self.error_at(offset, error, message);
    }

    // === NESTING ===

    /// Enter one nesting level; false (with a diagnostic) once the limit is hit
    fn enter(&mut self) -> bool;
    fn exit(&mut self);

    /// Track end keywords awaited by enclosing bodies
    fn open_body(&mut self, end: TokenKind);
    fn close_body(&mut self);
    fn awaits_end(&self, end: TokenKind) -> bool;
}

// === PRIMARY ===

/// atom ( '.' name | '[' expr ']' | '(' args ')' )*
pub fn parse_primary(parser: &mut dyn Parser) {
    let checkpoint = parser.checkpoint();
    if parse_atom(parser) {
        parse_postfix(parser, checkpoint);
    }
}

/// Returns false when only a placeholder was produced
fn parse_atom(parser: &mut dyn Parser) -> bool {
    match parser.current() {
        Some(TokenKind::Identifier) => single_token_node(parser, NodeKind::VariableReference),
        Some(TokenKind::String) => {
            // Adjacent string literals concatenate
            parser.start_node(NodeKind::StringLiteral);
            while at(parser, TokenKind::String) {
                parser.bump();
            }
            parser.finish_node();
        }
        Some(TokenKind::Integer) | Some(TokenKind::Float) => {
            single_token_node(parser, NodeKind::NumberLiteral)
        }
        Some(TokenKind::BooleanTrue) | Some(TokenKind::BooleanFalse) => {
            single_token_node(parser, NodeKind::BooleanLiteral)
        }
        Some(TokenKind::None) => single_token_node(parser, NodeKind::NoneLiteral),
        Some(TokenKind::LParen) => parse_parenthesized(parser),
        Some(TokenKind::LBracket) => parse_list(parser),
        Some(TokenKind::LBrace) => parse_dict(parser),
        _ => {
            parse_error_placeholder(parser);
            return false;
        }
    }
    true
}

fn single_token_node(parser: &mut dyn Parser, kind: NodeKind) {
    parser.start_node(kind);
    parser.bump();
    parser.finish_node();
}

/// Record "Expected expression" and produce an error node.
///
/// Structural tokens and end of input are left for the enclosing construct;
/// anything else is consumed so the caller always makes progress.
pub fn parse_error_placeholder(parser: &mut dyn Parser) {
    parser.error(SyntaxError::ExpectedExpression, "Expected expression");
    parser.start_node(NodeKind::Error);
    match parser.current() {
        Some(kind) if !is_structural(kind) => parser.bump(),
        _ => {}
    }
    parser.finish_node();
}

fn parse_postfix(parser: &mut dyn Parser, checkpoint: Checkpoint) {
    loop {
        match parser.current() {
            Some(TokenKind::Dot) => {
                parser.start_node_at(checkpoint, NodeKind::AttributeAccess);
                parser.bump();
                match parser.current() {
                    Some(kind) if is_attribute_name(kind) => parser.bump(),
                    _ => parser.error(SyntaxError::ExpectedName, "Expected attribute name"),
                }
                parser.finish_node();
            }
            Some(TokenKind::LBracket) => {
                parser.start_node_at(checkpoint, NodeKind::SubscriptAccess);
                parser.bump();
                parse_expression(parser);
                expect_closer(parser, TokenKind::RBracket, "Expected ']'");
                parser.finish_node();
            }
            Some(TokenKind::LParen) => {
                parser.start_node_at(checkpoint, NodeKind::FunctionCall);
                parse_argument_list(parser);
                parser.finish_node();
            }
            _ => break,
        }
    }
}

/// `loop.index`, `items.0` and `x.if` are all attribute lookups
fn is_attribute_name(kind: TokenKind) -> bool {
    kind == TokenKind::Identifier || kind == TokenKind::Integer || kind.is_keyword()
}

// === GROUPS ===

/// '(' ')' | '(' expr ')' | '(' expr ',' [expr {',' expr}] ')'
fn parse_parenthesized(parser: &mut dyn Parser) {
    let checkpoint = parser.checkpoint();
    parser.bump();

    if at(parser, TokenKind::RParen) {
        parser.start_node_at(checkpoint, NodeKind::TupleLiteral);
        parser.bump();
        parser.finish_node();
        return;
    }

    parse_expression(parser);

    if at(parser, TokenKind::Comma) {
        parser.start_node_at(checkpoint, NodeKind::TupleLiteral);
        while at(parser, TokenKind::Comma) {
            parser.bump();
            if at(parser, TokenKind::RParen) {
                break;
            }
            parse_expression(parser);
        }
    } else {
        parser.start_node_at(checkpoint, NodeKind::ParenthesizedExpression);
    }

    expect_closer(parser, TokenKind::RParen, "Expected ')'");
    parser.finish_node();
}

fn parse_list(parser: &mut dyn Parser) {
    parser.start_node(NodeKind::ListLiteral);
    parser.bump();

    if !at(parser, TokenKind::RBracket) {
        loop {
            parse_expression(parser);
            if at(parser, TokenKind::Comma) {
                parser.bump();
                if at(parser, TokenKind::RBracket) {
                    break;
                }
            } else if at(parser, TokenKind::RBracket) {
                break;
            } else {
                parser.error(SyntaxError::UnclosedGroup, "Expected ',' or ']'");
                break;
            }
        }
    }

    expect_closer(parser, TokenKind::RBracket, "Expected ']'");
    parser.finish_node();
}

fn parse_dict(parser: &mut dyn Parser) {
    parser.start_node(NodeKind::DictLiteral);
    parser.bump();

    if !at(parser, TokenKind::RBrace) {
        loop {
            parser.start_node(NodeKind::DictEntry);
            parse_expression(parser);
            if at(parser, TokenKind::Colon) {
                parser.bump();
                parse_expression(parser);
            } else {
                parser.error(SyntaxError::UnexpectedToken, "Expected ':'");
            }
            parser.finish_node();

            if at(parser, TokenKind::Comma) {
                parser.bump();
                if at(parser, TokenKind::RBrace) {
                    break;
                }
            } else if at(parser, TokenKind::RBrace) {
                break;
            } else {
                parser.error(SyntaxError::UnclosedGroup, "Expected ',' or '}'");
                break;
            }
        }
    }

    expect_closer(parser, TokenKind::RBrace, "Expected '}'");
    parser.finish_node();
}

// === ARGUMENTS AND PARAMETERS ===

/// '(' [argument {',' argument}] ')'
pub fn parse_argument_list(parser: &mut dyn Parser) {
    parser.start_node(NodeKind::ArgumentList);
    parser.bump();

    if !at(parser, TokenKind::RParen) {
        loop {
            parse_argument(parser);
            if at(parser, TokenKind::Comma) {
                parser.bump();
                if at(parser, TokenKind::RParen) {
                    break;
                }
            } else if at(parser, TokenKind::RParen) {
                break;
            } else {
                parser.error(SyntaxError::UnclosedGroup, "Expected ',' or ')'");
                break;
            }
        }
    }

    expect_closer(parser, TokenKind::RParen, "Expected ')'");
    parser.finish_node();
}

/// name '=' expr | expr
pub fn parse_argument(parser: &mut dyn Parser) {
    if parser.current() == Some(TokenKind::Identifier) && parser.nth(1) == Some(TokenKind::Assign) {
        parser.start_node(NodeKind::KeywordArgument);
        parser.bump();
        parser.bump();
        parse_expression(parser);
        parser.finish_node();
    } else {
        parse_expression(parser);
    }
}

/// '(' [name ['=' expr] {',' name ['=' expr]}] ')'
pub fn parse_parameter_list(parser: &mut dyn Parser) {
    parser.start_node(NodeKind::ParameterList);
    parser.bump();

    if !at(parser, TokenKind::RParen) {
        loop {
            if !at(parser, TokenKind::Identifier) {
                parser.error(SyntaxError::ExpectedName, "Expected parameter name");
                break;
            }
            parser.start_node(NodeKind::Parameter);
            parser.bump();
            if at(parser, TokenKind::Assign) {
                parser.bump();
                parse_expression(parser);
            }
            parser.finish_node();

            if at(parser, TokenKind::Comma) {
                parser.bump();
                if at(parser, TokenKind::RParen) {
                    break;
                }
            } else if at(parser, TokenKind::RParen) {
                break;
            } else {
                parser.error(SyntaxError::UnclosedGroup, "Expected ',' or ')'");
                break;
            }
        }
    }

    expect_closer(parser, TokenKind::RParen, "Expected ')'");
    parser.finish_node();
}
