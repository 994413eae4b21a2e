//! Expression builders, lowest precedence first
//!
//! ```text
//! expression  ::= or_expr ['if' or_expr ['else' expression]]
//! or_expr     ::= and_expr {'or' and_expr}
//! and_expr    ::= not_expr {'and' not_expr}
//! not_expr    ::= 'not' not_expr | comparison
//! comparison  ::= arith [(cmp_op | 'in' | 'not' 'in') arith | 'is' ['not'] arith]
//! arith       ::= term {('+' | '-' | '~') term}
//! term        ::= factor {('*' | '/' | '//' | '%') factor}
//! factor      ::= ('-' | '+') factor | filtered ['**' factor]
//! filtered    ::= primary {'|' name ['(' args ')']}
//! ```

use crate::grammar::ast::NodeKind;
use crate::grammar::builders::atomic::{parse_argument_list, parse_error_placeholder, parse_primary, Parser};
use crate::grammar::builders::helpers::{at, at_any, is_structural};
use crate::syntax::SyntaxError;
use crate::tokens::TokenKind;

/// Full expression, guarded by the parse depth limit
pub fn parse_expression(parser: &mut dyn Parser) {
    if !parser.enter() {
        parse_error_placeholder(parser);
        return;
    }
    parse_conditional(parser);
    parser.exit();
}

/// Expression without a trailing `if`, used where `if` belongs to the
/// enclosing statement (`for x in items if x`)
pub fn parse_or_expression(parser: &mut dyn Parser) {
    if !parser.enter() {
        parse_error_placeholder(parser);
        return;
    }
    parse_or(parser);
    parser.exit();
}

/// expr {',' expr}; a comma makes an unparenthesized tuple (`set a, b = 1, 2`)
pub fn parse_tuple_or_expression(parser: &mut dyn Parser) {
    let checkpoint = parser.checkpoint();
    parse_expression(parser);

    if at(parser, TokenKind::Comma) {
        parser.start_node_at(checkpoint, NodeKind::TupleLiteral);
        while at(parser, TokenKind::Comma) {
            parser.bump();
            match parser.current() {
                Some(kind) if !is_structural(kind) => parse_expression(parser),
                _ => break,
            }
        }
        parser.finish_node();
    }
}

fn parse_conditional(parser: &mut dyn Parser) {
    let checkpoint = parser.checkpoint();
    parse_or(parser);

    if at(parser, TokenKind::If) {
        parser.start_node_at(checkpoint, NodeKind::ConditionalExpression);
        parser.bump();
        parse_or(parser);
        if at(parser, TokenKind::Else) {
            parser.bump();
            parse_expression(parser);
        }
        parser.finish_node();
    }
}

fn parse_or(parser: &mut dyn Parser) {
    let checkpoint = parser.checkpoint();
    parse_and(parser);

    while at(parser, TokenKind::Or) {
        parser.start_node_at(checkpoint, NodeKind::OrExpression);
        parser.bump();
        parse_and(parser);
        parser.finish_node();
    }
}

fn parse_and(parser: &mut dyn Parser) {
    let checkpoint = parser.checkpoint();
    parse_not(parser);

    while at(parser, TokenKind::And) {
        parser.start_node_at(checkpoint, NodeKind::AndExpression);
        parser.bump();
        parse_not(parser);
        parser.finish_node();
    }
}

fn parse_not(parser: &mut dyn Parser) {
    if !at(parser, TokenKind::Not) {
        parse_comparison(parser);
        return;
    }

    parser.start_node(NodeKind::NotExpression);
    parser.bump();
    if parser.enter() {
        parse_not(parser);
        parser.exit();
    } else {
        parse_error_placeholder(parser);
    }
    parser.finish_node();
}

/// One operator at most: `a == b == c` leaves the second `==` to the caller
fn parse_comparison(parser: &mut dyn Parser) {
    let checkpoint = parser.checkpoint();
    parse_arithmetic(parser);

    match parser.current() {
        Some(kind) if kind.is_comparison() || kind == TokenKind::In => {
            parser.start_node_at(checkpoint, NodeKind::ComparisonExpression);
            parser.bump();
            parse_arithmetic(parser);
            parser.finish_node();
        }
        Some(TokenKind::Not) if parser.nth(1) == Some(TokenKind::In) => {
            parser.start_node_at(checkpoint, NodeKind::ComparisonExpression);
            parser.bump();
            parser.bump();
            parse_arithmetic(parser);
            parser.finish_node();
        }
        Some(TokenKind::Is) => {
            parser.start_node_at(checkpoint, NodeKind::IsExpression);
            parser.bump();
            if at(parser, TokenKind::Not) {
                parser.bump();
            }
            parse_arithmetic(parser);
            parser.finish_node();
        }
        _ => {}
    }
}

fn parse_arithmetic(parser: &mut dyn Parser) {
    let checkpoint = parser.checkpoint();
    parse_term(parser);

    while at_any(parser, &[TokenKind::Plus, TokenKind::Minus, TokenKind::Tilde]) {
        parser.start_node_at(checkpoint, NodeKind::ArithmeticExpression);
        parser.bump();
        parse_term(parser);
        parser.finish_node();
    }
}

fn parse_term(parser: &mut dyn Parser) {
    let checkpoint = parser.checkpoint();
    parse_factor(parser);

    while at_any(
        parser,
        &[TokenKind::Multiply, TokenKind::Divide, TokenKind::FloorDivide, TokenKind::Modulo],
    ) {
        parser.start_node_at(checkpoint, NodeKind::TermExpression);
        parser.bump();
        parse_factor(parser);
        parser.finish_node();
    }
}

/// `**` is right-associative: `a ** b ** c` nests as `a ** (b ** c)`
fn parse_factor(parser: &mut dyn Parser) {
    if !parser.enter() {
        parse_error_placeholder(parser);
        return;
    }

    if at_any(parser, &[TokenKind::Minus, TokenKind::Plus]) {
        parser.start_node(NodeKind::UnaryExpression);
        parser.bump();
        parse_factor(parser);
        parser.finish_node();
        parser.exit();
        return;
    }

    let checkpoint = parser.checkpoint();
    parse_filtered(parser);

    if at(parser, TokenKind::Power) {
        parser.start_node_at(checkpoint, NodeKind::PowerExpression);
        parser.bump();
        parse_factor(parser);
        parser.finish_node();
    }

    parser.exit();
}

fn parse_filtered(parser: &mut dyn Parser) {
    let checkpoint = parser.checkpoint();
    parse_primary(parser);

    while at(parser, TokenKind::Pipe) {
        parser.start_node_at(checkpoint, NodeKind::FilterExpression);
        parser.bump();
        if at(parser, TokenKind::Identifier) {
            parser.bump();
            if at(parser, TokenKind::LParen) {
                parse_argument_list(parser);
            }
        } else {
            parser.error(SyntaxError::ExpectedName, "Expected filter name");
        }
        parser.finish_node();
    }
}
