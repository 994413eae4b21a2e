//! Template-level builders: content, tags and statement bodies
//!
//! A statement whose keyword takes a body (`for`, `if`, `macro`, ...) owns
//! everything up to its end tag: the opening tag's tokens, the body nodes,
//! one node per branch (`elif`, `else`, `pluralize`) and a final
//! [`NodeKind::EndTag`]. Every other tag is a single node covering the tag.
//!
//! Tags end at `blockEnd`, or at the newline for line statements.

use crate::grammar::ast::NodeKind;
use crate::grammar::builders::atomic::{parse_argument, parse_parameter_list, Parser};
use crate::grammar::builders::expressions::{
    parse_expression, parse_or_expression, parse_tuple_or_expression,
};
use crate::grammar::builders::helpers::{
    at, at_any, eat, expect_name, is_structural, parse_target_list, skip_until,
};
use crate::grammar::keywords::{
    branch_keywords, end_keyword, is_branch_keyword, is_end_keyword, keyword_text,
    statement_node_kind,
};
use crate::syntax::SyntaxError;
use crate::tokens::{LexState, TokenKind};

/// Where a body stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyStop {
    End,
    Branch(TokenKind),
    /// An end tag awaited by an enclosing body
    Outer,
    Eof,
}

// === TEMPLATE ===

/// Root node spanning the whole input
pub fn parse_template(parser: &mut dyn Parser) {
    parser.start_node(NodeKind::Template);
    while parser.current().is_some() {
        parse_content_item(parser);
    }
    parser.eat_trivia();
    parser.finish_node();
}

/// One tag, comment or run of text; always consumes at least one token
pub fn parse_content_item(parser: &mut dyn Parser) {
    match parser.current() {
        Some(TokenKind::BlockStart) => parse_statement(parser),
        Some(TokenKind::VariableStart) => parse_variable(parser),
        Some(TokenKind::CommentStart) => parse_comment(parser),
        Some(_) => parse_text(parser),
        None => {}
    }
}

fn parse_text(parser: &mut dyn Parser) {
    parser.start_node(NodeKind::Text);
    while let Some(kind) = parser.current() {
        if matches!(
            kind,
            TokenKind::BlockStart | TokenKind::VariableStart | TokenKind::CommentStart
        ) {
            break;
        }
        parser.bump();
    }
    parser.finish_node();
}

// === VARIABLES AND COMMENTS ===

pub fn parse_variable(parser: &mut dyn Parser) {
    parser.start_node(NodeKind::Variable);
    parser.bump();
    parse_expression(parser);

    if !eat(parser, TokenKind::VariableEnd) {
        parser.error(SyntaxError::MissingVariableEnd, "Expected variable end delimiter");
        skip_until(parser, TokenKind::VariableEnd);
        eat(parser, TokenKind::VariableEnd);
    }
    parser.finish_node();
}

/// Comment tokens are kept verbatim; a line comment ends at the newline
pub fn parse_comment(parser: &mut dyn Parser) {
    let line_comment = parser.next_state() == Some(LexState::LineComment);
    let closer = if line_comment {
        TokenKind::Newline
    } else {
        TokenKind::CommentEnd
    };

    parser.start_node(NodeKind::Comment);
    parser.bump();
    while let Some(kind) = parser.current() {
        if kind == closer {
            break;
        }
        parser.bump();
    }

    if !eat(parser, closer) && !line_comment {
        parser.error(SyntaxError::MissingCommentEnd, "Expected comment end delimiter");
    }
    parser.finish_node();
}

// === STATEMENTS ===

/// Dispatch on the keyword after `blockStart`
pub fn parse_statement(parser: &mut dyn Parser) {
    let keyword = parser.nth(1);

    match keyword {
        Some(opener) if end_keyword(opener).is_some() => parse_body_statement(parser, opener),
        Some(end) if is_end_keyword(end) => {
            parser.error(
                SyntaxError::UnexpectedToken,
                &format!("Unexpected '{}' without a matching opening tag", keyword_text(end)),
            );
            parse_tag(parser, NodeKind::GenericBlock, keyword);
        }
        Some(branch) if is_branch_keyword(branch) => {
            parser.error(
                SyntaxError::UnexpectedToken,
                &format!("Unexpected '{}' outside of an enclosing block", keyword_text(branch)),
            );
            parse_tag(parser, statement_node_kind(keyword), keyword);
        }
        _ => parse_tag(parser, statement_node_kind(keyword), keyword),
    }
}

fn parse_tag(parser: &mut dyn Parser, kind: NodeKind, keyword: Option<TokenKind>) {
    parser.start_node(kind);
    parse_tag_contents(parser, keyword);
    parser.finish_node();
}

/// `blockStart`, the keyword's header and the terminator, into the open node
fn parse_tag_contents(parser: &mut dyn Parser, keyword: Option<TokenKind>) {
    let terminator = if parser.next_state() == Some(LexState::LineStatement) {
        TokenKind::Newline
    } else {
        TokenKind::BlockEnd
    };

    parser.bump();
    parse_header(parser, keyword, terminator);
    consume_terminator(parser, terminator);
}

fn parse_body_statement(parser: &mut dyn Parser, opener: TokenKind) {
    let kind = statement_node_kind(Some(opener));
    let end = match end_keyword(opener) {
        Some(end) if parser.enter() => end,
        _ => {
            parse_tag(parser, kind, Some(opener));
            return;
        }
    };

    let open_offset = parser.offset();
    parser.start_node(kind);
    parse_tag_contents(parser, Some(opener));
    parser.open_body(end);

    let mut stop = parse_body(parser, opener, end);
    while let BodyStop::Branch(branch) = stop {
        parser.start_node(statement_node_kind(Some(branch)));
        parse_tag_contents(parser, Some(branch));
        stop = parse_body(parser, opener, end);
        parser.finish_node();
    }
    parser.close_body();

    if stop == BodyStop::End {
        parser.start_node(NodeKind::EndTag);
        parse_tag_contents(parser, Some(end));
        parser.finish_node();
    } else {
        parser.error_at(
            open_offset,
            SyntaxError::UnclosedBlock,
            &format!(
                "Unclosed '{}' block, expected '{}'",
                keyword_text(opener),
                keyword_text(end)
            ),
        );
    }

    parser.finish_node();
    parser.exit();
}

fn parse_body(parser: &mut dyn Parser, opener: TokenKind, end: TokenKind) -> BodyStop {
    loop {
        match parser.current() {
            None => return BodyStop::Eof,
            Some(TokenKind::BlockStart) => match parser.nth(1) {
                Some(kind) if kind == end => return BodyStop::End,
                Some(kind) if branch_keywords(opener).contains(&kind) => {
                    return BodyStop::Branch(kind)
                }
                Some(kind) if is_end_keyword(kind) && parser.awaits_end(kind) => {
                    return BodyStop::Outer
                }
                _ => parse_statement(parser),
            },
            Some(_) => parse_content_item(parser),
        }
    }
}

fn consume_terminator(parser: &mut dyn Parser, terminator: TokenKind) {
    if eat(parser, terminator) {
        return;
    }
    // A line statement may end the file without a newline
    if terminator == TokenKind::Newline && parser.current().is_none() {
        return;
    }

    parser.error(SyntaxError::MissingBlockEnd, "Expected block end delimiter");
    skip_until(parser, terminator);
    eat(parser, terminator);
}

// === HEADERS ===

fn parse_header(parser: &mut dyn Parser, keyword: Option<TokenKind>, terminator: TokenKind) {
    match keyword {
        Some(TokenKind::For) => {
            parser.bump();
            parse_target_list(parser, "Expected loop variable");
            if !eat(parser, TokenKind::In) {
                parser.error(SyntaxError::UnexpectedToken, "Expected 'in'");
            }
            parse_or_expression(parser);
            if eat(parser, TokenKind::If) {
                parse_expression(parser);
            }
            eat(parser, TokenKind::Recursive);
        }
        Some(TokenKind::If) | Some(TokenKind::Elif) => {
            parser.bump();
            parse_expression(parser);
        }
        Some(TokenKind::Set) => {
            parser.bump();
            parse_target_list(parser, "Expected variable name");
            // Without '=' this is a block assignment
            if eat(parser, TokenKind::Assign) {
                parse_tuple_or_expression(parser);
            }
        }
        Some(TokenKind::With) | Some(TokenKind::Trans) => {
            parser.bump();
            parse_argument_sequence(parser, terminator);
        }
        Some(TokenKind::Block) => {
            parser.bump();
            expect_name(parser, "Expected block name");
            eat(parser, TokenKind::Scoped);
        }
        Some(TokenKind::Extends)
        | Some(TokenKind::Filter)
        | Some(TokenKind::Autoescape) => {
            parser.bump();
            parse_expression(parser);
        }
        Some(TokenKind::Include) => {
            parser.bump();
            parse_expression(parser);
            if eat(parser, TokenKind::Ignore) && !eat(parser, TokenKind::Missing) {
                parser.error(SyntaxError::UnexpectedToken, "Expected 'missing'");
            }
            parse_context_modifier(parser);
        }
        Some(TokenKind::Import) => {
            parser.bump();
            parse_expression(parser);
            if eat(parser, TokenKind::As) {
                expect_name(parser, "Expected alias name");
            }
            parse_context_modifier(parser);
        }
        Some(TokenKind::From) => {
            parser.bump();
            parse_expression(parser);
            if eat(parser, TokenKind::Import) {
                parse_import_names(parser);
            } else {
                parser.error(SyntaxError::UnexpectedToken, "Expected 'import'");
            }
            parse_context_modifier(parser);
        }
        Some(TokenKind::Macro) => {
            parser.bump();
            expect_name(parser, "Expected macro name");
            if at(parser, TokenKind::LParen) {
                parse_parameter_list(parser);
            } else {
                parser.error(SyntaxError::UnexpectedToken, "Expected '('");
            }
        }
        Some(TokenKind::Call) => {
            parser.bump();
            if at(parser, TokenKind::LParen) {
                parse_parameter_list(parser);
            }
            parse_expression(parser);
        }
        Some(TokenKind::Pluralize) => {
            parser.bump();
            eat(parser, TokenKind::Identifier);
        }
        Some(TokenKind::Else) | Some(TokenKind::Raw) => parser.bump(),
        Some(kind) if is_end_keyword(kind) => parser.bump(),
        _ => parse_generic(parser, terminator),
    }
}

/// Unknown statements: expressions up to the terminator
fn parse_generic(parser: &mut dyn Parser, terminator: TokenKind) {
    if parser.current().is_some_and(|kind| kind.is_keyword()) {
        parser.bump();
    }

    while let Some(kind) = parser.current() {
        if kind == terminator || is_structural(kind) {
            break;
        }
        if kind == TokenKind::Comma {
            parser.bump();
            continue;
        }
        parse_expression(parser);
    }
}

/// `a = 1, b` style lists used by `with` and `trans`
fn parse_argument_sequence(parser: &mut dyn Parser, terminator: TokenKind) {
    while let Some(kind) = parser.current() {
        if kind == terminator || is_structural(kind) {
            break;
        }
        parse_argument(parser);
        if !eat(parser, TokenKind::Comma) {
            break;
        }
    }
}

/// name ['as' alias] {',' name ['as' alias]}
fn parse_import_names(parser: &mut dyn Parser) {
    loop {
        parser.start_node(NodeKind::ImportName);
        let named = expect_name(parser, "Expected name to import");
        if named && eat(parser, TokenKind::As) {
            expect_name(parser, "Expected alias name");
        }
        parser.finish_node();

        if !named || !eat(parser, TokenKind::Comma) {
            break;
        }
    }
}

/// Optional `with context` / `without context`
fn parse_context_modifier(parser: &mut dyn Parser) {
    if at_any(parser, &[TokenKind::With, TokenKind::Without]) {
        parser.bump();
        if !eat(parser, TokenKind::Context) {
            parser.error(SyntaxError::UnexpectedToken, "Expected 'context'");
        }
    }
}
