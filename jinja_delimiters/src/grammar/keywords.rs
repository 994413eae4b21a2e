//! Block structure keywords
//!
//! Reserved words themselves are token kinds (see [`TokenKind`]). This module
//! records how statement keywords pair up: which openers take a body, which
//! end keyword closes them, and which branch keywords may split the body.

use crate::grammar::ast::NodeKind;
use crate::tokens::TokenKind;

/// Openers that take a body, their end keyword and the branches they allow
const BODY_BLOCKS: &[(TokenKind, TokenKind, &[TokenKind])] = &[
    (TokenKind::For, TokenKind::EndFor, &[TokenKind::Else]),
    (TokenKind::If, TokenKind::EndIf, &[TokenKind::Elif, TokenKind::Else]),
    (TokenKind::With, TokenKind::EndWith, &[]),
    (TokenKind::Block, TokenKind::EndBlock, &[]),
    (TokenKind::Macro, TokenKind::EndMacro, &[]),
    (TokenKind::Call, TokenKind::EndCall, &[]),
    (TokenKind::Filter, TokenKind::EndFilter, &[]),
    (TokenKind::Raw, TokenKind::EndRaw, &[]),
    (TokenKind::Autoescape, TokenKind::EndAutoescape, &[]),
    (TokenKind::Trans, TokenKind::EndTrans, &[TokenKind::Pluralize]),
];

/// End keyword closing a body opened by `opener`
pub fn end_keyword(opener: TokenKind) -> Option<TokenKind> {
    BODY_BLOCKS
        .iter()
        .find(|(open, _, _)| *open == opener)
        .map(|(_, end, _)| *end)
}

/// Opener that `end` closes
pub fn opener_for_end(end: TokenKind) -> Option<TokenKind> {
    BODY_BLOCKS
        .iter()
        .find(|(_, close, _)| *close == end)
        .map(|(open, _, _)| *open)
}

/// Branch keywords allowed directly inside the body of `opener`
pub fn branch_keywords(opener: TokenKind) -> &'static [TokenKind] {
    BODY_BLOCKS
        .iter()
        .find(|(open, _, _)| *open == opener)
        .map(|(_, _, branches)| *branches)
        .unwrap_or(&[])
}

pub fn is_end_keyword(kind: TokenKind) -> bool {
    opener_for_end(kind).is_some()
}

pub fn is_branch_keyword(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Elif | TokenKind::Else | TokenKind::Pluralize)
}

/// Node kind produced for a statement introduced by `keyword`.
///
/// `from` is resolved to [`NodeKind::FromImportBlock`]; end keywords and
/// anything unrecognised fall back to [`NodeKind::GenericBlock`].
pub fn statement_node_kind(keyword: Option<TokenKind>) -> NodeKind {
    match keyword {
        Some(TokenKind::For) => NodeKind::ForBlock,
        Some(TokenKind::If) => NodeKind::IfBlock,
        Some(TokenKind::Elif) => NodeKind::ElifBlock,
        Some(TokenKind::Else) => NodeKind::ElseBlock,
        Some(TokenKind::Set) => NodeKind::SetBlock,
        Some(TokenKind::With) => NodeKind::WithBlock,
        Some(TokenKind::Block) => NodeKind::BlockDefinition,
        Some(TokenKind::Extends) => NodeKind::ExtendsBlock,
        Some(TokenKind::Include) => NodeKind::IncludeBlock,
        Some(TokenKind::Import) => NodeKind::ImportBlock,
        Some(TokenKind::From) => NodeKind::FromImportBlock,
        Some(TokenKind::Macro) => NodeKind::MacroBlock,
        Some(TokenKind::Call) => NodeKind::CallBlock,
        Some(TokenKind::Filter) => NodeKind::FilterBlock,
        Some(TokenKind::Raw) => NodeKind::RawBlock,
        Some(TokenKind::Autoescape) => NodeKind::AutoescapeBlock,
        Some(TokenKind::Trans) => NodeKind::TransBlock,
        Some(TokenKind::Pluralize) => NodeKind::PluralizeBlock,
        _ => NodeKind::GenericBlock,
    }
}

/// Source spelling of a statement keyword, for messages
pub fn keyword_text(kind: TokenKind) -> &'static str {
    crate::tokens::token::keyword_spelling(kind).unwrap_or("?")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_keyword_pairs() {
        assert_eq!(end_keyword(TokenKind::For), Some(TokenKind::EndFor));
        assert_eq!(end_keyword(TokenKind::Raw), Some(TokenKind::EndRaw));
        assert_eq!(end_keyword(TokenKind::Set), None);
        assert_eq!(end_keyword(TokenKind::Include), None);
        assert_eq!(opener_for_end(TokenKind::EndMacro), Some(TokenKind::Macro));
        assert!(is_end_keyword(TokenKind::EndTrans));
        assert!(!is_end_keyword(TokenKind::Else));
    }

    #[test]
    fn test_branch_keywords() {
        assert_eq!(branch_keywords(TokenKind::If), &[TokenKind::Elif, TokenKind::Else]);
        assert_eq!(branch_keywords(TokenKind::For), &[TokenKind::Else]);
        assert!(branch_keywords(TokenKind::Macro).is_empty());
        assert!(is_branch_keyword(TokenKind::Pluralize));
    }

    #[test]
    fn test_statement_node_kind() {
        assert_eq!(statement_node_kind(Some(TokenKind::From)), NodeKind::FromImportBlock);
        assert_eq!(statement_node_kind(Some(TokenKind::EndFor)), NodeKind::GenericBlock);
        assert_eq!(statement_node_kind(None), NodeKind::GenericBlock);
        assert_eq!(keyword_text(TokenKind::EndIf), "endif");
    }
}
