//! Parse diagnostics
//!
//! Parsing never fails. Every problem becomes a [`Diagnostic`] tagged with a
//! [`SyntaxError`] kind that maps onto a registered error code.

use crate::logging::{codes, Code};
use crate::utils::{SourceMap, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum SyntaxError {
    #[error("missing block end delimiter")]
    MissingBlockEnd,

    #[error("missing variable end delimiter")]
    MissingVariableEnd,

    #[error("missing comment end delimiter")]
    MissingCommentEnd,

    #[error("unclosed group")]
    UnclosedGroup,

    #[error("expected expression")]
    ExpectedExpression,

    #[error("expected name")]
    ExpectedName,

    #[error("unexpected token")]
    UnexpectedToken,

    #[error("statement block without end tag")]
    UnclosedBlock,

    #[error("maximum parse depth exceeded")]
    MaxRecursionDepth,
}

impl SyntaxError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::MissingBlockEnd => codes::syntax::MISSING_BLOCK_END,
            Self::MissingVariableEnd => codes::syntax::MISSING_VARIABLE_END,
            Self::MissingCommentEnd => codes::syntax::MISSING_COMMENT_END,
            Self::UnclosedGroup => codes::syntax::UNCLOSED_GROUP,
            Self::ExpectedExpression => codes::syntax::EXPECTED_EXPRESSION,
            Self::ExpectedName => codes::syntax::EXPECTED_NAME,
            Self::UnexpectedToken => codes::syntax::UNEXPECTED_TOKEN,
            Self::UnclosedBlock => codes::syntax::UNCLOSED_BLOCK,
            Self::MaxRecursionDepth => codes::syntax::MAX_RECURSION_DEPTH,
        }
    }

    /// Missing terminators and closers, as opposed to expression problems
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::MissingBlockEnd
                | Self::MissingVariableEnd
                | Self::MissingCommentEnd
                | Self::UnclosedGroup
                | Self::UnclosedBlock
        )
    }
}

/// Offset-tagged, non-fatal parse problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub offset: usize,
    pub message: String,
    pub error: SyntaxError,
}

impl Diagnostic {
    pub fn new(offset: usize, error: SyntaxError, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
            error,
        }
    }

    pub fn error_code(&self) -> Code {
        self.error.error_code()
    }

    pub fn span(&self, map: &SourceMap) -> Span {
        map.span(self.offset, self.offset)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_registered() {
        let all = [
            SyntaxError::MissingBlockEnd,
            SyntaxError::MissingVariableEnd,
            SyntaxError::MissingCommentEnd,
            SyntaxError::UnclosedGroup,
            SyntaxError::ExpectedExpression,
            SyntaxError::ExpectedName,
            SyntaxError::UnexpectedToken,
            SyntaxError::UnclosedBlock,
            SyntaxError::MaxRecursionDepth,
        ];
        for error in all {
            assert!(
                codes::get_error_metadata(error.error_code().as_str()).is_some(),
                "{:?} has no metadata",
                error
            );
        }
    }

    #[test]
    fn test_structural_classification() {
        assert!(SyntaxError::MissingVariableEnd.is_structural());
        assert!(SyntaxError::UnclosedBlock.is_structural());
        assert!(!SyntaxError::ExpectedExpression.is_structural());
    }

    #[test]
    fn test_diagnostic_display_and_span() {
        let diagnostic = Diagnostic::new(3, SyntaxError::MissingVariableEnd, "Expected variable end delimiter");
        assert_eq!(diagnostic.to_string(), "Expected variable end delimiter at offset 3");

        let map = SourceMap::new("ab\ncd");
        let span = diagnostic.span(&map);
        assert_eq!(span.start.line, 2);
        assert_eq!(span.start.column, 1);
    }
}
