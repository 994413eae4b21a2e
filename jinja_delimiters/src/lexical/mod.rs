//! Lexical analysis
//!
//! The tokenizer itself ([`tokenize`]) is a pure lazy iterator. The
//! functions here drive it over whole sources with the compile-time token
//! limit applied and the result collected into a [`TokenStream`].

pub mod analyzer;

use crate::config::compile_time::lexical::*;
use crate::config::runtime::LexicalPreferences;
use crate::config::DelimiterConfig;
use crate::tokens::{TokenCategory, TokenKind, TokenStream};
use serde::Serialize;

pub use analyzer::{tokenize, LexState, LexerError, LexicalAnalyzer, LexicalMetrics, Tokenizer};

// ============================================================================
// MODULE API
// ============================================================================

/// Tokenize a whole template with default preferences
pub fn tokenize_source(source: &str, config: &DelimiterConfig) -> Result<TokenStream, LexerError> {
    LexicalAnalyzer::new().tokenize_source(source, config)
}

/// Tokenize with explicit runtime preferences (limits stay compile-time)
pub fn tokenize_source_with_preferences(
    source: &str,
    config: &DelimiterConfig,
    preferences: LexicalPreferences,
) -> Result<TokenStream, LexerError> {
    LexicalAnalyzer::with_preferences(preferences).tokenize_source(source, config)
}

pub fn create_analyzer() -> LexicalAnalyzer {
    LexicalAnalyzer::new()
}

pub fn create_analyzer_with_preferences(preferences: LexicalPreferences) -> LexicalAnalyzer {
    LexicalAnalyzer::with_preferences(preferences)
}

// ============================================================================
// MODULE VALIDATION
// ============================================================================

/// Check that lexical codes are registered and limits are usable
pub fn validate_tokenization() -> Result<(), String> {
    let lexical_codes = [
        crate::logging::codes::lexical::BAD_CHARACTER,
        crate::logging::codes::lexical::INVALID_RANGE,
        crate::logging::codes::lexical::TOO_MANY_TOKENS,
    ];

    for code in &lexical_codes {
        if crate::logging::codes::get_error_metadata(code.as_str()).is_none() {
            return Err(format!(
                "Lexical error code {} not found in metadata registry",
                code.as_str()
            ));
        }
    }

    if MAX_TOKEN_COUNT == 0 {
        return Err("MAX_TOKEN_COUNT cannot be zero".to_string());
    }
    if MAX_DELIMITER_LENGTH == 0 {
        return Err("MAX_DELIMITER_LENGTH cannot be zero".to_string());
    }

    crate::log_debug!("Lexical limits",
        "max_token_count" => MAX_TOKEN_COUNT,
        "max_delimiter_length" => MAX_DELIMITER_LENGTH,
        "max_string_size" => MAX_STRING_SIZE
    );

    Ok(())
}

// ============================================================================
// TOKEN COUNTS
// ============================================================================

/// Token distribution by display category
#[derive(Debug, Default, Clone, Serialize)]
pub struct TokenCounts {
    pub total: usize,
    pub delimiters: usize,
    pub keywords: usize,
    pub operators: usize,
    pub strings: usize,
    pub numbers: usize,
    pub identifiers: usize,
    pub comments: usize,
    pub text: usize,
    pub whitespace: usize,
    pub bad_characters: usize,
}

impl TokenCounts {
    /// Tokens the parser looks at inside tags
    pub fn significant_tokens(&self) -> usize {
        self.total - self.whitespace - self.comments - self.text
    }

    pub fn has_tags(&self) -> bool {
        self.delimiters > 0
    }
}

pub fn get_token_counts(stream: &TokenStream) -> TokenCounts {
    let mut counts = TokenCounts::default();

    for index in 0..stream.len() {
        counts.total += 1;
        match stream.category_at(index) {
            Some(TokenCategory::Delimiter) => counts.delimiters += 1,
            Some(TokenCategory::Keyword) => counts.keywords += 1,
            Some(TokenCategory::Operator) => counts.operators += 1,
            Some(TokenCategory::String) => counts.strings += 1,
            Some(TokenCategory::Number) => counts.numbers += 1,
            Some(TokenCategory::Identifier) => counts.identifiers += 1,
            Some(TokenCategory::Comment) => counts.comments += 1,
            Some(TokenCategory::Text) => counts.text += 1,
            Some(TokenCategory::BadCharacter) => counts.bad_characters += 1,
            Some(TokenCategory::Whitespace) | None => counts.whitespace += 1,
        }
    }

    counts
}

/// Tokens of `kind` in the stream
pub fn count_kind(stream: &TokenStream, kind: TokenKind) -> usize {
    stream.tokens().iter().filter(|t| t.kind == kind).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_analyzer_with_preferences() {
        let preferences = LexicalPreferences {
            collect_detailed_metrics: false,
            log_bad_characters: false,
        };
        let analyzer = create_analyzer_with_preferences(preferences);
        assert!(!analyzer.preferences().collect_detailed_metrics);
        assert!(!analyzer.preferences().log_bad_characters);
    }

    #[test]
    fn test_validate_tokenization() {
        assert!(validate_tokenization().is_ok());
    }

    #[test]
    fn test_token_counts() {
        let config = DelimiterConfig::default();
        let stream =
            tokenize_source("Hi {# note #}{% if user %}{{ user.name | e }}{% endif %} $", &config)
                .unwrap();
        let counts = get_token_counts(&stream);

        assert_eq!(counts.delimiters, 8);
        assert_eq!(counts.keywords, 2);
        assert_eq!(counts.identifiers, 4);
        assert_eq!(counts.comments, 1);
        assert_eq!(counts.operators, 2);
        assert_eq!(counts.bad_characters, 0);
        assert!(counts.has_tags());
        assert_eq!(count_kind(&stream, TokenKind::BlockStart), 2);
    }

    #[test]
    fn test_detailed_metrics_toggle() {
        let config = DelimiterConfig::default();
        let mut detailed = create_analyzer_with_preferences(LexicalPreferences {
            collect_detailed_metrics: true,
            log_bad_characters: false,
        });
        detailed.tokenize_source("{{ a }}{{ b }}", &config).unwrap();
        assert_eq!(detailed.metrics().count_of(TokenKind::VariableStart), 2);

        let mut plain = create_analyzer_with_preferences(LexicalPreferences {
            collect_detailed_metrics: false,
            log_bad_characters: false,
        });
        plain.tokenize_source("{{ a }}", &config).unwrap();
        assert!(plain.metrics().kind_counts.is_empty());
        assert_eq!(plain.metrics().identifier_tokens, 1);
    }
}
