//! Syntax analysis: token stream to syntax tree
//!
//! Parsing always produces a tree spanning the whole input. Problems are
//! returned as [`Diagnostic`]s and, when enabled in the runtime preferences,
//! forwarded to the global logger.

mod error;
mod parser;

pub use error::{Diagnostic, SyntaxError};
pub use parser::{parse_stream, ParseStatistics, ParsedTemplate, TemplateParser};

use crate::config::runtime::SyntaxPreferences;
use crate::config::DelimiterConfig;
use crate::grammar::NodeKind;
use crate::lexical::{tokenize_source, LexerError};
use crate::logging::codes;
use crate::tokens::TokenStream;
use crate::{log_debug, log_success, log_warning};

/// Parse with default preferences
pub fn parse(stream: &TokenStream) -> ParsedTemplate {
    parse_with_preferences(stream, &SyntaxPreferences::default())
}

pub fn parse_with_preferences(stream: &TokenStream, preferences: &SyntaxPreferences) -> ParsedTemplate {
    log_debug!("Starting syntax analysis", "tokens" => stream.len());

    let parsed = parse_stream(stream);

    if preferences.log_diagnostics {
        log_diagnostics(stream, &parsed);
    }

    log_success!(
        codes::success::PARSE_COMPLETE,
        "Syntax analysis completed",
        "nodes" => parsed.statistics.node_count,
        "statements" => count_statements(&parsed),
        "diagnostics" => parsed.diagnostics.len()
    );

    parsed
}

/// Tokenize and parse in one step
pub fn parse_source(
    source: &str,
    config: &DelimiterConfig,
) -> Result<(TokenStream, ParsedTemplate), LexerError> {
    let stream = tokenize_source(source, config)?;
    let parsed = parse(&stream);
    Ok((stream, parsed))
}

fn log_diagnostics(stream: &TokenStream, parsed: &ParsedTemplate) {
    if parsed.diagnostics.is_empty() {
        return;
    }

    let map = stream.source_map();
    for diagnostic in &parsed.diagnostics {
        log_warning!(
            code = diagnostic.error_code(),
            &diagnostic.message,
            span = diagnostic.span(&map),
            "offset" => diagnostic.offset
        );
    }

    if parsed.statistics.diagnostics_suppressed > 0 {
        log_warning!("Further syntax diagnostics suppressed",
            "suppressed" => parsed.statistics.diagnostics_suppressed
        );
    }
}

fn count_statements(parsed: &ParsedTemplate) -> usize {
    let tree = &parsed.tree;
    tree.descendants(tree.root())
        .into_iter()
        .filter(|id| {
            let kind = tree.kind(*id);
            kind.is_statement() && kind != NodeKind::EndTag
        })
        .count()
}

/// Check that every syntax code has registry metadata
pub fn validate_syntax_codes() -> Result<(), String> {
    let syntax_codes = [
        codes::syntax::MISSING_BLOCK_END,
        codes::syntax::MISSING_VARIABLE_END,
        codes::syntax::MISSING_COMMENT_END,
        codes::syntax::UNCLOSED_GROUP,
        codes::syntax::EXPECTED_EXPRESSION,
        codes::syntax::EXPECTED_NAME,
        codes::syntax::UNCLOSED_BLOCK,
        codes::syntax::UNEXPECTED_TOKEN,
        codes::syntax::MAX_RECURSION_DEPTH,
    ];

    for code in &syntax_codes {
        if codes::get_error_metadata(code.as_str()).is_none() {
            return Err(format!(
                "Syntax error code {} not found in metadata registry",
                code.as_str()
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source() {
        let config = DelimiterConfig::default();
        let (stream, parsed) = parse_source("{% block body %}{{ x }}{% endblock %}", &config).unwrap();
        assert_eq!(stream.reconstruct(), "{% block body %}{{ x }}{% endblock %}");
        assert_eq!(parsed.count(NodeKind::BlockDefinition), 1);
        assert_eq!(count_statements(&parsed), 1);
        assert!(!parsed.has_diagnostics());
    }

    #[test]
    fn test_parse_with_quiet_preferences() {
        let config = DelimiterConfig::default();
        let stream = tokenize_source("{{ a", &config).unwrap();
        let parsed = parse_with_preferences(&stream, &SyntaxPreferences { log_diagnostics: false });
        assert_eq!(parsed.diagnostics.len(), 1);
    }

    #[test]
    fn test_validate_syntax_codes() {
        assert!(validate_syntax_codes().is_ok());
    }
}
