// RUNTIME PREFERENCES (User Experience)
//
// Limits live in `compile_time`; everything here only changes what gets
// reported, never what gets accepted.

use crate::logging::events::{parse_log_level, LogLevel};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileProcessorPreferences {
    /// Reject files without a template extension instead of warning
    pub require_template_extension: bool,

    /// Log per-file read timings
    pub enable_performance_logging: bool,
}

impl Default for FileProcessorPreferences {
    fn default() -> Self {
        Self {
            require_template_extension: env_or(env_vars::REQUIRE_TEMPLATE_EXTENSION, false),
            enable_performance_logging: env_or(env_vars::ENABLE_PERFORMANCE_LOGGING, true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexicalPreferences {
    /// Count tokens per kind
    pub collect_detailed_metrics: bool,

    /// Emit a warning event for every BAD_CHARACTER token
    pub log_bad_characters: bool,
}

impl Default for LexicalPreferences {
    fn default() -> Self {
        Self {
            collect_detailed_metrics: env_or(env_vars::LEXICAL_DETAILED_METRICS, true),
            log_bad_characters: env_or(env_vars::LEXICAL_LOG_BAD_CHARACTERS, true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxPreferences {
    /// Forward parser diagnostics to the logger
    pub log_diagnostics: bool,
}

impl Default for SyntaxPreferences {
    fn default() -> Self {
        Self {
            log_diagnostics: env_or(env_vars::SYNTAX_LOG_DIAGNOSTICS, true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisPreferences {
    /// Collect template facts after parsing
    pub collect_facts: bool,

    /// Reuse facts while a file's modification time is unchanged
    pub enable_facts_cache: bool,
}

impl Default for AnalysisPreferences {
    fn default() -> Self {
        Self {
            collect_facts: env_or(env_vars::ANALYSIS_COLLECT_FACTS, true),
            enable_facts_cache: env_or(env_vars::ANALYSIS_ENABLE_CACHE, true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingPreferences {
    /// JSON lines instead of human-readable output
    pub use_structured_logging: bool,

    pub enable_console_logging: bool,

    pub min_log_level: LogLevel,

    pub log_performance_events: bool,

    /// Print a cargo-style summary after batch runs
    pub enable_cargo_style_output: bool,

    /// Attach the current file to every event
    pub include_file_context: bool,
}

impl Default for LoggingPreferences {
    fn default() -> Self {
        Self {
            use_structured_logging: env_or(env_vars::LOGGING_USE_STRUCTURED, false),
            enable_console_logging: env_or(env_vars::LOGGING_ENABLE_CONSOLE, false),
            min_log_level: env::var(env_vars::LOGGING_MIN_LEVEL)
                .ok()
                .and_then(|v| parse_log_level(&v))
                .unwrap_or(LogLevel::Info),
            log_performance_events: env_or(env_vars::LOGGING_LOG_PERFORMANCE, true),
            enable_cargo_style_output: env_or(env_vars::LOGGING_CARGO_STYLE, true),
            include_file_context: env_or(env_vars::LOGGING_INCLUDE_FILE_CONTEXT, true),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub file_processor: FileProcessorPreferences,
    pub lexical: LexicalPreferences,
    pub syntax: SyntaxPreferences,
    pub analysis: AnalysisPreferences,
    pub logging: LoggingPreferences,
}

/// Environment variable names for configuration
pub mod env_vars {
    // File Processor
    pub const REQUIRE_TEMPLATE_EXTENSION: &str = "JINJA_REQUIRE_TEMPLATE_EXTENSION";
    pub const ENABLE_PERFORMANCE_LOGGING: &str = "JINJA_ENABLE_PERFORMANCE_LOGGING";

    // Lexical
    pub const LEXICAL_DETAILED_METRICS: &str = "JINJA_LEXICAL_DETAILED_METRICS";
    pub const LEXICAL_LOG_BAD_CHARACTERS: &str = "JINJA_LEXICAL_LOG_BAD_CHARACTERS";

    // Syntax
    pub const SYNTAX_LOG_DIAGNOSTICS: &str = "JINJA_SYNTAX_LOG_DIAGNOSTICS";

    // Analysis
    pub const ANALYSIS_COLLECT_FACTS: &str = "JINJA_ANALYSIS_COLLECT_FACTS";
    pub const ANALYSIS_ENABLE_CACHE: &str = "JINJA_ANALYSIS_ENABLE_CACHE";

    // Logging
    pub const LOGGING_USE_STRUCTURED: &str = "JINJA_LOGGING_USE_STRUCTURED";
    pub const LOGGING_ENABLE_CONSOLE: &str = "JINJA_LOGGING_ENABLE_CONSOLE";
    pub const LOGGING_MIN_LEVEL: &str = "JINJA_LOGGING_MIN_LEVEL";
    pub const LOGGING_LOG_PERFORMANCE: &str = "JINJA_LOGGING_LOG_PERFORMANCE";
    pub const LOGGING_CARGO_STYLE: &str = "JINJA_LOGGING_CARGO_STYLE";
    pub const LOGGING_INCLUDE_FILE_CONTEXT: &str = "JINJA_LOGGING_INCLUDE_FILE_CONTEXT";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_falls_back_on_missing_or_invalid() {
        assert!(env_or("JINJA_TEST_SURELY_UNSET_VARIABLE", true));
        assert_eq!(env_or("JINJA_TEST_SURELY_UNSET_VARIABLE", 7usize), 7);
    }

    #[test]
    fn test_runtime_config_serializes() {
        let config = RuntimeConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"enable_facts_cache\""));
        assert!(json.contains("\"min_log_level\""));
    }

    #[test]
    fn test_env_var_names_are_prefixed() {
        for name in [
            env_vars::LOGGING_MIN_LEVEL,
            env_vars::ANALYSIS_ENABLE_CACHE,
            env_vars::SYNTAX_LOG_DIAGNOSTICS,
        ] {
            assert!(name.starts_with("JINJA_"));
        }
    }
}
