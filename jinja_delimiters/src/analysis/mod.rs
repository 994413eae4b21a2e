//! Template facts: the names a template uses and defines
//!
//! [`collect_facts`] walks a parsed template. [`FactsCache`] keeps the result
//! per file until the file changes.

pub mod cache;
pub mod facts;

pub use cache::{CacheStatistics, FactsCache};
pub use facts::{collect_facts, FactsCollector, TemplateFacts};

use crate::config::compile_time::analysis::*;
use crate::logging::codes;
use crate::logging::Code;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Too many {set} (limit {limit}); further names are dropped")]
    FactsLimitExceeded { set: &'static str, limit: usize },

    #[error("Facts cache is unavailable after a worker panic")]
    CacheUnavailable,
}

impl AnalysisError {
    pub const fn error_code(&self) -> Code {
        match self {
            Self::FactsLimitExceeded { .. } => codes::analysis::FACTS_LIMIT_EXCEEDED,
            Self::CacheUnavailable => codes::analysis::CACHE_UNAVAILABLE,
        }
    }

    /// Analysis failures never stop a file
    pub const fn is_recoverable(&self) -> bool {
        true
    }
}

/// Check that analysis codes are registered and limits are usable
pub fn validate_analysis() -> Result<(), String> {
    for code in [codes::analysis::FACTS_LIMIT_EXCEEDED, codes::analysis::CACHE_UNAVAILABLE] {
        if codes::get_error_metadata(code.as_str()).is_none() {
            return Err(format!(
                "Analysis error code {} not found in metadata registry",
                code.as_str()
            ));
        }
    }

    if MAX_CACHED_FILES == 0 {
        return Err("MAX_CACHED_FILES cannot be zero".to_string());
    }
    if MAX_FACTS_PER_SET == 0 {
        return Err("MAX_FACTS_PER_SET cannot be zero".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_error_codes() {
        let error = AnalysisError::FactsLimitExceeded { set: "variables", limit: 3 };
        assert_eq!(error.error_code().as_str(), "E060");
        assert!(error.to_string().contains("variables"));
        assert_matches!(AnalysisError::CacheUnavailable.error_code().as_str(), "E061");
        assert!(AnalysisError::CacheUnavailable.is_recoverable());
    }

    #[test]
    fn test_validate_analysis() {
        assert!(validate_analysis().is_ok());
    }
}
