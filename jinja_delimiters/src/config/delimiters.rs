//! Delimiter settings
//!
//! [`DelimiterConfig`] is the snapshot handed to the tokenizer for one lexing
//! pass. The tokenizer trusts it; [`DelimiterConfig::validate`] is the gate
//! callers run first.

use crate::config::compile_time::lexical::MAX_DELIMITER_LENGTH;
use crate::logging::codes;
use crate::logging::Code;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_BLOCK_START: &str = "{%";
pub const DEFAULT_BLOCK_END: &str = "%}";
pub const DEFAULT_VARIABLE_START: &str = "{{";
pub const DEFAULT_VARIABLE_END: &str = "}}";
pub const DEFAULT_COMMENT_START: &str = "{#";
pub const DEFAULT_COMMENT_END: &str = "#}";

#[derive(Debug, Error)]
pub enum DelimiterError {
    #[error("{name} cannot be empty")]
    Empty { name: &'static str },

    #[error("{name} is too long ({length} characters, max {max})")]
    TooLong {
        name: &'static str,
        length: usize,
        max: usize,
    },

    #[error("{first} and {second} cannot be the same: \"{value}\"")]
    Duplicate {
        first: &'static str,
        second: &'static str,
        value: String,
    },

    #[error("{outer} (\"{outer_value}\") contains {inner} (\"{inner_value}\")")]
    Overlapping {
        outer: &'static str,
        outer_value: String,
        inner: &'static str,
        inner_value: String,
    },

    #[error("Cannot access delimiter settings '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid delimiter settings '{path}': {message}")]
    Format { path: PathBuf, message: String },
}

impl DelimiterError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::Empty { .. } => codes::configuration::EMPTY_DELIMITER,
            Self::TooLong { .. } => codes::configuration::DELIMITER_TOO_LONG,
            Self::Duplicate { .. } => codes::configuration::DUPLICATE_DELIMITER,
            Self::Overlapping { .. } => codes::configuration::OVERLAPPING_DELIMITER,
            Self::Io { .. } => codes::configuration::SETTINGS_IO_ERROR,
            Self::Format { .. } => codes::configuration::SETTINGS_FORMAT_ERROR,
        }
    }
}

/// The eight configurable delimiter strings.
///
/// Line prefixes may be empty, which disables line statements or line
/// comments respectively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DelimiterConfig {
    pub block_start: String,
    pub block_end: String,
    pub variable_start: String,
    pub variable_end: String,
    pub comment_start: String,
    pub comment_end: String,
    pub line_statement_prefix: String,
    pub line_comment_prefix: String,
}

impl Default for DelimiterConfig {
    fn default() -> Self {
        Self {
            block_start: DEFAULT_BLOCK_START.to_string(),
            block_end: DEFAULT_BLOCK_END.to_string(),
            variable_start: DEFAULT_VARIABLE_START.to_string(),
            variable_end: DEFAULT_VARIABLE_END.to_string(),
            comment_start: DEFAULT_COMMENT_START.to_string(),
            comment_end: DEFAULT_COMMENT_END.to_string(),
            line_statement_prefix: String::new(),
            line_comment_prefix: String::new(),
        }
    }
}

impl DelimiterConfig {
    /// Defaults with the given block and variable delimiters
    pub fn with_tags(block: (&str, &str), variable: (&str, &str)) -> Self {
        Self {
            block_start: block.0.to_string(),
            block_end: block.1.to_string(),
            variable_start: variable.0.to_string(),
            variable_end: variable.1.to_string(),
            ..Self::default()
        }
    }

    pub fn with_comments(mut self, start: &str, end: &str) -> Self {
        self.comment_start = start.to_string();
        self.comment_end = end.to_string();
        self
    }

    pub fn with_line_prefixes(mut self, statement: &str, comment: &str) -> Self {
        self.line_statement_prefix = statement.to_string();
        self.line_comment_prefix = comment.to_string();
        self
    }

    /// Display name and value of each setting, required delimiters first
    pub fn entries(&self) -> [(&'static str, &str); 8] {
        [
            ("Block Start", self.block_start.as_str()),
            ("Block End", self.block_end.as_str()),
            ("Variable Start", self.variable_start.as_str()),
            ("Variable End", self.variable_end.as_str()),
            ("Comment Start", self.comment_start.as_str()),
            ("Comment End", self.comment_end.as_str()),
            ("Line Statement Prefix", self.line_statement_prefix.as_str()),
            ("Line Comment Prefix", self.line_comment_prefix.as_str()),
        ]
    }

    /// Copy with surrounding whitespace removed from every value
    pub fn trimmed(&self) -> Self {
        Self {
            block_start: self.block_start.trim().to_string(),
            block_end: self.block_end.trim().to_string(),
            variable_start: self.variable_start.trim().to_string(),
            variable_end: self.variable_end.trim().to_string(),
            comment_start: self.comment_start.trim().to_string(),
            comment_end: self.comment_end.trim().to_string(),
            line_statement_prefix: self.line_statement_prefix.trim().to_string(),
            line_comment_prefix: self.line_comment_prefix.trim().to_string(),
        }
    }

    /// Check the configuration is usable for tokenization.
    ///
    /// The six block/variable/comment delimiters must be non-blank. Every
    /// value is at most `MAX_DELIMITER_LENGTH` characters. Among non-empty
    /// values no two may be equal and none may contain another.
    pub fn validate(&self) -> Result<(), DelimiterError> {
        let entries = self.entries();

        for (index, (name, value)) in entries.iter().copied().enumerate() {
            if index < 6 && value.trim().is_empty() {
                return Err(DelimiterError::Empty { name });
            }
            let length = value.chars().count();
            if length > MAX_DELIMITER_LENGTH {
                return Err(DelimiterError::TooLong {
                    name,
                    length,
                    max: MAX_DELIMITER_LENGTH,
                });
            }
        }

        let active: Vec<(&'static str, &str)> = entries
            .iter()
            .copied()
            .filter(|(_, value)| !value.is_empty())
            .collect();

        for (i, &(first, a)) in active.iter().enumerate() {
            for &(second, b) in &active[i + 1..] {
                if a == b {
                    return Err(DelimiterError::Duplicate {
                        first,
                        second,
                        value: a.to_string(),
                    });
                }
            }
        }

        for (i, &(name_a, a)) in active.iter().enumerate() {
            for &(name_b, b) in &active[i + 1..] {
                let (outer, outer_value, inner, inner_value) = if a.contains(b) {
                    (name_a, a, name_b, b)
                } else if b.contains(a) {
                    (name_b, b, name_a, a)
                } else {
                    continue;
                };
                return Err(DelimiterError::Overlapping {
                    outer,
                    outer_value: outer_value.to_string(),
                    inner,
                    inner_value: inner_value.to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// True when any value differs from the stock Jinja2 spelling
    pub fn is_using_custom_delimiters(&self) -> bool {
        *self != Self::default()
    }

    pub fn line_statements_enabled(&self) -> bool {
        !self.line_statement_prefix.is_empty()
    }

    pub fn line_comments_enabled(&self) -> bool {
        !self.line_comment_prefix.is_empty()
    }

    // ------------------------------------------------------------------
    // Settings store
    // ------------------------------------------------------------------

    /// Load settings from a TOML file. Missing keys keep their defaults and
    /// values are trimmed; the result is not validated.
    pub fn load(path: &Path) -> Result<Self, DelimiterError> {
        let content = fs::read_to_string(path).map_err(|source| DelimiterError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&content)
            .map_err(|message| DelimiterError::Format {
                path: path.to_path_buf(),
                message,
            })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str::<Self>(content)
            .map(|config| config.trimmed())
            .map_err(|e| e.to_string())
    }

    /// Write settings as TOML, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<(), DelimiterError> {
        let content = toml::to_string_pretty(self).map_err(|e| DelimiterError::Format {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| DelimiterError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        fs::write(path, content).map_err(|source| DelimiterError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
