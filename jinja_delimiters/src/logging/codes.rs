//! Error and success codes with their classification metadata
//!
//! Every code the crate logs is declared here, together with the severity,
//! recoverability and recommended action reported alongside it.

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// CODE WRAPPER TYPE
// ============================================================================

/// Stable identifier attached to every log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ERROR CLASSIFICATION TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

/// Complete metadata for a code
#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    pub code: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub recoverable: bool,
    pub requires_halt: bool,
    pub description: &'static str,
    pub recommended_action: &'static str,
}

impl ErrorMetadata {
    pub fn new(
        code: &'static str,
        category: &'static str,
        severity: Severity,
        recoverable: bool,
        requires_halt: bool,
        description: &'static str,
        recommended_action: &'static str,
    ) -> Self {
        Self {
            code,
            category,
            severity,
            recoverable,
            requires_halt,
            description,
            recommended_action,
        }
    }
}

// ============================================================================
// ERROR CODE CONSTANTS
// ============================================================================

pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("ERR001");
    pub const INITIALIZATION_FAILURE: Code = Code::new("ERR002");
}

pub mod file_processing {
    use super::Code;

    pub const FILE_NOT_FOUND: Code = Code::new("E005");
    pub const INVALID_EXTENSION: Code = Code::new("E006");
    pub const FILE_TOO_LARGE: Code = Code::new("E007");
    pub const TOO_MANY_LINES: Code = Code::new("E008");
    pub const PERMISSION_DENIED: Code = Code::new("E009");
    pub const INVALID_ENCODING: Code = Code::new("E010");
    pub const IO_ERROR: Code = Code::new("E011");
    pub const INVALID_PATH: Code = Code::new("E012");
}

/// Delimiter configuration and settings store
pub mod configuration {
    use super::Code;

    pub const EMPTY_DELIMITER: Code = Code::new("E013");
    pub const DELIMITER_TOO_LONG: Code = Code::new("E014");
    pub const DUPLICATE_DELIMITER: Code = Code::new("E015");
    pub const OVERLAPPING_DELIMITER: Code = Code::new("E016");
    pub const SETTINGS_IO_ERROR: Code = Code::new("E017");
    pub const SETTINGS_FORMAT_ERROR: Code = Code::new("E018");
}

pub mod lexical {
    use super::Code;

    pub const BAD_CHARACTER: Code = Code::new("E020");
    pub const INVALID_RANGE: Code = Code::new("E021");
    pub const TOO_MANY_TOKENS: Code = Code::new("E027");
}

pub mod syntax {
    use super::Code;

    pub const MISSING_BLOCK_END: Code = Code::new("E040");
    pub const MISSING_VARIABLE_END: Code = Code::new("E041");
    pub const MISSING_COMMENT_END: Code = Code::new("E042");
    pub const UNCLOSED_GROUP: Code = Code::new("E043");
    pub const EXPECTED_EXPRESSION: Code = Code::new("E044");
    pub const EXPECTED_NAME: Code = Code::new("E045");
    pub const UNCLOSED_BLOCK: Code = Code::new("E046");
    pub const UNEXPECTED_TOKEN: Code = Code::new("E050");
    pub const MAX_RECURSION_DEPTH: Code = Code::new("E087");
}

/// Template facts and the facts cache
pub mod analysis {
    use super::Code;

    pub const FACTS_LIMIT_EXCEEDED: Code = Code::new("E060");
    pub const CACHE_UNAVAILABLE: Code = Code::new("E061");
}

pub mod batch {
    use super::Code;

    pub const NO_FILES_FOUND: Code = Code::new("E070");
    pub const TOO_MANY_FILES: Code = Code::new("E071");
    pub const WORKER_FAILURE: Code = Code::new("E072");
}

// ============================================================================
// SUCCESS CODE CONSTANTS
// ============================================================================

pub mod success {
    use super::Code;

    pub const OPERATION_COMPLETED_SUCCESSFULLY: Code = Code::new("I001");
    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("I004");

    pub const FILE_PROCESSING_SUCCESS: Code = Code::new("I006");
    pub const CONFIGURATION_VALIDATED: Code = Code::new("I013");
    pub const TOKENIZATION_COMPLETE: Code = Code::new("I020");
    pub const PARSE_COMPLETE: Code = Code::new("I040");
    pub const FACTS_COLLECTED: Code = Code::new("I060");
    pub const CACHE_HIT: Code = Code::new("I061");
    pub const BATCH_COMPLETE: Code = Code::new("I070");
}

// ============================================================================
// ERROR METADATA REGISTRY
// ============================================================================

static ERROR_REGISTRY: OnceLock<HashMap<&'static str, ErrorMetadata>> = OnceLock::new();

fn get_error_registry() -> &'static HashMap<&'static str, ErrorMetadata> {
    ERROR_REGISTRY.get_or_init(|| {
        use Severity::*;

        let entries = [
            // System
            ErrorMetadata::new(
                "ERR001",
                "System",
                Critical,
                false,
                true,
                "Critical internal error",
                "File a bug report with the template that triggered it",
            ),
            ErrorMetadata::new(
                "ERR002",
                "System",
                Critical,
                false,
                true,
                "Logging or configuration initialization failure",
                "Check environment variables and the build profile",
            ),
            // File processing
            ErrorMetadata::new(
                "E005",
                "FileProcessing",
                Medium,
                false,
                true,
                "Template file not found",
                "Check the path and ensure the file exists",
            ),
            ErrorMetadata::new(
                "E006",
                "FileProcessing",
                Low,
                true,
                false,
                "File does not have a recognised template extension",
                "Rename the file or disable the extension requirement",
            ),
            ErrorMetadata::new(
                "E007",
                "FileProcessing",
                Medium,
                false,
                true,
                "Template exceeds the maximum file size",
                "Split the template or raise max_file_size in the build profile",
            ),
            ErrorMetadata::new(
                "E008",
                "FileProcessing",
                Medium,
                false,
                true,
                "Template exceeds the maximum line count",
                "Split the template or raise max_line_count_for_analysis",
            ),
            ErrorMetadata::new(
                "E009",
                "FileProcessing",
                Medium,
                false,
                true,
                "Permission denied reading template",
                "Check file permissions",
            ),
            ErrorMetadata::new(
                "E010",
                "FileProcessing",
                Medium,
                false,
                true,
                "Template is not valid UTF-8",
                "Re-encode the file as UTF-8",
            ),
            ErrorMetadata::new(
                "E011",
                "FileProcessing",
                High,
                false,
                true,
                "I/O error while reading template",
                "Check disk and file system health",
            ),
            ErrorMetadata::new(
                "E012",
                "FileProcessing",
                Medium,
                false,
                true,
                "Path is not a regular file",
                "Pass a template file or a directory to batch mode",
            ),
            // Configuration
            ErrorMetadata::new(
                "E013",
                "Configuration",
                High,
                false,
                true,
                "Required delimiter is empty",
                "Set all six block, variable and comment delimiters",
            ),
            ErrorMetadata::new(
                "E014",
                "Configuration",
                High,
                false,
                true,
                "Delimiter is longer than the allowed maximum",
                "Use a shorter delimiter",
            ),
            ErrorMetadata::new(
                "E015",
                "Configuration",
                High,
                false,
                true,
                "Two delimiters have the same spelling",
                "Give every delimiter a distinct spelling",
            ),
            ErrorMetadata::new(
                "E016",
                "Configuration",
                High,
                false,
                true,
                "One delimiter is contained in another",
                "Choose delimiters where none is a substring of another",
            ),
            ErrorMetadata::new(
                "E017",
                "Configuration",
                Medium,
                false,
                true,
                "Delimiter settings file could not be read or written",
                "Check the settings path and permissions",
            ),
            ErrorMetadata::new(
                "E018",
                "Configuration",
                Medium,
                false,
                true,
                "Delimiter settings file is not valid TOML",
                "Fix the settings file syntax",
            ),
            // Lexical
            ErrorMetadata::new(
                "E020",
                "Lexical",
                Low,
                true,
                false,
                "Character not valid inside a block or variable",
                "Remove the character or move it outside the tag",
            ),
            ErrorMetadata::new(
                "E021",
                "Lexical",
                High,
                false,
                true,
                "Tokenizer range lies outside the buffer",
                "Pass start and end offsets on character boundaries",
            ),
            ErrorMetadata::new(
                "E027",
                "Lexical",
                High,
                false,
                true,
                "Template produced more tokens than allowed",
                "Split the template or raise max_token_count",
            ),
            // Syntax
            ErrorMetadata::new(
                "E040",
                "Syntax",
                Medium,
                true,
                false,
                "Block tag is not closed",
                "Add the block end delimiter",
            ),
            ErrorMetadata::new(
                "E041",
                "Syntax",
                Medium,
                true,
                false,
                "Variable tag is not closed",
                "Add the variable end delimiter",
            ),
            ErrorMetadata::new(
                "E042",
                "Syntax",
                Medium,
                true,
                false,
                "Comment is not closed",
                "Add the comment end delimiter",
            ),
            ErrorMetadata::new(
                "E043",
                "Syntax",
                Medium,
                true,
                false,
                "Bracket, parenthesis or brace group is not closed",
                "Add the missing closing character",
            ),
            ErrorMetadata::new(
                "E044",
                "Syntax",
                Medium,
                true,
                false,
                "Expression expected",
                "Complete the expression",
            ),
            ErrorMetadata::new(
                "E045",
                "Syntax",
                Medium,
                true,
                false,
                "Name expected",
                "Provide an identifier",
            ),
            ErrorMetadata::new(
                "E046",
                "Syntax",
                Medium,
                true,
                false,
                "Statement block has no matching end tag",
                "Add the end tag for the opening statement",
            ),
            ErrorMetadata::new(
                "E050",
                "Syntax",
                Medium,
                true,
                false,
                "Unexpected token",
                "Check the tag syntax near the reported location",
            ),
            ErrorMetadata::new(
                "E087",
                "Syntax",
                High,
                true,
                false,
                "Expression nesting exceeds the maximum parse depth",
                "Reduce nesting or raise max_parse_depth",
            ),
            // Analysis
            ErrorMetadata::new(
                "E060",
                "Analysis",
                Low,
                true,
                false,
                "Too many distinct names collected for a template",
                "Raise max_facts_per_set",
            ),
            ErrorMetadata::new(
                "E061",
                "Analysis",
                Medium,
                true,
                false,
                "Facts cache could not be used",
                "Facts are recomputed; no action required",
            ),
            // Batch
            ErrorMetadata::new(
                "E070",
                "Batch",
                Medium,
                false,
                true,
                "No template files found",
                "Check the directory and the extension filter",
            ),
            ErrorMetadata::new(
                "E071",
                "Batch",
                Medium,
                false,
                true,
                "Too many files for one batch",
                "Process a smaller directory or raise max_files_per_batch",
            ),
            ErrorMetadata::new(
                "E072",
                "Batch",
                High,
                false,
                true,
                "A worker thread failed",
                "Re-run sequentially to isolate the failing file",
            ),
            // Success
            ErrorMetadata::new(
                "I001",
                "Success",
                Low,
                true,
                false,
                "Operation completed successfully",
                "None",
            ),
            ErrorMetadata::new(
                "I004",
                "Success",
                Low,
                true,
                false,
                "Logging initialized",
                "None",
            ),
            ErrorMetadata::new(
                "I006",
                "Success",
                Low,
                true,
                false,
                "Template file read",
                "Continue to tokenization",
            ),
            ErrorMetadata::new(
                "I013",
                "Success",
                Low,
                true,
                false,
                "Delimiter configuration validated",
                "Continue to tokenization",
            ),
            ErrorMetadata::new(
                "I020",
                "Success",
                Low,
                true,
                false,
                "Tokenization complete",
                "Continue to parsing",
            ),
            ErrorMetadata::new(
                "I040",
                "Success",
                Low,
                true,
                false,
                "Syntax tree built",
                "Continue to fact collection",
            ),
            ErrorMetadata::new(
                "I060",
                "Success",
                Low,
                true,
                false,
                "Template facts collected",
                "None",
            ),
            ErrorMetadata::new(
                "I061",
                "Success",
                Low,
                true,
                false,
                "Template facts served from cache",
                "None",
            ),
            ErrorMetadata::new(
                "I070",
                "Success",
                Low,
                true,
                false,
                "Batch processing complete",
                "None",
            ),
        ];

        entries.into_iter().map(|meta| (meta.code, meta)).collect()
    })
}

// ============================================================================
// CLASSIFICATION FUNCTIONS
// ============================================================================

pub fn get_error_metadata(code: &str) -> Option<&'static ErrorMetadata> {
    get_error_registry().get(code)
}

pub fn get_severity(code: &str) -> Severity {
    get_error_metadata(code)
        .map(|metadata| metadata.severity)
        .unwrap_or(Severity::Medium)
}

pub fn is_recoverable(code: &str) -> bool {
    get_error_metadata(code)
        .map(|metadata| metadata.recoverable)
        .unwrap_or(true)
}

pub fn requires_halt(code: &str) -> bool {
    get_error_metadata(code)
        .map(|metadata| metadata.requires_halt)
        .unwrap_or(false)
}

pub fn get_description(code: &str) -> &'static str {
    get_error_metadata(code)
        .map(|metadata| metadata.description)
        .unwrap_or("Unknown error")
}

pub fn get_action(code: &str) -> &'static str {
    get_error_metadata(code)
        .map(|metadata| metadata.recommended_action)
        .unwrap_or("No specific action available")
}

pub fn get_category(code: &str) -> &'static str {
    get_error_metadata(code)
        .map(|metadata| metadata.category)
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_declared_code_has_metadata() {
        let declared = [
            system::INTERNAL_ERROR,
            system::INITIALIZATION_FAILURE,
            file_processing::FILE_NOT_FOUND,
            file_processing::INVALID_EXTENSION,
            file_processing::FILE_TOO_LARGE,
            file_processing::TOO_MANY_LINES,
            file_processing::PERMISSION_DENIED,
            file_processing::INVALID_ENCODING,
            file_processing::IO_ERROR,
            file_processing::INVALID_PATH,
            configuration::EMPTY_DELIMITER,
            configuration::DELIMITER_TOO_LONG,
            configuration::DUPLICATE_DELIMITER,
            configuration::OVERLAPPING_DELIMITER,
            configuration::SETTINGS_IO_ERROR,
            configuration::SETTINGS_FORMAT_ERROR,
            lexical::BAD_CHARACTER,
            lexical::INVALID_RANGE,
            lexical::TOO_MANY_TOKENS,
            syntax::MISSING_BLOCK_END,
            syntax::MISSING_VARIABLE_END,
            syntax::MISSING_COMMENT_END,
            syntax::UNCLOSED_GROUP,
            syntax::EXPECTED_EXPRESSION,
            syntax::EXPECTED_NAME,
            syntax::UNCLOSED_BLOCK,
            syntax::UNEXPECTED_TOKEN,
            syntax::MAX_RECURSION_DEPTH,
            analysis::FACTS_LIMIT_EXCEEDED,
            analysis::CACHE_UNAVAILABLE,
            batch::NO_FILES_FOUND,
            batch::TOO_MANY_FILES,
            batch::WORKER_FAILURE,
            success::OPERATION_COMPLETED_SUCCESSFULLY,
            success::SYSTEM_INITIALIZATION_COMPLETED,
            success::FILE_PROCESSING_SUCCESS,
            success::CONFIGURATION_VALIDATED,
            success::TOKENIZATION_COMPLETE,
            success::PARSE_COMPLETE,
            success::FACTS_COLLECTED,
            success::CACHE_HIT,
            success::BATCH_COMPLETE,
        ];

        for code in declared {
            assert!(
                get_error_metadata(code.as_str()).is_some(),
                "missing metadata for {}",
                code
            );
        }
    }

    #[test]
    fn test_syntax_codes_are_recoverable() {
        assert!(is_recoverable(syntax::MISSING_VARIABLE_END.as_str()));
        assert!(!requires_halt(syntax::EXPECTED_EXPRESSION.as_str()));
        assert_eq!(get_category(syntax::UNCLOSED_GROUP.as_str()), "Syntax");
    }

    #[test]
    fn test_unknown_code_defaults() {
        assert_eq!(get_description("Z999"), "Unknown error");
        assert_eq!(get_category("Z999"), "Unknown");
        assert_eq!(get_severity("Z999"), Severity::Medium);
    }
}
