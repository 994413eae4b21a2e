//! Template file reading with compile-time limits

mod processor;

use crate::config::compile_time::file_processing::{
    LARGE_FILE_THRESHOLD, MAX_FILE_SIZE, MAX_LINE_COUNT_FOR_ANALYSIS,
};
use crate::config::runtime::FileProcessorPreferences;
use crate::log_debug;
use std::path::Path;

pub use processor::{
    is_template_extension, FileMetadata, FileProcessingResult, FileProcessor, FileProcessorError,
    TEMPLATE_EXTENSIONS,
};

/// Read a template with default settings
pub fn process_file(file_path: &Path) -> Result<FileProcessingResult, FileProcessorError> {
    FileProcessor::new().process_file(file_path)
}

pub fn create_processor() -> FileProcessor {
    FileProcessor::new()
}

pub fn create_processor_from_preferences(prefs: &FileProcessorPreferences) -> FileProcessor {
    FileProcessor::from_preferences(prefs)
}

pub fn should_halt_on_error(error: &FileProcessorError) -> bool {
    error.requires_halt()
}

/// The compile-time size limit; it cannot be changed at runtime
pub fn get_max_file_size() -> u64 {
    MAX_FILE_SIZE
}

pub fn get_large_file_threshold() -> u64 {
    LARGE_FILE_THRESHOLD
}

/// Check the file processing codes against the registry (startup)
pub fn init_file_processor_logging() -> Result<(), String> {
    let file_codes = [
        crate::logging::codes::file_processing::FILE_NOT_FOUND,
        crate::logging::codes::file_processing::INVALID_EXTENSION,
        crate::logging::codes::file_processing::FILE_TOO_LARGE,
        crate::logging::codes::file_processing::TOO_MANY_LINES,
        crate::logging::codes::file_processing::PERMISSION_DENIED,
        crate::logging::codes::file_processing::INVALID_ENCODING,
        crate::logging::codes::file_processing::IO_ERROR,
        crate::logging::codes::file_processing::INVALID_PATH,
    ];

    for code in &file_codes {
        if crate::logging::codes::get_error_metadata(code.as_str()).is_none() {
            return Err(format!(
                "File processor error code {} not found in metadata registry",
                code.as_str()
            ));
        }
    }

    log_debug!("File processor compile-time configuration loaded",
        "max_file_size" => MAX_FILE_SIZE,
        "large_file_threshold" => LARGE_FILE_THRESHOLD,
        "max_line_count" => MAX_LINE_COUNT_FOR_ANALYSIS);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_module_api() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("index.jinja");
        fs::write(&file_path, "{% block body %}{% endblock %}\n").unwrap();

        let result = process_file(&file_path).unwrap();
        assert_eq!(result.metadata.extension.as_deref(), Some("jinja"));
    }

    #[test]
    fn test_create_processor_from_preferences() {
        let prefs = FileProcessorPreferences {
            require_template_extension: true,
            enable_performance_logging: true,
        };
        assert!(create_processor_from_preferences(&prefs).require_template_extension);
        assert!(!create_processor().require_template_extension);
    }

    #[test]
    fn test_error_helpers() {
        let error = FileProcessorError::FileNotFound {
            path: "page.html".to_string(),
        };
        assert!(should_halt_on_error(&error));
    }

    #[test]
    fn test_compile_time_constants_access() {
        assert_eq!(get_max_file_size(), MAX_FILE_SIZE);
        assert_eq!(get_large_file_threshold(), LARGE_FILE_THRESHOLD);
        assert!(get_large_file_threshold() <= get_max_file_size());
        assert_eq!(MAX_LINE_COUNT_FOR_ANALYSIS, 200_000);
    }

    #[test]
    fn test_init_logging() {
        assert!(init_file_processor_logging().is_ok());
    }
}
