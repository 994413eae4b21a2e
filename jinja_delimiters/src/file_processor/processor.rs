//! Template file reading with compile-time limits and global logging

use crate::config::compile_time::file_processing::{
    LARGE_FILE_THRESHOLD, MAX_FILE_SIZE, MAX_LINE_COUNT_FOR_ANALYSIS,
};
use crate::config::runtime::FileProcessorPreferences;
use crate::logging::codes;
use crate::{log_debug, log_error, log_success, log_warning};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

/// Extensions recognised as templates (lowercase, without the dot)
pub const TEMPLATE_EXTENSIONS: &[&str] = &["j2", "jinja", "jinja2", "html", "htm", "txt"];

pub fn is_template_extension(extension: Option<&str>) -> bool {
    extension.is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext))
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum FileProcessorError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid file extension: expected a template extension, found {extension:?}")]
    InvalidExtension { extension: Option<String> },

    #[error("File too large: {size} bytes (max: {max_size})")]
    FileTooLarge { size: u64, max_size: u64 },

    #[error("File exceeds maximum line count: {lines} (max: {max_lines})")]
    TooManyLines { lines: usize, max_lines: usize },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("Invalid UTF-8 encoding in file: {path}")]
    InvalidEncoding { path: String },

    #[error("I/O error reading file: {message}")]
    IoError { message: String },

    #[error("Invalid file path: {path}")]
    InvalidPath { path: String },
}

impl FileProcessorError {
    pub fn error_code(&self) -> crate::logging::Code {
        match self {
            FileProcessorError::FileNotFound { .. } => codes::file_processing::FILE_NOT_FOUND,
            FileProcessorError::InvalidExtension { .. } => {
                codes::file_processing::INVALID_EXTENSION
            }
            FileProcessorError::FileTooLarge { .. } => codes::file_processing::FILE_TOO_LARGE,
            FileProcessorError::TooManyLines { .. } => codes::file_processing::TOO_MANY_LINES,
            FileProcessorError::PermissionDenied { .. } => {
                codes::file_processing::PERMISSION_DENIED
            }
            FileProcessorError::InvalidEncoding { .. } => codes::file_processing::INVALID_ENCODING,
            FileProcessorError::IoError { .. } => codes::file_processing::IO_ERROR,
            FileProcessorError::InvalidPath { .. } => codes::file_processing::INVALID_PATH,
        }
    }

    pub fn requires_halt(&self) -> bool {
        codes::requires_halt(self.error_code().as_str())
    }

    pub fn severity(&self) -> &'static str {
        codes::get_severity(self.error_code().as_str()).as_str()
    }

    pub fn category(&self) -> &'static str {
        codes::get_category(self.error_code().as_str())
    }

    pub fn is_recoverable(&self) -> bool {
        codes::is_recoverable(self.error_code().as_str())
    }
}

/// File metadata collected during processing
#[derive(Debug, Clone, Serialize)]
pub struct FileMetadata {
    /// Canonical file path
    pub path: PathBuf,
    pub size: u64,
    /// Lowercased extension, if any
    pub extension: Option<String>,
    pub line_count: usize,
    pub is_template_file: bool,
    #[serde(skip)]
    pub modified: Option<SystemTime>,
}

impl FileMetadata {
    /// Uses the compile-time threshold
    pub fn is_large_file(&self) -> bool {
        self.size > LARGE_FILE_THRESHOLD
    }

    pub fn size_kib(&self) -> f64 {
        self.size as f64 / 1024.0
    }
}

/// Template source and its metadata
#[derive(Debug, Clone)]
pub struct FileProcessingResult {
    pub source: String,
    pub metadata: FileMetadata,
    pub processing_duration: Duration,
}

impl FileProcessingResult {
    /// Only whitespace, or nothing at all
    pub fn is_effectively_empty(&self) -> bool {
        self.source.trim().is_empty()
    }
}

/// Map an I/O failure on `path` and report it
fn io_failure(path: &Path, action: &str, e: std::io::Error) -> FileProcessorError {
    let error = if e.kind() == std::io::ErrorKind::PermissionDenied {
        FileProcessorError::PermissionDenied {
            path: path.display().to_string(),
        }
    } else {
        FileProcessorError::IoError {
            message: format!("{} '{}': {}", action, path.display(), e),
        }
    };
    log_error!(error.error_code(), action, "path" => path.display(), "io_error" => e);
    error
}

/// Reads templates; limits are compile-time, the rest comes from preferences
#[derive(Debug, Clone)]
pub struct FileProcessor {
    pub require_template_extension: bool,
    pub enable_performance_logging: bool,
}

impl FileProcessor {
    pub fn new() -> Self {
        Self {
            require_template_extension: false,
            enable_performance_logging: true,
        }
    }

    pub fn from_preferences(prefs: &FileProcessorPreferences) -> Self {
        Self {
            require_template_extension: prefs.require_template_extension,
            enable_performance_logging: prefs.enable_performance_logging,
        }
    }

    pub fn with_template_extension_required(mut self, required: bool) -> Self {
        self.require_template_extension = required;
        self
    }

    pub fn with_performance_logging(mut self, enabled: bool) -> Self {
        self.enable_performance_logging = enabled;
        self
    }

    pub fn max_file_size() -> u64 {
        MAX_FILE_SIZE
    }

    pub fn large_file_threshold() -> u64 {
        LARGE_FILE_THRESHOLD
    }

    /// Read a template and collect its metadata.
    ///
    /// Empty files are accepted; they tokenize to an empty stream.
    pub fn process_file(&self, file_path: &Path) -> Result<FileProcessingResult, FileProcessorError> {
        let start_time = Instant::now();
        let display = file_path.display().to_string();

        log_debug!("Starting file processing", "file" => display);

        let path = self.validate_path(file_path, &display)?;
        let mut metadata = self.get_metadata(&path)?;
        self.validate_file(&metadata, &display)?;
        let source = self.read_file(&path, &display)?;

        let line_count = source.lines().count();
        if line_count > MAX_LINE_COUNT_FOR_ANALYSIS {
            let error = FileProcessorError::TooManyLines {
                lines: line_count,
                max_lines: MAX_LINE_COUNT_FOR_ANALYSIS,
            };
            log_error!(error.error_code(), "File exceeds maximum line count for safe analysis",
                "file" => display,
                "lines" => line_count,
                "max_lines" => MAX_LINE_COUNT_FOR_ANALYSIS);
            return Err(error);
        }
        metadata.line_count = line_count;

        let result = FileProcessingResult {
            source,
            metadata,
            processing_duration: start_time.elapsed(),
        };

        self.log_processing_success(&result, &display);
        Ok(result)
    }

    fn log_processing_success(&self, result: &FileProcessingResult, file_path: &str) {
        let duration_ms = format!("{:.2}", result.processing_duration.as_secs_f64() * 1000.0);

        if !self.enable_performance_logging {
            log_success!(codes::success::FILE_PROCESSING_SUCCESS, "Template read",
                "file" => file_path,
                "lines" => result.metadata.line_count
            );
            return;
        }

        log_success!(codes::success::FILE_PROCESSING_SUCCESS, "Template read",
            "file" => file_path,
            "lines" => result.metadata.line_count,
            "size_kib" => format!("{:.1}", result.metadata.size_kib()),
            "large" => result.metadata.is_large_file(),
            "duration_ms" => duration_ms
        );
    }

    fn validate_path(&self, path: &Path, display: &str) -> Result<PathBuf, FileProcessorError> {
        let error = if path.as_os_str().is_empty() || (path.exists() && !path.is_file()) {
            FileProcessorError::InvalidPath {
                path: display.to_string(),
            }
        } else if !path.exists() {
            FileProcessorError::FileNotFound {
                path: display.to_string(),
            }
        } else {
            return path
                .canonicalize()
                .map_err(|e| io_failure(path, "Failed to resolve path", e));
        };

        log_error!(error.error_code(), &error.to_string());
        Err(error)
    }

    fn get_metadata(&self, path: &Path) -> Result<FileMetadata, FileProcessorError> {
        let metadata =
            fs::metadata(path).map_err(|e| io_failure(path, "Failed to read metadata for", e))?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);

        Ok(FileMetadata {
            path: path.to_path_buf(),
            size: metadata.len(),
            is_template_file: is_template_extension(extension.as_deref()),
            extension,
            // Filled in after reading
            line_count: 0,
            modified: metadata.modified().ok(),
        })
    }

    fn validate_file(&self, metadata: &FileMetadata, file_path: &str) -> Result<(), FileProcessorError> {
        if metadata.size > MAX_FILE_SIZE {
            let error = FileProcessorError::FileTooLarge {
                size: metadata.size,
                max_size: MAX_FILE_SIZE,
            };
            log_error!(error.error_code(), &error.to_string(), "file" => file_path);
            return Err(error);
        }

        if metadata.is_template_file {
            return Ok(());
        }

        let error = FileProcessorError::InvalidExtension {
            extension: metadata.extension.clone(),
        };
        let extension = metadata.extension.as_deref().unwrap_or("none");
        if self.require_template_extension {
            log_error!(error.error_code(), &error.to_string(),
                "file" => file_path,
                "extension" => extension);
            return Err(error);
        }
        log_warning!(code = error.error_code(), "Reading a file without a template extension",
            "file" => file_path,
            "extension" => extension);
        Ok(())
    }

    fn read_file(&self, path: &Path, file_path: &str) -> Result<String, FileProcessorError> {
        let bytes = fs::read(path).map_err(|e| io_failure(path, "Failed to read", e))?;

        String::from_utf8(bytes).map_err(|e| {
            let error = FileProcessorError::InvalidEncoding {
                path: path.display().to_string(),
            };
            log_error!(error.error_code(), &error.to_string(),
                "file" => file_path,
                "valid_up_to" => e.utf8_error().valid_up_to());
            error
        })
    }
}

impl Default for FileProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn test_process_valid_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("page.html");
        let content = "<h1>{{ title }}</h1>\n{% if user %}hi{% endif %}\n";
        fs::write(&file_path, content).unwrap();

        let result = FileProcessor::new().process_file(&file_path).unwrap();

        assert_eq!(result.metadata.line_count, 2);
        assert!(result.metadata.is_template_file);
        assert!(result.metadata.modified.is_some());
        assert_eq!(result.source, content);
        assert!(!result.is_effectively_empty());
    }

    #[test]
    fn test_empty_file_is_accepted() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("empty.j2");
        fs::write(&file_path, "").unwrap();

        let result = FileProcessor::new().process_file(&file_path).unwrap();
        assert!(result.is_effectively_empty());
        assert_eq!(result.metadata.line_count, 0);
    }

    #[test]
    fn test_file_not_found() {
        let result = FileProcessor::new().process_file(Path::new("missing.j2"));
        assert_matches!(result, Err(FileProcessorError::FileNotFound { .. }));
    }

    #[test]
    fn test_directory_is_invalid_path() {
        let dir = tempdir().unwrap();
        let result = FileProcessor::new().process_file(dir.path());
        assert_matches!(result, Err(FileProcessorError::InvalidPath { .. }));
    }

    #[test]
    fn test_compile_time_file_size_limit() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("large.j2");
        fs::write(&file_path, "a".repeat((MAX_FILE_SIZE + 1) as usize)).unwrap();

        let result = FileProcessor::new().process_file(&file_path);
        assert_matches!(result, Err(FileProcessorError::FileTooLarge { size, max_size }) => {
            assert!(size > MAX_FILE_SIZE);
            assert_eq!(max_size, MAX_FILE_SIZE);
        });
    }

    #[test]
    fn test_extension_requirement() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("notes.md");
        fs::write(&file_path, "{{ x }}").unwrap();

        let strict = FileProcessor::new().with_template_extension_required(true);
        assert_matches!(
            strict.process_file(&file_path),
            Err(FileProcessorError::InvalidExtension { extension: Some(ext) }) if ext == "md"
        );

        let lenient = FileProcessor::new();
        let result = lenient.process_file(&file_path).unwrap();
        assert!(!result.metadata.is_template_file);
    }

    #[test]
    fn test_invalid_encoding() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("latin1.txt");
        fs::write(&file_path, [b'{', b'{', 0xff, b'}', b'}']).unwrap();

        let result = FileProcessor::new().process_file(&file_path);
        assert_matches!(result, Err(FileProcessorError::InvalidEncoding { .. }));
    }

    #[test]
    fn test_too_many_lines() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("many_lines.txt");
        fs::write(&file_path, "x\n".repeat(MAX_LINE_COUNT_FOR_ANALYSIS + 1)).unwrap();

        let result = FileProcessor::new().process_file(&file_path);
        assert_matches!(result, Err(FileProcessorError::TooManyLines { lines, max_lines }) => {
            assert!(lines > MAX_LINE_COUNT_FOR_ANALYSIS);
            assert_eq!(max_lines, MAX_LINE_COUNT_FOR_ANALYSIS);
        });
    }

    #[test]
    fn test_metadata_helpers_with_constants() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("big.txt");
        fs::write(&file_path, "A".repeat((LARGE_FILE_THRESHOLD + 100) as usize)).unwrap();

        let result = FileProcessor::new().process_file(&file_path).unwrap();
        assert!(result.metadata.is_large_file());
        assert!(result.metadata.size_kib() > 0.0);
    }

    #[test]
    fn test_error_methods() {
        let error = FileProcessorError::FileNotFound {
            path: "page.html".to_string(),
        };
        assert_eq!(error.error_code().as_str(), "E005");
        assert_eq!(error.category(), "FileProcessing");
        assert_eq!(error.severity(), "Medium");
        assert!(!error.is_recoverable());
        assert!(error.requires_halt());

        let error = FileProcessorError::InvalidExtension { extension: None };
        assert!(!error.requires_halt());
    }

    #[test]
    fn test_template_extensions() {
        assert!(is_template_extension(Some("j2")));
        assert!(is_template_extension(Some("jinja2")));
        assert!(!is_template_extension(Some("rs")));
        assert!(!is_template_extension(None));
    }

    #[test]
    fn test_from_preferences() {
        let prefs = FileProcessorPreferences {
            require_template_extension: true,
            enable_performance_logging: false,
        };
        let processor = FileProcessor::from_preferences(&prefs);
        assert!(processor.require_template_extension);
        assert!(!processor.enable_performance_logging);
        assert_eq!(FileProcessor::max_file_size(), MAX_FILE_SIZE);
        assert_eq!(FileProcessor::large_file_threshold(), LARGE_FILE_THRESHOLD);
    }
}
