//! Directory batch processing
//!
//! Discovers templates under a directory and runs each through the pipeline,
//! sequentially or on worker threads. Every worker gets its own clone of the
//! delimiter configuration and pipeline options; only the facts cache is
//! shared.

use crate::config::compile_time::batch_processing::{MAX_FILES_PER_BATCH, MAX_WORKER_THREADS};
use crate::config::{DelimiterConfig, DelimiterError};
use crate::file_processor::TEMPLATE_EXTENSIONS;
use crate::logging::{codes, Code};
use crate::pipeline::{self, PipelineError, PipelineOptions, PipelineResult, PipelineStats};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// ============================================================================
// BATCH PROCESSING TYPES
// ============================================================================

#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Clamped to `1..=MAX_WORKER_THREADS`
    pub max_threads: usize,
    pub recursive: bool,
    pub max_files: Option<usize>,
    pub progress_reporting: bool,
    pub fail_fast: bool,
    /// Lowercase, without the dot
    pub extensions: Vec<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_threads: thread::available_parallelism()
                .map(|n| n.get().min(MAX_WORKER_THREADS))
                .unwrap_or(4),
            recursive: true,
            max_files: None,
            progress_reporting: true,
            fail_fast: false,
            extensions: TEMPLATE_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        }
    }
}

impl BatchConfig {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.max_threads = threads;
        self
    }

    pub fn effective_threads(&self) -> usize {
        self.max_threads.clamp(1, MAX_WORKER_THREADS)
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(ext))
            })
    }
}

#[derive(Debug, Default)]
pub struct BatchResults {
    pub successful_files: Vec<(PathBuf, PipelineResult)>,
    pub failed_files: Vec<(PathBuf, PipelineError)>,
    pub processing_duration: Duration,
    pub files_processed: usize,
    pub files_discovered: usize,
}

impl BatchResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success_count(&self) -> usize {
        self.successful_files.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed_files.len()
    }

    /// Files that were read and parsed but have diagnostics
    pub fn files_with_diagnostics(&self) -> usize {
        self.successful_files
            .iter()
            .filter(|(_, result)| result.has_diagnostics())
            .count()
    }

    pub fn success_rate(&self) -> f64 {
        if self.files_processed == 0 {
            0.0
        } else {
            self.successful_files.len() as f64 / self.files_processed as f64
        }
    }

    pub fn add_success(&mut self, file_path: PathBuf, result: PipelineResult) {
        self.successful_files.push((file_path, result));
        self.files_processed += 1;
    }

    pub fn add_failure(&mut self, file_path: PathBuf, error: PipelineError) {
        self.failed_files.push((file_path, error));
        self.files_processed += 1;
    }

    fn add(&mut self, file_path: PathBuf, outcome: Result<PipelineResult, PipelineError>) {
        match outcome {
            Ok(result) => self.add_success(file_path, result),
            Err(error) => self.add_failure(file_path, error),
        }
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats::collect(self.successful_files.iter().map(|(_, result)| result))
    }

    pub fn summary(&self) -> String {
        format!(
            "Batch processing completed: {} files processed, {} successful ({:.1}%), {} with diagnostics, {} failed, {:.2}s total",
            self.files_processed,
            self.success_count(),
            self.success_rate() * 100.0,
            self.files_with_diagnostics(),
            self.failure_count(),
            self.processing_duration.as_secs_f64()
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("No template files found in directory: {path}")]
    NoFilesFound { path: String },

    #[error("Too many files found: more than {max}")]
    TooManyFiles { max: usize },

    #[error("IO error during directory traversal: {error}")]
    IoError { error: String },

    #[error("Worker thread failed: {message}")]
    WorkerFailure { message: String },

    #[error("Invalid delimiter configuration: {0}")]
    Configuration(#[from] DelimiterError),
}

impl BatchError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::DirectoryNotFound { .. } => codes::file_processing::INVALID_PATH,
            Self::NoFilesFound { .. } => codes::batch::NO_FILES_FOUND,
            Self::TooManyFiles { .. } => codes::batch::TOO_MANY_FILES,
            Self::IoError { .. } => codes::file_processing::IO_ERROR,
            Self::WorkerFailure { .. } => codes::batch::WORKER_FAILURE,
            Self::Configuration(error) => error.error_code(),
        }
    }
}

// ============================================================================
// FILE DISCOVERY
// ============================================================================

/// Template files under `dir_path`, sorted
pub fn discover_template_files(
    dir_path: &Path,
    config: &BatchConfig,
) -> Result<Vec<PathBuf>, BatchError> {
    crate::log_info!("Starting file discovery",
        "directory" => dir_path.display(),
        "recursive" => config.recursive
    );

    if !dir_path.is_dir() {
        let error = BatchError::DirectoryNotFound {
            path: dir_path.display().to_string(),
        };
        crate::log_error!(error.error_code(), &error.to_string());
        return Err(error);
    }

    let mut files = Vec::new();
    visit_directory(dir_path, &mut files, config)?;

    if files.is_empty() {
        let error = BatchError::NoFilesFound {
            path: dir_path.display().to_string(),
        };
        crate::log_error!(error.error_code(), &error.to_string());
        return Err(error);
    }

    files.sort();

    if let Some(max_files) = config.max_files {
        if files.len() > max_files {
            crate::log_warning!(
                "Reached maximum file limit",
                "files_found" => files.len(),
                "limit" => max_files
            );
            files.truncate(max_files);
        }
    }

    crate::log_info!("File discovery completed",
        "files_found" => files.len(),
        "directory" => dir_path.display()
    );

    Ok(files)
}

fn visit_directory(
    dir_path: &Path,
    files: &mut Vec<PathBuf>,
    config: &BatchConfig,
) -> Result<(), BatchError> {
    let entries = fs::read_dir(dir_path).map_err(|e| BatchError::IoError {
        error: format!("{}: {}", dir_path.display(), e),
    })?;

    for entry in entries {
        let path = entry
            .map_err(|e| BatchError::IoError {
                error: e.to_string(),
            })?
            .path();

        if path.is_dir() {
            if config.recursive {
                visit_directory(&path, files, config)?;
            }
        } else if path.is_file() && config.matches_extension(&path) {
            files.push(path);
            if files.len() > MAX_FILES_PER_BATCH {
                let error = BatchError::TooManyFiles {
                    max: MAX_FILES_PER_BATCH,
                };
                crate::log_error!(error.error_code(), &error.to_string(),
                    "directory" => dir_path.display()
                );
                return Err(error);
            }
        }
    }

    Ok(())
}

// ============================================================================
// BATCH PROCESSING
// ============================================================================

pub fn process_directory_sequential(
    dir_path: &Path,
    delimiters: &DelimiterConfig,
    options: &PipelineOptions,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    let start_time = Instant::now();

    crate::log_info!("Starting sequential batch processing",
        "directory" => dir_path.display()
    );

    delimiters.validate()?;
    let files = discover_template_files(dir_path, config)?;

    let mut results = BatchResults::new();
    results.files_discovered = files.len();

    for (file_id, file_path) in files.iter().enumerate() {
        if config.progress_reporting {
            println!(
                "Processing file {} of {}: {}",
                file_id + 1,
                files.len(),
                file_path.display()
            );
        }

        let outcome = pipeline::process_file_with_id(file_path, file_id, delimiters, options);
        let failed = outcome.is_err();
        results.add(file_path.clone(), outcome);

        if failed && config.fail_fast {
            crate::log_warning!("Fail-fast mode enabled, stopping batch processing");
            break;
        }
    }

    results.processing_duration = start_time.elapsed();
    log_batch_complete(&results, 1);

    Ok(results)
}

pub fn process_directory_parallel(
    dir_path: &Path,
    delimiters: &DelimiterConfig,
    options: &PipelineOptions,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    let start_time = Instant::now();
    let threads = config.effective_threads();

    crate::log_info!("Starting parallel batch processing",
        "directory" => dir_path.display(),
        "max_threads" => threads
    );

    delimiters.validate()?;
    let files = discover_template_files(dir_path, config)?;

    let mut results = BatchResults::new();
    results.files_discovered = files.len();

    let chunk_size = calculate_chunk_size(files.len(), threads);
    crate::log_debug!("Parallel processing configuration",
        "total_files" => files.len(),
        "chunk_size" => chunk_size,
        "threads" => threads
    );

    let stop = Arc::new(AtomicBool::new(false));
    for (chunk_index, chunk) in files.chunks(chunk_size).enumerate() {
        let first_id = chunk_index * chunk_size;
        let chunk_results =
            process_chunk_parallel(chunk, first_id, delimiters, options, config, &stop)?;
        for (file_path, outcome) in chunk_results {
            results.add(file_path, outcome);
        }

        if stop.load(Ordering::Relaxed) {
            crate::log_warning!("Fail-fast mode enabled, stopping batch processing");
            break;
        }
    }

    results.processing_duration = start_time.elapsed();
    log_batch_complete(&results, threads);

    Ok(results)
}

type FileOutcome = (PathBuf, Result<PipelineResult, PipelineError>);

/// Split a chunk across workers; results come back in input order
fn process_chunk_parallel(
    files: &[PathBuf],
    first_id: usize,
    delimiters: &DelimiterConfig,
    options: &PipelineOptions,
    config: &BatchConfig,
    stop: &Arc<AtomicBool>,
) -> Result<Vec<FileOutcome>, BatchError> {
    let threads = config.effective_threads();
    let files_per_thread = files.len().div_ceil(threads).max(1);

    let handles: Vec<_> = files
        .chunks(files_per_thread)
        .enumerate()
        .map(|(worker, worker_files)| {
            let worker_files = worker_files.to_vec();
            let delimiters = delimiters.clone();
            let options = options.clone();
            let stop = Arc::clone(stop);
            let fail_fast = config.fail_fast;
            let start_id = first_id + worker * files_per_thread;

            thread::spawn(move || {
                let mut outcomes = Vec::with_capacity(worker_files.len());
                for (offset, file_path) in worker_files.into_iter().enumerate() {
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                    let outcome = pipeline::process_file_with_id(
                        &file_path,
                        start_id + offset,
                        &delimiters,
                        &options,
                    );
                    if fail_fast && outcome.is_err() {
                        stop.store(true, Ordering::Relaxed);
                    }
                    outcomes.push((file_path, outcome));
                }
                outcomes
            })
        })
        .collect();

    let mut outcomes = Vec::with_capacity(files.len());
    for handle in handles {
        let worker_outcomes = handle.join().map_err(|_| {
            let error = BatchError::WorkerFailure {
                message: "Worker thread panicked during processing".to_string(),
            };
            crate::log_error!(error.error_code(), &error.to_string());
            error
        })?;
        outcomes.extend(worker_outcomes);
    }

    Ok(outcomes)
}

/// Chunks bound how many results are held before merging
fn calculate_chunk_size(file_count: usize, max_threads: usize) -> usize {
    const MAX_CHUNK_SIZE: usize = 50;

    file_count.div_ceil(max_threads.max(1)).clamp(1, MAX_CHUNK_SIZE)
}

fn log_batch_complete(results: &BatchResults, threads: usize) {
    crate::log_success!(
        codes::success::BATCH_COMPLETE,
        "Batch processing completed",
        "files_processed" => results.files_processed,
        "successful" => results.success_count(),
        "with_diagnostics" => results.files_with_diagnostics(),
        "failed" => results.failure_count(),
        "threads_used" => threads,
        "duration_ms" => format!("{:.2}", results.processing_duration.as_secs_f64() * 1000.0)
    );
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Default batch settings and pipeline options
pub fn process_directory(
    dir_path: &Path,
    delimiters: &DelimiterConfig,
) -> Result<BatchResults, BatchError> {
    process_directory_with_config(
        dir_path,
        delimiters,
        &PipelineOptions::default(),
        &BatchConfig::default(),
    )
}

pub fn process_directory_with_config(
    dir_path: &Path,
    delimiters: &DelimiterConfig,
    options: &PipelineOptions,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    if config.effective_threads() == 1 {
        process_directory_sequential(dir_path, delimiters, options, config)
    } else {
        process_directory_parallel(dir_path, delimiters, options, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    fn quiet() -> BatchConfig {
        BatchConfig {
            progress_reporting: false,
            ..BatchConfig::default()
        }
    }

    #[test]
    fn test_file_discovery() {
        let temp_dir = tempdir().unwrap();
        let temp_path = temp_dir.path();
        fs::create_dir(temp_path.join("partials")).unwrap();

        fs::write(temp_path.join("index.html"), "{{ title }}").unwrap();
        fs::write(temp_path.join("mail.J2"), "{{ user }}").unwrap();
        fs::write(temp_path.join("partials/nav.jinja"), "{% include 'x' %}").unwrap();
        fs::write(temp_path.join("main.rs"), "fn main() {}").unwrap();

        let files = discover_template_files(temp_path, &quiet()).unwrap();
        assert_eq!(files.len(), 3);

        let shallow = BatchConfig {
            recursive: false,
            ..quiet()
        };
        assert_eq!(discover_template_files(temp_path, &shallow).unwrap().len(), 2);

        let limited = BatchConfig {
            max_files: Some(1),
            ..quiet()
        };
        assert_eq!(discover_template_files(temp_path, &limited).unwrap().len(), 1);
    }

    #[test]
    fn test_discovery_errors() {
        let temp_dir = tempdir().unwrap();
        fs::write(temp_dir.path().join("notes.md"), "# notes").unwrap();

        assert_matches!(
            discover_template_files(temp_dir.path(), &quiet()),
            Err(BatchError::NoFilesFound { .. })
        );
        assert_matches!(
            discover_template_files(&temp_dir.path().join("missing"), &quiet()),
            Err(BatchError::DirectoryNotFound { .. })
        );
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let temp_dir = tempdir().unwrap();
        for i in 0..6 {
            fs::write(
                temp_dir.path().join(format!("t{}.j2", i)),
                format!("{{% if x{} %}}{{{{ y }}}}{{% endif %}}", i),
            )
            .unwrap();
        }
        fs::write(temp_dir.path().join("broken.j2"), "{% for a in b %}{{ a").unwrap();

        let delimiters = DelimiterConfig::default();
        let options = PipelineOptions::default();

        let sequential = process_directory_with_config(
            temp_dir.path(),
            &delimiters,
            &options,
            &quiet().with_threads(1),
        )
        .unwrap();
        let parallel = process_directory_with_config(
            temp_dir.path(),
            &delimiters,
            &options,
            &quiet().with_threads(3),
        )
        .unwrap();

        assert_eq!(sequential.files_processed, 7);
        assert_eq!(parallel.files_processed, 7);
        assert_eq!(sequential.failure_count(), 0);
        assert_eq!(sequential.files_with_diagnostics(), 1);
        assert_eq!(parallel.files_with_diagnostics(), 1);

        let order = |results: &BatchResults| -> Vec<PathBuf> {
            results.successful_files.iter().map(|(p, _)| p.clone()).collect()
        };
        assert_eq!(order(&sequential), order(&parallel));
        assert_eq!(sequential.stats().files, 7);
    }

    #[test]
    fn test_invalid_delimiters_fail_the_batch() {
        let temp_dir = tempdir().unwrap();
        fs::write(temp_dir.path().join("a.j2"), "{{ a }}").unwrap();

        let delimiters = DelimiterConfig::with_tags(("{%", "%}"), ("{%", "%}"));
        let result = process_directory_with_config(
            temp_dir.path(),
            &delimiters,
            &PipelineOptions::default(),
            &quiet(),
        );
        assert_matches!(result, Err(BatchError::Configuration(_)));
    }

    #[test]
    fn test_fail_fast_sequential() {
        let temp_dir = tempdir().unwrap();
        fs::write(temp_dir.path().join("a.j2"), [0xff, 0xfe]).unwrap();
        fs::write(temp_dir.path().join("b.j2"), "{{ b }}").unwrap();

        let config = BatchConfig {
            fail_fast: true,
            ..quiet().with_threads(1)
        };
        let results = process_directory_with_config(
            temp_dir.path(),
            &DelimiterConfig::default(),
            &PipelineOptions::default(),
            &config,
        )
        .unwrap();

        assert_eq!(results.failure_count(), 1);
        assert_eq!(results.files_processed, 1);
        assert_eq!(results.files_discovered, 2);
    }

    #[test]
    fn test_batch_results() {
        let results = BatchResults::new();
        assert_eq!(results.success_rate(), 0.0);
        assert_eq!(results.success_count(), 0);
        assert!(results.summary().contains("0 files processed"));
    }

    #[test]
    fn test_chunk_size_calculation() {
        assert_eq!(calculate_chunk_size(100, 4), 25);
        assert_eq!(calculate_chunk_size(10, 4), 3);
        assert_eq!(calculate_chunk_size(1, 4), 1);
        assert_eq!(calculate_chunk_size(200, 4), 50);
        assert_eq!(calculate_chunk_size(0, 0), 1);
    }

    #[test]
    fn test_batch_config_default() {
        let config = BatchConfig::default();
        assert!(config.effective_threads() >= 1);
        assert!(config.effective_threads() <= MAX_WORKER_THREADS);
        assert!(config.recursive);
        assert!(!config.fail_fast);
        assert!(config.max_files.is_none());
        assert!(config.extensions.iter().any(|ext| ext == "j2"));
        assert_eq!(BatchConfig::default().with_threads(0).effective_threads(), 1);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(BatchError::NoFilesFound { path: "x".into() }.error_code().as_str(), "E070");
        assert_eq!(BatchError::TooManyFiles { max: 1 }.error_code().as_str(), "E071");
    }
}
