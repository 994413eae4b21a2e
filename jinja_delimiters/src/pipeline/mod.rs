//! Single-file pipeline: validate delimiters, read, tokenize, parse, collect facts
//!
//! Every stage logs under the current file context so the global error
//! collector can group events per template.

mod error;
mod info;
pub mod output;
mod result;
mod stats;
mod validation;

pub use error::PipelineError;
pub use info::{get_pipeline_info, PipelineInfo};
pub use output::PipelineOutput;
pub use result::PipelineResult;
pub use stats::{PipelineStats, StageTimings};
pub use validation::validate_pipeline;

use crate::analysis::{collect_facts, FactsCache, TemplateFacts};
use crate::config::{DelimiterConfig, RuntimeConfig};
use crate::file_processor::FileProcessor;
use crate::lexical::LexicalAnalyzer;
use crate::logging::{self, codes};
use crate::syntax::{self, ParsedTemplate};
use crate::tokens::TokenStream;
use crate::{log_error, log_info, log_success, log_warning};
use std::path::Path;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

/// Preferences for every stage plus an optional shared facts cache
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub runtime: RuntimeConfig,
    pub cache: Option<Arc<FactsCache>>,
}

impl PipelineOptions {
    pub fn from_runtime(runtime: RuntimeConfig) -> Self {
        Self {
            runtime,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<FactsCache>) -> Self {
        self.cache = Some(cache);
        self
    }
}

/// Run one template through every stage
pub fn process_file(
    path: &Path,
    config: &DelimiterConfig,
    options: &PipelineOptions,
) -> Result<PipelineResult, PipelineError> {
    process_file_with_id(path, 0, config, options)
}

/// As [`process_file`], attributing log events to `file_id`
pub fn process_file_with_id(
    path: &Path,
    file_id: usize,
    config: &DelimiterConfig,
    options: &PipelineOptions,
) -> Result<PipelineResult, PipelineError> {
    logging::with_file_context(path.to_path_buf(), file_id, || run_stages(path, config, options))
}

fn run_stages(
    path: &Path,
    config: &DelimiterConfig,
    options: &PipelineOptions,
) -> Result<PipelineResult, PipelineError> {
    let start_time = Instant::now();
    let mut timings = StageTimings::default();

    log_info!("Starting template pipeline",
        "file" => path.display(),
        "custom_delimiters" => config.is_using_custom_delimiters()
    );

    let stage = Instant::now();
    if let Err(error) = config.validate() {
        log_error!(error.error_code(), &error.to_string(), "file" => path.display());
        return Err(error.into());
    }
    timings.validate = stage.elapsed();

    let stage = Instant::now();
    let file_result =
        FileProcessor::from_preferences(&options.runtime.file_processor).process_file(path)?;
    timings.read = stage.elapsed();

    let stage = Instant::now();
    let mut analyzer = LexicalAnalyzer::with_preferences(options.runtime.lexical.clone());
    let stream = analyzer.tokenize_source(&file_result.source, config)?;
    let lexical_metrics = analyzer.metrics().clone();
    timings.tokenize = stage.elapsed();

    let stage = Instant::now();
    let parsed = syntax::parse_with_preferences(&stream, &options.runtime.syntax);
    timings.parse = stage.elapsed();

    let stage = Instant::now();
    let (facts, facts_from_cache) = if options.runtime.analysis.collect_facts {
        let (facts, cached) =
            facts_for(path, file_result.metadata.modified, &stream, &parsed, options);
        (Some(facts), cached)
    } else {
        (None, false)
    };
    timings.facts = stage.elapsed();
    timings.total = start_time.elapsed();

    let result = PipelineResult {
        path: path.to_path_buf(),
        file_metadata: file_result.metadata,
        stream,
        parsed,
        lexical_metrics,
        facts,
        facts_from_cache,
        timings,
    };

    result.log_success();
    Ok(result)
}

/// Facts from the cache when the file is unchanged, otherwise collected.
/// A poisoned cache is reported and bypassed.
fn facts_for(
    path: &Path,
    modified: Option<SystemTime>,
    stream: &TokenStream,
    parsed: &ParsedTemplate,
    options: &PipelineOptions,
) -> (TemplateFacts, bool) {
    let cache = options
        .cache
        .as_ref()
        .filter(|_| options.runtime.analysis.enable_facts_cache);

    let (Some(cache), Some(modified)) = (cache, modified) else {
        return (collect_facts(stream, parsed), false);
    };

    match cache.get_or_compute(path, modified, || collect_facts(stream, parsed)) {
        Ok((facts, true)) => {
            log_success!(codes::success::CACHE_HIT, "Reusing cached template facts",
                "file" => path.display()
            );
            (facts, true)
        }
        Ok((facts, false)) => (facts, false),
        Err(error) => {
            log_warning!(code = error.error_code(), &error.to_string(),
                "file" => path.display()
            );
            (collect_facts(stream, parsed), false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::NodeKind;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_validate_pipeline() {
        let _ = crate::logging::init_global_logging();
        assert!(validate_pipeline().is_ok());
    }

    #[test]
    fn test_pipeline_error_creation() {
        let error = PipelineError::pipeline_error("Test error");
        assert_matches!(error, PipelineError::Pipeline { ref message } if message == "Test error");
        assert_eq!(error.error_code().as_str(), "ERR001");
    }

    #[test]
    fn test_process_file_runs_all_stages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("list.html");
        fs::write(
            &path,
            "<ul>{% for item in items %}<li>{{ item.name | title }}</li>{% endfor %}</ul>\n",
        )
        .unwrap();

        let result =
            process_file(&path, &DelimiterConfig::default(), &PipelineOptions::default()).unwrap();

        assert!(!result.has_diagnostics());
        assert_eq!(result.parsed.count(NodeKind::ForBlock), 1);
        assert_eq!(result.stream.reconstruct(), fs::read_to_string(&path).unwrap());
        let facts = result.facts.as_ref().unwrap();
        assert!(facts.variables.contains("items"));
        assert!(facts.filters.contains("title"));
        assert!(!result.facts_from_cache);
        assert!(result.timings.total >= result.timings.parse);
    }

    #[test]
    fn test_custom_delimiters_and_diagnostics() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("page.j2");
        fs::write(&path, "<% if a %>[[ a ]]\n%% set b = 1\n[[ b ").unwrap();

        let config = DelimiterConfig::with_tags(("<%", "%>"), ("[[", "]]")).with_line_prefixes("%%", "##");
        let result = process_file(&path, &config, &PipelineOptions::default()).unwrap();

        assert_eq!(result.parsed.count(NodeKind::SetBlock), 1);
        assert!(result.has_diagnostics());
        let rendered = result.format_diagnostics();
        assert!(rendered.contains("page.j2"));

        let output = PipelineOutput::from_result(&result, true, false);
        assert!(output.tokens.is_some());
        assert!(output.tree.is_none());
        assert_eq!(output.diagnostics.len(), result.diagnostics().len());
        assert!(output.to_json().unwrap().contains("\"diagnostics\""));
    }

    #[test]
    fn test_invalid_configuration_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("page.j2");
        fs::write(&path, "{{ x }}").unwrap();

        let config = DelimiterConfig::with_tags(("{{", "}}"), ("{{", "}}"));
        let result = process_file(&path, &config, &PipelineOptions::default());
        assert_matches!(result, Err(PipelineError::Configuration(_)));
    }

    #[test]
    fn test_missing_file() {
        let result = process_file(
            Path::new("does/not/exist.j2"),
            &DelimiterConfig::default(),
            &PipelineOptions::default(),
        );
        assert_matches!(result, Err(PipelineError::FileProcessing(_)));
    }

    #[test]
    fn test_facts_cache_reused_for_unchanged_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("base.html");
        fs::write(&path, "{% block content %}{% endblock %}").unwrap();

        let cache = Arc::new(FactsCache::new());
        let options = PipelineOptions::default().with_cache(cache.clone());
        let config = DelimiterConfig::default();

        let first = process_file(&path, &config, &options).unwrap();
        let second = process_file(&path, &config, &options).unwrap();

        assert!(!first.facts_from_cache);
        assert!(second.facts_from_cache);
        assert_eq!(first.facts, second.facts);
        assert_eq!(cache.statistics().unwrap().hits, 1);

        let stats = PipelineStats::collect([&first, &second]);
        assert_eq!(stats.files, 2);
        assert_eq!(stats.facts_cache_hits, 1);
    }

    #[test]
    fn test_facts_disabled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.txt");
        fs::write(&path, "hello").unwrap();

        let mut runtime = RuntimeConfig::default();
        runtime.analysis.collect_facts = false;
        let result =
            process_file(&path, &DelimiterConfig::default(), &PipelineOptions::from_runtime(runtime))
                .unwrap();
        assert!(result.facts.is_none());
    }

    #[test]
    fn test_pipeline_info() {
        let info = get_pipeline_info();
        assert_eq!(info.stages.len(), 5);
        assert!(info.report().contains("j2"));
    }
}
