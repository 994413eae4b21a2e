use crate::analysis::TemplateFacts;
use crate::file_processor::FileMetadata;
use crate::lexical::LexicalMetrics;
use crate::pipeline::StageTimings;
use crate::syntax::{Diagnostic, ParsedTemplate};
use crate::tokens::TokenStream;
use crate::utils::Span;
use std::path::PathBuf;

/// Everything produced for one template
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub path: PathBuf,
    pub file_metadata: FileMetadata,
    pub stream: TokenStream,
    pub parsed: ParsedTemplate,
    pub lexical_metrics: LexicalMetrics,
    /// `None` when fact collection is disabled
    pub facts: Option<TemplateFacts>,
    pub facts_from_cache: bool,
    pub timings: StageTimings,
}

impl PipelineResult {
    pub fn token_count(&self) -> usize {
        self.stream.len()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.parsed.diagnostics
    }

    pub fn has_diagnostics(&self) -> bool {
        self.parsed.has_diagnostics()
    }

    pub fn diagnostic_spans(&self) -> Vec<(&Diagnostic, Span)> {
        let map = self.stream.source_map();
        self.parsed
            .diagnostics
            .iter()
            .map(|diagnostic| (diagnostic, diagnostic.span(&map)))
            .collect()
    }

    /// Cargo-style text for every diagnostic
    pub fn format_diagnostics(&self) -> String {
        let map = self.stream.source_map();
        let file = self.path.display().to_string();
        self.parsed
            .diagnostics
            .iter()
            .map(|diagnostic| {
                let message = format!("[{}] {}", diagnostic.error_code().as_str(), diagnostic.message);
                map.format_error(&file, &diagnostic.span(&map), &message)
            })
            .collect()
    }

    pub fn log_success(&self) {
        let seconds = self.timings.total.as_secs_f64();
        let tokens_per_sec = if seconds > 0.0 {
            self.token_count() as f64 / seconds
        } else {
            0.0
        };

        crate::log_success!(
            crate::logging::codes::success::OPERATION_COMPLETED_SUCCESSFULLY,
            "Template pipeline completed",
            "file" => self.path.display(),
            "tokens" => self.token_count(),
            "nodes" => self.parsed.statistics.node_count,
            "diagnostics" => self.parsed.diagnostics.len(),
            "duration_ms" => format!("{:.2}", seconds * 1000.0),
            "tokens_per_sec" => format!("{:.0}", tokens_per_sec)
        );
    }
}
