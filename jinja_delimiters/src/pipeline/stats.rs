use crate::pipeline::PipelineResult;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Wall time spent in each stage of one file
#[derive(Debug, Clone, Default)]
pub struct StageTimings {
    pub validate: Duration,
    pub read: Duration,
    pub tokenize: Duration,
    pub parse: Duration,
    pub facts: Duration,
    pub total: Duration,
}

impl StageTimings {
    pub fn as_millis_map(&self) -> BTreeMap<&'static str, f64> {
        [
            ("validate", self.validate),
            ("read", self.read),
            ("tokenize", self.tokenize),
            ("parse", self.parse),
            ("facts", self.facts),
            ("total", self.total),
        ]
        .into_iter()
        .map(|(stage, duration)| (stage, duration.as_secs_f64() * 1000.0))
        .collect()
    }
}

/// Totals over several pipeline results
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    pub files: usize,
    pub files_with_diagnostics: usize,
    pub total_diagnostics: usize,
    pub total_tokens: usize,
    pub total_nodes: usize,
    pub total_bytes: u64,
    pub facts_cache_hits: usize,
    #[serde(skip)]
    pub total_time: Duration,
}

impl PipelineStats {
    pub fn collect<'a>(results: impl IntoIterator<Item = &'a PipelineResult>) -> Self {
        let mut stats = Self::default();
        for result in results {
            stats.files += 1;
            if result.has_diagnostics() {
                stats.files_with_diagnostics += 1;
            }
            stats.total_diagnostics += result.parsed.diagnostics.len();
            stats.total_tokens += result.token_count();
            stats.total_nodes += result.parsed.statistics.node_count;
            stats.total_bytes += result.file_metadata.size;
            if result.facts_from_cache {
                stats.facts_cache_hits += 1;
            }
            stats.total_time += result.timings.total;
        }
        stats
    }

    pub fn clean_rate(&self) -> f64 {
        if self.files == 0 {
            0.0
        } else {
            (self.files - self.files_with_diagnostics) as f64 / self.files as f64
        }
    }

    /// Bytes per second of pipeline time
    pub fn throughput(&self) -> f64 {
        let seconds = self.total_time.as_secs_f64();
        if seconds > 0.0 {
            self.total_bytes as f64 / seconds
        } else {
            0.0
        }
    }
}
