use crate::config::compile_time::{batch_processing, file_processing, lexical, syntax};
use crate::file_processor::TEMPLATE_EXTENSIONS;

/// Stages and limits of the pipeline, for `--help` and diagnostics
#[derive(Debug, Clone)]
pub struct PipelineInfo {
    pub stages: Vec<&'static str>,
    pub max_file_size: u64,
    pub max_token_count: usize,
    pub max_parse_depth: usize,
    pub max_diagnostics: usize,
    pub max_worker_threads: usize,
    pub supported_extensions: Vec<String>,
    pub build_profile: &'static str,
}

impl PipelineInfo {
    pub fn report(&self) -> String {
        format!(
            "Template Pipeline:\n\
             - Stages: {}\n\
             - Max File Size: {} MB\n\
             - Max Tokens: {}\n\
             - Max Parse Depth: {}\n\
             - Max Diagnostics: {}\n\
             - Max Worker Threads: {}\n\
             - Supported Extensions: {}\n\
             - Build Profile: {}",
            self.stages.join(" -> "),
            self.max_file_size / (1024 * 1024),
            self.max_token_count,
            self.max_parse_depth,
            self.max_diagnostics,
            self.max_worker_threads,
            self.supported_extensions.join(", "),
            self.build_profile
        )
    }

    pub fn summary(&self) -> String {
        format!(
            "{}-stage template pipeline supporting {}",
            self.stages.len(),
            self.supported_extensions.join(", ")
        )
    }
}

pub fn get_pipeline_info() -> PipelineInfo {
    PipelineInfo {
        stages: vec!["validate", "read", "tokenize", "parse", "facts"],
        max_file_size: file_processing::MAX_FILE_SIZE,
        max_token_count: lexical::MAX_TOKEN_COUNT,
        max_parse_depth: syntax::MAX_PARSE_DEPTH,
        max_diagnostics: syntax::MAX_DIAGNOSTICS,
        max_worker_threads: batch_processing::MAX_WORKER_THREADS,
        supported_extensions: TEMPLATE_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        build_profile: crate::config::build_info::profile(),
    }
}
