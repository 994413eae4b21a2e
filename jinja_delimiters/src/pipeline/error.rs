use crate::analysis::AnalysisError;
use crate::config::DelimiterError;
use crate::file_processor::FileProcessorError;
use crate::lexical::LexerError;
use crate::logging::{codes, Code};

/// Failures that stop one file. Syntax problems are never here; they are
/// diagnostics on the result.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid delimiter configuration: {0}")]
    Configuration(#[from] DelimiterError),

    #[error("File processing failed: {0}")]
    FileProcessing(#[from] FileProcessorError),

    #[error("Lexical analysis failed: {0}")]
    LexicalAnalysis(#[from] LexerError),

    #[error("Template analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Output serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Pipeline error: {message}")]
    Pipeline { message: String },
}

impl PipelineError {
    pub fn pipeline_error(message: &str) -> Self {
        Self::Pipeline {
            message: message.to_string(),
        }
    }

    pub fn error_code(&self) -> Code {
        match self {
            Self::Configuration(error) => error.error_code(),
            Self::FileProcessing(error) => error.error_code(),
            Self::LexicalAnalysis(error) => error.error_code(),
            Self::Analysis(error) => error.error_code(),
            Self::Serialization(_) | Self::Pipeline { .. } => codes::system::INTERNAL_ERROR,
        }
    }

    /// Stage name for reports
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::FileProcessing(_) => "file processing",
            Self::LexicalAnalysis(_) => "lexical analysis",
            Self::Analysis(_) => "analysis",
            Self::Serialization(_) => "output",
            Self::Pipeline { .. } => "pipeline",
        }
    }
}
