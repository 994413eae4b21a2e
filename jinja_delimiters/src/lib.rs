// Internal modules
pub mod analysis;
pub mod batch;
pub mod config;
pub mod file_processor;
pub mod grammar;
pub mod lexical;
#[macro_use]
pub mod logging;
pub mod pipeline;
pub mod syntax;
pub mod tokens;
pub mod utils;

// Re-export key types for library consumers
pub use analysis::{FactsCache, TemplateFacts};
pub use batch::{BatchConfig, BatchError, BatchResults};
pub use config::{DelimiterConfig, DelimiterError};
pub use grammar::{NodeKind, SyntaxTree};
pub use lexical::tokenize;
pub use pipeline::{PipelineError, PipelineOptions, PipelineResult};
pub use syntax::{parse, ParsedTemplate};
pub use tokens::{TokenKind, TokenStream};

pub use pipeline::output::PipelineOutput;
