//! Shared utilities for the template tokenizer and parser
//!
//! Byte offsets are the only location unit the core works with; this module
//! turns them into line/column positions for diagnostics.

pub mod span;

pub use span::{Position, SourceMap, Span};
