//! Serializable view of a pipeline result for `--json` and library callers

use crate::analysis::TemplateFacts;
use crate::grammar::SyntaxTree;
use crate::pipeline::{PipelineError, PipelineResult};
use crate::tokens::TokenKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticOutput {
    pub code: String,
    pub message: String,
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenOutput {
    pub kind: TokenKind,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub file: String,
    pub size_bytes: u64,
    pub line_count: usize,
    pub token_count: usize,
    pub node_count: usize,
    pub diagnostics: Vec<DiagnosticOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facts: Option<TemplateFacts>,
    pub facts_from_cache: bool,
    pub timings_ms: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<TokenOutput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree: Option<SyntaxTree>,
}

impl PipelineOutput {
    pub fn from_result(result: &PipelineResult, include_tokens: bool, include_tree: bool) -> Self {
        let diagnostics = result
            .diagnostic_spans()
            .into_iter()
            .map(|(diagnostic, span)| DiagnosticOutput {
                code: diagnostic.error_code().as_str().to_string(),
                message: diagnostic.message.clone(),
                offset: diagnostic.offset,
                line: span.start.line,
                column: span.start.column,
            })
            .collect();

        let tokens = include_tokens.then(|| {
            result
                .stream
                .tokens()
                .iter()
                .map(|token| TokenOutput {
                    kind: token.kind,
                    text: token.text(result.stream.source()).to_string(),
                    start: token.start,
                    end: token.end,
                })
                .collect()
        });

        Self {
            file: result.path.display().to_string(),
            size_bytes: result.file_metadata.size,
            line_count: result.file_metadata.line_count,
            token_count: result.token_count(),
            node_count: result.parsed.statistics.node_count,
            diagnostics,
            facts: result.facts.clone(),
            facts_from_cache: result.facts_from_cache,
            timings_ms: result
                .timings
                .as_millis_map()
                .into_iter()
                .map(|(stage, ms)| (stage.to_string(), ms))
                .collect(),
            tokens,
            tree: include_tree.then(|| result.parsed.tree.clone()),
        }
    }

    pub fn to_json(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
