//! Mode-switching template tokenizer
//!
//! [`Tokenizer`] is a lazy iterator over one byte range of a buffer. It reads
//! the delimiter strings from the [`DelimiterConfig`] it was constructed with
//! and never consults anything else, so two tokenizers over the same input and
//! configuration always agree. Malformed input is never an error: unknown
//! characters become `BadCharacter` tokens and unterminated regions simply run
//! to the end of the range.
//!
//! [`LexicalAnalyzer`] drives a tokenizer to completion, enforcing the token
//! limit and collecting metrics.

use crate::config::compile_time::lexical::*;
use crate::config::runtime::LexicalPreferences;
use crate::config::DelimiterConfig;
use crate::logging::codes;
use crate::tokens::token::{keyword_from_word, single_char_operator, MULTI_CHAR_OPERATORS};
use crate::tokens::{Token, TokenKind, TokenStream};
use crate::utils::SourceMap;
use crate::{log_debug, log_error, log_success, log_warning};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::iter::FusedIterator;

/// Lexical analysis errors. Only resource limits and bad entry arguments
/// fail; template content never does.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LexerError {
    #[error("Too many tokens: {count} (max {MAX_TOKEN_COUNT})")]
    TooManyTokens { count: usize },

    #[error("Invalid lexing range {start}..{end} for buffer of {len} bytes")]
    InvalidRange { start: usize, end: usize, len: usize },
}

impl LexerError {
    pub fn error_code(&self) -> crate::logging::Code {
        match self {
            LexerError::TooManyTokens { .. } => codes::lexical::TOO_MANY_TOKENS,
            LexerError::InvalidRange { .. } => codes::lexical::INVALID_RANGE,
        }
    }
}

/// Tokenizer mode. Recorded per token so lexing can resume mid-buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LexState {
    #[default]
    Template,
    Block,
    Variable,
    Comment,
    Raw,
    LineStatement,
    LineComment,
}

// ============================================================================
// TOKENIZER
// ============================================================================

const ENDRAW: &[u8] = b"endraw";

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Byte length of the UTF-8 sequence introduced by `lead`
fn utf8_width(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 1,
    }
}

/// Lazy scanner over `buffer[start..end]`
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    bytes: &'a [u8],
    source: &'a str,
    config: &'a DelimiterConfig,
    offset: usize,
    end: usize,
    state: LexState,
    line_start: bool,
    /// Set by `raw` inside a block; the next BLOCK_END enters `Raw`
    raw_pending: bool,
}

impl<'a> Tokenizer<'a> {
    /// Start lexing `source[start..end]` in `initial_state`.
    ///
    /// `end` is clamped to the buffer length and `start` to `end`, so any
    /// range yields a finite sequence.
    pub fn new(
        source: &'a str,
        start: usize,
        end: usize,
        initial_state: LexState,
        config: &'a DelimiterConfig,
    ) -> Self {
        let bytes = source.as_bytes();
        let end = end.min(bytes.len());
        let start = start.min(end);
        Self {
            bytes,
            source,
            config,
            offset: start,
            end,
            state: initial_state,
            line_start: start == 0 || bytes[start - 1] == b'\n',
            raw_pending: false,
        }
    }

    /// Mode the next token will be scanned in
    pub fn state(&self) -> LexState {
        self.state
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.offset..self.end]
    }

    fn peek(&self) -> Option<u8> {
        self.remaining().first().copied()
    }

    fn peek_at(&self, n: usize) -> Option<u8> {
        self.remaining().get(n).copied()
    }

    /// True if the non-empty `text` starts at `pos`
    fn matches_at(&self, pos: usize, text: &str) -> bool {
        !text.is_empty() && pos <= self.end && self.bytes[pos..self.end].starts_with(text.as_bytes())
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.matches_at(self.offset, text) {
            self.offset += text.len();
            true
        } else {
            false
        }
    }

    fn bump_char(&mut self) {
        let width = self.peek().map(utf8_width).unwrap_or(1);
        self.offset = (self.offset + width).min(self.end);
    }

    fn at_start_delimiter(&self, pos: usize) -> bool {
        self.matches_at(pos, &self.config.block_start)
            || self.matches_at(pos, &self.config.variable_start)
            || self.matches_at(pos, &self.config.comment_start)
    }

    // === TEMPLATE ===

    fn lex_template(&mut self) -> TokenKind {
        let config = self.config;
        if self.line_start {
            if self.eat(&config.line_statement_prefix) {
                self.state = LexState::LineStatement;
                return TokenKind::BlockStart;
            }
            if self.eat(&config.line_comment_prefix) {
                self.state = LexState::LineComment;
                return TokenKind::CommentStart;
            }
        }

        if self.eat(&config.block_start) {
            self.state = LexState::Block;
            return TokenKind::BlockStart;
        }
        if self.eat(&config.variable_start) {
            self.state = LexState::Variable;
            return TokenKind::VariableStart;
        }
        if self.eat(&config.comment_start) {
            self.state = LexState::Comment;
            return TokenKind::CommentStart;
        }

        if self.peek() == Some(b'\n') {
            self.offset += 1;
            return TokenKind::Newline;
        }

        while let Some(b) = self.peek() {
            if b == b'\n' || self.at_start_delimiter(self.offset) {
                break;
            }
            self.offset += 1;
        }
        TokenKind::Text
    }

    // === BLOCK / VARIABLE / LINE STATEMENT ===

    fn lex_tag(&mut self) -> TokenKind {
        let config = self.config;
        match self.state {
            LexState::Block => {
                if self.eat(&config.block_end) {
                    self.state = if self.raw_pending {
                        LexState::Raw
                    } else {
                        LexState::Template
                    };
                    self.raw_pending = false;
                    return TokenKind::BlockEnd;
                }
            }
            LexState::Variable => {
                if self.eat(&config.variable_end) {
                    self.state = LexState::Template;
                    return TokenKind::VariableEnd;
                }
            }
            LexState::LineStatement => {
                if self.peek() == Some(b'\n') {
                    self.offset += 1;
                    self.state = LexState::Template;
                    return TokenKind::Newline;
                }
            }
            _ => {}
        }
        self.lex_expression_token()
    }

    fn is_tag_whitespace(&self, b: u8) -> bool {
        match b {
            b' ' | b'\t' | b'\r' => true,
            b'\n' => self.state != LexState::LineStatement,
            _ => false,
        }
    }

    fn lex_expression_token(&mut self) -> TokenKind {
        let Some(c) = self.peek() else {
            return TokenKind::Whitespace;
        };

        if self.is_tag_whitespace(c) {
            while self.peek().is_some_and(|b| self.is_tag_whitespace(b)) {
                self.offset += 1;
            }
            return TokenKind::Whitespace;
        }

        for (text, kind) in MULTI_CHAR_OPERATORS {
            if self.eat(text) {
                return *kind;
            }
        }

        if let Some(kind) = single_char_operator(c) {
            self.offset += 1;
            return kind;
        }

        match c {
            b'"' | b'\'' => self.scan_string(c),
            b'0'..=b'9' => self.scan_number(),
            c if is_ident_start(c) => self.scan_word(),
            _ => {
                self.bump_char();
                TokenKind::BadCharacter
            }
        }
    }

    fn scan_string(&mut self, quote: u8) -> TokenKind {
        self.offset += 1;
        while let Some(b) = self.peek() {
            if b == quote {
                self.offset += 1;
                break;
            }
            if b == b'\\' {
                self.offset += 1;
                if self.peek().is_some() {
                    self.bump_char();
                }
            } else {
                self.offset += 1;
            }
        }
        TokenKind::String
    }

    fn scan_number(&mut self) -> TokenKind {
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.offset += 1;
        }
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
            self.offset += 1;
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.offset += 1;
            }
            return TokenKind::Float;
        }
        TokenKind::Integer
    }

    fn scan_word(&mut self) -> TokenKind {
        let start = self.offset;
        while self.peek().is_some_and(is_ident_continue) {
            self.offset += 1;
        }
        let word = self.source.get(start..self.offset).unwrap_or("");
        let kind = keyword_from_word(word).unwrap_or(TokenKind::Identifier);
        if kind == TokenKind::Raw && self.state == LexState::Block {
            self.raw_pending = true;
        }
        kind
    }

    // === COMMENTS ===

    fn lex_comment(&mut self) -> TokenKind {
        let config = self.config;
        if self.eat(&config.comment_end) {
            self.state = LexState::Template;
            return TokenKind::CommentEnd;
        }
        while self.offset < self.end && !self.matches_at(self.offset, &config.comment_end) {
            self.offset += 1;
        }
        TokenKind::Text
    }

    fn lex_line_comment(&mut self) -> TokenKind {
        if self.peek() == Some(b'\n') {
            self.offset += 1;
            self.state = LexState::Template;
            return TokenKind::Newline;
        }
        while self.peek().is_some_and(|b| b != b'\n') {
            self.offset += 1;
        }
        TokenKind::Text
    }

    // === RAW ===

    /// `blockStart`, optional whitespace, then the word `endraw` at `pos`
    fn endraw_tag_at(&self, pos: usize) -> bool {
        if !self.matches_at(pos, &self.config.block_start) {
            return false;
        }
        let mut cursor = pos + self.config.block_start.len();
        while cursor < self.end && matches!(self.bytes[cursor], b' ' | b'\t' | b'\r' | b'\n') {
            cursor += 1;
        }
        let rest = &self.bytes[cursor..self.end];
        rest.starts_with(ENDRAW)
            && !rest
                .get(ENDRAW.len())
                .is_some_and(|&b| is_ident_continue(b))
    }

    fn lex_raw(&mut self) -> TokenKind {
        if self.endraw_tag_at(self.offset) {
            self.offset += self.config.block_start.len();
            self.state = LexState::Block;
            return TokenKind::BlockStart;
        }
        self.offset += 1;
        while self.offset < self.end && !self.endraw_tag_at(self.offset) {
            self.offset += 1;
        }
        TokenKind::Text
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.offset >= self.end {
            return None;
        }
        let start = self.offset;

        let kind = match self.state {
            LexState::Template => self.lex_template(),
            LexState::Block | LexState::Variable | LexState::LineStatement => self.lex_tag(),
            LexState::Comment => self.lex_comment(),
            LexState::Raw => self.lex_raw(),
            LexState::LineComment => self.lex_line_comment(),
        };

        // Every branch consumes at least one byte; this keeps that true even
        // for a configuration that slipped past validation.
        if self.offset == start {
            self.bump_char();
        }

        match kind {
            TokenKind::Newline => self.line_start = true,
            TokenKind::Whitespace => {}
            _ => self.line_start = false,
        }

        Some(Token::new(kind, start, self.offset))
    }
}

impl FusedIterator for Tokenizer<'_> {}

/// Lazily tokenize `source[start..end]` beginning in `initial_state`
pub fn tokenize<'a>(
    source: &'a str,
    start: usize,
    end: usize,
    initial_state: LexState,
    config: &'a DelimiterConfig,
) -> Tokenizer<'a> {
    Tokenizer::new(source, start, end, initial_state, config)
}

// ============================================================================
// METRICS
// ============================================================================

#[derive(Debug, Default, Clone, Serialize)]
pub struct LexicalMetrics {
    pub total_tokens: usize,
    pub keyword_tokens: usize,
    pub identifier_tokens: usize,
    pub operator_tokens: usize,
    pub literal_tokens: usize,
    pub bad_characters: usize,
    pub tags_opened: usize,
    pub max_string_length: usize,
    pub oversized_strings: usize,

    /// Only filled when detailed metrics are enabled
    pub kind_counts: BTreeMap<TokenKind, usize>,
}

impl LexicalMetrics {
    pub(crate) fn record_token(&mut self, token: &Token, preferences: &LexicalPreferences) {
        self.total_tokens += 1;

        match token.kind {
            kind if kind.is_keyword() => self.keyword_tokens += 1,
            kind if kind.is_operator() || kind.is_punctuation() => self.operator_tokens += 1,
            kind if kind.is_literal() => self.literal_tokens += 1,
            TokenKind::Identifier => self.identifier_tokens += 1,
            TokenKind::BadCharacter => self.bad_characters += 1,
            TokenKind::BlockStart | TokenKind::VariableStart | TokenKind::CommentStart => {
                self.tags_opened += 1
            }
            _ => {}
        }

        if token.kind == TokenKind::String {
            let length = token.len();
            self.max_string_length = self.max_string_length.max(length);
            if length > MAX_STRING_SIZE {
                self.oversized_strings += 1;
            }
        }

        if preferences.collect_detailed_metrics
            && (self.kind_counts.len() < METRICS_BUFFER_SIZE
                || self.kind_counts.contains_key(&token.kind))
        {
            *self.kind_counts.entry(token.kind).or_insert(0) += 1;
        }
    }

    pub fn count_of(&self, kind: TokenKind) -> usize {
        self.kind_counts.get(&kind).copied().unwrap_or(0)
    }
}

// ============================================================================
// ANALYZER
// ============================================================================

/// Runs the tokenizer over a whole source and builds a [`TokenStream`]
pub struct LexicalAnalyzer {
    metrics: LexicalMetrics,
    preferences: LexicalPreferences,
}

impl LexicalAnalyzer {
    pub fn new() -> Self {
        Self {
            metrics: LexicalMetrics::default(),
            preferences: LexicalPreferences::default(),
        }
    }

    pub fn with_preferences(preferences: LexicalPreferences) -> Self {
        Self {
            metrics: LexicalMetrics::default(),
            preferences,
        }
    }

    /// Tokenize all of `source` from the template state
    pub fn tokenize_source(
        &mut self,
        source: &str,
        config: &DelimiterConfig,
    ) -> Result<TokenStream, LexerError> {
        self.tokenize_range(source, 0, source.len(), LexState::Template, config)
    }

    /// Tokenize `source[start..end]`, keeping the whole source in the stream
    pub fn tokenize_range(
        &mut self,
        source: &str,
        start: usize,
        end: usize,
        initial_state: LexState,
        config: &DelimiterConfig,
    ) -> Result<TokenStream, LexerError> {
        self.metrics = LexicalMetrics::default();

        if start > end || end > source.len() {
            let error = LexerError::InvalidRange {
                start,
                end,
                len: source.len(),
            };
            log_error!(error.error_code(), &error.to_string(),
                "start" => start,
                "end" => end
            );
            return Err(error);
        }

        log_debug!("Starting lexical analysis",
            "bytes" => end - start,
            "initial_state" => format!("{:?}", initial_state),
            "custom_delimiters" => config.is_using_custom_delimiters(),
            "max_tokens_allowed" => MAX_TOKEN_COUNT
        );

        let mut tokens = Vec::new();
        let mut states = Vec::new();
        let mut tokenizer = Tokenizer::new(source, start, end, initial_state, config);

        loop {
            let state = tokenizer.state();
            let Some(token) = tokenizer.next() else {
                break;
            };

            if tokens.len() >= MAX_TOKEN_COUNT {
                let error = LexerError::TooManyTokens {
                    count: tokens.len(),
                };
                let span = SourceMap::new(source).span(token.start, token.end);
                log_error!(error.error_code(), "Token limit exceeded",
                    span = span,
                    "token_count" => tokens.len(),
                    "limit" => MAX_TOKEN_COUNT
                );
                return Err(error);
            }

            self.metrics.record_token(&token, &self.preferences);
            tokens.push(token);
            states.push(state);
        }

        self.report(source, &tokens);

        log_success!(codes::success::TOKENIZATION_COMPLETE, "Lexical analysis completed",
            "tokens" => tokens.len(),
            "bad_characters" => self.metrics.bad_characters,
            "tags" => self.metrics.tags_opened
        );

        Ok(TokenStream::new(source, tokens, states).with_end_state(tokenizer.state()))
    }

    fn report(&self, source: &str, tokens: &[Token]) {
        if self.preferences.log_bad_characters && self.metrics.bad_characters > 0 {
            let map = SourceMap::new(source);
            for token in tokens.iter().filter(|t| t.kind == TokenKind::BadCharacter) {
                log_warning!(code = codes::lexical::BAD_CHARACTER, "Unrecognized character in tag",
                    span = map.span(token.start, token.end),
                    "char" => token.text(source)
                );
            }
        }

        if self.metrics.oversized_strings > 0 {
            log_warning!("String literal exceeds size limit",
                "count" => self.metrics.oversized_strings,
                "limit" => MAX_STRING_SIZE
            );
        }
    }

    pub fn metrics(&self) -> &LexicalMetrics {
        &self.metrics
    }

    pub fn preferences(&self) -> &LexicalPreferences {
        &self.preferences
    }

    pub fn set_preferences(&mut self, preferences: LexicalPreferences) {
        self.preferences = preferences;
    }
}

impl Default for LexicalAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
