//! Token stream with per-token lexer state
//!
//! The stream owns the source and the complete token sequence, trivia
//! included, so spans always reconstruct the buffer. The lexer state each
//! token was scanned in is kept alongside, which is what makes restarting the
//! tokenizer mid-buffer possible.

use crate::config::DelimiterConfig;
use crate::lexical::{LexState, LexerError, LexicalAnalyzer};
use crate::tokens::token::{Token, TokenCategory, TokenKind};
use crate::utils::{SourceMap, Span};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenStream {
    source: String,
    tokens: Vec<Token>,
    /// Lexer state at the start of each token
    states: Vec<LexState>,
    /// Lexer state after the last token
    end_state: LexState,
}

impl TokenStream {
    pub fn new(source: impl Into<String>, tokens: Vec<Token>, states: Vec<LexState>) -> Self {
        Self {
            source: source.into(),
            tokens,
            states,
            end_state: LexState::Template,
        }
    }

    pub fn with_end_state(mut self, state: LexState) -> Self {
        self.end_state = state;
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn states(&self) -> &[LexState] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn kind_at(&self, index: usize) -> Option<TokenKind> {
        self.tokens.get(index).map(|t| t.kind)
    }

    pub fn text_at(&self, index: usize) -> &str {
        self.tokens
            .get(index)
            .map(|t| t.text(&self.source))
            .unwrap_or("")
    }

    pub fn state_at(&self, index: usize) -> Option<LexState> {
        self.states.get(index).copied()
    }

    /// State the lexer was left in by token `index`
    pub fn state_after(&self, index: usize) -> Option<LexState> {
        if index >= self.tokens.len() {
            return None;
        }
        Some(self.states.get(index + 1).copied().unwrap_or(self.end_state))
    }

    pub fn end_state(&self) -> LexState {
        self.end_state
    }

    pub fn source_map(&self) -> SourceMap {
        SourceMap::new(self.source.as_str())
    }

    pub fn span_at(&self, map: &SourceMap, index: usize) -> Option<Span> {
        self.tokens.get(index).map(|t| map.span(t.start, t.end))
    }

    // === CLASSIFICATION ===

    /// TEXT scanned inside a block or line comment
    pub fn is_comment_content(&self, index: usize) -> bool {
        self.kind_at(index) == Some(TokenKind::Text)
            && matches!(
                self.state_at(index),
                Some(LexState::Comment | LexState::LineComment)
            )
    }

    /// Display category, with comment text reported as `Comment`
    pub fn category_at(&self, index: usize) -> Option<TokenCategory> {
        let kind = self.kind_at(index)?;
        if self.is_comment_content(index) {
            Some(TokenCategory::Comment)
        } else {
            Some(kind.category())
        }
    }

    /// Indices of tokens other than whitespace and newlines
    pub fn significant_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.kind.is_trivia())
            .map(|(i, _)| i)
    }

    pub fn significant_kinds(&self) -> Vec<TokenKind> {
        self.significant_indices()
            .map(|i| self.tokens[i].kind)
            .collect()
    }

    // === WORD SCANNING ===

    pub fn identifiers(&self) -> Vec<&str> {
        self.texts_where(|stream, i| stream.tokens[i].kind.is_identifier())
    }

    pub fn comment_texts(&self) -> Vec<&str> {
        self.texts_where(|stream, i| stream.is_comment_content(i))
    }

    pub fn string_literals(&self) -> Vec<&str> {
        self.texts_where(|stream, i| stream.tokens[i].kind == TokenKind::String)
    }

    fn texts_where<F>(&self, predicate: F) -> Vec<&str>
    where
        F: Fn(&Self, usize) -> bool,
    {
        (0..self.tokens.len())
            .filter(|&i| predicate(self, i))
            .map(|i| self.tokens[i].text(&self.source))
            .collect()
    }

    // === RESTART POINTS ===

    /// Offset and state from which lexing can resume at or before `index`.
    ///
    /// Tokens inside a block tag are skipped back to the tag start, since the
    /// tokenizer carries raw-block state across a tag that the recorded state
    /// alone cannot restore.
    pub fn restart_point(&self, index: usize) -> Option<(usize, LexState)> {
        if index >= self.tokens.len() {
            return None;
        }
        let mut i = index;
        while i > 0 && self.states[i] == LexState::Block {
            i -= 1;
        }
        Some((self.tokens[i].start, self.states[i]))
    }

    /// Re-tokenize after an edit that leaves `new_source[..edit_offset]`
    /// identical to the current source. Tokens before the restart point are
    /// reused.
    ///
    /// Lexing resumes one token before the first touched one: an edit inside
    /// a delimiter can turn it into text that joins the preceding run.
    pub fn relex(
        &self,
        new_source: &str,
        edit_offset: usize,
        config: &DelimiterConfig,
    ) -> Result<TokenStream, LexerError> {
        let mut analyzer = LexicalAnalyzer::new();

        let touched = self
            .tokens
            .iter()
            .position(|t| t.end >= edit_offset)
            .or_else(|| self.tokens.len().checked_sub(1));

        let Some(first) = touched.and_then(|i| self.restart_point(i)) else {
            return analyzer.tokenize_source(new_source, config);
        };
        let (restart_offset, state) = self
            .kept_before(first.0)
            .checked_sub(1)
            .and_then(|i| self.restart_point(i))
            .unwrap_or(first);

        let keep = self.kept_before(restart_offset);

        let tail = analyzer.tokenize_range(
            new_source,
            restart_offset,
            new_source.len(),
            state,
            config,
        )?;

        let mut tokens = self.tokens[..keep].to_vec();
        let mut states = self.states[..keep].to_vec();
        tokens.extend_from_slice(tail.tokens());
        states.extend_from_slice(tail.states());

        Ok(TokenStream::new(new_source, tokens, states).with_end_state(tail.end_state()))
    }

    /// Number of tokens starting before `offset`
    fn kept_before(&self, offset: usize) -> usize {
        self.tokens.iter().take_while(|t| t.start < offset).count()
    }

    // === VALIDATION ===

    /// Concatenated token text
    pub fn reconstruct(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.text(&self.source))
            .collect()
    }

    /// Tokens must be non-empty, contiguous and end at the end of the source
    pub fn validate_coverage(&self) -> Result<(), String> {
        let mut expected = self.tokens.first().map(|t| t.start).unwrap_or(0);
        for (i, token) in self.tokens.iter().enumerate() {
            if token.start != expected {
                return Err(format!(
                    "Token {} starts at {} but previous token ended at {}",
                    i, token.start, expected
                ));
            }
            if token.is_empty() {
                return Err(format!("Token {} ({}) is empty", i, token.kind));
            }
            expected = token.end;
        }
        if !self.tokens.is_empty() && expected != self.source.len() {
            return Err(format!(
                "Tokens end at {} but source is {} bytes",
                expected,
                self.source.len()
            ));
        }
        Ok(())
    }

    /// Token dump, one `KIND start..end "text"` line per token
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            out.push_str(&format!(
                "{:<14} {}..{} {:?}\n",
                token.kind.name(),
                token.start,
                token.end,
                token.text(&self.source)
            ));
        }
        out
    }
}

// ============================================================================
// CURSOR
// ============================================================================

/// Read position over a [`TokenStream`] used by the parser
#[derive(Debug, Clone)]
pub struct TokenCursor<'s> {
    stream: &'s TokenStream,
    position: usize,
}

impl<'s> TokenCursor<'s> {
    pub fn new(stream: &'s TokenStream) -> Self {
        Self {
            stream,
            position: 0,
        }
    }

    pub fn stream(&self) -> &'s TokenStream {
        self.stream
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.stream.len()
    }

    pub fn current(&self) -> Option<&'s Token> {
        self.stream.get(self.position)
    }

    pub fn current_kind(&self) -> Option<TokenKind> {
        self.stream.kind_at(self.position)
    }

    /// Kind `n` tokens ahead, trivia included
    pub fn peek_kind(&self, n: usize) -> Option<TokenKind> {
        self.stream.kind_at(self.position + n)
    }

    /// Offset of the current token, or the end of the source
    pub fn offset(&self) -> usize {
        self.current()
            .map(|t| t.start)
            .unwrap_or(self.stream.source().len())
    }

    /// Move past the current token, returning its index
    pub fn advance(&mut self) -> Option<usize> {
        if self.is_at_end() {
            return None;
        }
        self.position += 1;
        Some(self.position - 1)
    }

    pub fn save_position(&self) -> usize {
        self.position
    }

    pub fn restore_position(&mut self, saved_position: usize) {
        self.position = saved_position.min(self.stream.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::tokenize_source;

    fn stream(source: &str) -> TokenStream {
        tokenize_source(source, &DelimiterConfig::default()).unwrap()
    }

    #[test]
    fn test_comment_content_classification() {
        let stream = stream("text {# note #}");
        assert!(!stream.is_comment_content(0));
        assert!(stream.is_comment_content(2));
        assert_eq!(stream.category_at(2), Some(TokenCategory::Comment));
        assert_eq!(stream.category_at(0), Some(TokenCategory::Text));
        assert_eq!(stream.comment_texts(), vec![" note "]);
    }

    #[test]
    fn test_word_scanning() {
        let stream = stream("{{ user.name ~ 'x' }}{# hi #}");
        assert_eq!(stream.identifiers(), vec!["user", "name"]);
        assert_eq!(stream.string_literals(), vec!["'x'"]);
    }

    #[test]
    fn test_coverage_and_reconstruct() {
        let source = "a {% if b %}\n{{ c }}{% endif %}";
        let stream = stream(source);
        assert!(stream.validate_coverage().is_ok());
        assert_eq!(stream.reconstruct(), source);

        let broken = TokenStream::new(
            "abc",
            vec![Token::new(TokenKind::Text, 0, 1), Token::new(TokenKind::Text, 2, 3)],
            vec![LexState::Template; 2],
        );
        assert!(broken.validate_coverage().is_err());
    }

    #[test]
    fn test_restart_point_skips_back_to_tag_start() {
        let stream = stream("x{% raw %}{{ y }}{% endraw %}");
        // Index 3 is the `raw` keyword, scanned in Block state
        assert_eq!(stream.kind_at(3), Some(TokenKind::Raw));
        assert_eq!(stream.restart_point(3), Some((1, LexState::Template)));

        let text_index = stream
            .tokens()
            .iter()
            .position(|t| t.kind == TokenKind::Text && t.start > 1)
            .unwrap();
        assert_eq!(
            stream.restart_point(text_index),
            Some((stream.tokens()[text_index].start, LexState::Raw))
        );
        assert_eq!(stream.restart_point(stream.len()), None);
    }

    #[test]
    fn test_restart_reproduces_full_lex() {
        let config = DelimiterConfig::default();
        let source = "{# c #}{% raw %}{{ y }}{% endraw %}\n{{ a | f(1) }} tail";
        let full = stream(source);

        for index in 0..full.len() {
            let (offset, state) = full.restart_point(index).unwrap();
            let first = full.tokens().iter().position(|t| t.start == offset).unwrap();
            let resumed: Vec<Token> =
                crate::lexical::tokenize(source, offset, source.len(), state, &config).collect();
            assert_eq!(resumed.as_slice(), &full.tokens()[first..], "restart at {}", index);
        }
    }

    #[test]
    fn test_relex_matches_fresh_tokenize() {
        let config = DelimiterConfig::default();
        let before = "{% for x in xs %}{{ x }}{% endfor %}";
        let after = "{% for x in xs %}{{ x.name | upper }}{% endfor %}";
        let edit_offset = before.find(" }}").unwrap();

        let relexed = stream(before).relex(after, edit_offset, &config).unwrap();
        assert_eq!(relexed, stream(after));
    }

    #[test]
    fn test_relex_at_every_insertion_point() {
        let config = DelimiterConfig::default().with_line_prefixes("%%", "##");
        let before = "ab{{ x }}\n%% if y\n{# c #}{% raw %}r{{ }}{% endraw %}t 1.5";
        let original = tokenize_source(before, &config).unwrap();

        for (pos, _) in before.char_indices() {
            for insert in ["x", "{", "}", "%", "#", " ", "\n", "{{", "2"] {
                let after = format!("{}{}{}", &before[..pos], insert, &before[pos..]);
                let relexed = original.relex(&after, pos, &config).unwrap();
                let fresh = tokenize_source(&after, &config).unwrap();
                assert_eq!(relexed, fresh, "insert {:?} at {}", insert, pos);
            }
        }
    }

    #[test]
    fn test_relex_into_raw_block() {
        let config = DelimiterConfig::default();
        let before = "{% raw %}abc{% endraw %}";
        let after = "{% raw %}a{{ b }}c{% endraw %}";
        let relexed = stream(before).relex(after, 10, &config).unwrap();
        assert_eq!(relexed, stream(after));
    }

    #[test]
    fn test_cursor_navigation() {
        let stream = stream("{{ a }}");
        let mut cursor = TokenCursor::new(&stream);
        assert_eq!(cursor.current_kind(), Some(TokenKind::VariableStart));
        assert_eq!(cursor.peek_kind(2), Some(TokenKind::Identifier));

        let saved = cursor.save_position();
        assert_eq!(cursor.advance(), Some(0));
        assert_eq!(cursor.current_kind(), Some(TokenKind::Whitespace));
        cursor.restore_position(saved);
        assert_eq!(cursor.position(), 0);

        while cursor.advance().is_some() {}
        assert!(cursor.is_at_end());
        assert_eq!(cursor.offset(), 7);
        assert_eq!(cursor.current_kind(), None);
    }
}
