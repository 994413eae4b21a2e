//! Token model for the template tokenizer
//!
//! ## Key Components
//!
//! - **[`TokenKind`]** - closed set of token kinds: delimiters, reserved
//!   words, operators and punctuation, literals, text and trivia
//! - **[`Token`]** - a kind plus a byte range; text is sliced from the source
//!   on demand
//! - **[`TokenStream`]** - the complete sequence for one buffer together with
//!   the lexer state of every token, used for restart points and incremental
//!   re-lexing
//! - **[`TokenCursor`]** - parser read position over a stream
//!
//! ## Categories
//!
//! [`TokenKind::category`] groups kinds for highlighters. Text scanned inside
//! a comment has kind `Text` like any other text; the stream reports it as
//! [`TokenCategory::Comment`] because it knows the state it was scanned in.

pub mod token;
pub mod token_stream;

pub use token::{Token, TokenCategory, TokenKind};
pub use token_stream::{TokenCursor, TokenStream};

pub use crate::lexical::LexState;
