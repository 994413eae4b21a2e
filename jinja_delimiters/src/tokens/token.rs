//! Token kinds for the template tokenizer
//!
//! Tokens never own text: a [`Token`] is a kind plus a byte range into the
//! buffer it was produced from.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every kind of token the tokenizer can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    // === DELIMITERS ===
    BlockStart,
    BlockEnd,
    VariableStart,
    VariableEnd,
    CommentStart,
    CommentEnd,

    // === KEYWORDS ===

    // Control flow
    For,
    EndFor,
    If,
    Elif,
    Else,
    EndIf,
    Set,
    With,
    EndWith,

    // Template structure
    Block,
    EndBlock,
    Extends,
    Include,
    Import,
    From,
    As,

    // Macros
    Macro,
    EndMacro,
    Call,
    EndCall,

    // Advanced
    Filter,
    EndFilter,
    Raw,
    EndRaw,
    Autoescape,
    EndAutoescape,
    Trans,
    EndTrans,
    Pluralize,

    // Logic
    In,
    Is,
    Not,
    And,
    Or,

    // Modifiers
    Recursive,
    Scoped,
    Ignore,
    Missing,
    Without,
    Context,

    // === OPERATORS ===
    Assign,      // =
    Plus,        // +
    Minus,       // -
    Multiply,    // *
    Divide,      // /
    FloorDivide, // //
    Modulo,      // %
    Power,       // **
    Eq,          // ==
    Ne,          // !=
    Lt,          // <
    Gt,          // >
    Le,          // <=
    Ge,          // >=
    Pipe,        // |
    Tilde,       // ~

    // === PUNCTUATION ===
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Dot,
    Comma,
    Colon,
    Semicolon,
    Question,

    // === LITERALS ===
    String,
    Integer,
    Float,
    BooleanTrue,
    BooleanFalse,
    None,

    // === NAMES AND CONTENT ===
    Identifier,
    /// Template text, comment content and raw content
    Text,
    Whitespace,
    Newline,
    /// One unrecognized character inside a tag
    BadCharacter,
}

/// Display category consumed by highlighters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenCategory {
    Delimiter,
    Keyword,
    Operator,
    String,
    Number,
    Identifier,
    Comment,
    Text,
    BadCharacter,
    Whitespace,
}

/// Reserved words, looked up after an identifier has been scanned
const KEYWORDS: &[(&str, TokenKind)] = &[
    ("for", TokenKind::For),
    ("endfor", TokenKind::EndFor),
    ("if", TokenKind::If),
    ("elif", TokenKind::Elif),
    ("else", TokenKind::Else),
    ("endif", TokenKind::EndIf),
    ("set", TokenKind::Set),
    ("with", TokenKind::With),
    ("endwith", TokenKind::EndWith),
    ("block", TokenKind::Block),
    ("endblock", TokenKind::EndBlock),
    ("extends", TokenKind::Extends),
    ("include", TokenKind::Include),
    ("import", TokenKind::Import),
    ("from", TokenKind::From),
    ("as", TokenKind::As),
    ("macro", TokenKind::Macro),
    ("endmacro", TokenKind::EndMacro),
    ("call", TokenKind::Call),
    ("endcall", TokenKind::EndCall),
    ("filter", TokenKind::Filter),
    ("endfilter", TokenKind::EndFilter),
    ("raw", TokenKind::Raw),
    ("endraw", TokenKind::EndRaw),
    ("autoescape", TokenKind::Autoescape),
    ("endautoescape", TokenKind::EndAutoescape),
    ("trans", TokenKind::Trans),
    ("endtrans", TokenKind::EndTrans),
    ("pluralize", TokenKind::Pluralize),
    ("in", TokenKind::In),
    ("is", TokenKind::Is),
    ("not", TokenKind::Not),
    ("and", TokenKind::And),
    ("or", TokenKind::Or),
    ("recursive", TokenKind::Recursive),
    ("scoped", TokenKind::Scoped),
    ("ignore", TokenKind::Ignore),
    ("missing", TokenKind::Missing),
    ("without", TokenKind::Without),
    ("context", TokenKind::Context),
    ("true", TokenKind::BooleanTrue),
    ("false", TokenKind::BooleanFalse),
    ("none", TokenKind::None),
];

/// Two-character operators, matched before any single-character one
pub const MULTI_CHAR_OPERATORS: &[(&str, TokenKind)] = &[
    ("==", TokenKind::Eq),
    ("!=", TokenKind::Ne),
    ("<=", TokenKind::Le),
    (">=", TokenKind::Ge),
    ("//", TokenKind::FloorDivide),
    ("**", TokenKind::Power),
];

/// Keyword kind for a scanned word, if it is reserved
pub fn keyword_from_word(word: &str) -> Option<TokenKind> {
    KEYWORDS
        .iter()
        .find(|(text, _)| *text == word)
        .map(|(_, kind)| *kind)
}

/// Source spelling of a reserved word
pub fn keyword_spelling(kind: TokenKind) -> Option<&'static str> {
    KEYWORDS
        .iter()
        .find(|(_, k)| *k == kind)
        .map(|(text, _)| *text)
}

/// Single-character operator or punctuation kind
pub fn single_char_operator(c: u8) -> Option<TokenKind> {
    let kind = match c {
        b'=' => TokenKind::Assign,
        b'+' => TokenKind::Plus,
        b'-' => TokenKind::Minus,
        b'*' => TokenKind::Multiply,
        b'/' => TokenKind::Divide,
        b'%' => TokenKind::Modulo,
        b'<' => TokenKind::Lt,
        b'>' => TokenKind::Gt,
        b'|' => TokenKind::Pipe,
        b'~' => TokenKind::Tilde,
        b'(' => TokenKind::LParen,
        b')' => TokenKind::RParen,
        b'[' => TokenKind::LBracket,
        b']' => TokenKind::RBracket,
        b'{' => TokenKind::LBrace,
        b'}' => TokenKind::RBrace,
        b'.' => TokenKind::Dot,
        b',' => TokenKind::Comma,
        b':' => TokenKind::Colon,
        b';' => TokenKind::Semicolon,
        b'?' => TokenKind::Question,
        _ => return None,
    };
    Some(kind)
}

impl TokenKind {
    pub fn is_delimiter(self) -> bool {
        matches!(
            self,
            Self::BlockStart
                | Self::BlockEnd
                | Self::VariableStart
                | Self::VariableEnd
                | Self::CommentStart
                | Self::CommentEnd
        )
    }

    /// Reserved words, not counting the `true`/`false`/`none` literals
    pub fn is_keyword(self) -> bool {
        KEYWORDS.iter().any(|(_, kind)| *kind == self) && !self.is_literal()
    }

    pub fn is_operator(self) -> bool {
        matches!(
            self,
            Self::Assign
                | Self::Plus
                | Self::Minus
                | Self::Multiply
                | Self::Divide
                | Self::FloorDivide
                | Self::Modulo
                | Self::Power
                | Self::Eq
                | Self::Ne
                | Self::Lt
                | Self::Gt
                | Self::Le
                | Self::Ge
                | Self::Pipe
                | Self::Tilde
        )
    }

    pub fn is_punctuation(self) -> bool {
        matches!(
            self,
            Self::LParen
                | Self::RParen
                | Self::LBracket
                | Self::RBracket
                | Self::LBrace
                | Self::RBrace
                | Self::Dot
                | Self::Comma
                | Self::Colon
                | Self::Semicolon
                | Self::Question
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Self::String
                | Self::Integer
                | Self::Float
                | Self::BooleanTrue
                | Self::BooleanFalse
                | Self::None
        )
    }

    pub fn is_identifier(self) -> bool {
        self == Self::Identifier
    }

    /// Whitespace and newlines; the parser skips these inside tags
    pub fn is_trivia(self) -> bool {
        matches!(self, Self::Whitespace | Self::Newline)
    }

    /// Comparison operators sharing one precedence level
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }

    /// Display category. Text inside comments is reclassified by
    /// [`TokenStream::category_at`](crate::tokens::TokenStream::category_at).
    pub fn category(self) -> TokenCategory {
        match self {
            kind if kind.is_delimiter() => TokenCategory::Delimiter,
            Self::String => TokenCategory::String,
            Self::Integer | Self::Float => TokenCategory::Number,
            Self::BooleanTrue | Self::BooleanFalse | Self::None => TokenCategory::Keyword,
            kind if kind.is_keyword() => TokenCategory::Keyword,
            kind if kind.is_operator() || kind.is_punctuation() => TokenCategory::Operator,
            Self::Identifier => TokenCategory::Identifier,
            Self::Text => TokenCategory::Text,
            Self::BadCharacter => TokenCategory::BadCharacter,
            _ => TokenCategory::Whitespace,
        }
    }

    /// Upper-case name used in token dumps, e.g. `BLOCK_START`
    pub fn name(self) -> &'static str {
        match self {
            Self::BlockStart => "BLOCK_START",
            Self::BlockEnd => "BLOCK_END",
            Self::VariableStart => "VARIABLE_START",
            Self::VariableEnd => "VARIABLE_END",
            Self::CommentStart => "COMMENT_START",
            Self::CommentEnd => "COMMENT_END",
            Self::For => "FOR",
            Self::EndFor => "ENDFOR",
            Self::If => "IF",
            Self::Elif => "ELIF",
            Self::Else => "ELSE",
            Self::EndIf => "ENDIF",
            Self::Set => "SET",
            Self::With => "WITH",
            Self::EndWith => "ENDWITH",
            Self::Block => "BLOCK",
            Self::EndBlock => "ENDBLOCK",
            Self::Extends => "EXTENDS",
            Self::Include => "INCLUDE",
            Self::Import => "IMPORT",
            Self::From => "FROM",
            Self::As => "AS",
            Self::Macro => "MACRO",
            Self::EndMacro => "ENDMACRO",
            Self::Call => "CALL",
            Self::EndCall => "ENDCALL",
            Self::Filter => "FILTER",
            Self::EndFilter => "ENDFILTER",
            Self::Raw => "RAW",
            Self::EndRaw => "ENDRAW",
            Self::Autoescape => "AUTOESCAPE",
            Self::EndAutoescape => "ENDAUTOESCAPE",
            Self::Trans => "TRANS",
            Self::EndTrans => "ENDTRANS",
            Self::Pluralize => "PLURALIZE",
            Self::In => "IN",
            Self::Is => "IS",
            Self::Not => "NOT",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Recursive => "RECURSIVE",
            Self::Scoped => "SCOPED",
            Self::Ignore => "IGNORE",
            Self::Missing => "MISSING",
            Self::Without => "WITHOUT",
            Self::Context => "CONTEXT",
            Self::Assign => "ASSIGN",
            Self::Plus => "PLUS",
            Self::Minus => "MINUS",
            Self::Multiply => "MULTIPLY",
            Self::Divide => "DIVIDE",
            Self::FloorDivide => "FLOOR_DIVIDE",
            Self::Modulo => "MODULO",
            Self::Power => "POWER",
            Self::Eq => "EQ",
            Self::Ne => "NE",
            Self::Lt => "LT",
            Self::Gt => "GT",
            Self::Le => "LE",
            Self::Ge => "GE",
            Self::Pipe => "PIPE",
            Self::Tilde => "TILDE",
            Self::LParen => "LPAREN",
            Self::RParen => "RPAREN",
            Self::LBracket => "LBRACKET",
            Self::RBracket => "RBRACKET",
            Self::LBrace => "LBRACE",
            Self::RBrace => "RBRACE",
            Self::Dot => "DOT",
            Self::Comma => "COMMA",
            Self::Colon => "COLON",
            Self::Semicolon => "SEMICOLON",
            Self::Question => "QUESTION",
            Self::String => "STRING",
            Self::Integer => "INTEGER",
            Self::Float => "FLOAT",
            Self::BooleanTrue => "BOOLEAN_TRUE",
            Self::BooleanFalse => "BOOLEAN_FALSE",
            Self::None => "NONE",
            Self::Identifier => "IDENTIFIER",
            Self::Text => "TEXT",
            Self::Whitespace => "WHITESPACE",
            Self::Newline => "NEWLINE",
            Self::BadCharacter => "BAD_CHARACTER",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A token: kind plus the byte range `start..end` of the source buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn new(kind: TokenKind, start: usize, end: usize) -> Self {
        Self { kind, start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Slice of `source` this token covers
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}..{}", self.kind, self.start, self.end)
    }
}
