//! Token types for the Stellar lexer

/// Token kinds produced by the lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    Operator,

    // Delimiters
    LParen,   // (
    RParen,   // )
    Comma,    // ,
    LBracket, // [
    RBracket, // ]
    LBrace,   // {
    RBrace,   // }
    Colon,    // :

    // End of input
    Eof,
}

/// A token in a Stellar expression.
///
/// `text` is the source text for identifiers and numbers, the unescaped body for
/// strings, and the canonical spelling for operators (`and` lexes as `&&`).
/// `offset` counts characters, not bytes, from the start of the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, offset: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            offset,
        }
    }

    pub fn eof(offset: usize) -> Self {
        Self::new(TokenKind::Eof, "", offset)
    }

    /// True if this is the operator `op` (canonical spelling).
    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }

    /// True if this is an identifier spelled `word`, ignoring ASCII case.
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text.eq_ignore_ascii_case(word)
    }

    /// Whether this token can end an operand, which decides if a following `-`
    /// is a binary minus or the sign of a number literal. The conditional
    /// words `if`, `then` and `else` never end one.
    pub fn ends_operand(&self) -> bool {
        if self.kind == TokenKind::Identifier {
            return !["if", "then", "else"].iter().any(|w| self.is_word(w));
        }
        matches!(
            self.kind,
            TokenKind::Number
                | TokenKind::String
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
        )
    }
}
