//! Stellar lexer - tokenizes input strings
//!
//! Converts Stellar source text into a finite sequence of tokens. Comments are
//! stripped, keyword operators are normalized to their symbolic spelling, and a
//! leading `-` is folded into a number literal only where it cannot be a binary
//! minus.

use crate::error::{Error, Result};
use crate::token::{Token, TokenKind};
use phf::phf_map;

/// Word operators, keyed by their lower-case spelling.
static KEYWORD_OPERATORS: phf::Map<&'static str, &'static str> = phf_map! {
    "and" => "&&",
    "or" => "||",
    "not" => "!",
    "in" => "in",
    "exists" => "exists",
};

/// The Stellar lexer
pub struct Lexer {
    chars: Vec<char>,
    position: usize,
    current_char: Option<char>,
    prev_ends_operand: bool,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            chars,
            position: 0,
            current_char,
            prev_ends_operand: false,
        }
    }

    /// Tokenize the whole input. The returned sequence always ends with `Eof`.
    pub fn tokenize(input: &str) -> Result<Vec<Token>> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.chars.get(self.position).copied();
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(1)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.position + offset).copied()
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> Error {
        Error::Lex {
            offset,
            found: self.chars.get(offset).copied().unwrap_or('\0'),
            message: message.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current_char {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Skip a comment at the current position. Returns whether one was skipped.
    fn skip_comment(&mut self) -> Result<bool> {
        if self.current_char == Some('/') && self.peek() == Some('/') {
            while let Some(c) = self.current_char {
                self.advance();
                if c == '\n' {
                    break;
                }
            }
            Ok(true)
        } else if self.current_char == Some('/') && self.peek() == Some('*') {
            let start = self.position;
            self.advance();
            self.advance();
            while let Some(c) = self.current_char {
                if c == '*' && self.peek() == Some('/') {
                    self.advance();
                    self.advance();
                    return Ok(true);
                }
                self.advance();
            }
            Err(self.error(start, "Unterminated block comment"))
        } else {
            Ok(false)
        }
    }

    /// Read an identifier, including dotted segments and directly attached
    /// bracket accessors such as `a['b'][0]`.
    fn read_identifier(&mut self) -> String {
        let start = self.position;
        while let Some(c) = self.current_char {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                self.advance();
            } else {
                break;
            }
        }
        let mut text: String = self.chars[start..self.position].iter().collect();

        while self.current_char == Some('[') {
            match self.bracket_segment_len() {
                Some(len) => {
                    for _ in 0..len {
                        if let Some(c) = self.current_char {
                            text.push(c);
                        }
                        self.advance();
                    }
                }
                None => break,
            }
        }
        text
    }

    /// Length of a `[<digits>]` or `['<text>']` accessor at the current
    /// position, or `None` if the bracket is not a member accessor.
    fn bracket_segment_len(&self) -> Option<usize> {
        let mut i = 1;
        match self.peek_at(i)? {
            quote @ ('\'' | '"') => {
                i += 1;
                loop {
                    let c = self.peek_at(i)?;
                    i += 1;
                    if c == quote {
                        break;
                    }
                }
            }
            c if c.is_ascii_digit() => {
                while self.peek_at(i).is_some_and(|c| c.is_ascii_digit()) {
                    i += 1;
                }
            }
            _ => return None,
        }
        (self.peek_at(i)? == ']').then_some(i + 1)
    }

    /// Read a string literal delimited by `quote`
    fn read_string(&mut self, quote: char) -> Result<String> {
        let start = self.position;
        self.advance(); // Skip opening quote

        let mut value = String::new();

        while let Some(c) = self.current_char {
            if c == quote {
                self.advance();
                return Ok(value);
            } else if c == '\\' {
                self.advance();
                let Some(escaped) = self.current_char else {
                    break;
                };
                match escaped {
                    '\'' => value.push('\''),
                    '"' => value.push('"'),
                    '\\' => value.push('\\'),
                    'n' => value.push('\n'),
                    'r' => value.push('\r'),
                    't' => value.push('\t'),
                    'u' => {
                        let escape_at = self.position - 1;
                        self.advance(); // Skip 'u'
                        let mut hex = String::new();
                        for _ in 0..4 {
                            match self.current_char {
                                Some(h) if h.is_ascii_hexdigit() => {
                                    hex.push(h);
                                    self.advance();
                                }
                                _ => {
                                    return Err(self.error(
                                        escape_at,
                                        "Invalid unicode escape sequence",
                                    ))
                                }
                            }
                        }
                        let code = u32::from_str_radix(&hex, 16)
                            .map_err(|_| self.error(escape_at, "Invalid unicode code point"))?;
                        value.push(
                            char::from_u32(code)
                                .ok_or_else(|| self.error(escape_at, "Invalid unicode character"))?,
                        );
                        continue; // Don't advance again after unicode sequence
                    }
                    // Unknown escapes keep their backslash so regex classes survive
                    other => {
                        value.push('\\');
                        value.push(other);
                    }
                }
                self.advance();
            } else {
                value.push(c);
                self.advance();
            }
        }

        Err(self.error(start, "Unterminated string literal"))
    }

    /// Read a number literal, with an optional leading minus already at the
    /// current position. Returns normalized text: integers keep their digits,
    /// floats always contain `.` or an exponent.
    fn read_number(&mut self) -> Result<String> {
        let start = self.position;
        if self.current_char == Some('-') {
            self.advance();
        }

        let mut is_float = false;
        while self.current_char.is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.current_char == Some('.') && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.current_char.is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        if matches!(self.current_char, Some('e' | 'E')) {
            let digits_at = match self.peek() {
                Some('+' | '-') => 2,
                _ => 1,
            };
            if self.peek_at(digits_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                for _ in 0..digits_at {
                    self.advance();
                }
                while self.current_char.is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let text: String = self.chars[start..self.position].iter().collect();

        let mut force_float = false;
        match self.current_char {
            Some('L' | 'l') if !is_float => self.advance(),
            Some('f' | 'F' | 'd' | 'D') => {
                force_float = true;
                self.advance();
            }
            _ => {}
        }

        if self
            .current_char
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            return Err(self.error(self.position, "Invalid number literal"));
        }

        if is_float || force_float {
            let value: f64 = text
                .parse()
                .map_err(|_| self.error(start, "Invalid number literal"))?;
            if !value.is_finite() {
                return Err(self.error(start, "Float literal out of range"));
            }
            Ok(format!("{:?}", value))
        } else {
            text.parse::<i64>()
                .map_err(|_| self.error(start, "Integer literal out of range"))?;
            Ok(text)
        }
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Result<Token> {
        loop {
            self.skip_whitespace();
            if !self.skip_comment()? {
                break;
            }
        }

        let token = self.scan()?;
        self.prev_ends_operand = token.ends_operand();
        Ok(token)
    }

    fn scan(&mut self) -> Result<Token> {
        let position = self.position;

        let Some(c) = self.current_char else {
            return Ok(Token::eof(position));
        };

        let token = match c {
            '\'' | '"' => Token::new(TokenKind::String, self.read_string(c)?, position),
            c if c.is_ascii_digit() => Token::new(TokenKind::Number, self.read_number()?, position),
            '-' if !self.prev_ends_operand && self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                Token::new(TokenKind::Number, self.read_number()?, position)
            }
            c if c.is_alphabetic() || c == '_' => {
                let word = self.read_identifier();
                match KEYWORD_OPERATORS.get(word.to_ascii_lowercase().as_str()) {
                    Some(op) => Token::new(TokenKind::Operator, *op, position),
                    None => Token::new(TokenKind::Identifier, word, position),
                }
            }
            '(' => self.single(TokenKind::LParen, position),
            ')' => self.single(TokenKind::RParen, position),
            '[' => self.single(TokenKind::LBracket, position),
            ']' => self.single(TokenKind::RBracket, position),
            '{' => self.single(TokenKind::LBrace, position),
            '}' => self.single(TokenKind::RBrace, position),
            ',' => self.single(TokenKind::Comma, position),
            ':' => self.single(TokenKind::Colon, position),
            '+' | '-' | '*' | '/' | '%' | '?' => self.single(TokenKind::Operator, position),
            '=' => {
                if self.peek() == Some('=') {
                    self.operator("==", position)
                } else {
                    return Err(self.error(position, "Expected '=='"));
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.operator("!=", position)
                } else {
                    self.single(TokenKind::Operator, position)
                }
            }
            '<' | '>' => {
                if self.peek() == Some('=') {
                    let op = if c == '<' { "<=" } else { ">=" };
                    self.operator(op, position)
                } else {
                    self.single(TokenKind::Operator, position)
                }
            }
            '&' | '|' => {
                if self.peek() == Some(c) {
                    let op = if c == '&' { "&&" } else { "||" };
                    self.operator(op, position)
                } else {
                    return Err(self.error(position, format!("Expected '{c}{c}'")));
                }
            }
            _ => return Err(self.error(position, "Invalid character")),
        };

        Ok(token)
    }

    fn single(&mut self, kind: TokenKind, position: usize) -> Token {
        let text = self.current_char.map(String::from).unwrap_or_default();
        self.advance();
        Token::new(kind, text, position)
    }

    fn operator(&mut self, op: &str, position: usize) -> Token {
        for _ in 0..op.chars().count() {
            self.advance();
        }
        Token::new(TokenKind::Operator, op, position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn bracket_segments_fold_into_identifier() {
        let tokens = Lexer::tokenize("event['src'][0]").unwrap();
        assert_eq!(tokens[0].text, "event['src'][0]");
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn bracket_with_expression_is_not_folded() {
        assert_eq!(
            kinds("a[b]"),
            vec![
                TokenKind::Identifier,
                TokenKind::LBracket,
                TokenKind::Identifier,
                TokenKind::RBracket,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn float_suffix_normalizes_text() {
        let tokens = Lexer::tokenize("2f").unwrap();
        assert_eq!(tokens[0].text, "2.0");
        let tokens = Lexer::tokenize("7L").unwrap();
        assert_eq!(tokens[0].text, "7");
    }
}
