//! Stellar parser - converts token sequences to an AST
//!
//! Recursive descent parser with fixed precedence (lowest to highest):
//! 1. conditional (`c ? a : b`)
//! 2. logical or (`||`, `or`)
//! 3. logical and (`&&`, `and`)
//! 4. not (`!`, `not`)
//! 5. comparison (`==`, `!=`, `<`, `<=`, `>`, `>=`, `in`)
//! 6. additive (`+`, `-`)
//! 7. multiplicative (`*`, `/`, `%`)
//! 8. unary (`-`, `exists`)
//! 9. call (`NAME(args)`)
//! 10. primary (literal, variable, `if`, parenthesized, list, map)
//!
//! Function names and arities are not checked here; any comma-separated
//! argument list is accepted and validated by the function when it runs.

use crate::ast::*;
use crate::error::{Error, Result};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
use crate::value::Value;

/// Default limit on expression nesting
pub const MAX_RECURSION_DEPTH: usize = 200;

/// Parse source text into a [`ParsedExpression`]. Pure and deterministic.
pub fn parse(source: &str) -> Result<ParsedExpression> {
    parse_with_depth(source, MAX_RECURSION_DEPTH)
}

/// Parse with an explicit nesting limit.
pub fn parse_with_depth(source: &str, max_depth: usize) -> Result<ParsedExpression> {
    let tokens = Lexer::tokenize(source)?;
    let root = Parser::new(tokens).with_max_depth(max_depth).parse()?;
    Ok(ParsedExpression::new(source, root))
}

/// Parser for Stellar expressions
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    recursion_depth: usize,
    max_depth: usize,
}

impl Parser {
    /// Create a parser over a token sequence ending in `Eof`.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let end = tokens
                .last()
                .map(|t| t.offset + t.text.chars().count())
                .unwrap_or(0);
            tokens.push(Token::eof(end));
        }
        Self {
            tokens,
            position: 0,
            recursion_depth: 0,
            max_depth: MAX_RECURSION_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parse exactly one expression spanning the whole input.
    pub fn parse(&mut self) -> Result<Expr> {
        let expr = self.parse_expression()?;

        if !self.current_is(TokenKind::Eof) {
            return Err(Error::parse_at(
                self.current(),
                "Unexpected token after complete expression",
            ));
        }

        Ok(expr)
    }

    fn current(&self) -> &Token {
        // `new` guarantees a trailing Eof, and `advance` never moves past it
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.tokens[(self.position + 1).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.position += 1;
        }
        token
    }

    fn current_is(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn current_is_operator(&self, op: &str) -> bool {
        self.current().is_operator(op)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        if self.current_is(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("Expected {what}")))
        }
    }

    fn unexpected(&self, message: &str) -> Error {
        let token = self.current();
        if token.kind == TokenKind::Eof {
            Error::parse_at(token, format!("{message}, but reached end of input"))
        } else {
            Error::parse_at(token, message)
        }
    }

    fn check_recursion_depth(&mut self) -> Result<()> {
        self.recursion_depth += 1;
        if self.recursion_depth > self.max_depth {
            return Err(Error::parse_at(
                self.current(),
                format!(
                    "Expression too deeply nested (max depth: {})",
                    self.max_depth
                ),
            ));
        }
        Ok(())
    }

    fn decrement_recursion_depth(&mut self) {
        self.recursion_depth -= 1;
    }

    fn parse_expression(&mut self) -> Result<Expr> {
        self.check_recursion_depth()?;
        let expr = self.parse_conditional()?;
        self.decrement_recursion_depth();
        Ok(expr)
    }

    /// `or ('?' expression ':' expression)?`, right associative
    fn parse_conditional(&mut self) -> Result<Expr> {
        let condition = self.parse_or()?;

        if !self.current_is_operator("?") {
            return Ok(condition);
        }
        self.advance();
        let then_branch = self.parse_expression()?;
        self.expect(TokenKind::Colon, "':' in conditional expression")?;
        let else_branch = self.parse_expression()?;

        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Some(Box::new(else_branch)),
        })
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.current_is_operator("||") {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::binary(BinaryOperator::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.current_is_operator("&&") {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::binary(BinaryOperator::And, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.current_is_operator("!") {
            self.advance();
            self.check_recursion_depth()?;
            let operand = self.parse_not()?;
            self.decrement_recursion_depth();
            return Ok(Expr::unary(UnaryOperator::Not, operand));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut left = self.parse_additive()?;
        while let Some(op) = self.operator_with(BinaryOperator::comparison) {
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;
        while let Some(op) = self.operator_with(BinaryOperator::additive) {
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        while let Some(op) = self.operator_with(BinaryOperator::multiplicative) {
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn operator_with(&self, map: fn(&str) -> Option<BinaryOperator>) -> Option<BinaryOperator> {
        let token = self.current();
        if token.kind == TokenKind::Operator {
            map(&token.text)
        } else {
            None
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = if self.current_is_operator("-") {
            UnaryOperator::Negate
        } else if self.current_is_operator("!") {
            UnaryOperator::Not
        } else if self.current_is_operator("exists") {
            UnaryOperator::Exists
        } else {
            return self.parse_call();
        };

        self.advance();
        self.check_recursion_depth()?;
        let operand = self.parse_unary()?;
        self.decrement_recursion_depth();
        Ok(Expr::unary(op, operand))
    }

    /// `identifier '(' (expression (',' expression)*)? ')'` or a primary
    fn parse_call(&mut self) -> Result<Expr> {
        let is_call = self.current_is(TokenKind::Identifier)
            && self.peek().kind == TokenKind::LParen
            && !self.current().is_word("if");
        if !is_call {
            return self.parse_primary();
        }

        let name = self.advance().text;
        self.advance(); // Skip '('
        let args = self.parse_delimited(TokenKind::RParen, "')' after function arguments")?;
        Ok(Expr::FunctionCall { name, args })
    }

    /// Comma-separated expressions up to and including `close`. The opening
    /// delimiter has already been consumed.
    fn parse_delimited(&mut self, close: TokenKind, what: &str) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        if self.current_is(close) {
            self.advance();
            return Ok(items);
        }
        loop {
            items.push(self.parse_expression()?);
            if self.current_is(TokenKind::Comma) {
                self.advance();
            } else {
                self.expect(close, what)?;
                return Ok(items);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Number => {
                self.advance();
                Ok(Expr::Literal(number_literal(&token)?))
            }
            TokenKind::String => {
                self.advance();
                Ok(Expr::Literal(Value::String(token.text)))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            TokenKind::LBracket => {
                self.advance();
                let items = self.parse_delimited(TokenKind::RBracket, "']' after list items")?;
                Ok(Expr::List(items))
            }
            TokenKind::LBrace => {
                self.advance();
                self.parse_map()
            }
            TokenKind::Identifier => self.parse_identifier(),
            TokenKind::Eof => Err(self.unexpected("Expected an expression")),
            _ => Err(Error::parse_at(&token, "Unexpected token")),
        }
    }

    fn parse_identifier(&mut self) -> Result<Expr> {
        let token = self.advance();
        let lowered = token.text.to_ascii_lowercase();
        match lowered.as_str() {
            "true" => Ok(Expr::Literal(Value::Bool(true))),
            "false" => Ok(Expr::Literal(Value::Bool(false))),
            "null" => Ok(Expr::Literal(Value::Null)),
            "if" => self.parse_if(),
            _ => Ok(Expr::Variable(token.text)),
        }
    }

    /// `if` already consumed: `condition 'then' expression ('else' expression)?`
    fn parse_if(&mut self) -> Result<Expr> {
        let condition = self.parse_expression()?;
        if !self.current().is_word("then") {
            return Err(self.unexpected("Expected 'then'"));
        }
        self.advance();
        let then_branch = self.parse_expression()?;

        let else_branch = if self.current().is_word("else") {
            self.advance();
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch,
        })
    }

    /// `{` already consumed: `(key ':' expression (',' key ':' expression)*)? '}'`
    fn parse_map(&mut self) -> Result<Expr> {
        let mut entries = Vec::new();
        if self.current_is(TokenKind::RBrace) {
            self.advance();
            return Ok(Expr::Map(entries));
        }
        loop {
            let key = match self.current().kind {
                TokenKind::String | TokenKind::Identifier | TokenKind::Number => {
                    self.advance().text
                }
                _ => return Err(self.unexpected("Expected a map key")),
            };
            self.expect(TokenKind::Colon, "':' after map key")?;
            let value = self.parse_expression()?;
            entries.push((key, value));

            if self.current_is(TokenKind::Comma) {
                self.advance();
            } else {
                self.expect(TokenKind::RBrace, "'}' after map entries")?;
                return Ok(Expr::Map(entries));
            }
        }
    }
}

fn number_literal(token: &Token) -> Result<Value> {
    let text = token.text.as_str();
    if text.contains(['.', 'e', 'E']) {
        text.parse::<f64>()
            .map(Value::Float)
            .map_err(|_| Error::parse_at(token, "Invalid number literal"))
    } else {
        text.parse::<i64>()
            .map(Value::Int)
            .map_err(|_| Error::parse_at(token, "Invalid number literal"))
    }
}
