//! Abstract Syntax Tree (AST) representation
//!
//! The tree is immutable once built. Node kinds:
//!
//! - `Literal`: `42`, `1.5`, `'text'`, `true`, `null`
//! - `Variable`: `ip_src_addr`, `source.type`, `event['src'][0]`
//! - `FunctionCall`: `NAME(arg, ...)`
//! - `Binary` / `Unary`: operators in [`BinaryOperator`] and [`UnaryOperator`]
//! - `Conditional`: `c ? a : b`, `if c then a else b` (else optional)
//! - `List`: `[a, b]`
//! - `Map`: `{'k': v}`

use crate::value::Value;
use std::fmt;

/// AST node representing a Stellar expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),

    Variable(String),

    FunctionCall {
        name: String,
        args: Vec<Expr>,
    },

    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },

    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
    },

    List(Vec<Expr>),

    /// Entries keep their source order.
    Map(Vec<(String, Expr)>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Logical
    And,
    Or,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    In,

    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOperator {
    /// Map a canonical comparison operator spelling to its variant
    pub(crate) fn comparison(text: &str) -> Option<Self> {
        Some(match text {
            "==" => Self::Equal,
            "!=" => Self::NotEqual,
            "<" => Self::LessThan,
            "<=" => Self::LessThanOrEqual,
            ">" => Self::GreaterThan,
            ">=" => Self::GreaterThanOrEqual,
            "in" => Self::In,
            _ => return None,
        })
    }

    pub(crate) fn additive(text: &str) -> Option<Self> {
        match text {
            "+" => Some(Self::Add),
            "-" => Some(Self::Subtract),
            _ => None,
        }
    }

    pub(crate) fn multiplicative(text: &str) -> Option<Self> {
        match text {
            "*" => Some(Self::Multiply),
            "/" => Some(Self::Divide),
            "%" => Some(Self::Modulo),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::And => "&&",
            Self::Or => "||",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::In => "in",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Negate,
    /// `exists(x)`: whether `x` evaluates to a non-null value
    Exists,
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::FunctionCall {
            name: name.into(),
            args,
        }
    }

    pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOperator, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Visit this node and all descendants, parents first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::Literal(_) | Expr::Variable(_) => {}
            Expr::FunctionCall { args, .. } | Expr::List(args) => {
                args.iter().for_each(|arg| arg.walk(visit))
            }
            Expr::Binary { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expr::Unary { operand, .. } => operand.walk(visit),
            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                condition.walk(visit);
                then_branch.walk(visit);
                if let Some(else_branch) = else_branch {
                    else_branch.walk(visit);
                }
            }
            Expr::Map(entries) => entries.iter().for_each(|(_, value)| value.walk(visit)),
        }
    }
}

/// The compiled, immutable form of one Stellar source string.
///
/// Equality and hashing use the exact source text, so two expressions that
/// differ only in whitespace are distinct.
#[derive(Debug, Clone)]
pub struct ParsedExpression {
    source: String,
    root: Expr,
}

impl ParsedExpression {
    pub fn new(source: impl Into<String>, root: Expr) -> Self {
        Self {
            source: source.into(),
            root,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Distinct variable names referenced, in first-use order.
    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        self.root.walk(&mut |node| {
            if let Expr::Variable(name) = node {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        });
        names
    }

    /// Distinct function names called, in first-use order.
    pub fn functions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        self.root.walk(&mut |node| {
            if let Expr::FunctionCall { name, .. } = node {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        });
        names
    }
}

impl PartialEq for ParsedExpression {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for ParsedExpression {}

impl std::hash::Hash for ParsedExpression {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.source.hash(state);
    }
}
