//! Tree-walking evaluator
//!
//! Evaluates a [`ParsedExpression`] against a [`VariableResolver`] and a
//! [`FunctionRegistry`]. Evaluation holds no mutable state, so one parsed
//! expression can be evaluated from many threads at once.
//!
//! Operand coercions:
//!
//! | operator          | operands                    | result                    |
//! |-------------------|-----------------------------|---------------------------|
//! | `&&` `||` `!`     | Null → false, Bool          | Bool, other → TypeError   |
//! | `==` `!=`         | any                         | Bool (numbers widen)      |
//! | `<` `<=` `>` `>=` | numbers, strings, bools     | Bool, Null → false        |
//! | `+ - * / %`       | Int, Float, `+` on strings  | Int/Float, Null → Null    |
//! | `in`              | list, map keys, substring   | Bool, Null → false        |

use crate::ast::{BinaryOperator, Expr, ParsedExpression, UnaryOperator};
use crate::error::{Error, Result};
use crate::functions::FunctionRegistry;
use crate::resolver::{resolve_path, VariableResolver};
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Evaluate a parsed expression to a value.
pub fn evaluate(
    expr: &ParsedExpression,
    resolver: &dyn VariableResolver,
    registry: &FunctionRegistry,
) -> Result<Value> {
    Evaluator { resolver, registry }.eval(expr.root())
}

/// Coerce a predicate result: Null and `false` are false, `true` is true and
/// anything else is rejected.
pub fn to_predicate(value: &Value) -> Result<bool> {
    match value {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(*b),
        other => Err(Error::NotBoolean(other.type_name().to_string())),
    }
}

struct Evaluator<'a> {
    resolver: &'a dyn VariableResolver,
    registry: &'a FunctionRegistry,
}

impl Evaluator<'_> {
    fn eval(&self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Variable(name) => Ok(resolve_path(self.resolver, name)),
            Expr::FunctionCall { name, args } => self.call(name, args),
            Expr::Binary { op, left, right } => self.binary(*op, left, right),
            Expr::Unary { op, operand } => self.unary(*op, operand),
            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.test(condition, "conditional")? {
                    self.eval(then_branch)
                } else {
                    match else_branch {
                        Some(else_branch) => self.eval(else_branch),
                        None => Ok(Value::Null),
                    }
                }
            }
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            Expr::Map(entries) => {
                let mut map = BTreeMap::new();
                for (key, value) in entries {
                    map.insert(key.clone(), self.eval(value)?);
                }
                Ok(Value::Map(map))
            }
        }
    }

    /// Arguments are evaluated left to right, each exactly once, before the
    /// function is resolved and applied.
    fn call(&self, name: &str, args: &[Expr]) -> Result<Value> {
        let function = self.registry.resolve(name)?;
        let values = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Result<Vec<_>>>()?;
        function.apply(&values, self.registry.context())
    }

    /// Evaluate `expr` in a boolean context.
    fn test(&self, expr: &Expr, what: &str) -> Result<bool> {
        match self.eval(expr)? {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(b),
            other => Err(Error::type_error(format!(
                "{what} expects a boolean, got {}",
                other.type_name()
            ))),
        }
    }

    fn unary(&self, op: UnaryOperator, operand: &Expr) -> Result<Value> {
        match op {
            UnaryOperator::Not => Ok(Value::Bool(!self.test(operand, "'!'")?)),
            UnaryOperator::Exists => Ok(Value::Bool(!self.eval(operand)?.is_null())),
            UnaryOperator::Negate => match self.eval(operand)? {
                Value::Null => Ok(Value::Null),
                Value::Int(n) => n
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| overflow("-", &Value::Int(n), &Value::Null)),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Err(Error::type_error(format!(
                    "cannot negate {}",
                    other.type_name()
                ))),
            },
        }
    }

    fn binary(&self, op: BinaryOperator, left: &Expr, right: &Expr) -> Result<Value> {
        let (lhs, rhs) = match op {
            BinaryOperator::And => {
                let result = self.test(left, "'&&'")? && self.test(right, "'&&'")?;
                return Ok(Value::Bool(result));
            }
            BinaryOperator::Or => {
                let result = self.test(left, "'||'")? || self.test(right, "'||'")?;
                return Ok(Value::Bool(result));
            }
            _ => (self.eval(left)?, self.eval(right)?),
        };
        match op {
            BinaryOperator::Equal => Ok(Value::Bool(lhs.loose_eq(&rhs))),
            BinaryOperator::NotEqual => Ok(Value::Bool(!lhs.loose_eq(&rhs))),
            BinaryOperator::LessThan => compare(op, &lhs, &rhs, Ordering::is_lt),
            BinaryOperator::LessThanOrEqual => compare(op, &lhs, &rhs, Ordering::is_le),
            BinaryOperator::GreaterThan => compare(op, &lhs, &rhs, Ordering::is_gt),
            BinaryOperator::GreaterThanOrEqual => compare(op, &lhs, &rhs, Ordering::is_ge),
            BinaryOperator::In => contains(&rhs, &lhs).map(Value::Bool),
            _ => arithmetic(op, &lhs, &rhs),
        }
    }
}

fn compare(
    op: BinaryOperator,
    lhs: &Value,
    rhs: &Value,
    accept: fn(Ordering) -> bool,
) -> Result<Value> {
    if lhs.is_null() || rhs.is_null() {
        return Ok(Value::Bool(false));
    }
    match lhs.compare(rhs) {
        Some(ordering) => Ok(Value::Bool(accept(ordering))),
        // NaN compares as unordered rather than as a type error
        None if lhs.is_numeric() && rhs.is_numeric() => Ok(Value::Bool(false)),
        None => Err(Error::type_error(format!(
            "cannot apply '{op}' to {} and {}",
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

/// `needle in haystack`
fn contains(haystack: &Value, needle: &Value) -> Result<bool> {
    match haystack {
        Value::Null => Ok(false),
        Value::List(items) => Ok(items.iter().any(|item| item.loose_eq(needle))),
        Value::Map(map) => Ok(needle.as_str().is_some_and(|key| map.contains_key(key))),
        Value::String(text) => match needle {
            Value::Null => Ok(false),
            Value::String(part) => Ok(text.contains(part.as_str())),
            other => Ok(text.contains(&other.to_string())),
        },
        other => Err(Error::type_error(format!(
            "'in' expects a list, map or string, got {}",
            other.type_name()
        ))),
    }
}

fn arithmetic(op: BinaryOperator, lhs: &Value, rhs: &Value) -> Result<Value> {
    match (lhs, rhs) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Int(a), Value::Int(b)) => {
            let result = match op {
                BinaryOperator::Add => a.checked_add(*b),
                BinaryOperator::Subtract => a.checked_sub(*b),
                BinaryOperator::Multiply => a.checked_mul(*b),
                BinaryOperator::Divide | BinaryOperator::Modulo if *b == 0 => {
                    return Err(Error::EvaluationError(format!(
                        "integer division by zero in '{a} {op} {b}'"
                    )))
                }
                BinaryOperator::Divide => a.checked_div(*b),
                BinaryOperator::Modulo => a.checked_rem(*b),
                _ => None,
            };
            result.map(Value::Int).ok_or_else(|| overflow(op.symbol(), lhs, rhs))
        }
        (Value::String(a), Value::String(b)) if op == BinaryOperator::Add => {
            Ok(Value::String(format!("{a}{b}")))
        }
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) if lhs.is_numeric() && rhs.is_numeric() => {
                let result = match op {
                    BinaryOperator::Add => a + b,
                    BinaryOperator::Subtract => a - b,
                    BinaryOperator::Multiply => a * b,
                    BinaryOperator::Divide => a / b,
                    _ => a % b,
                };
                Ok(Value::Float(result))
            }
            _ => Err(Error::type_error(format!(
                "cannot apply '{op}' to {} and {}",
                lhs.type_name(),
                rhs.type_name()
            ))),
        },
    }
}

fn overflow(op: &str, lhs: &Value, rhs: &Value) -> Error {
    if rhs.is_null() {
        Error::EvaluationError(format!("integer overflow in '{op}{lhs}'"))
    } else {
        Error::EvaluationError(format!("integer overflow in '{lhs} {op} {rhs}'"))
    }
}
