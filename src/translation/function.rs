//! Cypher functions usable with `map(..)`
//!
//! The walker folds operands into a list and maps it through one of these
//! when no native Gremlin step expresses the Cypher semantics.

use crate::error::{Error, Result};
use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomFunction {
    ToString,
    ToInteger,
    ToFloat,
    ToBoolean,
    Size,
    Not,
    And,
    Or,
    Xor,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Equals,
    NotEquals,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl CustomFunction {
    pub fn name(&self) -> &'static str {
        match self {
            CustomFunction::ToString => "cypherToString",
            CustomFunction::ToInteger => "cypherToInteger",
            CustomFunction::ToFloat => "cypherToFloat",
            CustomFunction::ToBoolean => "cypherToBoolean",
            CustomFunction::Size => "cypherSize",
            CustomFunction::Not => "cypherNot",
            CustomFunction::And => "cypherAnd",
            CustomFunction::Or => "cypherOr",
            CustomFunction::Xor => "cypherXor",
            CustomFunction::Plus => "cypherPlus",
            CustomFunction::Minus => "cypherMinus",
            CustomFunction::Multiply => "cypherMultiply",
            CustomFunction::Divide => "cypherDivide",
            CustomFunction::Modulo => "cypherModulo",
            CustomFunction::Equals => "cypherEquals",
            CustomFunction::NotEquals => "cypherNotEquals",
            CustomFunction::Less => "cypherLess",
            CustomFunction::LessOrEqual => "cypherLessOrEqual",
            CustomFunction::Greater => "cypherGreater",
            CustomFunction::GreaterOrEqual => "cypherGreaterOrEqual",
        }
    }

    /// Apply the function to a traverser object.
    ///
    /// Binary functions expect a two-element list `[lhs, rhs]`. A Cypher null
    /// operand yields the null sentinel.
    pub fn apply(&self, value: &Value) -> Result<Value> {
        match self {
            CustomFunction::ToString
            | CustomFunction::ToInteger
            | CustomFunction::ToFloat
            | CustomFunction::ToBoolean
            | CustomFunction::Size
            | CustomFunction::Not => {
                if value.is_cypher_null() {
                    return Ok(Value::null_sentinel());
                }
                self.apply_unary(value)
            }
            _ => {
                let (lhs, rhs) = match value.as_list() {
                    Some([lhs, rhs]) => (lhs, rhs),
                    _ => {
                        return Err(Error::ExecutionError(format!(
                            "{}() expects a pair of operands, got {}",
                            self.name(),
                            value
                        )))
                    }
                };
                if matches!(self, CustomFunction::And | CustomFunction::Or) {
                    return self.apply_connective(lhs, rhs);
                }
                if lhs.is_cypher_null() || rhs.is_cypher_null() {
                    return Ok(Value::null_sentinel());
                }
                self.apply_binary(lhs, rhs)
            }
        }
    }

    fn apply_unary(&self, value: &Value) -> Result<Value> {
        match self {
            CustomFunction::ToString => Ok(match value {
                Value::String(_) => value.clone(),
                Value::Int(_) | Value::Float(_) | Value::Bool(_) => {
                    Value::String(value.to_string())
                }
                _ => return Err(self.type_error(value)),
            }),
            CustomFunction::ToInteger => Ok(match value {
                Value::Int(_) => value.clone(),
                Value::Float(f) => Value::Int(f.trunc() as i64),
                Value::String(s) => match s.trim().parse::<i64>() {
                    Ok(i) => Value::Int(i),
                    Err(_) => match s.trim().parse::<f64>() {
                        Ok(f) => Value::Int(f.trunc() as i64),
                        Err(_) => Value::null_sentinel(),
                    },
                },
                _ => return Err(self.type_error(value)),
            }),
            CustomFunction::ToFloat => Ok(match value {
                Value::Float(_) => value.clone(),
                Value::Int(i) => Value::Float(*i as f64),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .unwrap_or_else(|_| Value::null_sentinel()),
                _ => return Err(self.type_error(value)),
            }),
            CustomFunction::ToBoolean => Ok(match value {
                Value::Bool(_) => value.clone(),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    _ => Value::null_sentinel(),
                },
                _ => return Err(self.type_error(value)),
            }),
            CustomFunction::Size => Ok(match value {
                Value::String(s) => Value::Int(s.chars().count() as i64),
                Value::List(items) => Value::Int(items.len() as i64),
                Value::Map(map) => Value::Int(map.len() as i64),
                _ => return Err(self.type_error(value)),
            }),
            CustomFunction::Not => match value {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                _ => Err(self.type_error(value)),
            },
            _ => Err(Error::InternalError(format!("{} is not unary", self.name()))),
        }
    }

    /// Three-valued AND/OR: a deciding operand wins over null.
    fn apply_connective(&self, lhs: &Value, rhs: &Value) -> Result<Value> {
        let decisive = matches!(self, CustomFunction::Or);
        let mut unknown = false;
        for operand in [lhs, rhs] {
            match operand {
                Value::Bool(b) if *b == decisive => return Ok(Value::Bool(decisive)),
                Value::Bool(_) => {}
                v if v.is_cypher_null() => unknown = true,
                v => return Err(self.type_error(v)),
            }
        }
        if unknown {
            Ok(Value::null_sentinel())
        } else {
            Ok(Value::Bool(!decisive))
        }
    }

    fn apply_binary(&self, lhs: &Value, rhs: &Value) -> Result<Value> {
        match self {
            CustomFunction::Plus => match (lhs, rhs) {
                (Value::String(a), b) => Ok(Value::String(format!("{}{}", a, b))),
                (a, Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
                (Value::List(a), Value::List(b)) => {
                    Ok(Value::List(a.iter().chain(b.iter()).cloned().collect()))
                }
                (Value::List(a), b) => {
                    let mut items = a.clone();
                    items.push(b.clone());
                    Ok(Value::List(items))
                }
                _ => arithmetic(lhs, rhs, self, |a, b| a.checked_add(b), |a, b| a + b),
            },
            CustomFunction::Minus => {
                arithmetic(lhs, rhs, self, |a, b| a.checked_sub(b), |a, b| a - b)
            }
            CustomFunction::Multiply => {
                arithmetic(lhs, rhs, self, |a, b| a.checked_mul(b), |a, b| a * b)
            }
            CustomFunction::Divide => {
                if matches!(rhs, Value::Int(0)) {
                    return Err(Error::ExecutionError("/ by zero".to_string()));
                }
                arithmetic(lhs, rhs, self, |a, b| a.checked_div(b), |a, b| a / b)
            }
            CustomFunction::Modulo => {
                if matches!(rhs, Value::Int(0)) {
                    return Err(Error::ExecutionError("% by zero".to_string()));
                }
                arithmetic(lhs, rhs, self, |a, b| a.checked_rem(b), |a, b| a % b)
            }
            CustomFunction::Xor => match (lhs, rhs) {
                (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a != b)),
                (Value::Bool(_), other) | (other, _) => Err(self.type_error(other)),
            },
            CustomFunction::Equals => Ok(Value::Bool(lhs.compare(rhs) == Ordering::Equal)),
            CustomFunction::NotEquals => Ok(Value::Bool(lhs.compare(rhs) != Ordering::Equal)),
            CustomFunction::Less => ordering(lhs, rhs, |o| o == Ordering::Less),
            CustomFunction::LessOrEqual => ordering(lhs, rhs, |o| o != Ordering::Greater),
            CustomFunction::Greater => ordering(lhs, rhs, |o| o == Ordering::Greater),
            CustomFunction::GreaterOrEqual => ordering(lhs, rhs, |o| o != Ordering::Less),
            _ => Err(Error::InternalError(format!("{} is not binary", self.name()))),
        }
    }

    fn type_error(&self, value: &Value) -> Error {
        Error::ExecutionError(format!(
            "{}() cannot be applied to a {}",
            self.name(),
            value.type_name()
        ))
    }
}

fn arithmetic(
    lhs: &Value,
    rhs: &Value,
    function: &CustomFunction,
    int_op: impl Fn(i64, i64) -> Option<i64>,
    float_op: impl Fn(f64, f64) -> f64,
) -> Result<Value> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => int_op(*a, *b)
            .map(Value::Int)
            .ok_or_else(|| Error::ExecutionError(format!("{}() overflow", function.name()))),
        (a, b) if a.is_number() && b.is_number() => {
            let (x, y) = (a.as_float().unwrap_or(0.0), b.as_float().unwrap_or(0.0));
            Ok(Value::Float(float_op(x, y)))
        }
        _ => Err(Error::ExecutionError(format!(
            "{}() cannot be applied to {} and {}",
            function.name(),
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

fn ordering(lhs: &Value, rhs: &Value, accept: impl Fn(Ordering) -> bool) -> Result<Value> {
    let comparable = (lhs.is_number() && rhs.is_number())
        || matches!((lhs, rhs), (Value::String(_), Value::String(_)))
        || matches!((lhs, rhs), (Value::Bool(_), Value::Bool(_)));
    if !comparable {
        return Ok(Value::null_sentinel());
    }
    Ok(Value::Bool(accept(lhs.compare(rhs))))
}

impl fmt::Display for CustomFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}()", self.name())
    }
}
