//! Traversal predicates (`P` / `TextP`)

use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A predicate over a single traverser object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum P {
    Eq(Value),
    Neq(Value),
    Lt(Value),
    Lte(Value),
    Gt(Value),
    Gte(Value),
    Within(Vec<Value>),
    Without(Vec<Value>),
    /// `low <= x < high`
    Between(Value, Value),
    StartingWith(String),
    EndingWith(String),
    Containing(String),
    And(Box<P>, Box<P>),
    Or(Box<P>, Box<P>),
    Not(Box<P>),
}

impl P {
    pub fn eq(value: impl Into<Value>) -> Self {
        P::Eq(value.into())
    }

    pub fn neq(value: impl Into<Value>) -> Self {
        P::Neq(value.into())
    }

    pub fn lt(value: impl Into<Value>) -> Self {
        P::Lt(value.into())
    }

    pub fn lte(value: impl Into<Value>) -> Self {
        P::Lte(value.into())
    }

    pub fn gt(value: impl Into<Value>) -> Self {
        P::Gt(value.into())
    }

    pub fn gte(value: impl Into<Value>) -> Self {
        P::Gte(value.into())
    }

    pub fn within<I: IntoIterator<Item = Value>>(values: I) -> Self {
        P::Within(values.into_iter().collect())
    }

    pub fn without<I: IntoIterator<Item = Value>>(values: I) -> Self {
        P::Without(values.into_iter().collect())
    }

    pub fn between(low: impl Into<Value>, high: impl Into<Value>) -> Self {
        P::Between(low.into(), high.into())
    }

    pub fn starting_with(prefix: impl Into<String>) -> Self {
        P::StartingWith(prefix.into())
    }

    pub fn ending_with(suffix: impl Into<String>) -> Self {
        P::EndingWith(suffix.into())
    }

    pub fn containing(infix: impl Into<String>) -> Self {
        P::Containing(infix.into())
    }

    pub fn and(self, other: P) -> Self {
        P::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: P) -> Self {
        P::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        P::Not(Box::new(self))
    }

    /// Evaluate the predicate against a value.
    ///
    /// Ordering predicates only hold between comparable values (two numbers,
    /// two strings or two booleans); anything else tests false.
    pub fn test(&self, value: &Value) -> bool {
        match self {
            P::Eq(expected) => loose_eq(value, expected),
            P::Neq(expected) => !loose_eq(value, expected),
            P::Lt(bound) => matches!(comparable(value, bound), Some(Ordering::Less)),
            P::Lte(bound) => matches!(
                comparable(value, bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
            P::Gt(bound) => matches!(comparable(value, bound), Some(Ordering::Greater)),
            P::Gte(bound) => matches!(
                comparable(value, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            P::Within(values) => values.iter().any(|v| loose_eq(value, v)),
            P::Without(values) => !values.iter().any(|v| loose_eq(value, v)),
            P::Between(low, high) => {
                matches!(
                    comparable(value, low),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(comparable(value, high), Some(Ordering::Less))
            }
            P::StartingWith(prefix) => value.as_str().map_or(false, |s| s.starts_with(prefix)),
            P::EndingWith(suffix) => value.as_str().map_or(false, |s| s.ends_with(suffix)),
            P::Containing(infix) => value.as_str().map_or(false, |s| s.contains(infix)),
            P::And(a, b) => a.test(value) && b.test(value),
            P::Or(a, b) => a.test(value) || b.test(value),
            P::Not(p) => !p.test(value),
        }
    }

    /// Rewrite every operand value with `f`.
    ///
    /// `where(P)` uses this to replace step labels with the labelled objects.
    pub fn map_values<F>(&self, f: &mut F) -> P
    where
        F: FnMut(&Value) -> Value,
    {
        match self {
            P::Eq(v) => P::Eq(f(v)),
            P::Neq(v) => P::Neq(f(v)),
            P::Lt(v) => P::Lt(f(v)),
            P::Lte(v) => P::Lte(f(v)),
            P::Gt(v) => P::Gt(f(v)),
            P::Gte(v) => P::Gte(f(v)),
            P::Within(vs) => P::Within(vs.iter().map(|v| f(v)).collect()),
            P::Without(vs) => P::Without(vs.iter().map(|v| f(v)).collect()),
            P::Between(lo, hi) => P::Between(f(lo), f(hi)),
            P::StartingWith(_) | P::EndingWith(_) | P::Containing(_) => self.clone(),
            P::And(a, b) => P::And(Box::new(a.map_values(f)), Box::new(b.map_values(f))),
            P::Or(a, b) => P::Or(Box::new(a.map_values(f)), Box::new(b.map_values(f))),
            P::Not(p) => P::Not(Box::new(p.map_values(f))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            P::Eq(_) => "eq",
            P::Neq(_) => "neq",
            P::Lt(_) => "lt",
            P::Lte(_) => "lte",
            P::Gt(_) => "gt",
            P::Gte(_) => "gte",
            P::Within(_) => "within",
            P::Without(_) => "without",
            P::Between(_, _) => "between",
            P::StartingWith(_) => "startingWith",
            P::EndingWith(_) => "endingWith",
            P::Containing(_) => "containing",
            P::And(_, _) => "and",
            P::Or(_, _) => "or",
            P::Not(_) => "not",
        }
    }

    /// Whether this is a text predicate (`TextP` in Gremlin-Groovy).
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            P::StartingWith(_) | P::EndingWith(_) | P::Containing(_)
        )
    }
}

/// Equality with numeric widening, so `1 == 1.0`.
fn loose_eq(a: &Value, b: &Value) -> bool {
    if a.is_number() && b.is_number() {
        return matches!(comparable(a, b), Some(Ordering::Equal));
    }
    a == b
}

fn comparable(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (x, y) if x.is_number() && y.is_number() => x.as_float()?.partial_cmp(&y.as_float()?),
        (Value::String(x), Value::String(y)) if !a.is_cypher_null() && !b.is_cypher_null() => {
            Some(x.cmp(y))
        }
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

impl fmt::Display for P {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            P::Eq(v) | P::Neq(v) | P::Lt(v) | P::Lte(v) | P::Gt(v) | P::Gte(v) => {
                write!(f, "{}({})", self.name(), v)
            }
            P::Within(vs) | P::Without(vs) => {
                write!(f, "{}({})", self.name(), Value::List(vs.clone()))
            }
            P::Between(lo, hi) => write!(f, "between({}, {})", lo, hi),
            P::StartingWith(s) | P::EndingWith(s) | P::Containing(s) => {
                write!(f, "{}({})", self.name(), s)
            }
            P::And(a, b) | P::Or(a, b) => write!(f, "{}({}, {})", self.name(), a, b),
            P::Not(p) => write!(f, "not({})", p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparisons() {
        assert!(P::gt(30).test(&Value::Int(31)));
        assert!(!P::gt(30).test(&Value::Int(30)));
        assert!(P::gte(1.5).test(&Value::Int(2)));
        assert!(P::eq(1).test(&Value::Float(1.0)));
        assert!(P::lt("b").test(&Value::from("a")));
    }

    #[test]
    fn test_incomparable_values_never_match() {
        assert!(!P::gt(1).test(&Value::from("abc")));
        assert!(!P::lt(1).test(&Value::null_sentinel()));
        assert!(!P::lt("z").test(&Value::null_sentinel()));
    }

    #[test]
    fn test_collection_and_text() {
        let p = P::within(vec![Value::Int(1), Value::Int(2)]);
        assert!(p.test(&Value::Int(2)));
        assert!(!p.test(&Value::Int(3)));
        assert!(P::starting_with("Al").test(&Value::from("Alice")));
        assert!(P::containing("li").test(&Value::from("Alice")));
        assert!(!P::ending_with("x").test(&Value::Int(1)));
    }

    #[test]
    fn test_connectives() {
        let p = P::gt(1).and(P::lt(5));
        assert!(p.test(&Value::Int(3)));
        assert!(!p.test(&Value::Int(5)));
        assert!(P::eq(1).negate().test(&Value::Int(2)));
        assert_eq!(p.to_string(), "and(gt(1), lt(5))");
    }

    #[test]
    fn test_display() {
        assert_eq!(P::eq("n").to_string(), "eq(n)");
        assert_eq!(
            P::within(vec![Value::from("a"), Value::from("b")]).to_string(),
            "within([a, b])"
        );
        assert_eq!(P::between(1, 3).to_string(), "between(1, 3)");
    }

    #[test]
    fn test_map_values() {
        let p = P::eq("a").or(P::neq("b"));
        let mapped = p.map_values(&mut |v| match v.as_str() {
            Some("a") => Value::Int(1),
            _ => v.clone(),
        });
        assert_eq!(mapped, P::eq(1).or(P::neq("b")));
    }
}
