//! The step-builder contract
//!
//! [`GremlinSteps`] is implemented once per backend. A backend supplies the
//! graph-entry steps, `start`, `current` and the `append` primitive; every
//! other step is expressed through `append`, so all backends record the same
//! steps with the same arguments for the same call sequence.

use super::function::CustomFunction;
use super::predicate::P;
use super::step::{Argument, StepKind};
use super::token::{Cardinality, Column, Order, Pop, Scope, T};
use crate::error::{Error, Result};
use crate::types::Value;
use std::fmt;

/// Argument handed to [`GremlinSteps::append`].
///
/// `Sub` refers to another builder of the same backend; the backend takes a
/// snapshot of it with `current()` and never touches it again.
pub enum StepArg<'a, S> {
    Value(Argument),
    Sub(&'a S),
}

fn label<'a, S>(value: &str) -> StepArg<'a, S> {
    StepArg::Value(Argument::Label(value.to_string()))
}

fn literal<'a, S>(value: impl Into<Value>) -> StepArg<'a, S> {
    StepArg::Value(Argument::Literal(value.into()))
}

fn labels<'a, S>(values: &[&str]) -> Vec<StepArg<'a, S>> {
    values
        .iter()
        .map(|v| StepArg::Value(Argument::Label(v.to_string())))
        .collect()
}

fn subs<'a, S>(values: &[&'a S]) -> Vec<StepArg<'a, S>> {
    values.iter().map(|s| StepArg::Sub(*s)).collect()
}

pub trait GremlinSteps: fmt::Display + Sized {
    /// Frozen snapshot produced by [`current`](GremlinSteps::current).
    type Output: Clone;

    /// New floating (anonymous) builder of the same backend.
    fn start(&self) -> Self;

    /// Deep copy of everything built so far.
    fn current(&self) -> Self::Output;

    /// Append one step.
    fn append<'a>(&mut self, kind: StepKind, args: Vec<StepArg<'a, Self>>) -> &mut Self;

    fn v(&mut self) -> &mut Self;

    /// Fails unless the builder is rooted and still empty.
    fn e(&mut self) -> Result<&mut Self>;

    fn add_v(&mut self) -> &mut Self;

    fn add_v_label(&mut self, label: &str) -> &mut Self;

    // ==================== Filtering ====================

    fn has(&mut self, key: &str) -> &mut Self {
        self.append(StepKind::Has, vec![label(key)])
    }

    fn has_p(&mut self, key: &str, predicate: P) -> &mut Self {
        self.append(
            StepKind::Has,
            vec![label(key), StepArg::Value(Argument::Predicate(predicate))],
        )
    }

    fn has_not(&mut self, key: &str) -> &mut Self {
        self.append(StepKind::HasNot, vec![label(key)])
    }

    fn has_label(&mut self, values: &[&str]) -> &mut Self {
        if values.is_empty() {
            return self;
        }
        self.append(StepKind::HasLabel, labels(values))
    }

    fn has_key(&mut self, values: &[&str]) -> &mut Self {
        if values.is_empty() {
            return self;
        }
        self.append(StepKind::HasKey, labels(values))
    }

    fn is(&mut self, predicate: P) -> &mut Self {
        self.append(
            StepKind::Is,
            vec![StepArg::Value(Argument::Predicate(predicate))],
        )
    }

    fn where_(&mut self, traversal: &Self) -> &mut Self {
        self.append(StepKind::Where, vec![StepArg::Sub(traversal)])
    }

    fn where_p(&mut self, predicate: P) -> &mut Self {
        self.append(
            StepKind::Where,
            vec![StepArg::Value(Argument::Predicate(predicate))],
        )
    }

    fn dedup(&mut self, values: &[&str]) -> &mut Self {
        self.append(StepKind::Dedup, labels(values))
    }

    fn simple_path(&mut self) -> &mut Self {
        self.append(StepKind::SimplePath, vec![])
    }

    // ==================== Branching ====================

    fn and(&mut self, traversals: &[&Self]) -> &mut Self {
        self.append(StepKind::And, subs(traversals))
    }

    fn or(&mut self, traversals: &[&Self]) -> &mut Self {
        self.append(StepKind::Or, subs(traversals))
    }

    fn union(&mut self, traversals: &[&Self]) -> &mut Self {
        self.append(StepKind::Union, subs(traversals))
    }

    fn choose(&mut self, choice: &Self) -> &mut Self {
        self.append(StepKind::Choose, vec![StepArg::Sub(choice)])
    }

    fn choose_then(&mut self, predicate: &Self, true_choice: &Self) -> &mut Self {
        self.append(
            StepKind::Choose,
            vec![StepArg::Sub(predicate), StepArg::Sub(true_choice)],
        )
    }

    fn choose_then_else(
        &mut self,
        predicate: &Self,
        true_choice: &Self,
        false_choice: &Self,
    ) -> &mut Self {
        self.append(
            StepKind::Choose,
            vec![
                StepArg::Sub(predicate),
                StepArg::Sub(true_choice),
                StepArg::Sub(false_choice),
            ],
        )
    }

    fn choose_p(&mut self, predicate: P, true_choice: &Self) -> &mut Self {
        self.append(
            StepKind::Choose,
            vec![
                StepArg::Value(Argument::Predicate(predicate)),
                StepArg::Sub(true_choice),
            ],
        )
    }

    fn choose_p_else(&mut self, predicate: P, true_choice: &Self, false_choice: &Self) -> &mut Self {
        self.append(
            StepKind::Choose,
            vec![
                StepArg::Value(Argument::Predicate(predicate)),
                StepArg::Sub(true_choice),
                StepArg::Sub(false_choice),
            ],
        )
    }

    fn option(&mut self, pick: impl Into<Value>, traversal: &Self) -> &mut Self {
        self.append(StepKind::Option, vec![literal(pick), StepArg::Sub(traversal)])
    }

    fn coalesce(&mut self, traversals: &[&Self]) -> &mut Self {
        self.append(StepKind::Coalesce, subs(traversals))
    }

    fn optional(&mut self, traversal: &Self) -> &mut Self {
        self.append(StepKind::Optional, vec![StepArg::Sub(traversal)])
    }

    fn not(&mut self, traversal: &Self) -> &mut Self {
        self.append(StepKind::Not, vec![StepArg::Sub(traversal)])
    }

    fn local(&mut self, traversal: &Self) -> &mut Self {
        self.append(StepKind::Local, vec![StepArg::Sub(traversal)])
    }

    fn repeat(&mut self, traversal: &Self) -> &mut Self {
        self.append(StepKind::Repeat, vec![StepArg::Sub(traversal)])
    }

    fn until(&mut self, traversal: &Self) -> &mut Self {
        self.append(StepKind::Until, vec![StepArg::Sub(traversal)])
    }

    /// `until()` without a condition: a traverser leaves the loop once the
    /// loop body produces nothing from it.
    fn until_done(&mut self) -> &mut Self {
        self.append(StepKind::Until, vec![])
    }

    fn emit(&mut self) -> &mut Self {
        self.append(StepKind::Emit, vec![])
    }

    fn emit_when(&mut self, traversal: &Self) -> &mut Self {
        self.append(StepKind::Emit, vec![StepArg::Sub(traversal)])
    }

    fn times(&mut self, max_loops: u32) -> &mut Self {
        self.append(StepKind::Times, vec![literal(max_loops as i64)])
    }

    fn loops(&mut self) -> &mut Self {
        self.append(StepKind::Loops, vec![])
    }

    fn flat_map(&mut self, traversal: &Self) -> &mut Self {
        self.append(StepKind::FlatMap, vec![StepArg::Sub(traversal)])
    }

    fn map(&mut self, traversal: &Self) -> &mut Self {
        self.append(StepKind::Map, vec![StepArg::Sub(traversal)])
    }

    // ==================== Projection and aggregation ====================

    fn project(&mut self, keys: &[&str]) -> Result<&mut Self> {
        if keys.is_empty() {
            return Err(Error::IllegalArgument(
                "`project()` step requires keys".to_string(),
            ));
        }
        Ok(self.append(StepKind::Project, labels(keys)))
    }

    fn select(&mut self, keys: &[&str]) -> Result<&mut Self> {
        if keys.is_empty() {
            return Err(Error::IllegalArgument(
                "Select step should have arguments".to_string(),
            ));
        }
        Ok(self.append(StepKind::Select, labels(keys)))
    }

    fn select_pop(&mut self, pop: Pop, key: &str) -> &mut Self {
        self.append(
            StepKind::Select,
            vec![StepArg::Value(Argument::Pop(pop)), label(key)],
        )
    }

    fn select_column(&mut self, column: Column) -> &mut Self {
        self.append(
            StepKind::Select,
            vec![StepArg::Value(Argument::Column(column))],
        )
    }

    fn group(&mut self) -> &mut Self {
        self.append(StepKind::Group, vec![])
    }

    fn fold(&mut self) -> &mut Self {
        self.append(StepKind::Fold, vec![])
    }

    fn unfold(&mut self) -> &mut Self {
        self.append(StepKind::Unfold, vec![])
    }

    fn count(&mut self) -> &mut Self {
        self.append(StepKind::Count, vec![])
    }

    fn count_scope(&mut self, scope: Scope) -> &mut Self {
        self.append(StepKind::Count, vec![StepArg::Value(Argument::Scope(scope))])
    }

    fn sum(&mut self) -> &mut Self {
        self.append(StepKind::Sum, vec![])
    }

    fn sum_scope(&mut self, scope: Scope) -> &mut Self {
        self.append(StepKind::Sum, vec![StepArg::Value(Argument::Scope(scope))])
    }

    fn min(&mut self) -> &mut Self {
        self.append(StepKind::Min, vec![])
    }

    fn min_scope(&mut self, scope: Scope) -> &mut Self {
        self.append(StepKind::Min, vec![StepArg::Value(Argument::Scope(scope))])
    }

    fn max(&mut self) -> &mut Self {
        self.append(StepKind::Max, vec![])
    }

    fn max_scope(&mut self, scope: Scope) -> &mut Self {
        self.append(StepKind::Max, vec![StepArg::Value(Argument::Scope(scope))])
    }

    fn mean(&mut self) -> &mut Self {
        self.append(StepKind::Mean, vec![])
    }

    fn mean_scope(&mut self, scope: Scope) -> &mut Self {
        self.append(StepKind::Mean, vec![StepArg::Value(Argument::Scope(scope))])
    }

    fn path(&mut self) -> &mut Self {
        self.append(StepKind::Path, vec![])
    }

    fn value_map(&mut self) -> &mut Self {
        self.append(StepKind::ValueMap, vec![])
    }

    fn value_map_tokens(&mut self, include_tokens: bool) -> &mut Self {
        self.append(StepKind::ValueMap, vec![literal(include_tokens)])
    }

    fn values(&mut self, keys: &[&str]) -> &mut Self {
        self.append(StepKind::Values, labels(keys))
    }

    fn value(&mut self) -> &mut Self {
        self.append(StepKind::Value, vec![])
    }

    fn properties(&mut self, keys: &[&str]) -> &mut Self {
        self.append(StepKind::Properties, labels(keys))
    }

    fn key(&mut self) -> &mut Self {
        self.append(StepKind::Key, vec![])
    }

    fn label(&mut self) -> &mut Self {
        self.append(StepKind::Label, vec![])
    }

    fn id(&mut self) -> &mut Self {
        self.append(StepKind::Id, vec![])
    }

    // ==================== Ordering and windowing ====================

    fn order(&mut self) -> &mut Self {
        self.append(StepKind::Order, vec![])
    }

    fn by(&mut self, traversal: &Self) -> &mut Self {
        self.append(StepKind::By, vec![StepArg::Sub(traversal)])
    }

    fn by_order(&mut self, traversal: &Self, order: Order) -> &mut Self {
        self.append(
            StepKind::By,
            vec![StepArg::Sub(traversal), StepArg::Value(Argument::Order(order))],
        )
    }

    fn range(&mut self, scope: Scope, low: i64, high: i64) -> &mut Self {
        self.append(
            StepKind::Range,
            vec![
                StepArg::Value(Argument::Scope(scope)),
                literal(low),
                literal(high),
            ],
        )
    }

    fn limit(&mut self, limit: i64) -> &mut Self {
        self.append(StepKind::Limit, vec![literal(limit)])
    }

    fn limit_scope(&mut self, scope: Scope, limit: i64) -> &mut Self {
        self.append(
            StepKind::Limit,
            vec![StepArg::Value(Argument::Scope(scope)), literal(limit)],
        )
    }

    fn skip(&mut self, skip: i64) -> &mut Self {
        self.append(StepKind::Skip, vec![literal(skip)])
    }

    fn tail(&mut self, scope: Scope, limit: i64) -> &mut Self {
        self.append(
            StepKind::Tail,
            vec![StepArg::Value(Argument::Scope(scope)), literal(limit)],
        )
    }

    // ==================== Navigation ====================

    fn out_e(&mut self, edge_labels: &[&str]) -> &mut Self {
        self.append(StepKind::OutE, labels(edge_labels))
    }

    fn in_e(&mut self, edge_labels: &[&str]) -> &mut Self {
        self.append(StepKind::InE, labels(edge_labels))
    }

    fn both_e(&mut self, edge_labels: &[&str]) -> &mut Self {
        self.append(StepKind::BothE, labels(edge_labels))
    }

    fn out_v(&mut self) -> &mut Self {
        self.append(StepKind::OutV, vec![])
    }

    fn in_v(&mut self) -> &mut Self {
        self.append(StepKind::InV, vec![])
    }

    fn other_v(&mut self) -> &mut Self {
        self.append(StepKind::OtherV, vec![])
    }

    fn add_e(&mut self, edge_label: &str) -> &mut Self {
        self.append(StepKind::AddE, vec![label(edge_label)])
    }

    fn from(&mut self, step_label: &str) -> &mut Self {
        self.append(StepKind::From, vec![label(step_label)])
    }

    fn to(&mut self, step_label: &str) -> &mut Self {
        self.append(StepKind::To, vec![label(step_label)])
    }

    // ==================== Side effects ====================

    fn as_(&mut self, step_label: &str) -> &mut Self {
        self.append(StepKind::As, vec![label(step_label)])
    }

    fn aggregate(&mut self, side_effect_key: &str) -> &mut Self {
        self.append(StepKind::Aggregate, vec![label(side_effect_key)])
    }

    fn side_effect(&mut self, traversal: &Self) -> &mut Self {
        self.append(StepKind::SideEffect, vec![StepArg::Sub(traversal)])
    }

    fn cap(&mut self, side_effect_key: &str) -> &mut Self {
        self.append(StepKind::Cap, vec![label(side_effect_key)])
    }

    fn barrier(&mut self) -> &mut Self {
        self.append(StepKind::Barrier, vec![])
    }

    fn index(&mut self) -> &mut Self {
        self.append(StepKind::Index, vec![])
    }

    fn constant(&mut self, value: impl Into<Value>) -> &mut Self {
        self.append(StepKind::Constant, vec![literal(value)])
    }

    fn inject(&mut self, injections: &[Value]) -> &mut Self {
        let args = injections
            .iter()
            .map(|v| StepArg::Value(Argument::Literal(v.clone())))
            .collect();
        self.append(StepKind::Inject, args)
    }

    fn identity(&mut self) -> &mut Self {
        self.append(StepKind::Identity, vec![])
    }

    fn map_fn(&mut self, function: CustomFunction) -> &mut Self {
        self.append(
            StepKind::Map,
            vec![StepArg::Value(Argument::Function(function))],
        )
    }

    fn math(&mut self, expression: &str) -> &mut Self {
        self.append(StepKind::Math, vec![literal(expression)])
    }

    fn with(&mut self, key: &str) -> &mut Self {
        self.append(StepKind::With, vec![label(key)])
    }

    fn with_value(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.append(StepKind::With, vec![label(key), literal(value)])
    }

    fn drop(&mut self) -> &mut Self {
        self.append(StepKind::Drop, vec![])
    }

    // ==================== Property writes ====================

    fn property(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.append(StepKind::Property, vec![label(key), literal(value)])
    }

    fn property_cardinality(
        &mut self,
        cardinality: Cardinality,
        key: &str,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.append(
            StepKind::Property,
            vec![
                StepArg::Value(Argument::Cardinality(cardinality)),
                label(key),
                literal(value),
            ],
        )
    }

    fn property_token(&mut self, token: T, value: impl Into<Value>) -> &mut Self {
        self.append(
            StepKind::Property,
            vec![StepArg::Value(Argument::Token(token)), literal(value)],
        )
    }

    fn property_traversal(&mut self, key: &str, traversal: &Self) -> &mut Self {
        self.append(StepKind::Property, vec![label(key), StepArg::Sub(traversal)])
    }

    fn property_cardinality_traversal(
        &mut self,
        cardinality: Cardinality,
        key: &str,
        traversal: &Self,
    ) -> &mut Self {
        self.append(
            StepKind::Property,
            vec![
                StepArg::Value(Argument::Cardinality(cardinality)),
                label(key),
                StepArg::Sub(traversal),
            ],
        )
    }

    fn property_kv(&mut self, key_traversal: &Self, value_traversal: &Self) -> &mut Self {
        self.append(
            StepKind::Property,
            vec![StepArg::Sub(key_traversal), StepArg::Sub(value_traversal)],
        )
    }
}
