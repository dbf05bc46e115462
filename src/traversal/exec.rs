//! Traversal interpreter
//!
//! Eager, step-at-a-time evaluation: every step consumes the complete
//! traverser stream of its predecessor. Sub-traversals run once per
//! traverser and share the side-effect store of the enclosing execution.

use super::math;
use super::source::GraphTraversalSource;
use super::traversal::{ElementKind, ExecStep, StepExec, Traversal};
use super::traverser::Traverser;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::graph::{EdgeId, Graph, VertexId};
use crate::metrics;
use crate::translation::{Argument, Cardinality, Column, Order, Pop, Scope, Step, StepKind, P};
use crate::types::{ElementRef, PropertyRef, Value};
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::hash_map::RandomState;
use std::collections::{HashMap, HashSet};
use std::hash::BuildHasher;
use std::sync::Arc;

const DEFAULT_VERTEX_LABEL: &str = "vertex";

/// Per-execution state.
pub(crate) struct ExecContext {
    graph: Arc<Graph>,
    config: EngineConfig,
    side_effects: HashMap<String, Value>,
}

impl ExecContext {
    pub(crate) fn new(source: &GraphTraversalSource) -> Self {
        Self {
            graph: source.graph().clone(),
            config: source.config().clone(),
            side_effects: HashMap::new(),
        }
    }
}

pub(crate) fn execute(
    traversal: &Traversal,
    ctx: &mut ExecContext,
    input: Vec<Traverser>,
) -> Result<Vec<Traverser>> {
    if let Some(modulator) = traversal.pending().first() {
        return Err(Error::ExecutionError(format!(
            "{}() must modulate a repeat() step",
            modulator.step.name()
        )));
    }

    let mut stream = input;
    for step in traversal.exec_steps() {
        stream = match step {
            ExecStep::GraphStart(ElementKind::Vertex) => ctx
                .graph
                .vertices()
                .iter()
                .map(|v| Traverser::new(Value::Vertex(v.to_ref())))
                .collect(),
            ExecStep::GraphStart(ElementKind::Edge) => ctx
                .graph
                .edges()
                .iter()
                .map(|e| Traverser::new(Value::Edge(e.to_ref())))
                .collect(),
            ExecStep::AddVertexStart(label) => {
                let vertex = add_vertex(ctx, label.as_deref())?;
                vec![Traverser::new(vertex)]
            }
            ExecStep::Step(exec) => apply(exec, ctx, stream)?,
        };
    }
    Ok(stream)
}

fn apply(exec: &StepExec, ctx: &mut ExecContext, stream: Vec<Traverser>) -> Result<Vec<Traverser>> {
    let step = &exec.step;
    let mut out = Vec::with_capacity(stream.len());

    match step.kind {
        // ==================== Graph entry ====================
        StepKind::V => {
            let vertices = ctx.graph.vertices();
            for t in &stream {
                for v in &vertices {
                    out.push(t.split(Value::Vertex(v.to_ref())));
                }
            }
        }
        StepKind::E => {
            return Err(Error::IllegalState(
                "Edge graph step can only be at the start of traversal".to_string(),
            ))
        }
        StepKind::AddV => {
            let label = match step.args.first() {
                Some(_) => Some(arg_str(step, 0)?),
                None => None,
            };
            for t in &stream {
                let vertex = add_vertex(ctx, label)?;
                out.push(t.split(vertex));
            }
        }
        StepKind::AddE => {
            let label = arg_str(step, 0)?;
            let from = exec.modulators(StepKind::From).last();
            let to = exec.modulators(StepKind::To).last();
            for t in &stream {
                let src = match from {
                    Some(m) => resolve_vertex(ctx, t, arg_str(&m.step, 0)?)?,
                    None => as_vertex_id(t.get())?,
                };
                let dst = match to {
                    Some(m) => resolve_vertex(ctx, t, arg_str(&m.step, 0)?)?,
                    None => as_vertex_id(t.get())?,
                };
                let id = ctx.graph.add_edge(label, src, dst)?;
                let edge = edge_value(&ctx.graph, id)?;
                out.push(t.split(edge));
            }
        }

        // ==================== Filtering ====================
        StepKind::Has => {
            let key = arg_str(step, 0)?;
            let predicate = optional_predicate(step, 1);
            for t in stream {
                let keep = match property_value(&ctx.graph, t.get(), key)? {
                    Some(value) => predicate.map_or(true, |p| p.test(&value)),
                    None => false,
                };
                if keep {
                    out.push(t);
                }
            }
        }
        StepKind::HasNot => {
            let key = arg_str(step, 0)?;
            for t in stream {
                if property_value(&ctx.graph, t.get(), key)?.is_none() {
                    out.push(t);
                }
            }
        }
        StepKind::HasLabel => {
            let labels = label_args(step);
            for t in stream {
                if element_label(t.get()).map_or(false, |l| labels.contains(&l)) {
                    out.push(t);
                }
            }
        }
        StepKind::HasKey => {
            let keys = label_args(step);
            for t in stream {
                let keep =
                    matches!(t.get(), Value::Property(p) if keys.contains(&p.key.as_str()));
                if keep {
                    out.push(t);
                }
            }
        }
        StepKind::Is => {
            let predicate = arg_predicate(step, 0)?;
            out.extend(stream.into_iter().filter(|t| predicate.test(t.get())));
        }
        StepKind::Where => match step.args.first() {
            Some(Argument::Predicate(predicate)) => {
                for t in stream {
                    let resolved = predicate.map_values(&mut |v| match v {
                        Value::String(label) => {
                            scope_value(ctx, &t, Pop::Last, label).unwrap_or_else(|| v.clone())
                        }
                        _ => v.clone(),
                    });
                    if resolved.test(t.get()) {
                        out.push(t);
                    }
                }
            }
            _ => {
                let child = exec.child(0)?;
                for t in stream {
                    if has_result(child, ctx, &t)? {
                        out.push(t);
                    }
                }
            }
        },
        StepKind::Dedup => {
            let labels = label_args(step);
            let by = exec.modulators(StepKind::By).next();
            let mut seen = HashSet::new();
            for t in stream {
                let mut key = if labels.is_empty() {
                    t.get().clone()
                } else {
                    Value::List(
                        labels
                            .iter()
                            .map(|l| scope_value(ctx, &t, Pop::Last, l).unwrap_or(Value::Null))
                            .collect(),
                    )
                };
                if let Some(child) = by.and_then(|m| m.children.first()) {
                    key = first_value(child, ctx, &t.split(key))?.unwrap_or(Value::Null);
                }
                if seen.insert(key) {
                    out.push(t);
                }
            }
        }
        StepKind::SimplePath => {
            for t in stream {
                let objects = t.path_objects();
                let unique: HashSet<&Value> = objects.iter().collect();
                if unique.len() == objects.len() {
                    out.push(t);
                }
            }
        }

        // ==================== Branching ====================
        StepKind::And | StepKind::Or => {
            let is_and = step.kind == StepKind::And;
            for t in stream {
                let mut keep = is_and;
                for child in &exec.children {
                    let hit = has_result(child, ctx, &t)?;
                    if is_and && !hit {
                        keep = false;
                        break;
                    }
                    if !is_and && hit {
                        keep = true;
                        break;
                    }
                }
                if keep {
                    out.push(t);
                }
            }
        }
        StepKind::Not => {
            let child = exec.child(0)?;
            for t in stream {
                if !has_result(child, ctx, &t)? {
                    out.push(t);
                }
            }
        }
        StepKind::Union => {
            for t in &stream {
                for child in &exec.children {
                    out.extend(run_child(child, ctx, t)?);
                }
            }
        }
        StepKind::Choose => {
            for t in stream {
                out.extend(choose(exec, ctx, t)?);
            }
        }
        StepKind::Coalesce => {
            for t in &stream {
                for child in &exec.children {
                    let results = run_child(child, ctx, t)?;
                    if !results.is_empty() {
                        out.extend(results);
                        break;
                    }
                }
            }
        }
        StepKind::Optional => {
            let child = exec.child(0)?;
            for t in stream {
                let results = run_child(child, ctx, &t)?;
                if results.is_empty() {
                    out.push(t);
                } else {
                    out.extend(results);
                }
            }
        }
        StepKind::Local | StepKind::FlatMap => {
            let child = exec.child(0)?;
            for t in &stream {
                out.extend(run_child(child, ctx, t)?);
            }
        }
        StepKind::Map => match step.args.first() {
            Some(Argument::Function(function)) => {
                for t in &stream {
                    out.push(t.split(function.apply(t.get())?));
                }
            }
            _ => {
                let child = exec.child(0)?;
                for t in &stream {
                    if let Some(value) = first_value(child, ctx, t)? {
                        out.push(t.split(value));
                    }
                }
            }
        },
        StepKind::Repeat => return repeat(exec, ctx, stream),
        StepKind::Loops => {
            for t in &stream {
                out.push(t.split(Value::Int(t.loops() as i64)));
            }
        }

        // ==================== Projection and aggregation ====================
        StepKind::Project => {
            let keys = label_args(step);
            let bys: Vec<Option<&Traversal>> = exec
                .modulators(StepKind::By)
                .map(|m| m.children.first())
                .collect();
            for t in &stream {
                let mut row = IndexMap::with_capacity(keys.len());
                for (i, key) in keys.iter().enumerate() {
                    let value = match by_at(&bys, i) {
                        Some(child) => first_value(child, ctx, t)?.ok_or_else(|| {
                            Error::ExecutionError(format!(
                                "project('{}'): by() traversal produced no value",
                                key
                            ))
                        })?,
                        None => t.get().clone(),
                    };
                    row.insert(Value::String(key.to_string()), value);
                }
                out.push(t.split(Value::Map(row)));
            }
        }
        StepKind::Select => return select(exec, ctx, stream),
        StepKind::Group => {
            let mut bys = exec
                .modulators(StepKind::By)
                .map(|m| m.children.first());
            let key_by = bys.next().flatten();
            let value_by = bys.next().flatten();

            let mut groups: IndexMap<Value, Vec<Traverser>> = IndexMap::new();
            for t in stream {
                let key = match key_by {
                    Some(child) => first_value(child, ctx, &t)?.ok_or_else(|| {
                        Error::ExecutionError("group(): key traversal produced no value".to_string())
                    })?,
                    None => t.get().clone(),
                };
                groups.entry(key).or_default().push(t);
            }

            let mut result = IndexMap::with_capacity(groups.len());
            for (key, members) in groups {
                let value = match value_by {
                    Some(child) => {
                        let reducing = is_reducing(child);
                        let values = objects(execute(child, ctx, members)?);
                        if reducing {
                            values.into_iter().next().unwrap_or(Value::List(Vec::new()))
                        } else {
                            Value::List(values)
                        }
                    }
                    None => Value::List(objects(members)),
                };
                result.insert(key, value);
            }
            out.push(Traverser::new(Value::Map(result)));
        }
        StepKind::Fold => out.push(Traverser::new(Value::List(objects(stream)))),
        StepKind::Unfold => {
            for t in &stream {
                match t.get() {
                    Value::List(items) => {
                        out.extend(items.iter().map(|item| t.split(item.clone())))
                    }
                    Value::Map(map) => out.extend(map.iter().map(|(k, v)| {
                        let mut entry = IndexMap::with_capacity(1);
                        entry.insert(k.clone(), v.clone());
                        t.split(Value::Map(entry))
                    })),
                    other => out.push(t.split(other.clone())),
                }
            }
        }
        StepKind::Count => match scope_arg(step) {
            Scope::Global => out.push(Traverser::new(Value::Int(stream.len() as i64))),
            Scope::Local => {
                for t in &stream {
                    let size = match t.get() {
                        Value::List(items) => items.len(),
                        Value::Map(map) => map.len(),
                        _ => 1,
                    };
                    out.push(t.split(Value::Int(size as i64)));
                }
            }
        },
        StepKind::Sum | StepKind::Min | StepKind::Max | StepKind::Mean => {
            match scope_arg(step) {
                Scope::Global => {
                    let values = objects(stream);
                    if let Some(value) = reduce(step.kind, &values)? {
                        out.push(Traverser::new(value));
                    }
                }
                Scope::Local => {
                    for t in &stream {
                        let values = match t.get() {
                            Value::List(items) => items.clone(),
                            other => vec![other.clone()],
                        };
                        if let Some(value) = reduce(step.kind, &values)? {
                            out.push(t.split(value));
                        }
                    }
                }
            }
        }
        StepKind::Path => {
            for t in &stream {
                out.push(t.split(Value::List(t.path_objects())));
            }
        }
        StepKind::ValueMap => {
            let tokens = matches!(step.args.first(), Some(Argument::Literal(Value::Bool(true))));
            for t in &stream {
                let mut map = IndexMap::new();
                if tokens {
                    let (id, label) = element_id_label(t.get())?;
                    map.insert(Value::from("~id"), Value::Int(id as i64));
                    map.insert(Value::from("~label"), Value::String(label));
                }
                for (k, v) in element_properties(&ctx.graph, t.get())? {
                    map.insert(Value::String(k), v);
                }
                out.push(t.split(Value::Map(map)));
            }
        }
        StepKind::Values => {
            let keys = label_args(step);
            for t in &stream {
                let properties = element_properties(&ctx.graph, t.get())?;
                if keys.is_empty() {
                    out.extend(properties.into_values().map(|v| t.split(v)));
                } else {
                    for key in &keys {
                        if let Some(v) = properties.get(*key) {
                            out.push(t.split(v.clone()));
                        }
                    }
                }
            }
        }
        StepKind::Properties => {
            let keys = label_args(step);
            for t in &stream {
                let owner = element_ref(t.get())?;
                for (key, value) in element_properties(&ctx.graph, t.get())? {
                    if keys.is_empty() || keys.contains(&key.as_str()) {
                        out.push(t.split(Value::Property(PropertyRef {
                            owner: owner.clone(),
                            key,
                            value: Box::new(value),
                        })));
                    }
                }
            }
        }
        StepKind::Value | StepKind::Key => {
            for t in &stream {
                let value = match t.get() {
                    Value::Property(p) if step.kind == StepKind::Value => (*p.value).clone(),
                    Value::Property(p) => Value::String(p.key.clone()),
                    other => return Err(type_error(step, other)),
                };
                out.push(t.split(value));
            }
        }
        StepKind::Label => {
            for t in &stream {
                let label = match t.get() {
                    Value::Property(p) => p.key.clone(),
                    other => element_label(other)
                        .map(str::to_string)
                        .ok_or_else(|| type_error(step, other))?,
                };
                out.push(t.split(Value::String(label)));
            }
        }
        StepKind::Id => {
            for t in &stream {
                let (id, _) = element_id_label(t.get())?;
                out.push(t.split(Value::Int(id as i64)));
            }
        }

        // ==================== Ordering and windowing ====================
        StepKind::Order => return order(exec, ctx, stream),
        StepKind::Range => {
            let (scope, first) = match step.args.first() {
                Some(Argument::Scope(scope)) => (*scope, 1),
                _ => (Scope::Global, 0),
            };
            let low = arg_int(step, first)?;
            let high = arg_int(step, first + 1)?;
            return Ok(window(scope, stream, low, high));
        }
        StepKind::Limit => {
            let (scope, offset) = scoped_int_args(step)?;
            return Ok(window(scope, stream, 0, offset));
        }
        StepKind::Skip => {
            let skip = arg_int(step, 0)?.max(0) as usize;
            out.extend(stream.into_iter().skip(skip));
        }
        StepKind::Tail => {
            let (scope, n) = scoped_int_args(step)?;
            let n = n.max(0) as usize;
            match scope {
                Scope::Global => {
                    let skip = stream.len().saturating_sub(n);
                    out.extend(stream.into_iter().skip(skip));
                }
                Scope::Local => {
                    for t in &stream {
                        out.push(match t.get() {
                            Value::List(items) => {
                                let tail = &items[items.len().saturating_sub(n)..];
                                if n == 1 {
                                    match tail.first() {
                                        Some(v) => t.split(v.clone()),
                                        None => continue,
                                    }
                                } else {
                                    t.split(Value::List(tail.to_vec()))
                                }
                            }
                            _ => t.clone(),
                        });
                    }
                }
            }
        }

        // ==================== Navigation ====================
        StepKind::OutE | StepKind::InE | StepKind::BothE => {
            let labels = label_args(step);
            for t in &stream {
                let id = as_vertex_id(t.get())?;
                let mut edges = Vec::new();
                if step.kind != StepKind::InE {
                    edges.extend(ctx.graph.get_outgoing_edges(id));
                }
                if step.kind != StepKind::OutE {
                    edges.extend(ctx.graph.get_incoming_edges(id));
                }
                for edge in edges {
                    if labels.is_empty() || labels.contains(&edge.label()) {
                        out.push(t.split(Value::Edge(edge.to_ref())));
                    }
                }
            }
        }
        StepKind::OutV | StepKind::InV | StepKind::OtherV => {
            for t in &stream {
                let edge = match t.get() {
                    Value::Edge(e) => e,
                    other => return Err(type_error(step, other)),
                };
                let id = match step.kind {
                    StepKind::OutV => edge.out_v,
                    StepKind::InV => edge.in_v,
                    _ => {
                        let previous = t
                            .path_objects()
                            .into_iter()
                            .rev()
                            .skip(1)
                            .find_map(|v| match v {
                                Value::Vertex(v) => Some(v.id),
                                _ => None,
                            });
                        if previous == Some(edge.out_v) {
                            edge.in_v
                        } else {
                            edge.out_v
                        }
                    }
                };
                out.push(t.split(vertex_value(&ctx.graph, id)?));
            }
        }

        // ==================== Side effects ====================
        StepKind::As => {
            let labels = label_args(step);
            for mut t in stream {
                for label in &labels {
                    t.add_label(label);
                }
                out.push(t);
            }
        }
        StepKind::Aggregate => {
            let key = arg_str(step, 0)?;
            let entry = ctx
                .side_effects
                .entry(key.to_string())
                .or_insert_with(|| Value::List(Vec::new()));
            if let Value::List(items) = entry {
                items.extend(stream.iter().map(|t| t.get().clone()));
            }
            out = stream;
        }
        StepKind::SideEffect => {
            let child = exec.child(0)?;
            for t in stream {
                run_child(child, ctx, &t)?;
                out.push(t);
            }
        }
        StepKind::Cap => {
            let key = arg_str(step, 0)?;
            let value = ctx.side_effects.get(key).cloned().ok_or_else(|| {
                Error::ExecutionError(format!("cap(): side-effect '{}' does not exist", key))
            })?;
            out.push(Traverser::new(value));
        }
        StepKind::Barrier | StepKind::Identity => out = stream,
        StepKind::Index => {
            for t in &stream {
                let indexed = match t.get() {
                    Value::List(items) => Value::List(
                        items
                            .iter()
                            .enumerate()
                            .map(|(i, v)| Value::List(vec![v.clone(), Value::Int(i as i64)]))
                            .collect(),
                    ),
                    other => Value::List(vec![other.clone(), Value::Int(0)]),
                };
                out.push(t.split(indexed));
            }
        }
        StepKind::Constant => {
            let value = arg_literal(step, 0)?;
            for t in &stream {
                out.push(t.split(value.clone()));
            }
        }
        StepKind::Inject => {
            for arg in &step.args {
                if let Argument::Literal(value) = arg {
                    out.push(Traverser::new(value.clone()));
                }
            }
            out.extend(stream);
        }
        StepKind::Math => {
            let expression = match arg_literal(step, 0)? {
                Value::String(s) => s.as_str(),
                other => return Err(type_error(step, other)),
            };
            let names = math::variables(expression)?;
            let bys: Vec<Option<&Traversal>> = exec
                .modulators(StepKind::By)
                .map(|m| m.children.first())
                .collect();
            for t in &stream {
                let mut vars = HashMap::with_capacity(names.len());
                for (i, name) in names.iter().enumerate() {
                    let mut value = if name == "_" {
                        Some(t.get().clone())
                    } else {
                        scope_value(ctx, t, Pop::Last, name)
                    };
                    if let (Some(current), Some(child)) = (value.clone(), by_at(&bys, i)) {
                        value = first_value(child, ctx, &t.split(current))?;
                    }
                    let number = value.as_ref().and_then(Value::as_float).ok_or_else(|| {
                        Error::ExecutionError(format!(
                            "math(): variable '{}' is not bound to a number",
                            name
                        ))
                    })?;
                    vars.insert(name.clone(), number);
                }
                out.push(t.split(Value::Float(math::evaluate(expression, &vars)?)));
            }
        }
        StepKind::Drop => {
            for t in &stream {
                match t.get() {
                    Value::Vertex(v) => ctx.graph.remove_vertex(v.id)?,
                    Value::Edge(e) => ctx.graph.remove_edge(e.id)?,
                    Value::Property(p) => match p.owner {
                        ElementRef::Vertex(id) => ctx.graph.remove_vertex_property(id, &p.key)?,
                        ElementRef::Edge(id) => ctx.graph.remove_edge_property(id, &p.key)?,
                    },
                    other => return Err(type_error(step, other)),
                }
                metrics::global_metrics().record_drop();
            }
        }
        StepKind::Property => {
            for t in stream {
                write_property(exec, ctx, &t)?;
                out.push(t);
            }
        }

        StepKind::By
        | StepKind::From
        | StepKind::To
        | StepKind::Option
        | StepKind::Times
        | StepKind::Until
        | StepKind::Emit
        | StepKind::With => {
            return Err(Error::ExecutionError(format!(
                "{}() has no step to modulate",
                step.name()
            )))
        }
    }

    Ok(out)
}

// ==================== Compound steps ====================

fn choose(exec: &StepExec, ctx: &mut ExecContext, t: Traverser) -> Result<Vec<Traverser>> {
    let step = &exec.step;
    match (step.args.first(), exec.children.len()) {
        (Some(Argument::Predicate(predicate)), _) => {
            if predicate.test(t.get()) {
                run_child(exec.child(0)?, ctx, &t)
            } else if exec.children.len() > 1 {
                run_child(exec.child(1)?, ctx, &t)
            } else {
                Ok(vec![t])
            }
        }
        (_, 1) => {
            let choice = first_value(exec.child(0)?, ctx, &t)?.unwrap_or(Value::Null);
            for option in exec.modulators(StepKind::Option) {
                let pick = arg_literal(&option.step, 0)?;
                if *pick == choice {
                    let child = option.children.first().ok_or_else(|| {
                        Error::ExecutionError("option() is missing its traversal".to_string())
                    })?;
                    return run_child(child, ctx, &t);
                }
            }
            Ok(vec![t])
        }
        _ => {
            if has_result(exec.child(0)?, ctx, &t)? {
                run_child(exec.child(1)?, ctx, &t)
            } else if exec.children.len() > 2 {
                run_child(exec.child(2)?, ctx, &t)
            } else {
                Ok(vec![t])
            }
        }
    }
}

enum LoopCondition<'a> {
    Traversal(&'a Traversal),
    /// `until()`: the body produced nothing.
    Exhausted,
}

fn repeat(exec: &StepExec, ctx: &mut ExecContext, stream: Vec<Traverser>) -> Result<Vec<Traverser>> {
    let body = exec.child(0)?;
    let times = match exec.modulators(StepKind::Times).last() {
        Some(m) => {
            let n = arg_int(&m.step, 0)?;
            let n = u32::try_from(n.max(0)).map_err(|_| {
                Error::ExecutionError(format!("times({}) is out of range", n))
            })?;
            Some(n)
        }
        None => None,
    };
    let until = exec.modulators(StepKind::Until).last().map(|m| {
        let condition = match m.children.first() {
            Some(child) => LoopCondition::Traversal(child),
            None => LoopCondition::Exhausted,
        };
        (condition, m.before)
    });
    let emit = exec
        .modulators(StepKind::Emit)
        .last()
        .map(|m| (m.children.first(), m.before));

    let mut results = Vec::new();
    let mut frontier: Vec<Traverser> = stream
        .into_iter()
        .map(|mut t| {
            t.enter_loop();
            t
        })
        .collect();
    let mut iteration = 0u32;

    let exit = |mut t: Traverser| {
        t.exit_loop();
        t
    };

    while !frontier.is_empty() {
        let mut next = Vec::with_capacity(frontier.len());
        for t in frontier.drain(..) {
            if let Some((LoopCondition::Traversal(child), true)) = &until {
                if has_result(child, ctx, &t)? {
                    results.push(exit(t));
                    continue;
                }
            }
            if let Some((condition, true)) = emit {
                if emits(condition, ctx, &t)? {
                    results.push(exit(t.clone()));
                }
            }
            next.push(t);
        }
        if next.is_empty() {
            break;
        }

        if iteration >= ctx.config.max_loops {
            return Err(Error::ExecutionError(format!(
                "repeat() exceeded the maximum of {} iterations",
                ctx.config.max_loops
            )));
        }
        iteration += 1;

        let mut produced = Vec::new();
        for t in next {
            let outputs = execute(body, ctx, vec![t.clone()])?;
            if outputs.is_empty() {
                if let Some((LoopCondition::Exhausted, _)) = &until {
                    results.push(exit(t));
                }
                continue;
            }
            for mut o in outputs {
                o.incr_loops();
                produced.push(o);
            }
        }

        for t in produced {
            if times.map_or(false, |n| t.loops() >= n) {
                results.push(exit(t));
                continue;
            }
            if let Some((LoopCondition::Traversal(child), false)) = &until {
                if has_result(child, ctx, &t)? {
                    results.push(exit(t));
                    continue;
                }
            }
            if let Some((condition, false)) = emit {
                if emits(condition, ctx, &t)? {
                    results.push(exit(t.clone()));
                }
            }
            frontier.push(t);
        }
    }

    Ok(results)
}

fn emits(condition: Option<&Traversal>, ctx: &mut ExecContext, t: &Traverser) -> Result<bool> {
    match condition {
        Some(child) => has_result(child, ctx, t),
        None => Ok(true),
    }
}

fn select(exec: &StepExec, ctx: &mut ExecContext, stream: Vec<Traverser>) -> Result<Vec<Traverser>> {
    let step = &exec.step;
    let bys: Vec<Option<&Traversal>> = exec
        .modulators(StepKind::By)
        .map(|m| m.children.first())
        .collect();
    let mut out = Vec::with_capacity(stream.len());

    if let Some(Argument::Column(column)) = step.args.first() {
        for t in &stream {
            let map = match t.get() {
                Value::Map(map) => map,
                other => return Err(type_error(step, other)),
            };
            let selected = match column {
                Column::Keys => map.keys().cloned().collect(),
                Column::Values => map.values().cloned().collect(),
            };
            out.push(t.split(Value::List(selected)));
        }
        return Ok(out);
    }

    let (pop, keys) = match step.args.first() {
        Some(Argument::Pop(pop)) => (*pop, vec![arg_str(step, 1)?]),
        _ => (Pop::Last, label_args(step)),
    };

    'traversers: for t in stream {
        let mut values = Vec::with_capacity(keys.len());
        for (i, key) in keys.iter().enumerate() {
            let mut value = match scope_value(ctx, &t, pop, key) {
                Some(v) => v,
                None => continue 'traversers,
            };
            if let Some(child) = by_at(&bys, i) {
                value = match first_value(child, ctx, &t.split(value))? {
                    Some(v) => v,
                    None => continue 'traversers,
                };
            }
            values.push(value);
        }

        let selected = if keys.len() == 1 {
            values.pop().unwrap_or(Value::Null)
        } else {
            Value::Map(
                keys.iter()
                    .map(|k| Value::String(k.to_string()))
                    .zip(values)
                    .collect(),
            )
        };
        out.push(t.split(selected));
    }
    Ok(out)
}

fn order(exec: &StepExec, ctx: &mut ExecContext, stream: Vec<Traverser>) -> Result<Vec<Traverser>> {
    let mut criteria: Vec<(Option<&Traversal>, Order)> = exec
        .modulators(StepKind::By)
        .map(|m| {
            let order = m
                .step
                .args
                .iter()
                .find_map(|a| match a {
                    Argument::Order(o) => Some(*o),
                    _ => None,
                })
                .unwrap_or(Order::Asc);
            (m.children.first(), order)
        })
        .collect();
    if criteria.is_empty() {
        criteria.push((None, Order::Asc));
    }

    let mut keyed = Vec::with_capacity(stream.len());
    for t in stream {
        let mut keys = Vec::with_capacity(criteria.len());
        for (child, _) in &criteria {
            keys.push(match child {
                Some(child) => first_value(child, ctx, &t)?.ok_or_else(|| {
                    Error::ExecutionError(
                        "order(): by() traversal produced no value".to_string(),
                    )
                })?,
                None => t.get().clone(),
            });
        }
        keyed.push((keys, t));
    }

    if criteria.iter().any(|(_, o)| *o == Order::Shuffle) {
        let state = RandomState::new();
        let mut shuffled: Vec<(u64, Traverser)> = keyed
            .into_iter()
            .enumerate()
            .map(|(i, (_, t))| (state.hash_one(i), t))
            .collect();
        shuffled.sort_by_key(|(k, _)| *k);
        return Ok(shuffled.into_iter().map(|(_, t)| t).collect());
    }

    keyed.sort_by(|(a, _), (b, _)| {
        for (i, (_, order)) in criteria.iter().enumerate() {
            let ord = a[i].compare(&b[i]);
            let ord = if *order == Order::Desc { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    Ok(keyed.into_iter().map(|(_, t)| t).collect())
}

fn window(scope: Scope, stream: Vec<Traverser>, low: i64, high: i64) -> Vec<Traverser> {
    let low = low.max(0) as usize;
    match scope {
        Scope::Global => {
            let iter = stream.into_iter().skip(low);
            if high < 0 {
                iter.collect()
            } else {
                iter.take((high as usize).saturating_sub(low)).collect()
            }
        }
        Scope::Local => stream
            .into_iter()
            .filter_map(|t| match t.get() {
                Value::List(items) => {
                    let end = if high < 0 {
                        items.len()
                    } else {
                        (high as usize).min(items.len())
                    };
                    let slice = if low < end { &items[low..end] } else { &[][..] };
                    if high >= 0 && (high as usize).saturating_sub(low) == 1 {
                        slice.first().map(|v| t.split(v.clone()))
                    } else {
                        Some(t.split(Value::List(slice.to_vec())))
                    }
                }
                _ => Some(t),
            })
            .collect(),
    }
}

fn reduce(kind: StepKind, values: &[Value]) -> Result<Option<Value>> {
    for value in values {
        if kind != StepKind::Min && kind != StepKind::Max && !value.is_number() {
            return Err(Error::ExecutionError(format!(
                "{}() requires numbers, got {}",
                kind.name(),
                value.type_name()
            )));
        }
    }
    Ok(match kind {
        StepKind::Sum => Some(sum(values)),
        StepKind::Mean if values.is_empty() => None,
        StepKind::Mean => {
            let total: f64 = values.iter().filter_map(Value::as_float).sum();
            Some(Value::Float(total / values.len() as f64))
        }
        StepKind::Min => values.iter().min_by(|a, b| a.compare(b)).cloned(),
        _ => values.iter().max_by(|a, b| a.compare(b)).cloned(),
    })
}

fn sum(values: &[Value]) -> Value {
    if values.iter().all(|v| matches!(v, Value::Int(_))) {
        let mut total: i64 = 0;
        for v in values {
            if let Value::Int(i) = v {
                match total.checked_add(*i) {
                    Some(t) => total = t,
                    None => return Value::Float(values.iter().filter_map(Value::as_float).sum()),
                }
            }
        }
        Value::Int(total)
    } else {
        Value::Float(values.iter().filter_map(Value::as_float).sum())
    }
}

fn is_reducing(traversal: &Traversal) -> bool {
    match traversal.exec_steps().last() {
        Some(ExecStep::Step(exec)) => {
            matches!(
                exec.step.kind,
                StepKind::Fold
                    | StepKind::Count
                    | StepKind::Sum
                    | StepKind::Min
                    | StepKind::Max
                    | StepKind::Mean
                    | StepKind::Group
            ) && scope_arg(&exec.step) == Scope::Global
        }
        _ => false,
    }
}

fn write_property(exec: &StepExec, ctx: &mut ExecContext, t: &Traverser) -> Result<()> {
    let step = &exec.step;
    let mut index = 0;
    let cardinality = match step.args.first() {
        Some(Argument::Cardinality(c)) => {
            index = 1;
            Some(*c)
        }
        _ => None,
    };

    let mut children = exec.children.iter();
    let key = match step.args.get(index) {
        Some(Argument::Label(key)) => key.clone(),
        Some(Argument::Literal(Value::String(key))) => key.clone(),
        Some(Argument::Token(token)) => {
            return Err(Error::ExecutionError(format!(
                "property(T.{}) cannot modify an existing element",
                token
            )))
        }
        Some(Argument::Program(_)) => {
            let child = children.next().ok_or_else(|| missing_traversal(step))?;
            match first_value(child, ctx, t)? {
                Some(Value::String(key)) => key,
                other => {
                    return Err(Error::ExecutionError(format!(
                        "property(): key traversal must produce a string, got {:?}",
                        other
                    )))
                }
            }
        }
        _ => return Err(bad_argument(step, index)),
    };
    let value = match step.args.get(index + 1) {
        Some(Argument::Literal(value)) => value.clone(),
        Some(Argument::Program(_)) => {
            let child = children.next().ok_or_else(|| missing_traversal(step))?;
            first_value(child, ctx, t)?.ok_or_else(|| {
                Error::ExecutionError(format!(
                    "property('{}'): value traversal produced no value",
                    key
                ))
            })?
        }
        _ => return Err(bad_argument(step, index + 1)),
    };

    match t.get() {
        Value::Vertex(v) => {
            if value.is_cypher_null() {
                return ctx.graph.remove_vertex_property(v.id, &key);
            }
            let value = match cardinality {
                Some(Cardinality::List) | Some(Cardinality::Set) => {
                    let existing = ctx
                        .graph
                        .get_vertex(v.id)
                        .and_then(|vertex| vertex.property(&key).cloned());
                    let mut items = match existing {
                        Some(Value::List(items)) => items,
                        Some(other) => vec![other],
                        None => Vec::new(),
                    };
                    if cardinality == Some(Cardinality::List) || !items.contains(&value) {
                        items.push(value);
                    }
                    Value::List(items)
                }
                _ => value,
            };
            ctx.graph.set_vertex_property(v.id, &key, value)
        }
        Value::Edge(e) => {
            if value.is_cypher_null() {
                ctx.graph.remove_edge_property(e.id, &key)
            } else {
                ctx.graph.set_edge_property(e.id, &key, value)
            }
        }
        other => Err(type_error(step, other)),
    }
}

// ==================== Helpers ====================

fn run_child(child: &Traversal, ctx: &mut ExecContext, t: &Traverser) -> Result<Vec<Traverser>> {
    execute(child, ctx, vec![t.clone()])
}

fn first_value(child: &Traversal, ctx: &mut ExecContext, t: &Traverser) -> Result<Option<Value>> {
    Ok(run_child(child, ctx, t)?
        .into_iter()
        .next()
        .map(Traverser::into_object))
}

fn has_result(child: &Traversal, ctx: &mut ExecContext, t: &Traverser) -> Result<bool> {
    Ok(!run_child(child, ctx, t)?.is_empty())
}

/// `by()` modulators apply round-robin; a bare `by()` means identity.
fn by_at<'a>(bys: &[Option<&'a Traversal>], index: usize) -> Option<&'a Traversal> {
    if bys.is_empty() {
        None
    } else {
        bys[index % bys.len()]
    }
}

fn objects(traversers: Vec<Traverser>) -> Vec<Value> {
    traversers.into_iter().map(Traverser::into_object).collect()
}

/// `select()` lookup order: map entry, side-effect, then path label.
fn scope_value(ctx: &ExecContext, t: &Traverser, pop: Pop, key: &str) -> Option<Value> {
    if let Value::Map(map) = t.get() {
        if let Some(v) = map.get(&Value::String(key.to_string())) {
            return Some(v.clone());
        }
    }
    if let Some(v) = ctx.side_effects.get(key) {
        return Some(v.clone());
    }
    t.path_value(pop, key)
}

fn add_vertex(ctx: &ExecContext, label: Option<&str>) -> Result<Value> {
    let id = ctx.graph.add_vertex(label.unwrap_or(DEFAULT_VERTEX_LABEL));
    vertex_value(&ctx.graph, id)
}

fn vertex_value(graph: &Graph, id: VertexId) -> Result<Value> {
    graph
        .get_vertex(id)
        .map(|v| Value::Vertex(v.to_ref()))
        .ok_or_else(|| Error::NotFound(format!("顶点 {:?} 不存在", id)))
}

fn edge_value(graph: &Graph, id: EdgeId) -> Result<Value> {
    graph
        .get_edge(id)
        .map(|e| Value::Edge(e.to_ref()))
        .ok_or_else(|| Error::NotFound(format!("边 {:?} 不存在", id)))
}

fn resolve_vertex(ctx: &ExecContext, t: &Traverser, label: &str) -> Result<VertexId> {
    let value = scope_value(ctx, t, Pop::Last, label).ok_or_else(|| {
        Error::ExecutionError(format!("addE(): step label '{}' is not bound", label))
    })?;
    as_vertex_id(&value)
}

fn as_vertex_id(value: &Value) -> Result<VertexId> {
    match value {
        Value::Vertex(v) => Ok(v.id),
        other => Err(Error::ExecutionError(format!(
            "expected a vertex, got {}",
            other.type_name()
        ))),
    }
}

fn element_ref(value: &Value) -> Result<ElementRef> {
    match value {
        Value::Vertex(v) => Ok(ElementRef::Vertex(v.id)),
        Value::Edge(e) => Ok(ElementRef::Edge(e.id)),
        other => Err(Error::ExecutionError(format!(
            "expected an element, got {}",
            other.type_name()
        ))),
    }
}

fn element_label(value: &Value) -> Option<&str> {
    match value {
        Value::Vertex(v) => Some(&v.label),
        Value::Edge(e) => Some(&e.label),
        _ => None,
    }
}

fn element_id_label(value: &Value) -> Result<(u64, String)> {
    match value {
        Value::Vertex(v) => Ok((v.id.as_u64(), v.label.clone())),
        Value::Edge(e) => Ok((e.id.as_u64(), e.label.clone())),
        other => Err(Error::ExecutionError(format!(
            "expected an element, got {}",
            other.type_name()
        ))),
    }
}

fn element_properties(graph: &Graph, value: &Value) -> Result<IndexMap<String, Value>> {
    match value {
        Value::Vertex(v) => graph
            .get_vertex(v.id)
            .map(|vertex| vertex.properties().clone())
            .ok_or_else(|| Error::NotFound(format!("顶点 {:?} 已被删除", v.id))),
        Value::Edge(e) => graph
            .get_edge(e.id)
            .map(|edge| edge.properties().clone())
            .ok_or_else(|| Error::NotFound(format!("边 {:?} 已被删除", e.id))),
        other => Err(Error::ExecutionError(format!(
            "expected an element, got {}",
            other.type_name()
        ))),
    }
}

fn property_value(graph: &Graph, value: &Value, key: &str) -> Result<Option<Value>> {
    match value {
        Value::Vertex(_) | Value::Edge(_) => {
            Ok(element_properties(graph, value)?.get(key).cloned())
        }
        _ => Ok(None),
    }
}

fn label_args(step: &Step) -> Vec<&str> {
    step.args
        .iter()
        .filter_map(|a| match a {
            Argument::Label(l) => Some(l.as_str()),
            _ => None,
        })
        .collect()
}

fn arg_str(step: &Step, index: usize) -> Result<&str> {
    match step.args.get(index) {
        Some(Argument::Label(s)) => Ok(s),
        Some(Argument::Literal(Value::String(s))) => Ok(s),
        _ => Err(bad_argument(step, index)),
    }
}

fn arg_literal(step: &Step, index: usize) -> Result<&Value> {
    match step.args.get(index) {
        Some(Argument::Literal(v)) => Ok(v),
        _ => Err(bad_argument(step, index)),
    }
}

fn arg_int(step: &Step, index: usize) -> Result<i64> {
    arg_literal(step, index)?
        .as_int()
        .ok_or_else(|| bad_argument(step, index))
}

fn arg_predicate(step: &Step, index: usize) -> Result<&P> {
    optional_predicate(step, index).ok_or_else(|| bad_argument(step, index))
}

fn optional_predicate(step: &Step, index: usize) -> Option<&P> {
    match step.args.get(index) {
        Some(Argument::Predicate(p)) => Some(p),
        _ => None,
    }
}

fn scope_arg(step: &Step) -> Scope {
    match step.args.first() {
        Some(Argument::Scope(scope)) => *scope,
        _ => Scope::Global,
    }
}

/// `limit(n)` / `limit(scope, n)` and `tail(scope, n)`.
fn scoped_int_args(step: &Step) -> Result<(Scope, i64)> {
    match step.args.first() {
        Some(Argument::Scope(scope)) => Ok((*scope, arg_int(step, 1)?)),
        _ => Ok((Scope::Global, arg_int(step, 0)?)),
    }
}

fn bad_argument(step: &Step, index: usize) -> Error {
    Error::ExecutionError(format!("{}(): invalid argument {}", step.name(), index))
}

fn missing_traversal(step: &Step) -> Error {
    Error::ExecutionError(format!("{}() is missing a traversal argument", step.name()))
}

fn type_error(step: &Step, value: &Value) -> Error {
    Error::ExecutionError(format!(
        "{}() cannot be applied to a {}",
        step.name(),
        value.type_name()
    ))
}
