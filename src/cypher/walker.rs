//! AST walker
//!
//! Drives any [`GremlinSteps`] backend from a parsed [`Query`]. Every value
//! expression becomes a sub-program that yields exactly one value for the
//! current traverser, with Cypher `null` carried as [`NULL_SENTINEL`].

use super::ast::*;
use crate::error::{Error, Result};
use crate::translation::{Cardinality, Column, CustomFunction, GremlinSteps, Order, Pop, P};
use crate::types::{Value, NULL_SENTINEL};
use std::collections::HashMap;

/// Keys of a projected relationship.
pub const ELEMENT_KEY: &str = "  cypher.element";
pub const IN_V_KEY: &str = "  cypher.inv";
pub const OUT_V_KEY: &str = "  cypher.outv";

/// Injected start object for queries without a pattern.
const START: &str = "  cypher.start";
const UNNAMED: &str = "  UNNAMED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VarKind {
    Node,
    Relationship,
    /// Variable-length relationship: a list of edges.
    RelationshipList,
}

pub(crate) fn walk<S: GremlinSteps>(query: &Query, g: &mut S) -> Result<()> {
    Walker::default().walk(query, g)
}

#[derive(Default)]
struct Walker {
    vars: HashMap<String, VarKind>,
    started: bool,
    unnamed: usize,
}

impl Walker {
    fn walk<S: GremlinSteps>(&mut self, query: &Query, g: &mut S) -> Result<()> {
        for clause in &query.matches {
            for pattern in &clause.patterns {
                self.match_path(g, pattern)?;
            }
            if let Some(condition) = &clause.where_clause {
                let filter = self.filter(g, condition)?;
                g.where_(&filter);
            }
        }

        if !query.create.is_empty() {
            self.create(g, &query.create)?;
        }

        if !self.started {
            g.inject(&[Value::from(START)]);
            self.started = true;
        }

        for item in &query.set {
            self.set(g, item)?;
        }
        if let Some(delete) = &query.delete {
            self.delete(g, delete)?;
        }

        match &query.return_clause {
            Some(ret) => self.ret(g, ret),
            None => {
                g.barrier().limit(0);
                Ok(())
            }
        }
    }

    fn kind(&self, variable: &str) -> Result<VarKind> {
        self.vars.get(variable).copied().ok_or_else(|| {
            Error::TranslationError(format!("Variable `{}` not defined", variable))
        })
    }

    fn is_bound(&self, variable: Option<&str>) -> bool {
        variable.map_or(false, |v| self.vars.contains_key(v))
    }

    // ==================== MATCH ====================

    fn match_path<S: GremlinSteps>(&mut self, g: &mut S, pattern: &PathPattern) -> Result<()> {
        let start = &pattern.start;
        match start.variable.as_deref() {
            Some(var) if self.is_bound(Some(var)) => {
                self.expect_node(var)?;
                g.select(&[var])?;
                self.node_constraints(g, start)?;
            }
            _ => {
                g.v();
                self.started = true;
                self.node_constraints(g, start)?;
                self.bind(g, start.variable.as_deref(), VarKind::Node);
            }
        }

        for (relationship, node) in &pattern.chain {
            self.match_relationship(g, relationship)?;
            match node.variable.as_deref() {
                Some(var) if self.is_bound(Some(var)) => {
                    self.expect_node(var)?;
                    self.node_constraints(g, node)?;
                    g.where_p(P::eq(var));
                }
                _ => {
                    self.node_constraints(g, node)?;
                    self.bind(g, node.variable.as_deref(), VarKind::Node);
                }
            }
        }
        Ok(())
    }

    fn expect_node(&self, variable: &str) -> Result<()> {
        match self.kind(variable)? {
            VarKind::Node => Ok(()),
            _ => Err(Error::TranslationError(format!(
                "Variable `{}` already declared as relationship",
                variable
            ))),
        }
    }

    fn bind<S: GremlinSteps>(&mut self, g: &mut S, variable: Option<&str>, kind: VarKind) {
        if let Some(var) = variable {
            g.as_(var);
            self.vars.insert(var.to_string(), kind);
        }
    }

    fn node_constraints<S: GremlinSteps>(&self, g: &mut S, node: &NodePattern) -> Result<()> {
        for label in &node.labels {
            g.has_label(&[label.as_str()]);
        }
        self.property_filters(g, &node.properties)
    }

    /// `{k: v}` on a pattern element being matched.
    fn property_filters<S: GremlinSteps>(
        &self,
        g: &mut S,
        properties: &[(String, Expression)],
    ) -> Result<()> {
        for (key, expression) in properties {
            match expression.as_literal() {
                Some(value) => {
                    g.has_p(key, P::eq(value.clone()));
                }
                None => {
                    let mut own = g.start();
                    own_property(&mut own, key);
                    let other = self.value(g, expression)?;
                    let mut filter = g.start();
                    filter
                        .union(&[&own, &other])
                        .fold()
                        .map_fn(CustomFunction::Equals)
                        .is(P::eq(true));
                    g.where_(&filter);
                }
            }
        }
        Ok(())
    }

    fn match_relationship<S: GremlinSteps>(
        &mut self,
        g: &mut S,
        relationship: &RelationshipPattern,
    ) -> Result<()> {
        let variable = relationship.variable.as_deref();
        if self.is_bound(variable) {
            return Err(Error::TranslationError(format!(
                "Relationship variable `{}` already declared",
                variable.unwrap_or_default()
            )));
        }
        let types: Vec<&str> = relationship.types.iter().map(String::as_str).collect();

        let range = match relationship.length {
            None => {
                edge_step(g, relationship.direction, &types);
                self.property_filters(g, &relationship.properties)?;
                self.bind(g, variable, VarKind::Relationship);
                vertex_step(g, relationship.direction);
                return Ok(());
            }
            Some(range) => range,
        };

        if let Some(var) = variable {
            self.vars.insert(var.to_string(), VarKind::RelationshipList);
        }
        if range.max == Some(0) {
            return Ok(());
        }

        let mut body = g.start();
        edge_step(&mut body, relationship.direction, &types);
        self.property_filters(&mut body, &relationship.properties)?;
        if let Some(var) = variable {
            body.as_(var);
        }
        vertex_step(&mut body, relationship.direction);
        body.simple_path();

        if range.min == 0 {
            g.emit().repeat(&body);
        } else {
            let mut gate = g.start();
            gate.loops().is(P::gte(range.min as i64));
            g.repeat(&body).emit_when(&gate);
        }
        if let Some(max) = range.max {
            g.times(max);
        }
        Ok(())
    }

    // ==================== CREATE / SET / DELETE ====================

    fn create<S: GremlinSteps>(&mut self, g: &mut S, patterns: &[PathPattern]) -> Result<()> {
        let mut names = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let nodes = std::iter::once(&pattern.start).chain(pattern.chain.iter().map(|(_, n)| n));
            let mut path_names = Vec::new();
            for node in nodes {
                path_names.push(self.create_node(g, node)?);
            }
            names.push(path_names);
        }

        for (pattern, path_names) in patterns.iter().zip(&names) {
            for (i, (relationship, _)) in pattern.chain.iter().enumerate() {
                let (left, right) = (&path_names[i], &path_names[i + 1]);
                let (from, to) = match relationship.direction {
                    Direction::Outgoing => (left, right),
                    Direction::Incoming => (right, left),
                    Direction::Both => {
                        return Err(Error::TranslationError(
                            "Only directed relationships are supported in CREATE".to_string(),
                        ))
                    }
                };
                let label = match (relationship.types.as_slice(), relationship.length) {
                    ([label], None) => label,
                    _ => {
                        return Err(Error::TranslationError(
                            "A single relationship type must be specified for CREATE".to_string(),
                        ))
                    }
                };
                let variable = relationship.variable.as_deref();
                if self.is_bound(variable) {
                    return Err(Error::TranslationError(format!(
                        "Variable `{}` already declared",
                        variable.unwrap_or_default()
                    )));
                }

                g.add_e(label).from(from).to(to);
                self.write_properties(g, &relationship.properties, None)?;
                self.bind(g, variable, VarKind::Relationship);
            }
        }
        Ok(())
    }

    /// Creates the node unless it is already bound; returns its step label.
    fn create_node<S: GremlinSteps>(&mut self, g: &mut S, node: &NodePattern) -> Result<String> {
        if let Some(var) = node.variable.as_deref() {
            if self.is_bound(Some(var)) {
                if !node.labels.is_empty() || !node.properties.is_empty() {
                    return Err(Error::TranslationError(format!(
                        "Variable `{}` already declared",
                        var
                    )));
                }
                self.expect_node(var)?;
                return Ok(var.to_string());
            }
        }

        match node.labels.as_slice() {
            [] => g.add_v(),
            [label] => g.add_v_label(label),
            _ => {
                return Err(Error::TranslationError(
                    "Multiple labels are not supported in CREATE".to_string(),
                ))
            }
        };
        self.started = true;
        self.write_properties(g, &node.properties, Some(Cardinality::Single))?;

        let name = match &node.variable {
            Some(var) => var.clone(),
            None => {
                self.unnamed += 1;
                format!("{}{}", UNNAMED, self.unnamed)
            }
        };
        g.as_(&name);
        if node.variable.is_some() {
            self.vars.insert(name.clone(), VarKind::Node);
        }
        Ok(name)
    }

    fn write_properties<S: GremlinSteps>(
        &self,
        g: &mut S,
        properties: &[(String, Expression)],
        cardinality: Option<Cardinality>,
    ) -> Result<()> {
        for (key, expression) in properties {
            match expression.as_literal() {
                Some(value) if value.is_null() => {}
                Some(value) => write_constant(g, cardinality, key, value.clone()),
                None => {
                    let value = self.value(g, expression)?;
                    write_traversal(g, cardinality, key, &value);
                }
            }
        }
        Ok(())
    }

    fn set<S: GremlinSteps>(&self, g: &mut S, item: &SetItem) -> Result<()> {
        let cardinality = match self.kind(&item.variable)? {
            VarKind::Node => Some(Cardinality::Single),
            VarKind::Relationship => None,
            VarKind::RelationshipList => {
                return Err(Error::TranslationError(format!(
                    "Cannot set a property on variable-length relationship `{}`",
                    item.variable
                )))
            }
        };

        let mut update = g.start();
        update.select(&[item.variable.as_str()])?;
        match item.value.as_literal() {
            Some(value) => write_constant(&mut update, cardinality, &item.key, cypher_value(value)),
            None => {
                let value = self.value(g, &item.value)?;
                write_traversal(&mut update, cardinality, &item.key, &value);
            }
        }
        g.side_effect(&update);
        Ok(())
    }

    /// DELETE and DETACH DELETE translate alike; relationships go first.
    fn delete<S: GremlinSteps>(&self, g: &mut S, delete: &DeleteClause) -> Result<()> {
        let mut targets = Vec::with_capacity(delete.variables.len());
        for variable in &delete.variables {
            targets.push((self.kind(variable)?, variable.as_str()));
        }
        targets.sort_by_key(|(kind, _)| *kind == VarKind::Node);

        for (kind, variable) in targets {
            let mut removal = g.start();
            match kind {
                VarKind::RelationshipList => removal.select_pop(Pop::All, variable).unfold(),
                _ => removal.select(&[variable])?,
            };
            removal.drop();
            g.side_effect(&removal);
        }
        Ok(())
    }

    // ==================== RETURN ====================

    fn ret<S: GremlinSteps>(&self, g: &mut S, ret: &ReturnClause) -> Result<()> {
        let names: Vec<&str> = ret.items.iter().map(ReturnItem::name).collect();
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(Error::TranslationError(format!(
                    "Multiple result columns with the same name `{}` are not supported",
                    name
                )));
            }
        }

        if ret.items.iter().any(|i| i.expression.contains_aggregate()) {
            self.ret_aggregate(g, ret, &names)?;
        } else {
            self.ret_plain(g, ret, &names)?;
        }

        if let Some(skip) = ret.skip {
            g.skip(skip);
        }
        if let Some(limit) = ret.limit {
            g.limit(limit);
        }
        Ok(())
    }

    fn ret_plain<S: GremlinSteps>(&self, g: &mut S, ret: &ReturnClause, names: &[&str]) -> Result<()> {
        let sort_first = !ret.distinct && !ret.order_by.is_empty();
        if sort_first {
            g.order();
            for item in &ret.order_by {
                let expression = resolve_alias(ret, &item.expression);
                let key = self.value(g, expression)?;
                g.by_order(&key, sort_order(item));
            }
        }

        g.project(names)?;
        for item in &ret.items {
            let column = self.column(g, &item.expression)?;
            g.by(&column);
        }

        if ret.distinct {
            g.dedup(&[]);
            self.order_by_columns(g, ret, names)?;
        }
        Ok(())
    }

    /// rows → (groups of) row lists → one aggregated row per group
    fn ret_aggregate<S: GremlinSteps>(
        &self,
        g: &mut S,
        ret: &ReturnClause,
        names: &[&str],
    ) -> Result<()> {
        g.project(names)?;
        for item in &ret.items {
            let input = match &item.expression {
                Expression::CountStar => {
                    let mut one = g.start();
                    one.constant(1);
                    one
                }
                Expression::Function { name, args, .. } if item.expression.is_aggregate() => {
                    match args.as_slice() {
                        [argument] => self.column(g, argument)?,
                        _ => {
                            return Err(Error::TranslationError(format!(
                                "{}() expects exactly one argument",
                                name
                            )))
                        }
                    }
                }
                e if e.contains_aggregate() => {
                    return Err(Error::TranslationError(format!(
                        "Aggregation inside `{}` is not supported",
                        item.text
                    )))
                }
                e => self.column(g, e)?,
            };
            g.by(&input);
        }

        let keys: Vec<&str> = ret
            .items
            .iter()
            .filter(|i| !i.expression.is_aggregate())
            .map(ReturnItem::name)
            .collect();
        if keys.is_empty() {
            g.fold();
        } else {
            let mut key = g.start();
            key.select(&keys)?;
            let mut rows = g.start();
            rows.fold();
            g.group()
                .by(&key)
                .by(&rows)
                .select_column(Column::Values)
                .unfold();
        }

        g.project(names)?;
        for item in &ret.items {
            let column = item.name();
            let mut result = g.start();
            match &item.expression {
                Expression::CountStar => {
                    result.unfold().count();
                }
                Expression::Function { name, distinct, .. } if item.expression.is_aggregate() => {
                    let mut values = g.start();
                    values.unfold().select(&[column])?.is(P::neq(NULL_SENTINEL));
                    if *distinct {
                        values.dedup(&[]);
                    }
                    match name.as_str() {
                        "count" => {
                            result = values;
                            result.count();
                        }
                        "collect" => {
                            result = values;
                            result.fold();
                        }
                        "sum" => {
                            result = values;
                            result.sum();
                        }
                        reducer => {
                            match reducer {
                                "min" => values.min(),
                                "max" => values.max(),
                                _ => values.mean(),
                            };
                            let mut null = g.start();
                            null.constant(NULL_SENTINEL);
                            result.coalesce(&[&values, &null]);
                        }
                    }
                }
                _ => {
                    result.unfold().limit(1).select(&[column])?;
                }
            }
            g.by(&result);
        }

        if ret.distinct {
            g.dedup(&[]);
        }
        self.order_by_columns(g, ret, names)
    }

    /// ORDER BY over already projected rows.
    fn order_by_columns<S: GremlinSteps>(
        &self,
        g: &mut S,
        ret: &ReturnClause,
        names: &[&str],
    ) -> Result<()> {
        if ret.order_by.is_empty() {
            return Ok(());
        }
        g.order();
        for item in &ret.order_by {
            let column = *names
                .iter()
                .find(|name| match &item.expression {
                    Expression::Variable(v) => v.as_str() == **name,
                    _ => item.text.as_str() == **name,
                })
                .ok_or_else(|| {
                    Error::TranslationError(format!(
                        "ORDER BY `{}` must refer to a returned column",
                        item.text
                    ))
                })?;
            let mut key = g.start();
            key.select(&[column])?;
            g.by_order(&key, sort_order(item));
        }
        Ok(())
    }

    /// A returned column: whole elements are projected for the normalizer.
    fn column<S: GremlinSteps>(&self, g: &S, expression: &Expression) -> Result<S> {
        let variable = match expression {
            Expression::Variable(v) => v,
            _ => return self.value(g, expression),
        };

        let mut column = g.start();
        match self.kind(variable)? {
            VarKind::Node => {
                column.select(&[variable.as_str()])?.value_map_tokens(true);
            }
            VarKind::Relationship => {
                column.select(&[variable.as_str()])?;
                project_relationship(&mut column)?;
            }
            VarKind::RelationshipList => {
                column.select_pop(Pop::All, variable).unfold();
                project_relationship(&mut column)?;
                column.fold();
            }
        }
        Ok(column)
    }

    // ==================== Expressions ====================

    fn value<S: GremlinSteps>(&self, g: &S, expression: &Expression) -> Result<S> {
        let mut s = g.start();
        self.append_value(&mut s, expression)?;
        Ok(s)
    }

    fn append_value<S: GremlinSteps>(&self, s: &mut S, expression: &Expression) -> Result<()> {
        match expression {
            Expression::Literal(value) => {
                s.constant(cypher_value(value));
            }
            Expression::Variable(name) => match self.kind(name)? {
                VarKind::RelationshipList => {
                    s.select_pop(Pop::All, name);
                }
                _ => {
                    s.select(&[name.as_str()])?;
                }
            },
            Expression::Property(variable, key) => {
                if self.kind(variable)? == VarKind::RelationshipList {
                    return Err(Error::TranslationError(format!(
                        "Type mismatch: `{}` is a list of relationships",
                        variable
                    )));
                }
                s.select(&[variable.as_str()])?;
                own_property(s, key);
            }
            Expression::List(items) => {
                let values = items
                    .iter()
                    .map(|item| self.value(s, item))
                    .collect::<Result<Vec<_>>>()?;
                let refs: Vec<&S> = values.iter().collect();
                s.union(&refs).fold();
            }
            Expression::Map(entries) => {
                let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
                let values = entries
                    .iter()
                    .map(|(_, e)| self.value(s, e))
                    .collect::<Result<Vec<_>>>()?;
                s.project(&keys)?;
                for value in &values {
                    s.by(value);
                }
            }
            Expression::Binary(left, op, right) if binary_function(*op).is_some() => {
                let function = binary_function(*op).unwrap_or(CustomFunction::Plus);
                self.apply_binary(s, left, right, function)?;
            }
            Expression::Negate(inner) => {
                let zero = Expression::Literal(Value::Int(0));
                self.apply_binary(s, &zero, inner, CustomFunction::Minus)?;
            }
            Expression::Not(inner) => {
                self.append_value(s, inner)?;
                s.map_fn(CustomFunction::Not);
            }
            Expression::IsNull(_) | Expression::IsNotNull(_) => {
                let condition = self.filter(s, expression)?;
                let (yes, no) = (boolean(s, true), boolean(s, false));
                s.choose_then_else(&condition, &yes, &no);
            }
            Expression::Binary(left, ..) => {
                // IN and string predicates: null operand, null result
                let mut operand_is_null = s.start();
                self.append_value(&mut operand_is_null, left)?;
                operand_is_null.is(P::eq(NULL_SENTINEL));
                let mut null = s.start();
                null.constant(NULL_SENTINEL);
                let condition = self.filter(s, expression)?;
                let (yes, no) = (boolean(s, true), boolean(s, false));
                let mut known = s.start();
                known.choose_then_else(&condition, &yes, &no);
                s.choose_then_else(&operand_is_null, &null, &known);
            }
            Expression::Function { name, args, .. } => self.append_function(s, name, args)?,
            Expression::CountStar => {
                return Err(Error::TranslationError(
                    "count(*) is only allowed in RETURN".to_string(),
                ))
            }
        }
        Ok(())
    }

    /// `[lhs, rhs]` folded into a list and handed to a binary function.
    fn apply_binary<S: GremlinSteps>(
        &self,
        s: &mut S,
        left: &Expression,
        right: &Expression,
        function: CustomFunction,
    ) -> Result<()> {
        let left = self.value(s, left)?;
        let right = self.value(s, right)?;
        s.union(&[&left, &right]).fold().map_fn(function);
        Ok(())
    }

    fn append_function<S: GremlinSteps>(
        &self,
        s: &mut S,
        name: &str,
        args: &[Expression],
    ) -> Result<()> {
        if AGGREGATES.contains(&name) {
            return Err(Error::TranslationError(format!(
                "Aggregate function {}() is only allowed in RETURN",
                name
            )));
        }
        let argument = match args {
            [argument] => argument,
            _ => {
                return Err(Error::TranslationError(format!(
                    "{}() expects exactly one argument",
                    name
                )))
            }
        };

        self.append_value(s, argument)?;
        match name {
            "id" => {
                s.id();
            }
            "type" => {
                s.label();
            }
            "labels" => {
                s.label().fold();
            }
            "keys" => {
                s.properties(&[]).key().fold();
            }
            "tostring" => {
                s.map_fn(CustomFunction::ToString);
            }
            "tointeger" => {
                s.map_fn(CustomFunction::ToInteger);
            }
            "tofloat" => {
                s.map_fn(CustomFunction::ToFloat);
            }
            "toboolean" => {
                s.map_fn(CustomFunction::ToBoolean);
            }
            "size" => {
                s.map_fn(CustomFunction::Size);
            }
            other => {
                return Err(Error::TranslationError(format!(
                    "Unknown function '{}'",
                    other
                )))
            }
        }
        Ok(())
    }

    fn filter<S: GremlinSteps>(&self, g: &S, expression: &Expression) -> Result<S> {
        let mut s = g.start();
        self.append_filter(&mut s, expression)?;
        Ok(s)
    }

    fn append_filter<S: GremlinSteps>(&self, s: &mut S, expression: &Expression) -> Result<()> {
        match expression {
            Expression::Binary(left, BinaryOperator::And, right) => {
                let (l, r) = (self.filter(s, left)?, self.filter(s, right)?);
                s.and(&[&l, &r]);
            }
            Expression::Binary(left, BinaryOperator::Or, right) => {
                let (l, r) = (self.filter(s, left)?, self.filter(s, right)?);
                s.or(&[&l, &r]);
            }
            Expression::Not(inner) => {
                self.append_value(s, inner)?;
                s.is(P::eq(false));
            }
            Expression::IsNull(inner) => {
                self.append_value(s, inner)?;
                s.is(P::eq(NULL_SENTINEL));
            }
            Expression::IsNotNull(inner) => {
                self.append_value(s, inner)?;
                s.is(P::neq(NULL_SENTINEL));
            }
            Expression::Binary(left, op, right) if comparison(*op).is_some() => {
                match (left.as_literal(), right.as_literal()) {
                    (None, Some(constant)) if !constant.is_null() => {
                        self.append_value(s, left)?;
                        s.is(P::neq(NULL_SENTINEL))
                            .is(compare_predicate(*op, constant.clone()));
                    }
                    (Some(constant), None) if !constant.is_null() => {
                        self.append_value(s, right)?;
                        s.is(P::neq(NULL_SENTINEL))
                            .is(compare_predicate(flip(*op), constant.clone()));
                    }
                    _ => {
                        let function = comparison(*op).unwrap_or(CustomFunction::Equals);
                        self.apply_binary(s, left, right, function)?;
                        s.is(P::eq(true));
                    }
                }
            }
            Expression::Binary(left, BinaryOperator::In, right) => {
                let items = match right.as_literal() {
                    Some(Value::List(items)) => items.clone(),
                    _ => {
                        return Err(Error::TranslationError(
                            "IN is only supported with a literal list".to_string(),
                        ))
                    }
                };
                self.append_value(s, left)?;
                s.is(P::neq(NULL_SENTINEL)).is(P::within(items));
            }
            Expression::Binary(
                left,
                op @ (BinaryOperator::StartsWith | BinaryOperator::EndsWith | BinaryOperator::Contains),
                right,
            ) => {
                let text = match right.as_literal() {
                    Some(Value::String(text)) => text.clone(),
                    _ => {
                        return Err(Error::TranslationError(
                            "String predicates are only supported with a literal string".to_string(),
                        ))
                    }
                };
                let predicate = match op {
                    BinaryOperator::StartsWith => P::starting_with(text),
                    BinaryOperator::EndsWith => P::ending_with(text),
                    _ => P::containing(text),
                };
                self.append_value(s, left)?;
                s.is(P::neq(NULL_SENTINEL)).is(predicate);
            }
            Expression::Literal(Value::Bool(true)) => {
                s.identity();
            }
            Expression::Literal(Value::Bool(false)) | Expression::Literal(Value::Null) => {
                s.limit(0);
            }
            other => {
                self.append_value(s, other)?;
                s.is(P::eq(true));
            }
        }
        Ok(())
    }
}

// ==================== Helpers ====================

fn edge_step<S: GremlinSteps>(g: &mut S, direction: Direction, types: &[&str]) {
    match direction {
        Direction::Outgoing => g.out_e(types),
        Direction::Incoming => g.in_e(types),
        Direction::Both => g.both_e(types),
    };
}

fn vertex_step<S: GremlinSteps>(g: &mut S, direction: Direction) {
    match direction {
        Direction::Outgoing => g.in_v(),
        Direction::Incoming => g.out_v(),
        Direction::Both => g.other_v(),
    };
}

/// Property of the current element, or the null sentinel.
fn own_property<S: GremlinSteps>(s: &mut S, key: &str) {
    let mut present = s.start();
    present.values(&[key]);
    let mut absent = s.start();
    absent.constant(NULL_SENTINEL);
    s.coalesce(&[&present, &absent]);
}

fn project_relationship<S: GremlinSteps>(s: &mut S) -> Result<()> {
    let mut element = s.start();
    element.value_map_tokens(true);
    let mut in_v = s.start();
    in_v.in_v().id();
    let mut out_v = s.start();
    out_v.out_v().id();
    s.project(&[ELEMENT_KEY, IN_V_KEY, OUT_V_KEY])?
        .by(&element)
        .by(&in_v)
        .by(&out_v);
    Ok(())
}

fn write_constant<S: GremlinSteps>(
    g: &mut S,
    cardinality: Option<Cardinality>,
    key: &str,
    value: Value,
) {
    match cardinality {
        Some(cardinality) => g.property_cardinality(cardinality, key, value),
        None => g.property(key, value),
    };
}

fn write_traversal<S: GremlinSteps>(
    g: &mut S,
    cardinality: Option<Cardinality>,
    key: &str,
    value: &S,
) {
    match cardinality {
        Some(cardinality) => g.property_cardinality_traversal(cardinality, key, value),
        None => g.property_traversal(key, value),
    };
}

fn cypher_value(value: &Value) -> Value {
    if value.is_null() {
        Value::null_sentinel()
    } else {
        value.clone()
    }
}

/// `ORDER BY alias` sorts by the aliased expression.
fn resolve_alias<'a>(ret: &'a ReturnClause, expression: &'a Expression) -> &'a Expression {
    if let Expression::Variable(name) = expression {
        if let Some(item) = ret.items.iter().find(|i| i.alias.as_deref() == Some(name.as_str())) {
            return &item.expression;
        }
    }
    expression
}

fn sort_order(item: &SortItem) -> Order {
    if item.descending {
        Order::Desc
    } else {
        Order::Asc
    }
}

fn arithmetic(op: BinaryOperator) -> Option<CustomFunction> {
    match op {
        BinaryOperator::Add => Some(CustomFunction::Plus),
        BinaryOperator::Sub => Some(CustomFunction::Minus),
        BinaryOperator::Mul => Some(CustomFunction::Multiply),
        BinaryOperator::Div => Some(CustomFunction::Divide),
        BinaryOperator::Mod => Some(CustomFunction::Modulo),
        _ => None,
    }
}

fn connective(op: BinaryOperator) -> Option<CustomFunction> {
    match op {
        BinaryOperator::And => Some(CustomFunction::And),
        BinaryOperator::Or => Some(CustomFunction::Or),
        BinaryOperator::Xor => Some(CustomFunction::Xor),
        _ => None,
    }
}

/// Functions that evaluate a binary operator to a value, nulls included.
fn binary_function(op: BinaryOperator) -> Option<CustomFunction> {
    arithmetic(op).or_else(|| comparison(op)).or_else(|| connective(op))
}

fn boolean<S: GremlinSteps>(g: &S, value: bool) -> S {
    let mut s = g.start();
    s.constant(value);
    s
}

fn comparison(op: BinaryOperator) -> Option<CustomFunction> {
    match op {
        BinaryOperator::Eq => Some(CustomFunction::Equals),
        BinaryOperator::Ne => Some(CustomFunction::NotEquals),
        BinaryOperator::Lt => Some(CustomFunction::Less),
        BinaryOperator::Le => Some(CustomFunction::LessOrEqual),
        BinaryOperator::Gt => Some(CustomFunction::Greater),
        BinaryOperator::Ge => Some(CustomFunction::GreaterOrEqual),
        _ => None,
    }
}

fn compare_predicate(op: BinaryOperator, value: Value) -> P {
    match op {
        BinaryOperator::Ne => P::neq(value),
        BinaryOperator::Lt => P::lt(value),
        BinaryOperator::Le => P::lte(value),
        BinaryOperator::Gt => P::gt(value),
        BinaryOperator::Ge => P::gte(value),
        _ => P::eq(value),
    }
}

/// `c < x` is `x > c`.
fn flip(op: BinaryOperator) -> BinaryOperator {
    match op {
        BinaryOperator::Lt => BinaryOperator::Gt,
        BinaryOperator::Le => BinaryOperator::Ge,
        BinaryOperator::Gt => BinaryOperator::Lt,
        BinaryOperator::Ge => BinaryOperator::Le,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::cypher::ast::CypherAst;
    use crate::graph::Graph;
    use crate::translation::BytecodeSteps;
    use crate::traversal::{GraphTraversalSource, TraversalSteps};
    use crate::types::Parameters;
    use std::sync::Arc;

    fn parse(text: &str) -> Query {
        CypherAst::parse(text, &Parameters::new())
            .unwrap()
            .query()
            .clone()
    }

    fn render(text: &str) -> String {
        let mut g = BytecodeSteps::new();
        walk(&parse(text), &mut g).unwrap();
        g.to_string()
    }

    fn render_err(text: &str) -> Error {
        let mut g = BytecodeSteps::new();
        walk(&parse(text), &mut g).unwrap_err()
    }

    fn modern() -> (Arc<Graph>, GraphTraversalSource) {
        let graph = Graph::in_memory();
        let alice = graph.add_vertex_with("person", vec![("name", "Alice".into()), ("age", 29.into())]);
        let bob = graph.add_vertex_with("person", vec![("name", "Bob".into()), ("age", 27.into())]);
        let carol = graph.add_vertex_with("person", vec![("name", "Carol".into()), ("age", 35.into())]);
        let lop = graph.add_vertex_with("software", vec![("name", "lop".into())]);
        graph.add_edge("knows", alice, bob).unwrap();
        graph.add_edge("knows", bob, carol).unwrap();
        graph.add_edge("created", alice, lop).unwrap();
        let source = GraphTraversalSource::new(graph.clone(), EngineConfig::default());
        (graph, source)
    }

    fn run(source: &GraphTraversalSource, text: &str) -> Vec<Value> {
        let mut steps = TraversalSteps::new(source.traversal());
        walk(&parse(text), &mut steps).unwrap();
        steps.traversal().to_list().unwrap()
    }

    fn row(entries: Vec<(&str, Value)>) -> Value {
        Value::map_from(entries)
    }

    #[test]
    fn test_property_return() {
        assert_eq!(
            render("MATCH (n) RETURN n.name"),
            "[V(), as(n), project(n.name), by([select(n), coalesce([values(name)], [constant(  cypher.null)])])]"
        );
    }

    #[test]
    fn test_node_constraints() {
        let text = render("MATCH (n:person {name: 'Alice'}) RETURN n");
        assert!(text.starts_with("[V(), hasLabel(person), has(name, eq(Alice)), as(n), project(n)"));
        assert!(text.ends_with("by([select(n), valueMap(true)])]"));
    }

    #[test]
    fn test_variable_length_rendering() {
        let text = render("MATCH (a)-[:knows*1..2]->(b) RETURN b");
        assert!(text.contains(
            "repeat([outE(knows), inV(), simplePath()]), emit([loops(), is(gte(1))]), times(2), as(b)"
        ));

        let text = render("MATCH (a)-[*0..]->(b) RETURN b");
        assert!(text.contains("as(a), emit(), repeat([outE(), inV(), simplePath()]), as(b)"));
    }

    #[test]
    fn test_create_rendering() {
        assert_eq!(
            render("CREATE (a:person {name: 'Dan'})-[:knows]->(b:person)"),
            "[addV(person), property(single, name, Dan), as(a), addV(person), as(b), \
             addE(knows), from(a), to(b), barrier(), limit(0)]"
        );
    }

    #[test]
    fn test_translation_errors() {
        assert!(matches!(
            render_err("MATCH (n) RETURN n.name, n.name"),
            Error::TranslationError(_)
        ));
        assert!(matches!(render_err("MATCH (n) RETURN m"), Error::TranslationError(_)));
        assert!(matches!(
            render_err("MATCH (n) RETURN foo(n)"),
            Error::TranslationError(_)
        ));
        assert!(matches!(
            render_err("CREATE (a)-[:x|y]->(b)"),
            Error::TranslationError(_)
        ));
        assert!(matches!(
            render_err("CREATE (a)-[:x]-(b)"),
            Error::TranslationError(_)
        ));
        assert!(matches!(
            render_err("MATCH (a)-[r]->(b)-[r]->(c) RETURN a"),
            Error::TranslationError(_)
        ));
        assert!(matches!(
            render_err("MATCH (n) WHERE n.name IN n.tags RETURN n"),
            Error::TranslationError(_)
        ));
    }

    #[test]
    fn test_where_and_order() {
        let (_, source) = modern();
        let rows = run(
            &source,
            "MATCH (n:person) WHERE n.age > 28 RETURN n.name AS name ORDER BY name DESC",
        );
        assert_eq!(
            rows,
            vec![
                row(vec![("name", Value::from("Carol"))]),
                row(vec![("name", Value::from("Alice"))]),
            ]
        );

        let rows = run(&source, "MATCH (n) WHERE 30 > n.age AND NOT n.name = 'Bob' RETURN n.name");
        assert_eq!(rows, vec![row(vec![("n.name", Value::from("Alice"))])]);
    }

    #[test]
    fn test_missing_property_is_null() {
        let (_, source) = modern();
        let rows = run(&source, "MATCH (n:software) RETURN n.age, n.age IS NULL AS missing");
        assert_eq!(
            rows,
            vec![row(vec![
                ("n.age", Value::null_sentinel()),
                ("missing", Value::Bool(true)),
            ])]
        );
    }

    fn names(rows: &[Value], column: &str) -> Vec<Value> {
        rows.iter()
            .map(|r| r.as_map().unwrap()[&Value::from(column)].clone())
            .collect()
    }

    #[test]
    fn test_negation_drops_unknown_rows() {
        let (_, source) = modern();
        let rows = run(&source, "MATCH (n) WHERE NOT n.age = 29 RETURN n.name ORDER BY n.name");
        assert_eq!(names(&rows, "n.name"), vec![Value::from("Bob"), Value::from("Carol")]);

        let rows = run(&source, "MATCH (n) WHERE NOT (n.age > 100) RETURN n.name ORDER BY n.name");
        assert_eq!(
            names(&rows, "n.name"),
            vec![Value::from("Alice"), Value::from("Bob"), Value::from("Carol")]
        );

        let rows = run(&source, "MATCH (n) WHERE NOT n.age IS NULL RETURN count(*) AS c");
        assert_eq!(rows, vec![row(vec![("c", Value::Int(3))])]);
    }

    #[test]
    fn test_xor_filter() {
        let (_, source) = modern();
        // Alice: true XOR true, Bob: true XOR false, Carol: false XOR false, lop: null
        let rows = run(
            &source,
            "MATCH (n) WHERE n.age < 30 XOR n.name STARTS WITH 'A' RETURN n.name",
        );
        assert_eq!(names(&rows, "n.name"), vec![Value::from("Bob")]);

        let rows = run(
            &source,
            "MATCH (n) WHERE n.age > 100 XOR n.name = 'lop' RETURN n.name",
        );
        assert!(rows.is_empty());
    }

    #[test]
    fn test_boolean_columns_keep_null() {
        let (_, source) = modern();
        let rows = run(
            &source,
            "MATCH (n:software) RETURN n.age > 1 AS gt, NOT n.age = 1 AS ne, \
             n.age > 1 OR true AS any, n.age > 1 AND false AS all, n.age IN [1] AS member, \
             n.age IS NULL AS missing",
        );
        assert_eq!(
            rows,
            vec![row(vec![
                ("gt", Value::null_sentinel()),
                ("ne", Value::null_sentinel()),
                ("any", Value::Bool(true)),
                ("all", Value::Bool(false)),
                ("member", Value::null_sentinel()),
                ("missing", Value::Bool(true)),
            ])]
        );

        let rows = run(
            &source,
            "MATCH (n {name: 'Bob'}) RETURN n.age > 1 AS gt, n.age IN [27] AS member, \
             n.name STARTS WITH 'C' AS initial, n.age < 30 XOR true AS flipped",
        );
        assert_eq!(
            rows,
            vec![row(vec![
                ("gt", Value::Bool(true)),
                ("member", Value::Bool(true)),
                ("initial", Value::Bool(false)),
                ("flipped", Value::Bool(false)),
            ])]
        );
    }

    #[test]
    fn test_backends_render_alike() {
        let (_, source) = modern();
        for text in [
            "MATCH (a)-[:knows*1..3]->(b) WHERE NOT b.age = 27 RETURN a.name, b.name",
            "MATCH (a {name: 'Alice'})-[:knows*0..2]->(b) RETURN b.name",
            "CREATE (a:person {name: 'Dan'})-[:knows]->(b:person {name: 'Eve'}) RETURN a, b",
            "MATCH (n:person) SET n.age = n.age + 1, n.seen = true",
            "MATCH (a)-[r:knows]->(b) DELETE r, b",
            "MATCH (n) RETURN labels(n) AS l, count(n) AS c, avg(n.age) AS mean ORDER BY c DESC",
            "MATCH (n) RETURN DISTINCT n.age > 28 XOR n.name IN ['Bob'] AS x SKIP 1 LIMIT 2",
        ] {
            let query = parse(text);
            let mut emitted = BytecodeSteps::new();
            walk(&query, &mut emitted).unwrap();
            let mut live = TraversalSteps::new(source.traversal());
            walk(&query, &mut live).unwrap();
            assert_eq!(live.to_string(), emitted.to_string(), "{}", text);
        }
    }

    #[test]
    fn test_relationship_match() {
        let (_, source) = modern();
        let rows = run(
            &source,
            "MATCH (a)-[:knows]->(b)-[:knows]->(c) RETURN a.name, c.name",
        );
        assert_eq!(
            rows,
            vec![row(vec![
                ("a.name", Value::from("Alice")),
                ("c.name", Value::from("Carol")),
            ])]
        );

        let rows = run(
            &source,
            "MATCH (a {name: 'Alice'})-[:knows*]->(b) RETURN b.name ORDER BY b.name",
        );
        assert_eq!(
            rows,
            vec![
                row(vec![("b.name", Value::from("Bob"))]),
                row(vec![("b.name", Value::from("Carol"))]),
            ]
        );

        let rows = run(
            &source,
            "MATCH (a {name: 'Alice'})-[:knows*0..1]->(b) RETURN b.name ORDER BY b.name",
        );
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_aggregation() {
        let (_, source) = modern();
        let rows = run(&source, "MATCH (n) RETURN count(*) AS total, sum(n.age) AS ages");
        assert_eq!(
            rows,
            vec![row(vec![("total", Value::Int(4)), ("ages", Value::Int(91))])]
        );

        let rows = run(
            &source,
            "MATCH (n) RETURN labels(n) AS l, count(n) AS c ORDER BY c DESC",
        );
        assert_eq!(
            rows,
            vec![
                row(vec![
                    ("l", Value::List(vec![Value::from("person")])),
                    ("c", Value::Int(3)),
                ]),
                row(vec![
                    ("l", Value::List(vec![Value::from("software")])),
                    ("c", Value::Int(1)),
                ]),
            ]
        );

        let rows = run(&source, "MATCH (n:software) RETURN max(n.age) AS oldest");
        assert_eq!(rows, vec![row(vec![("oldest", Value::null_sentinel())])]);
    }

    #[test]
    fn test_arithmetic_and_functions() {
        let (_, source) = modern();
        let rows = run(
            &source,
            "MATCH (n {name: 'Bob'}) RETURN n.age + 1 AS next, toString(n.age) AS text, size(n.name) AS len",
        );
        assert_eq!(
            rows,
            vec![row(vec![
                ("next", Value::Int(28)),
                ("text", Value::from("27")),
                ("len", Value::Int(3)),
            ])]
        );

        let rows = run(&source, "RETURN 1 + 2 AS three, [1, 2] AS pair");
        assert_eq!(
            rows,
            vec![row(vec![
                ("three", Value::Int(3)),
                ("pair", Value::List(vec![Value::Int(1), Value::Int(2)])),
            ])]
        );
    }

    #[test]
    fn test_create_set_delete() {
        let (graph, source) = modern();
        assert!(run(&source, "CREATE (d:person {name: 'Dan', age: 40})").is_empty());
        assert_eq!(graph.vertex_count(), 5);

        let rows = run(
            &source,
            "MATCH (a {name: 'Alice'}), (d {name: 'Dan'}) CREATE (a)-[r:knows {since: 2020}]->(d) RETURN r.since",
        );
        assert_eq!(rows, vec![row(vec![("r.since", Value::Int(2020))])]);
        assert_eq!(graph.edge_count(), 4);

        run(&source, "MATCH (d {name: 'Dan'}) SET d.age = d.age + 1");
        let rows = run(&source, "MATCH (d {name: 'Dan'}) RETURN d.age");
        assert_eq!(rows, vec![row(vec![("d.age", Value::Int(41))])]);

        run(&source, "MATCH (d {name: 'Dan'}) SET d.age = null");
        let rows = run(&source, "MATCH (d {name: 'Dan'}) RETURN d.age");
        assert_eq!(rows, vec![row(vec![("d.age", Value::null_sentinel())])]);

        run(&source, "MATCH (d {name: 'Dan'}) DETACH DELETE d");
        assert_eq!(graph.vertex_count(), 4);
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_distinct_with_skip_limit() {
        let (_, source) = modern();
        let rows = run(
            &source,
            "MATCH (n) RETURN DISTINCT labels(n) AS l ORDER BY l SKIP 1 LIMIT 1",
        );
        assert_eq!(
            rows,
            vec![row(vec![("l", Value::List(vec![Value::from("software")]))])]
        );
    }
}
