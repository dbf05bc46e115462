//! Step nodes and programs
//!
//! A [`Program`] is the backend-independent form of a traversal: an ordered
//! list of [`Step`]s whose arguments may themselves be programs. Its
//! `Display` output is the canonical rendering shared by every backend.

use super::function::CustomFunction;
use super::predicate::P;
use super::token::{Cardinality, Column, Order, Pop, Scope, T};
use crate::error::Result;
use crate::types::Value;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Step kinds, one per Gremlin step symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    V,
    E,
    AddV,
    AddE,
    Aggregate,
    And,
    As,
    Barrier,
    BothE,
    By,
    Cap,
    Choose,
    Coalesce,
    Constant,
    Count,
    Dedup,
    Drop,
    Emit,
    FlatMap,
    Fold,
    From,
    Group,
    Has,
    HasKey,
    HasLabel,
    HasNot,
    Id,
    Identity,
    InE,
    InV,
    Index,
    Inject,
    Is,
    Key,
    Label,
    Limit,
    Local,
    Loops,
    Map,
    Math,
    Max,
    Mean,
    Min,
    Not,
    Option,
    Optional,
    Or,
    Order,
    OtherV,
    OutE,
    OutV,
    Path,
    Project,
    Properties,
    Property,
    Range,
    Repeat,
    Select,
    SideEffect,
    SimplePath,
    Skip,
    Sum,
    Tail,
    Times,
    To,
    Unfold,
    Union,
    Until,
    Value,
    ValueMap,
    Values,
    Where,
    With,
}

impl StepKind {
    /// Gremlin step symbol.
    pub fn name(&self) -> &'static str {
        match self {
            StepKind::V => "V",
            StepKind::E => "E",
            StepKind::AddV => "addV",
            StepKind::AddE => "addE",
            StepKind::Aggregate => "aggregate",
            StepKind::And => "and",
            StepKind::As => "as",
            StepKind::Barrier => "barrier",
            StepKind::BothE => "bothE",
            StepKind::By => "by",
            StepKind::Cap => "cap",
            StepKind::Choose => "choose",
            StepKind::Coalesce => "coalesce",
            StepKind::Constant => "constant",
            StepKind::Count => "count",
            StepKind::Dedup => "dedup",
            StepKind::Drop => "drop",
            StepKind::Emit => "emit",
            StepKind::FlatMap => "flatMap",
            StepKind::Fold => "fold",
            StepKind::From => "from",
            StepKind::Group => "group",
            StepKind::Has => "has",
            StepKind::HasKey => "hasKey",
            StepKind::HasLabel => "hasLabel",
            StepKind::HasNot => "hasNot",
            StepKind::Id => "id",
            StepKind::Identity => "identity",
            StepKind::InE => "inE",
            StepKind::InV => "inV",
            StepKind::Index => "index",
            StepKind::Inject => "inject",
            StepKind::Is => "is",
            StepKind::Key => "key",
            StepKind::Label => "label",
            StepKind::Limit => "limit",
            StepKind::Local => "local",
            StepKind::Loops => "loops",
            StepKind::Map => "map",
            StepKind::Math => "math",
            StepKind::Max => "max",
            StepKind::Mean => "mean",
            StepKind::Min => "min",
            StepKind::Not => "not",
            StepKind::Option => "option",
            StepKind::Optional => "optional",
            StepKind::Or => "or",
            StepKind::Order => "order",
            StepKind::OtherV => "otherV",
            StepKind::OutE => "outE",
            StepKind::OutV => "outV",
            StepKind::Path => "path",
            StepKind::Project => "project",
            StepKind::Properties => "properties",
            StepKind::Property => "property",
            StepKind::Range => "range",
            StepKind::Repeat => "repeat",
            StepKind::Select => "select",
            StepKind::SideEffect => "sideEffect",
            StepKind::SimplePath => "simplePath",
            StepKind::Skip => "skip",
            StepKind::Sum => "sum",
            StepKind::Tail => "tail",
            StepKind::Times => "times",
            StepKind::To => "to",
            StepKind::Unfold => "unfold",
            StepKind::Union => "union",
            StepKind::Until => "until",
            StepKind::Value => "value",
            StepKind::ValueMap => "valueMap",
            StepKind::Values => "values",
            StepKind::Where => "where",
            StepKind::With => "with",
        }
    }

    /// Modulators configure a neighbouring step instead of processing traversers.
    pub fn is_modulator(&self) -> bool {
        matches!(
            self,
            StepKind::By
                | StepKind::From
                | StepKind::To
                | StepKind::Option
                | StepKind::Times
                | StepKind::Until
                | StepKind::Emit
                | StepKind::With
        )
    }

    /// Loop modulators may also be declared before the `repeat` they configure.
    pub fn is_loop_modulator(&self) -> bool {
        matches!(self, StepKind::Times | StepKind::Until | StepKind::Emit)
    }
}

/// Step argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Argument {
    Literal(Value),
    Predicate(P),
    Program(Program),
    Label(String),
    Scope(Scope),
    Order(Order),
    Pop(Pop),
    Column(Column),
    Cardinality(Cardinality),
    Token(T),
    Function(CustomFunction),
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Literal(v) => write!(f, "{}", v),
            Argument::Predicate(p) => write!(f, "{}", p),
            Argument::Program(p) => write!(f, "{}", p),
            Argument::Label(l) => f.write_str(l),
            Argument::Scope(s) => write!(f, "{}", s),
            Argument::Order(o) => write!(f, "{}", o),
            Argument::Pop(p) => write!(f, "{}", p),
            Argument::Column(c) => write!(f, "{}", c),
            Argument::Cardinality(c) => write!(f, "{}", c),
            Argument::Token(t) => write!(f, "{}", t),
            Argument::Function(func) => write!(f, "{}", func),
        }
    }
}

/// One step of a program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub kind: StepKind,
    pub args: SmallVec<[Argument; 2]>,
}

impl Step {
    pub fn new(kind: StepKind) -> Self {
        Self {
            kind,
            args: SmallVec::new(),
        }
    }

    pub fn with_args<I: IntoIterator<Item = Argument>>(kind: StepKind, args: I) -> Self {
        Self {
            kind,
            args: args.into_iter().collect(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Sub-programs among the arguments, in argument order.
    pub fn programs(&self) -> impl Iterator<Item = &Program> {
        self.args.iter().filter_map(|arg| match arg {
            Argument::Program(p) => Some(p),
            _ => None,
        })
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.kind.name())?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}

/// Ordered list of steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    steps: Vec<Step>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the program starts at the graph (`V`, `E` or `addV` first).
    pub fn is_rooted(&self) -> bool {
        matches!(
            self.steps.first().map(|s| s.kind),
            Some(StepKind::V | StepKind::E | StepKind::AddV)
        )
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", step)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Program {
        let mut nested = Program::new();
        nested.add_step(Step::with_args(
            StepKind::Select,
            [Argument::Label("n".to_string())],
        ));
        nested.add_step(Step::with_args(
            StepKind::Values,
            [Argument::Label("name".to_string())],
        ));

        let mut program = Program::new();
        program.add_step(Step::new(StepKind::V));
        program.add_step(Step::with_args(StepKind::As, [Argument::Label("n".to_string())]));
        program.add_step(Step::with_args(
            StepKind::Has,
            [
                Argument::Label("age".to_string()),
                Argument::Predicate(P::gt(30)),
            ],
        ));
        program.add_step(Step::with_args(
            StepKind::By,
            [Argument::Program(nested), Argument::Order(Order::Desc)],
        ));
        program
    }

    #[test]
    fn test_canonical_rendering() {
        assert_eq!(
            sample().to_string(),
            "[V(), as(n), has(age, gt(30)), by([select(n), values(name)], desc)]"
        );
    }

    #[test]
    fn test_rooted() {
        assert!(sample().is_rooted());
        let mut floating = Program::new();
        floating.add_step(Step::new(StepKind::Identity));
        assert!(!floating.is_rooted());
        assert!(!Program::new().is_rooted());
    }

    #[test]
    fn test_portable_forms() {
        let program = sample();
        let json = program.to_json().unwrap();
        assert_eq!(Program::from_json(&json).unwrap(), program);
        let bytes = program.to_bytes().unwrap();
        assert_eq!(Program::from_bytes(&bytes).unwrap(), program);
    }

    #[test]
    fn test_literal_rendering() {
        let step = Step::with_args(
            StepKind::Constant,
            [Argument::Literal(Value::List(vec![
                Value::from("a"),
                Value::Null,
                Value::Int(1),
            ]))],
        );
        assert_eq!(step.to_string(), "constant([a, null, 1])");
    }
}
