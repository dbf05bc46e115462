//! Emitting backend
//!
//! Records every call into a [`Program`] without touching a graph.

use super::step::{Argument, Program, Step, StepKind};
use super::steps::{GremlinSteps, StepArg};
use crate::error::{Error, Result};
use std::fmt;

#[derive(Debug, Clone)]
pub struct BytecodeSteps {
    program: Program,
    /// Rooted builders start at the graph; floating ones are sub-programs.
    rooted: bool,
}

impl BytecodeSteps {
    /// Builder for a top-level program.
    pub fn new() -> Self {
        Self {
            program: Program::new(),
            rooted: true,
        }
    }

    /// Builder for an anonymous sub-program.
    pub fn anonymous() -> Self {
        Self {
            program: Program::new(),
            rooted: false,
        }
    }

    pub fn is_rooted(&self) -> bool {
        self.rooted
    }

    fn is_started_or_sub_program(&self) -> bool {
        !self.program.is_empty() || !self.rooted
    }
}

impl Default for BytecodeSteps {
    fn default() -> Self {
        Self::new()
    }
}

impl GremlinSteps for BytecodeSteps {
    type Output = Program;

    fn start(&self) -> Self {
        Self::anonymous()
    }

    fn current(&self) -> Program {
        self.program.clone()
    }

    fn append<'a>(&mut self, kind: StepKind, args: Vec<StepArg<'a, Self>>) -> &mut Self {
        let args = args.into_iter().map(|arg| match arg {
            StepArg::Value(value) => value,
            StepArg::Sub(sub) => Argument::Program(sub.current()),
        });
        self.program.add_step(Step::with_args(kind, args));
        self
    }

    fn v(&mut self) -> &mut Self {
        self.program.add_step(Step::new(StepKind::V));
        self
    }

    fn e(&mut self) -> Result<&mut Self> {
        if self.is_started_or_sub_program() {
            return Err(Error::IllegalState(
                "Edge graph step can only be at the start of traversal".to_string(),
            ));
        }
        self.program.add_step(Step::new(StepKind::E));
        Ok(self)
    }

    fn add_v(&mut self) -> &mut Self {
        self.program.add_step(Step::new(StepKind::AddV));
        self
    }

    fn add_v_label(&mut self, label: &str) -> &mut Self {
        self.program.add_step(Step::with_args(
            StepKind::AddV,
            [Argument::Label(label.to_string())],
        ));
        self
    }
}

impl fmt::Display for BytecodeSteps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::predicate::P;
    use crate::translation::token::{Cardinality, Order, Scope};
    use crate::types::Value;

    #[test]
    fn test_chain_rendering() {
        let mut g = BytecodeSteps::new();
        let name = {
            let mut sub = g.start();
            sub.select(&["n"]).unwrap().values(&["name"]);
            sub
        };
        g.v().as_("n").project(&["n.name"]).unwrap().by(&name);
        assert_eq!(
            g.to_string(),
            "[V(), as(n), project(n.name), by([select(n), values(name)])]"
        );
    }

    #[test]
    fn test_snapshot_independence() {
        let mut g = BytecodeSteps::new();
        g.v().has_label(&["person"]);
        let snapshot = g.current();
        g.limit(1);
        assert_eq!(snapshot.to_string(), "[V(), hasLabel(person)]");
        assert_eq!(g.to_string(), "[V(), hasLabel(person), limit(1)]");
    }

    #[test]
    fn test_child_mutation_after_composition() {
        let mut g = BytecodeSteps::new();
        let mut child = g.start();
        child.out_e(&["knows"]);
        g.v().where_(&child);
        child.in_v();
        assert_eq!(g.to_string(), "[V(), where([outE(knows)])]");
    }

    #[test]
    fn test_edge_start_invariant() {
        let mut g = BytecodeSteps::new();
        assert!(g.e().is_ok());
        assert!(matches!(g.e(), Err(Error::IllegalState(_))));

        let mut anonymous = BytecodeSteps::new().start();
        let err = anonymous.e().unwrap_err();
        assert_eq!(
            err.to_string(),
            "非法状态: Edge graph step can only be at the start of traversal"
        );
    }

    #[test]
    fn test_arity_checks() {
        let mut g = BytecodeSteps::new();
        assert!(matches!(g.project(&[]), Err(Error::IllegalArgument(_))));
        assert!(matches!(g.select(&[]), Err(Error::IllegalArgument(_))));
        assert!(g.current().is_empty());

        g.project(&["b", "a", "c"]).unwrap();
        assert_eq!(g.to_string(), "[project(b, a, c)]");
    }

    #[test]
    fn test_empty_label_filters_are_noops() {
        let mut g = BytecodeSteps::new();
        g.v().has_label(&[]).has_key(&[]);
        assert_eq!(g.to_string(), "[V()]");
    }

    #[test]
    fn test_argument_forms() {
        let mut g = BytecodeSteps::new();
        let anon = g.start();
        let mut loops = g.start();
        loops.loops().is(P::gte(1));
        g.add_v_label("person")
            .property_cardinality(Cardinality::Single, "age", 42)
            .range(Scope::Local, 0, 2)
            .by_order(&anon, Order::Asc)
            .emit_when(&loops)
            .times(3)
            .inject(&[Value::from("x"), Value::Null]);
        assert_eq!(
            g.to_string(),
            "[addV(person), property(single, age, 42), range(local, 0, 2), by([], asc), \
             emit([loops(), is(gte(1))]), times(3), inject(x, null)]"
        );
    }
}
