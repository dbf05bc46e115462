//! Live traversals
//!
//! A [`Traversal`] keeps its bytecode [`Program`] next to the executable
//! steps compiled from it. Modulators (`by`, `from`, `times`, ...) are
//! attached to the step they configure as they are added.

use super::exec::{self, ExecContext};
use super::source::GraphTraversalSource;
use crate::error::{Error, Result};
use crate::translation::{Argument, Program, Step, StepKind};
use crate::types::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Vertex,
    Edge,
}

/// Executable step.
#[derive(Debug, Clone)]
pub enum ExecStep {
    /// Graph-scan start step (`g.V()` / `g.E()`).
    GraphStart(ElementKind),
    /// Vertex-creating start step (`g.addV()`).
    AddVertexStart(Option<String>),
    Step(StepExec),
}

#[derive(Debug, Clone)]
pub struct StepExec {
    pub step: Step,
    /// Compiled sub-programs, in argument order.
    pub children: Vec<Traversal>,
    pub modulators: Vec<Modulator>,
}

#[derive(Debug, Clone)]
pub struct Modulator {
    pub step: Step,
    pub children: Vec<Traversal>,
    /// Declared before its `repeat()`: checked before each iteration.
    pub before: bool,
}

impl StepExec {
    pub fn modulators(&self, kind: StepKind) -> impl Iterator<Item = &Modulator> {
        self.modulators.iter().filter(move |m| m.step.kind == kind)
    }

    pub fn child(&self, index: usize) -> Result<&Traversal> {
        self.children.get(index).ok_or_else(|| {
            Error::ExecutionError(format!(
                "{}() is missing traversal argument {}",
                self.step.name(),
                index
            ))
        })
    }
}

#[derive(Debug, Clone)]
pub struct Traversal {
    source: Option<GraphTraversalSource>,
    bytecode: Program,
    steps: Vec<ExecStep>,
    /// Loop modulators waiting for the next `repeat()`.
    pending: Vec<Modulator>,
}

impl Traversal {
    /// Anonymous traversal, not bound to any graph.
    pub fn anonymous() -> Self {
        Self {
            source: None,
            bytecode: Program::new(),
            steps: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub(crate) fn bound(source: GraphTraversalSource) -> Self {
        Self {
            source: Some(source),
            ..Self::anonymous()
        }
    }

    /// Compile a program into an executable traversal.
    ///
    /// The first step roots the traversal at the graph only when a source is
    /// given; nested programs always compile to anonymous traversals.
    pub fn from_program(source: Option<GraphTraversalSource>, program: &Program) -> Result<Self> {
        let mut traversal = match source {
            Some(source) => Traversal::bound(source),
            None => Traversal::anonymous(),
        };
        for step in program.steps() {
            let rooting = traversal.is_empty() && !traversal.is_anonymous();
            match step.kind {
                StepKind::V if rooting => {
                    traversal.bytecode.add_step(step.clone());
                    traversal.admin_add_step(ExecStep::GraphStart(ElementKind::Vertex));
                }
                StepKind::E if rooting => {
                    traversal.bytecode.add_step(step.clone());
                    traversal.admin_add_step(ExecStep::GraphStart(ElementKind::Edge));
                }
                StepKind::E => {
                    return Err(Error::IllegalState(
                        "Edge graph step can only be at the start of traversal".to_string(),
                    ))
                }
                StepKind::AddV if rooting => {
                    let label = match step.args.first() {
                        Some(Argument::Label(l)) => Some(l.clone()),
                        Some(Argument::Literal(Value::String(l))) => Some(l.clone()),
                        _ => None,
                    };
                    traversal.bytecode.add_step(step.clone());
                    traversal.admin_add_step(ExecStep::AddVertexStart(label));
                }
                _ => {
                    let children = step
                        .programs()
                        .map(|p| Traversal::from_program(None, p))
                        .collect::<Result<Vec<_>>>()?;
                    traversal.add(step.clone(), children);
                }
            }
        }
        Ok(traversal)
    }

    pub fn source(&self) -> Option<&GraphTraversalSource> {
        self.source.as_ref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.source.is_none()
    }

    /// No executable steps yet.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty() && self.pending.is_empty()
    }

    pub fn bytecode(&self) -> &Program {
        &self.bytecode
    }

    pub fn bytecode_mut(&mut self) -> &mut Program {
        &mut self.bytecode
    }

    pub(crate) fn exec_steps(&self) -> &[ExecStep] {
        &self.steps
    }

    pub(crate) fn pending(&self) -> &[Modulator] {
        &self.pending
    }

    /// Append an executable step without touching the bytecode.
    pub fn admin_add_step(&mut self, step: ExecStep) {
        self.steps.push(step);
    }

    /// Mid-traversal `V()`: every vertex, once per incoming traverser.
    pub fn v(&mut self) -> &mut Self {
        self.add(Step::new(StepKind::V), vec![])
    }

    /// Mid-traversal `addV()`: one new vertex per incoming traverser.
    pub fn add_v(&mut self, label: Option<&str>) -> &mut Self {
        let args = label.map(|l| Argument::Label(l.to_string()));
        self.add(Step::with_args(StepKind::AddV, args), vec![])
    }

    /// Append a step with its compiled sub-traversals.
    pub fn add(&mut self, step: Step, children: Vec<Traversal>) -> &mut Self {
        self.bytecode.add_step(step.clone());

        if step.kind.is_modulator() {
            let loop_modulator = step.kind.is_loop_modulator();
            match self.steps.last_mut() {
                Some(ExecStep::Step(owner))
                    if !loop_modulator || owner.step.kind == StepKind::Repeat =>
                {
                    owner.modulators.push(Modulator {
                        step,
                        children,
                        before: false,
                    });
                }
                _ if loop_modulator => self.pending.push(Modulator {
                    step,
                    children,
                    before: true,
                }),
                _ => self.steps.push(ExecStep::Step(StepExec {
                    step,
                    children,
                    modulators: Vec::new(),
                })),
            }
            return self;
        }

        let mut modulators = Vec::new();
        if step.kind == StepKind::Repeat {
            modulators.append(&mut self.pending);
        }
        self.steps.push(ExecStep::Step(StepExec {
            step,
            children,
            modulators,
        }));
        self
    }

    /// Execute and collect every result.
    pub fn to_list(&self) -> Result<Vec<Value>> {
        let source = self.source.as_ref().ok_or_else(|| {
            Error::ExecutionError("anonymous traversal cannot be executed without a graph".to_string())
        })?;
        let mut ctx = ExecContext::new(source);
        let traversers = exec::execute(self, &mut ctx, Vec::new())?;
        Ok(traversers.into_iter().map(|t| t.into_object()).collect())
    }
}

impl fmt::Display for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bytecode)
    }
}
