//! Live backend
//!
//! Builds directly onto a [`Traversal`] bound to a graph, so the translated
//! query can be executed as soon as the visitor returns.

use super::traversal::{ElementKind, ExecStep, Traversal};
use crate::error::{Error, Result};
use crate::translation::{Argument, GremlinSteps, Step, StepArg, StepKind};
use std::fmt;

#[derive(Debug, Clone)]
pub struct TraversalSteps {
    traversal: Traversal,
}

impl TraversalSteps {
    pub fn new(traversal: Traversal) -> Self {
        Self { traversal }
    }

    pub fn traversal(&self) -> &Traversal {
        &self.traversal
    }

    pub fn into_traversal(self) -> Traversal {
        self.traversal
    }

    /// Start steps root the traversal only on a fresh, graph-bound traversal.
    fn is_rooting(&self) -> bool {
        self.traversal.is_empty() && !self.traversal.is_anonymous()
    }
}

impl GremlinSteps for TraversalSteps {
    type Output = Traversal;

    fn start(&self) -> Self {
        Self::new(Traversal::anonymous())
    }

    fn current(&self) -> Traversal {
        self.traversal.clone()
    }

    fn append<'a>(&mut self, kind: StepKind, args: Vec<StepArg<'a, Self>>) -> &mut Self {
        let mut children = Vec::new();
        let args: Vec<Argument> = args
            .into_iter()
            .map(|arg| match arg {
                StepArg::Value(value) => value,
                StepArg::Sub(sub) => {
                    let child = sub.current();
                    let program = child.bytecode().clone();
                    children.push(child);
                    Argument::Program(program)
                }
            })
            .collect();
        self.traversal.add(Step::with_args(kind, args), children);
        self
    }

    fn v(&mut self) -> &mut Self {
        if self.is_rooting() {
            self.traversal.bytecode_mut().add_step(Step::new(StepKind::V));
            self.traversal
                .admin_add_step(ExecStep::GraphStart(ElementKind::Vertex));
        } else {
            self.traversal.v();
        }
        self
    }

    fn e(&mut self) -> Result<&mut Self> {
        if !self.is_rooting() {
            return Err(Error::IllegalState(
                "Edge graph step can only be at the start of traversal".to_string(),
            ));
        }
        self.traversal.bytecode_mut().add_step(Step::new(StepKind::E));
        self.traversal
            .admin_add_step(ExecStep::GraphStart(ElementKind::Edge));
        Ok(self)
    }

    fn add_v(&mut self) -> &mut Self {
        if self.is_rooting() {
            self.traversal
                .bytecode_mut()
                .add_step(Step::new(StepKind::AddV));
            self.traversal.admin_add_step(ExecStep::AddVertexStart(None));
        } else {
            self.traversal.add_v(None);
        }
        self
    }

    fn add_v_label(&mut self, label: &str) -> &mut Self {
        if self.is_rooting() {
            self.traversal.bytecode_mut().add_step(Step::with_args(
                StepKind::AddV,
                [Argument::Label(label.to_string())],
            ));
            self.traversal
                .admin_add_step(ExecStep::AddVertexStart(Some(label.to_string())));
        } else {
            self.traversal.add_v(Some(label));
        }
        self
    }
}

impl fmt::Display for TraversalSteps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.traversal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::graph::Graph;
    use crate::translation::{
        Argument, BytecodeSteps, Cardinality, Column, Order, Pop, Program, Scope, Step, StepKind, P,
    };
    use crate::traversal::GraphTraversalSource;
    use crate::types::{Value, NULL_SENTINEL};
    use std::sync::Arc;

    /// alice -knows-> bob -knows-> carol, alice -created-> lop
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

    fn live(source: &GraphTraversalSource) -> TraversalSteps {
        TraversalSteps::new(source.traversal())
    }

    fn run(steps: &TraversalSteps) -> Vec<Value> {
        steps.traversal().to_list().unwrap()
    }

    fn strings(values: &[&str]) -> Vec<Value> {
        values.iter().map(|v| Value::from(*v)).collect()
    }

    #[test]
    fn test_renders_like_bytecode() {
        let (_, source) = modern();
        let mut live = live(&source);
        let mut emitted = BytecodeSteps::new();

        fn build<S: GremlinSteps>(g: &mut S) {
            let mut name = g.start();
            name.select(&["n"]).unwrap().values(&["name"]);
            let mut inner = g.start();
            inner.out_e(&["knows"]).in_v();
            g.v()
                .as_("n")
                .where_(&inner)
                .project(&["n.name"])
                .unwrap()
                .by(&name);
        }
        build(&mut live);
        build(&mut emitted);

        assert_eq!(live.to_string(), emitted.to_string());
        assert_eq!(
            live.to_string(),
            "[V(), as(n), where([outE(knows), inV()]), project(n.name), by([select(n), values(name)])]"
        );
    }

    #[test]
    fn test_start_steps_only_root_fresh_traversals() {
        let (_, source) = modern();

        let mut g = live(&source);
        g.v().v().count();
        // Mid-traversal V() runs once per incoming traverser.
        assert_eq!(run(&g), vec![Value::Int(16)]);

        let mut anonymous = g.start();
        anonymous.v();
        assert!(matches!(
            anonymous.traversal().exec_steps().first(),
            Some(ExecStep::Step(_))
        ));
    }

    #[test]
    fn test_edge_start_only_at_root() {
        let (_, source) = modern();
        let mut g = live(&source);
        g.e().unwrap().count();
        assert_eq!(run(&g), vec![Value::Int(3)]);

        let mut mid = live(&source);
        mid.v();
        assert!(matches!(mid.e(), Err(Error::IllegalState(_))));

        let mut floating = mid.start();
        assert!(floating.e().is_err());
    }

    #[test]
    fn test_sub_traversal_snapshot() {
        let (_, source) = modern();
        let mut g = live(&source);
        let mut child = g.start();
        child.values(&["name"]);
        g.v().has_label(&["person"]).map(&child);
        child.count();

        assert_eq!(g.to_string(), "[V(), hasLabel(person), map([values(name)])]");
        assert_eq!(run(&g), strings(&["Alice", "Bob", "Carol"]));
    }

    #[test]
    fn test_filters_and_order() {
        let (_, source) = modern();
        let mut name = live(&source).start();
        name.values(&["name"]);
        let mut age = live(&source).start();
        age.values(&["age"]);

        let mut g = live(&source);
        g.v()
            .has_p("age", P::gt(27).and(P::lt(40)))
            .order()
            .by_order(&age, Order::Desc)
            .map(&name);
        assert_eq!(run(&g), strings(&["Carol", "Alice"]));

        let mut g = live(&source);
        g.v().has_label(&["person"]).values(&["age"]).sum();
        assert_eq!(run(&g), vec![Value::Int(91)]);
    }

    #[test]
    fn test_repeat_emit_times() {
        let (_, source) = modern();
        let mut body = live(&source).start();
        body.out_e(&["knows"]).in_v();
        let mut name = live(&source).start();
        name.values(&["name"]);

        let mut g = live(&source);
        g.v()
            .has_p("name", P::eq("Alice"))
            .repeat(&body)
            .emit()
            .times(2)
            .map(&name);
        assert_eq!(run(&g), strings(&["Bob", "Carol"]));

        // emit() declared before repeat() includes the start vertex.
        let mut g = live(&source);
        g.v().has_p("name", P::eq("Alice")).emit().repeat(&body).map(&name);
        assert_eq!(run(&g), strings(&["Alice", "Bob", "Carol"]));
    }

    #[test]
    fn test_repeat_until() {
        let (_, source) = modern();
        let mut body = live(&source).start();
        body.out_e(&["knows"]).in_v();
        let mut carol = live(&source).start();
        carol.has_p("name", P::eq("Carol"));
        let mut name = live(&source).start();
        name.values(&["name"]);

        let mut g = live(&source);
        g.v()
            .has_p("name", P::eq("Alice"))
            .repeat(&body)
            .until(&carol)
            .map(&name);
        assert_eq!(run(&g), strings(&["Carol"]));

        let mut g = live(&source);
        g.v()
            .has_p("name", P::eq("Alice"))
            .repeat(&body)
            .until_done()
            .map(&name);
        assert_eq!(run(&g), strings(&["Carol"]));
    }

    #[test]
    fn test_repeat_respects_max_loops() {
        let graph = Graph::in_memory();
        let a = graph.add_vertex("node");
        graph.add_edge("self", a, a).unwrap();
        let source = GraphTraversalSource::new(graph, EngineConfig { max_loops: 5 });

        let mut body = live(&source).start();
        body.out_e(&[]).in_v();
        let mut g = live(&source);
        g.v().repeat(&body).count();
        assert!(matches!(
            g.traversal().to_list(),
            Err(Error::ExecutionError(_))
        ));
    }

    #[test]
    fn test_project_requires_by_results() {
        let (_, source) = modern();
        let mut missing = live(&source).start();
        missing.values(&["missing"]);
        let mut g = live(&source);
        g.v().project(&["x"]).unwrap().by(&missing);
        assert!(g.traversal().to_list().is_err());
    }

    #[test]
    fn test_group_by_label() {
        let (_, source) = modern();
        let mut label = live(&source).start();
        label.label();
        let mut count = live(&source).start();
        count.count();

        let mut g = live(&source);
        g.v().group().by(&label).by(&count);
        let result = run(&g);
        let map = result[0].as_map().unwrap();
        assert_eq!(map.get(&Value::from("person")), Some(&Value::Int(3)));
        assert_eq!(map.get(&Value::from("software")), Some(&Value::Int(1)));

        let mut g = live(&source);
        g.v().has_label(&["nothing"]).group().by(&label);
        assert_eq!(run(&g), vec![Value::Map(Default::default())]);
    }

    #[test]
    fn test_select_and_columns() {
        let (_, source) = modern();
        let mut name = live(&source).start();
        name.values(&["name"]);

        let mut g = live(&source);
        g.v()
            .has_p("name", P::eq("Alice"))
            .as_("a")
            .out_e(&["knows"])
            .in_v()
            .as_("b")
            .select(&["a", "b"])
            .unwrap()
            .by(&name)
            .select_column(Column::Values);
        assert_eq!(run(&g), vec![Value::List(strings(&["Alice", "Bob"]))]);

        let mut g = live(&source);
        g.v().as_("a").select_pop(Pop::All, "a").count_scope(Scope::Local);
        assert_eq!(run(&g), vec![Value::Int(1); 4]);
    }

    #[test]
    fn test_math_and_functions() {
        let (_, source) = modern();
        let mut age = live(&source).start();
        age.values(&["age"]);

        let mut g = live(&source);
        g.v().has_p("name", P::eq("Alice")).as_("p").math("p * 2").by(&age);
        assert_eq!(run(&g), vec![Value::Float(58.0)]);

        let mut g = live(&source);
        g.inject(&[Value::List(vec![Value::Int(2), Value::Int(3)])])
            .map_fn(crate::translation::CustomFunction::Plus);
        assert_eq!(run(&g), vec![Value::Int(5)]);
    }

    #[test]
    fn test_create_and_mutate() {
        let (graph, source) = modern();
        let mut g = live(&source);
        g.add_v_label("person")
            .property("name", "Dave")
            .as_("d")
            .v()
            .has_p("name", P::eq("Alice"))
            .add_e("knows")
            .to("d");
        assert_eq!(run(&g).len(), 1);
        assert_eq!(graph.vertex_count(), 5);
        assert_eq!(graph.edge_count(), 4);

        let mut g = live(&source);
        g.v()
            .has_p("name", P::eq("Dave"))
            .property_cardinality(Cardinality::List, "tag", "a")
            .property_cardinality(Cardinality::List, "tag", "b")
            .values(&["tag"]);
        assert_eq!(run(&g), vec![Value::List(strings(&["a", "b"]))]);

        let mut g = live(&source);
        g.v()
            .has_p("name", P::eq("Dave"))
            .property("tag", NULL_SENTINEL)
            .has("tag");
        assert!(run(&g).is_empty());

        let mut g = live(&source);
        g.v().has_p("name", P::eq("Dave")).drop();
        assert!(run(&g).is_empty());
        assert_eq!(graph.vertex_count(), 4);
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_dangling_loop_modulator_fails() {
        let (_, source) = modern();
        let mut g = live(&source);
        g.v().times(2);
        assert!(g.traversal().to_list().is_err());
    }

    #[test]
    fn test_out_of_range_times_fails() {
        let (_, source) = modern();
        let mut body = BytecodeSteps::anonymous();
        body.out_e(&["knows"]).in_v();
        let mut emitted = BytecodeSteps::new();
        emitted.v().repeat(&body).times(2);

        let mut program = Program::new();
        for step in emitted.current().steps() {
            if step.kind == StepKind::Times {
                program.add_step(Step::with_args(
                    StepKind::Times,
                    [Argument::Literal(Value::Int(4_294_967_297))],
                ));
            } else {
                program.add_step(step.clone());
            }
        }
        let traversal = Traversal::from_program(Some(source.clone()), &program).unwrap();
        assert!(matches!(traversal.to_list(), Err(Error::ExecutionError(_))));

        let traversal = Traversal::from_program(Some(source), &emitted.current()).unwrap();
        assert_eq!(traversal.to_list().unwrap().len(), 1);
    }
}
