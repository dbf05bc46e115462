//! Live traversal engine
//!
//! In-memory Gremlin-style traversals over [`Graph`](crate::graph::Graph):
//! a graph-bound source, compiled traversals, an eager interpreter and the
//! live [`GremlinSteps`](crate::translation::GremlinSteps) backend.

mod exec;
pub mod live;
pub mod math;
pub mod source;
pub mod traversal;
pub mod traverser;

pub use live::TraversalSteps;
pub use source::GraphTraversalSource;
pub use traversal::{ElementKind, ExecStep, Modulator, StepExec, Traversal};
pub use traverser::Traverser;
