//! 图核心模块
//!
//! 内存属性图：顶点、边及其索引

mod edge;
mod graph;
mod index;
mod vertex;

pub use edge::{Edge, EdgeId};
pub use graph::Graph;
pub use index::{EdgeIndex, VertexIndex};
pub use vertex::{Vertex, VertexId};
