//! 遍历源
//!
//! 绑定图与引擎配置，每次执行从源的一个克隆开始

use super::traversal::Traversal;
use crate::config::EngineConfig;
use crate::graph::Graph;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct GraphTraversalSource {
    graph: Arc<Graph>,
    config: EngineConfig,
}

impl GraphTraversalSource {
    pub fn new(graph: Arc<Graph>, config: EngineConfig) -> Self {
        Self { graph, config }
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 空的绑定遍历
    pub fn traversal(&self) -> Traversal {
        Traversal::bound(self.clone())
    }
}

impl fmt::Debug for GraphTraversalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphTraversalSource")
            .field("vertices", &self.graph.vertex_count())
            .field("edges", &self.graph.edge_count())
            .field("config", &self.config)
            .finish()
    }
}
