//! cyphergraph - Cypher 到 Gremlin 的翻译与执行
//!
//! - Cypher 前端：解析为 AST，并驱动任意步骤构建后端
//! - 步骤构建契约：同一套调用既可生成可移植程序，也可直接构建可执行遍历
//! - 内存属性图与 Gremlin 语义的遍历解释器
//! - 异步客户端、HTTP 服务与交互式命令行

pub mod cli;
pub mod client;
pub mod config;
pub mod cypher;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod server;
pub mod translation;
pub mod traversal;
pub mod types;

// 重导出常用类型
pub use client::{normalize, CypherGremlinClient, InMemoryClient, QueryFuture};
pub use config::{Config, EngineConfig, ExplainFormat, ServerConfig};
pub use cypher::CypherAst;
pub use error::{Error, Result};
pub use graph::{Edge, EdgeId, Graph, Vertex, VertexId};
pub use translation::{
    BytecodeSteps, GremlinSteps, Program, Translation, TranslationVisitor, Translator,
    TranslatorConfig, P,
};
pub use traversal::{GraphTraversalSource, Traversal, TraversalSteps};
pub use types::{Parameters, Row, Value};

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
