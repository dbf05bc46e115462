//! 查询客户端
//!
//! 解析 → 翻译 → 在阻塞任务中执行 → 规范化结果行

mod normalizer;

pub use normalizer::{normalize, normalize_value};

use crate::config::{Config, ExplainFormat};
use crate::cypher::CypherAst;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::metrics;
use crate::translation::{Program, TranslatorConfig};
use crate::traversal::{GraphTraversalSource, Traversal};
use crate::types::{Parameters, Row, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

/// 异步查询结果：恰好完成一次，成功或失败
pub type QueryFuture = Pin<Box<dyn Future<Output = Result<Vec<Row>>> + Send>>;

/// Cypher 查询客户端
pub trait CypherGremlinClient: Send + Sync {
    /// 提交查询；解析与翻译错误同步返回，执行错误由 future 返回
    fn submit_async(&self, query: &str, parameters: &Parameters) -> Result<QueryFuture>;

    /// 提交查询并把同步错误并入 future
    fn submit(&self, query: &str, parameters: &Parameters) -> QueryFuture {
        match self.submit_async(query, parameters) {
            Ok(future) => future,
            Err(e) => Box::pin(async move { Err(e) }),
        }
    }

    fn close(&self) {}
}

/// 在进程内图上执行的客户端
#[derive(Debug, Clone)]
pub struct InMemoryClient {
    source: GraphTraversalSource,
    explain: ExplainFormat,
}

impl InMemoryClient {
    pub fn new(source: GraphTraversalSource) -> Self {
        Self {
            source,
            explain: ExplainFormat::default(),
        }
    }

    /// 按配置创建
    pub fn from_config(graph: Arc<Graph>, config: &Config) -> Self {
        Self {
            source: GraphTraversalSource::new(graph, config.engine.clone()),
            explain: config.explain,
        }
    }

    pub fn with_explain_format(mut self, format: ExplainFormat) -> Self {
        self.explain = format;
        self
    }

    pub fn source(&self) -> &GraphTraversalSource {
        &self.source
    }

    pub fn graph(&self) -> &Arc<Graph> {
        self.source.graph()
    }

    fn explain(&self, ast: &CypherAst) -> Result<Row> {
        let config = match self.explain {
            ExplainFormat::Groovy => TranslatorConfig::GremlinGroovy,
            ExplainFormat::Bytecode => TranslatorConfig::Bytecode,
        };
        let translation = ast.build_translation(config)?;
        let mut row = Row::new();
        row.insert("translation".to_string(), Value::String(translation.to_string()));
        row.insert("options".to_string(), Value::String(ast.options().to_string()));
        Ok(row)
    }

    fn prepare(&self, query: &str, parameters: &Parameters) -> Result<Prepared> {
        let ast = CypherAst::parse(query, parameters)?;
        if ast.options().is_explain() {
            return Ok(Prepared::Explain(self.explain(&ast)?));
        }
        let traversal = ast
            .build_translation(TranslatorConfig::Traversal(self.source.clone().traversal()))?
            .into_traversal()?;
        Ok(Prepared::Execute(traversal))
    }

    /// 执行已翻译的程序（例如反序列化得到的 JSON/bincode 形式）
    pub fn submit_program(&self, program: &Program) -> Result<QueryFuture> {
        let traversal = Traversal::from_program(Some(self.source.clone()), program)?;
        Ok(execute(traversal))
    }
}

/// 在阻塞任务中执行遍历并规范化结果
fn execute(traversal: Traversal) -> QueryFuture {
    let metrics = metrics::global_metrics();
    debug!("执行遍历: {}", traversal);
    let timer = metrics.record_query_start();
    Box::pin(async move {
        let result = tokio::task::spawn_blocking(move || -> Result<Vec<Row>> {
            traversal.to_list()?.into_iter().map(normalize).collect()
        })
        .await
        .map_err(|e| Error::InternalError(format!("执行任务失败: {}", e)))
        .and_then(|result| result);

        metrics.record_query_complete(timer, result.is_ok());
        match &result {
            Ok(rows) => metrics.record_rows(rows.len()),
            Err(e) => warn!("查询执行失败: {}", e),
        }
        result
    })
}

enum Prepared {
    Explain(Row),
    Execute(Traversal),
}

impl CypherGremlinClient for InMemoryClient {
    fn submit_async(&self, query: &str, parameters: &Parameters) -> Result<QueryFuture> {
        let metrics = metrics::global_metrics();
        let traversal = match self.prepare(query, parameters) {
            Ok(Prepared::Explain(row)) => {
                metrics.record_explain();
                return Ok(Box::pin(async move { Ok(vec![row]) }));
            }
            Ok(Prepared::Execute(traversal)) => traversal,
            Err(e) => {
                metrics.record_translation_error();
                warn!("查询翻译失败: {}", e);
                return Err(e);
            }
        };

        Ok(execute(traversal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::translation::{Argument, Step, StepKind};

    fn client() -> InMemoryClient {
        let graph = Graph::in_memory();
        graph.add_vertex_with("person", vec![("name", "Alice".into()), ("age", 29.into())]);
        InMemoryClient::new(GraphTraversalSource::new(graph, EngineConfig::default()))
    }

    #[tokio::test]
    async fn test_round_trip() {
        let client = client();
        let rows = client
            .submit("MATCH (n) RETURN n.name", &Parameters::new())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["n.name"], Value::from("Alice"));
    }

    #[tokio::test]
    async fn test_node_and_null_columns() {
        let client = client();
        let rows = client
            .submit("MATCH (n:person) RETURN n, n.email", &Parameters::new())
            .await
            .unwrap();
        assert_eq!(rows[0]["n.email"], Value::Null);
        let node = rows[0]["n"].as_map().unwrap();
        assert_eq!(node[&Value::from("_type")], Value::from("node"));
        assert_eq!(node[&Value::from("_label")], Value::from("person"));
        assert_eq!(node[&Value::from("name")], Value::from("Alice"));
    }

    #[tokio::test]
    async fn test_parameters() {
        let client = client();
        let mut parameters = Parameters::new();
        parameters.insert("name".to_string(), Value::from("Alice"));
        let rows = client
            .submit("MATCH (n {name: $name}) RETURN n.age AS age", &parameters)
            .await
            .unwrap();
        assert_eq!(rows[0]["age"], Value::Int(29));
    }

    #[tokio::test]
    async fn test_explain_does_not_execute() {
        let client = client();
        let rows = client
            .submit("EXPLAIN CREATE (n:person {name: 'Bob'})", &Parameters::new())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        let columns: Vec<&str> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(columns, vec!["translation", "options"]);
        assert_eq!(rows[0]["options"], Value::from("[EXPLAIN]"));
        let text = rows[0]["translation"].as_str().unwrap();
        assert!(text.starts_with("g.addV("));
        assert_eq!(client.graph().vertex_count(), 1);
    }

    #[tokio::test]
    async fn test_explain_bytecode_format() {
        let client = client().with_explain_format(ExplainFormat::Bytecode);
        let rows = client
            .submit("EXPLAIN MATCH (n) RETURN n.name", &Parameters::new())
            .await
            .unwrap();
        assert_eq!(
            rows[0]["translation"],
            Value::from(
                "[V(), as(n), project(n.name), by([select(n), coalesce([values(name)], [constant(  cypher.null)])])]"
            )
        );
    }

    #[tokio::test]
    async fn test_concurrent_creates_are_isolated() {
        let client = client();
        let mut futures = Vec::new();
        for i in 0..8 {
            let query = format!("CREATE (n:person {{name: 'p{}'}}) RETURN n.name AS name", i);
            futures.push(client.submit_async(&query, &Parameters::new()).unwrap());
        }
        let mut names = Vec::new();
        for future in futures {
            let rows = future.await.unwrap();
            assert_eq!(rows.len(), 1);
            names.push(rows[0]["name"].clone());
        }
        let expected: Vec<Value> = (0..8).map(|i| Value::from(format!("p{}", i))).collect();
        assert_eq!(names, expected);
        assert_eq!(client.graph().vertex_count(), 9);
    }

    #[tokio::test]
    async fn test_submit_portable_program() {
        let client = client();
        let query = "MATCH (n:person) RETURN n.name AS name, n.age + 1 AS next";
        let program = CypherAst::parse(query, &Parameters::new())
            .unwrap()
            .build_translation(TranslatorConfig::Bytecode)
            .unwrap()
            .into_program()
            .unwrap();

        let from_json = Program::from_json(&program.to_json().unwrap()).unwrap();
        let rows = client.submit_program(&from_json).unwrap().await.unwrap();
        let expected = client.submit(query, &Parameters::new()).await.unwrap();
        assert_eq!(rows, expected);
        assert_eq!(rows[0]["next"], Value::Int(30));

        let from_bytes = Program::from_bytes(&program.to_bytes().unwrap()).unwrap();
        let rows = client.submit_program(&from_bytes).unwrap().await.unwrap();
        assert_eq!(rows, expected);
    }

    #[tokio::test]
    async fn test_submit_program_start_steps() {
        let client = client();
        let mut program = Program::new();
        program.add_step(Step::new(StepKind::V));
        program.add_step(Step::new(StepKind::E));
        assert!(matches!(
            client.submit_program(&program),
            Err(Error::IllegalState(_))
        ));

        // write steps run like any other query
        let mut program = Program::new();
        program.add_step(Step::with_args(
            StepKind::AddV,
            [Argument::Label("person".to_string())],
        ));
        program.add_step(Step::with_args(
            StepKind::Limit,
            [Argument::Literal(Value::Int(0))],
        ));
        let rows = client.submit_program(&program).unwrap().await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(client.graph().vertex_count(), 2);
    }

    #[test]
    fn test_submit_folds_synchronous_errors() {
        let client = client();
        let result = tokio_test::block_on(client.submit("MATCH (n", &Parameters::new()));
        assert!(matches!(result, Err(Error::ParseError(_))));

        let rows = tokio_test::block_on(client.submit("EXPLAIN RETURN 1", &Parameters::new())).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_errors() {
        let client = client();
        assert!(matches!(
            client.submit_async("MATCH (n RETURN n", &Parameters::new()),
            Err(Error::ParseError(_))
        ));
        assert!(matches!(
            client.submit_async("MATCH (n) RETURN m", &Parameters::new()),
            Err(Error::TranslationError(_))
        ));
        let failed = client
            .submit("MATCH (n) RETURN n.age / 0", &Parameters::new())
            .await;
        assert!(matches!(failed, Err(Error::ExecutionError(_))));
        client.close();
    }
}
