//! HTTP 服务器模块
//!
//! 提供健康检查、指标与 Cypher 查询接口

use crate::client::{CypherGremlinClient, InMemoryClient};
use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::metrics;
use crate::types::{Parameters, Row, Value};
use axum::{
    body::Body,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<InMemoryClient>,
}

/// 构建路由
pub fn router(client: Arc<InMemoryClient>) -> Router {
    let state = AppState { client };

    Router::new()
        // 健康检查
        .route("/health", get(health_check))
        // 指标和统计
        .route("/metrics", get(metrics_handler))
        .route("/stats", get(stats_handler))
        // Cypher 查询
        .route("/query", post(execute_query))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// 启动服务器
pub async fn start_server(config: ServerConfig, client: Arc<InMemoryClient>) -> Result<()> {
    let app = router(client);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::ServerError(format!("绑定地址失败: {}", e)))?;
    info!("cyphergraph 服务器启动于 http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::ServerError(format!("服务器错误: {}", e)))?;

    Ok(())
}

// ==================== 处理器 ====================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Prometheus 格式指标
async fn metrics_handler() -> Response {
    let prom = metrics::global_metrics().to_prometheus();
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        Body::from(prom.content),
    )
        .into_response()
}

/// 详细统计信息
async fn stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = metrics::global_metrics().snapshot();
    let graph = state.client.graph();

    Json(serde_json::json!({
        "query": {
            "total": snapshot.total_queries,
            "success": snapshot.success_queries,
            "failed": snapshot.failed_queries,
            "avg_duration_ms": snapshot.avg_query_duration_ms,
            "slow_queries": snapshot.slow_queries,
            "rows_returned": snapshot.rows_returned,
            "qps": snapshot.qps,
        },
        "translation": {
            "translations": snapshot.translations,
            "explain_queries": snapshot.explain_queries,
            "errors": snapshot.translation_errors,
        },
        "graph": {
            "vertices": graph.vertex_count(),
            "labels": graph.vertex_labels(),
            "edges": graph.edge_count(),
            "vertices_inserted": snapshot.vertices_inserted,
            "edges_inserted": snapshot.edges_inserted,
            "elements_dropped": snapshot.elements_dropped,
        },
        "system": {
            "uptime_seconds": snapshot.uptime_seconds,
            "version": env!("CARGO_PKG_VERSION"),
        }
    }))
}

/// Cypher 查询请求
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

/// 执行 Cypher 查询
async fn execute_query(State(state): State<AppState>, Json(req): Json<QueryRequest>) -> Response {
    let parameters: Parameters = req
        .parameters
        .iter()
        .map(|(k, v)| (k.clone(), Value::from_json(v)))
        .collect();

    match state.client.submit(&req.query, &parameters).await {
        Ok(rows) => {
            let data: Vec<serde_json::Value> = rows.iter().map(row_to_json).collect();
            (StatusCode::OK, ApiResponse::success(data)).into_response()
        }
        Err(e) => (status_for(&e), ApiResponse::<()>::error(&e.to_string())).into_response(),
    }
}

fn row_to_json(row: &Row) -> serde_json::Value {
    serde_json::Value::Object(
        row.iter()
            .map(|(column, value)| (column.clone(), value.to_json()))
            .collect(),
    )
}

fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::ParseError(_)
        | Error::TranslationError(_)
        | Error::IllegalArgument(_)
        | Error::IllegalState(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// API 响应
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }
    }
}

impl<T> IntoResponse for ApiResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::graph::Graph;
    use crate::traversal::GraphTraversalSource;

    fn state() -> AppState {
        let graph = Graph::in_memory();
        graph.add_vertex_with("person", vec![("name", "Alice".into())]);
        let client = InMemoryClient::new(GraphTraversalSource::new(graph, EngineConfig::default()));
        AppState {
            client: Arc::new(client),
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn request(query: &str, parameters: serde_json::Value) -> Json<QueryRequest> {
        Json(serde_json::from_value(serde_json::json!({ "query": query, "parameters": parameters })).unwrap())
    }

    #[tokio::test]
    async fn test_query_endpoint() {
        let response = execute_query(
            State(state()),
            request("MATCH (n {name: $name}) RETURN n.name", serde_json::json!({"name": "Alice"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"success": true, "data": [{"n.name": "Alice"}]})
        );
    }

    #[tokio::test]
    async fn test_query_errors() {
        let response = execute_query(State(state()), request("MATCH (n RETURN n", serde_json::json!({}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], serde_json::json!(false));
        assert!(body["error"].is_string());

        let response = execute_query(
            State(state()),
            request("MATCH (n) RETURN n.name / 0", serde_json::json!({})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_health_and_metrics() {
        let response = health_check().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], serde_json::json!("ok"));

        let response = metrics_handler().await;
        assert_eq!(response.status(), StatusCode::OK);
        let response = stats_handler(State(state())).await.into_response();
        assert_eq!(body_json(response).await["graph"]["vertices"], serde_json::json!(1));
    }
}
