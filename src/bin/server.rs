//! cyphergraph 服务器入口
//!
//! 启动 HTTP API 服务器

use anyhow::Context;
use clap::Parser;
use cyphergraph::client::{CypherGremlinClient, InMemoryClient};
use cyphergraph::config::Config;
use cyphergraph::graph::Graph;
use cyphergraph::server::start_server;
use cyphergraph::types::Parameters;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cyphergraph-server")]
#[command(about = "cyphergraph HTTP API 服务器")]
struct Args {
    /// JSON 配置文件
    #[arg(short, long)]
    config: Option<String>,

    /// 监听地址
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// 监听端口
    #[arg(short, long)]
    port: Option<u16>,

    /// 启动时执行的 Cypher 脚本（语句以 `;` 分隔）
    #[arg(short, long)]
    init: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let client = Arc::new(InMemoryClient::from_config(Graph::in_memory(), &config));

    if let Some(path) = &args.init {
        let script = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取初始化脚本 {}", path))?;
        for statement in script.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            client.submit(statement, &Parameters::new()).await?;
        }
        info!(
            "初始化完成: {} 个顶点, {} 条边",
            client.graph().vertex_count(),
            client.graph().edge_count()
        );
    }

    start_server(config.server, client).await?;
    Ok(())
}
