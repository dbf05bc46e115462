//! cyphergraph CLI 工具
//!
//! 交互式命令行界面

use clap::Parser;
use cyphergraph::cli::{run_repl, Session};
use cyphergraph::client::InMemoryClient;
use cyphergraph::config::{Config, ExplainFormat};
use cyphergraph::graph::Graph;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cyphergraph-cli")]
#[command(about = "cyphergraph 命令行工具")]
struct Args {
    /// JSON 配置文件
    #[arg(short, long)]
    config: Option<String>,

    /// EXPLAIN 输出为规范步骤表示而非 Groovy
    #[arg(long)]
    bytecode: bool,

    /// 执行单个查询后退出
    #[arg(short = 'e', long)]
    execute: Option<String>,
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
    if args.bytecode {
        config.explain = ExplainFormat::Bytecode;
    }

    let mut session = Session::new(InMemoryClient::from_config(Graph::in_memory(), &config));

    if let Some(query) = args.execute {
        print!("{}", session.run_query(&query).await);
        return Ok(());
    }

    run_repl(session).await?;
    Ok(())
}
