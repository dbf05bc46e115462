//! 交互式命令行
//!
//! rustyline REPL：Cypher 查询、控制台命令与结果打印

pub mod commands;
pub mod completer;
pub mod printer;

pub use commands::{is_console_command, parse_console_command, CommandResult};
pub use completer::CypherCompleter;
pub use printer::{check_vertical_display, format_value, PrintMode, Printer};

use crate::client::{CypherGremlinClient, InMemoryClient};
use crate::error::{Error, Result};
use crate::metrics;
use crate::types::Parameters;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::path::PathBuf;
use std::time::Instant;

const PROMPT: &str = "cypher> ";
const HISTORY_FILE: &str = ".cyphergraph_history";

/// 单行输入的处理结果
#[derive(Debug, PartialEq)]
pub enum Outcome {
    Output(String),
    Clear,
    Exit,
}

/// 一个 CLI 会话
pub struct Session {
    client: InMemoryClient,
    printer: Printer,
}

impl Session {
    pub fn new(client: InMemoryClient) -> Self {
        Self {
            client,
            printer: Printer::default(),
        }
    }

    pub fn client(&self) -> &InMemoryClient {
        &self.client
    }

    /// 处理一行输入
    pub async fn handle_line(&mut self, line: &str) -> Outcome {
        let line = line.trim();
        if line.is_empty() {
            return Outcome::Output(String::new());
        }
        if !is_console_command(line) {
            return Outcome::Output(self.run_query(line).await);
        }

        match parse_console_command(line) {
            CommandResult::Exit => Outcome::Exit,
            CommandResult::Clear => Outcome::Clear,
            CommandResult::Message(text) => Outcome::Output(text),
            CommandResult::Error(text) => Outcome::Output(format!("{}\n", text.red())),
            CommandResult::Stats => {
                let graph = self.client.graph();
                Outcome::Output(self.printer.print_stats(
                    graph.vertex_count(),
                    graph.edge_count(),
                    &graph.vertex_labels(),
                    &metrics::global_metrics().snapshot(),
                ))
            }
            CommandResult::Explain(query) => {
                Outcome::Output(self.run_query(&format!("EXPLAIN {}", query)).await)
            }
        }
    }

    /// 执行查询并返回打印文本
    pub async fn run_query(&mut self, input: &str) -> String {
        let (query, vertical) = check_vertical_display(input);
        self.printer.set_mode(if vertical {
            PrintMode::Vertical
        } else {
            PrintMode::Table
        });

        let started = Instant::now();
        match self.client.submit(&query, &Parameters::new()).await {
            Ok(rows) => self
                .printer
                .print_rows(&rows, started.elapsed().as_millis() as u64),
            Err(e) => format!("{} {}\n", "ERROR:".red().bold(), e),
        }
    }
}

fn history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(HISTORY_FILE))
}

/// 运行交互式循环直到 `:quit` 或 EOF
pub async fn run_repl(mut session: Session) -> Result<()> {
    let mut editor: Editor<CypherCompleter, DefaultHistory> =
        Editor::new().map_err(|e| Error::InternalError(format!("无法初始化终端: {}", e)))?;
    editor.set_helper(Some(CypherCompleter::new()));
    let history = history_path();
    if let Some(path) = &history {
        // 首次运行时历史文件不存在
        let _ = editor.load_history(path);
    }

    println!("{}", "cyphergraph CLI".bold());
    println!("输入 :help 查看帮助，:quit 退出\n");

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = editor.add_history_entry(line.as_str());
                }
                match session.handle_line(&line).await {
                    Outcome::Exit => break,
                    Outcome::Clear => {
                        let _ = editor.clear_screen();
                    }
                    Outcome::Output(text) => print!("{}", text),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(Error::InternalError(format!("读取输入失败: {}", e))),
        }
    }

    if let Some(path) = &history {
        let _ = editor.save_history(path);
    }
    session.client().close();
    println!("Bye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::graph::Graph;
    use crate::traversal::GraphTraversalSource;

    fn session() -> Session {
        let graph = Graph::in_memory();
        graph.add_vertex_with("person", vec![("name", "Alice".into())]);
        Session::new(InMemoryClient::new(GraphTraversalSource::new(
            graph,
            EngineConfig::default(),
        )))
    }

    #[tokio::test]
    async fn test_query_and_commands() {
        let mut session = session();
        match session.handle_line("MATCH (n) RETURN n.name AS name").await {
            Outcome::Output(text) => {
                assert!(text.contains("Alice"));
                assert!(text.contains("1 row(s) in set"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        match session.handle_line(":explain MATCH (n) RETURN n").await {
            Outcome::Output(text) => assert!(text.contains("g.V()")),
            other => panic!("unexpected outcome {:?}", other),
        }

        assert_eq!(session.handle_line(":q").await, Outcome::Exit);
        assert_eq!(session.handle_line(":clear").await, Outcome::Clear);
    }

    #[tokio::test]
    async fn test_errors_are_printed() {
        let mut session = session();
        match session.handle_line("MATCH (n RETURN n").await {
            Outcome::Output(text) => assert!(text.contains("ERROR:")),
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
