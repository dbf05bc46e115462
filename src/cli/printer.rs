//! 结果打印器
//!
//! 提供表格和垂直格式的结果输出

use crate::metrics::MetricsSnapshot;
use crate::types::{Row, Value};
use prettytable::{format, row, Cell, Table};

/// 打印模式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrintMode {
    /// 表格模式
    Table,
    /// 垂直模式 (\G)
    Vertical,
}

/// 结果打印器
pub struct Printer {
    mode: PrintMode,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new(PrintMode::Table)
    }
}

impl Printer {
    pub fn new(mode: PrintMode) -> Self {
        Self { mode }
    }

    pub fn set_mode(&mut self, mode: PrintMode) {
        self.mode = mode;
    }

    /// 打印查询结果（列顺序取第一行）
    pub fn print_rows(&self, rows: &[Row], execution_time_ms: u64) -> String {
        let columns: Vec<&str> = match rows.first() {
            Some(first) if !first.is_empty() => first.keys().map(String::as_str).collect(),
            _ => return format!("Empty set ({} ms)\n", execution_time_ms),
        };
        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|c| row.get(*c).map(format_value).unwrap_or_default())
                    .collect()
            })
            .collect();

        let output = match self.mode {
            PrintMode::Table => format_table(&columns, &cells),
            PrintMode::Vertical => format_vertical(&columns, &cells),
        };

        format!(
            "{}\n{} row(s) in set ({} ms)\n",
            output,
            rows.len(),
            execution_time_ms
        )
    }

    /// 打印统计信息
    pub fn print_stats(
        &self,
        vertex_count: usize,
        edge_count: usize,
        labels: &[String],
        metrics: &MetricsSnapshot,
    ) -> String {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);
        table.set_titles(row!["Property", "Value"]);
        table.add_row(row!["Vertex Count", vertex_count.to_string()]);
        table.add_row(row!["Edge Count", edge_count.to_string()]);
        table.add_row(row!["Labels", labels.join(", ")]);
        table.add_row(row!["Queries", metrics.total_queries.to_string()]);
        table.add_row(row!["Failed Queries", metrics.failed_queries.to_string()]);
        table.add_row(row!["Explained", metrics.explain_queries.to_string()]);
        table.add_row(row![
            "Avg Query Time (ms)",
            format!("{:.2}", metrics.avg_query_duration_ms)
        ]);
        table.to_string()
    }

    /// 打印帮助信息
    pub fn print_help() -> String {
        r#"
═══════════════════════════════════════════════════════════════
                   cyphergraph CLI 命令帮助
═══════════════════════════════════════════════════════════════

Cypher 语句:
  MATCH (n:person) RETURN n.name
  MATCH (a)-[r:knows]->(b) WHERE a.age > 30 RETURN a, r, b
  MATCH (a)-[:knows*1..3]->(b) RETURN DISTINCT b.name ORDER BY b.name
  MATCH (n) RETURN labels(n) AS l, count(*) AS c
  CREATE (a:person {name: 'Alice'})-[:knows]->(b:person {name: 'Bob'})
  MATCH (n {name: 'Alice'}) SET n.age = 30
  MATCH (n {name: 'Bob'}) DETACH DELETE n
  EXPLAIN MATCH (n) RETURN n

控制台命令 (以 : 开头):
  :help, :h              显示帮助
  :quit, :q, :exit       退出程序
  :explain <query>       显示翻译结果，不执行
  :stats                 显示图与查询统计
  :clear                 清屏

提示: 在查询末尾加 \G 可垂直显示结果
═══════════════════════════════════════════════════════════════
"#
        .to_string()
    }
}

/// 单元格文本：元素映射显示为 `(:label {..})` / `[:label {..}]`
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => s.clone(),
        Value::List(items) => {
            let items: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Map(map) => {
            let kind = map.get(&Value::from("_type")).and_then(Value::as_str);
            let label = map
                .get(&Value::from("_label"))
                .map(format_value)
                .unwrap_or_default();
            let properties: Vec<String> = map
                .iter()
                .filter(|(k, _)| kind.is_none() || !k.as_str().map_or(false, |k| k.starts_with('_')))
                .map(|(k, v)| format!("{}: {}", format_value(k), format_value(v)))
                .collect();
            let body = format!("{{{}}}", properties.join(", "));
            match kind {
                Some("node") => format!("(:{} {})", label, body),
                Some("relationship") => format!("[:{} {}]", label, body),
                _ => body,
            }
        }
        other => other.to_string(),
    }
}

fn format_table(columns: &[&str], rows: &[Vec<String>]) -> String {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);

    let header: Vec<Cell> = columns.iter().map(|c| Cell::new(c)).collect();
    table.set_titles(prettytable::Row::new(header));

    for row_data in rows {
        let cells: Vec<Cell> = row_data.iter().map(|v| Cell::new(v)).collect();
        table.add_row(prettytable::Row::new(cells));
    }

    table.to_string()
}

fn format_vertical(columns: &[&str], rows: &[Vec<String>]) -> String {
    let width = columns.iter().map(|c| c.chars().count()).max().unwrap_or(0);
    let mut output = String::new();

    for (i, row_data) in rows.iter().enumerate() {
        output.push_str(&format!(
            "*************************** {}. row ***************************\n",
            i + 1
        ));
        for (j, column) in columns.iter().enumerate() {
            let value = row_data.get(j).map(String::as_str).unwrap_or("");
            output.push_str(&format!("{:>width$}: {}\n", column, value, width = width));
        }
    }

    output
}

/// 检查查询是否以 \G 结尾（垂直显示）
pub fn check_vertical_display(query: &str) -> (String, bool) {
    let trimmed = query.trim();
    if trimmed.ends_with("\\G") || trimmed.ends_with("\\g") {
        let clean_query = trimmed[..trimmed.len() - 2].trim().to_string();
        (clean_query, true)
    } else {
        (trimmed.to_string(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Row> {
        let node = Value::map_from([
            ("_type", Value::from("node")),
            ("_id", Value::Int(1)),
            ("_label", Value::from("person")),
            ("name", Value::from("Alice")),
        ]);
        let mut row = Row::new();
        row.insert("n".to_string(), node);
        row.insert("age".to_string(), Value::Null);
        vec![row]
    }

    #[test]
    fn test_format_value() {
        let rows = sample();
        assert_eq!(format_value(&rows[0]["n"]), "(:person {name: Alice})");
        assert_eq!(format_value(&rows[0]["age"]), "null");
        assert_eq!(
            format_value(&Value::List(vec![Value::Int(1), Value::from("a")])),
            "[1, a]"
        );
    }

    #[test]
    fn test_vertical_output() {
        let printer = Printer::new(PrintMode::Vertical);
        let output = printer.print_rows(&sample(), 3);
        assert!(output.contains("1. row"));
        assert!(output.contains("  n: (:person {name: Alice})"));
        assert!(output.ends_with("1 row(s) in set (3 ms)\n"));
    }

    #[test]
    fn test_empty_and_vertical_flag() {
        assert_eq!(Printer::default().print_rows(&[], 0), "Empty set (0 ms)\n");
        assert_eq!(
            check_vertical_display("MATCH (n) RETURN n \\G"),
            ("MATCH (n) RETURN n".to_string(), true)
        );
        assert_eq!(
            check_vertical_display("RETURN 1"),
            ("RETURN 1".to_string(), false)
        );
    }
}
