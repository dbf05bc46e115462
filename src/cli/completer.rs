//! Cypher 关键字补全器
//!
//! 基于 rustyline 实现 Tab 补全功能

use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

/// Cypher 关键字列表
const CYPHER_KEYWORDS: &[&str] = &[
    // 子句
    "EXPLAIN", "MATCH", "WHERE", "CREATE", "SET", "DELETE", "DETACH", "RETURN",
    "DISTINCT", "AS", "ORDER", "BY", "ASC", "DESC", "ASCENDING", "DESCENDING",
    "SKIP", "LIMIT",
    // 运算符
    "AND", "OR", "XOR", "NOT", "IN", "IS", "NULL", "TRUE", "FALSE", "STARTS",
    "ENDS", "WITH", "CONTAINS",
    // 函数
    "count", "collect", "sum", "min", "max", "avg", "id", "type", "labels",
    "keys", "toString", "toInteger", "toFloat", "toBoolean", "size",
];

/// 关键字后的常见后续词
fn follow_ups(keyword: &str) -> Option<&'static [&'static str]> {
    match keyword {
        "ORDER" => Some(&["BY"]),
        "DETACH" => Some(&["DELETE"]),
        "IS" => Some(&["NULL", "NOT"]),
        "STARTS" | "ENDS" => Some(&["WITH"]),
        "RETURN" => Some(&["DISTINCT"]),
        _ => None,
    }
}

/// 控制台命令列表
const CONSOLE_COMMANDS: &[&str] = &[
    ":help", ":h",
    ":quit", ":q",
    ":exit",
    ":explain",
    ":stats",
    ":clear",
];

#[derive(Default)]
pub struct CypherCompleter;

impl CypherCompleter {
    pub fn new() -> Self {
        Self
    }

    /// 补全候选（不区分大小写匹配，保留关键字原本写法）
    pub fn candidates(&self, line: &str, pos: usize) -> (usize, Vec<String>) {
        let line_to_cursor = &line[..pos];

        if line_to_cursor.starts_with(':') && !line_to_cursor.contains(' ') {
            let matches = CONSOLE_COMMANDS
                .iter()
                .filter(|cmd| cmd.starts_with(line_to_cursor))
                .map(|cmd| cmd.to_string())
                .collect();
            return (0, matches);
        }

        let words: Vec<&str> = line_to_cursor.split_whitespace().collect();
        let last = match words.last() {
            Some(last) => *last,
            None => return (pos, Vec::new()),
        };

        if line_to_cursor.ends_with(char::is_whitespace) {
            let matches = follow_ups(&last.to_uppercase())
                .map(|words| words.iter().map(|w| w.to_string()).collect())
                .unwrap_or_default();
            return (pos, matches);
        }

        let current = last.to_uppercase();
        let start = pos - last.len();
        let matches = CYPHER_KEYWORDS
            .iter()
            .filter(|kw| kw.to_uppercase().starts_with(&current))
            .map(|kw| kw.to_string())
            .collect();
        (start, matches)
    }
}

impl Completer for CypherCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, matches) = self.candidates(line, pos);
        let pairs = matches
            .into_iter()
            .map(|m| Pair {
                display: m.clone(),
                replacement: m,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for CypherCompleter {
    type Hint = String;
}

impl Highlighter for CypherCompleter {}

impl Validator for CypherCompleter {}

impl Helper for CypherCompleter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_completion() {
        let completer = CypherCompleter::new();
        let (start, matches) = completer.candidates("MATCH (n) RET", 13);
        assert_eq!(start, 10);
        assert_eq!(matches, vec!["RETURN"]);

        let (_, matches) = completer.candidates("match (n) return tos", 20);
        assert_eq!(matches, vec!["toString"]);
    }

    #[test]
    fn test_follow_ups_and_commands() {
        let completer = CypherCompleter::new();
        let (start, matches) = completer.candidates("MATCH (n) RETURN n ORDER ", 25);
        assert_eq!(start, 25);
        assert_eq!(matches, vec!["BY"]);

        let (start, matches) = completer.candidates(":ex", 3);
        assert_eq!(start, 0);
        assert_eq!(matches, vec![":exit", ":explain"]);
    }
}
