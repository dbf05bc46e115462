//! 控制台命令处理
//!
//! 处理以 : 开头的控制台命令

/// 控制台命令执行结果
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// 退出程序
    Exit,
    /// 显示消息
    Message(String),
    /// 翻译但不执行
    Explain(String),
    /// 显示统计
    Stats,
    /// 清屏
    Clear,
    /// 错误
    Error(String),
}

/// 是否为控制台命令
pub fn is_console_command(input: &str) -> bool {
    input.trim_start().starts_with(':')
}

/// 解析控制台命令
pub fn parse_console_command(input: &str) -> CommandResult {
    let input = input.trim();
    let cmd_line = input.strip_prefix(':').unwrap_or(input);

    let parts: Vec<&str> = cmd_line.splitn(2, char::is_whitespace).collect();
    let cmd = parts[0].to_lowercase();
    let args = parts.get(1).map(|a| a.trim()).unwrap_or("");

    match cmd.as_str() {
        "help" | "h" => CommandResult::Message(super::printer::Printer::print_help()),
        "quit" | "q" | "exit" => CommandResult::Exit,
        "stats" => CommandResult::Stats,
        "clear" => CommandResult::Clear,
        "explain" => {
            if args.is_empty() {
                CommandResult::Error("Usage: :explain <query>".to_string())
            } else {
                CommandResult::Explain(args.to_string())
            }
        }
        other => CommandResult::Error(format!(
            "Unknown command ':{}'. Type :help for help.",
            other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert!(is_console_command("  :q"));
        assert!(!is_console_command("MATCH (n) RETURN n"));
        assert_eq!(parse_console_command(":quit"), CommandResult::Exit);
        assert_eq!(parse_console_command(":STATS"), CommandResult::Stats);
        assert_eq!(
            parse_console_command(":explain MATCH (n) RETURN n"),
            CommandResult::Explain("MATCH (n) RETURN n".to_string())
        );
        assert!(matches!(parse_console_command(":explain"), CommandResult::Error(_)));
        assert!(matches!(parse_console_command(":foo"), CommandResult::Error(_)));
        assert!(matches!(parse_console_command(":h"), CommandResult::Message(_)));
    }
}
