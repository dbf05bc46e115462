//! 配置
//!
//! JSON 配置文件，字段缺省时取默认值；命令行参数可再覆盖

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 全局配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    /// EXPLAIN 输出格式
    pub explain: ExplainFormat,
}

/// HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 遍历引擎配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// `repeat()` 的最大迭代次数
    pub max_loops: u32,
}

/// EXPLAIN 翻译文本格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplainFormat {
    /// Gremlin-Groovy 源码
    #[default]
    Groovy,
    /// 规范步骤表示 `[V(), ...]`
    Bytecode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8182,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_loops: 1000 }
    }
}

impl Config {
    /// 从 JSON 文件加载
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("无法读取配置文件 {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::ConfigError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8182);
        assert_eq!(config.engine.max_loops, 1000);
        assert_eq!(config.explain, ExplainFormat::Groovy);
    }

    #[test]
    fn test_partial_json() {
        let config = Config::from_json(r#"{"engine": {"max_loops": 5}, "explain": "bytecode"}"#)
            .unwrap();
        assert_eq!(config.engine.max_loops, 5);
        assert_eq!(config.explain, ExplainFormat::Bytecode);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"server": {{"port": 9000}}}}"#).unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            Config::from_json("{not json"),
            Err(Error::ConfigError(_))
        ));
        assert!(matches!(
            Config::from_file("/nonexistent/cyphergraph.json"),
            Err(Error::ConfigError(_))
        ));
    }
}
