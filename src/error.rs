//! 错误类型定义

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// 步骤顺序违规（例如 `E()` 不在遍历起始位置）
    #[error("非法状态: {0}")]
    IllegalState(String),

    /// 步骤参数数量不足（例如 `project()` 没有键）
    #[error("非法参数: {0}")]
    IllegalArgument(String),

    #[error("解析错误: {0}")]
    ParseError(String),

    #[error("翻译错误: {0}")]
    TranslationError(String),

    #[error("执行错误: {0}")]
    ExecutionError(String),

    #[error("未找到: {0}")]
    NotFound(String),

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("服务器错误: {0}")]
    ServerError(String),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    SerializationError(String),

    #[error("内部错误: {0}")]
    InternalError(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}
