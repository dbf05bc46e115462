//! Cypher 前端
//!
//! 解析 Cypher 文本为 AST，并驱动任意步骤构建后端完成翻译

pub mod ast;
pub mod parser;
mod walker;

pub use ast::{
    BinaryOperator, CypherAst, Direction, Expression, NodePattern, PathPattern, Query,
    RelationshipPattern, ReturnClause, StatementOption, StatementOptions,
};
pub use parser::CypherParser;
pub(crate) use walker::{ELEMENT_KEY, IN_V_KEY, OUT_V_KEY};
