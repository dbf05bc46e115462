//! Cypher 抽象语法树
//!
//! 解析器产出、遍历生成器消费的查询结构。参数在解析阶段已内联为字面量。

use crate::error::Result;
use crate::translation::{GremlinSteps, Translation, TranslationVisitor, Translator, TranslatorConfig};
use crate::types::{Parameters, Value};
use std::fmt;

// ============================================================================
// 语句选项
// ============================================================================

/// 查询前缀选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementOption {
    Explain,
}

impl fmt::Display for StatementOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementOption::Explain => f.write_str("EXPLAIN"),
        }
    }
}

/// 选项集合，解析后只读
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementOptions(Vec<StatementOption>);

impl StatementOptions {
    pub(crate) fn insert(&mut self, option: StatementOption) {
        if !self.0.contains(&option) {
            self.0.push(option);
        }
    }

    pub fn contains(&self, option: StatementOption) -> bool {
        self.0.contains(&option)
    }

    pub fn is_explain(&self) -> bool {
        self.contains(StatementOption::Explain)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for StatementOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, option) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", option)?;
        }
        f.write_str("]")
    }
}

// ============================================================================
// 查询结构
// ============================================================================

/// 单条 Cypher 查询
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub matches: Vec<MatchClause>,
    pub create: Vec<PathPattern>,
    pub set: Vec<SetItem>,
    pub delete: Option<DeleteClause>,
    pub return_clause: Option<ReturnClause>,
}

/// MATCH 子句
#[derive(Debug, Clone)]
pub struct MatchClause {
    pub patterns: Vec<PathPattern>,
    pub where_clause: Option<Expression>,
}

/// 路径模式：起始节点 + (关系, 节点) 链
#[derive(Debug, Clone)]
pub struct PathPattern {
    pub start: NodePattern,
    pub chain: Vec<(RelationshipPattern, NodePattern)>,
}

/// 节点模式 `(v:Label {k: expr})`
#[derive(Debug, Clone, Default)]
pub struct NodePattern {
    pub variable: Option<String>,
    pub labels: Vec<String>,
    pub properties: Vec<(String, Expression)>,
}

/// 关系方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `-[]->`
    Outgoing,
    /// `<-[]-`
    Incoming,
    /// `-[]-`
    Both,
}

/// 变长关系范围，`max` 为空表示无上界
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarLength {
    pub min: u32,
    pub max: Option<u32>,
}

/// 关系模式 `-[r:TYPE {k: expr} *min..max]->`
#[derive(Debug, Clone)]
pub struct RelationshipPattern {
    pub variable: Option<String>,
    pub types: Vec<String>,
    pub properties: Vec<(String, Expression)>,
    pub direction: Direction,
    pub length: Option<VarLength>,
}

/// SET 项 `var.key = expr`
#[derive(Debug, Clone)]
pub struct SetItem {
    pub variable: String,
    pub key: String,
    pub value: Expression,
}

/// `[DETACH] DELETE var, ...`
#[derive(Debug, Clone)]
pub struct DeleteClause {
    pub detach: bool,
    pub variables: Vec<String>,
}

/// RETURN 子句
#[derive(Debug, Clone)]
pub struct ReturnClause {
    pub distinct: bool,
    pub items: Vec<ReturnItem>,
    pub order_by: Vec<SortItem>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// 返回项；无别名时以原始文本为列名
#[derive(Debug, Clone)]
pub struct ReturnItem {
    pub expression: Expression,
    pub alias: Option<String>,
    pub text: String,
}

impl ReturnItem {
    pub fn name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.text)
    }
}

/// ORDER BY 项
#[derive(Debug, Clone)]
pub struct SortItem {
    pub expression: Expression,
    pub descending: bool,
    pub text: String,
}

// ============================================================================
// 表达式
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// 字面量（含已内联的参数）
    Literal(Value),
    Variable(String),
    /// 属性访问 (variable, key)
    Property(String, String),
    /// 含非常量元素的列表
    List(Vec<Expression>),
    /// 含非常量值的映射
    Map(Vec<(String, Expression)>),
    Binary(Box<Expression>, BinaryOperator, Box<Expression>),
    Not(Box<Expression>),
    Negate(Box<Expression>),
    IsNull(Box<Expression>),
    IsNotNull(Box<Expression>),
    /// 函数调用，名称已转小写
    Function {
        name: String,
        distinct: bool,
        args: Vec<Expression>,
    },
    /// `count(*)`
    CountStar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Or,
    Xor,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    StartsWith,
    EndsWith,
    Contains,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// 聚合函数名
pub(crate) const AGGREGATES: &[&str] = &["count", "collect", "sum", "min", "max", "avg"];

impl Expression {
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Expression::Literal(v) => Some(v),
            _ => None,
        }
    }

    /// 顶层是否为聚合调用
    pub fn is_aggregate(&self) -> bool {
        match self {
            Expression::CountStar => true,
            Expression::Function { name, .. } => AGGREGATES.contains(&name.as_str()),
            _ => false,
        }
    }

    /// 子表达式中是否含聚合调用
    pub fn contains_aggregate(&self) -> bool {
        if self.is_aggregate() {
            return true;
        }
        match self {
            Expression::List(items) => items.iter().any(Expression::contains_aggregate),
            Expression::Map(entries) => entries.iter().any(|(_, e)| e.contains_aggregate()),
            Expression::Binary(l, _, r) => l.contains_aggregate() || r.contains_aggregate(),
            Expression::Not(e)
            | Expression::Negate(e)
            | Expression::IsNull(e)
            | Expression::IsNotNull(e) => e.contains_aggregate(),
            Expression::Function { args, .. } => args.iter().any(Expression::contains_aggregate),
            _ => false,
        }
    }
}

// ============================================================================
// 解析结果
// ============================================================================

/// 解析后的 Cypher 查询，可驱动任意 [`GremlinSteps`] 后端
#[derive(Debug, Clone)]
pub struct CypherAst {
    pub(crate) query: Query,
    pub(crate) options: StatementOptions,
}

impl CypherAst {
    /// 解析查询文本，`$name` 引用从 `parameters` 内联
    pub fn parse(text: &str, parameters: &Parameters) -> Result<Self> {
        super::parser::CypherParser::new(text, parameters).parse()
    }

    pub fn options(&self) -> &StatementOptions {
        &self.options
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// 按配置选择后端并生成翻译结果
    pub fn build_translation(&self, config: TranslatorConfig) -> Result<Translation> {
        Translator::new(config).translate(self)
    }
}

impl TranslationVisitor for CypherAst {
    fn visit<S: GremlinSteps>(&self, steps: &mut S) -> Result<()> {
        super::walker::walk(&self.query, steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_rendering() {
        let mut options = StatementOptions::default();
        assert_eq!(options.to_string(), "[]");
        options.insert(StatementOption::Explain);
        options.insert(StatementOption::Explain);
        assert!(options.is_explain());
        assert_eq!(options.to_string(), "[EXPLAIN]");
    }

    #[test]
    fn test_aggregate_detection() {
        let count = Expression::Function {
            name: "count".to_string(),
            distinct: false,
            args: vec![Expression::Variable("n".to_string())],
        };
        assert!(count.is_aggregate());

        let nested = Expression::Binary(
            Box::new(count),
            BinaryOperator::Add,
            Box::new(Expression::Literal(Value::Int(1))),
        );
        assert!(!nested.is_aggregate());
        assert!(nested.contains_aggregate());
        assert!(!Expression::Property("n".into(), "name".into()).contains_aggregate());
    }
}
