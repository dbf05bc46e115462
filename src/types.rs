//! 通用类型定义
//!
//! 遍历引擎与 Cypher 结果共享的值域

use crate::graph::{EdgeId, VertexId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Cypher 查询参数
pub type Parameters = IndexMap<String, Value>;

/// 结果行（列顺序即 RETURN 声明顺序）
pub type Row = IndexMap<String, Value>;

/// 遍历中的 Cypher `null` 哨兵值
pub const NULL_SENTINEL: &str = "  cypher.null";

/// 顶点引用
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VertexRef {
    pub id: VertexId,
    pub label: String,
}

/// 边引用
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeRef {
    pub id: EdgeId,
    pub label: String,
    pub out_v: VertexId,
    pub in_v: VertexId,
}

/// 属性所属元素
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementRef {
    Vertex(VertexId),
    Edge(EdgeId),
}

/// 属性引用（`properties()` 步骤的输出）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyRef {
    pub owner: ElementRef,
    pub key: String,
    pub value: Box<Value>,
}

/// 值
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(#[serde(with = "indexmap::map::serde_seq")] IndexMap<Value, Value>),
    Vertex(VertexRef),
    Edge(EdgeRef),
    Property(PropertyRef),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Vertex(_) => "vertex",
            Value::Edge(_) => "edge",
            Value::Property(_) => "property",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null 或 null 哨兵
    pub fn is_cypher_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s == NULL_SENTINEL,
            _ => false,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<Value, Value>> {
        match self {
            Value::Map(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn null_sentinel() -> Self {
        Value::String(NULL_SENTINEL.to_string())
    }

    /// 以字符串键构造映射
    pub fn map_from<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (Value::String(k.into()), v))
                .collect(),
        )
    }

    /// 类型排序等级，用于跨类型比较
    fn rank(&self) -> u8 {
        match self {
            Value::Map(_) => 0,
            Value::Vertex(_) => 1,
            Value::Edge(_) => 2,
            Value::Property(_) => 3,
            Value::List(_) => 4,
            Value::String(_) => 5,
            Value::Bool(_) => 6,
            Value::Int(_) | Value::Float(_) => 7,
            Value::Null => 8,
        }
    }

    /// 全序比较（排序用），null 与 null 哨兵排在最后
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self.is_cypher_null(), other.is_cypher_null()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            _ => {}
        }
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (a, b) if a.is_number() && b.is_number() => {
                let (x, y) = (a.as_float().unwrap_or(0.0), b.as_float().unwrap_or(0.0));
                x.total_cmp(&y)
            }
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.compare(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Vertex(a), Value::Vertex(b)) => a.id.cmp(&b.id),
            (Value::Edge(a), Value::Edge(b)) => a.id.cmp(&b.id),
            (Value::Property(a), Value::Property(b)) => a
                .key
                .cmp(&b.key)
                .then_with(|| a.value.compare(&b.value)),
            (Value::Map(a), Value::Map(b)) => a.len().cmp(&b.len()),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// 转换为自然 JSON（HTTP 输出用）
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
            Value::Vertex(v) => serde_json::json!({ "id": v.id.as_u64(), "label": v.label }),
            Value::Edge(e) => serde_json::json!({
                "id": e.id.as_u64(),
                "label": e.label,
                "outV": e.out_v.as_u64(),
                "inV": e.in_v.as_u64(),
            }),
            Value::Property(p) => serde_json::json!({ "key": p.key, "value": p.value.to_json() }),
        }
    }

    /// 从 JSON 转换（HTTP 参数用）
    pub fn from_json(json: &serde_json::Value) -> Value {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(0.0)),
            },
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            Json::Object(map) => {
                Value::map_from(map.iter().map(|(k, v)| (k.clone(), Value::from_json(v))))
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y)
            }
            (Value::Vertex(a), Value::Vertex(b)) => a == b,
            (Value::Edge(a), Value::Edge(b)) => a == b,
            (Value::Property(a), Value::Property(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::List(items) => items.hash(state),
            Value::Map(map) => {
                map.len().hash(state);
                for (k, v) in map {
                    k.hash(state);
                    v.hash(state);
                }
            }
            Value::Vertex(v) => v.hash(state),
            Value::Edge(e) => e.hash(state),
            Value::Property(p) => p.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Vertex(v) => write!(f, "v[{}]", v.id.as_u64()),
            Value::Edge(e) => write!(
                f,
                "e[{}][{}-{}->{}]",
                e.id.as_u64(),
                e.out_v.as_u64(),
                e.label,
                e.in_v.as_u64()
            ),
            Value::Property(p) => write!(f, "p[{}->{}]", p.key, p.value),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_float_equality_and_hash() {
        let mut set = HashSet::new();
        set.insert(Value::Float(1.5));
        set.insert(Value::Float(1.5));
        set.insert(Value::Int(1));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_compare_mixed_numbers() {
        assert_eq!(Value::Int(2).compare(&Value::Float(1.5)), Ordering::Greater);
        assert_eq!(Value::Int(1).compare(&Value::Int(1)), Ordering::Equal);
        assert_eq!(
            Value::from("a").compare(&Value::from("b")),
            Ordering::Less
        );
    }

    #[test]
    fn test_nulls_sort_last() {
        assert_eq!(
            Value::null_sentinel().compare(&Value::Int(1)),
            Ordering::Greater
        );
        assert_eq!(Value::Null.compare(&Value::null_sentinel()), Ordering::Equal);
    }

    #[test]
    fn test_json_conversion() {
        let value = Value::map_from(vec![
            ("name", Value::from("Alice")),
            ("tags", Value::List(vec![Value::Int(1), Value::Null])),
        ]);
        let json = value.to_json();
        assert_eq!(json["name"], "Alice");
        assert_eq!(json["tags"][1], serde_json::Value::Null);
        assert_eq!(Value::from_json(&json), value);
    }

    #[test]
    fn test_cypher_null() {
        assert!(Value::Null.is_cypher_null());
        assert!(Value::null_sentinel().is_cypher_null());
        assert!(!Value::from("null").is_cypher_null());
    }
}
