//! 顶点定义

use crate::types::{Value, VertexRef};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 顶点 ID（全局唯一）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(pub u64);

impl VertexId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for VertexId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// 顶点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex {
    /// 顶点 ID
    id: VertexId,
    /// 顶点标签
    label: String,
    /// 属性（保持插入顺序）
    #[serde(with = "indexmap::map::serde_seq")]
    properties: IndexMap<String, Value>,
}

impl Vertex {
    /// 创建新顶点
    pub fn new(id: VertexId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            properties: IndexMap::new(),
        }
    }

    /// 获取顶点 ID
    pub fn id(&self) -> VertexId {
        self.id
    }

    /// 获取顶点标签
    pub fn label(&self) -> &str {
        &self.label
    }

    /// 获取属性
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// 设置属性
    pub fn set_property(&mut self, key: String, value: Value) {
        self.properties.insert(key, value);
    }

    /// 移除属性
    pub fn remove_property(&mut self, key: &str) -> Option<Value> {
        self.properties.shift_remove(key)
    }

    /// 获取所有属性
    pub fn properties(&self) -> &IndexMap<String, Value> {
        &self.properties
    }

    /// 遍历中使用的引用
    pub fn to_ref(&self) -> VertexRef {
        VertexRef {
            id: self.id,
            label: self.label.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_properties() {
        let mut v = Vertex::new(VertexId::new(1), "person");
        v.set_property("name".to_string(), Value::from("Alice"));
        v.set_property("age".to_string(), Value::Int(30));

        assert_eq!(v.id().as_u64(), 1);
        assert_eq!(v.label(), "person");
        assert_eq!(v.property("name"), Some(&Value::from("Alice")));
        let keys: Vec<&String> = v.properties().keys().collect();
        assert_eq!(keys, vec!["name", "age"]);

        assert_eq!(v.remove_property("name"), Some(Value::from("Alice")));
        assert!(v.property("name").is_none());
    }
}
