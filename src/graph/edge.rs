//! 边定义

use crate::graph::vertex::VertexId;
use crate::types::{EdgeRef, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 边 ID（全局唯一）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u64);

impl EdgeId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for EdgeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// 边
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// 边 ID
    id: EdgeId,
    /// 边标签
    label: String,
    /// 源顶点 ID
    src: VertexId,
    /// 目标顶点 ID
    dst: VertexId,
    /// 属性
    #[serde(with = "indexmap::map::serde_seq")]
    properties: IndexMap<String, Value>,
}

impl Edge {
    /// 创建新边
    pub fn new(id: EdgeId, label: impl Into<String>, src: VertexId, dst: VertexId) -> Self {
        Self {
            id,
            label: label.into(),
            src,
            dst,
            properties: IndexMap::new(),
        }
    }

    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// 源顶点（出点）
    pub fn src(&self) -> VertexId {
        self.src
    }

    /// 目标顶点（入点）
    pub fn dst(&self) -> VertexId {
        self.dst
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn set_property(&mut self, key: String, value: Value) {
        self.properties.insert(key, value);
    }

    pub fn remove_property(&mut self, key: &str) -> Option<Value> {
        self.properties.shift_remove(key)
    }

    pub fn properties(&self) -> &IndexMap<String, Value> {
        &self.properties
    }

    pub fn to_ref(&self) -> EdgeRef {
        EdgeRef {
            id: self.id,
            label: self.label.clone(),
            out_v: self.src,
            in_v: self.dst,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_ref() {
        let mut e = Edge::new(EdgeId::new(3), "knows", VertexId::new(1), VertexId::new(2));
        e.set_property("since".to_string(), Value::Int(2010));

        let r = e.to_ref();
        assert_eq!(r.out_v, VertexId::new(1));
        assert_eq!(r.in_v, VertexId::new(2));
        assert_eq!(r.label, "knows");
        assert_eq!(e.property("since"), Some(&Value::Int(2010)));
    }
}
