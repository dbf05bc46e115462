//! 图数据结构
//!
//! 内存属性图，遍历引擎的存储后端

use super::edge::{Edge, EdgeId};
use super::index::{EdgeIndex, VertexIndex};
use super::vertex::{Vertex, VertexId};
use crate::error::{Error, Result};
use crate::metrics;
use crate::types::Value;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 图数据库
pub struct Graph {
    /// 顶点索引
    vertex_index: VertexIndex,
    /// 边索引
    edge_index: EdgeIndex,
    /// 下一个顶点 ID
    next_vertex_id: AtomicU64,
    /// 下一个边 ID
    next_edge_id: AtomicU64,
    /// 顶点表（保持插入顺序）
    vertices: RwLock<IndexMap<VertexId, Vertex>>,
    /// 边表（保持插入顺序）
    edges: RwLock<IndexMap<EdgeId, Edge>>,
}

impl Graph {
    /// 创建内存图
    pub fn in_memory() -> Arc<Self> {
        Arc::new(Self {
            vertex_index: VertexIndex::new(),
            edge_index: EdgeIndex::new(),
            next_vertex_id: AtomicU64::new(1),
            next_edge_id: AtomicU64::new(1),
            vertices: RwLock::new(IndexMap::new()),
            edges: RwLock::new(IndexMap::new()),
        })
    }

    // ==================== 顶点操作 ====================

    /// 添加顶点
    pub fn add_vertex(&self, label: &str) -> VertexId {
        let id = VertexId::new(self.next_vertex_id.fetch_add(1, Ordering::SeqCst));
        let vertex = Vertex::new(id, label);

        self.vertex_index.add_label(label, id);
        self.vertices.write().insert(id, vertex);
        metrics::global_metrics().record_vertex_insert();

        id
    }

    /// 添加带属性的顶点
    pub fn add_vertex_with<I, K>(&self, label: &str, properties: I) -> VertexId
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let id = self.add_vertex(label);
        if let Some(vertex) = self.vertices.write().get_mut(&id) {
            for (key, value) in properties {
                vertex.set_property(key.into(), value);
            }
        }
        id
    }

    /// 获取顶点
    pub fn get_vertex(&self, id: VertexId) -> Option<Vertex> {
        self.vertices.read().get(&id).cloned()
    }

    /// 获取全部顶点（按插入顺序）
    pub fn vertices(&self) -> Vec<Vertex> {
        self.vertices.read().values().cloned().collect()
    }

    /// 获取标签下的所有顶点
    pub fn get_vertices_by_label(&self, label: &str) -> Vec<Vertex> {
        self.vertex_index
            .get_by_label(label)
            .into_iter()
            .filter_map(|id| self.get_vertex(id))
            .collect()
    }

    /// 设置顶点属性
    pub fn set_vertex_property(&self, id: VertexId, key: &str, value: Value) -> Result<()> {
        let mut vertices = self.vertices.write();
        let vertex = vertices
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("顶点 {:?} 不存在", id)))?;
        vertex.set_property(key.to_string(), value);
        Ok(())
    }

    /// 移除顶点属性
    pub fn remove_vertex_property(&self, id: VertexId, key: &str) -> Result<()> {
        let mut vertices = self.vertices.write();
        let vertex = vertices
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("顶点 {:?} 不存在", id)))?;
        vertex.remove_property(key);
        Ok(())
    }

    /// 删除顶点（连同相关的边）
    pub fn remove_vertex(&self, id: VertexId) -> Result<()> {
        let vertex = self.vertices.write().shift_remove(&id);
        if let Some(v) = vertex {
            self.vertex_index.remove(id, v.label());
        }

        let outgoing = self.edge_index.get_outgoing(id);
        let incoming = self.edge_index.get_incoming(id);

        for edge_id in outgoing.into_iter().chain(incoming) {
            self.remove_edge(edge_id)?;
        }

        Ok(())
    }

    /// 获取顶点数量
    pub fn vertex_count(&self) -> usize {
        self.vertices.read().len()
    }

    // ==================== 边操作 ====================

    /// 添加边
    pub fn add_edge(&self, label: &str, src: VertexId, dst: VertexId) -> Result<EdgeId> {
        // 验证顶点存在
        if !self.vertices.read().contains_key(&src) {
            return Err(Error::NotFound(format!("源顶点 {:?} 不存在", src)));
        }
        if !self.vertices.read().contains_key(&dst) {
            return Err(Error::NotFound(format!("目标顶点 {:?} 不存在", dst)));
        }

        let id = EdgeId::new(self.next_edge_id.fetch_add(1, Ordering::SeqCst));
        let edge = Edge::new(id, label, src, dst);

        self.edge_index.add_edge(id, src, dst);
        self.edges.write().insert(id, edge);
        metrics::global_metrics().record_edge_insert();

        Ok(id)
    }

    /// 获取边
    pub fn get_edge(&self, id: EdgeId) -> Option<Edge> {
        self.edges.read().get(&id).cloned()
    }

    /// 获取全部边（按插入顺序）
    pub fn edges(&self) -> Vec<Edge> {
        self.edges.read().values().cloned().collect()
    }

    /// 获取顶点的所有出边
    pub fn get_outgoing_edges(&self, vertex_id: VertexId) -> Vec<Edge> {
        self.edge_index
            .get_outgoing(vertex_id)
            .into_iter()
            .filter_map(|id| self.get_edge(id))
            .collect()
    }

    /// 获取顶点的所有入边
    pub fn get_incoming_edges(&self, vertex_id: VertexId) -> Vec<Edge> {
        self.edge_index
            .get_incoming(vertex_id)
            .into_iter()
            .filter_map(|id| self.get_edge(id))
            .collect()
    }

    /// 设置边属性
    pub fn set_edge_property(&self, id: EdgeId, key: &str, value: Value) -> Result<()> {
        let mut edges = self.edges.write();
        let edge = edges
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("边 {:?} 不存在", id)))?;
        edge.set_property(key.to_string(), value);
        Ok(())
    }

    /// 移除边属性
    pub fn remove_edge_property(&self, id: EdgeId, key: &str) -> Result<()> {
        let mut edges = self.edges.write();
        let edge = edges
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("边 {:?} 不存在", id)))?;
        edge.remove_property(key);
        Ok(())
    }

    /// 删除边
    pub fn remove_edge(&self, id: EdgeId) -> Result<()> {
        self.edges.write().shift_remove(&id);
        self.edge_index.remove(id);
        Ok(())
    }

    /// 获取边数量
    pub fn edge_count(&self) -> usize {
        self.edges.read().len()
    }

    /// 获取顶点的出度
    pub fn out_degree(&self, vertex_id: VertexId) -> usize {
        self.edge_index.out_degree(vertex_id)
    }

    /// 获取顶点的入度
    pub fn in_degree(&self, vertex_id: VertexId) -> usize {
        self.edge_index.in_degree(vertex_id)
    }

    /// 当前使用中的顶点标签
    pub fn vertex_labels(&self) -> Vec<String> {
        self.vertex_index.labels()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_basic() {
        let graph = Graph::in_memory();

        let v1 = graph.add_vertex_with("person", vec![("name", Value::from("Alice"))]);
        let v2 = graph.add_vertex_with("person", vec![("name", Value::from("Bob"))]);
        assert_eq!(graph.vertex_count(), 2);

        let e1 = graph.add_edge("knows", v1, v2).unwrap();
        assert_eq!(graph.edge_count(), 1);

        let out = graph.get_outgoing_edges(v1);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id(), e1);
        assert_eq!(graph.get_incoming_edges(v2)[0].src(), v1);
        assert_eq!(graph.get_vertices_by_label("person").len(), 2);
    }

    #[test]
    fn test_graph_degrees() {
        let graph = Graph::in_memory();

        let v1 = graph.add_vertex("person");
        let v2 = graph.add_vertex("person");
        let v3 = graph.add_vertex("person");

        graph.add_edge("knows", v1, v2).unwrap();
        graph.add_edge("knows", v1, v3).unwrap();
        graph.add_edge("knows", v2, v3).unwrap();

        assert_eq!(graph.out_degree(v1), 2);
        assert_eq!(graph.in_degree(v3), 2);
    }

    #[test]
    fn test_remove_vertex_detaches_edges() {
        let graph = Graph::in_memory();
        let v1 = graph.add_vertex("person");
        let v2 = graph.add_vertex("person");
        graph.add_edge("knows", v1, v2).unwrap();

        graph.remove_vertex(v1).unwrap();
        assert_eq!(graph.vertex_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.in_degree(v2), 0);
    }

    #[test]
    fn test_add_edge_missing_vertex() {
        let graph = Graph::in_memory();
        let v1 = graph.add_vertex("person");
        let result = graph.add_edge("knows", v1, VertexId::new(99));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_property_updates() {
        let graph = Graph::in_memory();
        let v = graph.add_vertex("person");
        graph.set_vertex_property(v, "age", Value::Int(3)).unwrap();
        assert_eq!(
            graph.get_vertex(v).unwrap().property("age"),
            Some(&Value::Int(3))
        );
        graph.remove_vertex_property(v, "age").unwrap();
        assert!(graph.get_vertex(v).unwrap().property("age").is_none());
    }
}
