//! 图索引
//!
//! 顶点和边的内存索引，支持按标签与邻接关系快速查找

use crate::graph::edge::EdgeId;
use crate::graph::vertex::VertexId;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};

/// 顶点索引
pub struct VertexIndex {
    /// 标签到顶点 ID 集合的映射
    label_to_ids: RwLock<HashMap<String, BTreeSet<VertexId>>>,
}

impl VertexIndex {
    /// 创建新索引
    pub fn new() -> Self {
        Self {
            label_to_ids: RwLock::new(HashMap::new()),
        }
    }

    /// 添加标签索引
    pub fn add_label(&self, label: &str, vertex_id: VertexId) {
        self.label_to_ids
            .write()
            .entry(label.to_string())
            .or_default()
            .insert(vertex_id);
    }

    /// 获取标签下的所有顶点（按 ID 升序）
    pub fn get_by_label(&self, label: &str) -> Vec<VertexId> {
        self.label_to_ids
            .read()
            .get(label)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// 移除顶点
    pub fn remove(&self, vertex_id: VertexId, label: &str) {
        if let Some(set) = self.label_to_ids.write().get_mut(label) {
            set.remove(&vertex_id);
        }
    }

    /// 所有出现过的标签
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self
            .label_to_ids
            .read()
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(label, _)| label.clone())
            .collect();
        labels.sort();
        labels
    }
}

impl Default for VertexIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// 边索引
pub struct EdgeIndex {
    /// 源顶点到出边的映射
    outgoing: RwLock<HashMap<VertexId, Vec<EdgeId>>>,
    /// 目标顶点到入边的映射
    incoming: RwLock<HashMap<VertexId, Vec<EdgeId>>>,
    /// 边 ID 到 (src, dst) 的映射
    edge_endpoints: RwLock<HashMap<EdgeId, (VertexId, VertexId)>>,
}

impl EdgeIndex {
    /// 创建新索引
    pub fn new() -> Self {
        Self {
            outgoing: RwLock::new(HashMap::new()),
            incoming: RwLock::new(HashMap::new()),
            edge_endpoints: RwLock::new(HashMap::new()),
        }
    }

    /// 添加边
    pub fn add_edge(&self, edge_id: EdgeId, src: VertexId, dst: VertexId) {
        // 出边索引
        self.outgoing.write().entry(src).or_default().push(edge_id);

        // 入边索引
        self.incoming.write().entry(dst).or_default().push(edge_id);

        // 端点映射
        self.edge_endpoints.write().insert(edge_id, (src, dst));
    }

    /// 获取顶点的出边
    pub fn get_outgoing(&self, vertex_id: VertexId) -> Vec<EdgeId> {
        self.outgoing
            .read()
            .get(&vertex_id)
            .cloned()
            .unwrap_or_default()
    }

    /// 获取顶点的入边
    pub fn get_incoming(&self, vertex_id: VertexId) -> Vec<EdgeId> {
        self.incoming
            .read()
            .get(&vertex_id)
            .cloned()
            .unwrap_or_default()
    }

    /// 获取边的端点
    pub fn get_endpoints(&self, edge_id: EdgeId) -> Option<(VertexId, VertexId)> {
        self.edge_endpoints.read().get(&edge_id).copied()
    }

    /// 移除边
    pub fn remove(&self, edge_id: EdgeId) {
        if let Some((src, dst)) = self.edge_endpoints.write().remove(&edge_id) {
            if let Some(edges) = self.outgoing.write().get_mut(&src) {
                edges.retain(|&id| id != edge_id);
            }
            if let Some(edges) = self.incoming.write().get_mut(&dst) {
                edges.retain(|&id| id != edge_id);
            }
        }
    }

    /// 获取顶点的出度
    pub fn out_degree(&self, vertex_id: VertexId) -> usize {
        self.outgoing
            .read()
            .get(&vertex_id)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    /// 获取顶点的入度
    pub fn in_degree(&self, vertex_id: VertexId) -> usize {
        self.incoming
            .read()
            .get(&vertex_id)
            .map(|v| v.len())
            .unwrap_or(0)
    }
}

impl Default for EdgeIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_index() {
        let index = VertexIndex::new();
        index.add_label("person", VertexId::new(2));
        index.add_label("person", VertexId::new(1));
        index.add_label("software", VertexId::new(3));

        assert_eq!(
            index.get_by_label("person"),
            vec![VertexId::new(1), VertexId::new(2)]
        );
        assert_eq!(index.labels(), vec!["person", "software"]);

        index.remove(VertexId::new(3), "software");
        assert_eq!(index.labels(), vec!["person"]);
    }

    #[test]
    fn test_edge_index() {
        let index = EdgeIndex::new();
        let eid = EdgeId::new(1);
        let src = VertexId::new(100);
        let dst = VertexId::new(200);

        index.add_edge(eid, src, dst);

        assert_eq!(index.get_outgoing(src), vec![eid]);
        assert_eq!(index.get_incoming(dst), vec![eid]);
        assert_eq!(index.get_endpoints(eid), Some((src, dst)));
        assert_eq!(index.out_degree(src), 1);
        assert_eq!(index.in_degree(dst), 1);

        index.remove(eid);
        assert!(index.get_outgoing(src).is_empty());
        assert_eq!(index.get_endpoints(eid), None);
    }
}
