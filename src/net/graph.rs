//! 拓扑图模型
//!
//! 通用的可变图：带类型的节点与无向边。边只能通过 `connect` 创建，
//! 会同时挂到两个端点上；`disconnect` 同时从两个端点摘除。

use std::collections::{BTreeSet, HashMap};

use super::id::{EdgeId, NodeId};
use super::node::{Edge, HostCoords, Node, NodeKind};
use tracing::trace;

/// 图构造错误（通常意味着构造序列有 bug）
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("duplicate node id `{0}`")]
    DuplicateId(String),

    #[error("invalid edge: self-loop on {0:?}")]
    InvalidEdge(NodeId),

    #[error("node {0:?} not found")]
    NodeNotFound(NodeId),

    #[error("edge {0:?} not found")]
    EdgeNotFound(EdgeId),
}

/// 拓扑图
#[derive(Debug, Default, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    /// 被 disconnect 的边留下 None 占位，保证 EdgeId 稳定
    edges: Vec<Option<Edge>>,
    by_name: HashMap<String, NodeId>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加节点；名字重复时报错。
    pub fn add_node(&mut self, name: impl Into<String>, kind: NodeKind) -> Result<NodeId, GraphError> {
        self.insert(name.into(), kind, None)
    }

    /// 添加带坐标的主机节点
    pub fn add_host(&mut self, name: impl Into<String>, coords: HostCoords) -> Result<NodeId, GraphError> {
        self.insert(name.into(), NodeKind::Host, Some(coords))
    }

    fn insert(
        &mut self,
        name: String,
        kind: NodeKind,
        coords: Option<HostCoords>,
    ) -> Result<NodeId, GraphError> {
        if self.by_name.contains_key(&name) {
            return Err(GraphError::DuplicateId(name));
        }
        let id = NodeId(self.nodes.len());
        trace!(?id, name = %name, ?kind, "添加节点");
        self.by_name.insert(name.clone(), id);
        self.nodes.push(Node::new(id, name, kind, coords));
        Ok(id)
    }

    /// 连接两个节点（创建一条无向边，挂到两个端点上）。
    ///
    /// 不做重复边抑制：调用方需要自行去重。
    pub fn connect(&mut self, a: NodeId, b: NodeId) -> Result<EdgeId, GraphError> {
        self.check_node(a)?;
        self.check_node(b)?;
        if a == b {
            return Err(GraphError::InvalidEdge(a));
        }
        let id = EdgeId(self.edges.len());
        self.edges.push(Some(Edge { left: a, right: b }));
        self.nodes[a.0].edges.push(id);
        self.nodes[b.0].edges.push(id);
        trace!(?id, left = ?a, right = ?b, "连接节点");
        Ok(id)
    }

    /// 断开一条边：两个端点都必须持有该边，否则不做任何修改。
    pub fn disconnect(&mut self, edge: EdgeId) -> Result<(), GraphError> {
        let Some(Some(e)) = self.edges.get(edge.0).copied() else {
            return Err(GraphError::EdgeNotFound(edge));
        };
        let left_pos = self.nodes[e.left.0].edges.iter().position(|x| *x == edge);
        let right_pos = self.nodes[e.right.0].edges.iter().position(|x| *x == edge);
        let (Some(lp), Some(rp)) = (left_pos, right_pos) else {
            return Err(GraphError::EdgeNotFound(edge));
        };
        self.nodes[e.left.0].edges.remove(lp);
        self.nodes[e.right.0].edges.remove(rp);
        self.edges[edge.0] = None;
        trace!(?edge, "断开边");
        Ok(())
    }

    /// 邻居集合
    pub fn neighbors(&self, n: NodeId) -> BTreeSet<NodeId> {
        let Some(node) = self.nodes.get(n.0) else {
            return BTreeSet::new();
        };
        node.edges
            .iter()
            .filter_map(|e| self.edge(*e))
            .filter_map(|e| e.other(n))
            .collect()
    }

    pub fn is_adjacent(&self, a: NodeId, b: NodeId) -> bool {
        let Some(node) = self.nodes.get(a.0) else {
            return false;
        };
        node.edges
            .iter()
            .filter_map(|e| self.edge(*e))
            .any(|e| e.other(a) == Some(b))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.by_name.get(name).and_then(|id| self.node(*id))
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.kind() == kind)
    }

    pub fn edge(&self, id: EdgeId) -> Option<Edge> {
        self.edges.get(id.0).copied().flatten()
    }

    /// 所有仍存在的边
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, Edge)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.map(|e| (EdgeId(i), e)))
    }

    pub fn degree(&self, n: NodeId) -> usize {
        self.node(n).map_or(0, |node| node.edges.len())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_some()).count()
    }

    fn check_node(&self, n: NodeId) -> Result<(), GraphError> {
        if n.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(GraphError::NodeNotFound(n))
        }
    }
}
