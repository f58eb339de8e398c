//! 节点与边
//!
//! 定义图中的节点类型（core/aggregation/edge/host）以及无向边。

use super::id::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};

/// 节点类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Core,
    Aggregation,
    Edge,
    Host,
}

/// 主机坐标：用于推导主机地址。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostCoords {
    pub pod: usize,
    pub edge: usize,
    pub host: usize,
}

/// 图节点，持有自己的关联边列表。
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    name: String,
    kind: NodeKind,
    coords: Option<HostCoords>,
    pub(crate) edges: Vec<EdgeId>,
}

impl Node {
    pub(crate) fn new(id: NodeId, name: String, kind: NodeKind, coords: Option<HostCoords>) -> Self {
        Self {
            id,
            name,
            kind,
            coords,
            edges: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// 仅主机节点带有坐标
    pub fn coords(&self) -> Option<HostCoords> {
        self.coords
    }

    /// 关联边（按连接顺序）
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }
}

/// 无向边（单位代价）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub left: NodeId,
    pub right: NodeId,
}

impl Edge {
    /// 给定一个端点，返回另一个端点。
    pub fn other(&self, n: NodeId) -> Option<NodeId> {
        if self.left == n {
            Some(self.right)
        } else if self.right == n {
            Some(self.left)
        } else {
            None
        }
    }
}
