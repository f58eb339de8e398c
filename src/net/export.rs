//! 图导出（JSON）
//!
//! 供仿真/可视化工具实例化拓扑：节点列表 + 无向链路列表。

use serde::{Deserialize, Serialize};

use super::graph::Graph;
use super::node::{HostCoords, NodeKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: usize,
    pub name: String,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub coords: Option<HostCoords>,
    /// 交换机的 datapath id
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dpid: Option<u64>,
    /// 主机地址
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub left: usize,
    pub right: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<NodeInfo>,
    pub links: Vec<LinkInfo>,
}

impl Graph {
    /// 导出节点与链路（不含 dpid/地址，由上层补全）
    pub fn export(&self) -> GraphExport {
        let nodes = self
            .nodes()
            .iter()
            .map(|n| NodeInfo {
                id: n.id().0,
                name: n.name().to_string(),
                kind: n.kind(),
                coords: n.coords(),
                dpid: None,
                ip: None,
            })
            .collect();
        let links = self
            .edges()
            .map(|(_, e)| LinkInfo {
                left: e.left.0,
                right: e.right.0,
            })
            .collect();
        GraphExport { nodes, links }
    }
}
