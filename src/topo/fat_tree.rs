//! Fat-tree 拓扑构建
//!
//! 给定端口数 `k`（偶数）生成完整的 fat-tree 图：
//! `(k/2)^2` 个 core，`k` 个 pod（每个 pod `k/2` 个 aggregation + `k/2` 个 edge），
//! 每个 edge 下挂 `k/2` 个主机。相同的 `k` 总是得到相同的节点名与邻接结构。

use std::collections::HashMap;
use std::net::Ipv4Addr;

use super::addressing::{AddressPlan, COORD_LIMIT, SwitchTier, dpid_of};
use crate::net::{Dpid, Graph, GraphError, GraphExport, HostCoords, NodeId, NodeKind};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("invalid fat-tree parameter k={k}: {reason}")]
    InvalidParameter { k: usize, reason: &'static str },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

#[derive(Debug, Clone)]
pub struct FatTree {
    pub k: usize,
    graph: Graph,
    pub hosts: Vec<NodeId>,
    pub edge_switches: Vec<NodeId>,
    pub agg_switches: Vec<NodeId>,
    pub core_switches: Vec<NodeId>,
    dpids: HashMap<NodeId, Dpid>,
    by_dpid: HashMap<Dpid, NodeId>,
}

impl FatTree {
    fn half(&self) -> usize {
        self.k / 2
    }

    /// 按 (pod, edge, host) 取主机；越界返回 None
    pub fn host(&self, pod: usize, edge: usize, host: usize) -> Option<NodeId> {
        let half = self.half();
        if pod >= self.k || edge >= half || host >= half {
            return None;
        }
        self.hosts.get((pod * half + edge) * half + host).copied()
    }

    pub fn edge(&self, pod: usize, edge: usize) -> Option<NodeId> {
        self.pod_switch(&self.edge_switches, pod, edge)
    }

    pub fn agg(&self, pod: usize, agg: usize) -> Option<NodeId> {
        self.pod_switch(&self.agg_switches, pod, agg)
    }

    /// core 按 (组, 组内序号) 编址，组号对应其上联的 aggregation 序号
    pub fn core(&self, group: usize, index: usize) -> Option<NodeId> {
        let half = self.half();
        if group >= half || index >= half {
            return None;
        }
        self.core_switches.get(group * half + index).copied()
    }

    fn pod_switch(&self, list: &[NodeId], pod: usize, idx: usize) -> Option<NodeId> {
        let half = self.half();
        if pod >= self.k || idx >= half {
            return None;
        }
        list.get(pod * half + idx).copied()
    }

    /// 只读拓扑图；构建完成后不再变化
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// 所有交换机（core, aggregation, edge 顺序）
    pub fn switches(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.core_switches
            .iter()
            .chain(self.agg_switches.iter())
            .chain(self.edge_switches.iter())
            .copied()
    }

    /// 交换机节点的 datapath id；主机返回 None
    pub fn dpid(&self, node: NodeId) -> Option<Dpid> {
        self.dpids.get(&node).copied()
    }

    pub fn node_of_dpid(&self, dpid: Dpid) -> Option<NodeId> {
        self.by_dpid.get(&dpid).copied()
    }

    /// 主机地址
    pub fn host_ip(&self, node: NodeId, plan: &AddressPlan) -> Option<Ipv4Addr> {
        let coords = self.graph.node(node)?.coords()?;
        plan.host_ip(coords)
    }

    /// 主机所在的 edge 交换机
    pub fn home_edge_of(&self, host: NodeId) -> Option<NodeId> {
        let c = self.graph.node(host)?.coords()?;
        self.edge(c.pod, c.edge)
    }

    /// 导出 JSON（补全 dpid 与主机地址）
    pub fn export(&self, plan: &AddressPlan) -> GraphExport {
        let mut out = self.graph.export();
        for n in &mut out.nodes {
            let id = NodeId(n.id);
            n.dpid = self.dpid(id).map(|d| d.0);
            n.ip = self.host_ip(id, plan).map(|ip| ip.to_string());
        }
        out
    }
}

/// 构建 fat-tree；`k` 必须为正偶数（且坐标放得进 datapath id 编码）。
pub fn build_fat_tree(k: usize) -> Result<FatTree, BuildError> {
    if k == 0 {
        return Err(BuildError::InvalidParameter {
            k,
            reason: "k must be positive",
        });
    }
    if k % 2 != 0 {
        return Err(BuildError::InvalidParameter {
            k,
            reason: "k must be even",
        });
    }
    if k > COORD_LIMIT {
        return Err(BuildError::InvalidParameter {
            k,
            reason: "k exceeds the datapath id encoding",
        });
    }

    let half = k / 2;
    let mut graph = Graph::new();
    let mut dpids = HashMap::new();

    let mut add_switch = |graph: &mut Graph,
                          name: String,
                          kind: NodeKind,
                          major: usize,
                          minor: usize|
     -> Result<NodeId, BuildError> {
        let id = graph.add_node(name, kind)?;
        // 层级和坐标已由上面的 k 检查保证在编码范围内
        if let Some(dpid) = SwitchTier::of(kind).and_then(|t| dpid_of(t, major, minor)) {
            dpids.insert(id, dpid);
        }
        Ok(id)
    };

    let mut core_switches = Vec::with_capacity(half * half);
    for group in 0..half {
        for index in 0..half {
            let name = format!("c{}_{}", group, index);
            core_switches.push(add_switch(&mut graph, name, NodeKind::Core, group, index)?);
        }
    }

    let mut hosts = Vec::with_capacity(k * half * half);
    let mut edge_switches = Vec::with_capacity(k * half);
    let mut agg_switches = Vec::with_capacity(k * half);

    for pod in 0..k {
        let mut edges = Vec::with_capacity(half);
        let mut aggs = Vec::with_capacity(half);

        for agg in 0..half {
            let name = format!("p{}_a{}", pod, agg);
            aggs.push(add_switch(&mut graph, name, NodeKind::Aggregation, pod, agg)?);
        }
        for edge in 0..half {
            let name = format!("p{}_e{}", pod, edge);
            edges.push(add_switch(&mut graph, name, NodeKind::Edge, pod, edge)?);
        }

        for &edge_id in &edges {
            for &agg_id in &aggs {
                graph.connect(edge_id, agg_id)?;
            }
        }

        for (edge_idx, &edge_id) in edges.iter().enumerate() {
            for host in 0..half {
                let name = format!("h{}_{}_{}", pod, edge_idx, host);
                let coords = HostCoords {
                    pod,
                    edge: edge_idx,
                    host,
                };
                let host_id = graph.add_host(name, coords)?;
                graph.connect(host_id, edge_id)?;
                hosts.push(host_id);
            }
        }

        debug!(pod, aggs = aggs.len(), edges = edges.len(), "pod 构建完成");
        edge_switches.extend(edges);
        agg_switches.extend(aggs);
    }

    for pod in 0..k {
        for agg in 0..half {
            let agg_id = agg_switches[pod * half + agg];
            for index in 0..half {
                let core_id = core_switches[agg * half + index];
                graph.connect(agg_id, core_id)?;
            }
        }
    }

    let by_dpid = dpids.iter().map(|(n, d)| (*d, *n)).collect();

    info!(
        k,
        cores = core_switches.len(),
        aggs = agg_switches.len(),
        edges = edge_switches.len(),
        hosts = hosts.len(),
        links = graph.edge_count(),
        "🌲 fat-tree 构建完成"
    );

    Ok(FatTree {
        k,
        graph,
        hosts,
        edge_switches,
        agg_switches,
        core_switches,
        dpids,
        by_dpid,
    })
}
