//! 控制器视角的交换机拓扑
//!
//! `dpid -> {邻居 dpid -> 出端口}`。每次收到完整的发现快照都整体重建，
//! 不做增量修补；主机侧端口不在这里，由端口枚举减去交换机间端口得到。

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::net::{Dpid, PortNo};
use tracing::{debug, info, warn};

/// 发现到的一条单向链路：`src` 从 `src_port` 发出可到达 `dst`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkReport {
    pub src: Dpid,
    pub src_port: PortNo,
    pub dst: Dpid,
}

/// 一次完整的拓扑发现结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoverySnapshot {
    pub switches: Vec<Dpid>,
    #[serde(default)]
    pub links: Vec<LinkReport>,
}

#[derive(Debug, Default, Clone)]
pub struct TopologyGraph {
    adj: HashMap<Dpid, HashMap<Dpid, PortNo>>,
}

impl TopologyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用快照整体替换邻接表。
    ///
    /// 先在新表里完成构建，再一次性替换，读者看不到半清空的状态。
    /// 链路按上报方向记录（只记在源端）；端点不在交换机集合中的链路被跳过。
    pub fn rebuild(&mut self, snapshot: &DiscoverySnapshot) {
        let mut adj: HashMap<Dpid, HashMap<Dpid, PortNo>> = snapshot
            .switches
            .iter()
            .map(|s| (*s, HashMap::new()))
            .collect();

        let mut skipped = 0usize;
        for link in &snapshot.links {
            if !adj.contains_key(&link.dst) {
                warn!(src = %link.src, dst = %link.dst, "链路终点不在交换机集合中，忽略");
                skipped += 1;
                continue;
            }
            match adj.get_mut(&link.src) {
                Some(nbrs) => {
                    nbrs.insert(link.dst, link.src_port);
                }
                None => {
                    warn!(src = %link.src, dst = %link.dst, "链路起点不在交换机集合中，忽略");
                    skipped += 1;
                }
            }
        }

        self.adj = adj;
        info!(
            switches = self.adj.len(),
            links = self.link_count(),
            skipped,
            "🗺️  拓扑已重建"
        );
        debug!(graph = ?self.adj, "邻接表");
    }

    pub fn has_switch(&self, dpid: Dpid) -> bool {
        self.adj.contains_key(&dpid)
    }

    /// `dpid` 通往 `neighbor` 的出端口
    pub fn neighbor_port(&self, dpid: Dpid, neighbor: Dpid) -> Option<PortNo> {
        self.adj.get(&dpid)?.get(&neighbor).copied()
    }

    /// `dpid` 的邻居及出端口；未知交换机返回空。
    pub fn neighbors(&self, dpid: Dpid) -> impl Iterator<Item = (Dpid, PortNo)> + '_ {
        self.adj
            .get(&dpid)
            .into_iter()
            .flat_map(|m| m.iter().map(|(d, p)| (*d, *p)))
    }

    /// 该交换机上连接其他交换机的端口
    pub fn inter_switch_ports(&self, dpid: Dpid) -> HashSet<PortNo> {
        self.neighbors(dpid).map(|(_, p)| p).collect()
    }

    pub fn switches(&self) -> BTreeSet<Dpid> {
        self.adj.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.adj.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adj.is_empty()
    }

    /// 单向链路条数
    pub fn link_count(&self) -> usize {
        self.adj.values().map(|m| m.len()).sum()
    }
}
