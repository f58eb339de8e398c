//! 最短路径路由决策
//!
//! 控制器的全部可变状态都在 `RoutingEngine` 里：拓扑视图、主机位置表、
//! 各交换机的端口枚举。事件按顺序一个个交给 `handle`，不存在并发修改。

use std::collections::{BTreeSet, HashMap};

use super::directive::{Directive, FlowMatch, FlowRule, OutputPort, PacketOut};
use super::event::ControllerEvent;
use super::location::{HostLocation, HostLocationTable};
use super::packet::{FrameKind, PacketIn};
use super::path::shortest_path;
use super::topology::{DiscoverySnapshot, TopologyGraph};
use crate::config::ControllerConfig;
use crate::net::{Dpid, OFPP_MAX, PortNo};
use tracing::{debug, info, trace, warn};

/// 报文被丢弃（不下发任何指令）的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// 目的地址无法映射到已知的 edge 交换机
    UnknownDestination,
    /// 拓扑中不存在到目的交换机的路径
    NoRoute,
    /// 目的交换机上没有可广播的主机端口
    NoHostPorts,
    /// 路径的下一跳在邻接表里没有出端口
    MissingLink,
    /// 已学习的目的端口就是入端口
    HairpinSuppressed,
}

/// 对一个 packet-in 的处理决定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// LLDP 或无法分类的帧
    Ignore,
    /// 到达目的 edge 交换机但目的主机位置未知：向主机端口广播
    Flood { ports: Vec<PortNo> },
    /// 到达目的 edge 交换机且已知位置：单端口发出（IPv4 时附带规则）
    Deliver {
        port: PortNo,
        install: Option<FlowRule>,
    },
    /// 沿最短路径转发到下一跳并下发子网规则
    Route {
        path: Vec<Dpid>,
        port: PortNo,
        rule: FlowRule,
    },
    Drop(DropReason),
}

impl Decision {
    /// 转换成发给该交换机的指令序列（先装规则，再发包）。
    pub fn into_directives(self, pkt: &PacketIn) -> Vec<Directive> {
        let packet_out = |ports: Vec<PortNo>| {
            Directive::PacketOut(PacketOut {
                dpid: pkt.dpid,
                buffer: pkt.buffer,
                in_port: pkt.in_port,
                ports,
            })
        };
        match self {
            Decision::Ignore | Decision::Drop(_) => Vec::new(),
            Decision::Flood { ports } => vec![packet_out(ports)],
            Decision::Deliver { port, install } => install
                .map(Directive::InstallRule)
                .into_iter()
                .chain(std::iter::once(packet_out(vec![port])))
                .collect(),
            Decision::Route { port, rule, .. } => {
                vec![Directive::InstallRule(rule), packet_out(vec![port])]
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct RoutingEngine {
    cfg: ControllerConfig,
    topo: TopologyGraph,
    locations: HostLocationTable,
    switch_ports: HashMap<Dpid, BTreeSet<PortNo>>,
}

impl RoutingEngine {
    pub fn new(cfg: ControllerConfig) -> Self {
        Self {
            cfg,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.cfg
    }

    pub fn topology(&self) -> &TopologyGraph {
        &self.topo
    }

    pub fn locations(&self) -> &HostLocationTable {
        &self.locations
    }

    /// 按事件类型分发
    pub fn handle(&mut self, ev: ControllerEvent) -> Vec<Directive> {
        match ev {
            ControllerEvent::SwitchConnected { dpid, ports } => {
                self.on_switch_connected(dpid, ports)
            }
            ControllerEvent::TopologyRebuilt(snapshot) => {
                self.on_topology_rebuilt(&snapshot);
                Vec::new()
            }
            ControllerEvent::PacketArrived(pkt) => self.on_packet_in(&pkt),
        }
    }

    /// 记录端口枚举，并下发 table-miss 规则（未匹配报文上送控制器）。
    #[tracing::instrument(skip(self, ports), fields(dpid = %dpid, ports = ports.len()))]
    pub fn on_switch_connected(&mut self, dpid: Dpid, ports: Vec<PortNo>) -> Vec<Directive> {
        info!("🔌 交换机已连接");
        self.switch_ports.insert(dpid, ports.into_iter().collect());
        vec![Directive::InstallRule(FlowRule {
            dpid,
            priority: self.cfg.table_miss_priority,
            matcher: FlowMatch::All,
            out: OutputPort::Controller,
        })]
    }

    pub fn on_topology_rebuilt(&mut self, snapshot: &DiscoverySnapshot) {
        self.topo.rebuild(snapshot);
    }

    #[tracing::instrument(skip(self, pkt), fields(dpid = %pkt.dpid, in_port = pkt.in_port, kind = ?pkt.frame.kind()))]
    pub fn on_packet_in(&mut self, pkt: &PacketIn) -> Vec<Directive> {
        let decision = self.decide(pkt);
        debug!(?decision, "决策完成");
        decision.into_directives(pkt)
    }

    /// 处理一个到达的报文：学习源位置，然后决定广播/单播/沿路径转发/丢弃。
    pub fn decide(&mut self, pkt: &PacketIn) -> Decision {
        let Some((src, dst)) = pkt.frame.addrs() else {
            trace!("忽略非 IPv4/ARP 帧");
            return Decision::Ignore;
        };
        let plan = self.cfg.addressing;

        if plan.home_edge_switch(src) == Some(pkt.dpid) {
            let loc = HostLocation {
                dpid: pkt.dpid,
                port: pkt.in_port,
            };
            if let Some(old) = self.locations.learn(src, loc) {
                info!(%src, old_port = old.port, new_port = loc.port, "主机位置变化");
            }
        }

        let dst_home = plan.home_edge_switch(dst);
        if dst_home == Some(pkt.dpid) {
            return self.decide_at_home(pkt, dst);
        }

        let Some(dst_home) = dst_home.filter(|d| self.topo.has_switch(*d)) else {
            debug!(%dst, "目的交换机未知");
            return Decision::Drop(DropReason::UnknownDestination);
        };
        let Some(path) = shortest_path(&self.topo, pkt.dpid, dst_home) else {
            debug!(%dst, dst_home = %dst_home, "无路径");
            return Decision::Drop(DropReason::NoRoute);
        };
        if path.len() < 2 {
            return Decision::Drop(DropReason::NoRoute);
        }
        let Some(port) = self.topo.neighbor_port(pkt.dpid, path[1]) else {
            warn!(next = %path[1], "下一跳没有出端口");
            return Decision::Drop(DropReason::MissingLink);
        };

        let (network, prefix_len) = plan.subnet_of(dst);
        let rule = FlowRule {
            dpid: pkt.dpid,
            priority: self.cfg.flow_priority,
            matcher: FlowMatch::Ipv4DstSubnet {
                network,
                prefix_len,
            },
            out: OutputPort::Physical(port),
        };
        info!(%src, %dst, out_port = port, ?path, "➡️  沿最短路径转发");
        Decision::Route { path, port, rule }
    }

    fn decide_at_home(&self, pkt: &PacketIn, dst: std::net::Ipv4Addr) -> Decision {
        if let Some(loc) = self.locations.get(dst) {
            if loc.port == pkt.in_port {
                return Decision::Drop(DropReason::HairpinSuppressed);
            }
            let install = (pkt.frame.kind() == FrameKind::Ipv4).then(|| FlowRule {
                dpid: pkt.dpid,
                priority: self.cfg.flow_priority,
                matcher: FlowMatch::Ipv4Dst { addr: dst },
                out: OutputPort::Physical(loc.port),
            });
            info!(%dst, out_port = loc.port, "📬 交付给已知主机");
            return Decision::Deliver {
                port: loc.port,
                install,
            };
        }

        let ports: Vec<PortNo> = self
            .host_ports(pkt.dpid)
            .into_iter()
            .filter(|p| *p != pkt.in_port)
            .collect();
        if ports.is_empty() {
            debug!(%dst, "没有可广播的主机端口");
            return Decision::Drop(DropReason::NoHostPorts);
        }
        info!(%dst, ?ports, "📢 向主机端口广播");
        Decision::Flood { ports }
    }

    /// 主机侧端口：物理端口（< OFPP_MAX）减去交换机间端口。
    ///
    /// 未上报端口枚举的交换机返回空集。
    pub fn host_ports(&self, dpid: Dpid) -> BTreeSet<PortNo> {
        let Some(all) = self.switch_ports.get(&dpid) else {
            return BTreeSet::new();
        };
        let inter = self.topo.inter_switch_ports(dpid);
        all.iter()
            .copied()
            .filter(|p| *p < OFPP_MAX && !inter.contains(p))
            .collect()
    }
}
