//! 仿真网络
//!
//! 每台交换机的端口按关联边顺序从 1 开始编号，另外附带 LOCAL 端口。
//! 报文从源主机所在 edge 交换机进入，逐跳查流表转发；
//! 命中“上送控制器”规则时同步调用 `RoutingEngine`，再按 packet-out 继续转发。

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::net::Ipv4Addr;

use super::flow_table::FlowTable;
use crate::ctrl::{
    ControllerEvent, Directive, DirectiveSink, DiscoverySnapshot, Frame, FrameKind, LinkReport,
    OutputPort, PacketHandle, PacketIn, PacketOut, RoutingEngine,
};
use crate::net::{Dpid, NodeId, OFPP_LOCAL, PortNo};
use crate::sim::{EventLoop, SimTime};
use crate::topo::addressing::AddressPlan;
use crate::topo::fat_tree::FatTree;
use tracing::{debug, info, trace, warn};

/// 相邻两台交换机完成握手的间隔
pub const HANDSHAKE_GAP: SimTime = SimTime::from_micros(10);
/// 链路发现（LLDP）在全部交换机上线后完成所需的时间
pub const DISCOVERY_DELAY: SimTime = SimTime::from_millis(1);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmuError {
    #[error("node {0:?} is not a host of this fabric")]
    UnknownHost(NodeId),

    #[error("switch node {0:?} has no datapath id")]
    MissingDpid(NodeId),

    #[error("host node {0:?} has no address")]
    MissingAddress(NodeId),
}

/// 端口对端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peer {
    Switch { dpid: Dpid, port: PortNo },
    Host(NodeId),
}

/// 一次发送的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    /// 目的主机收到的份数
    pub delivered: usize,
    /// 所有收到该报文的主机（含广播到的非目的主机）
    pub reached: Vec<NodeId>,
    /// 上送控制器次数
    pub punts: usize,
    /// 经过的交换机次数
    pub switch_hops: usize,
    /// 在交换机上被丢弃的份数（无匹配规则或控制器不处理）
    pub dropped: usize,
    /// 是否触发了跳数上限
    pub hop_limit_hit: bool,
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        self.delivered > 0
    }
}

#[derive(Debug, Default)]
pub struct Fabric {
    ports: HashMap<Dpid, BTreeMap<PortNo, Peer>>,
    host_attach: HashMap<NodeId, (Dpid, PortNo)>,
    host_ips: HashMap<NodeId, Ipv4Addr>,
    tables: HashMap<Dpid, FlowTable>,
    packet_outs: Vec<PacketOut>,
    next_buffer: u64,
    max_hops: usize,
}

impl Fabric {
    /// 按 fat-tree 实例化交换机端口与主机挂载点。
    pub fn from_fat_tree(
        ft: &FatTree,
        plan: &AddressPlan,
        max_hops: usize,
    ) -> Result<Self, EmuError> {
        let g = ft.graph();
        // 节点在某条边上的端口号 = 该边在其关联边列表中的位置 + 1
        let port_of = |n: NodeId, e| {
            g.node(n)
                .and_then(|node| node.edges().iter().position(|x| *x == e))
                .map(|i| i as PortNo + 1)
        };

        let mut fabric = Fabric {
            max_hops,
            ..Fabric::default()
        };

        for sw in ft.switches() {
            let dpid = ft.dpid(sw).ok_or(EmuError::MissingDpid(sw))?;
            let mut ports = BTreeMap::new();
            let Some(node) = g.node(sw) else {
                continue;
            };
            for (i, eid) in node.edges().iter().enumerate() {
                let port = i as PortNo + 1;
                let Some(other) = g.edge(*eid).and_then(|e| e.other(sw)) else {
                    continue;
                };
                let peer = match ft.dpid(other) {
                    Some(peer_dpid) => match port_of(other, *eid) {
                        Some(peer_port) => Peer::Switch {
                            dpid: peer_dpid,
                            port: peer_port,
                        },
                        None => continue,
                    },
                    None => {
                        fabric.host_attach.insert(other, (dpid, port));
                        Peer::Host(other)
                    }
                };
                ports.insert(port, peer);
            }
            fabric.ports.insert(dpid, ports);
            fabric.tables.insert(dpid, FlowTable::default());
        }

        for &h in &ft.hosts {
            let ip = ft.host_ip(h, plan).ok_or(EmuError::MissingAddress(h))?;
            fabric.host_ips.insert(h, ip);
        }

        info!(
            switches = fabric.ports.len(),
            hosts = fabric.host_attach.len(),
            "🧪 仿真网络已实例化"
        );
        Ok(fabric)
    }

    /// 交换机上报的端口枚举（含 LOCAL 端口）
    pub fn switch_ports(&self, dpid: Dpid) -> Vec<PortNo> {
        let mut ports: Vec<PortNo> = self
            .ports
            .get(&dpid)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default();
        ports.push(OFPP_LOCAL);
        ports
    }

    pub fn peer(&self, dpid: Dpid, port: PortNo) -> Option<Peer> {
        self.ports.get(&dpid)?.get(&port).copied()
    }

    pub fn host_ip(&self, host: NodeId) -> Option<Ipv4Addr> {
        self.host_ips.get(&host).copied()
    }

    pub fn host_attachment(&self, host: NodeId) -> Option<(Dpid, PortNo)> {
        self.host_attach.get(&host).copied()
    }

    pub fn flow_table(&self, dpid: Dpid) -> Option<&FlowTable> {
        self.tables.get(&dpid)
    }

    /// 完整的发现快照：每条交换机间链路两个方向各一条。
    pub fn discovery_snapshot(&self) -> DiscoverySnapshot {
        let mut switches: Vec<Dpid> = self.ports.keys().copied().collect();
        switches.sort();
        let mut links = Vec::new();
        for &src in &switches {
            for (port, peer) in &self.ports[&src] {
                if let Peer::Switch { dpid, .. } = peer {
                    links.push(LinkReport {
                        src,
                        src_port: *port,
                        dst: *dpid,
                    });
                }
            }
        }
        DiscoverySnapshot { switches, links }
    }

    /// 启动事件：每台交换机一个 SwitchConnected，然后一个完整发现快照。
    pub fn startup_events(&self) -> Vec<ControllerEvent> {
        let mut switches: Vec<Dpid> = self.ports.keys().copied().collect();
        switches.sort();
        let mut evs: Vec<ControllerEvent> = switches
            .into_iter()
            .map(|dpid| ControllerEvent::SwitchConnected {
                dpid,
                ports: self.switch_ports(dpid),
            })
            .collect();
        evs.push(ControllerEvent::TopologyRebuilt(self.discovery_snapshot()));
        evs
    }

    /// 通过事件循环投递启动事件，table-miss 规则装入各交换机流表。
    ///
    /// 交换机按 dpid 顺序每隔 `HANDSHAKE_GAP` 完成握手，
    /// 最后一台握手后再过 `DISCOVERY_DELAY` 送达发现快照。
    pub fn bring_up(&mut self, engine: &mut RoutingEngine) -> usize {
        let mut ev_loop = EventLoop::default();
        let mut at = SimTime::ZERO;
        for ev in self.startup_events() {
            at = match &ev {
                ControllerEvent::TopologyRebuilt(_) => at.after(DISCOVERY_DELAY),
                _ => at.after(HANDSHAKE_GAP),
            };
            ev_loop.schedule(at, ev);
        }
        let n = ev_loop.run(engine, self);
        debug!(events = n, ready_at = ?ev_loop.now(), "仿真网络启动完成");
        n
    }

    /// 一次完整的 ping：双向 ARP，然后双向 IPv4；四个报文都送达才算成功。
    pub fn ping(
        &mut self,
        engine: &mut RoutingEngine,
        a: NodeId,
        b: NodeId,
    ) -> Result<bool, EmuError> {
        let steps = [
            (a, b, FrameKind::Arp),
            (b, a, FrameKind::Arp),
            (a, b, FrameKind::Ipv4),
            (b, a, FrameKind::Ipv4),
        ];
        for (src, dst, kind) in steps {
            if !self.send(engine, src, dst, kind)?.is_delivered() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// 从 `src` 向 `dst` 发送一个报文并逐跳转发。
    #[tracing::instrument(skip(self, engine), fields(src = ?src, dst = ?dst, kind = ?kind))]
    pub fn send(
        &mut self,
        engine: &mut RoutingEngine,
        src: NodeId,
        dst: NodeId,
        kind: FrameKind,
    ) -> Result<Delivery, EmuError> {
        let (ingress, ingress_port) = self
            .host_attachment(src)
            .ok_or(EmuError::UnknownHost(src))?;
        let src_ip = self.host_ip(src).ok_or(EmuError::UnknownHost(src))?;
        let dst_ip = self.host_ip(dst).ok_or(EmuError::UnknownHost(dst))?;
        let frame = Frame::new(kind, src_ip, dst_ip);
        let dst_addr = frame.addrs().map(|(_, d)| d);

        let mut out = Delivery::default();
        let mut work: VecDeque<(Dpid, PortNo, usize)> = VecDeque::new();
        work.push_back((ingress, ingress_port, 1));

        while let Some((dpid, in_port, hops)) = work.pop_front() {
            if hops > self.max_hops {
                warn!(dpid = %dpid, hops, "超过跳数上限，丢弃");
                out.hop_limit_hit = true;
                out.dropped += 1;
                continue;
            }
            out.switch_hops += 1;

            let action = self
                .tables
                .get(&dpid)
                .and_then(|t| t.lookup(kind, dst_addr))
                .map(|r| r.out);
            let ports = match action {
                Some(OutputPort::Physical(p)) => vec![p],
                Some(OutputPort::Controller) => {
                    out.punts += 1;
                    self.punt(engine, dpid, in_port, frame)
                }
                None => Vec::new(),
            };
            if ports.is_empty() {
                trace!(dpid = %dpid, "报文在交换机上终止");
                out.dropped += 1;
                continue;
            }

            for p in ports {
                match self.peer(dpid, p) {
                    Some(Peer::Switch { dpid: next, port }) => {
                        work.push_back((next, port, hops + 1));
                    }
                    Some(Peer::Host(h)) => {
                        out.reached.push(h);
                        if h == dst {
                            out.delivered += 1;
                        }
                    }
                    None => {
                        debug!(dpid = %dpid, port = p, "端口无对端");
                        out.dropped += 1;
                    }
                }
            }
        }

        debug!(?out, "发送结束");
        Ok(out)
    }

    /// 上送控制器，应用返回的指令，返回当前报文的出端口。
    fn punt(
        &mut self,
        engine: &mut RoutingEngine,
        dpid: Dpid,
        in_port: PortNo,
        frame: Frame,
    ) -> Vec<PortNo> {
        let buffer = PacketHandle(self.next_buffer);
        self.next_buffer = self.next_buffer.wrapping_add(1);
        let pkt = PacketIn {
            dpid,
            in_port,
            buffer,
            frame,
        };
        for d in engine.handle(ControllerEvent::PacketArrived(pkt)) {
            self.apply(SimTime::ZERO, d);
        }

        let mut ports = Vec::new();
        self.packet_outs.retain(|po| {
            if po.dpid == dpid && po.buffer == buffer {
                ports.extend(po.ports.iter().copied());
                false
            } else {
                true
            }
        });
        ports
    }
}

impl DirectiveSink for Fabric {
    fn apply(&mut self, _now: SimTime, directive: Directive) {
        match directive {
            Directive::InstallRule(rule) => match self.tables.get_mut(&rule.dpid) {
                Some(t) => {
                    trace!(dpid = %rule.dpid, ?rule, "安装规则");
                    t.install(rule);
                }
                None => warn!(dpid = %rule.dpid, "规则指向未知交换机"),
            },
            Directive::PacketOut(po) => self.packet_outs.push(po),
        }
    }
}
