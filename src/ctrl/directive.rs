//! 控制器输出的指令
//!
//! 两类：下发流表规则、把当前报文从指定端口发出（packet-out）。

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use super::packet::{FrameKind, PacketHandle};
use crate::net::{Dpid, PortNo};
use crate::sim::SimTime;
use crate::topo::addressing::mask;

/// 流表匹配条件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlowMatch {
    /// 匹配所有报文（table-miss）
    All,
    /// IPv4 且目的地址精确匹配
    Ipv4Dst { addr: Ipv4Addr },
    /// IPv4 且目的地址落在子网内
    Ipv4DstSubnet { network: Ipv4Addr, prefix_len: u8 },
}

impl FlowMatch {
    pub fn matches(&self, kind: FrameKind, dst: Option<Ipv4Addr>) -> bool {
        match *self {
            FlowMatch::All => true,
            FlowMatch::Ipv4Dst { addr } => kind == FrameKind::Ipv4 && dst == Some(addr),
            FlowMatch::Ipv4DstSubnet {
                network,
                prefix_len,
            } => {
                kind == FrameKind::Ipv4
                    && dst.is_some_and(|d| mask(d, prefix_len) == mask(network, prefix_len))
            }
        }
    }
}

/// 规则动作的输出端口
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputPort {
    Physical(PortNo),
    /// 上送控制器（不缓存）
    Controller,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRule {
    pub dpid: Dpid,
    pub priority: u16,
    pub matcher: FlowMatch,
    pub out: OutputPort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketOut {
    pub dpid: Dpid,
    pub buffer: PacketHandle,
    pub in_port: PortNo,
    pub ports: Vec<PortNo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Directive {
    InstallRule(FlowRule),
    PacketOut(PacketOut),
}

impl Directive {
    pub fn dpid(&self) -> Dpid {
        match self {
            Directive::InstallRule(r) => r.dpid,
            Directive::PacketOut(p) => p.dpid,
        }
    }
}

/// 指令接收方：由数据面（真实或仿真）实现。
pub trait DirectiveSink {
    fn apply(&mut self, now: SimTime, directive: Directive);
}

impl DirectiveSink for Vec<Directive> {
    fn apply(&mut self, _now: SimTime, directive: Directive) {
        self.push(directive);
    }
}
