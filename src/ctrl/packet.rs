//! Packet-in 描述
//!
//! 控制器只关心到达交换机的帧的少量字段：入端口、帧类型和 IP 地址。

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::net::{Dpid, PortNo};

/// 交换机缓存的报文句柄（回填到 packet-out）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PacketHandle(pub u64);

/// 帧类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    Ipv4,
    Arp,
    Lldp,
    Other,
}

/// 解析后的帧内容
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Frame {
    Ipv4 { src: Ipv4Addr, dst: Ipv4Addr },
    Arp { src: Ipv4Addr, dst: Ipv4Addr },
    /// 链路发现帧
    Lldp,
    Other,
}

impl Frame {
    pub fn new(kind: FrameKind, src: Ipv4Addr, dst: Ipv4Addr) -> Self {
        match kind {
            FrameKind::Ipv4 => Frame::Ipv4 { src, dst },
            FrameKind::Arp => Frame::Arp { src, dst },
            FrameKind::Lldp => Frame::Lldp,
            FrameKind::Other => Frame::Other,
        }
    }

    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Ipv4 { .. } => FrameKind::Ipv4,
            Frame::Arp { .. } => FrameKind::Arp,
            Frame::Lldp => FrameKind::Lldp,
            Frame::Other => FrameKind::Other,
        }
    }

    /// (src, dst)，仅 IPv4/ARP 帧有
    pub fn addrs(&self) -> Option<(Ipv4Addr, Ipv4Addr)> {
        match *self {
            Frame::Ipv4 { src, dst } | Frame::Arp { src, dst } => Some((src, dst)),
            Frame::Lldp | Frame::Other => None,
        }
    }
}

/// 交换机上送控制器的报文
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketIn {
    pub dpid: Dpid,
    pub in_port: PortNo,
    pub buffer: PacketHandle,
    pub frame: Frame,
}
