//! 编址约定
//!
//! 拓扑构建、仿真网络和控制器三方共享的约定：
//! - 交换机 datapath id：`tier * 10_000 + major * 100 + minor`
//!   （tier：aggregation = 1，edge = 2，core = 3）；
//! - 主机地址：`prefix.pod.edge.(host + host_offset)`；
//! - 由地址反推主机所在的 edge 交换机。
//!
//! 任何一方的约定不一致只会得到“未知交换机”，不会报错。

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::net::{Dpid, HostCoords, NodeKind};

/// 每个坐标在 datapath id 中占用的十进制位宽
pub const COORD_LIMIT: usize = 100;

/// 交换机层级（datapath id 的首位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchTier {
    Aggregation = 1,
    Edge = 2,
    Core = 3,
}

impl SwitchTier {
    pub fn of(kind: NodeKind) -> Option<SwitchTier> {
        match kind {
            NodeKind::Aggregation => Some(SwitchTier::Aggregation),
            NodeKind::Edge => Some(SwitchTier::Edge),
            NodeKind::Core => Some(SwitchTier::Core),
            NodeKind::Host => None,
        }
    }
}

/// 由层级和两级坐标计算 datapath id；坐标越界时返回 None。
pub fn dpid_of(tier: SwitchTier, major: usize, minor: usize) -> Option<Dpid> {
    if major >= COORD_LIMIT || minor >= COORD_LIMIT {
        return None;
    }
    let raw = tier as u64 * 10_000 + major as u64 * 100 + minor as u64;
    Some(Dpid(raw))
}

/// 从 datapath id 解出 (tier, major, minor)
pub fn decode_dpid(dpid: Dpid) -> Option<(SwitchTier, usize, usize)> {
    let tier = match dpid.0 / 10_000 {
        1 => SwitchTier::Aggregation,
        2 => SwitchTier::Edge,
        3 => SwitchTier::Core,
        _ => return None,
    };
    let rest = dpid.0 % 10_000;
    Some((tier, (rest / 100) as usize, (rest % 100) as usize))
}

/// 主机地址规划
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressPlan {
    /// 第一个字节（网络前缀）
    pub prefix: u8,
    /// 主机序号在最后一个字节上的偏移（.0 和 .1 保留）
    pub host_offset: u8,
    /// 路径规则匹配的子网前缀长度
    pub subnet_prefix_len: u8,
}

impl Default for AddressPlan {
    fn default() -> Self {
        Self {
            prefix: 10,
            host_offset: 2,
            subnet_prefix_len: 24,
        }
    }
}

impl AddressPlan {
    /// 主机地址；坐标放不进一个字节时返回 None。
    pub fn host_ip(&self, coords: HostCoords) -> Option<Ipv4Addr> {
        let pod = u8::try_from(coords.pod).ok()?;
        let edge = u8::try_from(coords.edge).ok()?;
        let host = u8::try_from(coords.host)
            .ok()?
            .checked_add(self.host_offset)?;
        Some(Ipv4Addr::new(self.prefix, pod, edge, host))
    }

    /// 地址所属主机的 edge 交换机；外部前缀或越界坐标返回 None。
    pub fn home_edge_switch(&self, addr: Ipv4Addr) -> Option<Dpid> {
        let [prefix, pod, edge, _] = addr.octets();
        if prefix != self.prefix {
            return None;
        }
        dpid_of(SwitchTier::Edge, pod as usize, edge as usize)
    }

    /// 同 `home_edge_switch`，但输入为文本；格式错误返回 None。
    pub fn parse_home_edge_switch(&self, text: &str) -> Option<Dpid> {
        let addr: Ipv4Addr = text.trim().parse().ok()?;
        self.home_edge_switch(addr)
    }

    /// 地址所在子网（网络地址，前缀长度）
    pub fn subnet_of(&self, addr: Ipv4Addr) -> (Ipv4Addr, u8) {
        let len = self.subnet_prefix_len.min(32);
        (mask(addr, len), len)
    }
}

/// 保留前 `len` 位
pub fn mask(addr: Ipv4Addr, len: u8) -> Ipv4Addr {
    let bits = u32::from(addr);
    let m = match len {
        0 => 0,
        l if l >= 32 => u32::MAX,
        l => u32::MAX << (32 - l),
    };
    Ipv4Addr::from(bits & m)
}
