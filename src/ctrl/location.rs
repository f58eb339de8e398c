//! 主机位置表
//!
//! 记录源地址最近一次在其所属 edge 交换机上出现的 (dpid, 入端口)。
//! 条目只会被覆盖，不会过期。

use std::collections::HashMap;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::net::{Dpid, PortNo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostLocation {
    pub dpid: Dpid,
    pub port: PortNo,
}

#[derive(Debug, Default, Clone)]
pub struct HostLocationTable {
    entries: HashMap<Ipv4Addr, HostLocation>,
}

impl HostLocationTable {
    /// 记录/覆盖位置；返回之前的位置（若有且不同）。
    pub fn learn(&mut self, addr: Ipv4Addr, loc: HostLocation) -> Option<HostLocation> {
        self.entries.insert(addr, loc).filter(|old| *old != loc)
    }

    pub fn get(&self, addr: Ipv4Addr) -> Option<HostLocation> {
        self.entries.get(&addr).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Ipv4Addr, &HostLocation)> {
        self.entries.iter()
    }
}
