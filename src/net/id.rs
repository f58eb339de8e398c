//! 标识符类型
//!
//! 定义图节点、边以及交换机数据通路（datapath）的标识符。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 节点标识符（图内部的下标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// 边标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub usize);

/// 交换机数据通路标识符（OpenFlow datapath id）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dpid(pub u64);

impl fmt::Display for Dpid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 交换机端口号
pub type PortNo = u32;

/// 最大的物理端口号（不含）；更大的值为保留端口（OFPP_MAX）。
pub const OFPP_MAX: PortNo = 0xffff_ff00;

/// 交换机本地管理端口（OFPP_LOCAL），会出现在端口枚举中但不承载数据。
pub const OFPP_LOCAL: PortNo = 0xffff_fffe;
