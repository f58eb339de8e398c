//! 控制器事件
//!
//! 封闭的事件集合；每个变体对应 `RoutingEngine` 上的一个处理函数。

use serde::{Deserialize, Serialize};

use super::packet::PacketIn;
use super::topology::DiscoverySnapshot;
use crate::net::{Dpid, PortNo};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControllerEvent {
    /// 交换机完成握手，上报其端口枚举
    SwitchConnected { dpid: Dpid, ports: Vec<PortNo> },
    /// 完整的拓扑发现快照
    TopologyRebuilt(DiscoverySnapshot),
    /// 交换机上送的报文
    PacketArrived(PacketIn),
}
