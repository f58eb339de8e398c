//! SDN 控制器核心
//!
//! 拓扑视图、最短路径计算、主机位置学习以及 packet-in 决策。
//! 不涉及 OpenFlow 编解码：输入是事件，输出是指令。

// 子模块声明
mod directive;
mod engine;
mod event;
mod location;
mod packet;
mod path;
mod topology;

// 重新导出公共接口
pub use directive::{Directive, DirectiveSink, FlowMatch, FlowRule, OutputPort, PacketOut};
pub use engine::{Decision, DropReason, RoutingEngine};
pub use event::ControllerEvent;
pub use location::{HostLocation, HostLocationTable};
pub use packet::{Frame, FrameKind, PacketHandle, PacketIn};
pub use path::shortest_path;
pub use topology::{DiscoverySnapshot, LinkReport, TopologyGraph};
