//! 仿真数据面
//!
//! 把生成的 fat-tree 实例化为带端口号的交换机和主机，
//! 维护每台交换机的流表，并逐跳转发报文（table-miss 时上送控制器）。

mod fabric;
mod flow_table;

pub use fabric::{Delivery, EmuError, Fabric, Peer};
pub use flow_table::FlowTable;
