//! 拓扑图模块
//!
//! 此模块包含图的核心组件：标识符、节点、边、图本身以及 JSON 导出。

// 子模块声明
mod export;
mod graph;
mod id;
mod node;

// 重新导出公共接口
pub use export::{GraphExport, LinkInfo, NodeInfo};
pub use graph::{Graph, GraphError};
pub use id::{Dpid, EdgeId, NodeId, OFPP_LOCAL, OFPP_MAX, PortNo};
pub use node::{Edge, HostCoords, Node, NodeKind};
