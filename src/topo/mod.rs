//! 拓扑构建
//!
//! fat-tree 生成器以及构建器、仿真网络与控制器共享的编址约定。

pub mod addressing;
pub mod fat_tree;
