//! 最短路径计算
//!
//! 在 `TopologyGraph` 上做单源 Dijkstra（边权全为 1）。
//!
//! 等长路径之间的选择取决于优先队列的弹出顺序，不是约定的一部分；
//! 调用方只能依赖“返回的是某条最短路径”。

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use super::topology::TopologyGraph;
use crate::net::Dpid;
use tracing::{debug, trace};

/// 从 `source` 到 `target` 的最短路径（含两端）；不可达返回 None。
///
/// 任一端点不在拓扑中时视为不可达；`source == target` 时返回 `[source]`。
#[tracing::instrument(level = "debug", skip(graph), fields(source = %source, target = %target))]
pub fn shortest_path(graph: &TopologyGraph, source: Dpid, target: Dpid) -> Option<Vec<Dpid>> {
    if !graph.has_switch(source) || !graph.has_switch(target) {
        debug!("端点不在拓扑中");
        return None;
    }

    let mut dist: HashMap<Dpid, u32> = HashMap::new();
    let mut prev: HashMap<Dpid, Dpid> = HashMap::new();
    // BinaryHeap 是 max-heap；用 Reverse 得到最小跳数优先。
    let mut heap = BinaryHeap::new();

    dist.insert(source, 0);
    heap.push(Reverse((0u32, source)));

    while let Some(Reverse((d, u))) = heap.pop() {
        if u == target {
            break;
        }
        if dist.get(&u).is_some_and(|best| d > *best) {
            continue; // 过期条目
        }
        for (v, _) in graph.neighbors(u) {
            let alt = d + 1;
            if dist.get(&v).is_none_or(|cur| alt < *cur) {
                trace!(from = %u, to = %v, alt, "松弛");
                dist.insert(v, alt);
                prev.insert(v, u);
                heap.push(Reverse((alt, v)));
            }
        }
    }

    let mut path = vec![target];
    let mut u = target;
    while let Some(p) = prev.get(&u) {
        path.push(*p);
        u = *p;
    }
    path.reverse();

    if path.first() != Some(&source) {
        debug!("不可达");
        return None;
    }
    debug!(hops = path.len() - 1, ?path, "找到路径");
    Some(path)
}
