//! 事件时间
//!
//! 事件队列使用的逻辑时间（纳秒）；只用于排序，不代表真实时钟。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    pub const fn from_micros(us: u64) -> SimTime {
        SimTime(us.saturating_mul(1_000))
    }

    pub const fn from_millis(ms: u64) -> SimTime {
        SimTime(ms.saturating_mul(1_000_000))
    }

    pub const fn after(self, delta: SimTime) -> SimTime {
        SimTime(self.0.saturating_add(delta.0))
    }
}
