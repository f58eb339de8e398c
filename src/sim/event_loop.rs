//! 事件循环
//!
//! 单一逻辑队列，一次只处理一个事件：事件交给 `RoutingEngine`，
//! 产生的指令在下一个事件开始前全部交给 `DirectiveSink`。

use super::scheduled_event::ScheduledEvent;
use super::time::SimTime;
use crate::ctrl::{ControllerEvent, DirectiveSink, RoutingEngine};
use std::collections::BinaryHeap;
use tracing::{debug, info, trace};

#[derive(Debug, Default)]
pub struct EventLoop {
    now: SimTime,
    next_seq: u64,
    q: BinaryHeap<ScheduledEvent>,
}

impl EventLoop {
    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    /// 调度事件在指定时间执行；早于当前时间的按当前时间处理。
    pub fn schedule(&mut self, at: SimTime, ev: ControllerEvent) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        let at = at.max(self.now);
        trace!(now = ?self.now, at = ?at, seq, "调度事件");
        self.q.push(ScheduledEvent { at, seq, ev });
    }

    /// 在当前时间排队（位于已排队的同时刻事件之后）
    pub fn schedule_now(&mut self, ev: ControllerEvent) {
        self.schedule(self.now, ev);
    }

    /// 运行直到队列为空或到达 `until`；返回处理的事件数。
    pub fn run_until(
        &mut self,
        until: SimTime,
        engine: &mut RoutingEngine,
        sink: &mut dyn DirectiveSink,
    ) -> usize {
        let mut count = 0;
        while let Some(top) = self.q.peek() {
            if top.at > until {
                break;
            }
            let Some(item) = self.q.pop() else {
                break;
            };
            self.dispatch(item, engine, sink);
            count += 1;
        }
        self.now = self.now.max(until);
        count
    }

    /// 处理所有事件直到队列为空；返回处理的事件数。
    #[tracing::instrument(skip(self, engine, sink))]
    pub fn run(&mut self, engine: &mut RoutingEngine, sink: &mut dyn DirectiveSink) -> usize {
        info!(queue_size = self.q.len(), "▶️  开始处理事件");
        let mut count = 0;
        while let Some(item) = self.q.pop() {
            self.dispatch(item, engine, sink);
            count += 1;
        }
        info!(total_events = count, final_time = ?self.now, "✅ 事件处理完成");
        count
    }

    fn dispatch(
        &mut self,
        item: ScheduledEvent,
        engine: &mut RoutingEngine,
        sink: &mut dyn DirectiveSink,
    ) {
        self.now = item.at;
        debug!(now = ?self.now, seq = item.seq, remaining = self.q.len(), "执行事件");
        for d in engine.handle(item.ev) {
            sink.apply(self.now, d);
        }
    }
}
