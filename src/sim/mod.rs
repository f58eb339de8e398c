//! 事件调度模块
//!
//! 控制器事件的单线程协作式调度：时间 + 序列号排序的队列。

// 子模块声明
mod event_loop;
mod scheduled_event;
mod time;

// 重新导出公共接口
pub use event_loop::EventLoop;
pub use scheduled_event::ScheduledEvent;
pub use time::SimTime;
