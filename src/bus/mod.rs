//! 事件总线模块
//!
//! 包含事件数据结构、事件名目录和发布-订阅总线。

pub mod event;
pub mod event_bus;

// 重导出常用类型
pub use event::{events, Event, EventPayload};
pub use event_bus::{DispatchStats, EventBus, EventHandler, SubscriptionId};
