//! 事件总线
//!
//! 提供模块间的松耦合通信机制，支持持久订阅和一次性订阅。
//!
//! # 主要功能
//!
//! - **持久订阅**: `on` 注册的处理器在每次事件发布时被调用
//! - **一次性订阅**: `once` 注册的处理器在首次投递后自动移除
//! - **投递顺序**: 同一事件内按注册顺序投递，持久处理器先于一次性处理器
//! - **处理器隔离**: 单个处理器 panic 被捕获并记录，不影响其余处理器
//! - **即发即忘**: `emit` 不返回处理器结果，不支持迟到订阅者回放
//!
//! # 使用示例
//!
//! ```ignore
//! use hive_core::bus::{Event, EventBus, EventPayload, events};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let bus = EventBus::new();
//!
//!     let sub = bus.on(events::EMAIL_RECEIVED, Arc::new(|event| {
//!         println!("收到事件: {:?}", event);
//!     })).await;
//!
//!     bus.emit(events::EMAIL_RECEIVED, EventPayload::Email {
//!         email_id: "42".into(),
//!         folder: None,
//!     }).await;
//!
//!     bus.off(&sub).await.unwrap();
//! }
//! ```

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, error, trace, warn};

use crate::bus::event::{Event, EventPayload};
use crate::utils::{generate_id, CoreError, Result};

/// 事件处理器类型
///
/// 处理器必须是线程安全的；`emit` 在调用方任务中同步执行处理器。
pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

/// 订阅 ID
///
/// `on` / `once` 返回，用于后续取消订阅。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    fn new() -> Self {
        Self(generate_id())
    }

    /// 返回底层标识字符串
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 订阅池类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pool {
    /// 持久订阅
    Persistent,
    /// 一次性订阅
    Once,
}

/// 内部订阅条目
#[derive(Clone)]
struct HandlerEntry {
    /// 订阅唯一标识
    subscription_id: SubscriptionId,

    /// 事件处理器
    callback: EventHandler,
}

/// 分发统计信息
#[derive(Debug, Clone, Default)]
pub struct DispatchStats {
    /// 总发布次数
    pub total_emits: u64,

    /// 成功投递的处理器调用次数
    pub delivered: u64,

    /// panic 被隔离的处理器调用次数
    pub handler_failures: u64,

    /// 最后分发时间
    pub last_dispatch_at: Option<DateTime<Utc>>,
}

/// 事件总线
///
/// 模块间通信的核心组件，提供发布-订阅模式的事件机制。
/// 使用 `Arc<RwLock>` 保证线程安全；克隆共享同一份订阅状态。
#[derive(Clone)]
pub struct EventBus {
    /// 持久订阅：事件名 -> 订阅条目列表（注册顺序）
    handlers: Arc<RwLock<HashMap<String, Vec<HandlerEntry>>>>,

    /// 一次性订阅：事件名 -> 订阅条目列表（注册顺序）
    once_handlers: Arc<RwLock<HashMap<String, Vec<HandlerEntry>>>>,

    /// 订阅索引：订阅 ID -> (事件名, 所属池)
    subscription_index: Arc<RwLock<HashMap<SubscriptionId, (String, Pool)>>>,

    /// 分发统计
    stats: Arc<RwLock<DispatchStats>>,
}

impl EventBus {
    /// 创建新的事件总线
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
            once_handlers: Arc::new(RwLock::new(HashMap::new())),
            subscription_index: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(RwLock::new(DispatchStats::default())),
        }
    }

    /// 订阅事件（持久）
    ///
    /// 处理器在每次事件发布时被调用，直到通过返回的订阅 ID 取消。
    ///
    /// # Arguments
    ///
    /// * `event` - 事件名（见 [`crate::bus::events`]）
    /// * `handler` - 事件处理器
    ///
    /// # Returns
    ///
    /// 订阅 ID，用于 [`EventBus::off`]
    pub async fn on(&self, event: impl Into<String>, handler: EventHandler) -> SubscriptionId {
        self.subscribe_to(event.into(), handler, Pool::Persistent)
            .await
    }

    /// 订阅事件（一次性）
    ///
    /// 处理器在首次投递后从池中移除；同一事件的多个一次性
    /// 处理器在同一次 `emit` 周期中全部投递并移除。
    pub async fn once(&self, event: impl Into<String>, handler: EventHandler) -> SubscriptionId {
        self.subscribe_to(event.into(), handler, Pool::Once).await
    }

    async fn subscribe_to(
        &self,
        event: String,
        handler: EventHandler,
        pool: Pool,
    ) -> SubscriptionId {
        let entry = HandlerEntry {
            subscription_id: SubscriptionId::new(),
            callback: handler,
        };
        let subscription_id = entry.subscription_id.clone();

        {
            let store = match pool {
                Pool::Persistent => &self.handlers,
                Pool::Once => &self.once_handlers,
            };
            let mut store = store.write().await;
            store.entry(event.clone()).or_default().push(entry);
        }

        {
            let mut index = self.subscription_index.write().await;
            index.insert(subscription_id.clone(), (event.clone(), pool));
        }

        trace!(
            subscription_id = %subscription_id,
            event = %event,
            once = matches!(pool, Pool::Once),
            "事件订阅成功"
        );

        subscription_id
    }

    /// 取消订阅
    ///
    /// # Errors
    ///
    /// 订阅不存在（或一次性订阅已投递）时返回
    /// `CoreError::SubscriptionNotFound`。
    pub async fn off(&self, subscription_id: &SubscriptionId) -> Result<()> {
        let (event, pool) = {
            let index = self.subscription_index.read().await;
            index
                .get(subscription_id)
                .cloned()
                .ok_or_else(|| CoreError::SubscriptionNotFound(subscription_id.to_string()))?
        };

        {
            let store = match pool {
                Pool::Persistent => &self.handlers,
                Pool::Once => &self.once_handlers,
            };
            let mut store = store.write().await;
            if let Some(entries) = store.get_mut(&event) {
                entries.retain(|e| &e.subscription_id != subscription_id);
                if entries.is_empty() {
                    store.remove(&event);
                }
            }
        }

        {
            let mut index = self.subscription_index.write().await;
            index.remove(subscription_id);
        }

        trace!(subscription_id = %subscription_id, event = %event, "取消订阅成功");
        Ok(())
    }

    /// 发布事件
    ///
    /// 同一事件的持久处理器先按注册顺序投递，随后投递并移除
    /// 全部一次性处理器。单个处理器 panic 被捕获并记录，不影响
    /// 其余处理器的投递。
    ///
    /// # Returns
    ///
    /// 本次投递的处理器数量
    pub async fn emit(&self, event: impl Into<String>, payload: EventPayload) -> usize {
        let name = event.into();
        let record = Event::new(name.clone(), payload);
        trace!(event = %name, "发布事件");

        // 快照持久处理器
        let persistent: Vec<HandlerEntry> = {
            let handlers = self.handlers.read().await;
            handlers.get(&name).cloned().unwrap_or_default()
        };

        // 取出并清空一次性处理器
        let once: Vec<HandlerEntry> = {
            let mut once_handlers = self.once_handlers.write().await;
            once_handlers.remove(&name).unwrap_or_default()
        };

        if !once.is_empty() {
            let mut index = self.subscription_index.write().await;
            for entry in &once {
                index.remove(&entry.subscription_id);
            }
        }

        let mut delivered = 0u64;
        let mut failures = 0u64;

        for entry in persistent.iter().chain(once.iter()) {
            let callback = Arc::clone(&entry.callback);
            match catch_unwind(AssertUnwindSafe(|| callback(&record))) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    failures += 1;
                    error!(
                        event = %name,
                        subscription_id = %entry.subscription_id,
                        "事件处理器 panic，已隔离"
                    );
                }
            }
        }

        {
            let mut stats = self.stats.write().await;
            stats.total_emits += 1;
            stats.delivered += delivered;
            stats.handler_failures += failures;
            stats.last_dispatch_at = Some(Utc::now());
        }

        if delivered == 0 && failures == 0 {
            debug!(event = %name, "没有匹配的订阅者");
        }

        (delivered + failures) as usize
    }

    /// 清空所有订阅
    pub async fn clear(&self) {
        let mut handlers = self.handlers.write().await;
        let mut once_handlers = self.once_handlers.write().await;
        let mut index = self.subscription_index.write().await;

        handlers.clear();
        once_handlers.clear();
        index.clear();

        warn!("已清空事件总线的所有订阅");
    }

    /// 获取当前有订阅者的事件名列表
    pub async fn event_names(&self) -> Vec<String> {
        let handlers = self.handlers.read().await;
        let once_handlers = self.once_handlers.read().await;

        let mut names: Vec<String> = handlers.keys().cloned().collect();
        for name in once_handlers.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// 获取某事件的处理器数量（两个池合计）
    pub async fn listener_count(&self, event: &str) -> usize {
        let handlers = self.handlers.read().await;
        let once_handlers = self.once_handlers.read().await;

        handlers.get(event).map(|v| v.len()).unwrap_or(0)
            + once_handlers.get(event).map(|v| v.len()).unwrap_or(0)
    }

    /// 获取分发统计快照
    pub async fn stats(&self) -> DispatchStats {
        self.stats.read().await.clone()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::event::events;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn counting_handler(counter: Arc<AtomicUsize>) -> EventHandler {
        Arc::new(move |_event| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn test_on_and_emit() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        bus.on(events::EMAIL_RECEIVED, counting_handler(counter.clone()))
            .await;

        let delivered = bus
            .emit(
                events::EMAIL_RECEIVED,
                EventPayload::Email {
                    email_id: "1".into(),
                    folder: None,
                },
            )
            .await;

        assert_eq!(delivered, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_emit_without_subscribers() {
        let bus = EventBus::new();
        let delivered = bus.emit("nobody:listens", EventPayload::None).await;
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_persistent_and_once_delivery_counts() {
        let bus = EventBus::new();
        let persistent_a = Arc::new(AtomicUsize::new(0));
        let persistent_b = Arc::new(AtomicUsize::new(0));
        let one_shot = Arc::new(AtomicUsize::new(0));

        bus.on("x", counting_handler(persistent_a.clone())).await;
        bus.on("x", counting_handler(persistent_b.clone())).await;
        bus.once("x", counting_handler(one_shot.clone())).await;

        // 第一次发布：三个处理器各调用一次
        bus.emit("x", EventPayload::None).await;
        assert_eq!(persistent_a.load(Ordering::SeqCst), 1);
        assert_eq!(persistent_b.load(Ordering::SeqCst), 1);
        assert_eq!(one_shot.load(Ordering::SeqCst), 1);

        // 第二次发布：只有持久处理器被调用
        bus.emit("x", EventPayload::None).await;
        assert_eq!(persistent_a.load(Ordering::SeqCst), 2);
        assert_eq!(persistent_b.load(Ordering::SeqCst), 2);
        assert_eq!(one_shot.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_delivery_order_persistent_before_once() {
        let bus = EventBus::new();
        let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

        let order_once = order.clone();
        bus.once(
            "x",
            Arc::new(move |_| order_once.lock().unwrap().push("once")),
        )
        .await;

        let order_first = order.clone();
        bus.on(
            "x",
            Arc::new(move |_| order_first.lock().unwrap().push("first")),
        )
        .await;

        let order_second = order.clone();
        bus.on(
            "x",
            Arc::new(move |_| order_second.lock().unwrap().push("second")),
        )
        .await;

        bus.emit("x", EventPayload::None).await;

        // 持久处理器按注册顺序先投递，一次性处理器最后
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "once"]);
    }

    #[tokio::test]
    async fn test_multiple_once_handlers_all_drained() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        bus.once("x", counting_handler(counter.clone())).await;
        bus.once("x", counting_handler(counter.clone())).await;
        bus.once("x", counting_handler(counter.clone())).await;

        bus.emit("x", EventPayload::None).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(bus.listener_count("x").await, 0);

        bus.emit("x", EventPayload::None).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_panicking_handler_is_isolated() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        bus.on(
            "x",
            Arc::new(|_| {
                panic!("handler exploded");
            }),
        )
        .await;
        bus.on("x", counting_handler(counter.clone())).await;

        let delivered = bus.emit("x", EventPayload::None).await;

        // panic 的处理器被隔离，后注册的处理器仍然被调用
        assert_eq!(delivered, 2);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let stats = bus.stats().await;
        assert_eq!(stats.handler_failures, 1);
        assert_eq!(stats.delivered, 1);
    }

    #[tokio::test]
    async fn test_off_persistent() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let sub = bus.on("x", counting_handler(counter.clone())).await;
        bus.emit("x", EventPayload::None).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        bus.off(&sub).await.unwrap();
        bus.emit("x", EventPayload::None).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_off_once_before_emit() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let sub = bus.once("x", counting_handler(counter.clone())).await;
        bus.off(&sub).await.unwrap();

        bus.emit("x", EventPayload::None).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_off_unknown_subscription() {
        let bus = EventBus::new();
        let sub = bus.on("x", Arc::new(|_| {})).await;
        bus.off(&sub).await.unwrap();

        // 再次取消同一订阅应该失败
        let result = bus.off(&sub).await;
        assert!(matches!(
            result.unwrap_err(),
            CoreError::SubscriptionNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_once_subscription_removed_from_index_after_emit() {
        let bus = EventBus::new();
        let sub = bus.once("x", Arc::new(|_| {})).await;

        bus.emit("x", EventPayload::None).await;

        // 投递后订阅已不存在
        let result = bus.off(&sub).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_clear() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        bus.on("a", counting_handler(counter.clone())).await;
        bus.once("b", counting_handler(counter.clone())).await;
        assert_eq!(bus.event_names().await.len(), 2);

        bus.clear().await;
        assert!(bus.event_names().await.is_empty());

        bus.emit("a", EventPayload::None).await;
        bus.emit("b", EventPayload::None).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_listener_count() {
        let bus = EventBus::new();
        assert_eq!(bus.listener_count("x").await, 0);

        bus.on("x", Arc::new(|_| {})).await;
        bus.on("x", Arc::new(|_| {})).await;
        bus.once("x", Arc::new(|_| {})).await;

        assert_eq!(bus.listener_count("x").await, 3);
    }

    #[tokio::test]
    async fn test_handler_receives_payload() {
        let bus = EventBus::new();
        let seen: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

        let seen_clone = seen.clone();
        bus.on(
            events::MODULE_INSTALLED,
            Arc::new(move |event| {
                if let EventPayload::Module { module_id, .. } = &event.payload {
                    *seen_clone.lock().unwrap() = Some(module_id.clone());
                }
            }),
        )
        .await;

        bus.emit(events::MODULE_INSTALLED, EventPayload::module("email"))
            .await;

        assert_eq!(seen.lock().unwrap().as_deref(), Some("email"));
    }

    #[tokio::test]
    async fn test_shared_state_across_clones() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        bus.on("x", counting_handler(counter.clone())).await;

        let cloned = bus.clone();
        cloned.emit("x", EventPayload::None).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
