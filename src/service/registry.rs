//! 服务注册表
//!
//! 命名单例服务的依赖容器。服务以工厂形式注册，首次获取时
//! 惰性创建；单例服务的实例被缓存复用。
//!
//! # 类型安全
//!
//! 实例以 `Arc<dyn Any + Send + Sync>` 擦除存储，获取时按调用方
//! 给定的类型参数向下转型；类型不符返回
//! [`CoreError::ServiceTypeMismatch`]。推荐通过 [`ServiceToken`]
//! 把名字和类型绑定在一处常量里。
//!
//! # 并发语义
//!
//! 单例工厂的执行至多一次：并发的 `get` 调用通过每个定义自带的
//! 异步互斥锁串行化，后到者直接复用先到者缓存的实例。
//!
//! # 使用示例
//!
//! ```ignore
//! use hive_core::service::{ServiceRegistry, ServiceToken, services};
//!
//! struct Database;
//!
//! const DATABASE: ServiceToken<Database> = ServiceToken::new(services::DATABASE);
//!
//! #[tokio::main]
//! async fn main() -> hive_core::Result<()> {
//!     let registry = ServiceRegistry::new();
//!     registry.register(services::DATABASE, || async { Ok(Database) }, true).await;
//!
//!     let db = registry.get_typed(&DATABASE).await?;
//!     Ok(())
//! }
//! ```

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::utils::{CoreError, Result};

/// 类型擦除的服务实例
pub type AnyService = Arc<dyn Any + Send + Sync>;

/// 类型擦除的服务工厂
pub type BoxedFactory =
    Arc<dyn Fn() -> BoxFuture<'static, Result<AnyService>> + Send + Sync>;

/// 服务令牌
///
/// 把服务名和实例类型绑定为一个常量，避免调用点散落裸字符串
/// 和错误的类型参数。
pub struct ServiceToken<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ServiceToken<T> {
    /// 创建服务令牌
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// 服务名
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for ServiceToken<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ServiceToken<T> {}

impl<T> std::fmt::Debug for ServiceToken<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceToken")
            .field("name", &self.name)
            .field("type", &type_name::<T>())
            .finish()
    }
}

/// 服务定义
#[derive(Clone)]
struct ServiceDefinition {
    /// 工厂函数
    factory: BoxedFactory,

    /// 是否为单例
    singleton: bool,

    /// 已缓存的单例实例
    instance: Option<AnyService>,

    /// 单例创建锁（保证工厂至多执行一次）
    init_lock: Arc<Mutex<()>>,
}

/// 服务注册表
///
/// 克隆共享同一份服务表；生命周期由持有方（内核上下文）控制。
#[derive(Clone)]
pub struct ServiceRegistry {
    services: Arc<RwLock<HashMap<String, ServiceDefinition>>>,
}

impl ServiceRegistry {
    /// 创建新的服务注册表
    pub fn new() -> Self {
        Self {
            services: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 注册服务
    ///
    /// 重复注册同名服务会覆盖旧定义并记录警告；已被调用方持有的
    /// 旧实例引用保持有效。
    ///
    /// # Arguments
    ///
    /// * `name` - 服务名（见 [`services`] 目录）
    /// * `factory` - 创建实例的异步工厂
    /// * `singleton` - 是否缓存并复用首个实例
    pub async fn register<T, F, Fut>(&self, name: impl Into<String>, factory: F, singleton: bool)
    where
        T: Any + Send + Sync,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let name = name.into();
        let boxed: BoxedFactory = Arc::new(move || {
            let fut = factory();
            async move { fut.await.map(|v| Arc::new(v) as AnyService) }.boxed()
        });

        let mut services = self.services.write().await;
        if services.contains_key(&name) {
            warn!(service = %name, "服务已注册，覆盖旧定义");
        }
        services.insert(
            name.clone(),
            ServiceDefinition {
                factory: boxed,
                singleton,
                instance: None,
                init_lock: Arc::new(Mutex::new(())),
            },
        );
        debug!(service = %name, singleton, "服务注册成功");
    }

    /// 注册单例服务（常用缩写）
    pub async fn register_singleton<T, F, Fut>(&self, name: impl Into<String>, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.register(name, factory, true).await;
    }

    /// 获取服务实例
    ///
    /// 单例服务首次获取时执行工厂并缓存；后续获取直接复用。
    /// 非单例服务每次获取都执行工厂。
    ///
    /// # Errors
    ///
    /// - `ServiceNotFound` - 服务名未注册
    /// - `ServiceTypeMismatch` - 类型参数与注册的实例类型不符
    /// - `ServiceCreateFailed` - 工厂执行失败
    pub async fn get<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        let definition = {
            let services = self.services.read().await;
            services
                .get(name)
                .cloned()
                .ok_or_else(|| CoreError::ServiceNotFound(name.to_string()))?
        };

        // 单例且已有实例：直接复用
        if definition.singleton {
            if let Some(instance) = &definition.instance {
                return Self::downcast::<T>(name, Arc::clone(instance));
            }

            // 串行化创建，保证工厂至多执行一次
            let _guard = definition.init_lock.lock().await;

            // 拿到锁后重查：可能已被并发调用创建
            {
                let services = self.services.read().await;
                if let Some(def) = services.get(name) {
                    if let Some(instance) = &def.instance {
                        return Self::downcast::<T>(name, Arc::clone(instance));
                    }
                }
            }

            let instance = self.run_factory(name, &definition).await?;

            // 缓存实例（定义可能在工厂执行期间被覆盖或移除，此时跳过缓存）
            {
                let mut services = self.services.write().await;
                if let Some(def) = services.get_mut(name) {
                    if def.singleton && def.instance.is_none() {
                        def.instance = Some(Arc::clone(&instance));
                    }
                }
            }

            return Self::downcast::<T>(name, instance);
        }

        // 非单例：每次都创建新实例
        let instance = self.run_factory(name, &definition).await?;
        Self::downcast::<T>(name, instance)
    }

    /// 按令牌获取服务实例
    pub async fn get_typed<T: Any + Send + Sync>(
        &self,
        token: &ServiceToken<T>,
    ) -> Result<Arc<T>> {
        self.get::<T>(token.name).await
    }

    /// 同步获取服务实例
    ///
    /// 从不等待也从不执行工厂：仅当单例实例已被 `get` 物化时返回。
    /// 服务未注册、实例未物化、类型不符或注册表正被写入时均返回
    /// `None`。
    pub fn get_sync<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let services = self.services.try_read().ok()?;
        let definition = services.get(name)?;
        let instance = definition.instance.as_ref()?;
        Arc::clone(instance).downcast::<T>().ok()
    }

    /// 检查服务是否已注册
    pub async fn has(&self, name: &str) -> bool {
        let services = self.services.read().await;
        services.contains_key(name)
    }

    /// 取消注册服务
    ///
    /// 丢弃定义和缓存实例；已被调用方持有的实例引用保持有效。
    pub async fn unregister(&self, name: &str) {
        let mut services = self.services.write().await;
        if services.remove(name).is_some() {
            debug!(service = %name, "服务已取消注册");
        }
    }

    /// 清空所有服务
    pub async fn clear(&self) {
        let mut services = self.services.write().await;
        services.clear();
        warn!("已清空服务注册表");
    }

    /// 获取所有已注册的服务名
    pub async fn service_names(&self) -> Vec<String> {
        let services = self.services.read().await;
        services.keys().cloned().collect()
    }

    /// 已注册服务数量
    pub async fn count(&self) -> usize {
        let services = self.services.read().await;
        services.len()
    }

    async fn run_factory(&self, name: &str, definition: &ServiceDefinition) -> Result<AnyService> {
        trace!(service = %name, "执行服务工厂");
        (definition.factory)()
            .await
            .map_err(|e| CoreError::ServiceCreateFailed {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    fn downcast<T: Any + Send + Sync>(name: &str, instance: AnyService) -> Result<Arc<T>> {
        instance
            .downcast::<T>()
            .map_err(|_| CoreError::ServiceTypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry").finish_non_exhaustive()
    }
}

/// 服务名目录
///
/// 内核和功能模块约定的服务名常量。注册表本身对任意字符串键
/// 保持通用，这里仅是约定。
pub mod services {
    #![allow(missing_docs)]

    pub const HTTP_CLIENT: &str = "http-client";
    pub const AUTH_SERVICE: &str = "auth-service";
    pub const DATABASE: &str = "database";
    pub const SYNC_ENGINE: &str = "sync-engine";
    pub const NOTIFICATION_SERVICE: &str = "notification-service";
    pub const SEARCH_SERVICE: &str = "search-service";
    pub const STORAGE_SERVICE: &str = "storage-service";
    pub const ENCRYPTION_SERVICE: &str = "encryption-service";
    pub const LOGGER: &str = "logger";
    pub const ANALYTICS: &str = "analytics";
}
