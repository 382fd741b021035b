//! HiveCore SDK
//!
//! 蜂巢桌面工作台内核的主要对外接口。提供统一的 API 来访问
//! 内核的所有功能，包括：
//!
//! - 模块管理：加载、卸载、启用/禁用模块
//! - 事件系统：发布/订阅事件
//! - 服务注册表：注册和获取共享服务
//! - 跨模块搜索：聚合所有已启用模块的搜索结果
//!
//! # 示例
//!
//! ```rust,no_run
//! use hive_core::{CoreConfig, HiveCore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CoreConfig::builder()
//!         .log_level("info")
//!         .auto_load("email")
//!         .build();
//!
//!     let mut core = HiveCore::new(config).await?;
//!     core.start().await?;
//!
//!     let results = core.search("会议").await;
//!     println!("找到 {} 条结果", results.len());
//!
//!     core.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::bus::{EventBus, EventPayload};
use crate::core::config::CoreConfig;
use crate::module::loader::{LoadReport, ModuleFactory, ModuleLoader};
use crate::module::navigation::NavigationTable;
use crate::module::plugin::{ModuleMetadata, SearchResult};
use crate::module::registry::ModuleRegistry;
use crate::service::ServiceRegistry;
use crate::utils::{CoreError, Result};

/// 内核生命周期事件名
mod core_events {
    pub const STARTED: &str = "core:started";
    pub const SHUTTING_DOWN: &str = "core:shutting-down";
}

// ============================================================================
// 内核状态
// ============================================================================

/// 内核状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreState {
    /// 已初始化
    Initialized,
    /// 运行中
    Running,
    /// 正在关闭
    ShuttingDown,
    /// 已关闭
    Shutdown,
}

impl CoreState {
    /// 检查是否可以启动
    pub fn can_start(&self) -> bool {
        matches!(self, CoreState::Initialized)
    }

    /// 检查是否可以关闭
    pub fn can_shutdown(&self) -> bool {
        matches!(self, CoreState::Running)
    }

    /// 检查是否正在运行
    pub fn is_running(&self) -> bool {
        matches!(self, CoreState::Running)
    }
}

// ============================================================================
// HiveCore 主结构体
// ============================================================================

/// 蜂巢内核主结构体
///
/// 整个内核的入口点，负责协调事件总线、服务注册表、模块
/// 注册表、模块加载器和导航表。各组件作为显式构造的上下文
/// 对象注入到需要的地方，生命周期跟随内核的启动和关闭。
///
/// # 生命周期
///
/// 1. `new()` - 创建并初始化内核
/// 2. `start()` - 启动内核，加载配置中声明的模块
/// 3. `shutdown()` - 优雅关闭内核，按依赖逆序卸载模块
pub struct HiveCore {
    /// 内核配置
    config: CoreConfig,

    /// 内核状态
    state: Arc<RwLock<CoreState>>,

    /// 事件总线
    bus: EventBus,

    /// 服务注册表
    services: ServiceRegistry,

    /// 模块注册表
    modules: ModuleRegistry,

    /// 模块加载器
    loader: ModuleLoader,

    /// 导航表
    navigation: NavigationTable,

    /// 启动时间
    started_at: Option<Instant>,
}

impl HiveCore {
    /// 创建新的内核实例
    ///
    /// 初始化所有子系统：事件总线、服务注册表、模块注册表、
    /// 模块加载器和导航表。
    ///
    /// # Errors
    ///
    /// 配置验证失败时返回错误。
    pub async fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        info!("初始化蜂巢内核 v{}", crate::VERSION);

        let bus = EventBus::new();
        debug!("事件总线初始化完成");

        let services = ServiceRegistry::new();
        debug!("服务注册表初始化完成");

        let modules = ModuleRegistry::new(bus.clone(), services.clone());
        debug!("模块注册表初始化完成");

        let navigation = NavigationTable::new();
        let loader = ModuleLoader::new(modules.clone(), navigation.clone());
        debug!("模块加载器初始化完成");

        let core = Self {
            config,
            state: Arc::new(RwLock::new(CoreState::Initialized)),
            bus,
            services,
            modules,
            loader,
            navigation,
            started_at: None,
        };

        info!("蜂巢内核初始化完成");
        Ok(core)
    }

    /// 登记模块工厂
    ///
    /// 在 `start` 之前登记所有编译期已知的模块实现。
    pub async fn register_factory(&self, module_id: impl Into<String>, factory: ModuleFactory) {
        self.loader.register_factory(module_id, factory).await;
    }

    /// 启动内核
    ///
    /// 尽力加载配置中 `modules.auto_load` 声明的模块，单个模块
    /// 失败不影响其余模块和内核启动。
    ///
    /// # Errors
    ///
    /// 当前状态不允许启动时返回 `InvalidCoreState`。
    pub async fn start(&mut self) -> Result<LoadReport> {
        {
            let state = self.state.read().await;
            if !state.can_start() {
                return Err(CoreError::InvalidCoreState(format!(
                    "内核当前状态 {:?} 不允许启动",
                    *state
                )));
            }
        }

        info!("启动蜂巢内核...");

        let auto_load = self.config.modules.auto_load.clone();
        let report = self.loader.load_modules(&auto_load).await;

        // 配置要求新模块默认禁用时，关掉刚加载的模块。
        // 加载顺序满足依赖先行，禁用必须按逆序，先禁用依赖者。
        if !self.config.modules.enabled_by_default {
            for module_id in report.loaded.iter().rev() {
                if let Err(e) = self.modules.disable(module_id).await {
                    warn!(module_id = %module_id, error = %e, "按配置禁用模块失败");
                }
            }
        }

        {
            let mut state = self.state.write().await;
            *state = CoreState::Running;
        }
        self.started_at = Some(Instant::now());

        self.bus
            .emit(
                core_events::STARTED,
                EventPayload::Custom {
                    data: serde_json::json!({ "version": crate::VERSION }),
                },
            )
            .await;

        info!(
            loaded = report.loaded.len(),
            failed = report.failures.len(),
            "蜂巢内核已启动"
        );
        Ok(report)
    }

    /// 关闭内核
    ///
    /// 按依赖逆序卸载所有模块（先卸载没有依赖者的模块），然后
    /// 清空事件总线和服务注册表。未启动或已关闭时静默返回。
    pub async fn shutdown(&mut self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if !state.can_shutdown() {
                return Ok(());
            }
            *state = CoreState::ShuttingDown;
        }

        info!("正在关闭蜂巢内核...");

        self.bus
            .emit(core_events::SHUTTING_DOWN, EventPayload::None)
            .await;

        self.unload_all_modules().await;

        self.bus.clear().await;
        self.services.clear().await;

        {
            let mut state = self.state.write().await;
            *state = CoreState::Shutdown;
        }

        info!("蜂巢内核已关闭");
        Ok(())
    }

    /// 按依赖逆序卸载全部模块
    ///
    /// 每一轮卸载当前没有依赖者的模块；一轮没有任何进展时放弃
    /// 剩余模块并记录警告。
    async fn unload_all_modules(&self) {
        loop {
            let metadatas = self.modules.list_modules().await;
            if metadatas.is_empty() {
                break;
            }

            let depended: HashSet<String> = metadatas
                .iter()
                .flat_map(|m| m.required_modules.iter().cloned())
                .collect();

            let leaves: Vec<String> = metadatas
                .iter()
                .filter(|m| !depended.contains(&m.id))
                .map(|m| m.id.clone())
                .collect();

            if leaves.is_empty() {
                warn!(
                    remaining = metadatas.len(),
                    "存在无法卸载的模块，跳过剩余卸载"
                );
                break;
            }

            let mut progressed = false;
            for module_id in leaves {
                match self.loader.unload_module(&module_id).await {
                    Ok(()) => progressed = true,
                    Err(e) => {
                        warn!(module_id = %module_id, error = %e, "关闭时卸载模块失败");
                    }
                }
            }

            if !progressed {
                warn!("模块卸载没有进展，终止卸载循环");
                break;
            }
        }
    }

    // ========================================================================
    // 模块管理 API
    // ========================================================================

    /// 加载模块
    pub async fn load_module(&self, module_id: &str) -> Result<()> {
        self.loader.load_module(module_id).await
    }

    /// 卸载模块
    pub async fn unload_module(&self, module_id: &str) -> Result<()> {
        self.loader.unload_module(module_id).await
    }

    /// 启用模块
    pub async fn enable_module(&self, module_id: &str) -> Result<()> {
        self.modules.enable(module_id).await
    }

    /// 禁用模块
    pub async fn disable_module(&self, module_id: &str) -> Result<()> {
        self.modules.disable(module_id).await
    }

    /// 获取所有已注册模块的描述符
    pub async fn list_modules(&self) -> Vec<ModuleMetadata> {
        self.modules.list_modules().await
    }

    /// 跨模块搜索
    pub async fn search(&self, query: &str) -> Vec<SearchResult> {
        self.modules.search(query).await
    }

    // ========================================================================
    // 组件访问
    // ========================================================================

    /// 事件总线
    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// 服务注册表
    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    /// 模块注册表
    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    /// 模块加载器
    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }

    /// 导航表
    pub fn navigation(&self) -> &NavigationTable {
        &self.navigation
    }

    /// 内核配置
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    // ========================================================================
    // 状态信息
    // ========================================================================

    /// 获取内核状态
    pub async fn state(&self) -> CoreState {
        *self.state.read().await
    }

    /// 检查内核是否正在运行
    pub async fn is_running(&self) -> bool {
        self.state.read().await.is_running()
    }

    /// 获取运行时间
    pub fn uptime(&self) -> Option<std::time::Duration> {
        self.started_at.map(|t| t.elapsed())
    }
}

impl Drop for HiveCore {
    fn drop(&mut self) {
        info!("蜂巢内核实例被释放");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::navigation::RouteDefinition;
    use crate::module::plugin::{
        ModuleCategory, ModuleContext, ModulePlugin, SharedPlugin, ViewDescriptor,
    };
    use crate::module::schema::ModuleSchema;
    use async_trait::async_trait;

    struct StubModule {
        metadata: ModuleMetadata,
    }

    impl StubModule {
        fn new(id: &str, required: Vec<&str>) -> Self {
            let mut metadata = ModuleMetadata::new(id, format!("模块 {}", id), "1.0.0")
                .with_description("测试")
                .with_icon("box")
                .with_category(ModuleCategory::Utility);
            metadata.required_modules = required.into_iter().map(String::from).collect();
            Self { metadata }
        }
    }

    #[async_trait]
    impl ModulePlugin for StubModule {
        fn metadata(&self) -> &ModuleMetadata {
            &self.metadata
        }

        async fn install(&self, _ctx: &ModuleContext) -> Result<()> {
            Ok(())
        }

        fn main_view(&self) -> ViewDescriptor {
            ViewDescriptor::new("StubView")
        }

        fn routes(&self) -> Vec<RouteDefinition> {
            vec![]
        }

        fn schema(&self) -> ModuleSchema {
            ModuleSchema::empty()
        }
    }

    fn stub_factory(id: &'static str, required: Vec<&'static str>) -> ModuleFactory {
        Arc::new(move || Arc::new(StubModule::new(id, required.clone())) as SharedPlugin)
    }

    #[tokio::test]
    async fn test_core_creation() {
        let core = HiveCore::new(CoreConfig::default()).await.unwrap();
        assert_eq!(core.state().await, CoreState::Initialized);
        assert!(core.uptime().is_none());
    }

    #[tokio::test]
    async fn test_core_creation_invalid_config() {
        let mut config = CoreConfig::default();
        config.logging.level = "loud".to_string();
        assert!(HiveCore::new(config).await.is_err());
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let mut core = HiveCore::new(CoreConfig::default()).await.unwrap();

        core.start().await.unwrap();
        assert_eq!(core.state().await, CoreState::Running);
        assert!(core.is_running().await);
        assert!(core.uptime().is_some());

        core.shutdown().await.unwrap();
        assert_eq!(core.state().await, CoreState::Shutdown);
        assert!(!core.is_running().await);
    }

    #[tokio::test]
    async fn test_double_start_fails() {
        let mut core = HiveCore::new(CoreConfig::default()).await.unwrap();
        core.start().await.unwrap();

        let result = core.start().await;
        assert!(matches!(
            result.unwrap_err(),
            CoreError::InvalidCoreState(_)
        ));
    }

    #[tokio::test]
    async fn test_shutdown_before_start_is_noop() {
        let mut core = HiveCore::new(CoreConfig::default()).await.unwrap();
        assert!(core.shutdown().await.is_ok());
        assert_eq!(core.state().await, CoreState::Initialized);
    }

    #[tokio::test]
    async fn test_start_auto_loads_modules() {
        let config = CoreConfig::builder()
            .auto_load("email")
            .auto_load("missing")
            .build();
        let mut core = HiveCore::new(config).await.unwrap();
        core.register_factory("email", stub_factory("email", vec![])).await;

        let report = core.start().await.unwrap();

        // 缺失工厂的模块记入失败，不影响启动
        assert_eq!(report.loaded, vec!["email"]);
        assert_eq!(report.failures.len(), 1);
        assert!(core.modules().is_registered("email").await);
        assert!(core.is_running().await);
    }

    #[tokio::test]
    async fn test_enabled_by_default_false() {
        let config = CoreConfig::builder()
            .auto_load("email")
            .enabled_by_default(false)
            .build();
        let mut core = HiveCore::new(config).await.unwrap();
        core.register_factory("email", stub_factory("email", vec![])).await;

        core.start().await.unwrap();
        assert!(!core.modules().is_enabled("email").await);
    }

    #[tokio::test]
    async fn test_enabled_by_default_false_disables_dependency_chain() {
        let config = CoreConfig::builder()
            .auto_load("contacts")
            .auto_load("crm")
            .enabled_by_default(false)
            .build();
        let mut core = HiveCore::new(config).await.unwrap();
        core.register_factory("contacts", stub_factory("contacts", vec![]))
            .await;
        core.register_factory("crm", stub_factory("crm", vec!["contacts"]))
            .await;

        core.start().await.unwrap();

        // crm 依赖 contacts，必须先禁用 crm 才能禁用 contacts
        assert!(!core.modules().is_enabled("crm").await);
        assert!(!core.modules().is_enabled("contacts").await);
    }

    #[tokio::test]
    async fn test_shutdown_unloads_dependents_first() {
        let config = CoreConfig::builder()
            .auto_load("contacts")
            .auto_load("crm")
            .build();
        let mut core = HiveCore::new(config).await.unwrap();
        core.register_factory("contacts", stub_factory("contacts", vec![]))
            .await;
        core.register_factory("crm", stub_factory("crm", vec!["contacts"]))
            .await;

        core.start().await.unwrap();
        assert_eq!(core.list_modules().await.len(), 2);

        // crm 依赖 contacts，必须先卸载 crm
        core.shutdown().await.unwrap();
        assert_eq!(core.list_modules().await.len(), 0);
    }

    #[tokio::test]
    async fn test_search_delegation() {
        let mut core = HiveCore::new(CoreConfig::default()).await.unwrap();
        core.start().await.unwrap();

        let results = core.search("anything").await;
        assert!(results.is_empty());

        core.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_state_transitions() {
        assert!(CoreState::Initialized.can_start());
        assert!(!CoreState::Initialized.can_shutdown());

        assert!(!CoreState::Running.can_start());
        assert!(CoreState::Running.can_shutdown());
        assert!(CoreState::Running.is_running());

        assert!(!CoreState::Shutdown.can_start());
        assert!(!CoreState::Shutdown.can_shutdown());
    }
}
