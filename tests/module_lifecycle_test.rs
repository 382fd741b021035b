//! # 模块生命周期集成测试
//!
//! 通过公开 API 验证模块系统的依赖规则：
//! - 注册顺序与依赖检查
//! - 依赖链的深度优先初始化
//! - 取消注册与禁用的依赖约束
//! - 批量加载的尽力而为语义

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hive_core::{
    CoreError, EventBus, ModuleCategory, ModuleContext, ModuleLoader, ModuleMetadata,
    ModulePlugin, ModuleRegistry, ModuleSchema, NavigationTable, Result, RouteDefinition,
    ServiceRegistry, SharedPlugin, ViewDescriptor,
};

/// 记录安装顺序的测试模块
struct OrderedModule {
    metadata: ModuleMetadata,
    order_log: Arc<Mutex<Vec<String>>>,
    install_count: Arc<AtomicUsize>,
}

impl OrderedModule {
    fn new(id: &str, required: &[&str], order_log: Arc<Mutex<Vec<String>>>) -> Self {
        let mut metadata = ModuleMetadata::new(id, format!("模块 {}", id), "1.0.0")
            .with_description("生命周期测试")
            .with_icon("cube")
            .with_category(ModuleCategory::Utility);
        metadata.required_modules = required.iter().map(|s| s.to_string()).collect();
        Self {
            metadata,
            order_log,
            install_count: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl ModulePlugin for OrderedModule {
    fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }

    async fn install(&self, _ctx: &ModuleContext) -> Result<()> {
        self.install_count.fetch_add(1, Ordering::SeqCst);
        self.order_log.lock().unwrap().push(self.metadata.id.clone());
        Ok(())
    }

    fn main_view(&self) -> ViewDescriptor {
        ViewDescriptor::new("OrderedView")
    }

    fn routes(&self) -> Vec<RouteDefinition> {
        vec![]
    }

    fn schema(&self) -> ModuleSchema {
        ModuleSchema::empty()
    }
}

fn new_stack() -> (ModuleRegistry, ModuleLoader) {
    let registry = ModuleRegistry::new(EventBus::new(), ServiceRegistry::new());
    let loader = ModuleLoader::new(registry.clone(), NavigationTable::new());
    (registry, loader)
}

/// 注册依赖缺失的模块失败且不留痕迹
#[tokio::test]
async fn test_register_missing_dependency_no_mutation() {
    let (registry, _) = new_stack();
    let log = Arc::new(Mutex::new(Vec::new()));

    let result = registry
        .register(Arc::new(OrderedModule::new("crm", &["contacts"], log)))
        .await;

    assert!(matches!(
        result.unwrap_err(),
        CoreError::RequiredModuleMissing { .. }
    ));
    assert_eq!(registry.count().await, 0);
}

/// 三级依赖链 A→B→C 按 C、B、A 顺序初始化，重复初始化为空操作
#[tokio::test]
async fn test_dependency_chain_initialization_order() {
    let (registry, _) = new_stack();
    let log = Arc::new(Mutex::new(Vec::new()));

    let a = Arc::new(OrderedModule::new("a", &["b"], log.clone()));
    let b = Arc::new(OrderedModule::new("b", &["c"], log.clone()));
    let c = Arc::new(OrderedModule::new("c", &[], log.clone()));

    // 依赖必须先注册
    registry.register(c.clone() as SharedPlugin).await.unwrap();
    registry.register(b.clone() as SharedPlugin).await.unwrap();
    registry.register(a.clone() as SharedPlugin).await.unwrap();

    registry.initialize("a").await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["c", "b", "a"]);

    // 重复初始化不重复执行安装钩子
    registry.initialize("a").await.unwrap();
    assert_eq!(a.install_count.load(Ordering::SeqCst), 1);
    assert_eq!(b.install_count.load(Ordering::SeqCst), 1);
    assert_eq!(c.install_count.load(Ordering::SeqCst), 1);
}

/// 共享依赖只初始化一次
#[tokio::test]
async fn test_shared_dependency_initialized_once() {
    let (registry, _) = new_stack();
    let log = Arc::new(Mutex::new(Vec::new()));

    let base = Arc::new(OrderedModule::new("base", &[], log.clone()));
    registry.register(base.clone() as SharedPlugin).await.unwrap();
    registry
        .register(Arc::new(OrderedModule::new("left", &["base"], log.clone())))
        .await
        .unwrap();
    registry
        .register(Arc::new(OrderedModule::new("right", &["base"], log.clone())))
        .await
        .unwrap();

    registry.initialize("left").await.unwrap();
    registry.initialize("right").await.unwrap();

    assert_eq!(base.install_count.load(Ordering::SeqCst), 1);
}

/// 取消注册被依赖的模块失败，与依赖者启用状态无关
#[tokio::test]
async fn test_unregister_dependency_rules() {
    let (registry, _) = new_stack();
    let log = Arc::new(Mutex::new(Vec::new()));

    registry
        .register(Arc::new(OrderedModule::new("contacts", &[], log.clone())))
        .await
        .unwrap();
    registry
        .register(Arc::new(OrderedModule::new("crm", &["contacts"], log.clone())))
        .await
        .unwrap();

    // 依赖者已禁用也不行
    registry.disable("crm").await.unwrap();
    assert!(matches!(
        registry.unregister("contacts").await.unwrap_err(),
        CoreError::ModuleHasDependents { .. }
    ));

    // 先移除依赖者，再取消注册成功
    registry.unregister("crm").await.unwrap();
    registry.unregister("contacts").await.unwrap();
    assert_eq!(registry.count().await, 0);
}

/// 禁用被已启用模块依赖的模块失败；依赖者禁用后成功
#[tokio::test]
async fn test_disable_dependency_rules() {
    let (registry, _) = new_stack();
    let log = Arc::new(Mutex::new(Vec::new()));

    registry
        .register(Arc::new(OrderedModule::new("contacts", &[], log.clone())))
        .await
        .unwrap();
    registry
        .register(Arc::new(OrderedModule::new("crm", &["contacts"], log.clone())))
        .await
        .unwrap();

    assert!(matches!(
        registry.disable("contacts").await.unwrap_err(),
        CoreError::ModuleHasEnabledDependents { .. }
    ));

    registry.disable("crm").await.unwrap();
    registry.disable("contacts").await.unwrap();
    assert!(!registry.is_enabled("contacts").await);
}

/// 批量加载尽力而为，依赖顺序由调用方保证
#[tokio::test]
async fn test_batch_load_best_effort() {
    let (registry, loader) = new_stack();
    let log = Arc::new(Mutex::new(Vec::new()));

    {
        let log = log.clone();
        loader
            .register_factory(
                "contacts",
                Arc::new(move || {
                    Arc::new(OrderedModule::new("contacts", &[], log.clone())) as SharedPlugin
                }),
            )
            .await;
    }
    {
        let log = log.clone();
        loader
            .register_factory(
                "crm",
                Arc::new(move || {
                    Arc::new(OrderedModule::new("crm", &["contacts"], log.clone())) as SharedPlugin
                }),
            )
            .await;
    }

    let ids = vec![
        "contacts".to_string(),
        "missing".to_string(),
        "crm".to_string(),
    ];
    let report = loader.load_modules(&ids).await;

    assert_eq!(report.loaded, vec!["contacts", "crm"]);
    assert_eq!(report.failures.len(), 1);
    assert!(registry.is_initialized("crm").await);
}

/// 工厂缺失与加载顺序错误都以描述性错误报告
#[tokio::test]
async fn test_load_errors_are_descriptive() {
    let (_, loader) = new_stack();
    let log = Arc::new(Mutex::new(Vec::new()));

    {
        let log = log.clone();
        loader
            .register_factory(
                "crm",
                Arc::new(move || {
                    Arc::new(OrderedModule::new("crm", &["contacts"], log.clone())) as SharedPlugin
                }),
            )
            .await;
    }

    // 依赖尚未注册时加载失败
    let result = loader.load_module("crm").await;
    assert!(matches!(
        result.unwrap_err(),
        CoreError::RequiredModuleMissing { .. }
    ));

    // 工厂缺失
    let result = loader.load_module("unknown").await;
    assert!(matches!(result.unwrap_err(), CoreError::FactoryNotFound(_)));
}
