//! 模块加载器
//!
//! 注册表之上的加载封装：维护编译期已知模块的工厂目录，负责
//! 插件结构校验、注册、初始化和路由登记。模块静态链接进内核，
//! 加载即为从工厂目录实例化，不涉及运行时代码加载。
//!
//! # 已知限制
//!
//! 卸载模块只清理注册表登记，已登记的路由不会移除，停留在
//! 导航表中仍可到达。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::module::navigation::{NavigationTable, RouteMeta};
use crate::module::plugin::SharedPlugin;
use crate::module::registry::ModuleRegistry;
use crate::utils::{CoreError, Result};

/// 模块工厂
///
/// 从编译期已知的模块实现构造插件实例。
pub type ModuleFactory = Arc<dyn Fn() -> SharedPlugin + Send + Sync>;

/// 批量加载报告
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// 成功加载的模块 ID
    pub loaded: Vec<String>,

    /// 失败的模块 ID 及原因
    pub failures: Vec<(String, String)>,
}

impl LoadReport {
    /// 是否全部成功
    pub fn all_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 模块加载器
///
/// 克隆共享同一份工厂目录；注册表和导航表句柄在创建时注入。
#[derive(Clone)]
pub struct ModuleLoader {
    /// 工厂目录：module_id -> 工厂
    factories: Arc<RwLock<HashMap<String, ModuleFactory>>>,

    /// 模块注册表
    registry: ModuleRegistry,

    /// 导航表
    navigation: NavigationTable,
}

impl ModuleLoader {
    /// 创建新的模块加载器
    pub fn new(registry: ModuleRegistry, navigation: NavigationTable) -> Self {
        Self {
            factories: Arc::new(RwLock::new(HashMap::new())),
            registry,
            navigation,
        }
    }

    /// 登记模块工厂
    ///
    /// 同名工厂覆盖旧条目并记录警告。
    pub async fn register_factory(&self, module_id: impl Into<String>, factory: ModuleFactory) {
        let module_id = module_id.into();
        let mut factories = self.factories.write().await;
        if factories.insert(module_id.clone(), factory).is_some() {
            warn!(module_id = %module_id, "模块工厂已登记，覆盖旧条目");
        }
    }

    /// 加载模块
    ///
    /// 从工厂目录实例化插件，校验、注册、初始化并登记路由。
    /// 重复加载同一 ID 是带警告的空操作。
    ///
    /// # Errors
    ///
    /// - `FactoryNotFound` - 工厂目录中没有该 ID
    /// - `InvalidPlugin` - 插件结构校验失败
    /// - 注册和初始化的错误向调用方传播
    pub async fn load_module(&self, module_id: &str) -> Result<()> {
        if self.registry.is_registered(module_id).await {
            warn!(module_id = %module_id, "模块已加载，跳过");
            return Ok(());
        }

        let factory = {
            let factories = self.factories.read().await;
            factories
                .get(module_id)
                .cloned()
                .ok_or_else(|| CoreError::FactoryNotFound(module_id.to_string()))?
        };

        let plugin = factory();
        self.register_module(plugin).await
    }

    /// 注册插件实例
    ///
    /// 绕过工厂目录直接注册一个已构造的插件（内置模块或测试）。
    /// 校验先于注册表的任何状态变更。
    pub async fn register_module(&self, plugin: SharedPlugin) -> Result<()> {
        Self::validate_plugin(&plugin)?;

        let metadata = plugin.metadata().clone();
        let routes = plugin.routes();

        self.registry.register(plugin).await?;
        self.registry.initialize(&metadata.id).await?;

        if !routes.is_empty() {
            self.navigation
                .append(
                    RouteMeta {
                        module_id: metadata.id.clone(),
                        module_name: metadata.name.clone(),
                        module_icon: metadata.icon.clone(),
                    },
                    routes,
                )
                .await;
        }

        info!(module_id = %metadata.id, version = %metadata.version, "模块加载完成");
        Ok(())
    }

    /// 批量加载模块
    ///
    /// 尽力而为：单个模块失败被记入报告，不中断其余模块的加载。
    pub async fn load_modules(&self, module_ids: &[String]) -> LoadReport {
        let mut report = LoadReport::default();

        for module_id in module_ids {
            match self.load_module(module_id).await {
                Ok(()) => report.loaded.push(module_id.clone()),
                Err(e) => {
                    warn!(module_id = %module_id, error = %e, "模块加载失败");
                    report.failures.push((module_id.clone(), e.to_string()));
                }
            }
        }

        info!(
            loaded = report.loaded.len(),
            failed = report.failures.len(),
            "批量加载完成"
        );
        report
    }

    /// 卸载模块
    ///
    /// 模块未加载时为带警告的空操作。已登记的路由不会移除。
    ///
    /// # Errors
    ///
    /// 取消注册的错误（如存在依赖者）向调用方传播。
    pub async fn unload_module(&self, module_id: &str) -> Result<()> {
        if !self.registry.is_registered(module_id).await {
            warn!(module_id = %module_id, "模块未加载，跳过卸载");
            return Ok(());
        }

        self.registry.unregister(module_id).await?;
        info!(module_id = %module_id, "模块已卸载");
        Ok(())
    }

    /// 所有已加载模块的 ID
    pub async fn loaded_modules(&self) -> Vec<String> {
        self.registry.module_ids().await
    }

    /// 检查模块是否已加载
    pub async fn is_loaded(&self, module_id: &str) -> bool {
        self.registry.is_registered(module_id).await
    }

    /// 工厂目录中登记的模块 ID
    pub async fn known_modules(&self) -> Vec<String> {
        let factories = self.factories.read().await;
        factories.keys().cloned().collect()
    }

    /// 校验插件结构
    ///
    /// 所有必填描述符字段非空且版本号可解析；数据模式结构合法；
    /// 声明的路由路径非空。任何缺失项都会在注册表被触碰之前以
    /// 描述性错误返回。
    fn validate_plugin(plugin: &SharedPlugin) -> Result<()> {
        let metadata = plugin.metadata();

        let required_fields = [
            ("id", &metadata.id),
            ("name", &metadata.name),
            ("version", &metadata.version),
            ("description", &metadata.description),
            ("icon", &metadata.icon),
        ];
        for (field, value) in required_fields {
            if value.is_empty() {
                return Err(CoreError::InvalidPlugin {
                    module_id: metadata.id.clone(),
                    reason: format!("缺少必填描述符字段: {}", field),
                });
            }
        }

        if metadata.parsed_version().is_err() {
            return Err(CoreError::InvalidPlugin {
                module_id: metadata.id.clone(),
                reason: format!("版本号格式无效: {}", metadata.version),
            });
        }

        plugin.schema().validate().map_err(|e| CoreError::InvalidPlugin {
            module_id: metadata.id.clone(),
            reason: format!("数据模式无效: {}", e),
        })?;

        for route in plugin.routes() {
            if route.path.is_empty() {
                return Err(CoreError::InvalidPlugin {
                    module_id: metadata.id.clone(),
                    reason: format!("路由 {} 的路径为空", route.name),
                });
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleLoader").finish_non_exhaustive()
    }
}
