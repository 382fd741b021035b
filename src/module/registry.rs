//! 模块注册表
//!
//! 跟踪已注册、已初始化、已启用的模块及其依赖关系，驱动模块
//! 生命周期：注册 → 初始化（安装钩子）→ 启用/禁用 → 取消注册。
//!
//! # 依赖规则
//!
//! - 注册时所有声明的依赖必须已注册（注册顺序敏感，不支持
//!   延迟解析）
//! - 初始化按依赖深度优先递归，先初始化依赖再初始化自身；
//!   依赖环无法通过注册规则构造出来
//! - 被其他模块依赖的模块不可取消注册（无论依赖者是否启用）
//! - 被已启用模块依赖的模块不可禁用

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::{join_all, BoxFuture, FutureExt};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::bus::{events, EventBus, EventPayload};
use crate::module::plugin::{
    ModuleContext, ModuleInstallation, ModuleMetadata, SearchResult, SharedPlugin,
};
use crate::service::ServiceRegistry;
use crate::utils::{CoreError, Result};

/// 模块注册表
///
/// 克隆共享同一份模块状态；事件总线和服务注册表句柄在创建时
/// 注入，模块钩子通过 [`ModuleContext`] 访问它们。
#[derive(Clone)]
pub struct ModuleRegistry {
    /// 已注册的插件：module_id -> 插件实例
    plugins: Arc<RwLock<HashMap<String, SharedPlugin>>>,

    /// 安装记录：module_id -> ModuleInstallation
    installations: Arc<RwLock<HashMap<String, ModuleInstallation>>>,

    /// 已初始化的模块 ID
    initialized: Arc<RwLock<HashSet<String>>>,

    /// 事件总线句柄
    bus: EventBus,

    /// 钩子执行上下文
    context: ModuleContext,
}

impl ModuleRegistry {
    /// 创建新的模块注册表
    pub fn new(bus: EventBus, services: ServiceRegistry) -> Self {
        let context = ModuleContext::new(bus.clone(), services);
        Self {
            plugins: Arc::new(RwLock::new(HashMap::new())),
            installations: Arc::new(RwLock::new(HashMap::new())),
            initialized: Arc::new(RwLock::new(HashSet::new())),
            bus,
            context,
        }
    }

    /// 注册模块
    ///
    /// 依赖检查先于任何状态变更：检查失败时注册表保持不变。
    /// 成功后创建安装记录（默认启用）并发布 `module:installed`。
    ///
    /// # Errors
    ///
    /// - `ModuleAlreadyRegistered` - 模块 ID 已存在
    /// - `RequiredModuleMissing` - 声明的依赖尚未注册
    pub async fn register(&self, plugin: SharedPlugin) -> Result<()> {
        let metadata = plugin.metadata().clone();
        let module_id = metadata.id.clone();

        {
            let plugins = self.plugins.read().await;

            if plugins.contains_key(&module_id) {
                return Err(CoreError::ModuleAlreadyRegistered(module_id));
            }

            for required in &metadata.required_modules {
                if !plugins.contains_key(required) {
                    return Err(CoreError::RequiredModuleMissing {
                        module_id: module_id.clone(),
                        required: required.clone(),
                    });
                }
            }
        }

        let installation = ModuleInstallation::new(&metadata);

        {
            let mut plugins = self.plugins.write().await;
            let mut installations = self.installations.write().await;

            // 写锁下重查，防止并发注册同一 ID
            if plugins.contains_key(&module_id) {
                return Err(CoreError::ModuleAlreadyRegistered(module_id));
            }

            plugins.insert(module_id.clone(), plugin);
            installations.insert(module_id.clone(), installation);
        }

        info!(module_id = %module_id, version = %metadata.version, "模块已注册");
        self.bus
            .emit(
                events::MODULE_INSTALLED,
                EventPayload::module_with_version(&module_id, &metadata.version),
            )
            .await;

        Ok(())
    }

    /// 初始化模块
    ///
    /// 深度优先递归初始化所有未初始化的依赖模块，然后执行本
    /// 模块的安装钩子并标记为已初始化。重复初始化是带警告的
    /// 空操作，安装钩子不会被重复执行。
    ///
    /// # Errors
    ///
    /// - `ModuleNotFound` - 模块未注册
    /// - `ModuleInstallFailed` - 安装钩子返回错误
    pub fn initialize<'a>(&'a self, module_id: &'a str) -> BoxFuture<'a, Result<()>> {
        async move {
            {
                let initialized = self.initialized.read().await;
                if initialized.contains(module_id) {
                    warn!(module_id = %module_id, "模块已初始化，跳过");
                    return Ok(());
                }
            }

            let plugin = {
                let plugins = self.plugins.read().await;
                plugins
                    .get(module_id)
                    .cloned()
                    .ok_or_else(|| CoreError::ModuleNotFound(module_id.to_string()))?
            };

            // 先初始化依赖
            let required = plugin.metadata().required_modules.clone();
            for dep in &required {
                let done = {
                    let initialized = self.initialized.read().await;
                    initialized.contains(dep)
                };
                if !done {
                    self.initialize(dep).await?;
                }
            }

            plugin
                .install(&self.context)
                .await
                .map_err(|e| CoreError::ModuleInstallFailed {
                    module_id: module_id.to_string(),
                    reason: e.to_string(),
                })?;

            {
                let mut initialized = self.initialized.write().await;
                initialized.insert(module_id.to_string());
            }

            info!(module_id = %module_id, "模块初始化完成");
            Ok(())
        }
        .boxed()
    }

    /// 取消注册模块
    ///
    /// 执行可选的卸载钩子，移除注册、安装记录和初始化标记，
    /// 发布 `module:uninstalled`。
    ///
    /// # Errors
    ///
    /// - `ModuleNotFound` - 模块未注册
    /// - `ModuleHasDependents` - 其他已注册模块（无论是否启用）
    ///   声明了对本模块的依赖
    /// - `ModuleUninstallFailed` - 卸载钩子返回错误
    pub async fn unregister(&self, module_id: &str) -> Result<()> {
        let plugin = {
            let plugins = self.plugins.read().await;

            let plugin = plugins
                .get(module_id)
                .cloned()
                .ok_or_else(|| CoreError::ModuleNotFound(module_id.to_string()))?;

            let dependents: Vec<String> = plugins
                .values()
                .filter(|p| {
                    p.metadata()
                        .required_modules
                        .iter()
                        .any(|r| r == module_id)
                })
                .map(|p| p.metadata().id.clone())
                .collect();

            if !dependents.is_empty() {
                return Err(CoreError::ModuleHasDependents {
                    module: module_id.to_string(),
                    dependents,
                });
            }

            plugin
        };

        plugin
            .uninstall(&self.context)
            .await
            .map_err(|e| CoreError::ModuleUninstallFailed {
                module_id: module_id.to_string(),
                reason: e.to_string(),
            })?;

        {
            let mut plugins = self.plugins.write().await;
            let mut installations = self.installations.write().await;
            let mut initialized = self.initialized.write().await;

            plugins.remove(module_id);
            installations.remove(module_id);
            initialized.remove(module_id);
        }

        info!(module_id = %module_id, "模块已取消注册");
        self.bus
            .emit(events::MODULE_UNINSTALLED, EventPayload::module(module_id))
            .await;

        Ok(())
    }

    /// 启用模块
    ///
    /// 已启用时为带日志的空操作。首次启用一个从未初始化的模块
    /// 会先触发初始化。
    ///
    /// # Errors
    ///
    /// - `ModuleNotFound` - 模块未注册
    /// - `ModuleInstallFailed` - 附带的初始化失败
    pub async fn enable(&self, module_id: &str) -> Result<()> {
        {
            let mut installations = self.installations.write().await;
            let installation = installations
                .get_mut(module_id)
                .ok_or_else(|| CoreError::ModuleNotFound(module_id.to_string()))?;

            if installation.enabled {
                debug!(module_id = %module_id, "模块已启用，跳过");
                return Ok(());
            }

            installation.enabled = true;
            installation.settings.enabled = true;
        }

        let needs_init = {
            let initialized = self.initialized.read().await;
            !initialized.contains(module_id)
        };
        if needs_init {
            self.initialize(module_id).await?;
        }

        info!(module_id = %module_id, "模块已启用");
        self.bus
            .emit(events::MODULE_ENABLED, EventPayload::module(module_id))
            .await;

        Ok(())
    }

    /// 禁用模块
    ///
    /// 不执行卸载钩子，也不清除初始化标记；仅翻转启用标志。
    ///
    /// # Errors
    ///
    /// - `ModuleNotFound` - 模块未注册
    /// - `ModuleHasEnabledDependents` - 某个已启用模块依赖本模块
    pub async fn disable(&self, module_id: &str) -> Result<()> {
        {
            let plugins = self.plugins.read().await;
            let installations = self.installations.read().await;

            if !installations.contains_key(module_id) {
                return Err(CoreError::ModuleNotFound(module_id.to_string()));
            }

            for plugin in plugins.values() {
                let meta = plugin.metadata();
                if !meta.required_modules.iter().any(|r| r == module_id) {
                    continue;
                }
                let dependent_enabled = installations
                    .get(&meta.id)
                    .map(|i| i.enabled)
                    .unwrap_or(false);
                if dependent_enabled {
                    return Err(CoreError::ModuleHasEnabledDependents {
                        module: module_id.to_string(),
                        dependent: meta.id.clone(),
                    });
                }
            }
        }

        {
            let mut installations = self.installations.write().await;
            if let Some(installation) = installations.get_mut(module_id) {
                if !installation.enabled {
                    debug!(module_id = %module_id, "模块已禁用，跳过");
                    return Ok(());
                }
                installation.enabled = false;
                installation.settings.enabled = false;
            }
        }

        info!(module_id = %module_id, "模块已禁用");
        self.bus
            .emit(events::MODULE_DISABLED, EventPayload::module(module_id))
            .await;

        Ok(())
    }

    /// 更新模块设置
    ///
    /// 对模块配置执行浅合并（同名键整体覆盖），然后以合并后的
    /// 完整设置调用模块的设置变更钩子。
    ///
    /// # Errors
    ///
    /// - `ModuleNotFound` - 模块未注册
    /// - 设置变更钩子的错误向调用方传播
    pub async fn update_settings(
        &self,
        module_id: &str,
        partial: HashMap<String, Value>,
    ) -> Result<()> {
        let (plugin, settings) = {
            let plugins = self.plugins.read().await;
            let plugin = plugins
                .get(module_id)
                .cloned()
                .ok_or_else(|| CoreError::ModuleNotFound(module_id.to_string()))?;

            let mut installations = self.installations.write().await;
            let installation = installations
                .get_mut(module_id)
                .ok_or_else(|| CoreError::ModuleNotFound(module_id.to_string()))?;

            installation.settings.config.extend(partial);
            (plugin, installation.settings.clone())
        };

        debug!(module_id = %module_id, "模块设置已更新");
        plugin.on_settings_changed(&settings).await?;

        Ok(())
    }

    /// 跨模块搜索
    ///
    /// 并发分发到所有已启用且声明支持搜索的模块。单个模块的
    /// 搜索失败被记录并排除，不影响其他模块。聚合结果按评分
    /// 降序排列（缺失评分按 0）。
    pub async fn search(&self, query: &str) -> Vec<SearchResult> {
        let candidates: Vec<(String, SharedPlugin)> = {
            let plugins = self.plugins.read().await;
            let installations = self.installations.read().await;

            plugins
                .iter()
                .filter(|(id, plugin)| {
                    plugin.supports_search()
                        && installations.get(*id).map(|i| i.enabled).unwrap_or(false)
                })
                .map(|(id, plugin)| (id.clone(), Arc::clone(plugin)))
                .collect()
        };

        let searches = candidates.into_iter().map(|(id, plugin)| {
            let query = query.to_string();
            async move {
                match plugin.search(&query).await {
                    Ok(results) => results,
                    Err(e) => {
                        warn!(module_id = %id, error = %e, "模块搜索失败，已排除");
                        vec![]
                    }
                }
            }
        });

        let mut results: Vec<SearchResult> =
            join_all(searches).await.into_iter().flatten().collect();

        results.sort_by(|a, b| b.effective_score().total_cmp(&a.effective_score()));
        results
    }

    // ==================== 查询接口 ====================

    /// 检查模块是否已注册
    pub async fn is_registered(&self, module_id: &str) -> bool {
        let plugins = self.plugins.read().await;
        plugins.contains_key(module_id)
    }

    /// 检查模块是否已初始化
    pub async fn is_initialized(&self, module_id: &str) -> bool {
        let initialized = self.initialized.read().await;
        initialized.contains(module_id)
    }

    /// 检查模块是否已启用
    pub async fn is_enabled(&self, module_id: &str) -> bool {
        let installations = self.installations.read().await;
        installations
            .get(module_id)
            .map(|i| i.enabled)
            .unwrap_or(false)
    }

    /// 获取模块描述符
    pub async fn get_metadata(&self, module_id: &str) -> Option<ModuleMetadata> {
        let plugins = self.plugins.read().await;
        plugins.get(module_id).map(|p| p.metadata().clone())
    }

    /// 获取模块安装记录
    pub async fn get_installation(&self, module_id: &str) -> Option<ModuleInstallation> {
        let installations = self.installations.read().await;
        installations.get(module_id).cloned()
    }

    /// 获取插件实例
    pub async fn get_plugin(&self, module_id: &str) -> Option<SharedPlugin> {
        let plugins = self.plugins.read().await;
        plugins.get(module_id).cloned()
    }

    /// 所有已注册模块的描述符
    pub async fn list_modules(&self) -> Vec<ModuleMetadata> {
        let plugins = self.plugins.read().await;
        plugins.values().map(|p| p.metadata().clone()).collect()
    }

    /// 所有已启用模块的 ID
    pub async fn enabled_modules(&self) -> Vec<String> {
        let installations = self.installations.read().await;
        installations
            .values()
            .filter(|i| i.enabled)
            .map(|i| i.module_id.clone())
            .collect()
    }

    /// 所有已注册模块的 ID
    pub async fn module_ids(&self) -> Vec<String> {
        let plugins = self.plugins.read().await;
        plugins.keys().cloned().collect()
    }

    /// 已注册模块数量
    pub async fn count(&self) -> usize {
        let plugins = self.plugins.read().await;
        plugins.len()
    }

    /// 钩子执行上下文
    pub fn context(&self) -> &ModuleContext {
        &self.context
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry").finish_non_exhaustive()
    }
}
