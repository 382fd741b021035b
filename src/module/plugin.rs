//! 模块插件契约
//!
//! 定义功能模块（邮件、联系人、日历、CRM 等）必须实现的能力接口，
//! 以及模块的静态描述符和运行时安装记录。
//!
//! 模块在编译期静态链接进内核，通过
//! [`ModuleLoader`](crate::module::loader::ModuleLoader) 的工厂目录
//! 实例化，不支持运行时加载任意代码。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bus::EventBus;
use crate::module::schema::ModuleSchema;
use crate::service::ServiceRegistry;
use crate::utils::Result;

/// 模块分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleCategory {
    /// 通信类（邮件、聊天）
    Communication,
    /// 协作类（日历、任务）
    Productivity,
    /// 业务类（CRM、商机）
    Business,
    /// 工具类
    Utility,
    /// 系统类
    System,
}

impl Default for ModuleCategory {
    fn default() -> Self {
        ModuleCategory::Utility
    }
}

/// 模块描述符
///
/// 模块的不可变身份信息，在模块定义时创建，注册后不再变化。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleMetadata {
    /// 模块唯一标识
    pub id: String,

    /// 模块显示名称
    pub name: String,

    /// 模块版本（semver 格式）
    pub version: String,

    /// 模块描述
    pub description: String,

    /// 模块图标标识
    pub icon: String,

    /// 模块分类
    pub category: ModuleCategory,

    /// 作者信息
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// 依赖的其他模块 ID
    #[serde(default)]
    pub required_modules: Vec<String>,
}

impl ModuleMetadata {
    /// 创建新的模块描述符
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            description: String::new(),
            icon: String::new(),
            category: ModuleCategory::default(),
            author: None,
            required_modules: vec![],
        }
    }

    /// 设置描述
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// 设置图标
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    /// 设置分类
    pub fn with_category(mut self, category: ModuleCategory) -> Self {
        self.category = category;
        self
    }

    /// 设置作者
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// 添加模块依赖
    pub fn requires(mut self, module_id: impl Into<String>) -> Self {
        self.required_modules.push(module_id.into());
        self
    }

    /// 解析版本号
    pub fn parsed_version(&self) -> Result<semver::Version> {
        Ok(semver::Version::parse(&self.version)?)
    }
}

/// 模块设置
///
/// 安装记录中的可变配置部分。`config` 的键值由各模块自行定义，
/// 更新时执行浅合并（同名键整体覆盖）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSettings {
    /// 模块是否启用
    pub enabled: bool,

    /// 模块自定义配置
    #[serde(default)]
    pub config: HashMap<String, Value>,
}

impl Default for ModuleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            config: HashMap::new(),
        }
    }
}

/// 模块安装记录
///
/// 模块注册时创建的运行时状态，区别于不可变的描述符。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleInstallation {
    /// 模块 ID
    pub module_id: String,

    /// 安装时的模块版本
    pub version: String,

    /// 安装时间
    pub installed_at: DateTime<Utc>,

    /// 模块是否启用
    pub enabled: bool,

    /// 模块设置
    pub settings: ModuleSettings,
}

impl ModuleInstallation {
    /// 创建新的安装记录
    pub fn new(metadata: &ModuleMetadata) -> Self {
        Self {
            module_id: metadata.id.clone(),
            version: metadata.version.clone(),
            installed_at: Utc::now(),
            enabled: true,
            settings: ModuleSettings::default(),
        }
    }
}

/// 跨模块搜索结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// 来源模块 ID
    pub module_id: String,

    /// 结果类别（如 "email"、"contact"）
    pub kind: String,

    /// 结果标题
    pub title: String,

    /// 结果副标题
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,

    /// 结果附加数据
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// 相关度评分（缺失按 0 排序）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl SearchResult {
    /// 创建新的搜索结果
    pub fn new(
        module_id: impl Into<String>,
        kind: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            module_id: module_id.into(),
            kind: kind.into(),
            title: title.into(),
            subtitle: None,
            data: None,
            score: None,
        }
    }

    /// 设置评分
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// 设置副标题
    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    /// 排序用评分（缺失按 0）
    pub fn effective_score(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }
}

/// 视图描述符
///
/// 模块主视图和设置视图的声明式描述，由宿主 UI 层解释渲染。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewDescriptor {
    /// 视图组件标识
    pub component: String,

    /// 视图属性
    #[serde(default)]
    pub props: HashMap<String, Value>,
}

impl ViewDescriptor {
    /// 创建新的视图描述符
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            props: HashMap::new(),
        }
    }
}

/// 模块上下文
///
/// 安装钩子执行时内核注入的依赖句柄。模块通过上下文访问
/// 事件总线和服务注册表，而不是进程级全局单例。
#[derive(Clone)]
pub struct ModuleContext {
    /// 事件总线句柄
    pub bus: EventBus,

    /// 服务注册表句柄
    pub services: ServiceRegistry,
}

impl ModuleContext {
    /// 创建新的模块上下文
    pub fn new(bus: EventBus, services: ServiceRegistry) -> Self {
        Self { bus, services }
    }
}

impl std::fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleContext").finish_non_exhaustive()
    }
}

/// 模块插件契约
///
/// 每个功能模块实现此 trait 向内核暴露能力。必选能力：
/// 描述符、安装钩子、主视图、路由表、数据模式；其余为可选钩子。
///
/// # 约定
///
/// - `install` 在依赖模块全部初始化之后被调用，且每个模块
///   至多调用一次（重复初始化是带警告的空操作）
/// - `search` 仅在 `supports_search` 返回 `true` 时被调用；
///   返回错误时该模块被排除出聚合结果，不影响其他模块
/// - `uninstall` 和 `on_settings_changed` 的错误会向调用方传播
#[async_trait]
pub trait ModulePlugin: Send + Sync {
    /// 模块描述符
    fn metadata(&self) -> &ModuleMetadata;

    /// 安装钩子（初始化时调用一次）
    async fn install(&self, ctx: &ModuleContext) -> Result<()>;

    /// 卸载钩子（取消注册时调用）
    async fn uninstall(&self, _ctx: &ModuleContext) -> Result<()> {
        Ok(())
    }

    /// 模块主视图
    fn main_view(&self) -> ViewDescriptor;

    /// 模块路由声明
    fn routes(&self) -> Vec<crate::module::navigation::RouteDefinition>;

    /// 模块数据模式
    fn schema(&self) -> ModuleSchema;

    /// 是否支持跨模块搜索
    fn supports_search(&self) -> bool {
        false
    }

    /// 搜索钩子
    async fn search(&self, _query: &str) -> Result<Vec<SearchResult>> {
        Ok(vec![])
    }

    /// 设置视图（可选）
    fn settings_view(&self) -> Option<ViewDescriptor> {
        None
    }

    /// 设置变更钩子（可选）
    async fn on_settings_changed(&self, _settings: &ModuleSettings) -> Result<()> {
        Ok(())
    }
}

/// 插件实例的共享引用
pub type SharedPlugin = Arc<dyn ModulePlugin>;
