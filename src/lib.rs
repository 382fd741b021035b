//! # Hive Core - 蜂巢桌面工作台内核
//!
//! 蜂巢桌面工作台的模块化内核，为可插拔的功能模块（邮件、
//! 联系人、日历、CRM 等）提供以下核心功能：
//!
//! - **模块系统**: 模块的注册、依赖解析、初始化和启用/禁用生命周期
//! - **事件总线**: 模块间的松耦合发布-订阅通信机制
//! - **服务注册表**: 命名单例服务的惰性依赖容器
//! - **跨模块搜索**: 聚合所有已启用模块的搜索结果
//! - **配置管理**: 统一的配置加载和管理
//! - **日志系统**: 结构化日志记录
//!
//! ## 快速开始
//!
//! ```rust,no_run
//! use hive_core::{CoreConfig, HiveCore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 创建内核实例
//!     let config = CoreConfig::default();
//!     let mut core = HiveCore::new(config).await?;
//!
//!     // 启动内核
//!     core.start().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## 模块结构
//!
//! - `bus` - 事件总线相关类型
//! - `service` - 服务注册表相关类型
//! - `module` - 模块系统相关类型
//! - `core` - 核心配置
//! - `utils` - 工具函数和错误类型
//! - `api` - 公共 API 接口

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod api;
pub mod bus;
pub mod core;
pub mod module;
pub mod service;
pub mod utils;

// 重导出常用类型，方便使用
pub use bus::{events, DispatchStats, Event, EventBus, EventHandler, EventPayload, SubscriptionId};

pub use module::{
    LoadReport, ModuleCategory, ModuleContext, ModuleFactory, ModuleInstallation, ModuleLoader,
    ModuleMetadata, ModulePlugin, ModuleRegistry, ModuleSchema, ModuleSettings, NavigationTable,
    RouteDefinition, SearchResult, SharedPlugin, ViewDescriptor,
};

pub use service::{services, ServiceRegistry, ServiceToken};

pub use utils::logger::{fields, LogGuard, Logger, LoggerConfig, LoggerConfigBuilder, RotationStrategy};
pub use utils::{error_code, generate_id, status_code, CoreError, Result};

pub use crate::core::config::{CoreConfig, CoreConfigBuilder, LogConfig, ModuleConfig};

pub use api::sdk::{CoreState, HiveCore};

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
