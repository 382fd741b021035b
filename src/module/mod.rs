//! 模块系统
//!
//! 包含插件契约、数据模式、模块注册表、模块加载器和导航表。

pub mod loader;
pub mod navigation;
pub mod plugin;
pub mod registry;
pub mod schema;

// 重导出常用类型
pub use loader::{LoadReport, ModuleFactory, ModuleLoader};
pub use navigation::{ModuleRoute, NavigationTable, RouteDefinition, RouteMeta};
pub use plugin::{
    ModuleCategory, ModuleContext, ModuleInstallation, ModuleMetadata, ModulePlugin,
    ModuleSettings, SearchResult, SharedPlugin, ViewDescriptor,
};
pub use registry::ModuleRegistry;
pub use schema::{
    ColumnDefinition, ColumnType, IndexDefinition, ModuleSchema, TableDefinition,
};
