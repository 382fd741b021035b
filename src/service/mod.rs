//! 服务模块
//!
//! 包含服务注册表和服务名目录。

pub mod registry;

// 重导出常用类型
pub use registry::{services, AnyService, BoxedFactory, ServiceRegistry, ServiceToken};
