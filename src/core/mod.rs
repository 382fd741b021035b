//! 核心模块
//!
//! 包含内核配置结构。

pub mod config;

pub use config::{CoreConfig, CoreConfigBuilder, LogConfig, ModuleConfig};
