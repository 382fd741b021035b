//! 对外接口模块
//!
//! 包含内核的统一 SDK 入口。

pub mod sdk;

pub use sdk::{CoreState, HiveCore};
