//! 蜂巢内核错误类型定义
//!
//! 本模块定义了内核中使用的所有错误类型。

use thiserror::Error;

/// 蜂巢内核核心错误类型
#[derive(Error, Debug)]
pub enum CoreError {
    // ==================== 模块注册错误 ====================

    /// 模块已注册
    #[error("模块已注册: '{0}'")]
    ModuleAlreadyRegistered(String),

    /// 模块未找到
    #[error("模块未找到: '{0}'")]
    ModuleNotFound(String),

    /// 依赖模块未注册
    #[error("模块 '{module_id}' 依赖的模块 '{required}' 尚未注册")]
    RequiredModuleMissing {
        /// 声明依赖的模块 ID
        module_id: String,
        /// 缺失的依赖模块 ID
        required: String,
    },

    /// 模块有依赖者，无法取消注册
    #[error("模块 '{module}' 被以下模块依赖，无法取消注册: {dependents:?}")]
    ModuleHasDependents {
        /// 被依赖的模块 ID
        module: String,
        /// 依赖者的模块 ID 列表
        dependents: Vec<String>,
    },

    /// 模块有已启用的依赖者，无法禁用
    #[error("模块 '{module}' 被已启用的模块 '{dependent}' 依赖，无法禁用")]
    ModuleHasEnabledDependents {
        /// 被依赖的模块 ID
        module: String,
        /// 已启用的依赖者模块 ID
        dependent: String,
    },

    /// 插件结构校验失败
    #[error("插件校验失败: '{module_id}' - {reason}")]
    InvalidPlugin {
        /// 校验失败的模块 ID
        module_id: String,
        /// 失败原因
        reason: String,
    },

    /// 模块安装钩子失败
    #[error("模块安装失败: '{module_id}' - {reason}")]
    ModuleInstallFailed {
        /// 安装失败的模块 ID
        module_id: String,
        /// 失败原因
        reason: String,
    },

    /// 模块卸载钩子失败
    #[error("模块卸载失败: '{module_id}' - {reason}")]
    ModuleUninstallFailed {
        /// 卸载失败的模块 ID
        module_id: String,
        /// 失败原因
        reason: String,
    },

    /// 模块工厂未登记
    #[error("模块工厂未登记: '{0}'")]
    FactoryNotFound(String),

    // ==================== 服务注册表错误 ====================

    /// 服务未找到
    #[error("服务未找到: '{0}'")]
    ServiceNotFound(String),

    /// 服务类型不匹配
    #[error("服务类型不匹配: '{name}' 期望类型 {expected}")]
    ServiceTypeMismatch {
        /// 服务名
        name: String,
        /// 调用方期望的类型名
        expected: &'static str,
    },

    /// 服务工厂执行失败
    #[error("服务创建失败: '{name}' - {reason}")]
    ServiceCreateFailed {
        /// 服务名
        name: String,
        /// 失败原因
        reason: String,
    },

    // ==================== 事件系统错误 ====================

    /// 订阅未找到
    #[error("订阅未找到: '{0}'")]
    SubscriptionNotFound(String),

    // ==================== 配置错误 ====================

    /// 配置加载失败
    #[error("配置加载失败: {0}")]
    ConfigLoadFailed(String),

    /// 配置值无效
    #[error("配置值无效: '{key}' - {reason}")]
    InvalidConfigValue {
        /// 配置项键名
        key: String,
        /// 无效原因
        reason: String,
    },

    // ==================== IO 和序列化错误 ====================

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化/反序列化错误
    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML 序列化/反序列化错误
    #[error("YAML 错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// 版本解析错误
    #[error("版本解析错误: {0}")]
    VersionParse(#[from] semver::Error),

    // ==================== 通用错误 ====================

    /// 内核状态不允许该操作
    #[error("内核状态不允许该操作: {0}")]
    InvalidCoreState(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),

    /// 其他错误
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// 内核操作结果类型别名
pub type Result<T> = std::result::Result<T, CoreError>;

/// 状态码常量
pub mod status_code {
    /// 成功
    pub const OK: u16 = 200;

    /// 请求格式错误
    pub const BAD_REQUEST: u16 = 400;

    /// 未找到
    pub const NOT_FOUND: u16 = 404;

    /// 冲突
    pub const CONFLICT: u16 = 409;

    /// 内部错误
    pub const INTERNAL_ERROR: u16 = 500;
}

/// 错误码常量
pub mod error_code {
    #![allow(missing_docs)]

    // 模块错误 (MODULE-xxx)
    pub const MODULE_NOT_FOUND: &str = "MODULE-001";
    pub const MODULE_ALREADY_REGISTERED: &str = "MODULE-002";
    pub const MODULE_DEPENDENCY_MISSING: &str = "MODULE-003";
    pub const MODULE_HAS_DEPENDENTS: &str = "MODULE-004";
    pub const MODULE_INVALID_PLUGIN: &str = "MODULE-005";
    pub const MODULE_HOOK_FAILED: &str = "MODULE-006";

    // 服务错误 (SERVICE-xxx)
    pub const SERVICE_NOT_FOUND: &str = "SERVICE-001";
    pub const SERVICE_TYPE_MISMATCH: &str = "SERVICE-002";
    pub const SERVICE_CREATE_FAILED: &str = "SERVICE-003";

    // 配置错误 (CONFIG-xxx)
    pub const CONFIG_LOAD_FAILED: &str = "CONFIG-001";
    pub const CONFIG_INVALID_VALUE: &str = "CONFIG-002";

    // 核心错误 (CORE-xxx)
    pub const CORE_INVALID_STATE: &str = "CORE-001";
    pub const CORE_INTERNAL: &str = "CORE-002";
}

impl CoreError {
    /// 获取错误码
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::ModuleNotFound(_) => error_code::MODULE_NOT_FOUND,
            CoreError::ModuleAlreadyRegistered(_) => error_code::MODULE_ALREADY_REGISTERED,
            CoreError::RequiredModuleMissing { .. } => error_code::MODULE_DEPENDENCY_MISSING,
            CoreError::ModuleHasDependents { .. } => error_code::MODULE_HAS_DEPENDENTS,
            CoreError::ModuleHasEnabledDependents { .. } => error_code::MODULE_HAS_DEPENDENTS,
            CoreError::InvalidPlugin { .. } => error_code::MODULE_INVALID_PLUGIN,
            CoreError::ModuleInstallFailed { .. } => error_code::MODULE_HOOK_FAILED,
            CoreError::ModuleUninstallFailed { .. } => error_code::MODULE_HOOK_FAILED,
            CoreError::FactoryNotFound(_) => error_code::MODULE_NOT_FOUND,
            CoreError::ServiceNotFound(_) => error_code::SERVICE_NOT_FOUND,
            CoreError::ServiceTypeMismatch { .. } => error_code::SERVICE_TYPE_MISMATCH,
            CoreError::ServiceCreateFailed { .. } => error_code::SERVICE_CREATE_FAILED,
            CoreError::ConfigLoadFailed(_) => error_code::CONFIG_LOAD_FAILED,
            CoreError::InvalidConfigValue { .. } => error_code::CONFIG_INVALID_VALUE,
            CoreError::InvalidCoreState(_) => error_code::CORE_INVALID_STATE,
            _ => error_code::CORE_INTERNAL,
        }
    }

    /// 获取 HTTP 风格状态码
    pub fn status_code(&self) -> u16 {
        match self {
            CoreError::ModuleNotFound(_)
            | CoreError::FactoryNotFound(_)
            | CoreError::ServiceNotFound(_)
            | CoreError::SubscriptionNotFound(_) => status_code::NOT_FOUND,
            CoreError::ModuleAlreadyRegistered(_)
            | CoreError::ModuleHasDependents { .. }
            | CoreError::ModuleHasEnabledDependents { .. } => status_code::CONFLICT,
            CoreError::RequiredModuleMissing { .. }
            | CoreError::InvalidPlugin { .. }
            | CoreError::InvalidConfigValue { .. } => status_code::BAD_REQUEST,
            _ => status_code::INTERNAL_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::ModuleNotFound("email".to_string());
        assert!(err.to_string().contains("email"));

        let err = CoreError::RequiredModuleMissing {
            module_id: "crm".to_string(),
            required: "contacts".to_string(),
        };
        assert!(err.to_string().contains("crm"));
        assert!(err.to_string().contains("contacts"));
    }

    #[test]
    fn test_error_code() {
        let err = CoreError::ServiceNotFound("database".to_string());
        assert_eq!(err.error_code(), error_code::SERVICE_NOT_FOUND);

        let err = CoreError::ModuleAlreadyRegistered("email".to_string());
        assert_eq!(err.error_code(), error_code::MODULE_ALREADY_REGISTERED);
    }

    #[test]
    fn test_status_code() {
        let err = CoreError::ModuleNotFound("email".to_string());
        assert_eq!(err.status_code(), status_code::NOT_FOUND);

        let err = CoreError::ModuleAlreadyRegistered("email".to_string());
        assert_eq!(err.status_code(), status_code::CONFLICT);

        let err = CoreError::InvalidPlugin {
            module_id: "email".to_string(),
            reason: "缺少 icon 字段".to_string(),
        };
        assert_eq!(err.status_code(), status_code::BAD_REQUEST);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let core_err: CoreError = io_err.into();
        assert!(matches!(core_err, CoreError::Io(_)));
    }
}
