//! 日志系统模块
//!
//! 基于 tracing 生态实现内核日志功能：
//!
//! - 多级别日志支持（TRACE, DEBUG, INFO, WARN, ERROR）
//! - 结构化日志（可选 JSON 格式输出）
//! - 文件日志输出（异步非阻塞）
//! - 日志轮转（按时间轮转：每天、每小时）
//! - 日志过滤（EnvFilter 指令）
//!
//! # 示例
//!
//! ```rust,no_run
//! use hive_core::utils::logger::{Logger, LoggerConfig, RotationStrategy};
//! use std::path::PathBuf;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LoggerConfig::builder()
//!         .level("debug")
//!         .file_output(PathBuf::from("./logs"))
//!         .rotation(RotationStrategy::Daily)
//!         .build();
//!
//!     let _guard = Logger::init(config)?;
//!
//!     tracing::info!(module_id = "email", "模块已加载");
//!     Ok(())
//! }
//! ```

use crate::utils::{CoreError, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

// ============================================================================
// 日志轮转策略
// ============================================================================

/// 日志轮转策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationStrategy {
    /// 不轮转（单个日志文件）
    Never,
    /// 每小时轮转
    Hourly,
    /// 每天轮转（默认）
    #[default]
    Daily,
}

impl RotationStrategy {
    /// 转换为 tracing-appender 的 Rotation 类型
    fn to_rotation(self) -> Rotation {
        match self {
            RotationStrategy::Never => Rotation::NEVER,
            RotationStrategy::Hourly => Rotation::HOURLY,
            RotationStrategy::Daily => Rotation::DAILY,
        }
    }

    /// 从字符串解析轮转策略
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "never" | "none" => RotationStrategy::Never,
            "hourly" | "hour" => RotationStrategy::Hourly,
            _ => RotationStrategy::Daily,
        }
    }
}

impl std::fmt::Display for RotationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RotationStrategy::Never => write!(f, "never"),
            RotationStrategy::Hourly => write!(f, "hourly"),
            RotationStrategy::Daily => write!(f, "daily"),
        }
    }
}

// ============================================================================
// 日志配置
// ============================================================================

/// 日志系统配置
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// 默认日志级别（"trace", "debug", "info", "warn", "error"）
    pub level: String,

    /// 是否使用 JSON 格式输出
    pub json_format: bool,

    /// 是否输出到控制台
    pub console_output: bool,

    /// 文件输出目录（None 表示不输出到文件）
    pub file_output: Option<PathBuf>,

    /// 日志文件名前缀
    pub file_prefix: String,

    /// 日志轮转策略
    pub rotation: RotationStrategy,

    /// 是否显示目标模块
    pub show_target: bool,

    /// 是否显示文件名和行号
    pub show_file_line: bool,

    /// 自定义过滤指令（EnvFilter 格式）
    /// 例如："hive_core=debug,hive_core::bus=trace"
    pub filter_directives: Option<String>,

    /// 是否启用 ANSI 颜色（控制台输出）
    pub ansi_colors: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            console_output: true,
            file_output: None,
            file_prefix: "hive-core".to_string(),
            rotation: RotationStrategy::Daily,
            show_target: true,
            show_file_line: false,
            filter_directives: None,
            ansi_colors: true,
        }
    }
}

impl LoggerConfig {
    /// 创建配置构建器
    pub fn builder() -> LoggerConfigBuilder {
        LoggerConfigBuilder::new()
    }

    /// 从内核配置的日志段创建
    pub fn from_log_config(log_config: &crate::core::config::LogConfig) -> Self {
        Self {
            level: log_config.level.clone(),
            json_format: log_config.json_format,
            file_output: if log_config.file_output {
                log_config.log_dir.clone()
            } else {
                None
            },
            rotation: RotationStrategy::parse(&log_config.rotation),
            ..Default::default()
        }
    }
}

/// 日志配置构建器
#[derive(Debug, Default)]
pub struct LoggerConfigBuilder {
    config: LoggerConfig,
}

impl LoggerConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            config: LoggerConfig::default(),
        }
    }

    /// 设置日志级别
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.config.level = level.into();
        self
    }

    /// 启用 JSON 格式输出
    pub fn json_format(mut self, enabled: bool) -> Self {
        self.config.json_format = enabled;
        self
    }

    /// 设置是否输出到控制台
    pub fn console_output(mut self, enabled: bool) -> Self {
        self.config.console_output = enabled;
        self
    }

    /// 设置文件输出目录
    pub fn file_output(mut self, dir: PathBuf) -> Self {
        self.config.file_output = Some(dir);
        self
    }

    /// 设置日志文件名前缀
    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    /// 设置轮转策略
    pub fn rotation(mut self, rotation: RotationStrategy) -> Self {
        self.config.rotation = rotation;
        self
    }

    /// 设置过滤指令
    pub fn filter_directives(mut self, directives: impl Into<String>) -> Self {
        self.config.filter_directives = Some(directives.into());
        self
    }

    /// 构建配置
    pub fn build(self) -> LoggerConfig {
        self.config
    }
}

// ============================================================================
// 日志初始化
// ============================================================================

/// 日志系统守卫
///
/// 持有非阻塞文件写入器的后台线程句柄；丢弃后文件日志停止刷盘。
/// 应在 main 中持有直到进程退出。
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// 日志系统入口
pub struct Logger;

impl Logger {
    /// 初始化全局日志系统
    ///
    /// 只能调用一次；重复初始化返回错误。
    ///
    /// # Errors
    ///
    /// - 全局 subscriber 已被设置
    /// - 文件输出目录无法创建
    pub fn init(config: LoggerConfig) -> Result<LogGuard> {
        let filter = Self::build_filter(&config);

        // 文件输出层
        let (file_writer, file_guard) = match &config.file_output {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                let appender = RollingFileAppender::new(
                    config.rotation.to_rotation(),
                    dir,
                    &config.file_prefix,
                );
                let (writer, guard) = tracing_appender::non_blocking(appender);
                (Some(writer), Some(guard))
            }
            None => (None, None),
        };

        let registry = tracing_subscriber::registry().with(filter);

        // fmt 层按配置组合：控制台 / 文件，普通 / JSON
        let console_layer = config.console_output.then(|| {
            fmt::layer()
                .with_target(config.show_target)
                .with_file(config.show_file_line)
                .with_line_number(config.show_file_line)
                .with_ansi(config.ansi_colors)
        });

        let result = if config.json_format {
            let console_layer = console_layer.map(|l| l.json().boxed());
            let file_layer = file_writer.map(|w| {
                fmt::layer()
                    .with_target(config.show_target)
                    .with_ansi(false)
                    .with_writer(w)
                    .json()
                    .boxed()
            });
            registry.with(console_layer).with(file_layer).try_init()
        } else {
            let console_layer = console_layer.map(|l| l.boxed());
            let file_layer = file_writer.map(|w| {
                fmt::layer()
                    .with_target(config.show_target)
                    .with_ansi(false)
                    .with_writer(w)
                    .boxed()
            });
            registry.with(console_layer).with(file_layer).try_init()
        };

        result.map_err(|e| CoreError::Internal(format!("日志系统初始化失败: {}", e)))?;

        tracing::debug!(
            level = %config.level,
            json = config.json_format,
            file = config.file_output.is_some(),
            "日志系统已初始化"
        );

        Ok(LogGuard {
            _file_guard: file_guard,
        })
    }

    /// 构建过滤器
    fn build_filter(config: &LoggerConfig) -> EnvFilter {
        if let Some(ref directives) = config.filter_directives {
            EnvFilter::try_new(directives)
                .unwrap_or_else(|_| EnvFilter::new(config.level.clone()))
        } else {
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.level.clone()))
        }
    }
}

/// 常用结构化字段名
pub mod fields {
    /// 模块 ID 字段
    pub const MODULE_ID: &str = "module_id";
    /// 事件名字段
    pub const EVENT: &str = "event";
    /// 服务名字段
    pub const SERVICE: &str = "service";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_strategy_parse() {
        assert_eq!(RotationStrategy::parse("daily"), RotationStrategy::Daily);
        assert_eq!(RotationStrategy::parse("hourly"), RotationStrategy::Hourly);
        assert_eq!(RotationStrategy::parse("never"), RotationStrategy::Never);
        assert_eq!(RotationStrategy::parse("unknown"), RotationStrategy::Daily);
    }

    #[test]
    fn test_rotation_strategy_display() {
        assert_eq!(RotationStrategy::Daily.to_string(), "daily");
        assert_eq!(RotationStrategy::Never.to_string(), "never");
    }

    #[test]
    fn test_logger_config_builder() {
        let config = LoggerConfig::builder()
            .level("debug")
            .json_format(true)
            .file_prefix("test")
            .rotation(RotationStrategy::Hourly)
            .build();

        assert_eq!(config.level, "debug");
        assert!(config.json_format);
        assert_eq!(config.file_prefix, "test");
        assert_eq!(config.rotation, RotationStrategy::Hourly);
    }

    #[test]
    fn test_logger_config_default() {
        let config = LoggerConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.console_output);
        assert!(config.file_output.is_none());
    }
}
