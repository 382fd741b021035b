//! Hive Core 命令行入口
//!
//! 蜂巢内核的命令行工具，提供启动、管理和调试功能。
//!
//! # 命令概览
//!
//! - `start` - 启动内核
//! - `version` - 显示版本信息
//! - `check-config` - 验证配置文件
//! - `list-modules` - 列出内核内置的模块
//! - `search` - 在内置模块中执行一次搜索
//!
//! # 使用示例
//!
//! ```bash
//! # 启动内核
//! hive-core start
//!
//! # 使用自定义配置文件启动
//! hive-core -c my-config.yaml start
//!
//! # 检查配置文件
//! hive-core check-config -c config.yaml
//!
//! # 查看版本
//! hive-core version
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use hive_core::{CoreConfig, HiveCore};

/// Hive Core - 蜂巢桌面工作台内核
///
/// 蜂巢桌面工作台的核心组件，提供模块系统、事件总线、
/// 服务注册表和跨模块搜索功能。
#[derive(Parser)]
#[command(name = "hive-core")]
#[command(version, about = "蜂巢桌面工作台的模块化内核", long_about = None)]
#[command(author = "Hive Team")]
#[command(propagate_version = true)]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "config.yaml", global = true)]
    config: PathBuf,

    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// 开发模式（启用更详细的日志和调试功能）
    #[arg(long, global = true)]
    dev: bool,

    /// 子命令
    #[command(subcommand)]
    command: Option<Commands>,
}

/// 可用的子命令
#[derive(Subcommand)]
enum Commands {
    /// 启动内核
    ///
    /// 启动蜂巢内核，加载配置中声明的模块并持续运行。
    /// 按 Ctrl+C 可优雅关闭内核。
    Start,

    /// 查看版本信息
    Version,

    /// 验证配置文件
    ///
    /// 检查配置文件是否有效，并显示解析后的配置内容。
    CheckConfig {
        /// 配置文件路径（不指定则使用全局 -c 选项）
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// 列出加载的模块
    ///
    /// 启动一个临时内核实例，显示配置加载后的模块清单。
    ListModules,

    /// 执行一次跨模块搜索
    ///
    /// 启动一个临时内核实例，在所有已启用模块中搜索并打印结果。
    Search {
        /// 搜索关键词
        query: String,
    },
}

/// 初始化日志系统
///
/// 根据日志级别和开发模式配置 tracing 日志。
fn init_logging(level: &str, dev_mode: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::new(format!("hive_core={}", level))
    });

    let builder = fmt().with_env_filter(filter).with_target(true);

    if dev_mode {
        // 开发模式：显示更多信息
        builder
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .init();
    } else {
        // 生产模式：简洁输出
        builder
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// 启动内核
async fn run_start(config: CoreConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("启动蜂巢内核...");

    let mut core = HiveCore::new(config).await?;
    let report = core.start().await?;

    println!();
    println!("╔════════════════════════════════════════════════════════╗");
    println!("║           蜂巢内核已启动 (Hive Core Started)           ║");
    println!("╠════════════════════════════════════════════════════════╣");
    println!("║  版本: {}                                           ║", hive_core::VERSION);
    println!("║  已加载模块: {} 个                                      ║", report.loaded.len());
    println!("║                                                        ║");
    println!("║  按 Ctrl+C 优雅关闭内核                                ║");
    println!("╚════════════════════════════════════════════════════════╝");
    println!();

    for (module_id, reason) in &report.failures {
        println!("⚠️  模块 {} 加载失败: {}", module_id, reason);
    }

    // 等待关闭信号
    signal::ctrl_c().await?;

    println!();
    info!("收到关闭信号，正在优雅关闭...");
    core.shutdown().await?;
    info!("蜂巢内核已关闭");

    Ok(())
}

/// 检查配置文件
async fn check_config(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    println!("检查配置文件: {}", path.display());
    println!();

    if !path.exists() {
        println!("⚠️  警告: 配置文件不存在，将使用默认配置");
        println!();
        print_config(&CoreConfig::default());
        return Ok(());
    }

    match CoreConfig::from_file(path).await {
        Ok(config) => {
            println!("✅ 配置文件有效！");
            println!();
            print_config(&config);
            Ok(())
        }
        Err(e) => {
            println!("❌ 配置文件无效: {}", e);
            Err(Box::new(e))
        }
    }
}

/// 打印配置内容
fn print_config(config: &CoreConfig) {
    println!("配置内容:");
    println!("────────────────────────────────────────");
    println!("  [日志配置]");
    println!("    日志级别:       {}", config.logging.level);
    println!("    文件输出:       {}", if config.logging.file_output { "是" } else { "否" });
    println!("    JSON 格式:      {}", if config.logging.json_format { "是" } else { "否" });
    println!();
    println!("  [模块配置]");
    println!("    自动加载:       {:?}", config.modules.auto_load);
    println!("    默认启用:       {}", if config.modules.enabled_by_default { "是" } else { "否" });
    println!();
    println!("  [其他]");
    println!("    开发模式:       {}", if config.dev_mode { "是" } else { "否" });
    if let Some(ref data_dir) = config.data_dir {
        println!("    数据目录:       {}", data_dir.display());
    }
    println!("────────────────────────────────────────");
}

/// 打印版本信息
fn print_version() {
    println!();
    println!("Hive Core - 蜂巢桌面工作台内核");
    println!("═══════════════════════════════════════");
    println!("  版本:             {}", hive_core::VERSION);
    println!();
    println!("构建信息:");
    println!("  目标平台:         {}", std::env::consts::ARCH);
    println!("  操作系统:         {}", std::env::consts::OS);
    println!("═══════════════════════════════════════");
    println!();
}

/// 列出加载的模块
async fn list_modules(config: CoreConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut core = HiveCore::new(config).await?;
    core.start().await?;

    let modules = core.list_modules().await;

    println!();
    println!("已加载模块 ({} 个)", modules.len());
    println!("═══════════════════════════════════════");
    for metadata in &modules {
        let enabled = core.modules().is_enabled(&metadata.id).await;
        println!(
            "  {} v{} [{}] - {}",
            metadata.id,
            metadata.version,
            if enabled { "启用" } else { "禁用" },
            metadata.name
        );
        if !metadata.required_modules.is_empty() {
            println!("    依赖: {:?}", metadata.required_modules);
        }
    }
    if modules.is_empty() {
        println!("  （无。请在配置的 modules.auto_load 中声明模块）");
    }
    println!("═══════════════════════════════════════");
    println!();

    core.shutdown().await?;
    Ok(())
}

/// 执行一次跨模块搜索
async fn run_search(config: CoreConfig, query: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut core = HiveCore::new(config).await?;
    core.start().await?;

    let results = core.search(query).await;

    println!();
    println!("搜索 \"{}\": {} 条结果", query, results.len());
    println!("═══════════════════════════════════════");
    for result in &results {
        println!(
            "  [{:.2}] {} ({} / {})",
            result.effective_score(),
            result.title,
            result.module_id,
            result.kind
        );
    }
    println!("═══════════════════════════════════════");
    println!();

    core.shutdown().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 初始化日志（Version 和 CheckConfig 命令不需要日志）
    let needs_logging = !matches!(
        cli.command,
        Some(Commands::Version) | Some(Commands::CheckConfig { .. })
    );

    if needs_logging {
        init_logging(&cli.log_level, cli.dev);
    }

    match cli.command {
        // 默认命令或 Start 命令：启动内核
        Some(Commands::Start) | None => {
            let config = load_config(&cli.config, cli.dev).await?;
            run_start(config).await?;
        }

        Some(Commands::Version) => {
            print_version();
        }

        Some(Commands::CheckConfig { config }) => {
            let config_path = config.unwrap_or(cli.config);
            check_config(&config_path).await?;
        }

        Some(Commands::ListModules) => {
            let config = load_config(&cli.config, cli.dev).await?;
            list_modules(config).await?;
        }

        Some(Commands::Search { query }) => {
            let config = load_config(&cli.config, cli.dev).await?;
            run_search(config, &query).await?;
        }
    }

    Ok(())
}

/// 加载配置文件
async fn load_config(
    config_path: &PathBuf,
    dev_mode: bool,
) -> Result<CoreConfig, Box<dyn std::error::Error>> {
    let config = if config_path.exists() {
        let mut config = CoreConfig::from_file(config_path).await?;
        if dev_mode {
            config.dev_mode = true;
        }
        info!("已加载配置文件: {}", config_path.display());
        config
    } else {
        info!("配置文件不存在 ({})，使用默认配置", config_path.display());
        let mut config = CoreConfig::default();
        if dev_mode {
            config.dev_mode = true;
        }
        config
    };

    Ok(config)
}
