//! 基本使用示例
//!
//! 本示例展示了蜂巢内核的基本使用方法，包括：
//!
//! - 创建内核实例并登记模块工厂
//! - 启动和关闭内核
//! - 订阅事件、获取服务
//! - 跨模块搜索
//!
//! # 运行示例
//!
//! ```bash
//! cargo run --example basic_usage
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use hive_core::{
    events, CoreConfig, EventPayload, HiveCore, ModuleCategory, ModuleContext, ModuleMetadata,
    ModulePlugin, ModuleSchema, Result, RouteDefinition, SearchResult, SharedPlugin,
    ViewDescriptor,
};

/// 演示用的笔记模块
struct NotesModule {
    metadata: ModuleMetadata,
}

impl NotesModule {
    fn new() -> Self {
        Self {
            metadata: ModuleMetadata::new("notes", "笔记", "0.1.0")
                .with_description("本地笔记模块")
                .with_icon("note")
                .with_category(ModuleCategory::Productivity),
        }
    }
}

#[async_trait]
impl ModulePlugin for NotesModule {
    fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }

    async fn install(&self, ctx: &ModuleContext) -> Result<()> {
        // 安装时注册模块自己的存储服务
        ctx.services
            .register_singleton("notes-storage", || async {
                Ok(Vec::<String>::from(["周报草稿".to_string(), "会议纪要".to_string()]))
            })
            .await;
        Ok(())
    }

    fn main_view(&self) -> ViewDescriptor {
        ViewDescriptor::new("NotesMain")
    }

    fn routes(&self) -> Vec<RouteDefinition> {
        vec![RouteDefinition::new("/notes", "notes", "NotesMain")]
    }

    fn schema(&self) -> ModuleSchema {
        ModuleSchema::empty()
    }

    fn supports_search(&self) -> bool {
        true
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        Ok(vec![
            SearchResult::new("notes", "note", format!("关于 \"{}\" 的笔记", query))
                .with_score(0.8),
        ])
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("=== 蜂巢内核基本使用示例 ===\n");

    // -------------------------------------------------------------------------
    // 1. 创建内核并登记模块工厂
    // -------------------------------------------------------------------------
    println!("1. 创建内核...");

    let config = CoreConfig::builder()
        .log_level("warn")
        .auto_load("notes")
        .build();

    let mut core = HiveCore::new(config).await?;
    core.register_factory(
        "notes",
        Arc::new(|| Arc::new(NotesModule::new()) as SharedPlugin),
    )
    .await;
    println!("   ✅ 内核创建成功\n");

    // -------------------------------------------------------------------------
    // 2. 订阅模块生命周期事件
    // -------------------------------------------------------------------------
    println!("2. 订阅模块生命周期事件...");
    core.event_bus()
        .on(
            events::MODULE_INSTALLED,
            Arc::new(|event| {
                if let EventPayload::Module { module_id, .. } = &event.payload {
                    println!("   [事件] 模块已安装: {}", module_id);
                }
            }),
        )
        .await;

    // -------------------------------------------------------------------------
    // 3. 启动内核（加载 auto_load 声明的模块）
    // -------------------------------------------------------------------------
    println!("3. 启动内核...");
    let report = core.start().await?;
    println!("   已加载模块: {:?}", report.loaded);
    println!("   ✅ 内核启动成功\n");

    // -------------------------------------------------------------------------
    // 4. 获取模块注册的服务
    // -------------------------------------------------------------------------
    println!("4. 获取笔记存储服务...");
    let notes = core.services().get::<Vec<String>>("notes-storage").await?;
    println!("   现有笔记: {:?}\n", *notes);

    // -------------------------------------------------------------------------
    // 5. 跨模块搜索
    // -------------------------------------------------------------------------
    println!("5. 执行跨模块搜索...");
    let results = core.search("周报").await;
    for result in &results {
        println!(
            "   [{:.2}] {} (来自 {})",
            result.effective_score(),
            result.title,
            result.module_id
        );
    }
    println!();

    // -------------------------------------------------------------------------
    // 6. 查看导航表
    // -------------------------------------------------------------------------
    println!("6. 导航表中的路由:");
    for route in core.navigation().routes().await {
        println!(
            "   {} -> {} ({})",
            route.definition.path, route.definition.component, route.meta.module_name
        );
    }
    println!();

    // -------------------------------------------------------------------------
    // 7. 关闭内核
    // -------------------------------------------------------------------------
    println!("7. 关闭内核...");
    core.shutdown().await?;
    println!("   ✅ 内核已关闭");

    Ok(())
}
