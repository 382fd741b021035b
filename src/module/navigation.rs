//! 导航表
//!
//! 汇总所有模块声明的路由。模块加载后其路由被附加模块身份
//! 元信息并追加到表中；表是只追加的，卸载模块不会移除路由
//! （已知限制，卸载仅清理登记信息）。

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

/// 模块声明的路由（未附加模块身份）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDefinition {
    /// 路由路径（如 "/email/inbox"）
    pub path: String,

    /// 路由名
    pub name: String,

    /// 视图组件标识
    pub component: String,

    /// 附加属性
    #[serde(default)]
    pub props: HashMap<String, Value>,
}

impl RouteDefinition {
    /// 创建新路由声明
    pub fn new(
        path: impl Into<String>,
        name: impl Into<String>,
        component: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            component: component.into(),
            props: HashMap::new(),
        }
    }
}

/// 路由元信息
///
/// 导航表在登记时附加的模块身份信息。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteMeta {
    /// 来源模块 ID
    pub module_id: String,

    /// 来源模块名
    pub module_name: String,

    /// 来源模块图标
    pub module_icon: String,
}

/// 已登记的路由
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleRoute {
    /// 路由声明
    #[serde(flatten)]
    pub definition: RouteDefinition,

    /// 模块身份元信息
    pub meta: RouteMeta,
}

/// 导航表
///
/// 克隆共享同一份路由列表。
#[derive(Clone)]
pub struct NavigationTable {
    routes: Arc<RwLock<Vec<ModuleRoute>>>,
}

impl NavigationTable {
    /// 创建空导航表
    pub fn new() -> Self {
        Self {
            routes: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// 追加一个模块的路由
    ///
    /// 每条路由附加模块身份元信息后登记，按声明顺序排列。
    pub async fn append(&self, meta: RouteMeta, definitions: Vec<RouteDefinition>) {
        let count = definitions.len();
        let mut routes = self.routes.write().await;
        for definition in definitions {
            routes.push(ModuleRoute {
                definition,
                meta: meta.clone(),
            });
        }
        debug!(module_id = %meta.module_id, count, "模块路由已登记");
    }

    /// 所有已登记的路由
    pub async fn routes(&self) -> Vec<ModuleRoute> {
        let routes = self.routes.read().await;
        routes.clone()
    }

    /// 指定模块登记的路由
    pub async fn routes_for_module(&self, module_id: &str) -> Vec<ModuleRoute> {
        let routes = self.routes.read().await;
        routes
            .iter()
            .filter(|r| r.meta.module_id == module_id)
            .cloned()
            .collect()
    }

    /// 按路径查找路由
    pub async fn find(&self, path: &str) -> Option<ModuleRoute> {
        let routes = self.routes.read().await;
        routes.iter().find(|r| r.definition.path == path).cloned()
    }

    /// 已登记路由总数
    pub async fn len(&self) -> usize {
        let routes = self.routes.read().await;
        routes.len()
    }

    /// 导航表是否为空
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for NavigationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NavigationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationTable").finish_non_exhaustive()
    }
}
