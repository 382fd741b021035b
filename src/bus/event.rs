//! 事件数据结构
//!
//! 定义事件总线使用的事件记录、负载变体和事件名目录。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 事件负载
///
/// 按事件所属领域划分的封闭变体集合。模块间传递的负载
/// 必须落在这些变体之一中；无法归类的数据使用 `Custom`。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    /// 无负载
    None,

    /// 模块生命周期事件负载
    Module {
        /// 模块 ID
        module_id: String,
        /// 模块版本
        #[serde(skip_serializing_if = "Option::is_none")]
        version: Option<String>,
    },

    /// 认证事件负载
    Auth {
        /// 用户 ID
        #[serde(skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
    },

    /// 邮件事件负载
    Email {
        /// 邮件 ID
        email_id: String,
        /// 所在文件夹
        #[serde(skip_serializing_if = "Option::is_none")]
        folder: Option<String>,
    },

    /// 联系人事件负载
    Contact {
        /// 联系人 ID
        contact_id: String,
    },

    /// 日历事件负载
    Calendar {
        /// 日历条目 ID
        entry_id: String,
    },

    /// CRM 商机事件负载
    Deal {
        /// 商机 ID
        deal_id: String,
        /// 商机阶段
        #[serde(skip_serializing_if = "Option::is_none")]
        stage: Option<String>,
    },

    /// 同步事件负载
    Sync {
        /// 同步详情
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },

    /// 通知事件负载
    Notification {
        /// 通知 ID
        notification_id: String,
    },

    /// 搜索事件负载
    Search {
        /// 搜索关键词
        query: String,
    },

    /// UI 事件负载
    Ui {
        /// 事件详情
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },

    /// 自定义负载（逃生舱）
    Custom {
        /// 任意 JSON 数据
        data: Value,
    },
}

impl EventPayload {
    /// 构造模块生命周期负载
    pub fn module(module_id: impl Into<String>) -> Self {
        EventPayload::Module {
            module_id: module_id.into(),
            version: None,
        }
    }

    /// 构造带版本的模块生命周期负载
    pub fn module_with_version(
        module_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        EventPayload::Module {
            module_id: module_id.into(),
            version: Some(version.into()),
        }
    }
}

impl Default for EventPayload {
    fn default() -> Self {
        EventPayload::None
    }
}

/// 事件记录
///
/// 发布到事件总线的完整事件，携带事件名、负载和时间戳。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// 事件名（见 [`events`] 目录）
    pub name: String,

    /// 事件负载
    #[serde(default)]
    pub payload: EventPayload,

    /// 事件时间戳
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// 创建新事件
    pub fn new(name: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            name: name.into(),
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// 事件名目录
///
/// 内核和功能模块约定的事件名常量，按领域分组。
/// 订阅方只能按这些字符串键订阅，不支持通配符。
pub mod events {
    #![allow(missing_docs)]

    // 模块生命周期
    pub const MODULE_INSTALLED: &str = "module:installed";
    pub const MODULE_UNINSTALLED: &str = "module:uninstalled";
    pub const MODULE_ENABLED: &str = "module:enabled";
    pub const MODULE_DISABLED: &str = "module:disabled";

    // 认证
    pub const USER_LOGGED_IN: &str = "user:logged-in";
    pub const USER_LOGGED_OUT: &str = "user:logged-out";
    pub const TOKEN_REFRESHED: &str = "user:token-refreshed";

    // 邮件
    pub const EMAIL_RECEIVED: &str = "email:received";
    pub const EMAIL_SENT: &str = "email:sent";
    pub const EMAIL_DELETED: &str = "email:deleted";
    pub const EMAIL_FLAGGED: &str = "email:flagged";
    pub const EMAIL_MOVED: &str = "email:moved";

    // 联系人
    pub const CONTACT_CREATED: &str = "contact:created";
    pub const CONTACT_UPDATED: &str = "contact:updated";
    pub const CONTACT_DELETED: &str = "contact:deleted";
    pub const CONTACT_MERGED: &str = "contact:merged";

    // 日历
    pub const EVENT_CREATED: &str = "calendar:event-created";
    pub const EVENT_UPDATED: &str = "calendar:event-updated";
    pub const EVENT_DELETED: &str = "calendar:event-deleted";
    pub const EVENT_REMINDER: &str = "calendar:reminder";

    // CRM
    pub const DEAL_CREATED: &str = "crm:deal-created";
    pub const DEAL_UPDATED: &str = "crm:deal-updated";
    pub const DEAL_STAGE_CHANGED: &str = "crm:deal-stage-changed";
    pub const DEAL_WON: &str = "crm:deal-won";
    pub const DEAL_LOST: &str = "crm:deal-lost";

    // 同步
    pub const SYNC_STARTED: &str = "sync:started";
    pub const SYNC_COMPLETED: &str = "sync:completed";
    pub const SYNC_FAILED: &str = "sync:failed";
    pub const SYNC_CONFLICT: &str = "sync:conflict";

    // 通知
    pub const NOTIFICATION_CREATED: &str = "notification:created";
    pub const NOTIFICATION_READ: &str = "notification:read";
    pub const NOTIFICATION_DISMISSED: &str = "notification:dismissed";

    // 搜索
    pub const SEARCH_QUERY: &str = "search:query";
    pub const SEARCH_RESULTS: &str = "search:results";

    // UI
    pub const THEME_CHANGED: &str = "ui:theme-changed";
    pub const SIDEBAR_TOGGLED: &str = "ui:sidebar-toggled";
    pub const MODAL_OPENED: &str = "ui:modal-opened";
    pub const MODAL_CLOSED: &str = "ui:modal-closed";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = Event::new(events::MODULE_INSTALLED, EventPayload::module("email"));
        assert_eq!(event.name, "module:installed");
        assert!(matches!(event.payload, EventPayload::Module { .. }));
    }

    #[test]
    fn test_payload_serialization_roundtrip() {
        let payload = EventPayload::module_with_version("email", "1.0.0");
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"kind\":\"module\""));

        let parsed: EventPayload = serde_json::from_str(&json).unwrap();
        match parsed {
            EventPayload::Module { module_id, version } => {
                assert_eq!(module_id, "email");
                assert_eq!(version.as_deref(), Some("1.0.0"));
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_custom_payload() {
        let payload = EventPayload::Custom {
            data: serde_json::json!({"theme": "dark"}),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "custom");
        assert_eq!(json["data"]["theme"], "dark");
    }
}
