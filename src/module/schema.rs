//! 模块数据模式
//!
//! 模块声明其持久化数据结构（表、列、索引）的描述类型。
//! 内核只做结构校验和汇总，不负责实际建表。

use serde::{Deserialize, Serialize};

use crate::utils::{CoreError, Result};

/// 列类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// 文本
    Text,
    /// 整数
    Integer,
    /// 浮点数
    Real,
    /// 布尔
    Boolean,
    /// 时间戳
    Timestamp,
    /// JSON 文档
    Json,
    /// 二进制数据
    Blob,
}

/// 列定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// 列名
    pub name: String,

    /// 列类型
    pub column_type: ColumnType,

    /// 是否允许空值
    #[serde(default)]
    pub nullable: bool,

    /// 是否为主键
    #[serde(default)]
    pub primary_key: bool,
}

impl ColumnDefinition {
    /// 创建新列
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
            primary_key: false,
        }
    }

    /// 标记为主键
    pub fn primary(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// 标记为可空
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// 索引定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// 索引名
    pub name: String,

    /// 索引覆盖的列
    pub columns: Vec<String>,

    /// 是否唯一索引
    #[serde(default)]
    pub unique: bool,
}

/// 表定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDefinition {
    /// 表名
    pub name: String,

    /// 列定义
    pub columns: Vec<ColumnDefinition>,

    /// 索引定义
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,
}

impl TableDefinition {
    /// 创建新表定义
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: vec![],
            indexes: vec![],
        }
    }

    /// 添加列
    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    /// 添加索引
    pub fn index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }
}

/// 模块数据模式
///
/// 一个模块声明的全部表结构。空模式合法（纯 UI 模块）。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleSchema {
    /// 表定义列表
    #[serde(default)]
    pub tables: Vec<TableDefinition>,
}

impl ModuleSchema {
    /// 创建空模式
    pub fn empty() -> Self {
        Self::default()
    }

    /// 创建包含指定表的模式
    pub fn with_tables(tables: Vec<TableDefinition>) -> Self {
        Self { tables }
    }

    /// 校验模式结构
    ///
    /// # Errors
    ///
    /// 表名为空、表内无列、列名重复或索引引用不存在的列时返回
    /// `InvalidConfigValue`。
    pub fn validate(&self) -> Result<()> {
        for table in &self.tables {
            if table.name.is_empty() {
                return Err(CoreError::InvalidConfigValue {
                    key: "schema.tables".to_string(),
                    reason: "表名不能为空".to_string(),
                });
            }

            if table.columns.is_empty() {
                return Err(CoreError::InvalidConfigValue {
                    key: format!("schema.tables.{}", table.name),
                    reason: "表必须至少包含一列".to_string(),
                });
            }

            let mut seen = std::collections::HashSet::new();
            for column in &table.columns {
                if !seen.insert(column.name.as_str()) {
                    return Err(CoreError::InvalidConfigValue {
                        key: format!("schema.tables.{}", table.name),
                        reason: format!("列名重复: {}", column.name),
                    });
                }
            }

            for index in &table.indexes {
                for column in &index.columns {
                    if !seen.contains(column.as_str()) {
                        return Err(CoreError::InvalidConfigValue {
                            key: format!("schema.tables.{}.indexes.{}", table.name, index.name),
                            reason: format!("索引引用了不存在的列: {}", column),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// 模式中的表数量
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email_table() -> TableDefinition {
        TableDefinition::new("emails")
            .column(ColumnDefinition::new("id", ColumnType::Text).primary())
            .column(ColumnDefinition::new("subject", ColumnType::Text))
            .column(ColumnDefinition::new("received_at", ColumnType::Timestamp))
            .index(IndexDefinition {
                name: "idx_received".to_string(),
                columns: vec!["received_at".to_string()],
                unique: false,
            })
    }

    #[test]
    fn test_valid_schema() {
        let schema = ModuleSchema::with_tables(vec![email_table()]);
        assert!(schema.validate().is_ok());
        assert_eq!(schema.table_count(), 1);
    }

    #[test]
    fn test_empty_schema_is_valid() {
        assert!(ModuleSchema::empty().validate().is_ok());
    }

    #[test]
    fn test_table_without_columns() {
        let schema = ModuleSchema::with_tables(vec![TableDefinition::new("emails")]);
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_duplicate_column_names() {
        let table = TableDefinition::new("emails")
            .column(ColumnDefinition::new("id", ColumnType::Text))
            .column(ColumnDefinition::new("id", ColumnType::Integer));
        let schema = ModuleSchema::with_tables(vec![table]);
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_index_references_missing_column() {
        let table = TableDefinition::new("emails")
            .column(ColumnDefinition::new("id", ColumnType::Text))
            .index(IndexDefinition {
                name: "idx_missing".to_string(),
                columns: vec!["missing".to_string()],
                unique: false,
            });
        let schema = ModuleSchema::with_tables(vec![table]);
        assert!(schema.validate().is_err());
    }
}
