// src/resolution/types.rs
use serde::{Deserialize, Serialize};

use crate::config::QueryOptions;
use crate::model::{safe_key, MemberType, TableSchema};

/// Name of the synthetic table wrapping each intermediate SQL statement.
pub const BASE_DATA_SOURCE_NAME: &str = "__base_query";

/// Name (and alias) of the synthetic row id dimension.
pub const ROW_ID_DIMENSION_NAME: &str = "__row_id";

/// Alias of the subquery that orders by the row id before excluding it.
pub const ROW_ID_ORDERED_ALIAS: &str = "__row_id_ordered";

/// One base column whose values are looked up in another table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionColumnConfig {
    /// Member to resolve, e.g. `orders.owner_ids`.
    pub name: String,
    #[serde(rename = "type")]
    pub member_type: MemberType,
    /// Lookup table name.
    pub source: String,
    /// Column of the lookup table matched against the base column.
    pub join_column: String,
    /// Lookup columns projected in place of the base column.
    pub resolution_columns: Vec<String>,
    #[serde(default)]
    pub is_array_type: bool,
}

impl ResolutionColumnConfig {
    pub fn new(
        name: impl Into<String>,
        member_type: MemberType,
        source: impl Into<String>,
        join_column: impl Into<String>,
        resolution_columns: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            member_type,
            source: source.into(),
            join_column: join_column.into(),
            resolution_columns: resolution_columns.iter().map(|c| c.to_string()).collect(),
            is_array_type: member_type.is_array(),
        }
    }

    /// Safe key of the base column; also names the lookup schema built for it.
    pub fn safe_name(&self) -> String {
        safe_key(&self.name, QueryOptions::default())
    }
}

/// Replacement SQL for a base column, applied before unnesting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlOverrideConfig {
    /// Safe key of the overridden field, e.g. `issues__priority`.
    pub field_name: String,
    /// Expression referencing the field in dotted form, e.g. `issues.priority`.
    pub override_sql: String,
    #[serde(rename = "type")]
    pub member_type: MemberType,
}

/// Everything the resolution pipeline needs besides the query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionConfig {
    #[serde(default)]
    pub column_configs: Vec<ResolutionColumnConfig>,
    /// Lookup tables referenced by `column_configs[].source`.
    #[serde(default)]
    pub table_schemas: Vec<TableSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sql_override_configs: Vec<SqlOverrideConfig>,
}

impl ResolutionConfig {
    pub fn has_array_columns(&self) -> bool {
        self.column_configs.iter().any(|c| c.is_array_type)
    }

    pub fn array_column_configs(&self) -> impl Iterator<Item = &ResolutionColumnConfig> {
        self.column_configs.iter().filter(|c| c.is_array_type)
    }

    /// Config resolving `member`, compared by safe key.
    pub fn column_config(&self, member: &str) -> Option<&ResolutionColumnConfig> {
        let key = safe_key(member, QueryOptions::default());
        self.column_configs.iter().find(|c| c.safe_name() == key)
    }

    pub fn source_schema(&self, source: &str) -> Option<&TableSchema> {
        self.table_schemas.iter().find(|s| s.name == source)
    }
}
