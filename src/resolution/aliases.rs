//! Phase 4: restore display aliases and compile the final statement.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::compiler::QueryCompiler;
use crate::error::{CompileError, CompileResult};
use crate::model::{
    compound_alias, member_key_to_safe_key, namespaced_key, ContextParams, Query, TableSchema,
};

use super::generators::resolved_column_name;
use super::types::ResolutionConfig;

/// Safe column name → display alias.
pub type AliasMap = HashMap<String, String>;

/// Build the alias map from the caller's schemas.
///
/// A plain member maps its safe name to its own alias. A resolved member with
/// one lookup column gives that column the member's alias; with several, each
/// column gets `"<member alias> - <lookup column alias>"`. Members without an
/// alias are skipped.
pub fn build_alias_map(
    original_schemas: &[TableSchema],
    config: &ResolutionConfig,
) -> CompileResult<AliasMap> {
    let mut aliases = AliasMap::new();

    for schema in original_schemas {
        let members = schema
            .dimensions
            .iter()
            .map(|d| (&d.name, &d.alias))
            .chain(schema.measures.iter().map(|m| (&m.name, &m.alias)));

        for (name, alias) in members {
            let Some(alias) = alias else {
                continue;
            };
            let column = member_key_to_safe_key(&namespaced_key(&schema.name, name));

            let Some(column_config) = config.column_config(&column) else {
                aliases.insert(column, alias.clone());
                continue;
            };

            if let [only] = column_config.resolution_columns.as_slice() {
                aliases.insert(resolved_column_name(column_config, only), alias.clone());
                continue;
            }

            let source = config
                .source_schema(&column_config.source)
                .ok_or_else(|| CompileError::MissingSourceSchema(column_config.source.clone()))?;

            for resolution_column in &column_config.resolution_columns {
                let source_alias = source
                    .dimension(resolution_column)
                    .and_then(|d| d.alias.as_deref())
                    .ok_or_else(|| CompileError::MissingAlias(resolution_column.clone()))?;
                aliases.insert(
                    resolved_column_name(column_config, resolution_column),
                    compound_alias(alias, source_alias),
                );
            }
        }
    }

    Ok(aliases)
}

/// Copy of `schema` with every dimension aliased from `aliases`, falling back
/// to the dimension's safe name.
pub fn apply_alias_map(schema: &TableSchema, aliases: &AliasMap) -> TableSchema {
    let mut aliased = schema.clone();
    for dimension in &mut aliased.dimensions {
        let alias = aliases
            .get(&dimension.name)
            .cloned()
            .unwrap_or_else(|| dimension.name.clone());
        dimension.alias = Some(alias);
    }
    aliased
}

/// Compile the aggregated schema with display aliases restored.
pub async fn apply_aliases<C: QueryCompiler + ?Sized>(
    compiler: &C,
    aggregated: &TableSchema,
    original_schemas: &[TableSchema],
    config: &ResolutionConfig,
    context: Option<&ContextParams>,
) -> CompileResult<String> {
    let aliases = build_alias_map(original_schemas, config)?;
    let aliased = apply_alias_map(aggregated, &aliases);
    debug!(aliases = aliases.len(), columns = aliased.dimensions.len(), "alias phase");

    let query = Query::new().with_dimensions(
        aliased
            .dimensions
            .iter()
            .map(|d| namespaced_key(&aliased.name, &d.name)),
    );
    let sql = compiler
        .compile(&query, std::slice::from_ref(&aliased), context)
        .await?;
    trace!(sql = %sql, "final sql");
    Ok(sql)
}
