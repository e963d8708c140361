//! Phase 1: expand array columns into one row per element.

use tracing::{debug, trace};

use crate::compiler::QueryCompiler;
use crate::error::CompileResult;
use crate::model::{namespaced_key, ContextParams, Dimension, Query, TableSchema};

use super::generators::wrapper_table_schema;
use super::types::ResolutionConfig;

/// Rewrite a flagged array dimension to unnest it.
///
/// NULL and empty arrays become `[NULL]` so every input row yields at least
/// one output row.
pub fn apply_array_flatten(dimension: &Dimension) -> Dimension {
    if !dimension.should_flatten_array() {
        return dimension.clone();
    }

    let expr = &dimension.sql;
    Dimension {
        sql: format!(
            "unnest(CASE WHEN {expr} IS NULL OR len(COALESCE({expr}, [])) = 0 THEN [NULL] ELSE {expr} END)"
        ),
        ..dimension.clone()
    }
}

/// Copy of `base` with the columns of array-type configs flagged for flattening.
pub fn with_array_flatten_modifier(base: &TableSchema, config: &ResolutionConfig) -> TableSchema {
    let array_names: Vec<String> = config.array_column_configs().map(|c| c.safe_name()).collect();

    let mut updated = base.clone();
    for dimension in updated
        .dimensions
        .iter_mut()
        .filter(|d| array_names.contains(&d.name))
    {
        let mut modifier = dimension.modifier.unwrap_or_default();
        modifier.flatten_array = true;
        dimension.modifier = Some(modifier);
    }
    updated
}

/// Compile `base` with its array columns unnested and wrap the result.
pub async fn unnest_table_schema<C: QueryCompiler + ?Sized>(
    compiler: &C,
    base: &TableSchema,
    config: &ResolutionConfig,
    context: Option<&ContextParams>,
) -> CompileResult<TableSchema> {
    let mut flagged = with_array_flatten_modifier(base, config);
    flagged.dimensions = flagged.dimensions.iter().map(apply_array_flatten).collect();

    let unnested = flagged
        .dimensions
        .iter()
        .filter(|d| d.should_flatten_array())
        .count();
    debug!(dimensions = flagged.dimensions.len(), unnested, "unnest phase");

    let query = Query::new().with_dimensions(
        flagged
            .dimensions
            .iter()
            .map(|d| namespaced_key(&flagged.name, &d.name)),
    );
    let sql = compiler
        .compile(&query, std::slice::from_ref(&flagged), context)
        .await?;
    trace!(sql = %sql, "unnested sql");

    Ok(wrapper_table_schema(sql, base))
}
