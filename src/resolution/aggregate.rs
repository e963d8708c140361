//! Phase 3: collapse unnested rows back to one row per row id.

use tracing::{debug, trace};

use crate::compiler::QueryCompiler;
use crate::error::{CompileError, CompileResult};
use crate::model::member::SAFE_KEY_DELIMITER;
use crate::model::{namespaced_key, ContextParams, Dimension, Measure, Query, TableSchema};

use super::generators::{wrap_with_row_id_ordering_and_exclusion, wrapper_table_schema};
use super::types::{ResolutionConfig, ROW_ID_DIMENSION_NAME};

/// True when `name` is a lookup column produced for an array-type config.
///
/// Matches on the `<configSafeName>__` prefix only, so a plain column whose
/// name merely contains that text elsewhere stays scalar.
pub fn is_resolved_array_column(name: &str, config: &ResolutionConfig) -> bool {
    config.array_column_configs().any(|c| {
        name.strip_prefix(c.safe_name().as_str())
            .is_some_and(|rest| rest.starts_with(SAFE_KEY_DELIMITER))
    })
}

/// Aggregation expression for one column of the resolved schema.
pub fn aggregation_sql(dimension: &Dimension, is_array: bool) -> String {
    let expr = &dimension.sql;
    if is_array {
        format!("COALESCE(ARRAY_AGG(DISTINCT {expr}) FILTER (WHERE {expr} IS NOT NULL), [])")
    } else {
        format!("MAX({expr})")
    }
}

/// Group the resolved schema by row id and wrap the ordered result.
///
/// Resolved array columns are re-collected with `ARRAY_AGG`; every other
/// column holds one value per row id and is reduced with `MAX`. The returned
/// schema exposes the aggregated columns, without the row id.
pub async fn aggregated_table_schema<C: QueryCompiler + ?Sized>(
    compiler: &C,
    resolved: &TableSchema,
    config: &ResolutionConfig,
    context: Option<&ContextParams>,
) -> CompileResult<TableSchema> {
    let row_id = resolved
        .dimension(ROW_ID_DIMENSION_NAME)
        .ok_or(CompileError::MissingRowId)?;

    let measures: Vec<Measure> = resolved
        .dimensions
        .iter()
        .filter(|d| d.name != row_id.name)
        .map(|d| Measure {
            name: d.name.clone(),
            sql: aggregation_sql(d, is_resolved_array_column(&d.name, config)),
            member_type: d.member_type,
            alias: d.alias.clone(),
        })
        .collect();

    debug!(
        measures = measures.len(),
        arrays = resolved
            .dimensions
            .iter()
            .filter(|d| is_resolved_array_column(&d.name, config))
            .count(),
        "aggregate phase"
    );

    let mut grouped = resolved.clone();
    grouped.dimensions = vec![row_id.clone()];
    grouped.measures = measures;

    let query = Query::new()
        .with_measures(grouped.measures.iter().map(|m| namespaced_key(&grouped.name, &m.name)))
        .with_dimensions([namespaced_key(&grouped.name, &row_id.name)]);

    let sql = compiler
        .compile(&query, std::slice::from_ref(&grouped), context)
        .await?;
    let sql = wrap_with_row_id_ordering_and_exclusion(&sql, ROW_ID_DIMENSION_NAME);
    trace!(sql = %sql, "aggregated sql");

    grouped.dimensions.clear();
    grouped.joins.clear();
    Ok(wrapper_table_schema(sql, &grouped))
}
