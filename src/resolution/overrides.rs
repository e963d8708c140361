//! SQL overrides for base columns.
//!
//! An override replaces a column's expression after the base query has been
//! compiled, so filters and sorts already saw the original values. The
//! override references the field in dotted form (`issues.priority`), which is
//! rewritten to the column the base query projects for that field
//! (`__base_query."Priority"`, or `__base_query."issues__priority"` when the
//! field has no alias).

use regex::{NoExpand, Regex};

use crate::error::{CompileError, CompileResult};
use crate::model::member::{COLUMN_NAME_DELIMITER, SAFE_KEY_DELIMITER};
use crate::model::TableSchema;

use super::types::SqlOverrideConfig;

/// Apply `overrides` to a copy of `base`.
pub fn apply_sql_overrides(
    base: &TableSchema,
    overrides: &[SqlOverrideConfig],
) -> CompileResult<TableSchema> {
    let mut updated = base.clone();
    if overrides.is_empty() {
        return Ok(updated);
    }

    for config in overrides {
        let natural = config.field_name.replace(SAFE_KEY_DELIMITER, COLUMN_NAME_DELIMITER);
        if !config.override_sql.contains(&natural) {
            return Err(CompileError::InvalidOverride {
                field: config.field_name.clone(),
                expected: natural,
                sql: config.override_sql.clone(),
            });
        }
        let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(&natural)))
            .map_err(|e| CompileError::compiler(e.to_string()))?;

        for dimension in updated
            .dimensions
            .iter_mut()
            .filter(|d| d.name == config.field_name)
        {
            dimension.sql = rewrite_field_references(&pattern, config, &dimension.sql);
            dimension.member_type = config.member_type;
        }
        for measure in updated
            .measures
            .iter_mut()
            .filter(|m| m.name == config.field_name)
        {
            measure.sql = rewrite_field_references(&pattern, config, &measure.sql);
            measure.member_type = config.member_type;
        }
    }

    Ok(updated)
}

/// Point every dotted reference in the override at `column`, the field's
/// projected column in the base query.
fn rewrite_field_references(pattern: &Regex, config: &SqlOverrideConfig, column: &str) -> String {
    pattern
        .replace_all(&config.override_sql, NoExpand(column))
        .into_owned()
}
