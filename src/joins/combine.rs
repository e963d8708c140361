//! Fold the tables a query touches into one synthetic schema.

use std::collections::HashSet;

use tracing::debug;

use crate::error::CompileResult;
use crate::model::{member_table, Query, TableSchema};

use super::graph::{table_sql_map, DirectedGraph};
use super::path::validate_join_paths;
use super::sql::generate_sql_query;

/// Name of the schema produced by [`combine_table_schemas`].
pub const COMBINED_TABLE_NAME: &str = "__combined";

/// Restrict `schemas` to the tables a query references.
///
/// Without filters every schema is kept. Otherwise a schema survives when its
/// name is the table part of a measure, a dimension, or a filter member at any
/// nesting depth.
pub fn used_table_schemas(schemas: &[TableSchema], query: &Query) -> Vec<TableSchema> {
    if query.filters.is_empty() {
        return schemas.to_vec();
    }

    let mut used: HashSet<&str> = HashSet::new();
    for filter in &query.filters {
        used.extend(filter.members().into_iter().map(member_table));
    }
    used.extend(query.members().map(|m| member_table(m)));

    schemas
        .iter()
        .filter(|schema| used.contains(schema.name.as_str()))
        .cloned()
        .collect()
}

/// Combine the schemas of a multi-table query into one.
///
/// A single schema is returned as is. Otherwise the used schemas are joined
/// along the query's join paths; the result carries every used measure and
/// dimension, the joined SQL, and no join declarations.
pub fn combine_table_schemas(schemas: &[TableSchema], query: &Query) -> CompileResult<TableSchema> {
    if let [only] = schemas {
        return Ok(only.clone());
    }

    let used = used_table_schemas(schemas, query);
    let table_sql = table_sql_map(&used);
    let graph = DirectedGraph::build(&used, &table_sql)?;
    validate_join_paths(&query.join_paths)?;
    let sql = generate_sql_query(&query.join_paths, &table_sql, &graph)?;

    debug!(
        tables = used.len(),
        edges = graph.edge_count(),
        "combined table schemas"
    );

    let mut combined = TableSchema::new(COMBINED_TABLE_NAME, sql);
    for schema in used {
        combined.measures.extend(schema.measures);
        combined.dimensions.extend(schema.dimensions);
    }
    Ok(combined)
}
