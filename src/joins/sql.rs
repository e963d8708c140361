//! Join SQL generation: stitch join paths sharing an origin into one statement.

use std::collections::HashMap;

use tracing::trace;

use crate::error::{CompileError, CompileResult};
use crate::model::{quote_identifier, JoinNode, JoinPath, PathNode};

use super::graph::{DirectedGraph, TableSqlMap};

/// Generate the FROM body for `paths`.
///
/// Every path must start at the same table. A single-node origin yields that
/// table's SQL unchanged. Each table is joined once; reaching it again from the
/// same left table is a no-op, reaching it from a different one is ambiguous.
pub fn generate_sql_query(
    paths: &[JoinPath],
    table_sql: &TableSqlMap,
    graph: &DirectedGraph,
) -> CompileResult<String> {
    let first = paths
        .first()
        .and_then(|path| path.nodes().first())
        .ok_or(CompileError::EmptyJoinPath)?;

    let origin = first.left();
    for path in paths {
        if path.origin() != Some(origin) {
            return Err(CompileError::MismatchedOrigin);
        }
    }

    let mut query = table_sql_for(table_sql, origin)?.to_string();

    if let PathNode::Single(_) = first {
        return Ok(query);
    }

    let mut reached: HashMap<&str, &JoinNode> = HashMap::new();

    for path in paths {
        for node in path.nodes() {
            let PathNode::Join(join) = node else {
                continue;
            };

            match reached.get(join.right.as_str()) {
                Some(previous) if previous.left == join.left => continue,
                Some(_) => return Err(CompileError::AmbiguousPath(join.right.clone())),
                None => {}
            }
            reached.insert(join.right.as_str(), join);

            let right_sql = table_sql_for(table_sql, &join.right)?;
            let condition = graph
                .condition(&join.left, &join.right, &join.on)
                .ok_or_else(|| CompileError::MissingJoinEdge {
                    left: join.left.clone(),
                    right: join.right.clone(),
                    on: join.on.clone(),
                })?;

            trace!(left = %join.left, right = %join.right, on = %join.on, "emitting join");
            query.push_str(&format!(
                " LEFT JOIN ({}) AS {}  ON {}",
                right_sql,
                table_alias(&join.right),
                condition
            ));
        }
    }

    Ok(query)
}

/// Alias for a joined table, quoted when the name contains a dot.
pub fn table_alias(table: &str) -> String {
    if table.contains('.') {
        quote_identifier(table)
    } else {
        table.to_string()
    }
}

fn table_sql_for<'a>(table_sql: &'a TableSqlMap, table: &str) -> CompileResult<&'a str> {
    table_sql
        .get(table)
        .map(String::as_str)
        .ok_or_else(|| CompileError::UnknownTable(table.to_string()))
}
