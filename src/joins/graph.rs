//! Join graph construction from per-table join declarations.
//!
//! Each declaration `A.x = B.y` lives on the table that owns the relationship
//! and becomes one directed edge from the owner to the other table, keyed by
//! the owner-side column. The graph is rebuilt for every compilation from the
//! schemas that take part in it.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tracing::trace;

use crate::error::{CompileError, CompileResult};
use crate::model::{unquote_identifier, TableSchema};

/// Table name → bare SELECT body, restricted to the tables in use.
pub type TableSqlMap = HashMap<String, String>;

/// Build the table SQL map for a set of schemas.
pub fn table_sql_map(schemas: &[TableSchema]) -> TableSqlMap {
    schemas
        .iter()
        .map(|schema| (schema.name.clone(), schema.sql.clone()))
        .collect()
}

/// One owner-side join column and its raw condition text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinEdge {
    /// Column on the owning (left) table.
    pub join_column: String,
    /// The declaration text, used verbatim as the ON condition.
    pub condition: String,
}

/// Directed join graph: `table -> table -> joinColumn -> condition`.
///
/// Several edges may connect the same pair of tables as long as their join
/// columns differ.
#[derive(Debug, Clone, Default)]
pub struct DirectedGraph {
    graph: DiGraph<String, JoinEdge>,
    node_index: HashMap<String, NodeIndex>,
}

/// Parsed side of a join declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JoinSide {
    pub table: String,
    pub column: String,
}

impl DirectedGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from the join declarations of `schemas`.
    ///
    /// Edges touching a table that is absent from `table_sql` are skipped: that
    /// table was pruned from the query and the relationship is irrelevant.
    pub fn build(schemas: &[TableSchema], table_sql: &TableSqlMap) -> CompileResult<Self> {
        let mut graph = DirectedGraph::new();

        for schema in schemas {
            for join in &schema.joins {
                let (left, right) = parse_join_sql(&join.sql)?;

                if left.table == right.table {
                    return Err(CompileError::InvalidJoinSql(join.sql.clone()));
                }

                if left.table != schema.name && right.table != schema.name {
                    return Err(CompileError::JoinTableNotFound {
                        table: schema.name.clone(),
                        sql: join.sql.clone(),
                    });
                }

                if !table_sql.contains_key(&left.table) || !table_sql.contains_key(&right.table) {
                    trace!(sql = %join.sql, "skipping join to a table outside the query");
                    continue;
                }

                if left.table == schema.name {
                    graph.add_edge(&left.table, &right.table, &left.column, &join.sql)?;
                } else {
                    graph.add_edge(&right.table, &left.table, &right.column, &join.sql)?;
                }
            }
        }

        Ok(graph)
    }

    /// Add a directed edge. Self edges and duplicate `(from, to, column)` keys are rejected.
    pub fn add_edge(
        &mut self,
        from: &str,
        to: &str,
        join_column: &str,
        condition: &str,
    ) -> CompileResult<()> {
        if from == to || self.condition(from, to, join_column).is_some() {
            return Err(CompileError::InvalidPath);
        }

        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);
        self.graph.add_edge(
            from_idx,
            to_idx,
            JoinEdge {
                join_column: join_column.to_string(),
                condition: condition.to_string(),
            },
        );
        Ok(())
    }

    fn ensure_node(&mut self, table: &str) -> NodeIndex {
        if let Some(idx) = self.node_index.get(table) {
            return *idx;
        }
        let idx = self.graph.add_node(table.to_string());
        self.node_index.insert(table.to_string(), idx);
        idx
    }

    /// Condition text for the edge `left -> right` keyed by `on`.
    pub fn condition(&self, left: &str, right: &str, on: &str) -> Option<&str> {
        let left_idx = self.node_index.get(left)?;
        let right_idx = self.node_index.get(right)?;
        self.graph
            .edges_connecting(*left_idx, *right_idx)
            .find(|edge| edge.weight().join_column == on)
            .map(|edge| edge.weight().condition.as_str())
    }

    /// True if any edge leads from `left` to `right`.
    pub fn has_edge(&self, left: &str, right: &str) -> bool {
        match (self.node_index.get(left), self.node_index.get(right)) {
            (Some(l), Some(r)) => self.graph.find_edge(*l, *r).is_some(),
            _ => false,
        }
    }

    /// Outgoing edges of `table` as `(target, edge)` pairs, in insertion order.
    pub fn edges_from(&self, table: &str) -> Vec<(&str, &JoinEdge)> {
        let Some(idx) = self.node_index.get(table) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(*idx, Direction::Outgoing)
            .map(|edge| (edge.id(), self.graph[edge.target()].as_str(), edge.weight()))
            .collect();
        edges.sort_by_key(|(id, _, _)| *id);
        edges.into_iter().map(|(_, target, edge)| (target, edge)).collect()
    }

    /// All edges as `(from, to, edge)`, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &JoinEdge)> {
        self.graph.edge_indices().filter_map(move |idx| {
            let (from, to) = self.graph.edge_endpoints(idx)?;
            Some((
                self.graph[from].as_str(),
                self.graph[to].as_str(),
                &self.graph[idx],
            ))
        })
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    /// Tables with no incoming edge: candidate origins for a join path.
    pub fn starting_nodes(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .filter(|idx| {
                self.graph
                    .edges_directed(*idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| self.graph[idx].as_str())
            .collect()
    }

    /// True if the declarations form a directed cycle.
    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }
}

/// Split a declaration into its two sides.
pub(crate) fn parse_join_sql(sql: &str) -> CompileResult<(JoinSide, JoinSide)> {
    let sides: Vec<&str> = sql.split('=').collect();
    if sides.len() != 2 {
        return Err(CompileError::InvalidJoinSql(sql.to_string()));
    }

    let invalid = || CompileError::InvalidJoinSql(sql.to_string());
    let left = parse_join_side(sides[0]).ok_or_else(invalid)?;
    let right = parse_join_side(sides[1]).ok_or_else(invalid)?;
    Ok((left, right))
}

/// Parse `table.column`, `"table.with.dots".column` or `table."Column"`.
fn parse_join_side(side: &str) -> Option<JoinSide> {
    let side = side.trim();

    let (table, rest) = if side.starts_with('"') {
        let end = closing_quote(side)?;
        let table = side[1..end].replace("\"\"", "\"");
        (table, side[end + 1..].strip_prefix('.')?)
    } else {
        let (table, rest) = side.split_once('.')?;
        (table.trim().to_string(), rest)
    };

    let rest = rest.trim();
    if !rest.starts_with('"') && rest.contains('.') {
        return None;
    }

    let column = unquote_identifier(rest);
    if table.is_empty() || column.is_empty() {
        return None;
    }

    Some(JoinSide { table, column })
}

/// Byte index of the quote closing the identifier that opens `s`.
fn closing_quote(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'"' {
            if bytes.get(i + 1) == Some(&b'"') {
                i += 2;
                continue;
            }
            return Some(i);
        }
        i += 1;
    }
    None
}
