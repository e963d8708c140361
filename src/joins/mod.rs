//! Multi-table join compilation.
//!
//! Join declarations on each table become a [`DirectedGraph`]. Join paths from
//! the query are checked for loops, then walked against the graph to produce a
//! single FROM body made of LEFT JOINs.
//!
//! ```text
//! TableSchema.joins ──► DirectedGraph::build ──┐
//!                                              ├─► generate_sql_query ──► SQL
//! Query.join_paths ───► validate_join_paths ───┘
//! ```

pub mod combine;
pub mod graph;
pub mod path;
pub mod sql;

pub use combine::{combine_table_schemas, used_table_schemas, COMBINED_TABLE_NAME};
pub use graph::{table_sql_map, DirectedGraph, JoinEdge, TableSqlMap};
pub use path::{check_loop_in_join_path, validate_join_paths};
pub use sql::{generate_sql_query, table_alias};
