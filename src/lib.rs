//! # Cubeweave
//!
//! Compiles declarative cube queries over several logical tables into one SQL
//! statement, and resolves array-valued foreign keys against lookup tables.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Query + TableSchemas (+ ResolutionConfig)         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [joins]
//! ┌─────────────────────────────────────────────────────────┐
//! │   DirectedGraph  →  path validation  →  LEFT JOIN SQL    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [compiler]
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Base SQL                              │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [resolution]
//! ┌─────────────────────────────────────────────────────────┐
//! │      unnest  →  resolve  →  aggregate  →  aliases        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//!                     Final SQL
//! ```
//!
//! Every step reads its inputs by reference and returns new values; nothing is
//! cached between calls.

pub mod compiler;
pub mod config;
pub mod error;
pub mod joins;
pub mod model;
pub mod resolution;

pub use compiler::{QueryCompiler, SqlCompiler};
pub use config::{QueryOptions, Settings};
pub use error::{CompileError, CompileResult, ErrorCategory};
pub use joins::{combine_table_schemas, DirectedGraph};
pub use model::{Dimension, JoinPath, Measure, MemberType, PathNode, Query, TableSchema};
pub use resolution::{compile_with_resolution, ResolutionConfig, ResolutionRequest};
