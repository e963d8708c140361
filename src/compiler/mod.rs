//! The query compiler seam.
//!
//! Each resolution phase hands a query plus the schemas it reads to a
//! [`QueryCompiler`] and embeds the returned SQL in the next phase's schema.

mod sql;

pub use sql::SqlCompiler;

use async_trait::async_trait;

use crate::error::CompileResult;
use crate::model::{ContextParams, Query, TableSchema};

/// Compiles a cube query over a set of table schemas into one SELECT statement.
///
/// Implementations must project each member `table.field` as
/// `<field sql> AS "<alias>"`, using the field's alias when set and the
/// member's safe key otherwise. The resolution phases rely on these column
/// names to read the previous phase's output.
#[async_trait]
pub trait QueryCompiler: Send + Sync {
    async fn compile(
        &self,
        query: &Query,
        schemas: &[TableSchema],
        context: Option<&ContextParams>,
    ) -> CompileResult<String>;
}

#[async_trait]
impl<T: QueryCompiler + ?Sized> QueryCompiler for &T {
    async fn compile(
        &self,
        query: &Query,
        schemas: &[TableSchema],
        context: Option<&ContextParams>,
    ) -> CompileResult<String> {
        (**self).compile(query, schemas, context).await
    }
}

#[async_trait]
impl<T: QueryCompiler + ?Sized> QueryCompiler for std::sync::Arc<T> {
    async fn compile(
        &self,
        query: &Query,
        schemas: &[TableSchema],
        context: Option<&ContextParams>,
    ) -> CompileResult<String> {
        (**self).compile(query, schemas, context).await
    }
}
