//! Array-dimension resolution.
//!
//! Replaces foreign-key columns with values pulled from lookup tables. Scalar
//! keys need a single join. Array keys go through four phases, each compiling
//! SQL that becomes the next phase's table body:
//!
//! ```text
//! base SQL ──► unnest ──► resolve ──► aggregate ──► aliases ──► SQL
//!   + row id   one row    LEFT JOIN   GROUP BY       display
//!              per item   lookups     row id         names
//! ```
//!
//! The row id is numbered in the query's requested order before unnesting, so
//! ordering the aggregated rows by it restores that order.

pub mod aggregate;
pub mod aliases;
pub mod generators;
pub mod overrides;
pub mod resolve;
pub mod types;
pub mod unnest;

pub use aggregate::{aggregated_table_schema, is_resolved_array_column};
pub use aliases::{apply_alias_map, apply_aliases, build_alias_map, AliasMap};
pub use generators::{
    create_base_table_schema, generate_resolution_join_paths, generate_resolution_schemas,
    generate_resolved_dimensions, generate_row_number_sql, row_id_dimension,
    wrap_with_row_id_ordering_and_exclusion, wrapper_table_schema,
};
pub use overrides::apply_sql_overrides;
pub use resolve::resolved_table_schema;
pub use types::{
    ResolutionColumnConfig, ResolutionConfig, SqlOverrideConfig, BASE_DATA_SOURCE_NAME,
    ROW_ID_DIMENSION_NAME,
};
pub use unnest::{apply_array_flatten, unnest_table_schema, with_array_flatten_modifier};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::compiler::QueryCompiler;
use crate::config::QueryOptions;
use crate::error::CompileResult;
use crate::model::{
    member_key_to_safe_key, namespaced_key, ContextParams, Member, Query, TableSchema,
};

/// A query plus everything needed to resolve its foreign-key columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionRequest {
    pub query: Query,
    pub table_schemas: Vec<TableSchema>,
    #[serde(default)]
    pub resolution_config: ResolutionConfig,
    /// Output columns in order; defaults to the query's measures then dimensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_projections: Option<Vec<Member>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_params: Option<ContextParams>,
}

impl ResolutionRequest {
    pub fn new(query: Query, table_schemas: Vec<TableSchema>) -> Self {
        Self {
            query,
            table_schemas,
            ..Default::default()
        }
    }

    pub fn with_resolution_config(mut self, config: ResolutionConfig) -> Self {
        self.resolution_config = config;
        self
    }

    pub fn with_column_projections<I, S>(mut self, projections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column_projections = Some(projections.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_context_params(mut self, params: ContextParams) -> Self {
        self.context_params = Some(params);
        self
    }

    /// Columns to project, in output order.
    pub fn projections(&self) -> Vec<Member> {
        match &self.column_projections {
            Some(projections) => projections.clone(),
            None => self.query.members().cloned().collect(),
        }
    }
}

/// Compile a query and resolve the columns named by its resolution config.
///
/// Configs for columns that are not projected are ignored. When none remain
/// the base SQL is returned as is.
pub async fn compile_with_resolution<C: QueryCompiler + ?Sized>(
    compiler: &C,
    request: &ResolutionRequest,
    options: QueryOptions,
) -> CompileResult<String> {
    let context = request.context_params.as_ref();
    let base_sql = compiler
        .compile(&request.query, &request.table_schemas, context)
        .await?;
    trace!(sql = %base_sql, "base sql");

    let config = &request.resolution_config;
    if config.column_configs.is_empty() {
        return Ok(base_sql);
    }

    let projections = request.projections();
    let mut scoped = config.clone();
    scoped.column_configs.retain(|c| {
        projections
            .iter()
            .any(|p| member_key_to_safe_key(p) == c.safe_name())
    });

    debug!(
        configs = config.column_configs.len(),
        projected = scoped.column_configs.len(),
        arrays = scoped.has_array_columns(),
        "resolving columns"
    );

    if scoped.column_configs.is_empty() {
        return Ok(base_sql);
    }

    if scoped.has_array_columns() {
        compile_with_array_resolution(compiler, request, &base_sql, &scoped, options).await
    } else {
        compile_with_scalar_resolution(compiler, request, &base_sql, &scoped, options).await
    }
}

/// Four-phase resolution for configs containing array-valued keys.
pub async fn compile_with_array_resolution<C: QueryCompiler + ?Sized>(
    compiler: &C,
    request: &ResolutionRequest,
    base_sql: &str,
    config: &ResolutionConfig,
    options: QueryOptions,
) -> CompileResult<String> {
    let context = request.context_params.as_ref();
    let mut projections = request.projections();

    let mut base = create_base_table_schema(
        base_sql,
        &request.table_schemas,
        &config.column_configs,
        &projections,
        options,
    )?;
    base = apply_sql_overrides(&base, &config.sql_override_configs)?;
    base.dimensions
        .push(row_id_dimension(&request.query.order, &base));
    projections.push(ROW_ID_DIMENSION_NAME.to_string());

    // Later phases address the base columns by safe key.
    let mut safe_config = config.clone();
    for column_config in &mut safe_config.column_configs {
        column_config.name = column_config.safe_name();
    }

    let unnested = unnest_table_schema(compiler, &base, &safe_config, context).await?;
    let resolved =
        resolved_table_schema(compiler, &unnested, &safe_config, &projections, context).await?;
    let aggregated = aggregated_table_schema(compiler, &resolved, &safe_config, context).await?;

    apply_aliases(
        compiler,
        &aggregated,
        &request.table_schemas,
        &safe_config,
        context,
    )
    .await
}

/// Single-join resolution for scalar keys, keeping the base query's row order.
pub async fn compile_with_scalar_resolution<C: QueryCompiler + ?Sized>(
    compiler: &C,
    request: &ResolutionRequest,
    base_sql: &str,
    config: &ResolutionConfig,
    options: QueryOptions,
) -> CompileResult<String> {
    let context = request.context_params.as_ref();
    let members: Vec<Member> = request.query.members().cloned().collect();

    let mut base = create_base_table_schema(
        base_sql,
        &request.table_schemas,
        &config.column_configs,
        &members,
        options,
    )?;
    base = apply_sql_overrides(&base, &config.sql_override_configs)?;
    base.dimensions
        .push(row_id_dimension(&request.query.order, &base));

    let aliases = build_alias_map(&request.table_schemas, config)?;
    let lookups: Vec<TableSchema> = generate_resolution_schemas(config)?
        .iter()
        .map(|schema| apply_alias_map(schema, &aliases))
        .collect();

    let mut dimensions =
        generate_resolved_dimensions(&base.name, &request.projections(), config);
    dimensions.push(namespaced_key(&base.name, ROW_ID_DIMENSION_NAME));

    let mut query = Query::new().with_dimensions(dimensions);
    query.join_paths = generate_resolution_join_paths(&base, &config.column_configs);

    let mut schemas = Vec::with_capacity(lookups.len() + 1);
    schemas.push(base);
    schemas.extend(lookups);

    let sql = compiler.compile(&query, &schemas, context).await?;
    Ok(wrap_with_row_id_ordering_and_exclusion(
        &sql,
        ROW_ID_DIMENSION_NAME,
    ))
}
