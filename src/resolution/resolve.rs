//! Phase 2: join each resolved column against its lookup schema.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::compiler::QueryCompiler;
use crate::error::{CompileError, CompileResult};
use crate::model::{
    column_reference, member_key_to_safe_key, ContextParams, Dimension, Member, Query, TableSchema,
};

use super::generators::{
    generate_resolution_join_paths, generate_resolution_schemas, generate_resolved_dimensions,
    wrapper_table_schema,
};
use super::types::ResolutionConfig;

/// Compile the join of `base` with every lookup schema and wrap the result.
///
/// The wrapped schema lists dimensions in projection order, with each resolved
/// column replaced in place by the lookup columns it expands to.
pub async fn resolved_table_schema<C: QueryCompiler + ?Sized>(
    compiler: &C,
    base: &TableSchema,
    config: &ResolutionConfig,
    projections: &[Member],
    context: Option<&ContextParams>,
) -> CompileResult<TableSchema> {
    let resolution_schemas = generate_resolution_schemas(config)?;
    let join_paths = generate_resolution_join_paths(base, &config.column_configs);
    let projections: Vec<Member> = projections
        .iter()
        .map(|p| member_key_to_safe_key(p))
        .collect();
    let members = generate_resolved_dimensions(&base.name, &projections, config);

    debug!(
        lookups = resolution_schemas.len(),
        members = members.len(),
        "resolve phase"
    );

    let mut query = Query::new().with_dimensions(members);
    query.join_paths = join_paths;

    let mut schemas = Vec::with_capacity(resolution_schemas.len() + 1);
    schemas.push(base.clone());
    schemas.extend(resolution_schemas.iter().cloned());

    let sql = compiler.compile(&query, &schemas, context).await?;
    trace!(sql = %sql, "resolved sql");

    let mut resolved = wrapper_table_schema(sql, base);

    let lookup_dimensions: HashMap<&str, &TableSchema> = resolution_schemas
        .iter()
        .map(|schema| (schema.name.as_str(), schema))
        .collect();

    let mut dimensions = Vec::new();
    for projection in &projections {
        if let Some(lookup) = lookup_dimensions.get(projection.as_str()) {
            dimensions.extend(lookup.dimensions.iter().map(|d| Dimension {
                name: d.name.clone(),
                sql: column_reference(&resolved.name, d),
                member_type: d.member_type,
                alias: d.alias.clone(),
                modifier: None,
            }));
            continue;
        }

        let passthrough = resolved
            .dimension(projection)
            .ok_or_else(|| CompileError::UnknownProjection(projection.clone()))?;
        dimensions.push(passthrough.clone());
    }
    resolved.dimensions = dimensions;

    Ok(resolved)
}
