//! Schema, member and SQL generators shared by the resolution phases.

use crate::config::QueryOptions;
use crate::error::{CompileError, CompileResult};
use crate::model::{
    alias_for_name, column_reference, find_in_schemas, member_key_to_safe_key, namespaced_key,
    quote_identifier, Dimension, JoinDeclaration, JoinPath, Member, MemberType, PathNode,
    QueryOrder, TableSchema,
};

use super::types::{
    ResolutionColumnConfig, ResolutionConfig, BASE_DATA_SOURCE_NAME, ROW_ID_DIMENSION_NAME,
    ROW_ID_ORDERED_ALIAS,
};

/// Describe the output of the base query as a table named `__base_query`.
///
/// Every member becomes a dimension named by its safe key that reads the
/// column the base query projected for it. Each column config contributes a
/// join declaration from the base column to its lookup schema.
pub fn create_base_table_schema(
    base_sql: &str,
    schemas: &[TableSchema],
    configs: &[ResolutionColumnConfig],
    members: &[Member],
    options: QueryOptions,
) -> CompileResult<TableSchema> {
    let mut base = TableSchema::new(BASE_DATA_SOURCE_NAME, base_sql);

    for member in members {
        let field = find_in_schemas(member, schemas)
            .ok_or_else(|| CompileError::UnknownMember(member.clone()))?;
        let column = alias_for_name(member, field.alias(), options);

        base.dimensions.push(Dimension {
            name: member_key_to_safe_key(member),
            sql: format!("{}.{}", BASE_DATA_SOURCE_NAME, quote_identifier(&column)),
            member_type: field.member_type(),
            alias: Some(column),
            modifier: None,
        });
    }

    for config in configs {
        let alias = find_in_schemas(&config.name, schemas).and_then(|f| f.alias());
        let column = alias_for_name(&config.name, alias, options);
        base.joins.push(JoinDeclaration::new(format!(
            "{}.{} = {}.{}",
            BASE_DATA_SOURCE_NAME,
            quote_identifier(&column),
            config.safe_name(),
            config.join_column
        )));
    }

    Ok(base)
}

/// One lookup schema per column config, named by the base column's safe key.
///
/// Naming by the base column keeps two columns that resolve against the same
/// lookup table apart.
pub fn generate_resolution_schemas(config: &ResolutionConfig) -> CompileResult<Vec<TableSchema>> {
    config
        .column_configs
        .iter()
        .map(|column_config| {
            let source = config
                .source_schema(&column_config.source)
                .ok_or_else(|| CompileError::MissingSourceSchema(column_config.source.clone()))?;
            let base_name = column_config.safe_name();

            let mut schema = TableSchema::new(base_name.clone(), source.sql.clone());
            for column in &column_config.resolution_columns {
                let dimension = source
                    .dimension(column)
                    .ok_or_else(|| CompileError::MissingDimension(column.clone()))?;
                let name = resolved_column_name(column_config, column);

                schema.dimensions.push(Dimension {
                    name: name.clone(),
                    sql: format!("{}.{}", base_name, column),
                    member_type: dimension.member_type,
                    alias: Some(name),
                    modifier: None,
                });
            }
            Ok(schema)
        })
        .collect()
}

/// Safe name of a lookup column produced for `config`: `orders__owner_ids__display_name`.
pub fn resolved_column_name(config: &ResolutionColumnConfig, column: &str) -> String {
    member_key_to_safe_key(&namespaced_key(&config.name, column))
}

/// A single-hop join path from `base` to each lookup schema.
///
/// The hop is keyed by the column the base table exposes for the resolved
/// member, which is the owner-side column of the matching join declaration.
pub fn generate_resolution_join_paths(
    base: &TableSchema,
    configs: &[ResolutionColumnConfig],
) -> Vec<JoinPath> {
    configs
        .iter()
        .map(|config| {
            let name = config.safe_name();
            let on = base
                .dimension(&name)
                .and_then(|d| d.alias.clone())
                .unwrap_or_else(|| name.clone());
            JoinPath::new(vec![PathNode::join(base.name.clone(), name, on)])
        })
        .collect()
}

/// Members to project from the joined base and lookup schemas.
///
/// Projection order is kept; a resolved column expands in place into one
/// member per lookup column.
pub fn generate_resolved_dimensions(
    base_name: &str,
    projections: &[Member],
    config: &ResolutionConfig,
) -> Vec<Member> {
    projections
        .iter()
        .flat_map(|projection| match config.column_config(projection) {
            Some(column_config) => column_config
                .resolution_columns
                .iter()
                .map(|column| {
                    namespaced_key(
                        &column_config.safe_name(),
                        &resolved_column_name(column_config, column),
                    )
                })
                .collect::<Vec<_>>(),
            None => vec![namespaced_key(base_name, &member_key_to_safe_key(projection))],
        })
        .collect()
}

/// `row_number() OVER (ORDER BY ...)` following the query's requested order.
///
/// Each ordered member is looked up among `dimensions` by safe name or alias;
/// the projected column is referenced against `base_name`.
pub fn generate_row_number_sql(
    order: &QueryOrder,
    dimensions: &[Dimension],
    base_name: &str,
) -> String {
    if order.is_empty() {
        return "row_number() OVER ()".to_string();
    }

    let clauses: Vec<String> = order
        .iter()
        .map(|(member, direction)| {
            let safe_member = member_key_to_safe_key(member);
            let column = dimensions
                .iter()
                .find(|d| d.name == safe_member || d.alias.as_deref() == Some(&safe_member))
                .map(|d| d.alias.clone().unwrap_or_else(|| d.name.clone()))
                .unwrap_or(safe_member);
            format!(
                "{}.{} {}",
                base_name,
                quote_identifier(&column),
                direction.as_sql()
            )
        })
        .collect();

    format!("row_number() OVER (ORDER BY {})", clauses.join(", "))
}

/// The synthetic row id dimension for a base schema.
pub fn row_id_dimension(order: &QueryOrder, base: &TableSchema) -> Dimension {
    Dimension::new(
        ROW_ID_DIMENSION_NAME,
        generate_row_number_sql(order, &base.dimensions, &base.name),
        MemberType::Number,
    )
    .with_alias(ROW_ID_DIMENSION_NAME)
}

/// Wrap compiled SQL in a schema exposing each of `source`'s members as a
/// passthrough column of the same name.
pub fn wrapper_table_schema(sql: impl Into<String>, source: &TableSchema) -> TableSchema {
    let mut wrapper = TableSchema::new(source.name.clone(), sql);
    wrapper.joins = source.joins.clone();

    let passthrough = |name: &str, member_type: MemberType, alias: Option<&String>| {
        let mut dimension = Dimension::new(name, String::new(), member_type);
        dimension.alias = alias.cloned();
        dimension.sql = column_reference(&source.name, &dimension);
        dimension
    };

    wrapper.dimensions.extend(
        source
            .dimensions
            .iter()
            .map(|d| passthrough(&d.name, d.member_type, d.alias.as_ref())),
    );
    wrapper.dimensions.extend(
        source
            .measures
            .iter()
            .map(|m| passthrough(&m.name, m.member_type, m.alias.as_ref())),
    );
    wrapper
}

/// Order by the row id, then drop it from the projection.
pub fn wrap_with_row_id_ordering_and_exclusion(sql: &str, row_id: &str) -> String {
    let column = quote_identifier(row_id);
    format!(
        "SELECT * EXCLUDE ({}) FROM ({}) AS {} ORDER BY {}",
        column, sql, ROW_ID_ORDERED_ALIAS, column
    )
}
