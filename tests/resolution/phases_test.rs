//! Unnest, resolve and aggregate phases run one at a time.

#[path = "../common/mod.rs"]
mod common;

use common::{orders, owners_config, region_config, resolution_config, RecordingCompiler};
use cubeweave::config::QueryOptions;
use cubeweave::error::CompileError;
use cubeweave::model::{Dimension, MemberType, Query, TableSchema};
use cubeweave::resolution::{
    aggregated_table_schema, create_base_table_schema, is_resolved_array_column,
    resolved_table_schema, row_id_dimension, unnest_table_schema, ResolutionConfig,
    ROW_ID_DIMENSION_NAME,
};

const BASE_SQL: &str = "SELECT * FROM base";

fn safe_config(config: &ResolutionConfig) -> ResolutionConfig {
    let mut safe = config.clone();
    for column_config in &mut safe.column_configs {
        column_config.name = column_config.safe_name();
    }
    safe
}

/// Base schema built from the dotted config, as the pipeline does before
/// switching to safe names.
fn base_with_row_id(config: &ResolutionConfig, members: &[&str]) -> TableSchema {
    let members: Vec<String> = members.iter().map(|m| m.to_string()).collect();
    let mut base = create_base_table_schema(
        BASE_SQL,
        &[orders()],
        &config.column_configs,
        &members,
        QueryOptions::default(),
    )
    .unwrap();
    let row_id = row_id_dimension(&Query::new().order, &base);
    base.dimensions.push(row_id);
    base
}

#[tokio::test]
async fn test_unnest_flattens_only_array_columns() {
    let dotted = resolution_config(vec![owners_config(&["display_name"]), region_config()]);
    let base = base_with_row_id(&dotted, &["orders.id", "orders.owner_ids", "orders.region_id"]);
    let config = safe_config(&dotted);
    let compiler = RecordingCompiler::new();

    let unnested = unnest_table_schema(&compiler, &base, &config, None)
        .await
        .unwrap();

    let call = compiler.call(0);
    assert_eq!(
        call.sql,
        "SELECT __base_query.\"Order ID\" AS \"Order ID\", \
         unnest(CASE WHEN __base_query.\"Owners\" IS NULL OR len(COALESCE(__base_query.\"Owners\", [])) = 0 THEN [NULL] ELSE __base_query.\"Owners\" END) AS \"Owners\", \
         __base_query.\"orders__region_id\" AS \"orders__region_id\", \
         row_number() OVER () AS \"__row_id\" \
         FROM (SELECT * FROM base) AS __base_query"
    );

    assert_eq!(unnested.name, "__base_query");
    assert_eq!(unnested.sql, call.sql);
    assert_eq!(unnested.joins, base.joins);
    let owners = unnested.dimension("orders__owner_ids").unwrap();
    assert_eq!(owners.sql, "__base_query.\"Owners\"");
    assert_eq!(owners.modifier, None);
}

#[tokio::test]
async fn test_unnest_leaves_input_untouched() {
    let dotted = resolution_config(vec![owners_config(&["display_name"])]);
    let base = base_with_row_id(&dotted, &["orders.owner_ids"]);
    let config = safe_config(&dotted);
    let before = base.clone();

    unnest_table_schema(&RecordingCompiler::new(), &base, &config, None)
        .await
        .unwrap();

    assert_eq!(base, before);
}

#[tokio::test]
async fn test_resolve_expands_projection_in_place() {
    let dotted = resolution_config(vec![owners_config(&["display_name", "email"])]);
    let base = base_with_row_id(&dotted, &["orders.owner_ids", "orders.id"]);
    let config = safe_config(&dotted);
    let compiler = RecordingCompiler::new();
    let unnested = unnest_table_schema(&compiler, &base, &config, None)
        .await
        .unwrap();

    let projections = vec![
        "orders.owner_ids".to_string(),
        "orders.id".to_string(),
        ROW_ID_DIMENSION_NAME.to_string(),
    ];
    let resolved = resolved_table_schema(&compiler, &unnested, &config, &projections, None)
        .await
        .unwrap();

    let names: Vec<&str> = resolved.dimensions.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "orders__owner_ids__display_name",
            "orders__owner_ids__email",
            "orders__id",
            "__row_id",
        ]
    );
    assert_eq!(
        resolved.dimensions[0].sql,
        "__base_query.\"orders__owner_ids__display_name\""
    );

    let call = compiler.call(1);
    assert_eq!(call.schemas.len(), 2);
    assert_eq!(call.schemas[1].name, "orders__owner_ids");
    assert!(call.sql.ends_with(
        "LEFT JOIN (SELECT * FROM customers) AS orders__owner_ids  ON __base_query.\"Owners\" = orders__owner_ids.id"
    ));
}

#[tokio::test]
async fn test_resolve_rejects_unknown_projection() {
    let dotted = resolution_config(vec![owners_config(&["display_name"])]);
    let base = base_with_row_id(&dotted, &["orders.owner_ids"]);
    let config = safe_config(&dotted);
    let compiler = RecordingCompiler::new();
    let unnested = unnest_table_schema(&compiler, &base, &config, None)
        .await
        .unwrap();

    // Projected member the unnested schema never exposed.
    let projections = vec!["orders.owner_ids".to_string(), "orders.status".to_string()];
    let err = resolved_table_schema(&RejectingProjection, &unnested, &config, &projections, None)
        .await
        .unwrap_err();
    assert_eq!(err, CompileError::UnknownProjection("orders__status".into()));
}

/// Returns fixed SQL so the projection check runs after compilation.
struct RejectingProjection;

#[async_trait::async_trait]
impl cubeweave::compiler::QueryCompiler for RejectingProjection {
    async fn compile(
        &self,
        _query: &Query,
        _schemas: &[TableSchema],
        _context: Option<&cubeweave::model::ContextParams>,
    ) -> cubeweave::error::CompileResult<String> {
        Ok("SELECT 1".to_string())
    }
}

#[test]
fn test_array_column_detection_is_prefix_based() {
    let config = safe_config(&resolution_config(vec![
        owners_config(&["display_name"]),
        region_config(),
    ]));

    assert!(is_resolved_array_column("orders__owner_ids__display_name", &config));
    assert!(!is_resolved_array_column("orders__owner_ids", &config));
    assert!(!is_resolved_array_column("orders__region_id__name", &config));
    assert!(!is_resolved_array_column("legacy_orders__owner_ids__name", &config));
}

#[tokio::test]
async fn test_aggregate_groups_by_row_id() {
    let config = safe_config(&resolution_config(vec![owners_config(&["display_name"])]));
    let resolved = TableSchema::new("__base_query", "RESOLVED")
        .with_dimension(
            Dimension::new("orders__id", "__base_query.\"Order ID\"", MemberType::Number)
                .with_alias("Order ID"),
        )
        .with_dimension(
            Dimension::new(
                "orders__owner_ids__display_name",
                "__base_query.\"orders__owner_ids__display_name\"",
                MemberType::String,
            )
            .with_alias("orders__owner_ids__display_name"),
        )
        .with_dimension(
            Dimension::new("__row_id", "__base_query.\"__row_id\"", MemberType::Number)
                .with_alias("__row_id"),
        );
    let compiler = RecordingCompiler::new();

    let aggregated = aggregated_table_schema(&compiler, &resolved, &config, None)
        .await
        .unwrap();

    let call = compiler.call(0);
    assert_eq!(
        call.sql,
        "SELECT __base_query.\"__row_id\" AS \"__row_id\", \
         MAX(__base_query.\"Order ID\") AS \"Order ID\", \
         COALESCE(ARRAY_AGG(DISTINCT __base_query.\"orders__owner_ids__display_name\") FILTER (WHERE __base_query.\"orders__owner_ids__display_name\" IS NOT NULL), []) AS \"orders__owner_ids__display_name\" \
         FROM (RESOLVED) AS __base_query GROUP BY 1"
    );
    assert_eq!(
        aggregated.sql,
        format!(
            "SELECT * EXCLUDE (\"__row_id\") FROM ({}) AS __row_id_ordered ORDER BY \"__row_id\"",
            call.sql
        )
    );

    let names: Vec<&str> = aggregated.dimensions.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["orders__id", "orders__owner_ids__display_name"]);
    assert!(aggregated.measures.is_empty());
    assert!(aggregated.joins.is_empty());
}

#[tokio::test]
async fn test_aggregate_requires_row_id() {
    let config = safe_config(&resolution_config(vec![owners_config(&["display_name"])]));
    let resolved = TableSchema::new("__base_query", "RESOLVED").with_dimension(Dimension::new(
        "orders__id",
        "__base_query.\"orders__id\"",
        MemberType::Number,
    ));
    let compiler = RecordingCompiler::new();

    let err = aggregated_table_schema(&compiler, &resolved, &config, None)
        .await
        .unwrap_err();
    assert_eq!(err, CompileError::MissingRowId);
    assert!(compiler.calls().is_empty());
}
