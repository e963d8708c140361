//! Combining the schemas of a multi-table query.

#[path = "../common/mod.rs"]
mod common;

use common::{customers, orders, regions};
use cubeweave::error::CompileError;
use cubeweave::joins::{combine_table_schemas, used_table_schemas, COMBINED_TABLE_NAME};
use cubeweave::model::{FilterOperator, JoinPath, PathNode, Query, QueryFilter};

fn orders_to_customers() -> JoinPath {
    JoinPath::new(vec![PathNode::join("orders", "customers", "customer_id")])
}

#[test]
fn test_combines_joined_tables() {
    let schemas = vec![orders(), customers()];
    let query = Query::new()
        .with_dimensions(["orders.id", "customers.display_name"])
        .with_join_path(orders_to_customers());

    let combined = combine_table_schemas(&schemas, &query).unwrap();

    assert_eq!(combined.name, COMBINED_TABLE_NAME);
    assert_eq!(
        combined.sql,
        "SELECT * FROM orders LEFT JOIN (SELECT * FROM customers) AS customers  ON orders.customer_id = customers.id"
    );
    assert_eq!(combined.dimensions.len(), 8);
    assert_eq!(combined.measures.len(), 1);
    assert!(combined.joins.is_empty());
}

#[test]
fn test_filters_prune_unreferenced_tables() {
    let schemas = vec![orders(), customers(), regions()];
    let query = Query::new()
        .with_measures(["orders.count"])
        .with_filter(QueryFilter::member(
            "customers.email",
            FilterOperator::Set,
            &[],
        ))
        .with_join_path(orders_to_customers());

    let used: Vec<String> = used_table_schemas(&schemas, &query)
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(used, vec!["orders", "customers"]);

    let combined = combine_table_schemas(&schemas, &query).unwrap();
    assert!(!combined.sql.contains("regions"));
    assert!(combined.dimensions.iter().all(|d| !d.sql.starts_with("regions.")));
}

#[test]
fn test_multiple_tables_need_a_join_path() {
    let schemas = vec![orders(), customers()];
    let query = Query::new().with_dimensions(["orders.id", "customers.display_name"]);

    assert_eq!(
        combine_table_schemas(&schemas, &query),
        Err(CompileError::EmptyJoinPath)
    );
}

#[test]
fn test_loop_is_rejected_before_generation() {
    let schemas = vec![
        orders(),
        customers().with_join("customers.id = orders.customer_id"),
    ];
    let query = Query::new()
        .with_dimensions(["orders.id"])
        .with_join_path(JoinPath::new(vec![
            PathNode::join("orders", "customers", "customer_id"),
            PathNode::join("customers", "orders", "id"),
        ]));

    let err = combine_table_schemas(&schemas, &query).unwrap_err();
    assert!(matches!(err, CompileError::LoopDetected(_)));
}

#[test]
fn test_inputs_are_not_mutated() {
    let schemas = vec![orders(), customers()];
    let query = Query::new()
        .with_dimensions(["orders.id"])
        .with_join_path(orders_to_customers());
    let before = (schemas.clone(), query.clone());

    combine_table_schemas(&schemas, &query).unwrap();

    assert_eq!((schemas, query), before);
}
