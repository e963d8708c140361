//! Join SQL generation from validated join paths.

use cubeweave::error::CompileError;
use cubeweave::joins::{generate_sql_query, table_sql_map, DirectedGraph, TableSqlMap};
use cubeweave::model::{JoinPath, PathNode, TableSchema};
use insta::assert_snapshot;

fn schemas() -> Vec<TableSchema> {
    vec![
        TableSchema::new("A", "sqlA")
            .with_join("A.id = B.id")
            .with_join("A.c_id = C.id"),
        TableSchema::new("B", "sqlB").with_join("B.d_id = D.id"),
        TableSchema::new("C", "sqlC").with_join("C.d_id = D.id"),
        TableSchema::new("D", "sqlD"),
    ]
}

fn setup() -> (TableSqlMap, DirectedGraph) {
    let schemas = schemas();
    let table_sql = table_sql_map(&schemas);
    let graph = DirectedGraph::build(&schemas, &table_sql).unwrap();
    (table_sql, graph)
}

#[test]
fn test_single_join() {
    let (table_sql, graph) = setup();
    let paths = vec![JoinPath::new(vec![PathNode::join("A", "B", "id")])];

    let sql = generate_sql_query(&paths, &table_sql, &graph).unwrap();
    assert_snapshot!(sql, @"sqlA LEFT JOIN (sqlB) AS B  ON A.id = B.id");
}

#[test]
fn test_branches_from_shared_origin() {
    let (table_sql, graph) = setup();
    let paths = vec![
        JoinPath::new(vec![PathNode::join("A", "B", "id")]),
        JoinPath::new(vec![PathNode::join("A", "C", "c_id")]),
    ];

    let sql = generate_sql_query(&paths, &table_sql, &graph).unwrap();
    assert_eq!(
        sql,
        "sqlA LEFT JOIN (sqlB) AS B  ON A.id = B.id LEFT JOIN (sqlC) AS C  ON A.c_id = C.id"
    );
}

#[test]
fn test_repeated_hop_is_joined_once() {
    let (table_sql, graph) = setup();
    let paths = vec![
        JoinPath::new(vec![PathNode::join("A", "B", "id")]),
        JoinPath::new(vec![
            PathNode::join("A", "B", "id"),
            PathNode::join("B", "D", "d_id"),
        ]),
    ];

    let sql = generate_sql_query(&paths, &table_sql, &graph).unwrap();
    assert_eq!(sql.matches("LEFT JOIN (sqlB)").count(), 1);
    assert!(sql.ends_with("LEFT JOIN (sqlD) AS D  ON B.d_id = D.id"));
}

#[test]
fn test_same_table_from_two_sources_is_ambiguous() {
    let (table_sql, graph) = setup();
    let paths = vec![
        JoinPath::new(vec![
            PathNode::join("A", "B", "id"),
            PathNode::join("B", "D", "d_id"),
        ]),
        JoinPath::new(vec![
            PathNode::join("A", "C", "c_id"),
            PathNode::join("C", "D", "d_id"),
        ]),
    ];

    let err = generate_sql_query(&paths, &table_sql, &graph).unwrap_err();
    assert_eq!(err, CompileError::AmbiguousPath("D".into()));
    assert_eq!(
        err.to_string(),
        "Path ambiguity, node D visited from different sources"
    );
}

#[test]
fn test_different_origins_are_rejected() {
    let (table_sql, graph) = setup();
    let paths = vec![
        JoinPath::new(vec![PathNode::join("A", "B", "id")]),
        JoinPath::new(vec![PathNode::join("B", "D", "d_id")]),
    ];

    assert_eq!(
        generate_sql_query(&paths, &table_sql, &graph),
        Err(CompileError::MismatchedOrigin)
    );
}

#[test]
fn test_single_node_origin() {
    let (table_sql, graph) = setup();
    let paths = vec![JoinPath::new(vec![PathNode::single("A")])];

    assert_eq!(generate_sql_query(&paths, &table_sql, &graph).unwrap(), "sqlA");
}

#[test]
fn test_dotted_table_alias_is_quoted() {
    let schemas = vec![
        TableSchema::new("sales.orders", "sqlO")
            .with_join("\"sales.orders\".customer_id = \"crm.customers\".id"),
        TableSchema::new("crm.customers", "sqlC"),
    ];
    let table_sql = table_sql_map(&schemas);
    let graph = DirectedGraph::build(&schemas, &table_sql).unwrap();
    let paths = vec![JoinPath::new(vec![PathNode::join(
        "sales.orders",
        "crm.customers",
        "customer_id",
    )])];

    let sql = generate_sql_query(&paths, &table_sql, &graph).unwrap();
    assert_eq!(
        sql,
        "sqlO LEFT JOIN (sqlC) AS \"crm.customers\"  ON \"sales.orders\".customer_id = \"crm.customers\".id"
    );
}
