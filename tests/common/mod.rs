//! Shared fixtures and compiler doubles for integration tests.
#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use cubeweave::compiler::{QueryCompiler, SqlCompiler};
use cubeweave::error::{CompileError, CompileResult};
use cubeweave::model::{ContextParams, Dimension, Measure, MemberType, Query, TableSchema};
use cubeweave::resolution::{ResolutionColumnConfig, ResolutionConfig};

/// One call made to a [`RecordingCompiler`].
#[derive(Debug, Clone)]
pub struct Recorded {
    pub query: Query,
    pub schemas: Vec<TableSchema>,
    pub sql: String,
}

/// Delegates to [`SqlCompiler`] and keeps every call for inspection.
#[derive(Debug, Default)]
pub struct RecordingCompiler {
    inner: SqlCompiler,
    calls: Mutex<Vec<Recorded>>,
}

impl RecordingCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call(&self, index: usize) -> Recorded {
        self.calls()[index].clone()
    }
}

#[async_trait]
impl QueryCompiler for RecordingCompiler {
    async fn compile(
        &self,
        query: &Query,
        schemas: &[TableSchema],
        context: Option<&ContextParams>,
    ) -> CompileResult<String> {
        let sql = self.inner.compile(query, schemas, context).await?;
        self.calls.lock().unwrap().push(Recorded {
            query: query.clone(),
            schemas: schemas.to_vec(),
            sql: sql.clone(),
        });
        Ok(sql)
    }
}

/// Fails on the `fail_at`-th call (zero based).
pub struct FailingCompiler {
    pub fail_at: usize,
    seen: Mutex<usize>,
}

impl FailingCompiler {
    pub fn new(fail_at: usize) -> Self {
        Self {
            fail_at,
            seen: Mutex::new(0),
        }
    }
}

#[async_trait]
impl QueryCompiler for FailingCompiler {
    async fn compile(
        &self,
        query: &Query,
        schemas: &[TableSchema],
        context: Option<&ContextParams>,
    ) -> CompileResult<String> {
        let call = {
            let mut seen = self.seen.lock().unwrap();
            *seen += 1;
            *seen - 1
        };
        if call == self.fail_at {
            return Err(CompileError::compiler("database unavailable"));
        }
        SqlCompiler::new().compile(query, schemas, context).await
    }
}

pub fn orders() -> TableSchema {
    TableSchema::new("orders", "SELECT * FROM orders")
        .with_dimension(Dimension::new("id", "orders.id", MemberType::Number).with_alias("Order ID"))
        .with_dimension(Dimension::new("status", "orders.status", MemberType::String))
        .with_dimension(
            Dimension::new("owner_ids", "orders.owner_ids", MemberType::StringArray)
                .with_alias("Owners"),
        )
        .with_dimension(Dimension::new("region_id", "orders.region_id", MemberType::String))
        .with_dimension(Dimension::new("customer_id", "orders.customer_id", MemberType::Number))
        .with_measure(Measure::new("count", "COUNT(*)", MemberType::Number))
        .with_join("orders.customer_id = customers.id")
}

pub fn customers() -> TableSchema {
    TableSchema::new("customers", "SELECT * FROM customers")
        .with_dimension(Dimension::new("id", "customers.id", MemberType::String).with_alias("Customer ID"))
        .with_dimension(
            Dimension::new("display_name", "customers.display_name", MemberType::String)
                .with_alias("Display Name"),
        )
        .with_dimension(Dimension::new("email", "customers.email", MemberType::String))
}

pub fn regions() -> TableSchema {
    TableSchema::new("regions", "SELECT * FROM regions")
        .with_dimension(Dimension::new("id", "regions.id", MemberType::String))
        .with_dimension(Dimension::new("name", "regions.name", MemberType::String).with_alias("Region"))
}

pub fn owners_config(columns: &[&str]) -> ResolutionColumnConfig {
    ResolutionColumnConfig::new(
        "orders.owner_ids",
        MemberType::StringArray,
        "customers",
        "id",
        columns,
    )
}

pub fn region_config() -> ResolutionColumnConfig {
    ResolutionColumnConfig::new("orders.region_id", MemberType::String, "regions", "id", &["name"])
}

pub fn resolution_config(column_configs: Vec<ResolutionColumnConfig>) -> ResolutionConfig {
    ResolutionConfig {
        column_configs,
        table_schemas: vec![customers(), regions()],
        sql_override_configs: Vec::new(),
    }
}
