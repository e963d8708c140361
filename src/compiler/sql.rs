//! Reference query compiler emitting DuckDB-flavoured SQL text.
//!
//! Covers what the resolution pipeline and simple cube queries need:
//! projections, join paths, member filters, grouping, ordering and paging.

use async_trait::async_trait;
use tracing::trace;

use crate::config::QueryOptions;
use crate::error::{CompileError, CompileResult};
use crate::joins::{
    generate_sql_query, table_alias, table_sql_map, used_table_schemas, validate_join_paths,
    DirectedGraph,
};
use crate::model::{
    alias_for_sql, quote_string, split_member, ContextParams, Field, FilterOperator, Query,
    QueryFilter, TableSchema,
};

use super::QueryCompiler;

/// Compiles queries to SQL without touching a database.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlCompiler {
    options: QueryOptions,
}

struct Projection<'a> {
    member: &'a str,
    field: Field<'a>,
    alias: String,
}

impl SqlCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> QueryOptions {
        self.options
    }

    /// Compile `query` over `schemas`.
    pub fn compile_query(&self, query: &Query, schemas: &[TableSchema]) -> CompileResult<String> {
        let used = match schemas {
            [] => return Err(CompileError::compiler("no table schemas provided")),
            [_] => schemas.to_vec(),
            _ => used_table_schemas(schemas, query),
        };

        let from = self.from_clause(query, &used)?;

        let dimensions = self.projections(&query.dimensions, &used)?;
        let measures = self.projections(&query.measures, &used)?;
        if dimensions.is_empty() && measures.is_empty() {
            return Err(CompileError::compiler("query projects no members"));
        }

        let grouped = !measures.is_empty();
        let select: Vec<String> = dimensions
            .iter()
            .chain(measures.iter())
            .map(|p| format!("{} AS {}", projection_sql(p.field, grouped), p.alias))
            .collect();

        let mut sql = format!("SELECT {} FROM {}", select.join(", "), from);

        let mut where_clauses = Vec::new();
        let mut having_clauses = Vec::new();
        for filter in &query.filters {
            let rendered = self.render_filter(filter, &used)?;
            if self.filter_on_measure(filter, &used) {
                having_clauses.push(rendered);
            } else {
                where_clauses.push(rendered);
            }
        }

        if !where_clauses.is_empty() {
            sql.push_str(&format!(" WHERE {}", where_clauses.join(" AND ")));
        }

        if !measures.is_empty() && !dimensions.is_empty() {
            let ordinals: Vec<String> = (1..=dimensions.len()).map(|i| i.to_string()).collect();
            sql.push_str(&format!(" GROUP BY {}", ordinals.join(", ")));
        }

        if !having_clauses.is_empty() {
            sql.push_str(&format!(" HAVING {}", having_clauses.join(" AND ")));
        }

        if !query.order.is_empty() {
            let clauses = query
                .order
                .iter()
                .map(|(member, direction)| {
                    let target = match dimensions
                        .iter()
                        .chain(measures.iter())
                        .find(|p| p.member == member)
                    {
                        Some(projection) => projection.alias.clone(),
                        None => lookup(member, &used)?.sql().to_string(),
                    };
                    Ok(format!("{} {}", target, direction.as_sql()))
                })
                .collect::<CompileResult<Vec<_>>>()?;
            sql.push_str(&format!(" ORDER BY {}", clauses.join(", ")));
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = query.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        trace!(sql = %sql, "compiled query");
        Ok(sql)
    }

    fn from_clause(&self, query: &Query, used: &[TableSchema]) -> CompileResult<String> {
        if let [only] = used {
            return Ok(format!("({}) AS {}", only.sql, table_alias(&only.name)));
        }

        let table_sql = table_sql_map(used);
        let graph = DirectedGraph::build(used, &table_sql)?;
        validate_join_paths(&query.join_paths)?;

        let origin = query
            .join_paths
            .first()
            .and_then(|path| path.origin())
            .ok_or(CompileError::EmptyJoinPath)?;

        let mut with_origin = table_sql.clone();
        let origin_sql = table_sql
            .get(origin)
            .ok_or_else(|| CompileError::UnknownTable(origin.to_string()))?;
        with_origin.insert(
            origin.to_string(),
            format!("({}) AS {}", origin_sql, table_alias(origin)),
        );

        generate_sql_query(&query.join_paths, &with_origin, &graph)
    }

    fn projections<'a>(
        &self,
        members: &'a [String],
        used: &'a [TableSchema],
    ) -> CompileResult<Vec<Projection<'a>>> {
        members
            .iter()
            .map(|member| {
                let field = lookup(member, used)?;
                Ok(Projection {
                    member,
                    field,
                    alias: alias_for_sql(member, field.alias(), self.options),
                })
            })
            .collect()
    }

    fn filter_on_measure(&self, filter: &QueryFilter, used: &[TableSchema]) -> bool {
        filter
            .members()
            .into_iter()
            .any(|member| lookup(member, used).is_ok_and(|f| f.is_measure()))
    }

    fn render_filter(&self, filter: &QueryFilter, used: &[TableSchema]) -> CompileResult<String> {
        match filter {
            QueryFilter::And { and } => self.render_group(and, " AND ", used),
            QueryFilter::Or { or } => self.render_group(or, " OR ", used),
            QueryFilter::Member {
                member,
                operator,
                values,
            } => {
                let field = lookup(member, used)?;
                render_predicate(member, field, *operator, values)
            }
        }
    }

    fn render_group(
        &self,
        filters: &[QueryFilter],
        joiner: &str,
        used: &[TableSchema],
    ) -> CompileResult<String> {
        let parts = filters
            .iter()
            .map(|f| self.render_filter(f, used))
            .collect::<CompileResult<Vec<_>>>()?;
        match parts.len() {
            0 => Ok("TRUE".to_string()),
            1 => Ok(parts.concat()),
            _ => Ok(format!("({})", parts.join(joiner))),
        }
    }
}

#[async_trait]
impl QueryCompiler for SqlCompiler {
    async fn compile(
        &self,
        query: &Query,
        schemas: &[TableSchema],
        context: Option<&ContextParams>,
    ) -> CompileResult<String> {
        if let Some(context) = context {
            trace!(params = context.len(), "context params passed through");
        }
        self.compile_query(query, schemas)
    }
}

fn lookup<'a>(member: &str, used: &'a [TableSchema]) -> CompileResult<Field<'a>> {
    let (table, field) = split_member(member);
    used.iter()
        .filter(|schema| schema.name == table)
        .find_map(|schema| schema.field(field))
        .ok_or_else(|| CompileError::UnknownMember(member.to_string()))
}

fn render_predicate(
    member: &str,
    field: Field<'_>,
    operator: FilterOperator,
    values: &[String],
) -> CompileResult<String> {
    let expr = field.sql();
    let literal = |value: &String| {
        if field.member_type().is_numeric() && value.parse::<f64>().is_ok() {
            value.clone()
        } else {
            quote_string(value)
        }
    };
    let list = || values.iter().map(literal).collect::<Vec<_>>().join(", ");
    let first = || {
        values
            .first()
            .map(literal)
            .ok_or_else(|| CompileError::compiler(format!("filter on {} needs a value", member)))
    };

    let sql = match operator {
        FilterOperator::Set => format!("{} IS NOT NULL", expr),
        FilterOperator::NotSet => format!("{} IS NULL", expr),
        FilterOperator::Equals | FilterOperator::In if field.member_type().is_array() => {
            format!("list_has_any({}, [{}])", expr, list())
        }
        FilterOperator::NotEquals | FilterOperator::NotIn if field.member_type().is_array() => {
            format!("NOT list_has_any({}, [{}])", expr, list())
        }
        FilterOperator::Equals if values.len() == 1 => format!("{} = {}", expr, first()?),
        FilterOperator::NotEquals if values.len() == 1 => format!("{} != {}", expr, first()?),
        FilterOperator::Equals | FilterOperator::In => {
            first()?;
            format!("{} IN ({})", expr, list())
        }
        FilterOperator::NotEquals | FilterOperator::NotIn => {
            first()?;
            format!("{} NOT IN ({})", expr, list())
        }
        FilterOperator::Contains | FilterOperator::NotContains => {
            first()?;
            let (op, joiner) = match operator {
                FilterOperator::Contains => ("ILIKE", " OR "),
                _ => ("NOT ILIKE", " AND "),
            };
            let parts: Vec<String> = values
                .iter()
                .map(|v| format!("{} {} {}", expr, op, quote_string(&format!("%{}%", v))))
                .collect();
            if parts.len() == 1 {
                parts.concat()
            } else {
                format!("({})", parts.join(joiner))
            }
        }
        FilterOperator::Gt => format!("{} > {}", expr, first()?),
        FilterOperator::Gte => format!("{} >= {}", expr, first()?),
        FilterOperator::Lt => format!("{} < {}", expr, first()?),
        FilterOperator::Lte => format!("{} <= {}", expr, first()?),
        FilterOperator::InDateRange | FilterOperator::NotInDateRange => {
            let [start, end] = values else {
                return Err(CompileError::compiler(format!(
                    "date range filter on {} needs two values",
                    member
                )));
            };
            let keyword = if operator == FilterOperator::InDateRange {
                "BETWEEN"
            } else {
                "NOT BETWEEN"
            };
            format!(
                "{} {} {} AND {}",
                expr,
                keyword,
                quote_string(start),
                quote_string(end)
            )
        }
    };

    Ok(sql)
}

/// Array dimensions flagged for unnested grouping count each element as its
/// own group when the query aggregates.
fn projection_sql(field: Field<'_>, grouped: bool) -> String {
    match field {
        Field::Dimension(d) if grouped && d.should_unnest_group_by() => {
            format!("array[unnest({})]", d.sql)
        }
        _ => field.sql().to_string(),
    }
}
