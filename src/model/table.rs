// src/model/table.rs
use serde::{Deserialize, Serialize};

/// Value type of a measure or dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberType {
    String,
    StringArray,
    Time,
    Number,
    NumberArray,
    Boolean,
}

impl MemberType {
    /// Returns true for list-valued types.
    pub fn is_array(&self) -> bool {
        matches!(self, MemberType::StringArray | MemberType::NumberArray)
    }

    /// Returns true for numeric scalars.
    pub fn is_numeric(&self) -> bool {
        matches!(self, MemberType::Number)
    }
}

/// Per-dimension flags consumed by the resolution pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DimensionModifier {
    /// Expand the array into one row per element.
    #[serde(rename = "shouldFlattenArray")]
    pub flatten_array: bool,
    /// Unnest the array when grouping.
    #[serde(rename = "shouldUnnestGroupBy")]
    pub unnest_group_by: bool,
}

/// A pre-defined aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub name: String,
    pub sql: String,
    #[serde(rename = "type")]
    pub member_type: MemberType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl Measure {
    pub fn new(name: impl Into<String>, sql: impl Into<String>, member_type: MemberType) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            member_type,
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// A column (or column expression) that can be projected and grouped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub sql: String,
    #[serde(rename = "type")]
    pub member_type: MemberType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<DimensionModifier>,
}

impl Dimension {
    pub fn new(name: impl Into<String>, sql: impl Into<String>, member_type: MemberType) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            member_type,
            alias: None,
            modifier: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_modifier(mut self, modifier: DimensionModifier) -> Self {
        self.modifier = Some(modifier);
        self
    }

    /// True when the dimension is array-typed and flagged for flattening.
    pub fn should_flatten_array(&self) -> bool {
        self.member_type.is_array() && self.modifier.is_some_and(|m| m.flatten_array)
    }

    /// True when the dimension is array-typed and groups by element.
    pub fn should_unnest_group_by(&self) -> bool {
        self.member_type.is_array() && self.modifier.is_some_and(|m| m.unnest_group_by)
    }
}

/// Raw join text owned by one side of the relationship, e.g. `orders.customer_id = customers.id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinDeclaration {
    pub sql: String,
}

impl JoinDeclaration {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }
}

/// A logical table: a bare SELECT body plus the members it exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub sql: String,
    #[serde(default)]
    pub measures: Vec<Measure>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub joins: Vec<JoinDeclaration>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            measures: Vec::new(),
            dimensions: Vec::new(),
            joins: Vec::new(),
        }
    }

    pub fn with_measure(mut self, measure: Measure) -> Self {
        self.measures.push(measure);
        self
    }

    pub fn with_dimension(mut self, dimension: Dimension) -> Self {
        self.dimensions.push(dimension);
        self
    }

    pub fn with_join(mut self, sql: impl Into<String>) -> Self {
        self.joins.push(JoinDeclaration::new(sql));
        self
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn measure(&self, name: &str) -> Option<&Measure> {
        self.measures.iter().find(|m| m.name == name)
    }

    /// Look up a field by name, dimensions first.
    pub fn field(&self, name: &str) -> Option<Field<'_>> {
        self.dimension(name)
            .map(Field::Dimension)
            .or_else(|| self.measure(name).map(Field::Measure))
    }
}

/// Borrowed view over either kind of member.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<'a> {
    Dimension(&'a Dimension),
    Measure(&'a Measure),
}

impl<'a> Field<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            Field::Dimension(d) => &d.name,
            Field::Measure(m) => &m.name,
        }
    }

    pub fn sql(&self) -> &'a str {
        match self {
            Field::Dimension(d) => &d.sql,
            Field::Measure(m) => &m.sql,
        }
    }

    pub fn member_type(&self) -> MemberType {
        match self {
            Field::Dimension(d) => d.member_type,
            Field::Measure(m) => m.member_type,
        }
    }

    pub fn alias(&self) -> Option<&'a str> {
        match self {
            Field::Dimension(d) => d.alias.as_deref(),
            Field::Measure(m) => m.alias.as_deref(),
        }
    }

    pub fn is_measure(&self) -> bool {
        matches!(self, Field::Measure(_))
    }
}
