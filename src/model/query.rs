//! Cube query types: members, filters, ordering and join paths.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A column identifier, dotted (`table.column`) or safe-keyed (`table__column`).
pub type Member = String;

/// Runtime values substitutable into schema SQL, passed through to the compiler.
pub type ContextParams = BTreeMap<String, String>;

/// One edge traversal in a join path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinNode {
    pub left: String,
    pub right: String,
    pub on: String,
}

impl JoinNode {
    pub fn new(left: impl Into<String>, right: impl Into<String>, on: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            on: on.into(),
        }
    }
}

/// A trivial path with no join (single-table query).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SingleNode {
    pub left: String,
}

/// A node of a join path.
///
/// JSON form is `{left, right, on}` for a join and `{left}` for a single
/// table; the join shape is tried first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathNode {
    Join(JoinNode),
    Single(SingleNode),
}

impl PathNode {
    pub fn join(left: impl Into<String>, right: impl Into<String>, on: impl Into<String>) -> Self {
        PathNode::Join(JoinNode::new(left, right, on))
    }

    pub fn single(left: impl Into<String>) -> Self {
        PathNode::Single(SingleNode { left: left.into() })
    }

    /// The table this node starts from.
    pub fn left(&self) -> &str {
        match self {
            PathNode::Join(node) => &node.left,
            PathNode::Single(node) => &node.left,
        }
    }
}

impl fmt::Display for PathNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathNode::Join(node) => write!(f, "{} -[{}]-> {}", node.left, node.on, node.right),
            PathNode::Single(node) => write!(f, "{}", node.left),
        }
    }
}

/// An ordered sequence of hops sharing one origin table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JoinPath(pub Vec<PathNode>);

impl JoinPath {
    pub fn new(nodes: Vec<PathNode>) -> Self {
        Self(nodes)
    }

    pub fn nodes(&self) -> &[PathNode] {
        &self.0
    }

    /// Origin table of the path, `None` for an empty path.
    pub fn origin(&self) -> Option<&str> {
        self.0.first().map(PathNode::left)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<PathNode>> for JoinPath {
    fn from(nodes: Vec<PathNode>) -> Self {
        Self(nodes)
    }
}

impl fmt::Display for JoinPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nodes: Vec<String> = self.0.iter().map(|n| n.to_string()).collect();
        write!(f, "[{}]", nodes.join(", "))
    }
}

/// Filter operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    In,
    NotIn,
    Gt,
    Gte,
    Lt,
    Lte,
    Set,
    NotSet,
    InDateRange,
    NotInDateRange,
}

/// A query filter: a predicate on one member, or a boolean combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryFilter {
    And {
        and: Vec<QueryFilter>,
    },
    Or {
        or: Vec<QueryFilter>,
    },
    Member {
        member: Member,
        operator: FilterOperator,
        #[serde(default)]
        values: Vec<String>,
    },
}

impl QueryFilter {
    pub fn member(member: impl Into<String>, operator: FilterOperator, values: &[&str]) -> Self {
        QueryFilter::Member {
            member: member.into(),
            operator,
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Every member referenced by this filter, depth first.
    pub fn members(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_members(&mut out);
        out
    }

    fn collect_members<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            QueryFilter::And { and: filters } | QueryFilter::Or { or: filters } => {
                for filter in filters {
                    filter.collect_members(out);
                }
            }
            QueryFilter::Member { member, .. } => out.push(member),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Ordering clauses, kept in the order the caller wrote them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOrder(pub Vec<(Member, SortDirection)>);

impl QueryOrder {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Member, SortDirection)> {
        self.0.iter()
    }
}

impl Serialize for QueryOrder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (member, direction) in &self.0 {
            map.serialize_entry(member, direction)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for QueryOrder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderVisitor;

        impl<'de> Visitor<'de> for OrderVisitor {
            type Value = QueryOrder;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of member to \"asc\" | \"desc\"")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<QueryOrder, A::Error> {
                let mut entries = Vec::new();
                while let Some((member, direction)) = access.next_entry()? {
                    entries.push((member, direction));
                }
                Ok(QueryOrder(entries))
            }
        }

        deserializer.deserialize_map(OrderVisitor)
    }
}

/// A declarative cube query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    #[serde(default)]
    pub measures: Vec<Member>,
    #[serde(default)]
    pub dimensions: Vec<Member>,
    #[serde(default)]
    pub filters: Vec<QueryFilter>,
    #[serde(default)]
    pub join_paths: Vec<JoinPath>,
    #[serde(default, skip_serializing_if = "QueryOrder::is_empty")]
    pub order: QueryOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_measures<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.measures.extend(members.into_iter().map(Into::into));
        self
    }

    pub fn with_dimensions<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dimensions.extend(members.into_iter().map(Into::into));
        self
    }

    pub fn with_filter(mut self, filter: QueryFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_join_path(mut self, path: impl Into<JoinPath>) -> Self {
        self.join_paths.push(path.into());
        self
    }

    pub fn with_order(mut self, member: impl Into<String>, direction: SortDirection) -> Self {
        self.order.0.push((member.into(), direction));
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Measures followed by dimensions, in query order.
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.measures.iter().chain(self.dimensions.iter())
    }
}
