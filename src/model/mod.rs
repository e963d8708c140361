//! Schema and query types shared by the join compiler and the resolution pipeline.

pub mod member;
pub mod query;
pub mod table;

pub use member::{
    alias_for_name, alias_for_sql, column_reference, compound_alias, find_in_schemas,
    member_key_to_safe_key, member_table, namespaced_key, quote_identifier, quote_string,
    safe_key, split_member, unquote_identifier,
};
pub use query::{
    ContextParams, FilterOperator, JoinNode, JoinPath, Member, PathNode, Query, QueryFilter,
    QueryOrder, SingleNode, SortDirection,
};
pub use table::{
    Dimension, DimensionModifier, Field, JoinDeclaration, Measure, MemberType, TableSchema,
};
