//! Member formatting: safe keys, namespacing, aliases and schema lookups.
//!
//! A member is written `table.column`. Its safe key replaces every `.` with
//! `__` so it can be used as a bare SQL identifier. The conversion is a
//! literal substitution, so a raw name that already contains `__` cannot be
//! told apart from a namespaced one.

use crate::config::QueryOptions;

use super::table::{Dimension, Field, TableSchema};

/// Separator between table and column in a member.
pub const COLUMN_NAME_DELIMITER: &str = ".";

/// Separator used in place of `.` inside safe keys.
pub const SAFE_KEY_DELIMITER: &str = "__";

/// Convert a member to its safe key: `orders.customer_id` → `orders__customer_id`.
///
/// In dot-notation mode the member is returned unchanged; callers must quote it
/// wherever it is used as an identifier.
pub fn safe_key(member: &str, options: QueryOptions) -> String {
    if options.use_dot_notation {
        member.to_string()
    } else {
        member.replace(COLUMN_NAME_DELIMITER, SAFE_KEY_DELIMITER)
    }
}

/// Convert a member to its underscore safe key regardless of notation.
pub fn member_key_to_safe_key(member: &str) -> String {
    safe_key(member, QueryOptions::default())
}

/// Join a table and field into a member: `orders` + `id` → `orders.id`.
pub fn namespaced_key(table: &str, field: &str) -> String {
    format!("{}{}{}", table, COLUMN_NAME_DELIMITER, field)
}

/// Split a member at its first `.` into (table, field).
///
/// A member without a `.` yields an empty table.
pub fn split_member(member: &str) -> (&str, &str) {
    match member.split_once(COLUMN_NAME_DELIMITER) {
        Some((table, field)) => (table, field),
        None => ("", member),
    }
}

/// Table part of a member.
pub fn member_table(member: &str) -> &str {
    split_member(member).0
}

/// Quote an identifier with double quotes (ANSI style).
pub fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a string literal with single quotes.
pub fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Strip surrounding double quotes from an identifier, unescaping `""`.
pub fn unquote_identifier(ident: &str) -> String {
    let trimmed = ident.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].replace("\"\"", "\"")
    } else {
        trimmed.to_string()
    }
}

/// Output alias for a member, as it appears in a SELECT list.
///
/// Custom aliases may contain spaces and are always quoted. Safe keys are only
/// quoted in dot-notation mode, where they contain dots.
pub fn alias_for_sql(member: &str, alias: Option<&str>, options: QueryOptions) -> String {
    match alias {
        Some(alias) => quote_identifier(alias),
        None if options.use_dot_notation => quote_identifier(member),
        None => safe_key(member, options),
    }
}

/// Output alias for a member without quoting.
pub fn alias_for_name(member: &str, alias: Option<&str>, options: QueryOptions) -> String {
    match alias {
        Some(alias) => alias.to_string(),
        None => safe_key(member, options),
    }
}

/// Alias for a column that resolves to several lookup fields, e.g. `Owners - Display Name`.
pub fn compound_alias(base_alias: &str, resolution_alias: &str) -> String {
    format!("{} - {}", base_alias, resolution_alias)
}

/// Reference to a projected column of a wrapped query: `table."alias"`.
pub fn column_reference(table: &str, dimension: &Dimension) -> String {
    let column = dimension.alias.as_deref().unwrap_or(&dimension.name);
    format!("{}.{}", table, quote_identifier(column))
}

/// Find a member (`table.field`) across schemas.
pub fn find_in_schemas<'a>(member: &str, schemas: &'a [TableSchema]) -> Option<Field<'a>> {
    let (table, field) = split_member(member);
    schemas
        .iter()
        .filter(|schema| schema.name == table)
        .find_map(|schema| schema.field(field))
}
