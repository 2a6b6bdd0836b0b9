//! Explicit provisioning of entity tables, lookup indexes and junction tables.
//!
//! # Responsibility
//! - Create the storage structures the repository expects, once, up front.
//! - Keep DDL out of the runtime read/write paths.
//!
//! # Invariants
//! - Provisioning is idempotent (`IF NOT EXISTS` everywhere).
//! - Junction table and reverse index names are derived from the canonical
//!   type-name ordering, so both relationship participants agree on them.
//! - Lookup-index expressions match the repository's query expressions
//!   verbatim, otherwise the SQLite planner cannot use them.

use super::{StoreError, StoreResult};
use crate::relation::layout::canonical_pair;
use log::info;
use rusqlite::Connection;

/// Returns whether `name` is safe to interpolate into SQL as a quoted
/// identifier: ASCII letter or underscore first, then letters, digits or
/// underscores.
pub fn valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quotes a previously validated identifier for use in SQL text.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{name}\"")
}

fn ensure_identifier(name: &str, what: &str) -> StoreResult<()> {
    if !valid_identifier(name) {
        return Err(StoreError::InvalidIdentifier(format!(
            "invalid {what} `{name}`; expected ASCII letters, digits or underscores"
        )));
    }
    Ok(())
}

fn checked_identifier(name: &str, what: &str) -> StoreResult<String> {
    ensure_identifier(name, what)?;
    Ok(quote_identifier(name))
}

/// Creates the table backing one entity type: `id` primary key plus the
/// serialized JSON document.
pub fn provision_entity_table(conn: &Connection, type_name: &str) -> StoreResult<()> {
    let table = checked_identifier(type_name, "type name")?;
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (id TEXT PRIMARY KEY, body TEXT NOT NULL);"
    ))?;
    info!("event=provision module=store status=ok kind=entity_table name={type_name}");
    Ok(())
}

/// Creates the secondary index resolving a one-to-many relationship: children
/// of `child_type` carrying `foreign_key_field` pointing at their owner.
///
/// Index name is `<ChildType><ForeignKeyField>` by convention.
pub fn provision_lookup_index(
    conn: &Connection,
    child_type: &str,
    foreign_key_field: &str,
) -> StoreResult<()> {
    let table = checked_identifier(child_type, "type name")?;
    ensure_identifier(foreign_key_field, "field name")?;
    let index_name = format!("{child_type}{foreign_key_field}");
    let index = checked_identifier(&index_name, "index name")?;
    conn.execute_batch(&format!(
        "CREATE INDEX IF NOT EXISTS {index} ON {table} (json_extract(body, '$.{foreign_key_field}'));"
    ))?;
    info!("event=provision module=store status=ok kind=lookup_index name={index_name}");
    Ok(())
}

/// Creates the junction table holding many-to-many edges between two types,
/// plus the reverse-lookup index for the participant whose type name sorts
/// second.
///
/// Table name is the canonical concatenation of the two type names; the
/// reverse index is named `<JunctionTable>Reversed` and keyed by the second
/// type's column.
pub fn provision_junction_table(
    conn: &Connection,
    type_a: &str,
    type_b: &str,
) -> StoreResult<()> {
    if type_a == type_b {
        return Err(StoreError::InvalidIdentifier(format!(
            "many-to-many junction requires two distinct type names, got `{type_a}` twice"
        )));
    }

    let (first, second) = canonical_pair(type_a, type_b);
    let table_name = format!("{first}{second}");
    let table = checked_identifier(&table_name, "junction table name")?;
    let first_col = checked_identifier(first, "type name")?;
    let second_col = checked_identifier(second, "type name")?;
    let reverse_name = format!("{table_name}Reversed");
    let reverse = checked_identifier(&reverse_name, "index name")?;

    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            {first_col} TEXT NOT NULL,
            {second_col} TEXT NOT NULL,
            PRIMARY KEY ({first_col}, {second_col})
        );
        CREATE INDEX IF NOT EXISTS {reverse} ON {table} ({second_col});"
    ))?;
    info!("event=provision module=store status=ok kind=junction_table name={table_name}");
    Ok(())
}
