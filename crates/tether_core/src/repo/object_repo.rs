//! Primitive, atomic-per-item operations against the backing store.
//!
//! # Responsibility
//! - Full-document writes (insert/upsert/delete), reads (single and batch),
//!   single-attribute projection/update, index and partition-key queries,
//!   existence checks and junction-edge writes.
//!
//! # Invariants
//! - Every write is a full-item replace except `set_field`, which touches a
//!   single named attribute. Last writer wins; no conditional writes.
//! - Nothing retries internally; backend failures propagate wrapped.
//! - Stored documents always carry the identifier under `"Id"`.

use log::debug;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::HashMap;

use super::{require, IndexQuery, PartitionQuery, RepoError, RepoResult};
use crate::model::entity::{generate_id, Entity};
use crate::relation::layout::EdgeRecord;
use crate::store::schema::{quote_identifier, valid_identifier};
use crate::store::StoreError;

/// Repository over an open store connection.
///
/// Borrows the connection, so several repositories (or provisioning calls)
/// can share one bootstrapped store.
pub struct Repository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> Repository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Persists a new instance and returns its effective identifier.
    ///
    /// Types with a declared custom identifier must arrive with it populated;
    /// otherwise a fresh opaque id is generated and assigned. The write has
    /// put semantics: an existing item under the same id is replaced.
    pub fn insert<T: Entity>(&self, obj: &mut T) -> RepoResult<String> {
        if T::custom_id() {
            if obj.id().is_empty() {
                return Err(RepoError::Validation(
                    "id field is empty; a declared custom identifier must be set before insert"
                        .to_string(),
                ));
            }
        } else {
            obj.assign_id(generate_id());
        }

        let id = obj.id().to_string();
        self.put_document("insert", T::type_name(), &id, obj)?;
        Ok(id)
    }

    /// Writes the full serialized object under `id`, overwriting any prior
    /// value unconditionally.
    pub fn upsert<T: Entity>(&self, obj: &T, id: &str) -> RepoResult<()> {
        require(id, "id of object to upsert")?;
        self.put_document("upsert", T::type_name(), id, obj)
    }

    /// Removes one item. Removing a non-existent item is not an error.
    pub fn delete(&self, type_name: &str, id: &str) -> RepoResult<()> {
        require(id, "id of object to delete")?;
        let table = self.table_sql(type_name)?;
        self.conn
            .execute(&format!("DELETE FROM {table} WHERE id = ?1;"), params![id])
            .map_err(|err| Self::backend("delete", type_name, id, err))?;
        debug!("event=repo_write module=repo status=ok operation=delete type={type_name} id={id}");
        Ok(())
    }

    /// Reads the persisted stub of one instance.
    ///
    /// `Ok(None)` is the explicit absent outcome at this layer; callers for
    /// which absence is a failure convert it to `NotFound`. The returned
    /// instance is the raw stored view: navigation lists are unbound until
    /// `bind_relations` runs.
    pub fn get_object_state<T: Entity>(&self, id: &str) -> RepoResult<Option<T>> {
        require(id, "id of object to get")?;
        let type_name = T::type_name();
        let table = self.table_sql(type_name)?;
        let body: Option<String> = self
            .conn
            .query_row(
                &format!("SELECT body FROM {table} WHERE id = ?1;"),
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| Self::backend("get_object_state", type_name, id, err))?;

        match body {
            Some(text) => serde_json::from_str(&text).map(Some).map_err(|err| {
                RepoError::InvalidData(format!(
                    "stored {type_name} document `{id}` failed to parse: {err}"
                ))
            }),
            None => Ok(None),
        }
    }

    /// Resolves many ids in one query.
    ///
    /// Result order follows input id order (the backing store does not
    /// guarantee row order, so rows are reordered in memory); ids without a
    /// backing item are omitted.
    pub fn get_batch<T: Entity>(&self, ids: &[String]) -> RepoResult<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        for id in ids {
            require(id, "id in batch get")?;
        }

        let type_name = T::type_name();
        let table = self.table_sql(type_name)?;
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT id, body FROM {table} WHERE id IN ({placeholders});");

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|err| Self::backend("get_batch", type_name, "", err))?;
        let mut rows = stmt
            .query(params_from_iter(ids.iter()))
            .map_err(|err| Self::backend("get_batch", type_name, "", err))?;

        let mut found: HashMap<String, String> = HashMap::with_capacity(ids.len());
        loop {
            let row = match rows.next() {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(err) => return Err(Self::backend("get_batch", type_name, "", err)),
            };
            let id: String = row
                .get(0)
                .map_err(|err| Self::backend("get_batch", type_name, "", err))?;
            let body: String = row
                .get(1)
                .map_err(|err| Self::backend("get_batch", type_name, "", err))?;
            found.insert(id, body);
        }

        let mut result = Vec::with_capacity(found.len());
        for id in ids {
            if let Some(text) = found.remove(id) {
                let parsed: T = serde_json::from_str(&text).map_err(|err| {
                    RepoError::InvalidData(format!(
                        "stored {type_name} document `{id}` failed to parse: {err}"
                    ))
                })?;
                result.push(parsed);
            }
        }
        Ok(result)
    }

    /// Queries a secondary index, projecting only identifiers.
    ///
    /// Output order is ascending by the projected attribute, which makes the
    /// otherwise-unspecified index order deterministic for callers and tests.
    pub fn get_by_index(&self, query: &IndexQuery) -> RepoResult<Vec<String>> {
        query.validate()?;
        let table = self.table_sql(&query.table_name)?;

        if query.key_in_document {
            self.ensure_column(&query.key_attribute, "field name")?;
            // Expression text must match the provisioned lookup index.
            let sql = format!(
                "SELECT id FROM {table} WHERE json_extract(body, '$.{field}') = ?1 ORDER BY id;",
                field = query.key_attribute
            );
            self.collect_strings("get_by_index", &query.table_name, &sql, &query.key_value)
        } else {
            let key = self.column_sql(&query.key_attribute)?;
            let out = self.column_sql(&query.output_attribute)?;
            let sql =
                format!("SELECT {out} FROM {table} WHERE {key} = ?1 ORDER BY {out};");
            self.collect_strings("get_by_index", &query.table_name, &sql, &query.key_value)
        }
    }

    /// Queries all items sharing a partition key, projecting the sort-key
    /// attribute. Used for the direct many-to-many path.
    pub fn get_by_partition_key(&self, query: &PartitionQuery) -> RepoResult<Vec<String>> {
        query.validate()?;
        let table = self.table_sql(&query.table_name)?;
        let partition = self.column_sql(&query.partition_attribute)?;
        let out = self.column_sql(&query.output_attribute)?;
        let sql =
            format!("SELECT {out} FROM {table} WHERE {partition} = ?1 ORDER BY {out};");
        self.collect_strings(
            "get_by_partition_key",
            &query.table_name,
            &sql,
            &query.partition_value,
        )
    }

    /// Projects a single named attribute of one item without materializing
    /// the whole document.
    ///
    /// `Ok(None)` means the item is absent; an existing item without the
    /// attribute yields `Some(Value::Null)`.
    pub fn get_field(&self, id: &str, type_name: &str, field_name: &str) -> RepoResult<Option<Value>> {
        require(id, "id of object field to get")?;
        require(type_name, "type name of object field to get")?;
        require(field_name, "field name of object field to get")?;
        let table = self.table_sql(type_name)?;
        self.ensure_column(field_name, "field name")?;

        // `->` yields the attribute as JSON text, or SQL NULL when absent.
        let sql = format!("SELECT body -> '$.{field_name}' FROM {table} WHERE id = ?1;");
        let cell: Option<Option<String>> = self
            .conn
            .query_row(&sql, params![id], |row| row.get(0))
            .optional()
            .map_err(|err| Self::backend("get_field", type_name, id, err))?;

        match cell {
            None => Ok(None),
            Some(None) => Ok(Some(Value::Null)),
            Some(Some(text)) => serde_json::from_str(&text).map(Some).map_err(|err| {
                RepoError::InvalidData(format!(
                    "stored attribute {type_name}.{field_name} of `{id}` failed to parse: {err}"
                ))
            }),
        }
    }

    /// Updates a single named attribute of one item in place.
    ///
    /// The item must exist; attribute-level writes never create documents.
    pub fn set_field(
        &self,
        id: &str,
        type_name: &str,
        field_name: &str,
        value: &Value,
    ) -> RepoResult<()> {
        require(id, "id of object field to set")?;
        require(type_name, "type name of object field to set")?;
        require(field_name, "field name of object field to set")?;
        let table = self.table_sql(type_name)?;
        self.ensure_column(field_name, "field name")?;

        let sql = format!(
            "UPDATE {table} SET body = json_set(body, '$.{field_name}', json(?1)) WHERE id = ?2;"
        );
        let changed = self
            .conn
            .execute(&sql, params![value.to_string(), id])
            .map_err(|err| Self::backend("set_field", type_name, id, err))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                type_name: type_name.to_string(),
                id: id.to_string(),
            });
        }
        debug!(
            "event=repo_write module=repo status=ok operation=set_field type={type_name} id={id} field={field_name}"
        );
        Ok(())
    }

    /// Returns whether an item exists, without reading its document.
    pub fn exists(&self, type_name: &str, id: &str) -> RepoResult<bool> {
        require(id, "id of object to check")?;
        let table = self.table_sql(type_name)?;
        let hit: Option<i64> = self
            .conn
            .query_row(
                &format!("SELECT 1 FROM {table} WHERE id = ?1;"),
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| Self::backend("exists", type_name, id, err))?;
        Ok(hit.is_some())
    }

    /// Writes one many-to-many edge record into its junction table.
    ///
    /// Idempotent: re-adding an existing edge is a no-op.
    pub fn insert_edge(&self, edge: &EdgeRecord) -> RepoResult<()> {
        let table = self.table_sql(&edge.table_name)?;
        let first = self.column_sql(&edge.first_attribute)?;
        let second = self.column_sql(&edge.second_attribute)?;
        let sql = format!(
            "INSERT INTO {table} ({first}, {second}) VALUES (?1, ?2) \
             ON CONFLICT ({first}, {second}) DO NOTHING;"
        );
        self.conn
            .execute(&sql, params![edge.first_value, edge.second_value])
            .map_err(|err| Self::backend("insert_edge", &edge.table_name, &edge.first_value, err))?;
        debug!(
            "event=repo_write module=repo status=ok operation=insert_edge table={} first={} second={}",
            edge.table_name, edge.first_value, edge.second_value
        );
        Ok(())
    }

    fn put_document<T: Entity>(
        &self,
        operation: &'static str,
        type_name: &str,
        id: &str,
        obj: &T,
    ) -> RepoResult<()> {
        let table = self.table_sql(type_name)?;
        let mut doc = serde_json::to_value(obj).map_err(|err| {
            RepoError::InvalidData(format!("could not serialize {type_name} document: {err}"))
        })?;
        match doc.as_object_mut() {
            Some(map) => {
                // The stored document's "Id" always mirrors the effective id,
                // whatever the in-memory field held.
                map.insert("Id".to_string(), Value::String(id.to_string()));
            }
            None => {
                return Err(RepoError::InvalidData(format!(
                    "{type_name} must serialize to a JSON object"
                )))
            }
        }

        let sql = format!(
            "INSERT INTO {table} (id, body) VALUES (?1, ?2) \
             ON CONFLICT (id) DO UPDATE SET body = excluded.body;"
        );
        self.conn
            .execute(&sql, params![id, doc.to_string()])
            .map_err(|err| Self::backend(operation, type_name, id, err))?;
        debug!(
            "event=repo_write module=repo status=ok operation={operation} type={type_name} id={id}"
        );
        Ok(())
    }

    fn collect_strings(
        &self,
        operation: &'static str,
        type_name: &str,
        sql: &str,
        key: &str,
    ) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|err| Self::backend(operation, type_name, "", err))?;
        let mut rows = stmt
            .query(params![key])
            .map_err(|err| Self::backend(operation, type_name, "", err))?;

        let mut out = Vec::new();
        loop {
            let row = match rows.next() {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(err) => return Err(Self::backend(operation, type_name, "", err)),
            };
            let value: String = row
                .get(0)
                .map_err(|err| Self::backend(operation, type_name, "", err))?;
            out.push(value);
        }
        Ok(out)
    }

    fn table_sql(&self, type_name: &str) -> RepoResult<String> {
        require(type_name, "type name")?;
        if !valid_identifier(type_name) {
            return Err(RepoError::Validation(format!(
                "invalid type name `{type_name}`; expected ASCII letters, digits or underscores"
            )));
        }
        Ok(quote_identifier(type_name))
    }

    fn column_sql(&self, attribute: &str) -> RepoResult<String> {
        self.ensure_column(attribute, "attribute name")?;
        Ok(quote_identifier(attribute))
    }

    fn ensure_column(&self, attribute: &str, what: &str) -> RepoResult<()> {
        if !valid_identifier(attribute) {
            return Err(RepoError::Validation(format!(
                "invalid {what} `{attribute}`; expected ASCII letters, digits or underscores"
            )));
        }
        Ok(())
    }

    fn backend(
        operation: &'static str,
        type_name: &str,
        id: &str,
        err: rusqlite::Error,
    ) -> RepoError {
        RepoError::Backend {
            operation,
            type_name: type_name.to_string(),
            id: id.to_string(),
            source: StoreError::Sqlite(err),
        }
    }
}
