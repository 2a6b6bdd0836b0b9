//! Pure derivation of relationship storage layout.
//!
//! # Responsibility
//! - Canonical ordering of type-name pairs and the query plans built from it.
//!
//! # Invariants
//! - `canonical_pair` is total, order-independent and free of side effects,
//!   so its symmetry is directly unit-testable.
//! - Plans never touch the store; they only name tables, indexes and
//!   attributes.

use crate::repo::{IndexQuery, PartitionQuery};

/// Orders two type names canonically.
///
/// Byte-wise code-unit comparison; at the first differing position the
/// smaller name sorts first, and a strict prefix sorts before the longer
/// name. Both relationship participants compute the identical result
/// regardless of argument order.
pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a.as_bytes() <= b.as_bytes() {
        (a, b)
    } else {
        (b, a)
    }
}

/// Executable query plan of a bound navigation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    /// Secondary-index read: one-to-many, or the reversed many-to-many side.
    Index(IndexQuery),
    /// Direct partition-key read: the many-to-many side whose name sorts first.
    Partition(PartitionQuery),
}

/// One many-to-many edge in junction-table attribute order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRecord {
    pub table_name: String,
    pub first_attribute: String,
    pub first_value: String,
    pub second_attribute: String,
    pub second_value: String,
}

/// Plan for a one-to-many relationship, resolved against the child table.
///
/// Children declare the relationship through `foreign_key_field`; the index
/// is named `<ChildType><ForeignKeyField>` and projects child ids.
pub fn one_to_many_plan(owner_id: &str, child_type: &str, foreign_key_field: &str) -> QueryPlan {
    QueryPlan::Index(IndexQuery {
        table_name: child_type.to_string(),
        index_name: format!("{child_type}{foreign_key_field}"),
        key_attribute: foreign_key_field.to_string(),
        key_value: owner_id.to_string(),
        output_attribute: "Id".to_string(),
        key_in_document: true,
    })
}

/// Plan for one side of a many-to-many relationship.
///
/// The participant whose type name sorts first queries the junction table
/// directly by its own column; the other participant goes through the
/// `<JunctionTable>Reversed` index keyed by its own column, projecting the
/// first type's column.
pub fn many_to_many_plan(owner_id: &str, owner_type: &str, other_type: &str) -> QueryPlan {
    let (first, second) = canonical_pair(owner_type, other_type);
    let table_name = format!("{first}{second}");

    if owner_type == first {
        QueryPlan::Partition(PartitionQuery {
            table_name,
            partition_attribute: owner_type.to_string(),
            partition_value: owner_id.to_string(),
            output_attribute: other_type.to_string(),
        })
    } else {
        QueryPlan::Index(IndexQuery {
            index_name: format!("{table_name}Reversed"),
            table_name,
            key_attribute: owner_type.to_string(),
            key_value: owner_id.to_string(),
            output_attribute: other_type.to_string(),
            key_in_document: false,
        })
    }
}

/// Lays out one edge between an owner instance and a target instance in
/// canonical attribute order, so both sides write identical records.
pub fn junction_edge(
    owner_type: &str,
    owner_id: &str,
    other_type: &str,
    other_id: &str,
) -> EdgeRecord {
    let (first, second) = canonical_pair(owner_type, other_type);
    let (first_value, second_value) = if owner_type == first {
        (owner_id, other_id)
    } else {
        (other_id, owner_id)
    };
    EdgeRecord {
        table_name: format!("{first}{second}"),
        first_attribute: first.to_string(),
        first_value: first_value.to_string(),
        second_attribute: second.to_string(),
        second_value: second_value.to_string(),
    }
}
