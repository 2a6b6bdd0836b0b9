//! Domain-object contracts shared by the persistence runtime.
//!
//! # Responsibility
//! - Define the persistable-entity contract every domain type implements.
//! - Define identifier-only handles used to relate objects across tables.
//!
//! # Invariants
//! - Relationships are expressed as identifiers, never as owned object-graph
//!   edges; traversal is always a fresh store query.

pub mod entity;
pub mod reference;
