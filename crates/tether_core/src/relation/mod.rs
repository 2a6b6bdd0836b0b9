//! Relationship layout and computed navigation accessors.
//!
//! # Responsibility
//! - Derive the deterministic storage layout of one-to-many and many-to-many
//!   relationships from the participating type names.
//! - Execute relationship queries through the repository primitives.
//!
//! # Invariants
//! - For any unordered pair of distinct type names there is exactly one
//!   junction-table identity, and exactly one participant uses the direct
//!   partition-key path while the other uses the reversed index.

pub mod layout;
pub mod navigation;
