//! Core runtime for Tether: object semantics over a shared document store.
//! This crate is the single source of truth for persistence invariants.

pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod relation;
pub mod repo;
pub mod store;

pub use lifecycle::CallContext;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::entity::{generate_id, Entity};
pub use model::reference::{Reference, ReferenceList};
pub use relation::layout::{canonical_pair, EdgeRecord, QueryPlan};
pub use relation::navigation::{NavigationList, RelationshipKind};
pub use repo::object_repo::Repository;
pub use repo::{IndexQuery, PartitionQuery, RepoError, RepoResult};
pub use store::{open_store, open_store_in_memory, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
