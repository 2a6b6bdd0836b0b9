//! Computed relationship accessors bound to an owning instance.
//!
//! # Responsibility
//! - Resolve relationship members to ids, full instances or stub documents
//!   through the repository, using the derived query plan.
//! - Guard mutation: many-to-many edges only, and only toward instances that
//!   exist.
//!
//! # Invariants
//! - Navigation lists are never persisted; entities hold them `#[serde(skip)]`
//!   and rebind them after every load.
//! - An unbound list fails every operation with a distinct error instead of
//!   querying with a missing owner identity.

use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

use crate::model::entity::Entity;
use crate::relation::layout::{junction_edge, many_to_many_plan, one_to_many_plan, QueryPlan};
use crate::repo::{require, RepoError, RepoResult, Repository};

/// The two relationship shapes a navigation list can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipKind {
    /// Children carry a foreign-key field pointing at the owner.
    OneToMany,
    /// Edges live in a canonically-named junction table.
    ManyToMany,
}

enum ListState {
    /// Default state of a freshly constructed or deserialized entity.
    Unbound,
    /// Constructed with unusable parameters; reported on first use.
    Misconfigured(&'static str),
    Bound(BoundList),
}

struct BoundList {
    owner_id: String,
    owner_type: &'static str,
    kind: RelationshipKind,
    plan: QueryPlan,
}

/// Query-backed accessor for one relationship of one owning instance.
///
/// Not a container: membership is computed against the store on every call.
pub struct NavigationList<T> {
    state: ListState,
    marker: PhantomData<fn() -> T>,
}

impl<T: Entity> NavigationList<T> {
    /// The state an entity's navigation fields hold before `bind_relations`.
    pub fn unbound() -> Self {
        Self {
            state: ListState::Unbound,
            marker: PhantomData,
        }
    }

    /// Binds a one-to-many relationship: instances of `T` whose
    /// `foreign_key_field` holds the owner's id.
    pub fn one_to_many(
        owner_id: impl Into<String>,
        owner_type: &'static str,
        foreign_key_field: &str,
    ) -> Self {
        if foreign_key_field.is_empty() {
            return Self {
                state: ListState::Misconfigured(
                    "one-to-many navigation requires the child's foreign-key field name",
                ),
                marker: PhantomData,
            };
        }
        let owner_id = owner_id.into();
        let plan = one_to_many_plan(&owner_id, T::type_name(), foreign_key_field);
        Self {
            state: ListState::Bound(BoundList {
                owner_id,
                owner_type,
                kind: RelationshipKind::OneToMany,
                plan,
            }),
            marker: PhantomData,
        }
    }

    /// Binds a many-to-many relationship between the owner type and `T`.
    pub fn many_to_many(owner_id: impl Into<String>, owner_type: &'static str) -> Self {
        if owner_type == T::type_name() {
            return Self {
                state: ListState::Misconfigured(
                    "many-to-many navigation requires two distinct type names",
                ),
                marker: PhantomData,
            };
        }
        let owner_id = owner_id.into();
        let plan = many_to_many_plan(&owner_id, owner_type, T::type_name());
        Self {
            state: ListState::Bound(BoundList {
                owner_id,
                owner_type,
                kind: RelationshipKind::ManyToMany,
                plan,
            }),
            marker: PhantomData,
        }
    }

    /// The relationship kind, once bound.
    pub fn kind(&self) -> RepoResult<RelationshipKind> {
        Ok(self.bound()?.kind)
    }

    /// Resolves the current member identifiers.
    pub fn ids(&self, repo: &Repository<'_>) -> RepoResult<Vec<String>> {
        let bound = self.bound()?;
        match &bound.plan {
            QueryPlan::Index(query) => repo.get_by_index(query),
            QueryPlan::Partition(query) => repo.get_by_partition_key(query),
        }
    }

    /// Resolves every member to a full, relationship-bound instance.
    ///
    /// Strict: a dangling edge or stale foreign key is a `NotFound` error
    /// naming the missing instance.
    pub fn resolve(&self, repo: &Repository<'_>) -> RepoResult<Vec<T>> {
        let ids = self.ids(repo)?;
        let mut result = Vec::with_capacity(ids.len());
        for id in &ids {
            let mut instance =
                repo.get_object_state::<T>(id)?
                    .ok_or_else(|| RepoError::NotFound {
                        type_name: T::type_name().to_string(),
                        id: id.clone(),
                    })?;
            instance.bind_relations();
            result.push(instance);
        }
        Ok(result)
    }

    /// Resolves members to their stored stub documents in one batch read.
    ///
    /// Best-effort: members deleted between the id query and the batch read
    /// are omitted rather than reported.
    pub fn stubs(&self, repo: &Repository<'_>) -> RepoResult<Vec<T>> {
        let ids = self.ids(repo)?;
        repo.get_batch::<T>(&ids)
    }

    /// Adds a many-to-many edge toward an existing instance of `T`.
    ///
    /// One-to-many lists reject this outright: the child side declares that
    /// relationship by setting its foreign-key field. The existence check and
    /// the edge write are two separate store operations; a concurrent delete
    /// of the target between them can leave a dangling edge.
    pub fn add(&self, repo: &Repository<'_>, new_id: &str) -> RepoResult<()> {
        let bound = self.bound()?;
        if bound.kind == RelationshipKind::OneToMany {
            return Err(RepoError::Referential(
                "elements cannot be added through a one-to-many navigation list; \
                 set the foreign-key field on the child instead"
                    .to_string(),
            ));
        }
        require(new_id, "id of instance to add")?;

        let target_type = T::type_name();
        if !repo.exists(target_type, new_id)? {
            return Err(RepoError::Referential(format!(
                "only existing instances can join a many-to-many relationship; \
                 {target_type} `{new_id}` not found"
            )));
        }

        let edge = junction_edge(bound.owner_type, &bound.owner_id, target_type, new_id);
        repo.insert_edge(&edge)
    }

    fn bound(&self) -> RepoResult<&BoundList> {
        match &self.state {
            ListState::Unbound => Err(RepoError::Uninitialized),
            ListState::Misconfigured(message) => Err(RepoError::RelationConfig(message)),
            ListState::Bound(bound) => Ok(bound),
        }
    }
}

impl<T> Default for NavigationList<T> {
    fn default() -> Self {
        Self {
            state: ListState::Unbound,
            marker: PhantomData,
        }
    }
}

impl<T: Entity> Debug for NavigationList<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            ListState::Unbound => write!(f, "NavigationList<{}>(unbound)", T::type_name()),
            ListState::Misconfigured(message) => {
                write!(f, "NavigationList<{}>(misconfigured: {message})", T::type_name())
            }
            ListState::Bound(bound) => write!(
                f,
                "NavigationList<{}>(owner={} {:?})",
                T::type_name(),
                bound.owner_id,
                bound.kind
            ),
        }
    }
}
