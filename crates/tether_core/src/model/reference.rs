//! Identifier-only handles to persisted instances.
//!
//! # Responsibility
//! - `Reference<T>`: a single-id handle resolved on demand.
//! - `ReferenceList<T>`: an ordered, caller-managed id sequence.
//!
//! # Invariants
//! - Neither type caches resolved values or owns the referent; deleting the
//!   referent never cascades, and resolution of a dangling id fails with an
//!   explicit error instead of a zero-valued success.
//! - `ReferenceList` order is caller-assigned and preserved verbatim through
//!   storage and retrieval.

use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::model::entity::Entity;
use crate::repo::{RepoError, RepoResult, Repository};

/// Identifier-only handle to one instance of `T`.
///
/// Serializes transparently as the id string. The phantom parameter is a
/// function pointer so references never own (or drop) their referent type,
/// which keeps cyclic relationship graphs free of lifetime coupling.
#[derive(Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct Reference<T> {
    id: String,
    #[serde(skip)]
    marker: PhantomData<fn() -> T>,
}

impl<T: Entity> Reference<T> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            marker: PhantomData,
        }
    }

    /// The referenced identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Fetches the referenced instance.
    ///
    /// Resolution is always an explicit store read; an absent referent is a
    /// `NotFound` error. The returned instance has its relationships bound.
    pub fn resolve(&self, repo: &Repository<'_>) -> RepoResult<T> {
        let mut instance = repo
            .get_object_state::<T>(&self.id)?
            .ok_or_else(|| RepoError::NotFound {
                type_name: T::type_name().to_string(),
                id: self.id.clone(),
            })?;
        instance.bind_relations();
        Ok(instance)
    }
}

impl<T> Clone for Reference<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            marker: PhantomData,
        }
    }
}

impl<T> Default for Reference<T> {
    fn default() -> Self {
        Self {
            id: String::new(),
            marker: PhantomData,
        }
    }
}

impl<T> PartialEq for Reference<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Reference<T> {}

impl<T: Entity> Debug for Reference<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Reference<{}>({})", T::type_name(), self.id)
    }
}

/// Ordered sequence of identifiers of instances of `T`.
///
/// Serializes transparently as the id vector; order round-trips verbatim.
#[derive(Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct ReferenceList<T> {
    ids: Vec<String>,
    #[serde(skip)]
    marker: PhantomData<fn() -> T>,
}

impl<T: Entity> ReferenceList<T> {
    pub fn new(ids: Vec<String>) -> Self {
        Self {
            ids,
            marker: PhantomData,
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Appends an identifier; order stays caller-managed.
    pub fn push(&mut self, id: impl Into<String>) {
        self.ids.push(id.into());
    }

    /// Resolves every element in list order.
    ///
    /// Fails on the first unresolved element, naming its position, so callers
    /// can tell which entry of their ordered list dangles.
    pub fn resolve(&self, repo: &Repository<'_>) -> RepoResult<Vec<T>> {
        let mut result = Vec::with_capacity(self.ids.len());
        for (index, id) in self.ids.iter().enumerate() {
            let mut instance =
                repo.get_object_state::<T>(id)?
                    .ok_or_else(|| RepoError::Referential(format!(
                        "element {index} of {} reference list points at missing instance `{id}`",
                        T::type_name()
                    )))?;
            instance.bind_relations();
            result.push(instance);
        }
        Ok(result)
    }

    /// Resolves the element at `index`.
    ///
    /// Out-of-range indexes are a bounds error before any store call.
    pub fn resolve_at(&self, repo: &Repository<'_>, index: usize) -> RepoResult<T> {
        let id = self.ids.get(index).ok_or(RepoError::OutOfBounds {
            index,
            len: self.ids.len(),
        })?;
        let mut instance =
            repo.get_object_state::<T>(id)?
                .ok_or_else(|| RepoError::Referential(format!(
                    "element {index} of {} reference list points at missing instance `{id}`",
                    T::type_name()
                )))?;
        instance.bind_relations();
        Ok(instance)
    }
}

impl<T> Clone for ReferenceList<T> {
    fn clone(&self) -> Self {
        Self {
            ids: self.ids.clone(),
            marker: PhantomData,
        }
    }
}

impl<T> Default for ReferenceList<T> {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            marker: PhantomData,
        }
    }
}

impl<T> PartialEq for ReferenceList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ids == other.ids
    }
}

impl<T> Eq for ReferenceList<T> {}

impl<T: Entity> Debug for ReferenceList<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReferenceList<{}>({:?})", T::type_name(), self.ids)
    }
}
