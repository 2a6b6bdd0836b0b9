//! Invocation lifecycle controller.
//!
//! # Responsibility
//! - Bracket state-touching method bodies with a load of the latest persisted
//!   stub on the outermost entry and a save on the outermost successful exit.
//! - Track invocation depth so reentrant calls on the same instance neither
//!   reload nor re-save.
//!
//! # Invariants
//! - Depth lives on an explicit context threaded by `&mut` through nested
//!   invocations, never on the (potentially copied) receiver itself.
//! - A load error aborts the method before the body runs.
//! - The body's own error wins over a save error at the outermost exit.

use log::debug;

use crate::model::entity::Entity;
use crate::repo::{RepoError, RepoResult, Repository};

/// Per-logical-call state shared by an outermost invocation and every nested
/// call it makes on the same instance.
///
/// A context is either *initialized* (bound to a persisted identity, so
/// outermost calls load and save) or *detached* (scratch instances that are
/// never implicitly persisted).
#[derive(Debug)]
pub struct CallContext {
    initialized: bool,
    depth: u32,
}

impl CallContext {
    /// Context for an instance without a backing identity. Depth is still
    /// tracked, but no load or save ever happens.
    pub fn detached() -> Self {
        Self {
            initialized: false,
            depth: 0,
        }
    }

    /// Binds an instance to its persisted identity and wires up its
    /// navigation-list fields.
    ///
    /// The instance must already carry its identifier (loaded, inserted, or
    /// constructed with a custom id).
    pub fn bind<T: Entity>(entity: &mut T) -> RepoResult<Self> {
        if entity.id().is_empty() {
            return Err(RepoError::Validation(
                "cannot bind an instance without an id".to_string(),
            ));
        }
        entity.bind_relations();
        Ok(Self {
            initialized: true,
            depth: 0,
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Current nesting depth; zero outside any invocation.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Runs one state-touching method body under lifecycle control.
    ///
    /// Outermost entry on an initialized context overlays the latest
    /// persisted stub onto the instance first, so a stale in-memory copy
    /// never silently wins over state persisted by an earlier invocation in
    /// the same logical chain. An instance whose item was deleted since
    /// binding has nothing to overlay and runs with its in-memory state; a
    /// successful exit then re-persists it.
    ///
    /// The body receives the same context and may invoke further methods on
    /// the same instance through it; only the outermost call loads and saves.
    pub fn invoke<T, R, F>(
        &mut self,
        repo: &Repository<'_>,
        entity: &mut T,
        body: F,
    ) -> RepoResult<R>
    where
        T: Entity,
        F: FnOnce(&Repository<'_>, &mut CallContext, &mut T) -> RepoResult<R>,
    {
        self.depth += 1;

        if self.depth == 1 && self.initialized {
            let id = entity.id().to_string();
            match repo.get_object_state::<T>(&id) {
                Ok(Some(current)) => {
                    *entity = current;
                    entity.bind_relations();
                    debug!(
                        "event=lifecycle_load module=lifecycle status=ok type={} id={id}",
                        T::type_name()
                    );
                }
                Ok(None) => {
                    debug!(
                        "event=lifecycle_load module=lifecycle status=absent type={} id={id}",
                        T::type_name()
                    );
                }
                Err(err) => {
                    self.depth -= 1;
                    return Err(err);
                }
            }
        }

        let mut result = body(repo, self, entity);

        if self.depth == 1 && self.initialized && result.is_ok() {
            let id = entity.id().to_string();
            if let Err(save_err) = repo.upsert(entity, &id) {
                result = Err(save_err);
            } else {
                debug!(
                    "event=lifecycle_save module=lifecycle status=ok type={} id={id}",
                    T::type_name()
                );
            }
        }

        self.depth -= 1;
        result
    }
}
