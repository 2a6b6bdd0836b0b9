//! Embedded key-value document store bootstrap and provisioning.
//!
//! # Responsibility
//! - Open and configure SQLite connections backing the object runtime.
//! - Provision per-type tables, relationship indexes and junction tables.
//!
//! # Invariants
//! - One table per entity type name, primary key `id` (string), JSON `body`.
//! - Runtime reads/writes never issue DDL; provisioning is explicit.
//! - Every identifier interpolated into SQL is validated and quoted first.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
pub mod schema;

pub use open::{open_store, open_store_in_memory};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    InvalidIdentifier(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidIdentifier(message) => write!(f, "{message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::InvalidIdentifier(_) => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
