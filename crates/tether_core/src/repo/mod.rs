//! Repository layer: primitive store operations and their error taxonomy.
//!
//! # Responsibility
//! - Define the runtime's error categories and the query parameter shapes
//!   consumed by indexed and partition-key reads.
//! - Isolate physical storage details from relationship/lifecycle logic.
//!
//! # Invariants
//! - Missing required parameters are rejected before any store call.
//! - Absence is never conflated with an empty success: primitive reads
//!   return `Option`, and every caller for which absence is a failure maps
//!   it to `NotFound`.
//! - Backend failures are wrapped with operation name, type name and id.

use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::store::StoreError;

pub mod object_repo;

pub use object_repo::Repository;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error taxonomy of the object runtime.
#[derive(Debug)]
pub enum RepoError {
    /// Missing or malformed required parameter, rejected before any store call.
    Validation(String),
    /// A queried id is absent from its table where presence was required.
    NotFound { type_name: String, id: String },
    /// Failure from the backing store, wrapped for diagnosability.
    Backend {
        operation: &'static str,
        type_name: String,
        id: String,
        source: StoreError,
    },
    /// A stored document exists but does not parse as its declared type.
    InvalidData(String),
    /// A relationship descriptor was constructed with unusable parameters.
    RelationConfig(&'static str),
    /// A relationship operation was rejected: wrong relationship kind, or a
    /// target instance that does not exist.
    Referential(String),
    /// A navigation list was used before the owning instance was bound.
    Uninitialized,
    /// Index outside a reference list's bounds.
    OutOfBounds { index: usize, len: usize },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "{message}"),
            Self::NotFound { type_name, id } => {
                write!(f, "{type_name} instance `{id}` not found")
            }
            Self::Backend {
                operation,
                type_name,
                id,
                source,
            } => {
                if id.is_empty() {
                    write!(f, "store failure in {operation} on {type_name}: {source}")
                } else {
                    write!(
                        f,
                        "store failure in {operation} on {type_name} `{id}`: {source}"
                    )
                }
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::RelationConfig(message) => write!(f, "{message}"),
            Self::Referential(message) => write!(f, "{message}"),
            Self::Uninitialized => write!(
                f,
                "navigation lists can be used only after the instance is bound; \
                 load the instance through an initialized call context first"
            ),
            Self::OutOfBounds { index, len } => {
                write!(f, "index {index} is out of bounds of a list of length {len}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Backend { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Parameters of a secondary-index read projecting identifiers.
///
/// `key_in_document` distinguishes the two physical shapes: one-to-many keys
/// live inside the child's JSON document, many-to-many reverse keys are
/// junction-table columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexQuery {
    pub table_name: String,
    pub index_name: String,
    pub key_attribute: String,
    pub key_value: String,
    pub output_attribute: String,
    pub key_in_document: bool,
}

impl IndexQuery {
    pub fn validate(&self) -> RepoResult<()> {
        require(&self.table_name, "table_name in index query")?;
        require(&self.index_name, "index_name in index query")?;
        require(&self.key_attribute, "key_attribute in index query")?;
        require(&self.key_value, "key_value in index query")?;
        require(&self.output_attribute, "output_attribute in index query")
    }
}

/// Parameters of a partition-key read projecting sort-key values, used for
/// the direct many-to-many path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionQuery {
    pub table_name: String,
    pub partition_attribute: String,
    pub partition_value: String,
    pub output_attribute: String,
}

impl PartitionQuery {
    pub fn validate(&self) -> RepoResult<()> {
        require(&self.table_name, "table_name in partition query")?;
        require(&self.partition_attribute, "partition_attribute in partition query")?;
        require(&self.partition_value, "partition_value in partition query")?;
        require(&self.output_attribute, "output_attribute in partition query")
    }
}

pub(crate) fn require(value: &str, what: &str) -> RepoResult<()> {
    if value.is_empty() {
        return Err(RepoError::Validation(format!("missing {what}")));
    }
    Ok(())
}
