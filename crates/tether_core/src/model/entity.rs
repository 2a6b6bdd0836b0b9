//! Persistable entity contract.
//!
//! # Responsibility
//! - Name the storage table of a type and expose its stable identifier.
//! - Hook relationship wiring into load/initialization paths.
//!
//! # Invariants
//! - `id` is unique within the table named by `type_name`.
//! - The serialized document carries the identifier under the `"Id"` key and
//!   never contains navigation-list fields (the stored *stub* view).

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

/// Contract for any type persisted by the runtime.
///
/// Implementations serialize to a JSON object whose `"Id"` member mirrors
/// `id()` (use `#[serde(rename = "Id")]` on the identifier field) and mark
/// navigation-list fields `#[serde(skip)]`.
pub trait Entity: Serialize + DeserializeOwned {
    /// Stable type name; maps to the storage table.
    fn type_name() -> &'static str;

    /// The instance identifier. Empty until assigned for generated-id types.
    fn id(&self) -> &str;

    /// Stores the identifier chosen at insert time.
    fn assign_id(&mut self, id: String);

    /// Whether the identifier comes from a caller-declared field instead of
    /// being generated at insert. Custom-id inserts with an empty id fail
    /// validation.
    fn custom_id() -> bool {
        false
    }

    /// Rewires navigation-list fields to this instance's identifier.
    ///
    /// Called after every load/overlay and by `CallContext::bind`; a plain
    /// deserialized instance has unbound navigation lists until then.
    fn bind_relations(&mut self) {}
}

/// Generates a fresh opaque identifier for entities without a custom id.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
