//! Entity trait: identity + the key it is persisted under.

use serde::{Serialize, de::DeserializeOwned};

/// A persisted record addressed by its identifier.
///
/// Records are stored as JSON under `"{KIND}:{id}"`.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display + Send + Sync;

    /// Key prefix and the name used for this entity type in error details.
    const KIND: &'static str;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Storage key for an entity of this type.
    fn key_for(id: &Self::Id) -> String {
        format!("{}:{}", Self::KIND, id)
    }
}
