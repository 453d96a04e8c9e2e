//! Persistence implementations for different backends

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryPersistence;
#[cfg(feature = "postgres")]
pub use postgres::{PostgresPersistence, ensure_schema};

use crate::core::entity::{EntityMetadata, Record};
use serde_json::Value;
use uuid::Uuid;

/// Read the identifier of `record`, generating a v4 uuid when absent or empty
pub(crate) fn ensure_identifier(metadata: &EntityMetadata, record: &mut Record) -> String {
    match metadata.identifier_of(record).filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => {
            let id = Uuid::new_v4().to_string();
            record.insert(metadata.identifier.clone(), Value::String(id.clone()));
            id
        }
    }
}
