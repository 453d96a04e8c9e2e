//! Persistence traits consumed by the crud controller
//!
//! A [`PersistenceProvider`] hands out one [`Repository`] per entity for
//! reads and a fresh [`EntityManager`] per request for writes. The framework
//! is agnostic to the underlying storage mechanism.

use crate::core::entity::{EntityMetadata, Record};
use crate::core::query::{Criteria, SortSpec};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Read access to the records of one entity
#[async_trait]
pub trait Repository: Send + Sync {
    /// Records matching every criterion, ordered and windowed
    async fn find_by(
        &self,
        criteria: &Criteria,
        order_by: Option<&SortSpec>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Record>>;

    /// Number of records matching every criterion
    async fn count_by(&self, criteria: &Criteria) -> Result<usize>;

    /// Record by identifier
    async fn find(&self, id: &str) -> Result<Option<Record>>;
}

/// Request-scoped unit of work
///
/// `persist` and `remove` only queue operations; nothing is written until
/// `flush` succeeds.
#[async_trait]
pub trait EntityManager: Send {
    /// Queue an insert or update of `record`
    ///
    /// A record without identifier receives a freshly generated one.
    async fn persist(&mut self, metadata: &EntityMetadata, record: &mut Record) -> Result<()>;

    /// Queue the removal of `record`
    async fn remove(&mut self, metadata: &EntityMetadata, record: &Record) -> Result<()>;

    /// Apply every queued operation atomically
    async fn flush(&mut self) -> Result<()>;
}

/// Entry point to a storage backend
pub trait PersistenceProvider: Send + Sync {
    /// Repository for the entity described by `metadata`
    fn repository_for(&self, metadata: &EntityMetadata) -> Arc<dyn Repository>;

    /// A new unit of work
    fn entity_manager(&self) -> Box<dyn EntityManager>;
}
