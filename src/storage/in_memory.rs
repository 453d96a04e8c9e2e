//! In-memory persistence for testing and development

use super::ensure_identifier;
use crate::core::entity::{EntityMetadata, Record};
use crate::core::query::{Criteria, SortDirection, SortSpec};
use crate::core::service::{EntityManager, PersistenceProvider, Repository};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Records of every entity, keyed by entity name then identifier
type Tables = Arc<RwLock<HashMap<String, IndexMap<String, Record>>>>;

/// In-memory persistence provider
///
/// Useful for testing and development. Uses RwLock for thread-safe access;
/// records keep their insertion order.
#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    tables: Tables,
}

impl InMemoryPersistence {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record right away, bypassing the unit of work
    ///
    /// Returns the stored record, with its generated identifier if it had
    /// none.
    pub fn seed(&self, metadata: &EntityMetadata, mut record: Record) -> Result<Record> {
        let id = ensure_identifier(metadata, &mut record);
        let mut tables = self
            .tables
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        tables
            .entry(metadata.name.clone())
            .or_default()
            .insert(id, record.clone());
        Ok(record)
    }

    /// Number of records stored for `entity`
    pub fn len(&self, entity: &str) -> Result<usize> {
        let tables = self
            .tables
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(tables.get(entity).map_or(0, |t| t.len()))
    }
}

impl PersistenceProvider for InMemoryPersistence {
    fn repository_for(&self, metadata: &EntityMetadata) -> Arc<dyn Repository> {
        Arc::new(InMemoryRepository {
            tables: self.tables.clone(),
            entity: metadata.name.clone(),
        })
    }

    fn entity_manager(&self) -> Box<dyn EntityManager> {
        Box::new(InMemoryEntityManager {
            tables: self.tables.clone(),
            pending: Vec::new(),
        })
    }
}

/// Repository over one entity's table
pub struct InMemoryRepository {
    tables: Tables,
    entity: String,
}

impl InMemoryRepository {
    fn matching(&self, criteria: &Criteria) -> Result<Vec<Record>> {
        let tables = self
            .tables
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(tables
            .get(&self.entity)
            .map(|table| {
                table
                    .values()
                    .filter(|record| matches_criteria(record, criteria))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_by(
        &self,
        criteria: &Criteria,
        order_by: Option<&SortSpec>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Record>> {
        let mut records = self.matching(criteria)?;

        if let Some(sort) = order_by {
            records.sort_by(|a, b| {
                let ordering = compare_values(a.get(&sort.attribute), b.get(&sort.attribute));
                match sort.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }

        Ok(records
            .into_iter()
            .skip(offset.unwrap_or(0))
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn count_by(&self, criteria: &Criteria) -> Result<usize> {
        Ok(self.matching(criteria)?.len())
    }

    async fn find(&self, id: &str) -> Result<Option<Record>> {
        let tables = self
            .tables
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(tables
            .get(&self.entity)
            .and_then(|table| table.get(id))
            .cloned())
    }
}

enum Operation {
    Upsert {
        entity: String,
        id: String,
        record: Record,
    },
    Remove {
        entity: String,
        id: String,
    },
}

/// Unit of work over an [`InMemoryPersistence`]
pub struct InMemoryEntityManager {
    tables: Tables,
    pending: Vec<Operation>,
}

#[async_trait]
impl EntityManager for InMemoryEntityManager {
    async fn persist(&mut self, metadata: &EntityMetadata, record: &mut Record) -> Result<()> {
        let id = ensure_identifier(metadata, record);
        self.pending.push(Operation::Upsert {
            entity: metadata.name.clone(),
            id,
            record: record.clone(),
        });
        Ok(())
    }

    async fn remove(&mut self, metadata: &EntityMetadata, record: &Record) -> Result<()> {
        let id = metadata
            .identifier_of(record)
            .ok_or_else(|| anyhow!("Cannot remove a {} without identifier", metadata.name))?;
        self.pending.push(Operation::Remove {
            entity: metadata.name.clone(),
            id,
        });
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let mut tables = self
            .tables
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        for operation in self.pending.drain(..) {
            match operation {
                Operation::Upsert { entity, id, record } => {
                    tables.entry(entity).or_default().insert(id, record);
                }
                Operation::Remove { entity, id } => {
                    if let Some(table) = tables.get_mut(&entity) {
                        table.shift_remove(&id);
                    }
                }
            }
        }

        Ok(())
    }
}

fn matches_criteria(record: &Record, criteria: &Criteria) -> bool {
    criteria
        .iter()
        .all(|(attribute, expected)| value_matches(record.get(attribute), expected))
}

/// Exact match, also accepting a stored scalar whose text equals the
/// expected string (search values arrive as strings)
fn value_matches(stored: Option<&Value>, expected: &Value) -> bool {
    match (stored, expected) {
        (None, expected) => expected.is_null(),
        (Some(stored), _) if stored == expected => true,
        (Some(Value::Number(n)), Value::String(s)) => n.to_string() == *s,
        (Some(Value::Bool(b)), Value::String(s)) => b.to_string() == *s,
        _ => false,
    }
}

/// Nulls first, numbers numerically, strings lexically
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.unwrap_or(&Value::Null);
    let b = b.unwrap_or(&Value::Null);
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (x, y) => x.to_string().cmp(&y.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn metadata() -> EntityMetadata {
        EntityMetadata::new("Book").field("title").field("year")
    }

    fn book(title: &str, year: i64) -> Record {
        let mut record = Record::new();
        record.insert("title".to_string(), json!(title));
        record.insert("year".to_string(), json!(year));
        record
    }

    fn seeded() -> InMemoryPersistence {
        let store = InMemoryPersistence::new();
        let metadata = metadata();
        store.seed(&metadata, book("Dune", 1965)).unwrap();
        store.seed(&metadata, book("Hyperion", 1989)).unwrap();
        store.seed(&metadata, book("Foundation", 1951)).unwrap();
        store
    }

    #[tokio::test]
    async fn test_seed_generates_identifier() {
        let store = InMemoryPersistence::new();
        let record = store.seed(&metadata(), book("Dune", 1965)).unwrap();
        let id = record["id"].as_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());

        let found = store.repository_for(&metadata()).find(id).await.unwrap();
        assert_eq!(found.unwrap()["title"], json!("Dune"));
    }

    #[tokio::test]
    async fn test_find_by_criteria_matches_text_of_numbers() {
        let store = seeded();
        let repository = store.repository_for(&metadata());

        let mut criteria = Criteria::new();
        criteria.insert("year", "1965");
        let records = repository.find_by(&criteria, None, None, None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["title"], json!("Dune"));

        let mut criteria = Criteria::new();
        criteria.insert("title", "Dune");
        criteria.insert("year", "1965");
        assert_eq!(repository.count_by(&criteria).await.unwrap(), 1);

        let mut criteria = Criteria::new();
        criteria.insert("title", "dune");
        assert_eq!(repository.count_by(&criteria).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_by_sort_and_window() {
        let store = seeded();
        let repository = store.repository_for(&metadata());

        let ascending = SortSpec {
            attribute: "year".to_string(),
            direction: SortDirection::Ascending,
        };
        let records = repository
            .find_by(&Criteria::new(), Some(&ascending), Some(2), Some(1))
            .await
            .unwrap();
        let titles: Vec<&str> = records.iter().map(|r| r["title"].as_str().unwrap()).collect();
        assert_eq!(titles, vec!["Dune", "Hyperion"]);

        let descending = SortSpec {
            attribute: "title".to_string(),
            direction: SortDirection::Descending,
        };
        let records = repository
            .find_by(&Criteria::new(), Some(&descending), Some(10), Some(0))
            .await
            .unwrap();
        assert_eq!(records[0]["title"], json!("Hyperion"));
        assert_eq!(records[2]["title"], json!("Dune"));
    }

    #[tokio::test]
    async fn test_unordered_keeps_insertion_order() {
        let store = seeded();
        let records = store
            .repository_for(&metadata())
            .find_by(&Criteria::new(), None, None, None)
            .await
            .unwrap();
        assert_eq!(records[0]["title"], json!("Dune"));
        assert_eq!(records[2]["title"], json!("Foundation"));
    }

    #[tokio::test]
    async fn test_offset_past_end_is_empty() {
        let store = seeded();
        let records = store
            .repository_for(&metadata())
            .find_by(&Criteria::new(), None, Some(10), Some(30))
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_len_reports_poisoned_lock() {
        let store = InMemoryPersistence::new();
        let tables = store.tables.clone();
        let _ = std::thread::spawn(move || {
            let _guard = tables.write().unwrap();
            panic!("poison the table lock");
        })
        .join();

        assert!(store.len("Book").is_err());
    }

    #[tokio::test]
    async fn test_entity_manager_writes_on_flush_only() {
        let store = InMemoryPersistence::new();
        let metadata = metadata();
        let mut manager = store.entity_manager();

        let mut record = book("Dune", 1965);
        manager.persist(&metadata, &mut record).await.unwrap();
        assert!(record.contains_key("id"));
        assert_eq!(store.len("Book").unwrap(), 0);

        manager.flush().await.unwrap();
        assert_eq!(store.len("Book").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_persist_existing_updates() {
        let store = InMemoryPersistence::new();
        let metadata = metadata();
        let mut record = store.seed(&metadata, book("Dune", 1965)).unwrap();

        record.insert("title".to_string(), json!("Dune Messiah"));
        let mut manager = store.entity_manager();
        manager.persist(&metadata, &mut record).await.unwrap();
        manager.flush().await.unwrap();

        assert_eq!(store.len("Book").unwrap(), 1);
        let id = record["id"].as_str().unwrap();
        let found = store.repository_for(&metadata).find(id).await.unwrap().unwrap();
        assert_eq!(found["title"], json!("Dune Messiah"));
    }

    #[tokio::test]
    async fn test_remove() {
        let store = seeded();
        let metadata = metadata();
        let records = store
            .repository_for(&metadata)
            .find_by(&Criteria::new(), None, Some(1), None)
            .await
            .unwrap();

        let mut manager = store.entity_manager();
        manager.remove(&metadata, &records[0]).await.unwrap();
        manager.flush().await.unwrap();
        assert_eq!(store.len("Book").unwrap(), 2);
    }

    #[tokio::test]
    async fn test_remove_without_identifier_fails() {
        let store = InMemoryPersistence::new();
        let mut manager = store.entity_manager();
        assert!(manager.remove(&metadata(), &book("Dune", 1965)).await.is_err());
    }

    #[test]
    fn test_compare_values_nulls_first() {
        assert_eq!(compare_values(None, Some(&json!(1))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!(2)), Some(&json!(10))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!("b")), Some(&json!("a"))), Ordering::Greater);
    }

    #[test]
    fn test_value_matches() {
        assert!(value_matches(Some(&json!("Dune")), &json!("Dune")));
        assert!(value_matches(Some(&json!(3)), &json!("3")));
        assert!(value_matches(Some(&json!(true)), &json!("true")));
        assert!(!value_matches(Some(&json!(3)), &json!("3.0")));
        assert!(!value_matches(None, &json!("Dune")));
    }
}
