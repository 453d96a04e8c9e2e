//! PostgreSQL persistence using sqlx.
//!
//! # Feature flag
//!
//! This module is gated behind the `postgres` feature flag:
//! ```toml
//! [dependencies]
//! crud-rs = { version = "0.1", features = ["postgres"] }
//! ```
//!
//! # Schema
//!
//! Records of every entity live in a single `crud_records` table keyed by
//! `(entity, id)`, with the record itself in a JSONB `data` column. Criteria
//! compare `data->>'attribute'` to the text of the expected value, so a
//! search for `"1965"` matches a stored number 1965.

use super::ensure_identifier;
use crate::core::entity::{EntityMetadata, Record};
use crate::core::query::{Criteria, SortSpec};
use crate::core::service::{EntityManager, PersistenceProvider, Repository};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Schema management
// ---------------------------------------------------------------------------

/// Apply the required table and index (idempotent).
///
/// Safe to call on every startup.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS crud_records (
            entity TEXT NOT NULL,
            id TEXT NOT NULL,
            data JSONB NOT NULL,
            PRIMARY KEY (entity, id)
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| anyhow!("Failed to create crud_records table: {}", e))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_crud_records_data ON crud_records USING GIN (data)")
        .execute(pool)
        .await
        .map_err(|e| anyhow!("Failed to create crud_records index: {}", e))?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Persistence provider backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `url` and apply the schema
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url)
            .await
            .map_err(|e| anyhow!("Failed to connect to PostgreSQL: {}", e))?;
        ensure_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl PersistenceProvider for PostgresPersistence {
    fn repository_for(&self, metadata: &EntityMetadata) -> Arc<dyn Repository> {
        Arc::new(PostgresRepository {
            pool: self.pool.clone(),
            entity: metadata.name.clone(),
        })
    }

    fn entity_manager(&self) -> Box<dyn EntityManager> {
        Box::new(PostgresEntityManager {
            pool: self.pool.clone(),
            pending: Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// Repository over the records of one entity
pub struct PostgresRepository {
    pool: PgPool,
    entity: String,
}

/// `WHERE` clause for `criteria`, with placeholders starting at `$2`
/// (`$1` is the entity name), and the values to bind in order
fn where_clause(criteria: &Criteria) -> (String, Vec<String>) {
    let mut sql = String::from("WHERE entity = $1");
    let mut binds = Vec::with_capacity(criteria.len() * 2);

    for (attribute, expected) in criteria.iter() {
        let key = binds.len() + 2;
        sql.push_str(&format!(" AND data->>${} = ${}", key, key + 1));
        binds.push(attribute.clone());
        binds.push(value_text(expected));
    }

    (sql, binds)
}

/// LIMIT/OFFSET bind; PostgreSQL rejects negative values
fn to_sql_count(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_by(
        &self,
        criteria: &Criteria,
        order_by: Option<&SortSpec>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Record>> {
        let (mut sql, mut binds) = where_clause(criteria);
        sql.insert_str(0, "SELECT data FROM crud_records ");

        if let Some(sort) = order_by {
            sql.push_str(&format!(
                " ORDER BY data->${} {} NULLS FIRST",
                binds.len() + 2,
                sort.direction.as_sql()
            ));
            binds.push(sort.attribute.clone());
        }

        let next = binds.len() + 2;
        sql.push_str(&format!(" LIMIT ${} OFFSET ${}", next, next + 1));

        let mut query = sqlx::query_scalar::<_, Json<Record>>(&sql).bind(&self.entity);
        for value in &binds {
            query = query.bind(value);
        }
        let rows = query
            .bind(limit.map(to_sql_count))
            .bind(to_sql_count(offset.unwrap_or(0)))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!("Failed to list {} records: {}", self.entity, e))?;

        Ok(rows.into_iter().map(|Json(record)| record).collect())
    }

    async fn count_by(&self, criteria: &Criteria) -> Result<usize> {
        let (mut sql, binds) = where_clause(criteria);
        sql.insert_str(0, "SELECT COUNT(*) FROM crud_records ");

        let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(&self.entity);
        for value in &binds {
            query = query.bind(value);
        }
        let count = query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| anyhow!("Failed to count {} records: {}", self.entity, e))?;

        Ok(count as usize)
    }

    async fn find(&self, id: &str) -> Result<Option<Record>> {
        let row = sqlx::query_scalar::<_, Json<Record>>(
            "SELECT data FROM crud_records WHERE entity = $1 AND id = $2",
        )
        .bind(&self.entity)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to fetch {} {}: {}", self.entity, id, e))?;

        Ok(row.map(|Json(record)| record))
    }
}

// ---------------------------------------------------------------------------
// Unit of work
// ---------------------------------------------------------------------------

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

/// Unit of work flushed inside a single transaction
pub struct PostgresEntityManager {
    pool: PgPool,
    pending: Vec<Operation>,
}

#[async_trait]
impl EntityManager for PostgresEntityManager {
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

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| anyhow!("Failed to begin transaction: {}", e))?;

        for operation in self.pending.drain(..) {
            match operation {
                Operation::Upsert { entity, id, record } => {
                    sqlx::query(
                        "INSERT INTO crud_records (entity, id, data) VALUES ($1, $2, $3)
                         ON CONFLICT (entity, id) DO UPDATE SET data = EXCLUDED.data",
                    )
                    .bind(&entity)
                    .bind(&id)
                    .bind(Json(record))
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| anyhow!("Failed to persist {} {}: {}", entity, id, e))?;
                }
                Operation::Remove { entity, id } => {
                    sqlx::query("DELETE FROM crud_records WHERE entity = $1 AND id = $2")
                        .bind(&entity)
                        .bind(&id)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| anyhow!("Failed to remove {} {}: {}", entity, id, e))?;
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| anyhow!("Failed to commit transaction: {}", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_where_clause_without_criteria() {
        let (sql, binds) = where_clause(&Criteria::new());
        assert_eq!(sql, "WHERE entity = $1");
        assert!(binds.is_empty());
    }

    #[test]
    fn test_where_clause_numbers_placeholders() {
        let mut criteria = Criteria::new();
        criteria.insert("title", "Dune");
        criteria.insert("year", 1965);

        let (sql, binds) = where_clause(&criteria);
        assert_eq!(
            sql,
            "WHERE entity = $1 AND data->>$2 = $3 AND data->>$4 = $5"
        );
        assert_eq!(binds, vec!["title", "Dune", "year", "1965"]);
    }

    #[test]
    fn test_sql_count_clamps_to_i64() {
        assert_eq!(to_sql_count(30), 30);
        assert_eq!(to_sql_count(usize::MAX), i64::MAX);
    }
}
