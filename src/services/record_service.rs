//! src/services/record_service.rs
//!
//! RecordService — persistence of records in SQLite, and the owner of the
//! post-commit contract for deferred file deletions: a deletion runs only
//! after the transaction that stops referencing the file has committed, and
//! a failed or rolled-back save drops it unrun.

use crate::finalize::DeferredDeletion;
use crate::models::{Attributes, Record};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record `{id}` not found in `{resource}`")]
    NotFound { resource: String, id: Uuid },
    #[error("record attributes are not valid JSON: {0}")]
    Attributes(#[from] serde_json::Error),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type RecordResult<T> = Result<T, RecordError>;

#[derive(FromRow)]
struct RecordRow {
    id: Uuid,
    resource: String,
    attributes: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RecordRow> for Record {
    type Error = RecordError;

    fn try_from(row: RecordRow) -> RecordResult<Self> {
        Ok(Record {
            id: row.id,
            resource: row.resource,
            attributes: serde_json::from_str::<Attributes>(&row.attributes)?,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct RecordService {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl RecordService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Insert an empty record under `resource`.
    pub async fn create(&self, resource: &str) -> RecordResult<Record> {
        let record = Record::new(resource);
        sqlx::query(
            "INSERT INTO records (id, resource, attributes, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(record.id)
        .bind(&record.resource)
        .bind(serde_json::to_string(&record.attributes)?)
        .bind(record.updated_at)
        .bind(record.updated_at)
        .execute(&*self.db)
        .await?;

        debug!(resource, record_id = %record.id, "created record");
        Ok(record)
    }

    pub async fn fetch(&self, resource: &str, id: Uuid) -> RecordResult<Record> {
        let row = sqlx::query_as::<_, RecordRow>(
            "SELECT id, resource, attributes, updated_at
             FROM records WHERE id = ? AND resource = ?",
        )
        .bind(id)
        .bind(resource)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => RecordError::NotFound {
                resource: resource.to_string(),
                id,
            },
            other => RecordError::Sqlx(other),
        })?;

        row.try_into()
    }

    /// Persist `record`'s attributes, then run `cleanups`.
    ///
    /// Returns the number of cleanups that completed. Cleanup failures are
    /// logged; the save itself has already committed at that point.
    pub async fn save(
        &self,
        record: &mut Record,
        cleanups: Vec<DeferredDeletion>,
    ) -> RecordResult<usize> {
        let attributes = serde_json::to_string(&record.attributes)?;
        let updated_at = Utc::now();

        let mut tx = self.db.begin().await?;
        let result = sqlx::query(
            "UPDATE records SET attributes = ?, updated_at = ?
             WHERE id = ? AND resource = ?",
        )
        .bind(&attributes)
        .bind(updated_at)
        .bind(record.id)
        .bind(&record.resource)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // `tx` rolls back on drop; the cleanups are dropped unrun.
            return Err(RecordError::NotFound {
                resource: record.resource.clone(),
                id: record.id,
            });
        }
        tx.commit().await?;
        record.updated_at = updated_at;

        Ok(run_cleanups(cleanups).await)
    }

    /// Delete `record`, then run `cleanups` for the files it referenced.
    pub async fn delete(
        &self,
        record: &Record,
        cleanups: Vec<DeferredDeletion>,
    ) -> RecordResult<usize> {
        let mut tx = self.db.begin().await?;
        let result = sqlx::query("DELETE FROM records WHERE id = ? AND resource = ?")
            .bind(record.id)
            .bind(&record.resource)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RecordError::NotFound {
                resource: record.resource.clone(),
                id: record.id,
            });
        }
        tx.commit().await?;

        Ok(run_cleanups(cleanups).await)
    }
}

async fn run_cleanups(cleanups: Vec<DeferredDeletion>) -> usize {
    let mut completed = 0;
    for task in cleanups {
        let attribute = task.attribute().to_string();
        let path = task.path().map(str::to_string);
        match task.run().await {
            Ok(removed) => {
                debug!(attribute = %attribute, path = ?path, removed, "post-commit file cleanup");
                completed += 1;
            }
            Err(err) => warn!(
                error = %err,
                attribute = %attribute,
                path = ?path,
                "post-commit file cleanup failed"
            ),
        }
    }
    completed
}
