//! Deletion of a superseded file, deferred until the record save commits.

use super::error::FinalizeResult;
use super::strategy::{DeletionStrategy, DeletionTarget};
use crate::models::{FieldConfig, Record, UploadRequest};
use crate::storage::Storage;
use std::{fmt, sync::Arc};
use tracing::debug;

/// A file deletion to perform after the owning record is durably saved.
///
/// `run` consumes the value, so a task can run at most once. Dropping it
/// without running (e.g. on rollback) leaves the file in place.
#[must_use = "deferred deletions do nothing unless `run` is called after commit"]
pub struct DeferredDeletion {
    deleter: Arc<dyn DeletionStrategy>,
    request: UploadRequest,
    record: Record,
    field: FieldConfig,
    disk: String,
    storage: Arc<dyn Storage>,
    path: Option<String>,
}

impl DeferredDeletion {
    pub(crate) fn new(
        deleter: Arc<dyn DeletionStrategy>,
        request: UploadRequest,
        record: Record,
        field: FieldConfig,
        disk: String,
        storage: Arc<dyn Storage>,
        path: Option<String>,
    ) -> Self {
        Self {
            deleter,
            request,
            record,
            field,
            disk,
            storage,
            path,
        }
    }

    /// Path that will be deleted.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn disk(&self) -> &str {
        &self.disk
    }

    pub fn attribute(&self) -> &str {
        &self.field.attribute
    }

    /// Perform the deletion. Returns whether a file was removed.
    pub async fn run(self) -> FinalizeResult<bool> {
        debug!(
            disk = %self.disk,
            path = ?self.path,
            attribute = %self.field.attribute,
            "running deferred deletion"
        );
        self.deleter
            .delete(DeletionTarget {
                request: &self.request,
                record: &self.record,
                field: &self.field,
                disk: &self.disk,
                storage: self.storage.as_ref(),
                path: self.path.as_deref(),
            })
            .await
    }
}

impl fmt::Debug for DeferredDeletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredDeletion")
            .field("record_id", &self.record.id)
            .field("attribute", &self.field.attribute)
            .field("disk", &self.disk)
            .field("path", &self.path)
            .finish()
    }
}
