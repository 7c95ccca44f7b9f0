//! The upload finalization protocol.

use super::cleanup::DeferredDeletion;
use super::context::FinalizeContext;
use super::error::FinalizeResult;
use super::strategy::{
    Completion, CompletionStrategy, DeletePrevious, DeletionStrategy, MoveToPermanent,
};
use crate::models::{FieldConfig, Record, UploadRequest, UploadToken};
use crate::storage::{CLOUD_DISK, Storage, StorageRegistry};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Outcome of [`Finalizer::finalize`].
#[derive(Debug)]
pub enum Finalization {
    /// The request carried no upload for this field.
    NoUpload,
    /// The completion strategy did all the work itself.
    Handled,
    Merged(MergeResult),
}

impl Finalization {
    pub fn into_cleanup(self) -> Option<DeferredDeletion> {
        match self {
            Finalization::Merged(result) => result.cleanup,
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct MergeResult {
    /// Attributes written onto the record.
    pub changed: Vec<String>,
    /// Removal of the superseded file, for prunable fields. Must only be run
    /// once the record save has committed.
    pub cleanup: Option<DeferredDeletion>,
}

#[derive(Clone, Debug)]
pub struct Finalizer {
    disks: StorageRegistry,
}

impl Finalizer {
    pub fn new(disks: StorageRegistry) -> Self {
        Self { disks }
    }

    pub fn disks(&self) -> &StorageRegistry {
        &self.disks
    }

    /// Move an uploaded file from staging to its permanent path and record it
    /// on `record`.
    ///
    /// Does nothing when the request has no `<attribute>.uuid`. Attribute
    /// changes are made in memory only; persisting `record` and running the
    /// returned cleanup after commit is the caller's job.
    #[instrument(
        skip_all,
        fields(resource = %record.resource, record_id = %record.id, attribute = %field.attribute)
    )]
    pub async fn finalize(
        &self,
        request: &UploadRequest,
        record: &mut Record,
        field: &FieldConfig,
    ) -> FinalizeResult<Finalization> {
        let Some(token) = UploadToken::from_request(request, &field.attribute) else {
            debug!("no upload in request");
            return Ok(Finalization::NoUpload);
        };

        // Signed uploads only ever come from the cloud provider.
        if field.disk != CLOUD_DISK {
            debug!(configured = %field.disk, "overriding field disk with {}", CLOUD_DISK);
        }
        let storage = self.disks.disk(CLOUD_DISK)?;
        let previous_path = record.get_str(&field.attribute).map(str::to_string);

        let completion: Arc<dyn CompletionStrategy> = field
            .completion
            .clone()
            .unwrap_or_else(|| Arc::new(MoveToPermanent));
        let outcome = {
            let mut ctx =
                FinalizeContext::new(request, &token, field, CLOUD_DISK, storage.clone());
            completion.complete(&mut ctx, record).await?
        };

        let changed = match outcome {
            Completion::Handled => {
                info!(uuid = %token.uuid, "upload handled by completion strategy");
                return Ok(Finalization::Handled);
            }
            Completion::Value(value) => {
                // A bare value is taken as-is; only a full attribute merge
                // supersedes the previous file.
                record.set(field.attribute.clone(), value);
                info!(uuid = %token.uuid, "upload finalized with a single value");
                return Ok(Finalization::Merged(MergeResult {
                    changed: vec![field.attribute.clone()],
                    cleanup: None,
                }));
            }
            Completion::Attributes(attributes) => {
                let keys = attributes.keys().cloned().collect();
                for (key, value) in attributes {
                    record.set(key, value);
                }
                keys
            }
        };

        // Prune only once a new path is stored, and never the file just written.
        let cleanup = match record.get_str(&field.attribute) {
            Some(current) if field.prunable => {
                let superseded = previous_path.filter(|path| path != current);
                Some(self.deferred(request, record, field, storage, superseded))
            }
            None if field.prunable => {
                warn!(
                    uuid = %token.uuid,
                    previous = ?previous_path,
                    "no new path stored; keeping previous file"
                );
                None
            }
            _ => None,
        };

        info!(
            uuid = %token.uuid,
            path = ?record.get_str(&field.attribute),
            changed = ?changed,
            "upload finalized"
        );
        Ok(Finalization::Merged(MergeResult { changed, cleanup }))
    }

    /// Clear the field's columns on `record` and return the deletion of the
    /// file it pointed at, to run once the cleared record is saved.
    pub fn detach(
        &self,
        request: &UploadRequest,
        record: &mut Record,
        field: &FieldConfig,
    ) -> FinalizeResult<DeferredDeletion> {
        let storage = self.disks.disk(CLOUD_DISK)?;
        let current = record.get_str(&field.attribute).map(str::to_string);
        for column in field.columns() {
            record.clear(column);
        }
        debug!(attribute = %field.attribute, path = ?current, "detached stored file");
        Ok(self.deferred(request, record, field, storage, current))
    }

    /// Deletion of the field's current file, to run once `record` itself has
    /// been deleted.
    pub fn schedule_removal(
        &self,
        request: &UploadRequest,
        record: &Record,
        field: &FieldConfig,
    ) -> FinalizeResult<DeferredDeletion> {
        let storage = self.disks.disk(CLOUD_DISK)?;
        let current = record.get_str(&field.attribute).map(str::to_string);
        Ok(self.deferred(request, record, field, storage, current))
    }

    fn deferred(
        &self,
        request: &UploadRequest,
        record: &Record,
        field: &FieldConfig,
        storage: Arc<dyn Storage>,
        path: Option<String>,
    ) -> DeferredDeletion {
        let deleter: Arc<dyn DeletionStrategy> = field
            .deletion
            .clone()
            .unwrap_or_else(|| Arc::new(DeletePrevious));
        DeferredDeletion::new(
            deleter,
            request.clone(),
            record.clone(),
            field.clone(),
            CLOUD_DISK.to_string(),
            storage,
            path,
        )
    }
}
