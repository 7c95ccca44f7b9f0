//! Pluggable seams of the finalization protocol.
//!
//! Each slot on [`FieldConfig`] is optional; when unset the engine falls back
//! to [`MoveToPermanent`] for completion, to the client-supplied key for
//! naming, and to [`DeletePrevious`] for deletion.

use super::context::FinalizeContext;
use super::error::FinalizeResult;
use crate::models::{Attributes, FieldConfig, Record, UploadRequest};
use crate::storage::Storage;
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

/// Picks the object key a finalized upload is stored under.
///
/// The returned key still goes through the `tmp/` prefix rewrite.
pub trait NamingStrategy: Send + Sync {
    fn name(&self, request: &UploadRequest) -> String;
}

impl<F> NamingStrategy for F
where
    F: Fn(&UploadRequest) -> String + Send + Sync,
{
    fn name(&self, request: &UploadRequest) -> String {
        self(request)
    }
}

/// What a completion strategy wants written onto the record.
#[derive(Clone, Debug, PartialEq)]
pub enum Completion {
    /// The strategy handled everything; the record is left alone.
    Handled,
    /// Assign this value to the field's attribute.
    Value(Value),
    /// Assign every entry onto the record.
    Attributes(Attributes),
}

/// Performs the copy and metadata assembly for an upload.
#[async_trait]
pub trait CompletionStrategy: Send + Sync {
    async fn complete(
        &self,
        ctx: &mut FinalizeContext<'_>,
        record: &Record,
    ) -> FinalizeResult<Completion>;
}

/// Copy the staged object to its permanent path and collect the configured
/// original-name and size columns.
///
/// A failed copy stores `false` in the path attribute. If a size column is
/// configured, the size lookup on the missing destination then fails with
/// [`super::FinalizeError::FileNotFound`].
#[derive(Clone, Copy, Debug, Default)]
pub struct MoveToPermanent;

#[async_trait]
impl CompletionStrategy for MoveToPermanent {
    async fn complete(
        &self,
        ctx: &mut FinalizeContext<'_>,
        _record: &Record,
    ) -> FinalizeResult<Completion> {
        let stored = ctx.store_file().await?;
        let mut attributes = Attributes::new();
        attributes.insert(
            ctx.field().attribute.clone(),
            stored.map(Value::String).unwrap_or(Value::Bool(false)),
        );
        Ok(Completion::Attributes(
            ctx.merge_extra_columns(attributes).await?,
        ))
    }
}

/// Everything a deletion strategy gets to see.
pub struct DeletionTarget<'a> {
    pub request: &'a UploadRequest,
    pub record: &'a Record,
    pub field: &'a FieldConfig,
    /// Disk the file lives on.
    pub disk: &'a str,
    pub storage: &'a dyn Storage,
    /// Path of the file to remove; `None` when the attribute was empty.
    pub path: Option<&'a str>,
}

/// Removes a stored file. Returns whether a file was removed.
///
/// Runs after the record is saved, so it must not expect its own record
/// changes to be persisted.
#[async_trait]
pub trait DeletionStrategy: Send + Sync {
    async fn delete(&self, target: DeletionTarget<'_>) -> FinalizeResult<bool>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeletePrevious;

#[async_trait]
impl DeletionStrategy for DeletePrevious {
    async fn delete(&self, target: DeletionTarget<'_>) -> FinalizeResult<bool> {
        let Some(path) = target.path else {
            return Ok(false);
        };

        let removed = target.storage.delete(path).await?;
        info!(disk = target.disk, path, removed, "deleted stored file");
        Ok(removed)
    }
}
