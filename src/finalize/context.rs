//! Per-call state of one finalization.

use super::error::{FinalizeError, FinalizeResult};
use super::path::PathResolver;
use crate::models::{Attributes, FieldConfig, UploadRequest, UploadToken};
use crate::storage::Storage;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Built fresh for every [`super::Finalizer::finalize`] call and dropped when
/// it returns, so the resolved destination never leaks across requests.
pub struct FinalizeContext<'a> {
    request: &'a UploadRequest,
    token: &'a UploadToken,
    field: &'a FieldConfig,
    disk: &'a str,
    storage: Arc<dyn Storage>,
    resolver: PathResolver,
}

impl<'a> FinalizeContext<'a> {
    pub(crate) fn new(
        request: &'a UploadRequest,
        token: &'a UploadToken,
        field: &'a FieldConfig,
        disk: &'a str,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            request,
            token,
            field,
            disk,
            storage,
            resolver: PathResolver::new(),
        }
    }

    pub fn request(&self) -> &'a UploadRequest {
        self.request
    }

    pub fn token(&self) -> &'a UploadToken {
        self.token
    }

    pub fn field(&self) -> &'a FieldConfig {
        self.field
    }

    pub fn disk(&self) -> &'a str {
        self.disk
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Permanent path for this upload, resolved on first use.
    pub fn target_path(&mut self) -> FinalizeResult<&str> {
        self.resolver.resolve(self.request, self.token, self.field)
    }

    /// Copy the staged object to [`Self::target_path`].
    ///
    /// Returns the target path, or `None` if the copy did not happen.
    pub async fn store_file(&mut self) -> FinalizeResult<Option<String>> {
        let token = self.token;
        let source = token.staging_key().ok_or_else(|| {
            FinalizeError::MissingInput(format!("{}key", self.field.attribute))
        })?;
        let target = self.target_path()?.to_string();

        if self.storage.copy(source, &target).await? {
            Ok(Some(target))
        } else {
            warn!(source, target = %target, uuid = %token.uuid, "staged upload copy failed");
            Ok(None)
        }
    }

    /// Add the original filename and stored size columns, if configured.
    pub async fn merge_extra_columns(
        &mut self,
        mut attributes: Attributes,
    ) -> FinalizeResult<Attributes> {
        let field = self.field;

        if let Some(column) = &field.original_name_column {
            let name = self
                .token
                .original_name
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null);
            attributes.insert(column.clone(), name);
        }

        if let Some(column) = &field.size_column {
            let target = self.target_path()?.to_string();
            let size = self.storage.size(&target).await?;
            attributes.insert(column.clone(), Value::from(size));
        }

        Ok(attributes)
    }
}
