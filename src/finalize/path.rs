//! Destination path resolution for a finalized upload.

use super::error::{FinalizeError, FinalizeResult};
use crate::models::{FieldConfig, UploadRequest, UploadToken};
use tracing::{debug, warn};

/// Key segment marking objects still in the staging area.
pub const STAGING_PREFIX: &str = "tmp/";

/// Replace the first `tmp/` in `key` with `storage_path`.
///
/// Keys without the marker are returned unchanged.
pub fn rewrite_staging_prefix(key: &str, storage_path: &str) -> String {
    key.replacen(STAGING_PREFIX, storage_path, 1)
}

/// Resolves the permanent path once and hands back the same string for the
/// rest of the finalization call.
#[derive(Debug, Default)]
pub struct PathResolver {
    resolved: Option<String>,
}

impl PathResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(
        &mut self,
        request: &UploadRequest,
        token: &UploadToken,
        field: &FieldConfig,
    ) -> FinalizeResult<&str> {
        let path = match self.resolved.take() {
            Some(path) => path,
            None => Self::compute(request, token, field)?,
        };
        Ok(self.resolved.insert(path).as_str())
    }

    fn compute(
        request: &UploadRequest,
        token: &UploadToken,
        field: &FieldConfig,
    ) -> FinalizeResult<String> {
        let key = match &field.naming {
            Some(naming) => naming.name(request),
            None => token
                .destination_seed()
                .ok_or_else(|| FinalizeError::MissingInput(format!("{}s3Key", field.attribute)))?
                .to_string(),
        };

        if !key.contains(STAGING_PREFIX) {
            // Passed through unchanged; the key may already be permanent.
            warn!(key = %key, attribute = %field.attribute, "upload key has no staging prefix");
        }
        let path = rewrite_staging_prefix(&key, &field.storage_path);
        debug!(key = %key, path = %path, "resolved upload destination");
        Ok(path)
    }
}
