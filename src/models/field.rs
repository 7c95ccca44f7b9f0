//! Setup-time configuration of one file attribute.

use crate::finalize::strategy::{CompletionStrategy, DeletionStrategy, NamingStrategy};
use crate::storage::CLOUD_DISK;
use std::{fmt, sync::Arc};

#[derive(Clone)]
pub struct FieldConfig {
    /// Attribute holding the storage path; also the request input namespace.
    pub attribute: String,

    /// Disk the field was declared on. Finalization overrides it with
    /// [`CLOUD_DISK`].
    pub disk: String,

    /// Permanent prefix substituted for the staging `tmp/` marker.
    pub storage_path: String,

    pub original_name_column: Option<String>,
    pub size_column: Option<String>,

    /// Delete the previous file once a replacement is committed.
    pub prunable: bool,

    pub naming: Option<Arc<dyn NamingStrategy>>,
    pub completion: Option<Arc<dyn CompletionStrategy>>,
    pub deletion: Option<Arc<dyn DeletionStrategy>>,
}

impl FieldConfig {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            disk: CLOUD_DISK.to_string(),
            storage_path: String::new(),
            original_name_column: None,
            size_column: None,
            prunable: false,
            naming: None,
            completion: None,
            deletion: None,
        }
    }

    pub fn disk(mut self, disk: impl Into<String>) -> Self {
        self.disk = disk.into();
        self
    }

    pub fn path(mut self, storage_path: impl Into<String>) -> Self {
        self.storage_path = storage_path.into();
        self
    }

    pub fn store_original_name(mut self, column: impl Into<String>) -> Self {
        self.original_name_column = Some(column.into());
        self
    }

    pub fn store_size(mut self, column: impl Into<String>) -> Self {
        self.size_column = Some(column.into());
        self
    }

    pub fn prunable(mut self) -> Self {
        self.prunable = true;
        self
    }

    pub fn store_as(mut self, naming: impl NamingStrategy + 'static) -> Self {
        self.naming = Some(Arc::new(naming));
        self
    }

    pub fn store(mut self, completion: impl CompletionStrategy + 'static) -> Self {
        self.completion = Some(Arc::new(completion));
        self
    }

    pub fn delete(mut self, deletion: impl DeletionStrategy + 'static) -> Self {
        self.deletion = Some(Arc::new(deletion));
        self
    }

    /// Every column the field writes: the path plus the optional extras.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.attribute.as_str())
            .chain(self.original_name_column.as_deref())
            .chain(self.size_column.as_deref())
    }
}

impl fmt::Debug for FieldConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldConfig")
            .field("attribute", &self.attribute)
            .field("disk", &self.disk)
            .field("storage_path", &self.storage_path)
            .field("original_name_column", &self.original_name_column)
            .field("size_column", &self.size_column)
            .field("prunable", &self.prunable)
            .field("custom_naming", &self.naming.is_some())
            .field("custom_completion", &self.completion.is_some())
            .field("custom_deletion", &self.deletion.is_some())
            .finish()
    }
}
