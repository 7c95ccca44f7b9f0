//! Object storage capability consumed by the finalization core.
//!
//! Backends are registered under a disk name. Uploads finalized through
//! [`crate::finalize::Finalizer`] always land on [`CLOUD_DISK`], since the
//! signed upload URL was issued by that provider.

pub mod disk;
pub mod error;
pub mod s3;

pub use disk::DiskStorage;
pub use error::{StorageError, StorageResult};
pub use s3::S3Storage;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use std::{collections::HashMap, io, pin::Pin, sync::Arc};

/// Disk name of the cloud object-storage provider.
pub const CLOUD_DISK: &str = "s3";

/// A boxed stream of body chunks for streaming writes.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Write an object, replacing any existing one at `key`.
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Stream an object into storage.
    ///
    /// The default buffers the whole body and delegates to [`Storage::put`].
    async fn put_stream(&self, key: &str, mut stream: ByteStream) -> StorageResult<u64> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        let len = buf.len() as u64;
        self.put(key, buf.freeze()).await?;
        Ok(len)
    }

    /// Copy `from` to `to`. Returns `false` when the source object is absent.
    async fn copy(&self, from: &str, to: &str) -> StorageResult<bool>;

    /// Size in bytes. Fails with [`StorageError::NotFound`] for a missing key.
    async fn size(&self, key: &str) -> StorageResult<u64>;

    /// Delete an object. Returns `false` when it was already gone.
    async fn delete(&self, key: &str) -> StorageResult<bool>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;
}

/// Named storage backends.
#[derive(Clone, Default)]
pub struct StorageRegistry {
    disks: HashMap<String, Arc<dyn Storage>>,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_disk(mut self, name: impl Into<String>, storage: Arc<dyn Storage>) -> Self {
        self.register(name, storage);
        self
    }

    pub fn register(&mut self, name: impl Into<String>, storage: Arc<dyn Storage>) {
        self.disks.insert(name.into(), storage);
    }

    pub fn disk(&self, name: &str) -> StorageResult<Arc<dyn Storage>> {
        self.disks
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::UnknownDisk(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.disks.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for StorageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageRegistry")
            .field("disks", &self.disks.keys().collect::<Vec<_>>())
            .finish()
    }
}
