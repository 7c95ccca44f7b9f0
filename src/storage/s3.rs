use super::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStore, ObjectStoreExt, PutPayload};
use std::time::Instant;

/// Cloud object storage over the S3 API.
///
/// Generic over the store so S3-compatible backends can be swapped in.
#[derive(Clone)]
pub struct S3Storage<S = AmazonS3> {
    store: S,
    bucket: String,
}

impl S3Storage {
    /// Build a client from the standard `AWS_*` environment plus explicit
    /// bucket, region and optional endpoint (MinIO and other S3-compatible
    /// providers).
    pub fn new(bucket: String, region: String, endpoint_url: Option<String>) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder.with_endpoint(endpoint).with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(Self { store, bucket })
    }
}

impl<S: ObjectStore> S3Storage<S> {
    /// Wrap an already-built store.
    pub fn with_store(store: S, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

impl<S> std::fmt::Debug for S3Storage<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Storage")
            .field("bucket", &self.bucket)
            .finish()
    }
}

#[async_trait]
impl<S: ObjectStore> Storage for S3Storage<S> {
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        let location = Path::from(key);
        self.store
            .put(&location, PutPayload::from(data))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, bucket = %self.bucket, key = %key, "S3 put failed");
                StorageError::Backend(e.to_string())
            })?;
        Ok(())
    }

    async fn copy(&self, from: &str, to: &str) -> StorageResult<bool> {
        let start = Instant::now();
        let source = Path::from(from);
        let dest = Path::from(to);

        match self.store.copy(&source, &dest).await {
            Ok(()) => {
                tracing::info!(
                    bucket = %self.bucket,
                    from_key = %from,
                    to_key = %to,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 copy successful"
                );
                Ok(true)
            }
            Err(ObjectStoreError::NotFound { .. }) => {
                tracing::warn!(bucket = %self.bucket, from_key = %from, "S3 copy source missing");
                Ok(false)
            }
            Err(e) => Err(StorageError::Backend(e.to_string())),
        }
    }

    async fn size(&self, key: &str) -> StorageResult<u64> {
        match self.store.head(&Path::from(key)).await {
            Ok(meta) => Ok(meta.size as u64),
            Err(ObjectStoreError::NotFound { .. }) => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(StorageError::Backend(e.to_string())),
        }
    }

    /// S3 deletes are idempotent and do not report whether the key existed;
    /// only an explicit `NotFound` from the backend yields `false`.
    async fn delete(&self, key: &str) -> StorageResult<bool> {
        match self.store.delete(&Path::from(key)).await {
            Ok(()) => {
                tracing::info!(bucket = %self.bucket, key = %key, "S3 delete successful");
                Ok(true)
            }
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => {
                tracing::error!(error = %e, bucket = %self.bucket, key = %key, "S3 delete failed");
                Err(StorageError::Backend(e.to_string()))
            }
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self.store.head(&Path::from(key)).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::Backend(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    fn in_memory() -> S3Storage<InMemory> {
        S3Storage::with_store(InMemory::new(), "uploads")
    }

    #[test]
    fn builds_against_custom_endpoint() {
        let storage = S3Storage::new(
            "uploads".to_string(),
            "us-east-1".to_string(),
            Some("http://minio:9000".to_string()),
        )
        .unwrap();
        assert_eq!(storage.bucket(), "uploads");
    }

    #[tokio::test]
    async fn delete_is_a_single_call() {
        let storage = in_memory();
        storage
            .put("uploads/a.png", Bytes::from_static(b"png"))
            .await
            .unwrap();

        assert!(storage.delete("uploads/a.png").await.unwrap());
        assert!(!storage.exists("uploads/a.png").await.unwrap());
        // Deleting again is not an error.
        storage.delete("uploads/a.png").await.unwrap();
    }

    #[tokio::test]
    async fn copy_and_size_map_missing_objects() {
        let storage = in_memory();
        assert!(!storage.copy("tmp/nope.png", "uploads/nope.png").await.unwrap());
        assert!(matches!(
            storage.size("uploads/nope.png").await,
            Err(StorageError::NotFound(_))
        ));

        storage
            .put("tmp/a.png", Bytes::from_static(b"0123"))
            .await
            .unwrap();
        assert!(storage.copy("tmp/a.png", "uploads/a.png").await.unwrap());
        assert_eq!(storage.size("uploads/a.png").await.unwrap(), 4);
    }
}
