//! DiskStorage — local filesystem backend.
//!
//! Payloads are sharded beneath `base_path/{shard}/{shard}/{key}` where the
//! shards are the first two bytes of MD5(key). Writes go to a temporary file
//! in the destination directory and are renamed into place after fsync, so a
//! reader never observes a partially written object.

use super::{ByteStream, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const MAX_OBJECT_KEY_LEN: usize = 1024;

#[derive(Clone, Debug)]
pub struct DiskStorage {
    base_path: PathBuf,
}

impl DiskStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Rejects keys that begin with `/`, contain `..`, or carry control
    /// characters and backslashes.
    fn ensure_key_safe(key: &str) -> StorageResult<()> {
        let invalid = || StorageError::InvalidKey(key.to_string());
        if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
            return Err(invalid());
        }
        if key.starts_with('/') || key.contains("..") {
            return Err(invalid());
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(invalid());
        }
        Ok(())
    }

    fn object_shards(key: &str) -> (String, String) {
        let digest = md5::compute(key);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Physical payload path for `key`. Parent directories may not exist yet.
    fn object_path(&self, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(key);
        let mut path = self.base_path.clone();
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    async fn prepare_parent(path: &Path) -> StorageResult<PathBuf> {
        let parent = path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StorageError::Io(io::Error::new(
                ErrorKind::Other,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        Ok(parent)
    }

    /// Rename a finished temp file over `file_path`, cleaning up on failure.
    async fn commit_temp(tmp_path: &Path, file_path: &Path) -> StorageResult<()> {
        if let Err(err) = fs::rename(tmp_path, file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(file_path).await?;
                fs::rename(tmp_path, file_path).await?;
            } else {
                let _ = fs::remove_file(tmp_path).await;
                return Err(StorageError::Io(err));
            }
        }
        Ok(())
    }

    async fn write_stream(&self, key: &str, mut stream: ByteStream) -> StorageResult<u64> {
        Self::ensure_key_safe(key)?;
        let file_path = self.object_path(key);
        let parent = Self::prepare_parent(&file_path).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size_bytes: u64 = 0;
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(StorageError::Io(err));
                }
            };
            size_bytes += chunk.len() as u64;
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StorageError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }

        Self::commit_temp(&tmp_path, &file_path).await?;
        debug!(key, size_bytes, "wrote object {}", file_path.display());
        Ok(size_bytes)
    }

    /// Remove empty shard directories up to (not including) `base_path`.
    async fn prune_empty_dirs(&self, start: &Path) {
        let stop = self.base_path.as_path();
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl Storage for DiskStorage {
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        let stream = futures::stream::once(async move { Ok::<_, io::Error>(data) });
        self.write_stream(key, Box::pin(stream)).await?;
        Ok(())
    }

    async fn put_stream(&self, key: &str, stream: ByteStream) -> StorageResult<u64> {
        self.write_stream(key, stream).await
    }

    async fn copy(&self, from: &str, to: &str) -> StorageResult<bool> {
        Self::ensure_key_safe(from)?;
        Self::ensure_key_safe(to)?;
        let source = self.object_path(from);
        let dest = self.object_path(to);
        let parent = Self::prepare_parent(&dest).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        match fs::copy(&source, &tmp_path).await {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(from, to, "copy source missing");
                let _ = fs::remove_file(&tmp_path).await;
                self.prune_empty_dirs(&parent).await;
                return Ok(false);
            }
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StorageError::Io(err));
            }
        }

        Self::commit_temp(&tmp_path, &dest).await?;
        Ok(true)
    }

    async fn size(&self, key: &str) -> StorageResult<u64> {
        Self::ensure_key_safe(key)?;
        match fs::metadata(self.object_path(key)).await {
            Ok(meta) => Ok(meta.len()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        Self::ensure_key_safe(key)?;
        let file_path = self.object_path(key);
        let removed = match fs::remove_file(&file_path).await {
            Ok(_) => {
                debug!("removed physical file {}", file_path.display());
                true
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("file {} already missing", file_path.display());
                false
            }
            Err(err) => return Err(StorageError::Io(err)),
        };

        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent).await;
        }
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Self::ensure_key_safe(key)?;
        Ok(fs::try_exists(self.object_path(key)).await?)
    }
}
