//! In-memory storage backend that records every call.

use async_trait::async_trait;
use bytes::Bytes;
use staged_uploads::storage::{Storage, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::Mutex;

/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, Bytes>>,
    calls: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, key: &str, data: &'static [u8]) -> Self {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), Bytes::from_static(data));
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    /// Calls made so far, formatted as `op:key` (copy is `copy:from->to`).
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        self.record(format!("put:{key}"));
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn copy(&self, from: &str, to: &str) -> StorageResult<bool> {
        self.record(format!("copy:{from}->{to}"));
        let mut objects = self.objects.lock().unwrap();
        match objects.get(from).cloned() {
            Some(data) => {
                objects.insert(to.to_string(), data);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn size(&self, key: &str) -> StorageResult<u64> {
        self.record(format!("size:{key}"));
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|data| data.len() as u64)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        self.record(format!("delete:{key}"));
        Ok(self.objects.lock().unwrap().remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.contains(key))
    }
}
