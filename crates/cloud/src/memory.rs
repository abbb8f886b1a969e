//! In-memory adapters for tests.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::CloudError;
use crate::object_store::ObjectStore;
use crate::queue::JobQueue;
use crate::vector_store::{IndexSpec, VectorIndexStore};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Object store keeping keys in a set. Presigned URLs are fake
/// `memory://` URLs; uploading through them is simulated with [`Self::put`].
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<BTreeSet<String>>,
    broken_keys: Mutex<BTreeSet<String>>,
    fail: AtomicBool,
}

impl InMemoryObjectStore {
    pub fn put(&self, key: &str) {
        lock(&self.objects).insert(key.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.objects).contains(key)
    }

    pub fn keys(&self) -> Vec<String> {
        lock(&self.objects).iter().cloned().collect()
    }

    /// Make every subsequent call fail.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Make existence checks for `key` fail while other keys keep working.
    pub fn break_key(&self, key: &str) {
        lock(&self.broken_keys).insert(key.to_string());
    }

    fn check(&self, operation: &'static str) -> Result<(), CloudError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CloudError::object_store(operation, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn presign_upload(
        &self,
        object_key: &str,
        content_type: &str,
    ) -> Result<String, CloudError> {
        self.check("presign")?;
        Ok(format!("memory://bucket/{object_key}?content-type={content_type}"))
    }

    async fn delete_objects(&self, object_keys: &[String]) -> Result<usize, CloudError> {
        self.check("batch delete")?;
        let mut objects = lock(&self.objects);
        for key in object_keys {
            objects.remove(key);
        }
        Ok(object_keys.len())
    }

    async fn object_exists(&self, object_key: &str) -> Result<bool, CloudError> {
        self.check("existence check")?;
        if lock(&self.broken_keys).contains(object_key) {
            return Err(CloudError::object_store("existence check", "access denied"));
        }
        Ok(self.contains(object_key))
    }
}

/// Queue recording published bodies.
#[derive(Default)]
pub struct InMemoryJobQueue {
    messages: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl InMemoryJobQueue {
    pub fn messages(&self) -> Vec<String> {
        lock(&self.messages).clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn publish(&self, body: &str) -> Result<(), CloudError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CloudError::Queue("injected failure".into()));
        }
        lock(&self.messages).push(body.to_string());
        Ok(())
    }
}

/// Vector store tracking index names and ARNs.
pub struct InMemoryVectorIndexStore {
    bucket_arn: String,
    indexes: Mutex<BTreeSet<String>>,
    fail_create: AtomicBool,
    fail_delete: AtomicBool,
}

impl InMemoryVectorIndexStore {
    pub fn new(bucket_arn: impl Into<String>) -> Self {
        Self {
            bucket_arn: bucket_arn.into(),
            indexes: Mutex::default(),
            fail_create: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }

    /// ARNs of the indexes that currently exist.
    pub fn index_arns(&self) -> Vec<String> {
        lock(&self.indexes).iter().cloned().collect()
    }

    pub fn set_create_failing(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_delete_failing(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl VectorIndexStore for InMemoryVectorIndexStore {
    async fn create_index(&self, spec: &IndexSpec) -> Result<(), CloudError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(CloudError::vector_index("create", "injected failure"));
        }
        let arn = format!("{}/index/{}", self.bucket_arn, spec.index_name);
        lock(&self.indexes).insert(arn);
        Ok(())
    }

    async fn delete_index(&self, index_arn: &str) -> Result<(), CloudError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(CloudError::vector_index("delete", "injected failure"));
        }
        lock(&self.indexes).remove(index_arn);
        Ok(())
    }
}
