use std::{
    collections::BTreeMap,
    sync::{
        RwLock,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    bytes::Bytes,
    futures::{StreamExt, stream::BoxStream},
    tracing::debug,
    url::Url,
    uuid::Uuid,
};

use crate::{
    error::{Result, StorageError},
    gateway::StorageGateway,
};

/// In-process bucket.
///
/// Objects live in a `BTreeMap`, so listings come back sorted. Presigned
/// URLs point at `endpoint` and carry a random signature, so two links for
/// the same object differ. [`MemoryGateway::set_available`] simulates a
/// backend outage.
pub struct MemoryGateway {
    endpoint: String,
    bucket: String,
    objects: RwLock<BTreeMap<String, Bytes>>,
    available: AtomicBool,
}

impl MemoryGateway {
    pub fn new(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            objects: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// When `false`, every operation fails with [`StorageError::Backend`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.objects.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self, operation: &str) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::backend(
                format!("{operation} in bucket {}", self.bucket),
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "backend unavailable"),
            ))
        }
    }
}

#[async_trait]
impl StorageGateway for MemoryGateway {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn ensure_bucket(&self) -> Result<()> {
        self.check_available("check bucket")
    }

    async fn put_object(&self, name: &str, data: Bytes) -> Result<()> {
        self.check_available("put object")?;
        debug!(bucket = %self.bucket, object = name, bytes = data.len(), "memory put");
        self.objects
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), data);
        Ok(())
    }

    fn list_objects(&self) -> BoxStream<'_, Result<String>> {
        if let Err(e) = self.check_available("list objects") {
            return futures::stream::once(async move { Err(e) }).boxed();
        }
        let names: Vec<String> = self
            .objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        futures::stream::iter(names.into_iter().map(Ok)).boxed()
    }

    async fn get_object(&self, name: &str) -> Result<Bytes> {
        self.check_available("get object")?;
        self.objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::not_found(name))
    }

    async fn presigned_url(&self, name: &str, ttl: Duration) -> Result<String> {
        self.check_available("presign object")?;
        if !self
            .objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(name)
        {
            return Err(StorageError::not_found(name));
        }

        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| StorageError::InvalidConfig(format!("endpoint {}: {e}", self.endpoint)))?;
        url.path_segments_mut()
            .map_err(|()| {
                StorageError::InvalidConfig(format!("endpoint {} cannot hold a path", self.endpoint))
            })?
            .pop_if_empty()
            .push(&self.bucket)
            .push(name);
        url.query_pairs_mut()
            .append_pair("X-Amz-Expires", &ttl.as_secs().to_string())
            .append_pair("X-Amz-Signature", &Uuid::new_v4().simple().to_string());
        Ok(url.into())
    }
}
