use std::time::Duration;

use {async_trait::async_trait, bytes::Bytes, futures::stream::BoxStream};

use crate::error::Result;

/// The bucket operations the bot relies on.
///
/// Every call is a single stateless round trip to the backend: no retries,
/// no caching. Object names are flat strings.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Name of the bucket this gateway operates on.
    fn bucket(&self) -> &str;

    /// Create the bucket if it does not exist yet. Run once at startup.
    async fn ensure_bucket(&self) -> Result<()>;

    /// Store `data` under `name`, replacing any existing object.
    async fn put_object(&self, name: &str, data: Bytes) -> Result<()>;

    /// Lazily list object names in backend order.
    ///
    /// Each call starts a fresh listing. Dropping the stream early stops
    /// fetching further pages.
    fn list_objects(&self) -> BoxStream<'_, Result<String>>;

    /// Fetch the full content of `name`, or [`StorageError::NotFound`].
    ///
    /// [`StorageError::NotFound`]: crate::StorageError::NotFound
    async fn get_object(&self, name: &str) -> Result<Bytes>;

    /// A URL granting read access to `name` for `ttl`.
    ///
    /// Implementations check that the object exists before signing and
    /// return [`StorageError::NotFound`] otherwise, so a bad name is
    /// reported when the link is requested rather than when it is opened.
    ///
    /// [`StorageError::NotFound`]: crate::StorageError::NotFound
    async fn presigned_url(&self, name: &str, ttl: Duration) -> Result<String>;
}
