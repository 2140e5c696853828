use async_trait::async_trait;

use crate::{BlobResult, BodyStream, Md5Digest};

/// Remote object storage, seen from the write path.
///
/// Implementations own the client, credentials and transport. The receiver
/// makes at most one `put_object` call per blob and never retries.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `request.body` under `request.key` in `request.bucket`.
    ///
    /// `content_md5` and `content_length` describe the body exactly; a
    /// backend is expected to reject the upload if what it received differs.
    async fn put_object(&self, request: PutObject<'_>) -> BlobResult<()>;
}

/// A single upload call
pub struct PutObject<'a> {
    pub key: &'a str,
    pub bucket: &'a str,
    pub content_md5: Md5Digest,
    pub content_length: u64,
    pub body: BodyStream<'a>,
}

impl std::fmt::Debug for PutObject<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PutObject")
            .field("key", &self.key)
            .field("bucket", &self.bucket)
            .field("content_md5", &self.content_md5)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}
