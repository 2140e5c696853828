use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use tokio::sync::RwLock;

use crate::{BlobError, BlobResult, BlobStore, Md5Digest, PutObject};

/// What a [`MemoryBlobStore`] saw for one `put_object` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRecord {
    pub key: String,
    pub bucket: String,
    pub content_md5: Md5Digest,
    pub content_length: u64,
    pub accepted: bool,
}

/// In-process [`BlobStore`] that checks uploads the way S3 checks `Content-MD5`.
///
/// Clones share the same objects and request log.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    objects: Arc<RwLock<HashMap<(String, String), Bytes>>>,
    puts: Arc<RwLock<Vec<PutRecord>>>,
    reject_with: Option<String>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that drains every body and then rejects the upload with `reason`
    pub fn rejecting<S: Into<String>>(reason: S) -> Self {
        Self {
            reject_with: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Stored bytes for `key` in `bucket`
    pub async fn get(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Every upload request received so far, in order
    pub async fn puts(&self) -> Vec<PutRecord> {
        self.puts.read().await.clone()
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    async fn verify_and_collect(request: &mut PutObject<'_>) -> BlobResult<Bytes> {
        let mut received = BytesMut::new();
        while let Some(chunk) = request.body.next().await {
            let chunk = chunk.map_err(BlobError::backend)?;
            received.extend_from_slice(&chunk);
        }

        if received.len() as u64 != request.content_length {
            return Err(BlobError::upload_failed(format!(
                "IncompleteBody: declared {} bytes, received {}",
                request.content_length,
                received.len()
            )));
        }

        let actual = Md5Digest::of(&received);
        if actual != request.content_md5 {
            return Err(BlobError::upload_failed(format!(
                "BadDigest: Content-MD5 {} does not match received {}",
                request.content_md5.to_base64(),
                actual.to_base64()
            )));
        }

        Ok(received.freeze())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put_object(&self, mut request: PutObject<'_>) -> BlobResult<()> {
        let outcome = match Self::verify_and_collect(&mut request).await {
            Ok(data) => match &self.reject_with {
                Some(reason) => Err(BlobError::upload_failed(reason.clone())),
                None => Ok(data),
            },
            Err(e) => Err(e),
        };

        self.puts.write().await.push(PutRecord {
            key: request.key.to_string(),
            bucket: request.bucket.to_string(),
            content_md5: request.content_md5,
            content_length: request.content_length,
            accepted: outcome.is_ok(),
        });

        let data = outcome?;
        self.objects
            .write()
            .await
            .insert((request.bucket.to_string(), request.key.to_string()), data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_of(data: &'static [u8]) -> crate::BodyStream<'static> {
        Box::pin(futures::stream::once(async move {
            Ok::<_, std::io::Error>(Bytes::from_static(data))
        }))
    }

    #[tokio::test]
    async fn accepts_matching_digest_and_length() {
        let store = MemoryBlobStore::new();
        let request = PutObject {
            key: "sha1-abc",
            bucket: "blobs",
            content_md5: Md5Digest::of(b"hello"),
            content_length: 5,
            body: body_of(b"hello"),
        };

        store.put_object(request).await.unwrap();

        assert_eq!(store.get("blobs", "sha1-abc").await.unwrap(), Bytes::from_static(b"hello"));
        assert!(store.puts().await[0].accepted);
    }

    #[tokio::test]
    async fn rejects_bad_digest() {
        let store = MemoryBlobStore::new();
        let request = PutObject {
            key: "sha1-abc",
            bucket: "blobs",
            content_md5: Md5Digest::of(b"other"),
            content_length: 5,
            body: body_of(b"hello"),
        };

        let err = store.put_object(request).await.unwrap_err();
        assert!(err.to_string().contains("BadDigest"));
        assert_eq!(store.object_count().await, 0);
        assert!(!store.puts().await[0].accepted);
    }

    #[tokio::test]
    async fn rejects_short_body() {
        let store = MemoryBlobStore::new();
        let request = PutObject {
            key: "sha1-abc",
            bucket: "blobs",
            content_md5: Md5Digest::of(b"hello"),
            content_length: 6,
            body: body_of(b"hello"),
        };

        let err = store.put_object(request).await.unwrap_err();
        assert!(err.to_string().contains("IncompleteBody"));
    }

    #[tokio::test]
    async fn rejecting_store_keeps_nothing() {
        let store = MemoryBlobStore::rejecting("AccessDenied");
        let request = PutObject {
            key: "sha1-abc",
            bucket: "blobs",
            content_md5: Md5Digest::of(b"hello"),
            content_length: 5,
            body: body_of(b"hello"),
        };

        let err = store.put_object(request).await.unwrap_err();
        assert!(err.is_upload_failure());
        assert_eq!(store.object_count().await, 0);
        assert_eq!(store.puts().await.len(), 1);
    }
}
