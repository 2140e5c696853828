use base64::Engine as _;
use bytes::Bytes;
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Stream of bytes for inbound blob content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Stream of bytes handed to the remote store, borrowed from a spill buffer
pub type BodyStream<'a> = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send + 'a>>;

/// Identifier of a content-addressed blob, e.g. `sha1-0beec7b5...`
///
/// The addressing scheme is owned by the caller; this type only carries the
/// string around and uses it as the object key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobRef(pub String);

impl BlobRef {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix for spill file names. Anything outside `[A-Za-z0-9._-]` becomes `_`.
    pub fn temp_prefix(&self) -> String {
        let mut prefix: String = self
            .0
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
                _ => '_',
            })
            .collect();
        prefix.push('-');
        prefix
    }
}

impl std::fmt::Display for BlobRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BlobRef {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A blob reference stamped with the number of bytes actually stored
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SizedRef {
    pub blob_ref: BlobRef,
    pub size: u64,
}

impl SizedRef {
    pub fn new(blob_ref: BlobRef, size: u64) -> Self {
        Self { blob_ref, size }
    }
}

impl std::fmt::Display for SizedRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} bytes)", self.blob_ref, self.size)
    }
}

/// MD5 digest of uploaded content, sent as the `Content-MD5` integrity header.
///
/// Unrelated to the hash in the blob's own reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Md5Digest(pub [u8; 16]);

impl Md5Digest {
    /// Digest of a complete byte slice
    pub fn of(data: &[u8]) -> Self {
        Self(md5::compute(data).0)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Lowercase hex, as printed by `md5sum`
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Standard base64, the encoding of the `Content-MD5` header
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.0)
    }
}

impl From<md5::Digest> for Md5Digest {
    fn from(digest: md5::Digest) -> Self {
        Self(digest.0)
    }
}

impl std::fmt::Display for Md5Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
