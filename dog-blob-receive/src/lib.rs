//! # dog-blob-receive: write path for content-addressed blobs
//!
//! `dog-blob-receive` takes an incoming blob stream, buffers it just long enough
//! to compute the `Content-MD5` the remote store requires, and uploads it in a
//! single call. What the store verified is exactly what the caller sent.
//!
//! ## Key Features
//!
//! - **Bounded memory**: blobs up to 4 MiB stay in memory, anything larger spills to a temp file
//! - **Single hash pass**: MD5 is folded in while writing, never re-read from disk
//! - **Guaranteed cleanup**: spill files are removed on success, failure and cancellation
//! - **Fault injection**: a configurable share of receives fail on purpose, after buffering
//! - **Storage agnostic**: the remote side is a one-method [`BlobStore`] trait
//!
//! ## Quick Start
//!
//! ```rust
//! use dog_blob_receive::prelude::*;
//! use bytes::Bytes;
//!
//! # #[tokio::main]
//! # async fn main() -> BlobResult<()> {
//! let store = MemoryBlobStore::new();
//! let receiver = BlobReceiver::new(store.clone(), ReceiveConfig::new("blobs"));
//!
//! let blob = BlobRef::new("sha1-2aae6c35c94fcfb415dbe95f408b9ce91ee846ed");
//! let source = futures::stream::once(async {
//!     Ok::<_, std::io::Error>(Bytes::from_static(b"hello world"))
//! });
//!
//! let sized = receiver.receive_blob(&blob, Box::pin(source)).await?;
//! assert_eq!(sized.size, 11);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   Your Service  │  ← Addressing, auth, wiring
//! ├─────────────────┤
//! │  BlobReceiver   │  ← Buffer, inject faults, upload once
//! ├─────────────────┤
//! │   SpillBuffer   │  ← Memory → temp file, running MD5
//! ├─────────────────┤
//! │   BlobStore     │  ← Remote put_object
//! └─────────────────┘
//! ```

mod config;
mod error;
mod fault;
mod memory_store;
mod receiver;
pub mod spill;
mod store;
mod types;

pub use config::{parse_fail_percent, ReceiveConfig, FAIL_PERCENT_ENV};
pub use error::{BlobError, BlobResult};
pub use fault::FaultInjector;
pub use memory_store::{MemoryBlobStore, PutRecord};
pub use receiver::BlobReceiver;
pub use spill::{Phase, SpillBuffer, MAX_IN_MEMORY_BYTES};
pub use store::{BlobStore, PutObject};
pub use types::{BlobRef, BodyStream, ByteStream, Md5Digest, SizedRef};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BlobError, BlobReceiver, BlobRef, BlobResult, BlobStore, ByteStream, MemoryBlobStore,
        ReceiveConfig, SizedRef,
    };
}
