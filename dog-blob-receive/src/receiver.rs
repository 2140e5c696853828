use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{debug, info, instrument, warn};

use crate::{
    BlobError, BlobRef, BlobResult, BlobStore, ByteStream, FaultInjector, PutObject,
    ReceiveConfig, SizedRef, SpillBuffer,
};

/// Receives blob streams and uploads them with a verified `Content-MD5`.
///
/// Each call buffers one blob in its own [`SpillBuffer`]; concurrent calls
/// share nothing but the store.
pub struct BlobReceiver {
    store: Arc<dyn BlobStore>,
    faults: FaultInjector,
    config: ReceiveConfig,
}

impl BlobReceiver {
    /// Create a new receiver
    pub fn new<S: BlobStore + 'static>(store: S, config: ReceiveConfig) -> Self {
        Self::with_shared_store(Arc::new(store), config)
    }

    /// Create a receiver over a store that is also used elsewhere
    pub fn with_shared_store(store: Arc<dyn BlobStore>, config: ReceiveConfig) -> Self {
        Self {
            store,
            faults: FaultInjector::new(config.fail_percent),
            config,
        }
    }

    /// Buffer `source` completely, then upload it under `blob`.
    ///
    /// On success the returned size is the number of bytes read from `source`.
    /// Any failure is returned unchanged and the spill file, if one was
    /// created, is removed before this returns.
    #[instrument(skip(self, source), fields(blob = %blob, bucket = %self.config.bucket))]
    pub async fn receive_blob(&self, blob: &BlobRef, source: ByteStream) -> BlobResult<SizedRef> {
        let mut buffer = SpillBuffer::new(blob).with_threshold(self.config.spill_threshold_bytes);
        if let Some(dir) = &self.config.temp_dir {
            buffer = buffer.with_temp_dir(dir);
        }

        let result = self.buffer_and_upload(blob, source, &mut buffer).await;
        buffer.release();
        result
    }

    async fn buffer_and_upload(
        &self,
        blob: &BlobRef,
        mut source: ByteStream,
        buffer: &mut SpillBuffer,
    ) -> BlobResult<SizedRef> {
        let mut size: u64 = 0;
        while let Some(chunk) = source.next().await {
            let chunk = chunk.map_err(BlobError::source_read)?;
            size += buffer.write(&chunk).await.map_err(BlobError::spill)? as u64;
        }
        debug!(size, spilled = buffer.is_spilled(), "Buffered blob");

        // After the copy on purpose: injected failures still exercise buffering.
        if self.faults.should_fail() {
            warn!("Injecting failure for {} ({}%)", blob, self.faults.percent());
            return Err(BlobError::InjectedFailure);
        }

        let content_md5 = buffer.digest();
        let request = PutObject {
            key: blob.as_str(),
            bucket: &self.config.bucket,
            content_md5,
            content_length: size,
            body: buffer.body(),
        };
        self.store.put_object(request).await?;

        info!("Stored {} ({} bytes, md5 {})", blob, size, content_md5);
        Ok(SizedRef::new(blob.clone(), size))
    }

    /// Get configuration
    pub fn config(&self) -> &ReceiveConfig {
        &self.config
    }
}

impl std::fmt::Debug for BlobReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobReceiver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
