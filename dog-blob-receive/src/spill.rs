//! Write-once, read-once byte buffer that spills to a temporary file.
//!
//! A [`SpillBuffer`] keeps written bytes in memory until the next write would
//! take it past its threshold (4 MiB by default). At that point the buffered
//! bytes move to a temporary file and every later write goes straight to
//! that file. Each chunk is folded into a running MD5 as it is written, so
//! the `Content-MD5` of the whole blob is known before the upload starts
//! without a second pass over disk.
//!
//! The first read flips the buffer into its reading phase and rewinds the
//! spill file if there is one. Writing after that is a caller bug and panics.

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::{Buf, Bytes, BytesMut};
use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::{BlobRef, BodyStream, Md5Digest};

/// Default number of bytes held in memory before spilling to disk
pub const MAX_IN_MEMORY_BYTES: usize = 4 << 20;

/// Size of the chunks produced by [`SpillBuffer::body`]
pub const READ_CHUNK_BYTES: usize = 32 * 1024;

/// Lifecycle phase of a spill buffer. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Writing,
    Reading,
}

/// Where the authoritative bytes currently live
enum Medium {
    Memory(BytesMut),
    Disk(SpillFile),
    Released,
}

struct SpillFile {
    file: File,
    path: TempPath,
}

impl SpillFile {
    async fn allocate(prefix: String, dir: Option<PathBuf>) -> io::Result<Self> {
        let named = tokio::task::spawn_blocking(move || {
            let mut builder = tempfile::Builder::new();
            builder.prefix(&prefix);
            match dir {
                Some(dir) => builder.tempfile_in(dir),
                None => builder.tempfile(),
            }
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;

        let (file, path) = named.into_parts();
        Ok(Self {
            file: File::from_std(file),
            path,
        })
    }
}

/// Bounded memory/disk buffer for a single blob transfer
pub struct SpillBuffer {
    label: String,
    threshold: usize,
    temp_dir: Option<PathBuf>,
    medium: Medium,
    md5: md5::Context,
    len: u64,
    phase: Phase,
}

impl SpillBuffer {
    /// Create an empty buffer. The blob ref only names the spill file.
    pub fn new(blob: &BlobRef) -> Self {
        Self {
            label: blob.temp_prefix(),
            threshold: MAX_IN_MEMORY_BYTES,
            temp_dir: None,
            medium: Medium::Memory(BytesMut::new()),
            md5: md5::Context::new(),
            len: 0,
            phase: Phase::Writing,
        }
    }

    /// Override the in-memory threshold
    pub fn with_threshold(mut self, bytes: usize) -> Self {
        self.threshold = bytes;
        self
    }

    /// Create the spill file in `dir` instead of the system temp directory
    pub fn with_temp_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Append a chunk, spilling to disk first if it would not fit in memory.
    ///
    /// Returns the number of bytes accepted, which is always `chunk.len()` on
    /// success. After an error the digest and length cover only the chunks
    /// stored before it, and the buffer should only be released.
    ///
    /// # Panics
    ///
    /// Panics if called after the first [`read`](Self::read).
    pub async fn write(&mut self, chunk: &[u8]) -> io::Result<usize> {
        assert!(
            self.phase == Phase::Writing,
            "write after read on spill buffer {}",
            self.label
        );

        let must_spill = match &self.medium {
            Medium::Memory(memory) => memory.len() + chunk.len() > self.threshold,
            _ => false,
        };
        if must_spill {
            self.spill_to_disk().await?;
        }

        match &mut self.medium {
            Medium::Memory(memory) => memory.extend_from_slice(chunk),
            Medium::Disk(spill) => spill.file.write_all(chunk).await?,
            Medium::Released => return Err(released()),
        }
        self.md5.consume(chunk);
        self.len += chunk.len() as u64;
        Ok(chunk.len())
    }

    async fn spill_to_disk(&mut self) -> io::Result<()> {
        if !matches!(self.medium, Medium::Memory(_)) {
            return Ok(());
        }

        // Allocated first so a failure leaves the in-memory bytes in place.
        let spill = SpillFile::allocate(self.label.clone(), self.temp_dir.clone()).await?;
        let buffered: Bytes = match &mut self.medium {
            Medium::Memory(memory) => memory.split().freeze(),
            _ => return Ok(()),
        };
        debug!(
            "Spilling {} buffered bytes to {}",
            buffered.len(),
            spill.path.display()
        );
        // Installed before the copy so a failed copy can't lead to a second file.
        self.medium = Medium::Disk(spill);
        if let Medium::Disk(spill) = &mut self.medium {
            spill.file.write_all(&buffered).await?;
        }
        Ok(())
    }

    /// Read the next bytes back. Returns 0 at the end of the data.
    ///
    /// The first call ends the writing phase and rewinds the spill file.
    pub async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.phase == Phase::Writing {
            self.phase = Phase::Reading;
            if let Medium::Disk(spill) = &mut self.medium {
                spill.file.flush().await?;
                spill.file.seek(SeekFrom::Start(0)).await?;
            }
        }

        match &mut self.medium {
            Medium::Memory(memory) => {
                let n = buf.len().min(memory.len());
                buf[..n].copy_from_slice(&memory[..n]);
                memory.advance(n);
                Ok(n)
            }
            Medium::Disk(spill) => spill.file.read(buf).await,
            Medium::Released => Err(released()),
        }
    }

    /// Stream the buffered bytes in [`READ_CHUNK_BYTES`] chunks
    pub fn body(&mut self) -> BodyStream<'_> {
        let stream = async_stream::stream! {
            let mut chunk = vec![0u8; READ_CHUNK_BYTES];
            loop {
                match self.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => yield Ok(Bytes::copy_from_slice(&chunk[..n])),
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        };
        Box::pin(stream)
    }

    /// MD5 of every byte written so far
    pub fn digest(&self) -> Md5Digest {
        Md5Digest::from(self.md5.clone().compute())
    }

    /// Total bytes written
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_spilled(&self) -> bool {
        matches!(self.medium, Medium::Disk(_))
    }

    /// Path of the spill file, if one has been allocated and not yet released
    pub fn spill_path(&self) -> Option<&Path> {
        match &self.medium {
            Medium::Disk(spill) => Some(&*spill.path),
            _ => None,
        }
    }

    /// Drop the buffered bytes and remove the spill file, if any.
    ///
    /// Safe to call any number of times. Removal failures are logged.
    pub fn release(&mut self) {
        match std::mem::replace(&mut self.medium, Medium::Released) {
            Medium::Disk(SpillFile { file, path }) => {
                drop(file);
                let shown = path.display().to_string();
                match path.close() {
                    Ok(()) => debug!("Removed spill file {}", shown),
                    Err(e) => warn!("Failed to remove spill file {}: {}", shown, e),
                }
            }
            Medium::Memory(_) | Medium::Released => {}
        }
    }
}

impl Drop for SpillBuffer {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for SpillBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpillBuffer")
            .field("label", &self.label)
            .field("threshold", &self.threshold)
            .field("len", &self.len)
            .field("phase", &self.phase)
            .field("spill_path", &self.spill_path())
            .finish()
    }
}

fn released() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "spill buffer already released")
}
