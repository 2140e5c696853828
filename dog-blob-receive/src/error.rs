use thiserror::Error;

/// Result type for blob receive operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Errors that can end a blob receive.
///
/// Every variant is terminal for the current attempt; nothing in this crate
/// retries.
#[derive(Error, Debug)]
pub enum BlobError {
    /// The inbound stream ended abnormally
    #[error("Source stream failed: {source}")]
    SourceRead {
        #[source]
        source: std::io::Error,
    },

    /// Temporary spill storage could not be allocated, written or read back
    #[error("Spill storage error: {source}")]
    Spill {
        #[source]
        source: std::io::Error,
    },

    /// Synthetic failure produced by fault injection
    #[error("Fake injected error for testing")]
    InjectedFailure,

    #[error("Upload failed: {reason}")]
    UploadFailed { reason: String },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl BlobError {
    /// Wrap a failure of the inbound stream
    pub fn source_read(error: std::io::Error) -> Self {
        Self::SourceRead { source: error }
    }

    /// Wrap a failure of the spill file
    pub fn spill(error: std::io::Error) -> Self {
        Self::Spill { source: error }
    }

    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    /// Create an upload failed error
    pub fn upload_failed<S: Into<String>>(reason: S) -> Self {
        Self::UploadFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// True for failures produced by fault injection
    pub fn is_injected(&self) -> bool {
        matches!(self, Self::InjectedFailure)
    }

    /// True for failures reported by the remote store
    pub fn is_upload_failure(&self) -> bool {
        matches!(self, Self::UploadFailed { .. } | Self::Backend { .. })
    }
}
