use std::env;
use std::path::PathBuf;

use tracing::warn;

use crate::spill::MAX_IN_MEMORY_BYTES;
use crate::{BlobError, BlobResult};

/// Environment variable holding the fault injection percentage
pub const FAIL_PERCENT_ENV: &str = "DOG_BLOB_FAIL_PERCENT";

/// Configuration for a [`BlobReceiver`](crate::BlobReceiver)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveConfig {
    /// Bucket every received blob is uploaded to
    pub bucket: String,

    /// Percentage (0-100) of receives that fail with an injected error after
    /// the source has been fully buffered. 0 disables injection.
    pub fail_percent: u8,

    /// Bytes held in memory before a receive spills to a temporary file
    pub spill_threshold_bytes: usize,

    /// Directory for spill files. `None` uses the system temp directory.
    pub temp_dir: Option<PathBuf>,
}

impl ReceiveConfig {
    /// Create a new config with defaults
    pub fn new<S: Into<String>>(bucket: S) -> Self {
        Self {
            bucket: bucket.into(),
            fail_percent: 0,
            spill_threshold_bytes: MAX_IN_MEMORY_BYTES,
            temp_dir: None,
        }
    }

    /// Defaults plus the fail percentage from `DOG_BLOB_FAIL_PERCENT`.
    ///
    /// Meant to be called once at process start.
    pub fn from_env<S: Into<String>>(bucket: S) -> BlobResult<Self> {
        let raw = env::var(FAIL_PERCENT_ENV).ok();
        let config = Self::new(bucket).with_fail_percent(parse_fail_percent(raw.as_deref()));
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no upload could succeed with
    pub fn validate(&self) -> BlobResult<()> {
        if self.bucket.trim().is_empty() {
            return Err(BlobError::invalid("bucket name must not be empty"));
        }
        if self.fail_percent > 100 {
            return Err(BlobError::invalid(format!(
                "fail percent {} is above 100",
                self.fail_percent
            )));
        }
        Ok(())
    }

    /// Set fault injection percentage, clamped to 100
    pub fn with_fail_percent(mut self, percent: u8) -> Self {
        self.fail_percent = percent.min(100);
        self
    }

    /// Set spill threshold
    pub fn with_spill_threshold(mut self, bytes: usize) -> Self {
        self.spill_threshold_bytes = bytes;
        self
    }

    /// Put spill files in `dir`
    pub fn with_temp_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }
}

/// Absent, empty or unparseable values disable injection; large values clamp to 100.
pub fn parse_fail_percent(raw: Option<&str>) -> u8 {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return 0;
    };
    match raw.parse::<i64>() {
        Ok(n) if n <= 0 => 0,
        Ok(n) => n.min(100) as u8,
        Err(e) => {
            warn!("Ignoring invalid {}={:?}: {}", FAIL_PERCENT_ENV, raw, e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ReceiveConfig::new("blobs");
        assert_eq!(config.bucket, "blobs");
        assert_eq!(config.fail_percent, 0);
        assert_eq!(config.spill_threshold_bytes, 4 * 1024 * 1024);
        assert!(config.temp_dir.is_none());
    }

    #[test]
    fn builder_clamps_fail_percent() {
        let config = ReceiveConfig::new("blobs").with_fail_percent(200);
        assert_eq!(config.fail_percent, 100);
    }

    #[test]
    fn validate_rejects_empty_bucket() {
        let err = ReceiveConfig::new("  ").validate().unwrap_err();
        assert!(matches!(err, BlobError::Invalid { .. }));
        assert!(ReceiveConfig::new("blobs").validate().is_ok());
    }

    #[test]
    fn from_env_rejects_empty_bucket() {
        let err = ReceiveConfig::from_env("").unwrap_err();
        assert!(matches!(err, BlobError::Invalid { .. }));
    }

    #[test]
    fn validate_rejects_unclamped_percent() {
        let mut config = ReceiveConfig::new("blobs");
        config.fail_percent = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_fail_percent() {
        assert_eq!(parse_fail_percent(None), 0);
        assert_eq!(parse_fail_percent(Some("")), 0);
        assert_eq!(parse_fail_percent(Some("0")), 0);
        assert_eq!(parse_fail_percent(Some(" 25 ")), 25);
        assert_eq!(parse_fail_percent(Some("100")), 100);
        assert_eq!(parse_fail_percent(Some("150")), 100);
        assert_eq!(parse_fail_percent(Some("-5")), 0);
        assert_eq!(parse_fail_percent(Some("lots")), 0);
    }
}
