use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Settings of one parse session
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Options {
    /// Max declared and received payload size, `0` means unlimited
    pub max_payload: u64,
    /// Where file parts are spooled, defaults to the platform temp directory
    pub temp_dir: Option<PathBuf>,
    /// Milliseconds to wait before spooled files are deleted
    pub cleanup_delay: u64,
    /// Max number of parts (fields + files)
    pub parts: Option<usize>,
    /// Max bytes buffered while waiting for the header lines of a part
    pub header_size: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_payload: 0,
            temp_dir: None,
            cleanup_delay: Self::DEFAULT_CLEANUP_DELAY,
            parts: None,
            header_size: Self::DEFAULT_HEADER_SIZE,
        }
    }
}

impl Options {
    /// Delay before spooled files are removed, defaults to 100ms.
    pub const DEFAULT_CLEANUP_DELAY: u64 = 100;

    /// Max size of the part header section, defaults to 8KB.
    pub const DEFAULT_HEADER_SIZE: usize = 8 * 1024;

    /// Max payload size
    #[must_use]
    pub fn max_payload(mut self, max: u64) -> Self {
        self.max_payload = max;
        self
    }

    /// Temp directory for file parts
    #[must_use]
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir.replace(dir.into());
        self
    }

    /// Cleanup delay in milliseconds
    #[must_use]
    pub fn cleanup_delay(mut self, millis: u64) -> Self {
        self.cleanup_delay = millis;
        self
    }

    /// Max number of parts (fields + files)
    #[must_use]
    pub fn parts(mut self, max: usize) -> Self {
        self.parts.replace(max);
        self
    }

    /// Max size of the part header section
    #[must_use]
    pub fn header_size(mut self, max: usize) -> Self {
        self.header_size = max;
        self
    }

    /// Resolved temp directory.
    #[must_use]
    pub fn temp_path(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Resolved cleanup delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.cleanup_delay)
    }

    /// Check payload size
    #[must_use]
    pub fn checked_payload(&self, rhs: u64) -> Option<u64> {
        Some(self.max_payload).filter(|max| *max > 0 && rhs > *max)
    }

    /// Check parts
    #[must_use]
    pub fn checked_parts(&self, rhs: usize) -> Option<usize> {
        self.parts.filter(|max| rhs > *max)
    }

    /// Check header section size
    #[must_use]
    pub fn checked_header_size(&self, rhs: usize) -> Option<usize> {
        Some(self.header_size).filter(|max| rhs > *max)
    }
}
