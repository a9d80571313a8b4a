//! Transport Configuration

use std::path::PathBuf;

/// Ring size of a newly created segment
pub const DEFAULT_SEGMENT_SIZE: usize = 2 * 1024 * 1024;

/// Environment variable overriding the segment directory
pub const PATH_ENV: &str = "MSGQ_PATH";

const DEFAULT_PATH: &str = "/dev/shm";

/// Shared-memory transport configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgqConfig {
    /// Directory holding one segment file per service
    pub path: PathBuf,
    /// Ring capacity in bytes for segments this process creates
    pub segment_size: usize,
}

impl MsgqConfig {
    /// Configuration rooted at `path` with the default segment size
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            segment_size: DEFAULT_SEGMENT_SIZE,
        }
    }

    /// Default configuration, with the directory taken from `MSGQ_PATH` when set
    pub fn from_env() -> Self {
        match std::env::var_os(PATH_ENV) {
            Some(path) if !path.is_empty() => Self::with_path(path),
            _ => Self::default(),
        }
    }

    /// Segment file for a service
    pub fn segment_path(&self, service: &str) -> PathBuf {
        self.path.join(format!("msgq_{}", service))
    }
}

impl Default for MsgqConfig {
    fn default() -> Self {
        Self::with_path(DEFAULT_PATH)
    }
}
