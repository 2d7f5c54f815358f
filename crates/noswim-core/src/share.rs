//! Handing the session log to the user.
//!
//! The log sink only knows its file and contents; where they go is a
//! [`ShareSink`] decision. On a desktop that means telling the user where the
//! file lives.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::log_sink::LogSink;

/// Errors raised while sharing the session log.
#[derive(Debug, Error)]
pub enum ShareError {
    /// The session file is gone.
    #[error("Log file does not exist: {}", .0.display())]
    Missing(PathBuf),

    /// The sink was created without a durable file.
    #[error("Session log has no file to share")]
    NoFile,

    /// The session file exists but could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        /// Session file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The share target rejected the log.
    #[error("Share target failed: {0}")]
    Export(String),
}

/// Destination for an exported session log.
pub trait ShareSink: Send + Sync {
    /// Delivers `contents` of the session file at `file`. Progress lines go
    /// to `log`.
    ///
    /// # Errors
    ///
    /// Returns [`ShareError::Export`] if the target cannot take the file.
    fn share(&self, file: &Path, contents: &str, log: &LogSink) -> Result<(), ShareError>;
}

/// Desktop target: the file already sits on disk, the user attaches it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopShare;

impl ShareSink for DesktopShare {
    fn share(&self, _file: &Path, _contents: &str, log: &LogSink) -> Result<(), ShareError> {
        log.append("DESKTOP MODE: File saved. Manual sharing required.");
        log.append("To share: Navigate to the path above and attach to email.");
        Ok(())
    }
}

impl LogSink {
    /// Exports the durable session file through `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`ShareError::Missing`] if the file was removed,
    /// [`ShareError::NoFile`] for a view-only sink, or whatever the sink
    /// reports.
    pub fn share(&self, sink: &dyn ShareSink) -> Result<PathBuf, ShareError> {
        self.append("User requested to save/share log");

        let Some(path) = self.file_path() else {
            self.append("ERROR: Log file does not exist!");
            return Err(ShareError::NoFile);
        };
        if !path.exists() {
            self.append("ERROR: Log file does not exist!");
            return Err(ShareError::Missing(path));
        }

        let contents = std::fs::read_to_string(&path).map_err(|source| ShareError::Read {
            path: path.clone(),
            source,
        })?;
        self.append(format!("Log saved to: {}", path.display()));
        self.append(format!("File size: {} bytes", contents.len()));

        sink.share(&path, &contents, self)?;
        tracing::info!(path = %path.display(), "Session log shared");
        Ok(path)
    }
}
