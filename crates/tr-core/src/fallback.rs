//! Append-only local fallback files.
//!
//! Used by the relay when the sink is unreachable and by the persister when
//! the store rejects a row. One serialized event per line. Files are never
//! truncated or rotated here.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Mode for newly created fallback files.
pub const FALLBACK_FILE_MODE: u32 = 0o644;

/// Errors writing or reading a fallback file.
#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("refusing to write multi-line record to {path}")]
    MultiLine { path: PathBuf },
}

impl From<FallbackError> for tr_common::Error {
    fn from(err: FallbackError) -> Self {
        match err {
            FallbackError::Io { source, .. } => tr_common::Error::Io(source),
            other @ FallbackError::MultiLine { .. } => tr_common::Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                other.to_string(),
            )),
        }
    }
}

/// An append-only line log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackLog {
    path: PathBuf,
}

impl FallbackLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FallbackLog { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and flush it to disk.
    ///
    /// Creates the parent directory and the file if missing.
    pub fn append(&self, line: &str) -> Result<(), FallbackError> {
        if line.contains('\n') {
            return Err(FallbackError::MultiLine {
                path: self.path.clone(),
            });
        }
        let io_err = |source| FallbackError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(FALLBACK_FILE_MODE);
        }
        let mut file = options.open(&self.path).map_err(io_err)?;

        let mut record = String::with_capacity(line.len() + 1);
        record.push_str(line);
        record.push('\n');
        file.write_all(record.as_bytes()).map_err(io_err)?;
        file.sync_data().map_err(io_err)?;
        Ok(())
    }

    /// Read all non-blank lines currently in the file.
    pub fn read_lines(&self) -> Result<Vec<String>, FallbackError> {
        let io_err = |source| FallbackError::Io {
            path: self.path.clone(),
            source,
        };
        let file = std::fs::File::open(&self.path).map_err(io_err)?;
        let mut lines = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(io_err)?;
            if !line.trim().is_empty() {
                lines.push(line);
            }
        }
        Ok(lines)
    }
}
