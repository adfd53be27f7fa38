//! Scratch-directory staging for fetched files.
//!
//! Bytes pulled from external URLs are written to a local directory and
//! expire after a fixed time-to-live. A background sweeper deletes expired
//! files; readers treat a vanished file as a cache miss.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::fs;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("staging I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("staged file {0} has expired")]
    Expired(PathBuf),
}

/// A file written to the scratch directory.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub path: PathBuf,
    pub expires_at: DateTime<Utc>,
}

impl StagedFile {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

#[derive(Debug)]
pub struct FileStager {
    dir: PathBuf,
    ttl: Duration,
}

impl FileStager {
    /// Create the stager, making sure the directory exists.
    pub async fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Result<Self, StagingError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|source| StagingError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir, ttl })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Write `bytes` to a fresh `<uuid>.<extension>` file.
    pub async fn stage(&self, bytes: &[u8], extension: &str) -> Result<StagedFile, StagingError> {
        let extension = extension.trim_start_matches('.');
        let name = if extension.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            format!("{}.{}", Uuid::new_v4(), extension)
        };
        let path = self.dir.join(name);

        fs::write(&path, bytes).await.map_err(|source| StagingError::Io {
            path: path.clone(),
            source,
        })?;

        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
        log::debug!("Staged {} bytes at {}", bytes.len(), path.display());

        Ok(StagedFile {
            path,
            expires_at: Utc::now() + ttl,
        })
    }

    /// Read a staged file back, refusing expired entries.
    pub async fn read(&self, staged: &StagedFile) -> Result<Vec<u8>, StagingError> {
        if staged.is_expired() {
            return Err(StagingError::Expired(staged.path.clone()));
        }
        fs::read(&staged.path).await.map_err(|source| StagingError::Io {
            path: staged.path.clone(),
            source,
        })
    }

    /// Delete every file older than the time-to-live. Returns how many were
    /// removed.
    pub async fn sweep(&self) -> Result<usize, StagingError> {
        let io_err = |source: std::io::Error| StagingError::Io {
            path: self.dir.clone(),
            source,
        };

        let mut entries = fs::read_dir(&self.dir).await.map_err(io_err)?;
        let now = SystemTime::now();
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();

            if age >= self.ttl {
                match fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) => log::warn!(
                        "Failed to remove expired staged file {}: {}",
                        entry.path().display(),
                        e
                    ),
                }
            }
        }

        Ok(removed)
    }
}

/// Spawn the periodic sweep.
pub fn spawn_sweeper(stager: Arc<FileStager>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        log::info!(
            "Staging sweeper started for {} (every {:?}, ttl {:?})",
            stager.dir().display(),
            every,
            stager.ttl()
        );
        let mut interval = tokio::time::interval(every.max(Duration::from_secs(1)));
        // the first tick fires immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            match stager.sweep().await {
                Ok(0) => log::debug!("Staging sweep: nothing expired"),
                Ok(n) => log::info!("Staging sweep removed {} expired file(s)", n),
                Err(e) => log::error!("Staging sweep failed: {}", e),
            }
        }
    })
}
