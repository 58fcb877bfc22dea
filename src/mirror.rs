//! On-disk copy of the last successfully captured reading.
//!
//! Used only to answer reads after a cold start, before the first poll of the
//! current process has succeeded. The file is overwritten wholesale on every
//! publish; there is no history.

use std::{
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::snapshot::models::Reading;

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("mirror file {} does not exist", .0.display())]
    Missing(PathBuf),
    #[error("mirror file {} could not be accessed: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("mirror file {} is malformed: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Mirror {
    path: PathBuf,
}

impl Mirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the mirrored reading back from disk.
    pub async fn load(&self) -> Result<Reading, MirrorError> {
        let bytes = match fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(MirrorError::Missing(self.path.clone()))
            }
            Err(source) => {
                return Err(MirrorError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes).map_err(|source| MirrorError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    /// Replace the mirror file with `reading`.
    ///
    /// Writes to a sibling temp file first and renames it into place, so a
    /// concurrent `load` sees either the old file or the new one.
    pub async fn store(&self, reading: &Reading) -> Result<(), MirrorError> {
        let io_err = |source: io::Error| MirrorError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await.map_err(io_err)?;
        }

        let content = serde_json::to_vec_pretty(reading).map_err(|source| {
            MirrorError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp = self.temp_path();
        if let Err(e) = fs::write(&tmp, &content).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(io_err(e));
        }
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(io_err(e));
        }

        debug!(path = %self.path.display(), bytes = content.len(), "mirror: saved");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mirror".to_owned());
        self.path
            .with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4().simple()))
    }
}
