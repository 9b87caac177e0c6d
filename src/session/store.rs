//! Durable storage for the single refresh token.
//!
//! The token lives in one plain-text file. Writes go to a sibling temporary
//! file which is then renamed over the target, so a reader never observes a
//! half-written token.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::error::DashboardError;

#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored token. A missing or blank file yields `None`.
    pub async fn load(&self) -> Result<Option<String>, DashboardError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DashboardError::Storage(format!(
                "reading {}: {e}",
                self.path.display()
            ))),
        }
    }

    /// Replace the stored token. The temporary file never outlives a failed save.
    pub async fn save(&self, token: &str) -> Result<(), DashboardError> {
        let tmp = self.temp_path();
        let result = self.replace_with(&tmp, token).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(&tmp).await;
        }
        result
    }

    async fn replace_with(&self, tmp: &Path, token: &str) -> Result<(), DashboardError> {
        let write_err =
            |e: std::io::Error| DashboardError::Storage(format!("writing {}: {e}", tmp.display()));

        // A leftover from an interrupted save may carry looser permissions.
        match tokio::fs::remove_file(tmp).await {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(write_err(e)),
            _ => {}
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(tmp).await.map_err(write_err)?;
        file.write_all(token.as_bytes()).await.map_err(write_err)?;
        file.sync_all().await.map_err(write_err)?;
        drop(file);

        tokio::fs::rename(tmp, &self.path).await.map_err(|e| {
            DashboardError::Storage(format!("replacing {}: {e}", self.path.display()))
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "refresh_token".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
