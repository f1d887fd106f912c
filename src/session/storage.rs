use crate::env;
use crate::session::types::SessionData;
use crate::session::versions::VersionedSession;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Atomic on-disk storage for the single hot exit snapshot
#[derive(Debug, Clone)]
pub struct SessionStore {
    data_dir: PathBuf,
    keep_backup: bool,
}

/// Result of a persistence operation
#[derive(Debug)]
pub struct PersistenceResult {
    pub bytes_written: u64,
    pub duration_ms: u64,
    pub backed_up: bool,
}

impl SessionStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            keep_backup: true,
        }
    }

    pub fn with_backup(mut self, keep_backup: bool) -> Self {
        self.keep_backup = keep_backup;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn session_path(&self) -> PathBuf {
        env::session_file_path(&self.data_dir)
    }

    pub fn backup_path(&self) -> PathBuf {
        env::backup_session_file_path(&self.data_dir)
    }

    pub async fn exists(&self) -> bool {
        async_fs::try_exists(self.session_path())
            .await
            .unwrap_or(false)
    }

    /// Write the snapshot with the tmp + rename pattern.
    ///
    /// A reader never observes a partial file: either the previous snapshot
    /// or the complete new one is in place.
    pub async fn write_session_atomic(&self, session: &SessionData) -> Result<PersistenceResult> {
        let start_time = std::time::Instant::now();

        async_fs::create_dir_all(&self.data_dir)
            .await
            .with_context(|| {
                format!("Failed to create data directory: {}", self.data_dir.display())
            })?;

        let serialized =
            serde_json::to_vec_pretty(session).context("Failed to serialize session")?;

        // Same directory as the target so the rename stays on one filesystem
        let temp_path =
            env::temp_session_file_path(&self.data_dir, &uuid::Uuid::new_v4().simple().to_string());

        if let Err(e) = self.write_temp_file(&temp_path, &serialized).await {
            let _ = async_fs::remove_file(&temp_path).await;
            return Err(e);
        }

        let session_path = self.session_path();
        let mut backed_up = false;
        if self.keep_backup && async_fs::try_exists(&session_path).await.unwrap_or(false) {
            match async_fs::copy(&session_path, self.backup_path()).await {
                Ok(_) => backed_up = true,
                Err(e) => warn!("Failed to back up previous session: {}", e),
            }
        }

        if let Err(e) = async_fs::rename(&temp_path, &session_path).await {
            let _ = async_fs::remove_file(&temp_path).await;
            return Err(e).context("Failed to persist session file");
        }

        let result = PersistenceResult {
            bytes_written: serialized.len() as u64,
            duration_ms: start_time.elapsed().as_millis() as u64,
            backed_up,
        };

        info!(
            "Session saved: {} windows, {} bytes in {}ms",
            session.windows.len(),
            result.bytes_written,
            result.duration_ms
        );
        Ok(result)
    }

    async fn write_temp_file(&self, path: &Path, data: &[u8]) -> Result<()> {
        let mut file = async_fs::File::create(path)
            .await
            .context("Failed to create temp session file")?;

        file.write_all(data)
            .await
            .context("Failed to write temp session file")?;

        file.flush()
            .await
            .context("Failed to flush temp session file")?;

        file.sync_all()
            .await
            .context("Failed to sync temp session file")?;

        Ok(())
    }

    /// Read the snapshot without side effects. `None` when absent.
    pub async fn read_session(&self) -> Result<Option<VersionedSession>> {
        let session_path = self.session_path();

        let content = match async_fs::read(&session_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No session file at {}", session_path.display());
                return Ok(None);
            }
            Err(e) => return Err(e).context("Failed to read session file"),
        };

        let session =
            VersionedSession::from_slice(&content).context("Failed to parse session JSON")?;

        debug!(
            "Read session v{} ({} shape) from {}",
            session.version(),
            session.shape_name(),
            session_path.display()
        );
        Ok(Some(session))
    }

    /// Delete the snapshot. Absent file is not an error.
    pub async fn delete_session(&self) -> Result<()> {
        match async_fs::remove_file(self.session_path()).await {
            Ok(()) => {
                info!("Session file deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to delete session"),
        }
    }
}
