use super::coordination::CoordinationFlag;
use super::handshake::{HandshakeOutcome, RestoreHandshake};
use crate::config::HotExitConfig;
use crate::error::{HotExitError, HotExitResult};
use crate::host::HostBridge;
use crate::session::{Migrator, SessionData, VersionedSession, is_older_than};
use crate::window::WindowRole;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Drives capture before a restart and the restore handshake after it.
pub struct SessionController {
    window_id: String,
    role: WindowRole,
    host: Arc<dyn HostBridge>,
    coordination: Arc<CoordinationFlag>,
    migrator: Migrator,
    config: HotExitConfig,
    restore_in_progress: AtomicBool,
}

/// What happened to a snapshot that was not dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Discard,
    Preserve,
}

struct InProgressGuard<'a>(&'a AtomicBool);

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct CoordinationGuard<'a>(&'a CoordinationFlag);

impl Drop for CoordinationGuard<'_> {
    fn drop(&mut self) {
        self.0.notify_complete();
    }
}

impl SessionController {
    pub fn new(window_id: impl Into<String>, role: WindowRole, host: Arc<dyn HostBridge>) -> Self {
        Self {
            window_id: window_id.into(),
            role,
            host,
            coordination: CoordinationFlag::global(),
            migrator: Migrator::current(),
            config: HotExitConfig::default(),
            restore_in_progress: AtomicBool::new(false),
        }
    }

    pub fn with_config(mut self, config: HotExitConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_coordination(mut self, coordination: Arc<CoordinationFlag>) -> Self {
        self.coordination = coordination;
        self
    }

    pub fn with_migrator(mut self, migrator: Migrator) -> Self {
        self.migrator = migrator;
        self
    }

    pub fn window_id(&self) -> &str {
        &self.window_id
    }

    pub fn is_primary(&self) -> bool {
        self.role == WindowRole::Primary
    }

    /// Capture every window, persist the snapshot and relaunch.
    ///
    /// Capture and persistence failures are logged and swallowed; the user
    /// already asked for the restart. Only a relaunch failure is returned.
    pub async fn capture_and_restart(&self) -> HotExitResult<()> {
        let capture_id = Uuid::new_v4().to_string();
        info!("Capturing session before restart (capture {})", capture_id);

        match self.host.capture(&capture_id).await {
            Ok(session) => {
                info!(
                    "Captured {} windows with {} tabs ({} dirty)",
                    session.windows.len(),
                    session.tab_count(),
                    session.dirty_tab_count()
                );
                if let Err(e) = self.host.persist_session(&session).await {
                    warn!("Failed to persist session, restarting without it: {}", e);
                }
            }
            Err(e) => warn!("Session capture failed, restarting without it: {}", e),
        }

        self.host.relaunch().await?;
        Ok(())
    }

    /// Restore the persisted snapshot, if any. Returns true only when every
    /// window confirmed its restore.
    ///
    /// `timeout_ms` bounds the whole confirmation handshake. Non-finite or
    /// non-positive values fall back to the configured default.
    pub async fn check_and_restore_session(&self, timeout_ms: Option<f64>) -> HotExitResult<bool> {
        if !self.is_primary() {
            debug!(
                "Window {} is not primary, skipping restore check",
                self.window_id
            );
            return Ok(false);
        }

        if self
            .restore_in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Restore already in progress, ignoring second request");
            return Ok(false);
        }
        let _in_progress = InProgressGuard(&self.restore_in_progress);

        self.coordination.set_in_progress(true);
        let _coordination = CoordinationGuard(self.coordination.as_ref());

        let timeout = sanitize_timeout(timeout_ms, self.config.restore_timeout());

        let snapshot = match self.host.inspect_session().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                debug!("No session to restore");
                return Ok(false);
            }
            Err(e) => {
                error!("Failed to read session, leaving it in place: {}", e);
                return Ok(false);
            }
        };

        let session = match self.prepare(snapshot) {
            Ok(session) => session,
            Err(Disposition::Discard) => {
                self.discard_snapshot().await;
                return Ok(false);
            }
            Err(Disposition::Preserve) => return Ok(false),
        };

        let multi_window = session.has_secondary_windows();
        info!(
            "Restoring session: {} windows, {} tabs",
            session.windows.len(),
            session.tab_count()
        );

        let handshake = RestoreHandshake::arm(self.host.events()).await;
        let settled = handshake
            .run(timeout, async {
                if multi_window {
                    self.host
                        .restore_multi_window(session)
                        .await
                        .map(|created| created.len())
                } else {
                    self.host.restore(session).await.map(|()| 0)
                }
            })
            .await
            .map_err(|e| {
                error!("Restore dispatch failed, session preserved: {}", e);
                HotExitError::Dispatch(e)
            })?;

        debug!("Restore dispatched, {} windows created", settled.dispatched);

        match settled.outcome {
            HandshakeOutcome::Completed => {
                info!("Session restored");
                if let Err(e) = self.host.clear_session().await {
                    error!("Failed to delete restored session: {}", e);
                }
                Ok(true)
            }
            HandshakeOutcome::Failed(message) => {
                error!("Restore failed, session preserved: {}", message);
                Ok(false)
            }
            HandshakeOutcome::TimedOut => {
                warn!(
                    "Restore not confirmed within {:?}, session preserved",
                    timeout
                );
                Ok(false)
            }
        }
    }

    /// Range check, staleness check and migration. On error, says whether the
    /// snapshot can ever be restored.
    fn prepare(&self, snapshot: VersionedSession) -> Result<SessionData, Disposition> {
        let version = snapshot.version();
        if !self.migrator.can_migrate(version) {
            warn!(
                "Session version {} is not supported (current {}), discarding",
                version,
                self.migrator.target_version()
            );
            return Err(Disposition::Discard);
        }

        let max_age_days = self.config.max_session_age_days;
        if max_age_days > 0
            && let Some(timestamp) = snapshot.timestamp()
            && is_older_than(timestamp, chrono::Utc::now().timestamp(), max_age_days)
        {
            warn!("Session is older than {} days, discarding", max_age_days);
            return Err(Disposition::Discard);
        }

        if self.migrator.needs_migration(version) {
            debug!("Session at v{} needs migration", version);
        }

        self.migrator
            .migrate(snapshot)
            .and_then(VersionedSession::into_current)
            .map_err(|e| {
                error!("Session migration failed, session preserved: {}", e);
                Disposition::Preserve
            })
    }

    async fn discard_snapshot(&self) {
        if let Err(e) = self.host.clear_session().await {
            error!("Failed to delete unrecoverable session: {}", e);
        }
    }
}

/// Requested timeout, or `default` when it is missing, non-finite or not positive.
pub fn sanitize_timeout(timeout_ms: Option<f64>, default: Duration) -> Duration {
    match timeout_ms {
        Some(ms) if ms.is_finite() && ms > 0.0 => {
            Duration::try_from_secs_f64(ms / 1000.0).unwrap_or(default)
        }
        _ => default,
    }
}
