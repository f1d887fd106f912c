use super::HostBridge;
use super::bus::*;
use crate::config::HotExitConfig;
use crate::env;
use crate::error::HostError;
use crate::session::{
    SCHEMA_VERSION, SessionData, SessionStore, VersionedSession, WindowState, WorkspaceState,
};
use crate::window::WindowRole;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Creates the window that will pull the pending state stored under `window_id`.
pub trait WindowFactory: Send + Sync {
    fn create_window(&self, window_id: &str) -> BoxFuture<'_, Result<(), HostError>>;
}

/// Hands created window ids to whoever spawns windows.
pub struct ChannelWindowFactory {
    sender: mpsc::UnboundedSender<String>,
}

impl ChannelWindowFactory {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl WindowFactory for ChannelWindowFactory {
    fn create_window(&self, window_id: &str) -> BoxFuture<'_, Result<(), HostError>> {
        let result = self
            .sender
            .send(window_id.to_string())
            .map_err(|_| HostError::WindowCreation(format!("{}: window spawner gone", window_id)));
        Box::pin(async move { result })
    }
}

/// Restarts the process once the snapshot is on disk.
pub trait Relauncher: Send + Sync {
    fn relaunch(&self) -> Result<(), HostError>;
}

impl<F> Relauncher for F
where
    F: Fn() -> Result<(), HostError> + Send + Sync,
{
    fn relaunch(&self) -> Result<(), HostError> {
        self()
    }
}

/// One capture round: which windows are expected and what they answered.
#[derive(Debug)]
pub(crate) struct CaptureRound {
    capture_id: String,
    expected: HashSet<String>,
    responses: HashMap<String, WindowState>,
}

impl CaptureRound {
    pub(crate) fn new(capture_id: &str, expected: HashSet<String>) -> Self {
        Self {
            capture_id: capture_id.to_string(),
            expected,
            responses: HashMap::new(),
        }
    }

    /// Record a response. Returns false when it was discarded.
    pub(crate) fn accept(&mut self, mut response: CaptureResponse) -> bool {
        if response.capture_id != self.capture_id {
            warn!(
                "Ignoring stale response (capture id mismatch: {} vs {})",
                response.capture_id, self.capture_id
            );
            return false;
        }

        if !self.expected.contains(&response.window_id) {
            warn!(
                "Ignoring response from unexpected window: {}",
                response.window_id
            );
            return false;
        }

        if self.responses.contains_key(&response.window_id) {
            warn!(
                "Ignoring duplicate response from window: {}",
                response.window_id
            );
            return false;
        }

        if response.state.window_id != response.window_id {
            warn!(
                "Normalizing mismatched window id: {} -> {}",
                response.state.window_id, response.window_id
            );
            response.state.window_id = response.window_id.clone();
        }

        self.responses
            .insert(response.window_id.clone(), response.state);
        true
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.responses.len() >= self.expected.len()
    }

    /// Collected states, primary first and then by window id.
    pub(crate) fn into_windows(self) -> Vec<WindowState> {
        let mut windows: Vec<WindowState> = self.responses.into_values().collect();
        windows.sort_by(|a, b| {
            b.is_primary
                .cmp(&a.is_primary)
                .then_with(|| a.window_id.cmp(&b.window_id))
        });
        windows
    }
}

/// Windows expected to restore and which of them already reported.
#[derive(Debug, Default)]
pub(crate) struct PendingRestoreState {
    window_states: HashMap<String, WindowState>,
    expected: HashSet<String>,
    completed: HashSet<String>,
}

impl PendingRestoreState {
    fn all_complete(&self) -> bool {
        !self.expected.is_empty() && self.expected.iter().all(|id| self.completed.contains(id))
    }

    fn expect(&mut self, state: WindowState) {
        self.expected.insert(state.window_id.clone());
        self.window_states.insert(state.window_id.clone(), state);
    }

    fn forget(&mut self, window_id: &str) {
        self.expected.remove(window_id);
        self.window_states.remove(window_id);
    }

    fn clear(&mut self) {
        self.window_states.clear();
        self.expected.clear();
        self.completed.clear();
    }
}

/// In-process native host.
pub struct LocalHost {
    bus: EventBus,
    store: SessionStore,
    windows: RwLock<BTreeMap<String, WindowRole>>,
    pending: Mutex<PendingRestoreState>,
    workspace: RwLock<Option<WorkspaceState>>,
    window_factory: Option<Arc<dyn WindowFactory>>,
    relauncher: Option<Arc<dyn Relauncher>>,
    capture_timeout: Duration,
    next_window_number: AtomicU32,
}

impl LocalHost {
    pub fn new(store: SessionStore) -> Self {
        Self {
            bus: EventBus::new(),
            store,
            windows: RwLock::new(BTreeMap::new()),
            pending: Mutex::new(PendingRestoreState::default()),
            workspace: RwLock::new(None),
            window_factory: None,
            relauncher: None,
            capture_timeout: HotExitConfig::default().capture_timeout(),
            next_window_number: AtomicU32::new(1),
        }
    }

    pub fn from_config(config: &HotExitConfig) -> Self {
        let store = SessionStore::new(config.resolve_data_dir()).with_backup(config.keep_backup);
        Self::new(store).with_capture_timeout(config.capture_timeout())
    }

    pub fn with_capture_timeout(mut self, timeout: Duration) -> Self {
        self.capture_timeout = timeout;
        self
    }

    pub fn with_window_factory(mut self, factory: Arc<dyn WindowFactory>) -> Self {
        self.window_factory = Some(factory);
        self
    }

    pub fn with_relauncher(mut self, relauncher: Arc<dyn Relauncher>) -> Self {
        self.relauncher = Some(relauncher);
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub async fn register_window(&self, window_id: &str, role: WindowRole) {
        debug!("Registering {:?} window {}", role, window_id);
        self.windows.write().await.insert(window_id.to_string(), role);
    }

    pub async fn unregister_window(&self, window_id: &str) {
        self.windows.write().await.remove(window_id);
    }

    pub async fn window_ids(&self) -> Vec<String> {
        self.windows.read().await.keys().cloned().collect()
    }

    pub async fn primary_window_id(&self) -> Option<String> {
        self.windows
            .read()
            .await
            .iter()
            .find(|(_, role)| **role == WindowRole::Primary)
            .map(|(id, _)| id.clone())
    }

    pub async fn set_workspace(&self, workspace: Option<WorkspaceState>) {
        *self.workspace.write().await = workspace;
    }

    pub async fn workspace(&self) -> Option<WorkspaceState> {
        self.workspace.read().await.clone()
    }

    /// Number of windows still expected to report restore completion.
    pub async fn pending_restore_count(&self) -> usize {
        let pending = self.pending.lock().await;
        pending.expected.difference(&pending.completed).count()
    }

    async fn allocate_window_id(&self) -> String {
        let windows = self.windows.read().await;
        loop {
            let number = self.next_window_number.fetch_add(1, Ordering::Relaxed);
            let candidate = format!("{}{}", env::window::DOCUMENT_WINDOW_PREFIX, number);
            if !windows.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    async fn create_secondary_window(&self, window_id: &str) -> Result<(), HostError> {
        let factory = self
            .window_factory
            .as_ref()
            .ok_or_else(|| HostError::WindowCreation("no window factory configured".to_string()))?;
        factory.create_window(window_id).await?;
        self.register_window(window_id, WindowRole::Secondary).await;
        Ok(())
    }

    async fn restore_workspace(&self, session: &SessionData) {
        if session.workspace.is_some() {
            self.set_workspace(session.workspace.clone()).await;
        }
    }
}

#[async_trait]
impl HostBridge for LocalHost {
    fn events(&self) -> &EventBus {
        &self.bus
    }

    async fn capture(&self, capture_id: &str) -> Result<SessionData, HostError> {
        let expected: HashSet<String> = self
            .windows
            .read()
            .await
            .keys()
            .filter(|id| env::is_document_window(id))
            .cloned()
            .collect();

        if expected.is_empty() {
            return Err(HostError::NoWindows);
        }

        info!(
            "Capturing session {} from {} windows",
            capture_id,
            expected.len()
        );

        let mut round = CaptureRound::new(capture_id, expected);

        // Listen before broadcasting so no response can be missed
        let mut subscription = self.bus.listen(&[EventKind::CaptureResponse]).await;
        self.bus.emit(HotExitEvent::CaptureRequest(CaptureRequest {
            capture_id: capture_id.to_string(),
        }));

        let deadline = Instant::now() + self.capture_timeout;
        let mut timed_out = false;
        while !round.is_complete() {
            match tokio::time::timeout_at(deadline, subscription.recv()).await {
                Ok(Some(HotExitEvent::CaptureResponse(response))) => {
                    round.accept(response);
                }
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(_) => {
                    timed_out = true;
                    break;
                }
            }
        }
        drop(subscription);

        if timed_out {
            error!(
                "Capture timeout: got {}/{} window responses",
                round.responses.len(),
                round.expected.len()
            );
            self.bus.emit(HotExitEvent::CaptureTimeout {
                capture_id: capture_id.to_string(),
            });

            if round.responses.is_empty() {
                return Err(HostError::CaptureTimeout(self.capture_timeout));
            }
        }

        Ok(SessionData {
            version: SCHEMA_VERSION,
            timestamp: chrono::Utc::now().timestamp(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            windows: round.into_windows(),
            workspace: self.workspace().await,
        })
    }

    async fn persist_session(&self, session: &SessionData) -> Result<(), HostError> {
        self.store.write_session_atomic(session).await?;
        Ok(())
    }

    async fn inspect_session(&self) -> Result<Option<VersionedSession>, HostError> {
        Ok(self.store.read_session().await?)
    }

    async fn clear_session(&self) -> Result<(), HostError> {
        self.pending.lock().await.clear();
        self.store.delete_session().await?;
        Ok(())
    }

    async fn restore(&self, session: SessionData) -> Result<(), HostError> {
        let target = self
            .primary_window_id()
            .await
            .ok_or(HostError::NoPrimaryWindow)?;

        let main_state = session
            .primary_window()
            .cloned()
            .ok_or(HostError::EmptySession)?;

        let state = WindowState {
            window_id: target.clone(),
            is_primary: true,
            ..main_state
        };

        {
            let mut pending = self.pending.lock().await;
            pending.clear();
            pending.expect(state.clone());
        }

        self.restore_workspace(&session).await;

        info!("Restoring session to window {}", target);
        self.bus.emit(HotExitEvent::RestoreStart(SessionData {
            windows: vec![state],
            ..session
        }));
        Ok(())
    }

    async fn restore_multi_window(&self, session: SessionData) -> Result<Vec<String>, HostError> {
        let primary_id = self
            .primary_window_id()
            .await
            .ok_or(HostError::NoPrimaryWindow)?;

        let main_index = session
            .windows
            .iter()
            .position(|w| w.is_primary)
            .or(if session.windows.is_empty() { None } else { Some(0) });

        let mut normalized = Vec::with_capacity(session.windows.len());
        {
            let mut pending = self.pending.lock().await;
            pending.clear();
            // The primary always reports, even with nothing to restore
            pending.expected.insert(primary_id.clone());

            match main_index.and_then(|index| session.windows.get(index)) {
                Some(main_state) => {
                    let state = WindowState {
                        window_id: primary_id.clone(),
                        is_primary: true,
                        ..main_state.clone()
                    };
                    pending.expect(state.clone());
                    normalized.push(state);
                }
                None => warn!("No primary window state in session, primary will restore empty"),
            }
        }

        let mut windows_created = Vec::new();
        let mut failures = Vec::new();

        for (index, window_state) in session.windows.iter().enumerate() {
            if Some(index) == main_index {
                continue;
            }

            let new_id = self.allocate_window_id().await;
            let state = WindowState {
                window_id: new_id.clone(),
                is_primary: false,
                ..window_state.clone()
            };

            // Registered before the window exists so it can neither poll nor
            // complete ahead of its entry
            self.pending.lock().await.expect(state.clone());

            match self.create_secondary_window(&new_id).await {
                Ok(()) => {
                    debug!("Created window {} for {}", new_id, window_state.window_id);
                    normalized.push(state);
                    windows_created.push(new_id);
                }
                Err(e) => {
                    error!(
                        "Failed to create window for {}: {}",
                        window_state.window_id, e
                    );
                    self.pending.lock().await.forget(&new_id);
                    failures.push(format!("{}: {}", window_state.window_id, e));
                }
            }
        }

        self.restore_workspace(&session).await;

        info!(
            "Restoring session to {} windows ({} created)",
            normalized.len(),
            windows_created.len()
        );
        self.bus.emit(HotExitEvent::RestoreStart(SessionData {
            windows: normalized,
            ..session
        }));

        if !failures.is_empty() {
            self.bus.emit(HotExitEvent::RestoreFailed {
                error: format!("Window creation failed: {}", failures.join("; ")),
            });
        }

        Ok(windows_created)
    }

    async fn get_pending_window_state(&self, window_id: &str) -> Option<WindowState> {
        self.pending
            .lock()
            .await
            .window_states
            .get(window_id)
            .cloned()
    }

    async fn window_restore_complete(&self, window_id: &str) -> bool {
        let all_complete = {
            let mut pending = self.pending.lock().await;
            if pending.expected.contains(window_id) {
                pending.completed.insert(window_id.to_string());
            } else {
                warn!("Ignoring completion from unexpected window: {}", window_id);
                return false;
            }

            let all_complete = pending.all_complete();
            if all_complete {
                pending.clear();
            }
            all_complete
        };

        debug!(
            "Window {} restored (all complete: {})",
            window_id, all_complete
        );

        if all_complete {
            info!("All windows restored");
            self.bus.emit(HotExitEvent::RestoreComplete);
        }
        all_complete
    }

    async fn window_restore_failed(&self, window_id: &str, error: &str) {
        error!("Window {} failed to restore: {}", window_id, error);
        self.pending.lock().await.clear();
        self.bus.emit(HotExitEvent::RestoreFailed {
            error: format!("{}: {}", window_id, error),
        });
    }

    async fn relaunch(&self) -> Result<(), HostError> {
        match &self.relauncher {
            Some(relauncher) => {
                info!("Relaunching application");
                relauncher.relaunch()
            }
            None => Err(HostError::Relaunch("no relauncher configured".to_string())),
        }
    }
}
