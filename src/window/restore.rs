use super::WindowRole;
use super::editor::{EditorState, EditorWindow};
use crate::config::HotExitConfig;
use crate::error::{HotExitError, HotExitResult};
use crate::host::{EventKind, HostBridge, HotExitEvent, Subscription};
use crate::session::{SessionData, UiState, WindowState};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Outcome of applying one `WindowState`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    /// Snapshot tab id to newly assigned tab id
    pub tab_id_map: HashMap<String, String>,
    pub active_tab_id: Option<String>,
    pub tabs_restored: usize,
}

/// Replace the window's live state with `state`.
///
/// UI toggles are applied only where they differ. Existing tabs are torn down
/// completely, then recreated in snapshot order with fresh ids. Dirty documents
/// get their live content on top of the saved baseline and history checkpoints
/// are installed as data.
pub async fn apply_window_state(
    window: &EditorWindow,
    state: &WindowState,
) -> HotExitResult<ApplyReport> {
    if state.window_id != window.window_id() {
        return Err(HotExitError::Apply {
            window_id: window.window_id().to_string(),
            message: format!("state belongs to window {}", state.window_id),
        });
    }

    let _guard = window.begin_restore()?;
    let mut editor = window.write().await;

    apply_ui_state(&mut editor, &state.ui_state);

    let existing: Vec<String> = editor.tabs.tabs().iter().map(|tab| tab.id.clone()).collect();
    for tab_id in &existing {
        editor.documents.remove(tab_id);
        editor.history.remove(tab_id);
    }
    editor.tabs.remove_all();

    let mut report = ApplyReport::default();
    let mut first_tab = None;

    for tab in &state.tabs {
        let new_id = editor.tabs.create_tab(tab.file_path.clone(), tab.title.clone());
        editor.tabs.set_pinned(&new_id, tab.is_pinned);
        report.tab_id_map.insert(tab.id.clone(), new_id.clone());
        first_tab.get_or_insert_with(|| new_id.clone());

        let doc_state = &tab.document;
        editor
            .documents
            .init_document(&new_id, doc_state.saved_content.clone());
        if doc_state.is_dirty {
            editor
                .documents
                .set_content(&new_id, doc_state.content.clone());
        }
        if let Some(doc) = editor.documents.get_mut(&new_id) {
            doc.is_missing = doc_state.is_missing;
            doc.is_divergent = doc_state.is_divergent;
            doc.line_ending = doc_state.line_ending;
            doc.cursor_info = doc_state.cursor_info.clone();
            doc.last_modified_timestamp = doc_state.last_modified_timestamp;
            doc.is_untitled = doc_state.is_untitled;
            doc.untitled_number = doc_state.untitled_number;
        }

        editor.history.install(
            &new_id,
            doc_state.undo_history.clone(),
            doc_state.redo_history.clone(),
        );
        report.tabs_restored += 1;
    }

    let active = state
        .active_tab_id
        .as_ref()
        .and_then(|old_id| report.tab_id_map.get(old_id))
        .cloned();
    if active.is_none() && state.active_tab_id.is_some() {
        debug!(
            "Active tab {:?} not restored in window {}, falling back to first tab",
            state.active_tab_id,
            window.window_id()
        );
    }
    report.active_tab_id = active.or(first_tab);
    editor.tabs.set_active(report.active_tab_id.clone());

    if state.geometry.is_some() {
        editor.geometry = state.geometry;
    }

    info!(
        "Window {} restored {} tabs",
        window.window_id(),
        report.tabs_restored
    );
    Ok(report)
}

fn apply_ui_state(editor: &mut EditorState, target: &UiState) {
    let ui = &mut editor.ui;
    if ui.state().sidebar_visible != target.sidebar_visible {
        ui.toggle_sidebar();
    }
    if ui.state().outline_visible != target.outline_visible {
        ui.toggle_outline();
    }
    if ui.state().status_bar_visible != target.status_bar_visible {
        ui.toggle_status_bar();
    }
    if ui.state().source_mode_enabled != target.source_mode_enabled {
        ui.toggle_source_mode();
    }
    if ui.state().focus_mode_enabled != target.focus_mode_enabled {
        ui.toggle_focus_mode();
    }
    if ui.state().typewriter_mode_enabled != target.typewriter_mode_enabled {
        ui.toggle_typewriter_mode();
    }
    if ui.state().sidebar_width != target.sidebar_width {
        ui.set_sidebar_width(target.sidebar_width);
    }
    if ui.state().sidebar_view_mode != target.sidebar_view_mode {
        ui.set_sidebar_view_mode(target.sidebar_view_mode.clone());
    }
}

/// Waits for this window's restore state, applies it and reports back to the host.
#[async_trait]
pub trait RestoreApplier: Send + Sync {
    fn window_id(&self) -> &str;

    /// Returns true when state was found and applied.
    async fn restore(&self) -> HotExitResult<bool>;
}

/// Apply `state` and send the per-window completion or failure to the host.
async fn apply_and_report(
    window: &EditorWindow,
    host: &dyn HostBridge,
    state: &WindowState,
) -> HotExitResult<ApplyReport> {
    match apply_window_state(window, state).await {
        Ok(report) => {
            host.window_restore_complete(window.window_id()).await;
            Ok(report)
        }
        Err(HotExitError::RestoreInProgress(id)) => {
            warn!("Restore already running in window {}, ignoring", id);
            Err(HotExitError::RestoreInProgress(id))
        }
        Err(e) => {
            error!("Window {} failed to apply state: {}", window.window_id(), e);
            host.window_restore_failed(window.window_id(), &e.to_string())
                .await;
            Err(e)
        }
    }
}

/// Push path: the primary window receives the whole snapshot on restore-start.
pub struct PrimaryRestore {
    window: Arc<EditorWindow>,
    host: Arc<dyn HostBridge>,
    subscription: Mutex<Subscription>,
    wait_timeout: Duration,
}

impl PrimaryRestore {
    /// Subscribe to restore-start. Must happen before the restore is dispatched.
    pub async fn attach(
        window: Arc<EditorWindow>,
        host: Arc<dyn HostBridge>,
        wait_timeout: Duration,
    ) -> Self {
        let subscription = host.events().listen(&[EventKind::RestoreStart]).await;
        Self {
            window,
            host,
            subscription: Mutex::new(subscription),
            wait_timeout,
        }
    }

    /// Apply this window's entry of a delivered snapshot.
    pub async fn apply_session(&self, session: &SessionData) -> HotExitResult<bool> {
        match session.window(self.window.window_id()) {
            Some(state) => {
                apply_and_report(&self.window, self.host.as_ref(), state).await?;
                Ok(true)
            }
            None => {
                warn!(
                    "No state for primary window {} in snapshot, reporting completion",
                    self.window.window_id()
                );
                self.host
                    .window_restore_complete(self.window.window_id())
                    .await;
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl RestoreApplier for PrimaryRestore {
    fn window_id(&self) -> &str {
        self.window.window_id()
    }

    async fn restore(&self) -> HotExitResult<bool> {
        let mut subscription = self.subscription.lock().await;
        let session = match tokio::time::timeout(self.wait_timeout, async {
            loop {
                match subscription.recv().await {
                    Some(HotExitEvent::RestoreStart(session)) => return Some(session),
                    Some(_) => continue,
                    None => return None,
                }
            }
        })
        .await
        {
            Ok(Some(session)) => session,
            Ok(None) => return Err(HotExitError::BusClosed),
            Err(_) => {
                debug!(
                    "No restore dispatched to window {} within {:?}",
                    self.window.window_id(),
                    self.wait_timeout
                );
                return Ok(false);
            }
        };
        drop(subscription);

        self.apply_session(&session).await
    }
}

/// Pull path: a secondary window asks the host for its pending state on startup.
pub struct SecondaryRestore {
    window: Arc<EditorWindow>,
    host: Arc<dyn HostBridge>,
    attempts: u32,
    interval: Duration,
}

impl SecondaryRestore {
    pub fn new(window: Arc<EditorWindow>, host: Arc<dyn HostBridge>) -> Self {
        let config = HotExitConfig::default();
        Self {
            window,
            host,
            attempts: config.secondary_poll_attempts,
            interval: config.secondary_poll_interval(),
        }
    }

    pub fn with_polling(mut self, attempts: u32, interval: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.interval = interval;
        self
    }
}

#[async_trait]
impl RestoreApplier for SecondaryRestore {
    fn window_id(&self) -> &str {
        self.window.window_id()
    }

    async fn restore(&self) -> HotExitResult<bool> {
        for attempt in 1..=self.attempts {
            if let Some(state) = self
                .host
                .get_pending_window_state(self.window.window_id())
                .await
            {
                debug!(
                    "Window {} found pending state on attempt {}",
                    self.window.window_id(),
                    attempt
                );
                apply_and_report(&self.window, self.host.as_ref(), &state).await?;
                return Ok(true);
            }

            if attempt < self.attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        debug!("No pending state for window {}", self.window.window_id());
        Ok(false)
    }
}

/// Pick the delivery path from the window's role.
pub async fn restore_applier_for(
    window: Arc<EditorWindow>,
    host: Arc<dyn HostBridge>,
    config: &HotExitConfig,
) -> Box<dyn RestoreApplier> {
    match window.role() {
        WindowRole::Primary => {
            Box::new(PrimaryRestore::attach(window, host, config.restore_timeout()).await)
        }
        WindowRole::Secondary => Box::new(
            SecondaryRestore::new(window, host).with_polling(
                config.secondary_poll_attempts,
                config.secondary_poll_interval(),
            ),
        ),
    }
}
