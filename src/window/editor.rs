use super::WindowRole;
use crate::error::HotExitError;
use crate::session::{CursorInfo, HistoryCheckpoint, LineEnding, UiState, WindowGeometry};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Open tab metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Tab {
    pub id: String,
    pub file_path: Option<String>,
    pub title: String,
    pub is_pinned: bool,
}

/// Ordered tab list of a window
#[derive(Debug, Default)]
pub struct TabStore {
    tabs: Vec<Tab>,
    active_tab_id: Option<String>,
}

/// Live document behind a tab
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub content: String,
    /// Baseline last written to or read from disk
    pub saved_content: String,
    pub is_dirty: bool,
    pub is_missing: bool,
    pub is_divergent: bool,
    pub line_ending: LineEnding,
    pub cursor_info: Option<CursorInfo>,
    pub last_modified_timestamp: Option<i64>,
    pub is_untitled: bool,
    pub untitled_number: Option<u32>,
}

#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: HashMap<String, Document>,
}

/// Undo and redo checkpoints per tab
#[derive(Debug, Default)]
pub struct HistoryStore {
    entries: HashMap<String, TabHistory>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabHistory {
    pub undo: Vec<HistoryCheckpoint>,
    pub redo: Vec<HistoryCheckpoint>,
}

/// View toggles of a window
#[derive(Debug, Default)]
pub struct UiStore {
    state: UiState,
    changes: u32,
}

/// Everything a window shows
#[derive(Debug, Default)]
pub struct EditorState {
    pub tabs: TabStore,
    pub documents: DocumentStore,
    pub history: HistoryStore,
    pub ui: UiStore,
    pub geometry: Option<WindowGeometry>,
}

/// One editor window and its live state.
#[derive(Debug)]
pub struct EditorWindow {
    window_id: String,
    role: WindowRole,
    state: RwLock<EditorState>,
    restoring: AtomicBool,
}

/// Held for the duration of one restore in a window.
pub struct RestoreGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

static NEXT_TAB_NUMBER: AtomicU64 = AtomicU64::new(1);

fn next_tab_id() -> String {
    format!("tab-{}", NEXT_TAB_NUMBER.fetch_add(1, Ordering::Relaxed))
}

impl TabStore {
    /// Open a tab and make it active. Returns its new identifier.
    pub fn create_tab(&mut self, file_path: Option<String>, title: impl Into<String>) -> String {
        let id = next_tab_id();
        self.tabs.push(Tab {
            id: id.clone(),
            file_path,
            title: title.into(),
            is_pinned: false,
        });
        self.active_tab_id = Some(id.clone());
        id
    }

    pub fn set_title(&mut self, tab_id: &str, title: impl Into<String>) {
        if let Some(tab) = self.get_mut(tab_id) {
            tab.title = title.into();
        }
    }

    pub fn set_pinned(&mut self, tab_id: &str, pinned: bool) {
        if let Some(tab) = self.get_mut(tab_id) {
            tab.is_pinned = pinned;
        }
    }

    /// Remove every tab, returning the removed identifiers in order.
    pub fn remove_all(&mut self) -> Vec<String> {
        self.active_tab_id = None;
        self.tabs.drain(..).map(|tab| tab.id).collect()
    }

    pub fn set_active(&mut self, tab_id: Option<String>) {
        self.active_tab_id = tab_id.filter(|id| self.get(id).is_some());
    }

    pub fn active_tab_id(&self) -> Option<&str> {
        self.active_tab_id.as_deref()
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn get(&self, tab_id: &str) -> Option<&Tab> {
        self.tabs.iter().find(|tab| tab.id == tab_id)
    }

    fn get_mut(&mut self, tab_id: &str) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|tab| tab.id == tab_id)
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}

impl Document {
    fn from_saved(saved_content: String) -> Self {
        Self {
            content: saved_content.clone(),
            saved_content,
            is_dirty: false,
            is_missing: false,
            is_divergent: false,
            line_ending: LineEnding::Unknown,
            cursor_info: None,
            last_modified_timestamp: None,
            is_untitled: false,
            untitled_number: None,
        }
    }
}

impl DocumentStore {
    /// Load a clean document whose content is its saved baseline.
    pub fn init_document(&mut self, tab_id: &str, saved_content: impl Into<String>) {
        self.documents
            .insert(tab_id.to_string(), Document::from_saved(saved_content.into()));
    }

    /// Replace the live content; dirtiness follows the saved baseline.
    pub fn set_content(&mut self, tab_id: &str, content: impl Into<String>) {
        if let Some(doc) = self.documents.get_mut(tab_id) {
            doc.content = content.into();
            doc.is_dirty = doc.content != doc.saved_content;
        }
    }

    /// Record a successful save of the current content.
    pub fn mark_saved(&mut self, tab_id: &str, timestamp: i64) {
        if let Some(doc) = self.documents.get_mut(tab_id) {
            doc.saved_content = doc.content.clone();
            doc.is_dirty = false;
            doc.last_modified_timestamp = Some(timestamp);
        }
    }

    pub fn get(&self, tab_id: &str) -> Option<&Document> {
        self.documents.get(tab_id)
    }

    pub fn get_mut(&mut self, tab_id: &str) -> Option<&mut Document> {
        self.documents.get_mut(tab_id)
    }

    pub fn remove(&mut self, tab_id: &str) -> Option<Document> {
        self.documents.remove(tab_id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl HistoryStore {
    pub fn push_undo(&mut self, tab_id: &str, checkpoint: HistoryCheckpoint) {
        let entry = self.entries.entry(tab_id.to_string()).or_default();
        entry.undo.push(checkpoint);
        entry.redo.clear();
    }

    /// Install checkpoint arrays as-is, replacing whatever the tab had.
    pub fn install(
        &mut self,
        tab_id: &str,
        undo: Vec<HistoryCheckpoint>,
        redo: Vec<HistoryCheckpoint>,
    ) {
        self.entries
            .insert(tab_id.to_string(), TabHistory { undo, redo });
    }

    pub fn get(&self, tab_id: &str) -> Option<&TabHistory> {
        self.entries.get(tab_id)
    }

    pub fn remove(&mut self, tab_id: &str) {
        self.entries.remove(tab_id);
    }
}

impl UiStore {
    pub fn state(&self) -> &UiState {
        &self.state
    }

    /// Number of UI mutations applied so far.
    pub fn changes(&self) -> u32 {
        self.changes
    }

    pub fn toggle_sidebar(&mut self) {
        self.state.sidebar_visible = !self.state.sidebar_visible;
        self.changes += 1;
    }

    pub fn toggle_outline(&mut self) {
        self.state.outline_visible = !self.state.outline_visible;
        self.changes += 1;
    }

    pub fn toggle_status_bar(&mut self) {
        self.state.status_bar_visible = !self.state.status_bar_visible;
        self.changes += 1;
    }

    pub fn toggle_source_mode(&mut self) {
        self.state.source_mode_enabled = !self.state.source_mode_enabled;
        self.changes += 1;
    }

    pub fn toggle_focus_mode(&mut self) {
        self.state.focus_mode_enabled = !self.state.focus_mode_enabled;
        self.changes += 1;
    }

    pub fn toggle_typewriter_mode(&mut self) {
        self.state.typewriter_mode_enabled = !self.state.typewriter_mode_enabled;
        self.changes += 1;
    }

    pub fn set_sidebar_width(&mut self, width: u32) {
        self.state.sidebar_width = width;
        self.changes += 1;
    }

    pub fn set_sidebar_view_mode(&mut self, mode: impl Into<String>) {
        self.state.sidebar_view_mode = mode.into();
        self.changes += 1;
    }
}

impl EditorWindow {
    pub fn new(window_id: impl Into<String>, role: WindowRole) -> Self {
        Self {
            window_id: window_id.into(),
            role,
            state: RwLock::new(EditorState::default()),
            restoring: AtomicBool::new(false),
        }
    }

    pub fn window_id(&self) -> &str {
        &self.window_id
    }

    pub fn role(&self) -> WindowRole {
        self.role
    }

    pub fn is_primary(&self) -> bool {
        self.role == WindowRole::Primary
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, EditorState> {
        self.state.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, EditorState> {
        self.state.write().await
    }

    /// Open a file in a new tab. Returns the tab identifier.
    pub async fn open_document(
        &self,
        file_path: Option<String>,
        title: impl Into<String>,
        saved_content: impl Into<String>,
    ) -> String {
        let mut state = self.state.write().await;
        let tab_id = state.tabs.create_tab(file_path, title);
        state.documents.init_document(&tab_id, saved_content);
        tab_id
    }

    /// Edit a document, recording the previous content as an undo checkpoint.
    pub async fn edit(
        &self,
        tab_id: &str,
        content: impl Into<String>,
        checkpoint: HistoryCheckpoint,
    ) {
        let mut state = self.state.write().await;
        state.history.push_undo(tab_id, checkpoint);
        state.documents.set_content(tab_id, content);
    }

    /// Reject a restore that would overlap one already running here.
    pub fn begin_restore(&self) -> Result<RestoreGuard<'_>, HotExitError> {
        self.restoring
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| HotExitError::RestoreInProgress(self.window_id.clone()))?;
        Ok(RestoreGuard {
            flag: &self.restoring,
        })
    }

    pub fn is_restoring(&self) -> bool {
        self.restoring.load(Ordering::Acquire)
    }
}
