use serde::{Deserialize, Serialize};

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 2;

/// Oldest schema version the migrator can upgrade.
pub const MIN_SUPPORTED_VERSION: u32 = 1;

/// Snapshots older than this are discarded instead of restored.
pub const MAX_SESSION_AGE_DAYS: i64 = 7;

/// Complete application session state, one per capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub version: u32,
    /// Unix seconds.
    pub timestamp: i64,
    /// Diagnostic only.
    pub app_version: String,
    pub windows: Vec<WindowState>,
    pub workspace: Option<WorkspaceState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowState {
    pub window_id: String,
    pub is_primary: bool,
    pub active_tab_id: Option<String>,
    pub tabs: Vec<TabState>,
    pub ui_state: UiState,
    pub geometry: Option<WindowGeometry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabState {
    /// Session-local, reassigned on restore.
    pub id: String,
    pub file_path: Option<String>,
    pub title: String,
    pub is_pinned: bool,
    pub document: DocumentState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentState {
    pub content: String,
    pub saved_content: String,
    pub is_dirty: bool,
    pub is_missing: bool,
    pub is_divergent: bool,
    pub line_ending: LineEnding,
    pub cursor_info: Option<CursorInfo>,
    pub last_modified_timestamp: Option<i64>,
    pub is_untitled: bool,
    pub untitled_number: Option<u32>,
    pub undo_history: Vec<HistoryCheckpoint>,
    pub redo_history: Vec<HistoryCheckpoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    Lf,
    Crlf,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorMode {
    Source,
    Wysiwyg,
}

/// One undo or redo entry. Transported as data, never replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryCheckpoint {
    pub markdown: String,
    pub mode: EditorMode,
    pub cursor_info: Option<CursorInfo>,
    pub timestamp: i64,
}

/// Structural cursor anchor used by the editor to re-locate the caret after
/// a reparse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorInfo {
    pub source_line: u32,
    pub word_at_cursor: String,
    pub offset_in_word: u32,
    pub node_type: String,
    pub percent_in_line: f64,
    pub context_before: String,
    pub context_after: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_anchor: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    pub sidebar_visible: bool,
    pub sidebar_width: u32,
    pub outline_visible: bool,
    pub sidebar_view_mode: String,
    pub status_bar_visible: bool,
    pub source_mode_enabled: bool,
    pub focus_mode_enabled: bool,
    pub typewriter_mode_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceState {
    pub root_path: Option<String>,
    pub is_workspace_mode: bool,
    pub show_hidden_files: bool,
}

/// Whether a snapshot taken at `timestamp` is more than `max_age_days` old at
/// `now`. An age too large to represent counts as stale.
pub fn is_older_than(timestamp: i64, now: i64, max_age_days: i64) -> bool {
    match now.checked_sub(timestamp) {
        Some(age_seconds) => age_seconds > max_age_days.saturating_mul(24 * 60 * 60),
        None => true,
    }
}

impl SessionData {
    /// Create an empty session stamped with the current schema and time.
    pub fn new(app_version: impl Into<String>) -> Self {
        Self {
            version: SCHEMA_VERSION,
            timestamp: chrono::Utc::now().timestamp(),
            app_version: app_version.into(),
            windows: Vec::new(),
            workspace: None,
        }
    }

    /// Check if the session is older than `max_age_days`.
    pub fn is_stale(&self, max_age_days: i64) -> bool {
        is_older_than(self.timestamp, chrono::Utc::now().timestamp(), max_age_days)
    }

    pub fn has_secondary_windows(&self) -> bool {
        self.windows.iter().any(|w| !w.is_primary)
    }

    /// The primary entry, falling back to the first window.
    pub fn primary_window(&self) -> Option<&WindowState> {
        self.windows
            .iter()
            .find(|w| w.is_primary)
            .or_else(|| self.windows.first())
    }

    pub fn window(&self, window_id: &str) -> Option<&WindowState> {
        self.windows.iter().find(|w| w.window_id == window_id)
    }

    pub fn tab_count(&self) -> usize {
        self.windows.iter().map(|w| w.tabs.len()).sum()
    }

    pub fn dirty_tab_count(&self) -> usize {
        self.windows
            .iter()
            .flat_map(|w| &w.tabs)
            .filter(|t| t.document.is_dirty)
            .count()
    }
}

impl DocumentState {
    /// A clean document whose live content equals its saved baseline.
    pub fn clean(saved_content: impl Into<String>) -> Self {
        let saved_content = saved_content.into();
        Self {
            content: saved_content.clone(),
            saved_content,
            is_dirty: false,
            is_missing: false,
            is_divergent: false,
            line_ending: LineEnding::Lf,
            cursor_info: None,
            last_modified_timestamp: None,
            is_untitled: false,
            untitled_number: None,
            undo_history: Vec::new(),
            redo_history: Vec::new(),
        }
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            sidebar_visible: false,
            sidebar_width: 260,
            outline_visible: false,
            sidebar_view_mode: "files".to_string(),
            status_bar_visible: true,
            source_mode_enabled: false,
            focus_mode_enabled: false,
            typewriter_mode_enabled: false,
        }
    }
}
