//! Per-version snapshot shapes.
//!
//! Every schema generation gets its own explicit type so a migration step is
//! a typed conversion `Vn -> Vn+1` and the compiler flags any field a step
//! forgets to fill. Versions that share a shape (schema-compatible point
//! releases) are carried by the same variant with a different `version`.

use super::migration::can_migrate;
use super::types::*;
use crate::error::MigrationError;
use serde::{Deserialize, Serialize};

/// Version 1: documents carried no undo/redo history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDataV1 {
    pub version: u32,
    pub timestamp: i64,
    pub app_version: String,
    pub windows: Vec<WindowStateV1>,
    pub workspace: Option<WorkspaceState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowStateV1 {
    pub window_id: String,
    pub is_primary: bool,
    pub active_tab_id: Option<String>,
    pub tabs: Vec<TabStateV1>,
    pub ui_state: UiState,
    pub geometry: Option<WindowGeometry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabStateV1 {
    pub id: String,
    pub file_path: Option<String>,
    pub title: String,
    pub is_pinned: bool,
    pub document: DocumentStateV1,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStateV1 {
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
}

/// Version 2 is the current shape.
pub type SessionDataV2 = SessionData;

/// A snapshot as read from disk, tagged by the shape its version implies.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionedSession {
    V1(SessionDataV1),
    V2(SessionDataV2),
    /// Outside the supported range. The raw blob is kept because a future
    /// shape may not parse at all. `version` is the declared integer, which
    /// may not fit a schema version at all (negative, or beyond `u32`).
    Unrecognized { version: i64, raw: serde_json::Value },
}

impl VersionedSession {
    /// Classify a parsed JSON blob by its `version` field.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        use serde::de::Error;

        let declared = value
            .get("version")
            .and_then(|v| v.as_i64().or_else(|| v.as_u64().map(|_| i64::MAX)))
            .ok_or_else(|| serde_json::Error::custom("session has no integer version field"))?;

        let version = match u32::try_from(declared) {
            Ok(version) if can_migrate(version) => version,
            _ => {
                return Ok(VersionedSession::Unrecognized {
                    version: declared,
                    raw: value,
                });
            }
        };

        match version {
            1 => Ok(VersionedSession::V1(serde_json::from_value(value)?)),
            _ => Ok(VersionedSession::V2(serde_json::from_value(value)?)),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        Self::from_value(serde_json::from_slice(bytes)?)
    }

    /// Schema version. A declared version that does not fit is clamped, so it
    /// still falls outside every supported range.
    pub fn version(&self) -> u32 {
        match self {
            VersionedSession::V1(s) => s.version,
            VersionedSession::V2(s) => s.version,
            VersionedSession::Unrecognized { version, .. } => {
                u32::try_from((*version).max(0)).unwrap_or(u32::MAX)
            }
        }
    }

    /// Version exactly as written in the snapshot.
    pub fn declared_version(&self) -> i64 {
        match self {
            VersionedSession::Unrecognized { version, .. } => *version,
            other => i64::from(other.version()),
        }
    }

    pub fn timestamp(&self) -> Option<i64> {
        match self {
            VersionedSession::V1(s) => Some(s.timestamp),
            VersionedSession::V2(s) => Some(s.timestamp),
            VersionedSession::Unrecognized { raw, .. } => {
                raw.get("timestamp").and_then(serde_json::Value::as_i64)
            }
        }
    }

    pub fn shape_name(&self) -> &'static str {
        match self {
            VersionedSession::V1(_) => "v1",
            VersionedSession::V2(_) => "v2",
            VersionedSession::Unrecognized { .. } => "unrecognized",
        }
    }

    /// Bump the version number without touching the shape.
    pub(crate) fn with_version(self, version: u32) -> Self {
        match self {
            VersionedSession::V1(mut s) => {
                s.version = version;
                VersionedSession::V1(s)
            }
            VersionedSession::V2(mut s) => {
                s.version = version;
                VersionedSession::V2(s)
            }
            VersionedSession::Unrecognized { raw, .. } => VersionedSession::Unrecognized {
                version: i64::from(version),
                raw,
            },
        }
    }

    /// Unwrap a session that is already in the current shape.
    pub fn into_current(self) -> Result<SessionData, MigrationError> {
        match self {
            VersionedSession::V2(s) => Ok(s),
            other => Err(MigrationError::ShapeMismatch {
                version: other.version(),
                shape: other.shape_name(),
            }),
        }
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            VersionedSession::V1(s) => serde_json::to_value(s),
            VersionedSession::V2(s) => serde_json::to_value(s),
            VersionedSession::Unrecognized { raw, .. } => Ok(raw.clone()),
        }
    }
}

impl From<SessionData> for VersionedSession {
    fn from(session: SessionData) -> Self {
        VersionedSession::V2(session)
    }
}

impl From<SessionDataV1> for SessionDataV2 {
    fn from(v1: SessionDataV1) -> Self {
        Self {
            version: 2,
            timestamp: v1.timestamp,
            app_version: v1.app_version,
            windows: v1.windows.into_iter().map(WindowState::from).collect(),
            workspace: v1.workspace,
        }
    }
}

impl From<WindowStateV1> for WindowState {
    fn from(w: WindowStateV1) -> Self {
        Self {
            window_id: w.window_id,
            is_primary: w.is_primary,
            active_tab_id: w.active_tab_id,
            tabs: w.tabs.into_iter().map(TabState::from).collect(),
            ui_state: w.ui_state,
            geometry: w.geometry,
        }
    }
}

impl From<TabStateV1> for TabState {
    fn from(t: TabStateV1) -> Self {
        Self {
            id: t.id,
            file_path: t.file_path,
            title: t.title,
            is_pinned: t.is_pinned,
            document: t.document.into(),
        }
    }
}

impl From<DocumentStateV1> for DocumentState {
    fn from(d: DocumentStateV1) -> Self {
        Self {
            content: d.content,
            saved_content: d.saved_content,
            is_dirty: d.is_dirty,
            is_missing: d.is_missing,
            is_divergent: d.is_divergent,
            line_ending: d.line_ending,
            cursor_info: d.cursor_info,
            last_modified_timestamp: d.last_modified_timestamp,
            is_untitled: d.is_untitled,
            untitled_number: d.untitled_number,
            undo_history: Vec::new(),
            redo_history: Vec::new(),
        }
    }
}
