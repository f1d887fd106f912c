//! Environment constants and path utilities for hot exit.
//!
//! Centralizes the file and directory names used for the snapshot and the
//! configuration so they are defined in one place.

use std::path::{Path, PathBuf};

/// Application data directory name (hidden directory in the user's home)
pub const APP_DIR_NAME: &str = ".hot-exit";

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file name looked up in the current directory
pub const LOCAL_CONFIG_FILE_NAME: &str = "hot-exit.toml";

/// Snapshot file names
pub mod session {
    /// Persisted snapshot
    pub const SESSION_FILE_NAME: &str = "session.json";

    /// Copy of the snapshot that was overwritten by the last write
    pub const BACKUP_FILE_NAME: &str = "session.prev.json";

    /// Extension of in-flight temporary snapshot files
    pub const TEMP_FILE_EXTENSION: &str = "tmp";
}

/// Window identifiers
pub mod window {
    /// Identifier of the primary window
    pub const PRIMARY_WINDOW_ID: &str = "main";

    /// Prefix of secondary document window identifiers
    pub const DOCUMENT_WINDOW_PREFIX: &str = "doc-";
}

/// Build the default data directory from a home directory
pub fn app_data_dir_path(home_dir: &Path) -> PathBuf {
    home_dir.join(APP_DIR_NAME)
}

/// Build the snapshot file path
pub fn session_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(session::SESSION_FILE_NAME)
}

/// Build the backup snapshot file path
pub fn backup_session_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(session::BACKUP_FILE_NAME)
}

/// Build a unique temporary snapshot path next to the snapshot
pub fn temp_session_file_path(data_dir: &Path, token: &str) -> PathBuf {
    data_dir.join(format!(
        "{}.{}.{}",
        session::SESSION_FILE_NAME,
        token,
        session::TEMP_FILE_EXTENSION
    ))
}

/// Build config file path in user's home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    app_data_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

/// Build local config file path in current directory
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    current_dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME)
}

/// Home directory from the environment
pub fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .or_else(|| std::env::var("USERPROFILE").ok())
        .map(PathBuf::from)
}

/// Whether an identifier names a document window
pub fn is_document_window(window_id: &str) -> bool {
    window_id == window::PRIMARY_WINDOW_ID || window_id.starts_with(window::DOCUMENT_WINDOW_PREFIX)
}
