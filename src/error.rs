//! Error types shared by the capture and restore paths.

use std::time::Duration;

/// Failures of the schema migrator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    #[error("Cannot migrate session from version {version}. Supported versions: {min} to {max}")]
    UnsupportedVersion { version: u32, min: u32, max: u32 },

    #[error("No migration path from version {0}")]
    MissingStep(u32),

    #[error("Session version {version} does not match its stored shape ({shape})")]
    ShapeMismatch { version: u32, shape: &'static str },
}

/// Failures reported by the native host for a command.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HostError {
    #[error("No document windows to capture")]
    NoWindows,

    #[error("Capture timeout after {0:?}: no windows responded")]
    CaptureTimeout(Duration),

    #[error("No primary window registered")]
    NoPrimaryWindow,

    #[error("No window state in session")]
    EmptySession,

    #[error("Failed to create window: {0}")]
    WindowCreation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Relaunch failed: {0}")]
    Relaunch(String),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for HostError {
    fn from(err: anyhow::Error) -> Self {
        HostError::Storage(format!("{:#}", err))
    }
}

/// Top-level error of the hot exit subsystem.
#[derive(Debug, thiserror::Error)]
pub enum HotExitError {
    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("Restore dispatch failed: {0}")]
    Dispatch(HostError),

    #[error("A restore is already running in window {0}")]
    RestoreInProgress(String),

    #[error("Window {window_id}: {message}")]
    Apply { window_id: String, message: String },

    #[error("Event bus closed")]
    BusClosed,
}

pub type HotExitResult<T> = std::result::Result<T, HotExitError>;
