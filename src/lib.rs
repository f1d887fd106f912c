//! # Hot Exit
//!
//! Preserves the full editing state of a multi-window editor across an
//! application restart. Before the restart every window serializes its tabs,
//! documents (including unsaved edits and undo/redo history) and UI layout into
//! one versioned snapshot. After the restart the snapshot is migrated if needed,
//! dispatched to the windows and deleted only once every window confirmed it.
//!
//! ## Architecture Overview
//!
//! - **[`session`]**: Snapshot data model, per-version shapes, schema migration
//!   and atomic storage
//! - **[`host`]**: Native host side: event bus, capture aggregation, restore
//!   dispatch and per-window completion tally
//! - **[`window`]**: Window side: live editor state, capture responder and the
//!   primary/secondary restore appliers
//! - **[`controller`]**: Capture-and-restart, the restore handshake and the
//!   process-wide coordination flag
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hot_exit::{HotExitConfig, LocalHost, SessionController, WindowRole};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = HotExitConfig::default();
//!     let host = Arc::new(LocalHost::from_config(&config));
//!     host.register_window("main", WindowRole::Primary).await;
//!
//!     let controller = SessionController::new("main", WindowRole::Primary, host)
//!         .with_config(config);
//!     let restored = controller.check_and_restore_session(None).await?;
//!     println!("Session restored: {}", restored);
//!     Ok(())
//! }
//! ```

/// Snapshot model, versioned shapes, migration and storage.
pub mod session;

/// Native host: event bus, capture aggregation and restore dispatch.
pub mod host;

/// Window-side live state, capture and restore.
pub mod window;

/// Session controller, restore handshake and coordination flag.
pub mod controller;

/// Configuration loading and defaults.
pub mod config;

/// Error types.
pub mod error;

/// Environment constants and path utilities.
///
/// Centralizes all file names and directory names used for the snapshot and
/// the configuration.
pub mod env;

// CLI module for command-line interface
pub mod cli;

pub use config::HotExitConfig;
pub use controller::{CoordinationFlag, HandshakeOutcome, RestoreHandshake, SessionController};
pub use error::{HostError, HotExitError, HotExitResult, MigrationError};
pub use host::{EventBus, EventKind, HostBridge, HotExitEvent, LocalHost};
pub use session::{
    Migrator, SCHEMA_VERSION, SessionData, SessionStore, VersionedSession, WindowState,
};
pub use window::{
    CaptureResponder, EditorWindow, PrimaryRestore, RestoreApplier, SecondaryRestore, WindowRole,
};
