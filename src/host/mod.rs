//! Native host side of hot exit.
//!
//! [`HostBridge`] is the command surface windows and the session controller
//! talk to. [`LocalHost`] implements it in-process: it aggregates capture
//! responses, owns the snapshot file, creates secondary windows during a
//! multi-window restore and tallies per-window completions.

pub mod aggregator;
pub mod bus;

pub use aggregator::*;
pub use bus::*;

use crate::error::HostError;
use crate::session::{SessionData, VersionedSession, WindowState};
use async_trait::async_trait;

/// Commands exposed by the native host.
#[async_trait]
pub trait HostBridge: Send + Sync {
    /// Event bus shared with every window.
    fn events(&self) -> &EventBus;

    /// Ask every window for its state and assemble one snapshot.
    async fn capture(&self, capture_id: &str) -> Result<SessionData, HostError>;

    /// Persist a snapshot atomically.
    async fn persist_session(&self, session: &SessionData) -> Result<(), HostError>;

    /// Read the persisted snapshot without side effects.
    async fn inspect_session(&self) -> Result<Option<VersionedSession>, HostError>;

    /// Delete the persisted snapshot.
    async fn clear_session(&self) -> Result<(), HostError>;

    /// Apply a snapshot to the one existing window.
    async fn restore(&self, session: SessionData) -> Result<(), HostError>;

    /// Create and populate secondary windows. Returns the created window ids.
    async fn restore_multi_window(&self, session: SessionData) -> Result<Vec<String>, HostError>;

    /// Pending state a window should pull on startup, if any.
    async fn get_pending_window_state(&self, window_id: &str) -> Option<WindowState>;

    /// Per-window completion. Returns true once every expected window has reported.
    async fn window_restore_complete(&self, window_id: &str) -> bool;

    /// Per-window apply failure.
    async fn window_restore_failed(&self, window_id: &str, error: &str);

    /// Restart the process.
    async fn relaunch(&self) -> Result<(), HostError>;
}
