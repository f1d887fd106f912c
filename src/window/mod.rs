//! Window side of hot exit: the live editor state of one window, the
//! responder that serializes it on capture and the appliers that rebuild it
//! on restore.

pub mod capture;
pub mod editor;
pub mod restore;


pub use capture::*;
pub use editor::*;
pub use restore::*;

/// Whether a window drives startup restore or pulls its own state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowRole {
    Primary,
    Secondary,
}
