//! Session controller: capture before restart, restore after it.
//!
//! The restore path arms a [`RestoreHandshake`] before dispatching, so a
//! completion signal can never fire ahead of its listener. The process-wide
//! [`CoordinationFlag`] stays raised while the check runs.

pub mod coordination;
pub mod handshake;
pub mod manager;

#[cfg(test)]
mod tests;

pub use coordination::CoordinationFlag;
pub use handshake::{HandshakeOutcome, RestoreHandshake, Settled};
pub use manager::{SessionController, sanitize_timeout};
