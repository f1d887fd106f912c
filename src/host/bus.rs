//! In-process publish/subscribe channel between windows and the host.
//!
//! A [`Subscription`] may cover several event kinds. All of them feed one
//! receiver, so events are observed in emission order across kinds. Dropping
//! the subscription unregisters every listener it owns.

use crate::session::{SessionData, WindowState};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::trace;

pub const EVENT_CAPTURE_REQUEST: &str = "hot-exit:capture-request";
pub const EVENT_CAPTURE_RESPONSE: &str = "hot-exit:capture-response";
pub const EVENT_CAPTURE_TIMEOUT: &str = "hot-exit:capture-timeout";
pub const EVENT_RESTORE_START: &str = "hot-exit:restore-start";
pub const EVENT_RESTORE_COMPLETE: &str = "hot-exit:restore-complete";
pub const EVENT_RESTORE_FAILED: &str = "hot-exit:restore-failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CaptureRequest,
    CaptureResponse,
    CaptureTimeout,
    RestoreStart,
    RestoreComplete,
    RestoreFailed,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::CaptureRequest => EVENT_CAPTURE_REQUEST,
            EventKind::CaptureResponse => EVENT_CAPTURE_RESPONSE,
            EventKind::CaptureTimeout => EVENT_CAPTURE_TIMEOUT,
            EventKind::RestoreStart => EVENT_RESTORE_START,
            EventKind::RestoreComplete => EVENT_RESTORE_COMPLETE,
            EventKind::RestoreFailed => EVENT_RESTORE_FAILED,
        }
    }
}

/// Capture request payload with correlation id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    pub capture_id: String,
}

/// Capture response from a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResponse {
    pub capture_id: String,
    pub window_id: String,
    pub state: WindowState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HotExitEvent {
    CaptureRequest(CaptureRequest),
    CaptureResponse(CaptureResponse),
    CaptureTimeout { capture_id: String },
    /// Carries the normalized snapshot for the primary window.
    RestoreStart(SessionData),
    RestoreComplete,
    RestoreFailed { error: String },
}

impl HotExitEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            HotExitEvent::CaptureRequest(_) => EventKind::CaptureRequest,
            HotExitEvent::CaptureResponse(_) => EventKind::CaptureResponse,
            HotExitEvent::CaptureTimeout { .. } => EventKind::CaptureTimeout,
            HotExitEvent::RestoreStart(_) => EventKind::RestoreStart,
            HotExitEvent::RestoreComplete => EventKind::RestoreComplete,
            HotExitEvent::RestoreFailed { .. } => EventKind::RestoreFailed,
        }
    }
}

type ListenerId = u64;

struct Listener {
    kind: EventKind,
    sender: mpsc::UnboundedSender<HotExitEvent>,
}

#[derive(Default)]
struct BusInner {
    listeners: DashMap<ListenerId, Listener>,
    registrations: DashMap<EventKind, u64>,
    next_id: AtomicU64,
}

#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one listener per kind. Returns once every listener is active,
    /// so an event emitted after this call is guaranteed to be delivered.
    pub async fn listen(&self, kinds: &[EventKind]) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut ids = Vec::with_capacity(kinds.len());

        for &kind in kinds {
            let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
            self.inner.listeners.insert(
                id,
                Listener {
                    kind,
                    sender: sender.clone(),
                },
            );
            *self.inner.registrations.entry(kind).or_insert(0) += 1;
            trace!("Listener {} registered for {}", id, kind.name());
            ids.push(id);
        }

        Subscription {
            bus: self.clone(),
            ids,
            receiver,
        }
    }

    /// Deliver an event to every current listener of its kind.
    /// Returns the number of listeners reached.
    pub fn emit(&self, event: HotExitEvent) -> usize {
        let kind = event.kind();
        let mut delivered = 0;
        for listener in self.inner.listeners.iter() {
            if listener.kind == kind && listener.sender.send(event.clone()).is_ok() {
                delivered += 1;
            }
        }
        trace!("Emitted {} to {} listeners", kind.name(), delivered);
        delivered
    }

    /// Listeners currently registered for `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner
            .listeners
            .iter()
            .filter(|listener| listener.kind == kind)
            .count()
    }

    /// Listeners ever registered for `kind`.
    pub fn registration_count(&self, kind: EventKind) -> u64 {
        self.inner
            .registrations
            .get(&kind)
            .map(|count| *count)
            .unwrap_or(0)
    }

    fn unlisten(&self, id: ListenerId) {
        if let Some((_, listener)) = self.inner.listeners.remove(&id) {
            trace!("Listener {} removed from {}", id, listener.kind.name());
        }
    }
}

/// Live registration on the bus; unregisters on drop.
pub struct Subscription {
    bus: EventBus,
    ids: Vec<ListenerId>,
    receiver: mpsc::UnboundedReceiver<HotExitEvent>,
}

impl Subscription {
    /// Next event in emission order. `None` only after the subscription has
    /// been torn down.
    pub async fn recv(&mut self) -> Option<HotExitEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<HotExitEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            self.bus.unlisten(id);
        }
    }
}
