use super::editor::EditorWindow;
use crate::host::{CaptureRequest, CaptureResponse, EventBus, EventKind, HotExitEvent};
use crate::session::{DocumentState, TabState, WindowState};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Answers capture requests for one window with its serialized state.
#[derive(Clone)]
pub struct CaptureResponder {
    window: Arc<EditorWindow>,
    bus: EventBus,
}

impl CaptureResponder {
    pub fn new(window: Arc<EditorWindow>, bus: EventBus) -> Self {
        Self { window, bus }
    }

    /// Serialize the live window state.
    pub async fn snapshot(&self) -> WindowState {
        let state = self.window.read().await;

        let tabs = state
            .tabs
            .tabs()
            .iter()
            .map(|tab| {
                let document = match state.documents.get(&tab.id) {
                    Some(doc) => {
                        let history = state.history.get(&tab.id);
                        DocumentState {
                            content: doc.content.clone(),
                            saved_content: doc.saved_content.clone(),
                            is_dirty: doc.is_dirty || doc.content != doc.saved_content,
                            is_missing: doc.is_missing,
                            is_divergent: doc.is_divergent,
                            line_ending: doc.line_ending,
                            cursor_info: doc.cursor_info.clone(),
                            last_modified_timestamp: doc.last_modified_timestamp,
                            is_untitled: doc.is_untitled,
                            untitled_number: doc.untitled_number,
                            undo_history: history.map(|h| h.undo.clone()).unwrap_or_default(),
                            redo_history: history.map(|h| h.redo.clone()).unwrap_or_default(),
                        }
                    }
                    None => DocumentState::clean(String::new()),
                };

                TabState {
                    id: tab.id.clone(),
                    file_path: tab.file_path.clone(),
                    title: tab.title.clone(),
                    is_pinned: tab.is_pinned,
                    document,
                }
            })
            .collect();

        WindowState {
            window_id: self.window.window_id().to_string(),
            is_primary: self.window.is_primary(),
            active_tab_id: state.tabs.active_tab_id().map(str::to_string),
            tabs,
            ui_state: state.ui.state().clone(),
            geometry: state.geometry,
        }
    }

    /// Build and emit the response to one request. Failures are logged and
    /// never propagated; the host proceeds with whatever windows answered.
    pub async fn respond(&self, request: &CaptureRequest) -> bool {
        let response = CaptureResponse {
            capture_id: request.capture_id.clone(),
            window_id: self.window.window_id().to_string(),
            state: self.snapshot().await,
        };

        if let Err(e) = serde_json::to_vec(&response) {
            error!(
                "Window {} cannot serialize capture response: {}",
                self.window.window_id(),
                e
            );
            return false;
        }

        let delivered = self.bus.emit(HotExitEvent::CaptureResponse(response));
        if delivered == 0 {
            error!(
                "Window {} capture response reached no listener (capture {})",
                self.window.window_id(),
                request.capture_id
            );
            return false;
        }

        debug!(
            "Window {} answered capture {}",
            self.window.window_id(),
            request.capture_id
        );
        true
    }

    /// Subscribe to capture requests and answer each one until the returned
    /// task is aborted. The subscription is live when this returns.
    pub async fn start(self) -> JoinHandle<()> {
        let mut subscription = self.bus.listen(&[EventKind::CaptureRequest]).await;
        info!("Capture responder ready for window {}", self.window.window_id());

        tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                if let HotExitEvent::CaptureRequest(request) = event {
                    self.respond(&request).await;
                }
            }
        })
    }
}
