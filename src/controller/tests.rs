use super::*;
use crate::error::{HostError, HotExitError};
use crate::host::{EventBus, EventKind, HostBridge, HotExitEvent};
use crate::session::{
    DocumentState, DocumentStateV1, SCHEMA_VERSION, SessionData, SessionDataV1, TabState,
    TabStateV1, UiState, VersionedSession, WindowState, WindowStateV1,
};
use crate::window::WindowRole;
use async_trait::async_trait;
use serial_test::serial;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the fake host does when a restore is dispatched.
#[derive(Debug, Clone)]
enum Script {
    CompleteNow,
    CompleteAfter(Duration),
    FailNow(String),
    CompleteThenFail,
    FailThenComplete,
    Silent,
    Reject(String),
}

struct FakeHost {
    bus: EventBus,
    script: Script,
    snapshot: Mutex<Option<VersionedSession>>,
    capture_result: Mutex<Option<Result<SessionData, HostError>>>,
    persist_fails: bool,
    clear_fails: bool,
    persisted: Mutex<Option<SessionData>>,
    dispatched: Mutex<Vec<(&'static str, SessionData)>>,
    listeners_at_dispatch: Mutex<Option<(usize, usize)>>,
    dispatch_delay: Option<Duration>,
    finished_dispatches: AtomicU32,
    inspections: AtomicU32,
    relaunches: AtomicU32,
}

impl FakeHost {
    fn new(script: Script) -> Self {
        Self {
            bus: EventBus::new(),
            script,
            snapshot: Mutex::new(None),
            capture_result: Mutex::new(None),
            persist_fails: false,
            clear_fails: false,
            persisted: Mutex::new(None),
            dispatched: Mutex::new(Vec::new()),
            listeners_at_dispatch: Mutex::new(None),
            dispatch_delay: None,
            finished_dispatches: AtomicU32::new(0),
            inspections: AtomicU32::new(0),
            relaunches: AtomicU32::new(0),
        }
    }

    fn with_snapshot(self, snapshot: VersionedSession) -> Self {
        *self.snapshot.lock().unwrap() = Some(snapshot);
        self
    }

    fn with_dispatch_delay(mut self, delay: Duration) -> Self {
        self.dispatch_delay = Some(delay);
        self
    }

    fn has_snapshot(&self) -> bool {
        self.snapshot.lock().unwrap().is_some()
    }

    fn dispatch(&self, kind: &'static str, session: SessionData) -> Result<(), HostError> {
        *self.listeners_at_dispatch.lock().unwrap() = Some((
            self.bus.listener_count(EventKind::RestoreComplete),
            self.bus.listener_count(EventKind::RestoreFailed),
        ));
        self.dispatched.lock().unwrap().push((kind, session));

        match &self.script {
            Script::CompleteNow => {
                self.bus.emit(HotExitEvent::RestoreComplete);
            }
            Script::CompleteAfter(delay) => {
                let bus = self.bus.clone();
                let delay = *delay;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    bus.emit(HotExitEvent::RestoreComplete);
                });
            }
            Script::FailNow(error) => {
                self.bus.emit(HotExitEvent::RestoreFailed {
                    error: error.clone(),
                });
            }
            Script::CompleteThenFail => {
                self.bus.emit(HotExitEvent::RestoreComplete);
                self.bus.emit(HotExitEvent::RestoreFailed {
                    error: "late failure".to_string(),
                });
            }
            Script::FailThenComplete => {
                self.bus.emit(HotExitEvent::RestoreFailed {
                    error: "early failure".to_string(),
                });
                self.bus.emit(HotExitEvent::RestoreComplete);
            }
            Script::Silent => {}
            Script::Reject(error) => return Err(HostError::Other(error.clone())),
        }
        Ok(())
    }
}

impl FakeHost {
    /// Simulates window creation that outlives the restore deadline.
    async fn finish_dispatch(&self) {
        if let Some(delay) = self.dispatch_delay {
            tokio::time::sleep(delay).await;
        }
        self.finished_dispatches.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl HostBridge for FakeHost {
    fn events(&self) -> &EventBus {
        &self.bus
    }

    async fn capture(&self, _capture_id: &str) -> Result<SessionData, HostError> {
        self.capture_result
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(HostError::NoWindows))
    }

    async fn persist_session(&self, session: &SessionData) -> Result<(), HostError> {
        if self.persist_fails {
            return Err(HostError::Storage("disk full".to_string()));
        }
        *self.persisted.lock().unwrap() = Some(session.clone());
        Ok(())
    }

    async fn inspect_session(&self) -> Result<Option<VersionedSession>, HostError> {
        self.inspections.fetch_add(1, Ordering::SeqCst);
        Ok(self.snapshot.lock().unwrap().clone())
    }

    async fn clear_session(&self) -> Result<(), HostError> {
        if self.clear_fails {
            return Err(HostError::Storage("read-only".to_string()));
        }
        *self.snapshot.lock().unwrap() = None;
        Ok(())
    }

    async fn restore(&self, session: SessionData) -> Result<(), HostError> {
        self.dispatch("single", session)?;
        self.finish_dispatch().await;
        Ok(())
    }

    async fn restore_multi_window(&self, session: SessionData) -> Result<Vec<String>, HostError> {
        let secondaries = session.windows.iter().filter(|w| !w.is_primary).count();
        self.dispatch("multi", session)?;
        self.finish_dispatch().await;
        Ok((1..=secondaries).map(|n| format!("doc-{}", n)).collect())
    }

    async fn get_pending_window_state(&self, _window_id: &str) -> Option<WindowState> {
        None
    }

    async fn window_restore_complete(&self, _window_id: &str) -> bool {
        false
    }

    async fn window_restore_failed(&self, _window_id: &str, _error: &str) {}

    async fn relaunch(&self) -> Result<(), HostError> {
        self.relaunches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn window(window_id: &str, is_primary: bool) -> WindowState {
    WindowState {
        window_id: window_id.to_string(),
        is_primary,
        active_tab_id: Some("t1".to_string()),
        tabs: vec![TabState {
            id: "t1".to_string(),
            file_path: Some("/notes/todo.md".to_string()),
            title: "todo".to_string(),
            is_pinned: false,
            document: DocumentState::clean("- [ ] ship"),
        }],
        ui_state: UiState::default(),
        geometry: None,
    }
}

fn single_window_session() -> SessionData {
    let mut session = SessionData::new("1.0.0");
    session.windows.push(window("main", true));
    session
}

fn multi_window_session() -> SessionData {
    let mut session = SessionData::new("1.0.0");
    session.windows.push(window("main", true));
    session.windows.push(window("doc-1", false));
    session.windows.push(window("doc-2", false));
    session
}

fn host_with(script: Script, session: SessionData) -> Arc<FakeHost> {
    Arc::new(FakeHost::new(script).with_snapshot(session.into()))
}

fn controller(host: &Arc<FakeHost>) -> SessionController {
    SessionController::new("main", WindowRole::Primary, host.clone())
        .with_coordination(Arc::new(CoordinationFlag::new()))
}

#[tokio::test]
async fn test_non_primary_window_never_restores() {
    let host = host_with(Script::CompleteNow, single_window_session());
    let controller = SessionController::new("doc-1", WindowRole::Secondary, host.clone())
        .with_coordination(Arc::new(CoordinationFlag::new()));

    assert!(!controller.check_and_restore_session(None).await.unwrap());
    assert_eq!(host.inspections.load(Ordering::SeqCst), 0);
    assert!(host.has_snapshot());
}

#[tokio::test]
async fn test_no_snapshot_returns_false() {
    let host = Arc::new(FakeHost::new(Script::CompleteNow));
    assert!(!controller(&host).check_and_restore_session(None).await.unwrap());
    assert!(host.dispatched.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_future_version_is_deleted() {
    let future = VersionedSession::from_value(serde_json::json!({
        "version": SCHEMA_VERSION + 1,
        "timestamp": chrono::Utc::now().timestamp(),
        "windows": [{ "shape": "from the future" }]
    }))
    .unwrap();
    let host = Arc::new(FakeHost::new(Script::CompleteNow).with_snapshot(future));

    assert!(!controller(&host).check_and_restore_session(None).await.unwrap());
    assert!(!host.has_snapshot());
    assert!(host.dispatched.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_version_below_minimum_is_deleted() {
    let ancient = VersionedSession::from_value(serde_json::json!({ "version": 0 })).unwrap();
    let host = Arc::new(FakeHost::new(Script::CompleteNow).with_snapshot(ancient));

    assert!(!controller(&host).check_and_restore_session(None).await.unwrap());
    assert!(!host.has_snapshot());
}

#[tokio::test]
async fn test_versions_outside_u32_are_deleted() {
    for version in [serde_json::json!(4_294_967_296_u64), serde_json::json!(-1)] {
        let snapshot = VersionedSession::from_value(serde_json::json!({
            "version": version,
            "timestamp": 0
        }))
        .unwrap();
        let host = Arc::new(FakeHost::new(Script::CompleteNow).with_snapshot(snapshot));

        assert!(!controller(&host).check_and_restore_session(None).await.unwrap());
        assert!(!host.has_snapshot(), "version {} should be discarded", version);
        assert!(host.dispatched.lock().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_minimum_timestamp_is_stale() {
    let mut session = single_window_session();
    session.timestamp = i64::MIN;
    let host = host_with(Script::CompleteNow, session);
    let config = crate::config::HotExitConfig {
        max_session_age_days: i64::MAX,
        ..Default::default()
    };

    let restored = controller(&host)
        .with_config(config)
        .check_and_restore_session(None)
        .await
        .unwrap();
    assert!(!restored);
    assert!(!host.has_snapshot());
}

#[tokio::test]
async fn test_huge_age_limit_keeps_recent_snapshot() {
    let host = host_with(Script::CompleteNow, single_window_session());
    let config = crate::config::HotExitConfig {
        max_session_age_days: i64::MAX,
        ..Default::default()
    };

    let restored = controller(&host)
        .with_config(config)
        .check_and_restore_session(None)
        .await
        .unwrap();
    assert!(restored);
}

#[tokio::test]
async fn test_stale_snapshot_is_deleted() {
    let mut session = single_window_session();
    session.timestamp -= 8 * 24 * 60 * 60;
    let host = Arc::new(FakeHost::new(Script::CompleteNow).with_snapshot(session.into()));

    assert!(!controller(&host).check_and_restore_session(None).await.unwrap());
    assert!(!host.has_snapshot());
}

#[tokio::test]
async fn test_staleness_check_can_be_disabled() {
    let mut session = single_window_session();
    session.timestamp -= 30 * 24 * 60 * 60;
    let host = Arc::new(FakeHost::new(Script::CompleteNow).with_snapshot(session.into()));
    let config = crate::config::HotExitConfig {
        max_session_age_days: 0,
        ..Default::default()
    };

    let restored = controller(&host)
        .with_config(config)
        .check_and_restore_session(None)
        .await
        .unwrap();
    assert!(restored);
}

#[tokio::test]
async fn test_delayed_success_deletes_snapshot_and_releases_listeners() {
    let host = Arc::new(
        FakeHost::new(Script::CompleteAfter(Duration::from_millis(50)))
            .with_snapshot(single_window_session().into()),
    );

    assert!(controller(&host).check_and_restore_session(None).await.unwrap());
    assert!(!host.has_snapshot());

    assert_eq!(host.bus.registration_count(EventKind::RestoreComplete), 1);
    assert_eq!(host.bus.registration_count(EventKind::RestoreFailed), 1);
    assert_eq!(host.bus.listener_count(EventKind::RestoreComplete), 0);
    assert_eq!(host.bus.listener_count(EventKind::RestoreFailed), 0);

    let dispatched = host.dispatched.lock().unwrap();
    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].0, "single");
}

#[tokio::test]
async fn test_listeners_registered_before_dispatch() {
    let host = host_with(Script::CompleteNow, single_window_session());

    assert!(controller(&host).check_and_restore_session(None).await.unwrap());
    assert_eq!(*host.listeners_at_dispatch.lock().unwrap(), Some((1, 1)));
}

#[tokio::test]
async fn test_timeout_preserves_snapshot() {
    let host = host_with(Script::Silent, single_window_session());

    let restored = controller(&host)
        .check_and_restore_session(Some(100.0))
        .await
        .unwrap();
    assert!(!restored);
    assert!(host.has_snapshot());
    assert_eq!(host.bus.listener_count(EventKind::RestoreComplete), 0);
    assert_eq!(host.bus.listener_count(EventKind::RestoreFailed), 0);
}

#[tokio::test]
async fn test_dispatch_outliving_deadline_runs_to_completion() {
    let host = Arc::new(
        FakeHost::new(Script::CompleteAfter(Duration::from_millis(120)))
            .with_dispatch_delay(Duration::from_millis(200))
            .with_snapshot(multi_window_session().into()),
    );

    let restored = controller(&host)
        .check_and_restore_session(Some(50.0))
        .await
        .unwrap();

    assert!(!restored);
    assert!(host.has_snapshot());
    assert_eq!(host.finished_dispatches.load(Ordering::SeqCst), 1);
    assert_eq!(host.bus.listener_count(EventKind::RestoreComplete), 0);
}

#[tokio::test]
async fn test_failure_signal_preserves_snapshot() {
    let host = Arc::new(
        FakeHost::new(Script::FailNow("doc-1: render error".to_string()))
            .with_snapshot(single_window_session().into()),
    );

    assert!(!controller(&host).check_and_restore_session(None).await.unwrap());
    assert!(host.has_snapshot());
}

#[tokio::test]
async fn test_first_signal_wins() {
    let host = Arc::new(
        FakeHost::new(Script::CompleteThenFail).with_snapshot(single_window_session().into()),
    );
    assert!(controller(&host).check_and_restore_session(None).await.unwrap());
    assert!(!host.has_snapshot());

    let host = Arc::new(
        FakeHost::new(Script::FailThenComplete).with_snapshot(single_window_session().into()),
    );
    assert!(!controller(&host).check_and_restore_session(None).await.unwrap());
    assert!(host.has_snapshot());
}

#[tokio::test]
async fn test_dispatch_rejection_propagates_and_preserves_snapshot() {
    let host = Arc::new(
        FakeHost::new(Script::Reject("no primary".to_string()))
            .with_snapshot(single_window_session().into()),
    );

    let err = controller(&host)
        .check_and_restore_session(None)
        .await
        .unwrap_err();
    assert!(matches!(err, HotExitError::Dispatch(_)));
    assert!(host.has_snapshot());
    assert_eq!(host.bus.listener_count(EventKind::RestoreComplete), 0);
    assert_eq!(host.bus.listener_count(EventKind::RestoreFailed), 0);
}

#[tokio::test]
async fn test_secondary_windows_use_multi_window_dispatch() {
    let host = host_with(Script::CompleteNow, multi_window_session());

    assert!(controller(&host).check_and_restore_session(None).await.unwrap());
    let dispatched = host.dispatched.lock().unwrap();
    assert_eq!(dispatched[0].0, "multi");
    assert_eq!(dispatched[0].1.windows.len(), 3);
}

#[tokio::test]
async fn test_v1_snapshot_is_migrated_before_dispatch() {
    let v1 = SessionDataV1 {
        version: 1,
        timestamp: chrono::Utc::now().timestamp(),
        app_version: "0.9.0".to_string(),
        windows: vec![WindowStateV1 {
            window_id: "main".to_string(),
            is_primary: true,
            active_tab_id: None,
            tabs: vec![TabStateV1 {
                id: "t1".to_string(),
                file_path: None,
                title: "Untitled-1".to_string(),
                is_pinned: false,
                document: DocumentStateV1 {
                    content: "hello".to_string(),
                    saved_content: String::new(),
                    is_dirty: true,
                    is_missing: false,
                    is_divergent: false,
                    line_ending: Default::default(),
                    cursor_info: None,
                    last_modified_timestamp: None,
                    is_untitled: true,
                    untitled_number: Some(1),
                },
            }],
            ui_state: UiState::default(),
            geometry: None,
        }],
        workspace: None,
    };
    let host = Arc::new(FakeHost::new(Script::CompleteNow).with_snapshot(VersionedSession::V1(v1)));

    assert!(controller(&host).check_and_restore_session(None).await.unwrap());
    let dispatched = host.dispatched.lock().unwrap();
    let session = &dispatched[0].1;
    assert_eq!(session.version, SCHEMA_VERSION);
    let document = &session.windows[0].tabs[0].document;
    assert_eq!(document.content, "hello");
    assert!(document.undo_history.is_empty());
    assert!(document.redo_history.is_empty());
}

#[tokio::test]
async fn test_cleanup_failure_keeps_success() {
    let mut host = FakeHost::new(Script::CompleteNow).with_snapshot(single_window_session().into());
    host.clear_fails = true;
    let host = Arc::new(host);

    assert!(controller(&host).check_and_restore_session(None).await.unwrap());
    assert!(host.has_snapshot());
}

#[tokio::test]
async fn test_overlapping_restore_check_is_ignored() {
    let host = host_with(Script::Silent, single_window_session());
    let controller = Arc::new(controller(&host));

    let first = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.check_and_restore_session(Some(200.0)).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!controller.check_and_restore_session(Some(200.0)).await.unwrap());
    assert!(!first.await.unwrap().unwrap());
    assert_eq!(host.dispatched.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_restore_check_raises_and_clears_coordination_flag() {
    let host = Arc::new(
        FakeHost::new(Script::CompleteAfter(Duration::from_millis(50)))
            .with_snapshot(single_window_session().into()),
    );
    let flag = Arc::new(CoordinationFlag::new());
    let controller = Arc::new(
        SessionController::new("main", WindowRole::Primary, host.clone())
            .with_coordination(flag.clone()),
    );

    let restore = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.check_and_restore_session(None).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(flag.is_in_progress());

    assert!(flag.wait_for_complete(Duration::from_secs(2)).await);
    assert!(restore.await.unwrap().unwrap());
    assert!(!flag.is_in_progress());
}

#[tokio::test]
async fn test_capture_and_restart_persists_then_relaunches() {
    let host = FakeHost::new(Script::Silent);
    *host.capture_result.lock().unwrap() = Some(Ok(multi_window_session()));
    let host = Arc::new(host);

    controller(&host).capture_and_restart().await.unwrap();
    assert_eq!(host.persisted.lock().unwrap().as_ref().map(|s| s.windows.len()), Some(3));
    assert_eq!(host.relaunches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_capture_failure_still_relaunches() {
    let host = FakeHost::new(Script::Silent);
    *host.capture_result.lock().unwrap() =
        Some(Err(HostError::CaptureTimeout(Duration::from_secs(5))));
    let host = Arc::new(host);

    controller(&host).capture_and_restart().await.unwrap();
    assert!(host.persisted.lock().unwrap().is_none());
    assert_eq!(host.relaunches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_persist_failure_still_relaunches() {
    let mut host = FakeHost::new(Script::Silent);
    host.persist_fails = true;
    *host.capture_result.lock().unwrap() = Some(Ok(single_window_session()));
    let host = Arc::new(host);

    controller(&host).capture_and_restart().await.unwrap();
    assert_eq!(host.relaunches.load(Ordering::SeqCst), 1);
}

#[test]
fn test_sanitize_timeout() {
    let default = Duration::from_millis(15_000);
    assert_eq!(sanitize_timeout(None, default), default);
    assert_eq!(sanitize_timeout(Some(f64::NAN), default), default);
    assert_eq!(sanitize_timeout(Some(f64::INFINITY), default), default);
    assert_eq!(sanitize_timeout(Some(-5.0), default), default);
    assert_eq!(sanitize_timeout(Some(0.0), default), default);
    assert_eq!(sanitize_timeout(Some(250.0), default), Duration::from_millis(250));
}

#[tokio::test]
async fn test_handshake_catches_signal_emitted_during_dispatch() {
    let bus = EventBus::new();
    let handshake = RestoreHandshake::arm(&bus).await;

    let settled = handshake
        .run(Duration::from_secs(1), async {
            bus.emit(HotExitEvent::RestoreFailed {
                error: "boom".to_string(),
            });
            bus.emit(HotExitEvent::RestoreComplete);
            Ok::<_, HostError>("dispatched")
        })
        .await
        .unwrap();

    assert_eq!(settled.outcome, HandshakeOutcome::Failed("boom".to_string()));
    assert_eq!(settled.dispatched, "dispatched");
    assert_eq!(bus.listener_count(EventKind::RestoreComplete), 0);
}

#[tokio::test]
async fn test_handshake_lets_slow_dispatch_finish_after_deadline() {
    let bus = EventBus::new();
    let handshake = RestoreHandshake::arm(&bus).await;
    let finished = AtomicU32::new(0);

    let started = tokio::time::Instant::now();
    let settled = handshake
        .run(Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_millis(150)).await;
            finished.fetch_add(1, Ordering::SeqCst);
            Ok::<_, HostError>(2)
        })
        .await
        .unwrap();

    assert_eq!(settled.outcome, HandshakeOutcome::TimedOut);
    assert_eq!(settled.dispatched, 2);
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert!(started.elapsed() >= Duration::from_millis(150));
    assert_eq!(bus.listener_count(EventKind::RestoreFailed), 0);
}

#[tokio::test]
async fn test_handshake_signal_after_deadline_does_not_win() {
    let bus = EventBus::new();
    let handshake = RestoreHandshake::arm(&bus).await;

    let settled = handshake
        .run(Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            bus.emit(HotExitEvent::RestoreComplete);
            Ok::<_, HostError>(())
        })
        .await
        .unwrap();

    assert_eq!(settled.outcome, HandshakeOutcome::TimedOut);
}

#[tokio::test]
async fn test_handshake_signal_before_slow_dispatch_returns() {
    let bus = EventBus::new();
    let handshake = RestoreHandshake::arm(&bus).await;

    let settled = handshake
        .run(Duration::from_secs(1), async {
            bus.emit(HotExitEvent::RestoreComplete);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, HostError>("created")
        })
        .await
        .unwrap();

    assert_eq!(settled.outcome, HandshakeOutcome::Completed);
    assert_eq!(settled.dispatched, "created");
}

#[tokio::test]
async fn test_handshake_dispatch_error_releases_listeners() {
    let bus = EventBus::new();
    let handshake = RestoreHandshake::arm(&bus).await;
    assert_eq!(bus.listener_count(EventKind::RestoreComplete), 1);

    let result = handshake
        .run(Duration::from_secs(1), async {
            Err::<(), _>(HostError::NoPrimaryWindow)
        })
        .await;

    assert!(matches!(result, Err(HostError::NoPrimaryWindow)));
    assert_eq!(bus.listener_count(EventKind::RestoreComplete), 0);
    assert_eq!(bus.listener_count(EventKind::RestoreFailed), 0);
}

#[tokio::test]
async fn test_wait_resolves_immediately_when_clear() {
    let flag = CoordinationFlag::new();
    assert!(flag.wait_for_complete(Duration::from_millis(1)).await);
}

#[tokio::test]
async fn test_notify_releases_every_waiter() {
    let flag = Arc::new(CoordinationFlag::new());
    flag.set_in_progress(true);

    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let flag = flag.clone();
            tokio::spawn(async move { flag.wait_for_complete(Duration::from_secs(2)).await })
        })
        .collect();
    tokio::time::sleep(Duration::from_millis(20)).await;

    flag.notify_complete();
    for waiter in waiters {
        assert!(waiter.await.unwrap());
    }
    assert!(!flag.is_in_progress());
}

#[tokio::test]
async fn test_wait_times_out_while_in_progress() {
    let flag = CoordinationFlag::new();
    flag.set_in_progress(true);
    assert!(!flag.wait_for_complete(Duration::from_millis(20)).await);
    assert!(flag.is_in_progress());
}

#[tokio::test]
#[serial]
async fn test_global_flag_is_shared_and_resettable() {
    let flag = CoordinationFlag::global();
    flag.reset();

    CoordinationFlag::global().set_in_progress(true);
    assert!(flag.is_in_progress());

    flag.reset();
    assert!(!CoordinationFlag::global().is_in_progress());
}
