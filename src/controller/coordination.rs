use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

static GLOBAL: OnceLock<Arc<CoordinationFlag>> = OnceLock::new();

#[derive(Debug, Default)]
struct FlagState {
    in_progress: bool,
    waiters: Vec<oneshot::Sender<()>>,
}

/// Process-wide gate that lets unrelated startup work wait until restore has
/// had its chance to run.
#[derive(Debug, Default)]
pub struct CoordinationFlag {
    state: Mutex<FlagState>,
}

impl CoordinationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// The one flag shared by the whole process.
    pub fn global() -> Arc<Self> {
        GLOBAL.get_or_init(|| Arc::new(Self::new())).clone()
    }

    pub fn set_in_progress(&self, in_progress: bool) {
        let mut state = self.lock();
        state.in_progress = in_progress;
        if !in_progress {
            release(&mut state);
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.lock().in_progress
    }

    /// Resolve once the flag clears. Returns false if `timeout` passes first.
    pub async fn wait_for_complete(&self, timeout: Duration) -> bool {
        let receiver = {
            let mut state = self.lock();
            if !state.in_progress {
                return true;
            }
            state.waiters.retain(|waiter| !waiter.is_closed());
            let (sender, receiver) = oneshot::channel();
            state.waiters.push(sender);
            receiver
        };

        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(())) => true,
            Ok(Err(_)) => !self.is_in_progress(),
            Err(_) => {
                debug!("Gave up waiting for restore after {:?}", timeout);
                false
            }
        }
    }

    /// Clear the flag and release every pending waiter once.
    pub fn notify_complete(&self) {
        let mut state = self.lock();
        state.in_progress = false;
        release(&mut state);
    }

    /// Drop all state. Test hook for the process-wide instance.
    #[doc(hidden)]
    pub fn reset(&self) {
        let mut state = self.lock();
        state.in_progress = false;
        state.waiters.clear();
    }

    fn lock(&self) -> MutexGuard<'_, FlagState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn release(state: &mut FlagState) {
    let waiters = std::mem::take(&mut state.waiters);
    if !waiters.is_empty() {
        debug!("Releasing {} restore waiters", waiters.len());
    }
    for waiter in waiters {
        let _ = waiter.send(());
    }
}
