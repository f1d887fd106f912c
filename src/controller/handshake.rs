use crate::host::{EventBus, EventKind, HotExitEvent, Subscription};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// How a restore handshake settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    Completed,
    Failed(String),
    TimedOut,
}

/// Settled handshake plus whatever the dispatch returned.
#[derive(Debug)]
pub struct Settled<T> {
    pub outcome: HandshakeOutcome,
    pub dispatched: T,
}

/// Completion listeners armed ahead of a restore dispatch.
///
/// Completion and failure share one ordered channel, so the first signal
/// observed is the first one emitted. `run` consumes the handshake and the
/// listeners are removed on every exit path when it returns.
pub struct RestoreHandshake {
    subscription: Subscription,
}

impl RestoreHandshake {
    /// Register both completion listeners. They are active once this returns,
    /// so a signal emitted synchronously by the dispatch is still observed.
    pub async fn arm(bus: &EventBus) -> Self {
        let subscription = bus
            .listen(&[EventKind::RestoreComplete, EventKind::RestoreFailed])
            .await;
        debug!("Restore handshake armed");
        Self { subscription }
    }

    /// Start the deadline, issue `dispatch` and wait for the first of
    /// completion, failure or timeout. A dispatch error tears the listeners
    /// down and is returned as-is.
    ///
    /// The dispatch is never cancelled: when the handshake settles first, `run`
    /// keeps driving the dispatch until it returns. Signals emitted after the
    /// handshake settled are ignored.
    pub async fn run<T, E, F>(self, timeout: Duration, dispatch: F) -> Result<Settled<T>, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let mut subscription = self.subscription;
        let deadline = tokio::time::sleep_until(Instant::now() + timeout);
        tokio::pin!(deadline);
        tokio::pin!(dispatch);

        let mut outcome = None;
        let mut dispatched = None;
        loop {
            tokio::select! {
                biased;
                result = &mut dispatch, if dispatched.is_none() => {
                    dispatched = Some(result?);
                }
                signal = first_signal(&mut subscription), if outcome.is_none() => {
                    outcome = Some(signal);
                }
                () = &mut deadline, if outcome.is_none() => {
                    debug!("Restore deadline passed");
                    outcome = Some(HandshakeOutcome::TimedOut);
                }
            }

            match (outcome, dispatched) {
                (Some(settled), Some(value)) => {
                    debug!("Restore handshake settled: {:?}", settled);
                    return Ok(Settled {
                        outcome: settled,
                        dispatched: value,
                    });
                }
                (pending_outcome, pending_value) => {
                    outcome = pending_outcome;
                    dispatched = pending_value;
                }
            }
        }
    }
}

async fn first_signal(subscription: &mut Subscription) -> HandshakeOutcome {
    loop {
        match subscription.recv().await {
            Some(HotExitEvent::RestoreComplete) => return HandshakeOutcome::Completed,
            Some(HotExitEvent::RestoreFailed { error }) => return HandshakeOutcome::Failed(error),
            Some(_) => continue,
            None => return HandshakeOutcome::Failed("event bus closed".to_string()),
        }
    }
}
