use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::GenerationError;

/// Fixed-delay repeating executor.
///
/// Runs one callback, waits `interval` after it completes, runs it again, until
/// `cancel()` is called. Cycles never overlap, even across a cancel and
/// restart: a new loop waits for the old loop's in-flight cycle. An `Err` from the callback is
/// logged and the loop keeps going; only `cancel()` stops it.
#[derive(Clone)]
pub struct Poller {
    interval: Duration,
    state: Arc<Mutex<PollerState>>,
    /// Held for the duration of each callback run.
    cycle_gate: Arc<tokio::sync::Mutex<()>>,
}

#[derive(Default)]
struct PollerState {
    /// Token of the live loop. `None` = not running.
    token: Option<CancellationToken>,
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("interval", &self.interval)
            .field("polling", &self.is_polling())
            .finish()
    }
}

impl Poller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: Arc::new(Mutex::new(PollerState::default())),
            cycle_gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the loop and run the first cycle immediately.
    /// Returns false (and does nothing) if a loop is already running.
    pub fn start<F, Fut>(&self, callback: F) -> bool
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), GenerationError>> + Send + 'static,
    {
        let token = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.token.is_some() {
                return false;
            }
            let token = CancellationToken::new();
            state.token = Some(token.clone());
            token
        };

        let interval = self.interval;
        let gate = Arc::clone(&self.cycle_gate);
        tokio::spawn(async move {
            let mut cycle: u64 = 0;
            loop {
                let result = {
                    let _running = gate.lock().await;
                    if token.is_cancelled() {
                        break;
                    }
                    cycle += 1;
                    callback().await
                };
                if let Err(e) = result {
                    tracing::warn!(cycle, "poll cycle failed: {e}");
                }
                // An in-flight cycle may finish after cancel(), but it must not
                // schedule another one.
                if token.is_cancelled() {
                    break;
                }
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            tracing::debug!(cycles = cycle, "poller stopped");
        });

        true
    }

    /// Stop the loop. Idempotent.
    pub fn cancel(&self) {
        let token = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.token.take()
        };
        if let Some(token) = token {
            token.cancel();
        }
    }

    pub fn is_polling(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.token.is_some()
    }
}
