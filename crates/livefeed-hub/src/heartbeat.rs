use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::SinkError;

/// Handle to one subscriber's keepalive task.
///
/// Ticks run under `gate`; [`HeartbeatTimer::stop`] takes the same lock, so
/// once `stop` returns no tick is running and none will start.
pub struct HeartbeatTimer {
    gate: Arc<Mutex<bool>>,
    cancel: CancellationToken,
}

/// Spawn a keepalive task on the current tokio runtime.
///
/// `tick` runs every `period`, first one `period` after start. When it fails,
/// the loop ends and `on_failure` runs outside the gate, so it may call back
/// into [`HeartbeatTimer::stop`] (through the hub's disconnect path) freely.
pub fn start<T, F>(period: Duration, mut tick: T, on_failure: F) -> HeartbeatTimer
where
    T: FnMut() -> Result<(), SinkError> + Send + 'static,
    F: FnOnce(SinkError) + Send + 'static,
{
    let gate = Arc::new(Mutex::new(false));
    let cancel = CancellationToken::new();

    let task_gate = Arc::clone(&gate);
    let task_cancel = cancel.clone();
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        // a stalled runtime should not burst several pings at once
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = task_cancel.cancelled() => break,
                _ = interval.tick() => {
                    let outcome = {
                        let stopped = task_gate.lock().unwrap_or_else(PoisonError::into_inner);
                        if *stopped {
                            break;
                        }
                        tick()
                    };
                    if let Err(e) = outcome {
                        on_failure(e);
                        break;
                    }
                }
            }
        }
    });

    HeartbeatTimer { gate, cancel }
}

impl HeartbeatTimer {
    /// Stop the timer. Idempotent; blocks only while an in-flight tick finishes.
    pub fn stop(&self) {
        let mut stopped = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        *stopped = true;
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        *self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// Drop only cancels: the last owner may be a tick that is itself holding the gate.
impl Drop for HeartbeatTimer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
