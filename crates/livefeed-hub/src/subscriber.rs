use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use bytes::Bytes;
use livefeed_protocol::Frame;
use uuid::Uuid;

use crate::error::SinkError;
use crate::heartbeat::{self, HeartbeatTimer};
use crate::sink::FrameSink;

/// Unique subscriber identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One live streaming connection.
///
/// The sink and the heartbeat are both `Option`s that [`Subscriber::close`]
/// takes exactly once. Every write, from a publish or a heartbeat tick, goes
/// through the `sink` lock, which keeps frames for one subscriber in issue
/// order and makes writes after `close` impossible.
pub struct Subscriber {
    id: SubscriberId,
    sink: Mutex<Option<Box<dyn FrameSink>>>,
    heartbeat: Mutex<Option<HeartbeatTimer>>,
}

impl Subscriber {
    pub(crate) fn new(id: SubscriberId, sink: Box<dyn FrameSink>) -> Arc<Self> {
        Arc::new(Subscriber {
            id,
            sink: Mutex::new(Some(sink)),
            heartbeat: Mutex::new(None),
        })
    }

    /// Arm the keepalive timer. The hub calls this once the subscriber is
    /// registered, so a failed ping always finds it in the registry.
    ///
    /// A subscriber owns at most one timer: later calls, and calls after
    /// [`Subscriber::close`], do nothing. Each tick writes a ping through the
    /// same path as a publish; a failed ping hands the error to
    /// `on_ping_failure`.
    pub(crate) fn start_heartbeat<F>(self: &Arc<Self>, period: Duration, on_ping_failure: F)
    where
        F: FnOnce(SinkError) + Send + 'static,
    {
        let mut slot = self.heartbeat.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() || self.is_closed() {
            return;
        }
        let weak: Weak<Subscriber> = Arc::downgrade(self);
        *slot = Some(heartbeat::start(
            period,
            move || match weak.upgrade() {
                Some(subscriber) => subscriber.write(Frame::ping_now().encode()),
                None => Err(SinkError::Closed),
            },
            on_ping_failure,
        ));
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Hand one encoded frame to the sink without waiting.
    pub fn write(&self, frame: Bytes) -> Result<(), SinkError> {
        let sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        match sink.as_ref() {
            Some(sink) => sink.try_write(frame),
            None => Err(SinkError::Closed),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Stop the heartbeat, then drop the sink. Safe to call more than once.
    ///
    /// The heartbeat goes first and no other lock is held while stopping it,
    /// because a tick in flight holds the timer gate while it waits on `sink`.
    /// A timer armed concurrently with `close` finds the sink gone on its
    /// first tick and ends there.
    pub(crate) fn close(&self) {
        let timer = self
            .heartbeat
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(timer) = timer {
            timer.stop();
        }
        let sink = self
            .sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(sink);
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct CountingSink(Arc<AtomicUsize>);

    impl FrameSink for CountingSink {
        fn try_write(&self, _frame: Bytes) -> Result<(), SinkError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn no_pings_until_heartbeat_is_armed() {
        let sink = CountingSink::default();
        let subscriber = Subscriber::new(SubscriberId::new(), Box::new(sink.clone()));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(sink.0.load(Ordering::SeqCst), 0);

        subscriber.start_heartbeat(Duration::from_secs(1), |_| {});
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(sink.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn second_arm_does_not_add_a_timer() {
        let sink = CountingSink::default();
        let subscriber = Subscriber::new(SubscriberId::new(), Box::new(sink.clone()));

        subscriber.start_heartbeat(Duration::from_secs(1), |_| {});
        subscriber.start_heartbeat(Duration::from_secs(1), |_| {});
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(sink.0.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn arming_after_close_is_a_no_op() {
        let sink = CountingSink::default();
        let subscriber = Subscriber::new(SubscriberId::new(), Box::new(sink.clone()));
        subscriber.close();

        let failures = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&failures);
        subscriber.start_heartbeat(Duration::from_secs(1), move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(subscriber.is_closed());
        assert_eq!(sink.0.load(Ordering::SeqCst), 0);
        assert_eq!(failures.load(Ordering::SeqCst), 0);
    }
}
