use std::convert::Infallible;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::Stream;
use livefeed_core::HubConfig;
use livefeed_protocol::{Envelope, Frame};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::SinkError;
use crate::registry::SubscriberRegistry;
use crate::sink::FrameSink;
use crate::subscriber::{Subscriber, SubscriberId};

/// Why a subscriber left the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The transport closed the connection (subscription dropped).
    ClientClosed,
    /// A publish or heartbeat write failed.
    WriteFailed(SinkError),
    /// The hub is shutting down.
    Shutdown,
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisconnectReason::ClientClosed => write!(f, "client closed"),
            DisconnectReason::WriteFailed(e) => write!(f, "write failed: {e}"),
            DisconnectReason::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Fan-out of published events to every connected subscriber.
///
/// Cheap to clone; all clones share one registry.
#[derive(Clone)]
pub struct BroadcastHub {
    shared: Arc<Shared>,
}

struct Shared {
    registry: SubscriberRegistry,
    config: HubConfig,
    /// Set by `shutdown`; no subscriber is admitted afterwards.
    closed: AtomicBool,
}

impl BroadcastHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: SubscriberRegistry::new(),
                config,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Open a new subscriber stream.
    ///
    /// The returned [`Subscription`] yields encoded frames for as long as the
    /// caller keeps it; dropping it disconnects the subscriber. The queue
    /// holds `sink_capacity` frames, past that the subscriber is dropped.
    /// After [`BroadcastHub::shutdown`] the subscription is already ended.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.shared.config.sink_capacity.max(1));
        let id = self.attach(tx);
        Subscription {
            id,
            rx,
            hub: self.clone(),
        }
    }

    /// Register any [`FrameSink`] as a subscriber and start its heartbeat.
    ///
    /// Once the hub is shut down the sink is dropped unregistered.
    pub fn attach(&self, sink: impl FrameSink + 'static) -> SubscriberId {
        let id = SubscriberId::new();
        if self.shared.closed.load(Ordering::SeqCst) {
            debug!(subscriber_id = %id, "hub shut down, subscriber refused");
            return id;
        }

        let subscriber = Subscriber::new(id, Box::new(sink));
        self.shared.registry.register(Arc::clone(&subscriber));
        // a shutdown that ran between the check and the register missed us
        if self.shared.closed.load(Ordering::SeqCst) {
            self.shared.disconnect(&id, DisconnectReason::Shutdown);
            return id;
        }

        let weak = Arc::downgrade(&self.shared);
        subscriber.start_heartbeat(self.shared.config.heartbeat_interval(), move |err| {
            if let Some(shared) = weak.upgrade() {
                shared.disconnect(&id, DisconnectReason::WriteFailed(err));
            }
        });
        info!(subscriber_id = %id, clients = self.shared.registry.len(), "subscriber connected");
        id
    }

    /// Normalize a publish body and broadcast it.
    ///
    /// Returns how many subscribers a write was attempted for, failed or not.
    pub fn publish(&self, raw: Value) -> usize {
        self.publish_envelope(Envelope::normalize(raw))
    }

    /// Broadcast an already-normalized envelope.
    ///
    /// The frame is encoded once and shared. Writes never wait: a subscriber
    /// whose sink is closed or full is disconnected and the pass moves on.
    pub fn publish_envelope(&self, envelope: Envelope) -> usize {
        let frame = Frame::Message(envelope).encode();
        let snapshot = self.shared.registry.snapshot();
        let attempted = snapshot.len();

        let mut failed = 0usize;
        for subscriber in snapshot {
            if let Err(e) = subscriber.write(frame.clone()) {
                failed += 1;
                self.shared
                    .disconnect(&subscriber.id(), DisconnectReason::WriteFailed(e));
            }
        }

        debug!(attempted, failed, bytes = frame.len(), "event published");
        attempted
    }

    /// Transport-side close. Returns `true` only for the call that removed it.
    pub fn disconnect(&self, id: &SubscriberId) -> bool {
        self.shared.disconnect(id, DisconnectReason::ClientClosed)
    }

    pub fn client_count(&self) -> usize {
        self.shared.registry.len()
    }

    pub fn is_connected(&self, id: &SubscriberId) -> bool {
        self.shared.registry.contains(id)
    }

    /// Ids of the current subscribers.
    pub fn subscribers(&self) -> Vec<SubscriberId> {
        self.shared.registry.ids()
    }

    /// Close the hub and disconnect everyone, ending every open stream.
    ///
    /// Later `subscribe`/`attach` calls get a stream that has already ended.
    pub fn shutdown(&self) -> usize {
        self.shared.closed.store(true, Ordering::SeqCst);
        let dropped = self
            .shared
            .registry
            .ids()
            .iter()
            .filter(|id| self.shared.disconnect(id, DisconnectReason::Shutdown))
            .count();
        info!(dropped, "hub shut down");
        dropped
    }
}

impl Shared {
    fn disconnect(&self, id: &SubscriberId, reason: DisconnectReason) -> bool {
        let Some(subscriber) = self.registry.unregister(id) else {
            return false;
        };
        subscriber.close();

        let clients = self.registry.len();
        match reason {
            DisconnectReason::WriteFailed(_) => {
                warn!(subscriber_id = %id, clients, %reason, "subscriber dropped")
            }
            _ => info!(subscriber_id = %id, clients, %reason, "subscriber disconnected"),
        }
        true
    }
}

/// Live output of one subscriber: a stream of encoded SSE frames.
///
/// Ends when the hub tears the subscriber down. Dropping it is the
/// transport's way of saying the client went away.
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Bytes>,
    hub: BroadcastHub,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next frame, or `None` once the subscriber has been disconnected and
    /// everything queued before that has been read.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Next already-queued frame, without waiting.
    pub fn try_recv(&mut self) -> Option<Bytes> {
        self.rx.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx).map(|frame| frame.map(Ok))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.disconnect(&self.id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
