//! `livefeed-hub`: in-memory fan-out of published events to SSE subscribers.
//!
//! # Overview
//!
//! A [`BroadcastHub`] owns a [`registry::SubscriberRegistry`]. Each call to
//! [`BroadcastHub::subscribe`] creates a [`subscriber::Subscriber`] with its
//! own bounded queue and heartbeat timer and hands back a [`Subscription`]
//! stream. [`BroadcastHub::publish`] encodes the event once and writes it to
//! a snapshot of the registry without ever waiting on a subscriber.
//!
//! # Subscriber lifecycle
//!
//! | Event                          | Effect                                   |
//! |--------------------------------|------------------------------------------|
//! | `subscribe` / `attach`         | handle built, registered, heartbeat armed |
//! | `Subscription` dropped         | `disconnect(ClientClosed)`               |
//! | write fails (closed or full)   | `disconnect(WriteFailed)`                |
//! | `shutdown`                     | hub closed, `disconnect(Shutdown)` for every handle |
//!
//! Only the first disconnect of a handle tears it down; later ones are no-ops.

pub mod error;
pub mod heartbeat;
pub mod hub;
pub mod registry;
pub mod sink;
pub mod subscriber;

pub use error::SinkError;
pub use hub::{BroadcastHub, DisconnectReason, Subscription};
pub use sink::FrameSink;
pub use subscriber::SubscriberId;
