use thiserror::Error;

/// Why a frame could not be handed to a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The receiving side is gone (client disconnected or stream torn down).
    #[error("subscriber sink closed")]
    Closed,

    /// The subscriber's queue is full; it is not keeping up with the feed.
    #[error("subscriber sink full")]
    Full,
}
