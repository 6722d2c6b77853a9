use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::SinkError;

/// Output side of one subscriber connection.
///
/// Writes must not block: the hub calls `try_write` while fanning out to every
/// subscriber, and a sink that cannot accept a frame right now reports
/// [`SinkError::Full`] instead of waiting.
pub trait FrameSink: Send + Sync {
    fn try_write(&self, frame: Bytes) -> Result<(), SinkError>;
}

impl FrameSink for mpsc::Sender<Bytes> {
    fn try_write(&self, frame: Bytes) -> Result<(), SinkError> {
        self.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Full,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}
