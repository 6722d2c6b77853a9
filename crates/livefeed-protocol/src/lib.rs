//! Wire format for the live feed.
//!
//! Publishers send arbitrary bodies; [`envelope::Envelope::normalize`] turns
//! them into a canonical payload. Subscribers receive a `text/event-stream`
//! where each unit is a [`frames::Frame`]:
//!
//! ```text
//! data: {"text":"hello"}
//!
//! event: ping
//! data: 1718000000000
//!
//! ```

pub mod envelope;
pub mod frames;

pub use envelope::Envelope;
pub use frames::{Frame, ParsedFrame, DEFAULT_EVENT, PING_EVENT};
