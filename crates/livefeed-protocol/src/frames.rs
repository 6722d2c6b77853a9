use bytes::Bytes;

use crate::envelope::Envelope;

/// Event type an EventSource reports when a frame carries no `event:` line.
pub const DEFAULT_EVENT: &str = "message";
/// Event type of heartbeat frames.
pub const PING_EVENT: &str = "ping";

/// Server → subscriber unit on the event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Wire: `data: {"text":"hello"}\n\n`
    Message(Envelope),
    /// Wire: `event: ping\ndata: 1718000000000\n\n` (producer clock, unix ms)
    Ping { ts_ms: i64 },
}

impl Frame {
    pub fn ping_now() -> Self {
        Frame::Ping {
            ts_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Serialize to `text/event-stream` bytes, blank-line terminated.
    ///
    /// Messages use the default event type and therefore omit the `event:`
    /// line, so browsers deliver them to `EventSource.onmessage`.
    pub fn encode(&self) -> Bytes {
        let text = match self {
            Frame::Message(envelope) => format!("data: {}\n\n", envelope.to_json()),
            Frame::Ping { ts_ms } => format!("event: {}\ndata: {}\n\n", PING_EVENT, ts_ms),
        };
        Bytes::from(text)
    }

    /// Parse one event block (the text between two blank lines).
    ///
    /// Follows EventSource field rules: `field: value` or `field:value`,
    /// comment lines start with `:`, repeated `data` lines join with `\n`.
    /// Returns `None` for blocks without data, which an EventSource would
    /// not dispatch either.
    pub fn parse(block: &str) -> Option<ParsedFrame> {
        let mut event: Option<String> = None;
        let mut data: Option<String> = None;

        for line in block.lines() {
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => event = Some(value.to_string()),
                "data" => match data.as_mut() {
                    Some(buf) => {
                        buf.push('\n');
                        buf.push_str(value);
                    }
                    None => data = Some(value.to_string()),
                },
                _ => {}
            }
        }

        Some(ParsedFrame {
            event: event
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| DEFAULT_EVENT.to_string()),
            data: data?,
        })
    }

    /// Split a captured stream into its frames. A trailing partial block
    /// (no terminating blank line yet) is ignored.
    pub fn parse_stream(stream: &str) -> Vec<ParsedFrame> {
        let mut blocks: Vec<&str> = stream.split("\n\n").collect();
        // the piece after the last separator is incomplete or empty
        blocks.pop();
        blocks.into_iter().filter_map(Frame::parse).collect()
    }
}

/// A decoded event block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFrame {
    pub event: String,
    pub data: String,
}

impl ParsedFrame {
    pub fn is_ping(&self) -> bool {
        self.event == PING_EVENT
    }

    /// Payload of a message frame, renormalized. `None` for other event types.
    pub fn envelope(&self) -> Option<Envelope> {
        (self.event == DEFAULT_EVENT).then(|| Envelope::normalize_text(&self.data))
    }
}
