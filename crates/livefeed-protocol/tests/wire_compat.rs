// Verify the event-stream format matches what browser EventSource clients expect.
// These tests ensure the feed stays readable by existing viewers.

use livefeed_protocol::{Envelope, Frame, DEFAULT_EVENT};
use serde_json::json;

#[test]
fn structured_payload_round_trip() {
    let original = Envelope::normalize(json!({"text": "deploy finished", "env": "prod", "n": 7}));
    let bytes = Frame::Message(original.clone()).encode();
    let wire = std::str::from_utf8(&bytes).unwrap();

    let frames = Frame::parse_stream(wire);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].event, DEFAULT_EVENT);
    assert_eq!(frames[0].envelope().unwrap(), original);
}

#[test]
fn fallback_payload_round_trip() {
    let original = Envelope::normalize(json!("raw string"));
    let bytes = Frame::Message(original).encode();
    let wire = std::str::from_utf8(&bytes).unwrap();

    assert_eq!(wire, "data: {\"text\":\"raw string\"}\n\n");
    let decoded = Frame::parse_stream(wire)[0].envelope().unwrap();
    assert_eq!(decoded.to_value(), json!({"text": "raw string"}));
}

#[test]
fn every_frame_is_blank_line_terminated() {
    let frames = [
        Frame::Message(Envelope::text("multi\nline")),
        Frame::Ping { ts_ms: 1 },
    ];
    for frame in frames {
        let bytes = frame.encode();
        let wire = std::str::from_utf8(&bytes).unwrap();
        assert!(wire.ends_with("\n\n"), "missing terminator: {wire:?}");
        // a single blank line, only at the end
        assert_eq!(wire.matches("\n\n").count(), 1);
    }
}

#[test]
fn ping_data_is_unix_millis() {
    let before = chrono::Utc::now().timestamp_millis();
    let bytes = Frame::ping_now().encode();
    let after = chrono::Utc::now().timestamp_millis();

    let parsed = Frame::parse(std::str::from_utf8(&bytes).unwrap()).unwrap();
    assert!(parsed.is_ping());
    let ts: i64 = parsed.data.parse().unwrap();
    assert!(ts >= before && ts <= after);
}

#[test]
fn concatenated_stream_keeps_order() {
    let mut wire = String::new();
    for frame in [
        Frame::Ping { ts_ms: 10 },
        Frame::Message(Envelope::text("a")),
        Frame::Message(Envelope::text("b")),
        Frame::Ping { ts_ms: 20 },
    ] {
        wire.push_str(std::str::from_utf8(&frame.encode()).unwrap());
    }

    let events: Vec<String> = Frame::parse_stream(&wire)
        .into_iter()
        .map(|f| format!("{}:{}", f.event, f.data))
        .collect();
    assert_eq!(
        events,
        vec![
            "ping:10",
            "message:{\"text\":\"a\"}",
            "message:{\"text\":\"b\"}",
            "ping:20",
        ]
    );
}
