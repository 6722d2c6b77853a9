use serde::Serialize;
use serde_json::{Map, Value};

/// One unit of broadcast content.
///
/// Wire: a `Structured` envelope serializes as the object itself,
/// a `Fallback` one as `{"text": "..."}`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    /// Publisher sent a non-empty JSON object; forwarded untouched.
    Structured(Map<String, Value>),
    /// Anything else, coerced to text.
    Fallback { text: String },
}

impl Envelope {
    pub fn text(text: impl Into<String>) -> Self {
        Envelope::Fallback { text: text.into() }
    }

    /// Canonicalize a parsed publish body.
    ///
    /// Non-empty objects pass through. Strings become their own text,
    /// null and `{}` become empty text, every other value becomes its JSON text.
    pub fn normalize(value: Value) -> Self {
        match value {
            Value::Object(map) if !map.is_empty() => Envelope::Structured(map),
            Value::Object(_) | Value::Null => Envelope::text(String::new()),
            Value::String(s) => Envelope::text(s),
            other => Envelope::text(other.to_string()),
        }
    }

    /// Canonicalize a raw body. Input that is not JSON is kept verbatim as
    /// fallback text; publishing never rejects a body.
    pub fn normalize_text(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::normalize(value),
            Err(_) => Envelope::text(raw),
        }
    }

    /// The JSON value subscribers will decode from the `data:` line.
    pub fn to_value(&self) -> Value {
        match self {
            Envelope::Structured(map) => Value::Object(map.clone()),
            Envelope::Fallback { text } => {
                let mut map = Map::with_capacity(1);
                map.insert("text".to_string(), Value::String(text.clone()));
                Value::Object(map)
            }
        }
    }

    /// Compact JSON encoding. Never contains a raw newline, so it is always
    /// safe on a single `data:` line.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Envelopes compare by the payload subscribers see: `Structured({"text": "a"})`
/// equals `Fallback { text: "a" }`.
impl PartialEq for Envelope {
    fn eq(&self, other: &Self) -> bool {
        self.to_value() == other.to_value()
    }
}
