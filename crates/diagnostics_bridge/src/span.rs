use crate::error::PayloadError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

/// A single trace span as handed over by the test process.
///
/// The bridge treats records as immutable: it decodes them, reads the name for
/// logging and translates them to the wire form. Nothing else inspects fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanRecord {
    /// Unique trace identifier (128-bit)
    pub trace_id: u128,
    /// Unique span identifier (64-bit)
    pub span_id: u64,
    /// Parent span identifier (0 if root span)
    #[serde(default)]
    pub parent_span_id: u64,
    /// Span start time (Unix nanoseconds)
    pub start_time: u64,
    /// Span end time (Unix nanoseconds)
    pub end_time: u64,
    /// Operation name
    pub name: String,
    /// Span attributes
    #[serde(default)]
    pub attributes: HashMap<String, AttributeValue>,
    #[serde(default = "SpanStatus::unset")]
    pub status: SpanStatus,
    #[serde(default = "SpanKind::internal")]
    pub kind: SpanKind,
}

/// Attribute value types for span metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<String>),
}

/// Span execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpanStatus {
    /// Span completed successfully
    Ok,
    /// Span completed with error
    Error,
    /// Span status unknown
    Unset,
}

impl SpanStatus {
    fn unset() -> Self {
        Self::Unset
    }
}

/// Span kind according to OpenTelemetry specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpanKind {
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
}

impl SpanKind {
    fn internal() -> Self {
        Self::Internal
    }
}

fn unix_nanos_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

impl SpanRecord {
    /// Creates a new span starting now
    pub fn new(trace_id: u128, span_id: u64, parent_span_id: u64, name: String, kind: SpanKind) -> Self {
        let now = unix_nanos_now();

        Self {
            trace_id,
            span_id,
            parent_span_id,
            start_time: now,
            end_time: now,
            name,
            attributes: HashMap::new(),
            status: SpanStatus::Unset,
            kind,
        }
    }

    /// Marks the span as completed with the given status
    pub fn finish(&mut self, status: SpanStatus) {
        self.end_time = unix_nanos_now();
        self.status = status;
    }

    /// Adds an attribute to the span
    pub fn set_attribute(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.attributes.insert(key.into(), value);
    }

    /// Decodes a span from the payload bytes delivered over the IPC boundary.
    pub fn from_payload(payload: &[u8]) -> Result<Self, PayloadError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Encodes the span the way producers hand it to the bridge.
    pub fn to_payload(&self) -> Result<Vec<u8>, PayloadError> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_keeps_attributes() {
        let mut span = SpanRecord::new(7, 42, 1, "checkout".to_string(), SpanKind::Client);
        span.set_attribute("http.status_code", AttributeValue::Int(200));
        span.set_attribute("retry", AttributeValue::Bool(false));
        span.finish(SpanStatus::Ok);

        let payload = span.to_payload().unwrap();
        let decoded = SpanRecord::from_payload(&payload).unwrap();

        assert_eq!(decoded, span);
    }

    #[test]
    fn test_payload_defaults_optional_fields() {
        let payload = br#"{"trace_id":1,"span_id":2,"start_time":10,"end_time":25,"name":"boot"}"#;
        let span = SpanRecord::from_payload(payload).unwrap();

        assert_eq!(span.parent_span_id, 0);
        assert_eq!(span.status, SpanStatus::Unset);
        assert_eq!(span.kind, SpanKind::Internal);
        assert!(span.attributes.is_empty());
    }

    #[test]
    fn test_corrupt_payload_is_rejected() {
        let result = SpanRecord::from_payload(b"\xac\xed\x00\x05not-a-span");
        assert!(matches!(result, Err(PayloadError::Malformed(_))));
    }
}
