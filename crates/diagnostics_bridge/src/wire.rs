//! Wire representation of spans sent to the diagnostics collector.

use crate::span::{AttributeValue, SpanKind, SpanRecord, SpanStatus};
use prost::Message;

/// A span as it travels to the collector.
#[derive(Clone, PartialEq, Message)]
pub struct SpanMessage {
    /// 16 bytes, big-endian
    #[prost(bytes = "vec", tag = "1")]
    pub trace_id: Vec<u8>,
    #[prost(fixed64, tag = "2")]
    pub span_id: u64,
    #[prost(fixed64, tag = "3")]
    pub parent_span_id: u64,
    #[prost(string, tag = "4")]
    pub name: String,
    #[prost(fixed64, tag = "5")]
    pub start_time_unix_nano: u64,
    #[prost(fixed64, tag = "6")]
    pub end_time_unix_nano: u64,
    #[prost(message, repeated, tag = "7")]
    pub attributes: Vec<KeyValue>,
    #[prost(enumeration = "WireStatus", tag = "8")]
    pub status: i32,
    #[prost(enumeration = "WireKind", tag = "9")]
    pub kind: i32,
}

#[derive(Clone, PartialEq, Message)]
pub struct KeyValue {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(oneof = "Value", tags = "2, 3, 4, 5, 6")]
    pub value: Option<Value>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum Value {
    #[prost(string, tag = "2")]
    StringValue(String),
    #[prost(int64, tag = "3")]
    IntValue(i64),
    #[prost(double, tag = "4")]
    DoubleValue(f64),
    #[prost(bool, tag = "5")]
    BoolValue(bool),
    #[prost(message, tag = "6")]
    ArrayValue(StringArray),
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct StringArray {
    #[prost(string, repeated, tag = "1")]
    pub values: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum WireStatus {
    Unset = 0,
    Ok = 1,
    Error = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum WireKind {
    Unspecified = 0,
    Internal = 1,
    Server = 2,
    Client = 3,
    Producer = 4,
    Consumer = 5,
}

impl From<SpanStatus> for WireStatus {
    fn from(status: SpanStatus) -> Self {
        match status {
            SpanStatus::Unset => Self::Unset,
            SpanStatus::Ok => Self::Ok,
            SpanStatus::Error => Self::Error,
        }
    }
}

impl From<SpanKind> for WireKind {
    fn from(kind: SpanKind) -> Self {
        match kind {
            SpanKind::Internal => Self::Internal,
            SpanKind::Server => Self::Server,
            SpanKind::Client => Self::Client,
            SpanKind::Producer => Self::Producer,
            SpanKind::Consumer => Self::Consumer,
        }
    }
}

impl From<&AttributeValue> for Value {
    fn from(value: &AttributeValue) -> Self {
        match value {
            AttributeValue::String(s) => Self::StringValue(s.clone()),
            AttributeValue::Int(i) => Self::IntValue(*i),
            AttributeValue::Float(f) => Self::DoubleValue(*f),
            AttributeValue::Bool(b) => Self::BoolValue(*b),
            AttributeValue::Array(values) => Self::ArrayValue(StringArray {
                values: values.clone(),
            }),
        }
    }
}

impl From<&SpanRecord> for SpanMessage {
    fn from(span: &SpanRecord) -> Self {
        // Sorted so identical spans always encode to identical bytes.
        let mut attributes: Vec<KeyValue> = span
            .attributes
            .iter()
            .map(|(key, value)| KeyValue {
                key: key.clone(),
                value: Some(value.into()),
            })
            .collect();
        attributes.sort_by(|a, b| a.key.cmp(&b.key));

        Self {
            trace_id: span.trace_id.to_be_bytes().to_vec(),
            span_id: span.span_id,
            parent_span_id: span.parent_span_id,
            name: span.name.clone(),
            start_time_unix_nano: span.start_time,
            end_time_unix_nano: span.end_time,
            attributes,
            status: WireStatus::from(span.status) as i32,
            kind: WireKind::from(span.kind) as i32,
        }
    }
}

impl SpanMessage {
    /// Length-prefixed encoding used on stream transports.
    pub fn to_frame(&self) -> Vec<u8> {
        self.encode_length_delimited_to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation() {
        let mut span = SpanRecord::new(0x0102, 9, 3, "db.query".to_string(), SpanKind::Client);
        span.set_attribute("db.system", AttributeValue::String("sqlite".to_string()));
        span.set_attribute("rows", AttributeValue::Int(12));
        span.set_attribute("tags", AttributeValue::Array(vec!["a".to_string(), "b".to_string()]));
        span.finish(SpanStatus::Error);

        let message = SpanMessage::from(&span);

        assert_eq!(message.trace_id.len(), 16);
        assert_eq!(&message.trace_id[14..], &[0x01, 0x02]);
        assert_eq!(message.span_id, 9);
        assert_eq!(message.parent_span_id, 3);
        assert_eq!(message.name, "db.query");
        assert_eq!(message.status(), WireStatus::Error);
        assert_eq!(message.kind(), WireKind::Client);

        let keys: Vec<&str> = message.attributes.iter().map(|kv| kv.key.as_str()).collect();
        assert_eq!(keys, vec!["db.system", "rows", "tags"]);
        assert_eq!(message.attributes[1].value, Some(Value::IntValue(12)));
    }

    #[test]
    fn test_frame_decodes() {
        let span = SpanRecord::new(1, 2, 0, "frame".to_string(), SpanKind::Internal);
        let message = SpanMessage::from(&span);

        let frame = message.to_frame();
        let decoded = SpanMessage::decode_length_delimited(frame.as_slice()).unwrap();

        assert_eq!(decoded, message);
    }
}
