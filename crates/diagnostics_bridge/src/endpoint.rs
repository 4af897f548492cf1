//! Host-facing provider surface.
//!
//! The host IPC mechanism addresses the bridge like a content store: it can
//! insert, query, update, delete and ask for a content type. Only `insert`
//! does anything; the rest stay no-ops so hosts that probe them keep working.

use crate::bridge::DiagnosticsBridge;
use crate::error::{BridgeError, PayloadError};
use crate::strategy::StrategyFactory;
use std::collections::HashMap;
use std::sync::Arc;

/// Key under which an insert request carries the serialized span.
pub const SPAN_PAYLOAD_KEY: &str = "span";

/// Values attached to an insert or update request.
pub type ContentValues = HashMap<String, Vec<u8>>;

pub struct DiagnosticsProvider<F: StrategyFactory> {
    bridge: Arc<DiagnosticsBridge<F>>,
}

impl<F: StrategyFactory> DiagnosticsProvider<F> {
    pub fn new(bridge: Arc<DiagnosticsBridge<F>>) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &Arc<DiagnosticsBridge<F>> {
        &self.bridge
    }

    /// Ingests the span carried under [`SPAN_PAYLOAD_KEY`]. Never yields a URI.
    pub fn insert(&self, _uri: &str, values: &ContentValues) -> Result<Option<String>, BridgeError> {
        let payload = values.get(SPAN_PAYLOAD_KEY).ok_or(PayloadError::MissingSpan)?;
        self.bridge.on_span_received(payload)?;
        Ok(None)
    }

    pub fn query(&self, _uri: &str, _projection: &[&str], _selection: Option<&str>) -> Option<Vec<ContentValues>> {
        None
    }

    pub fn get_type(&self, _uri: &str) -> Option<String> {
        None
    }

    pub fn update(&self, _uri: &str, _values: &ContentValues, _selection: Option<&str>) -> usize {
        0
    }

    pub fn delete(&self, _uri: &str, _selection: Option<&str>) -> usize {
        0
    }
}
