//! Event envelope construction
//!
//! The envelope matches the schema expected by the `/api/track` ingestion
//! endpoint. It is built fresh per emission and lives only as long as the
//! outbound request.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::DeviceContext;

/// Full structured payload sent per tracked event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    /// Durable per-installation session id
    pub session_id: String,

    /// OS/model classification, recomputed at build time
    pub device_info: DeviceContext,

    /// Cached network origin, or "Unknown" before resolution completes
    pub ip: String,

    /// Event name, e.g. "pageView" or "quizAnswer"
    pub event_name: String,

    /// Caller-supplied fields plus the always-injected `url` and `timestamp`
    pub event_data: Value,
}

impl EventEnvelope {
    /// Build an envelope, merging `url` (the current path) and `timestamp`
    /// (epoch milliseconds) into the caller's event data.
    ///
    /// The injected fields override caller-supplied values of the same name.
    /// Non-object event data is discarded and replaced by the injected
    /// fields alone.
    pub fn new(
        session_id: String,
        device_info: DeviceContext,
        ip: String,
        event_name: &str,
        event_data: Value,
        path: &str,
    ) -> Self {
        let mut data = match event_data {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                tracing::debug!(event = event_name, data = %other, "Dropping non-object event data");
                serde_json::Map::new()
            }
        };
        data.insert("url".to_string(), Value::String(path.to_string()));
        data.insert(
            "timestamp".to_string(),
            Value::from(Utc::now().timestamp_millis()),
        );

        Self {
            session_id,
            device_info,
            ip,
            event_name: event_name.to_string(),
            event_data: Value::Object(data),
        }
    }
}
