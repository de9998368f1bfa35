//! # Store Value Codec
//!
//! Decodes values written by `caddy-storage-redis`.
//!
//! A stored value is the configured value prefix followed by a JSON record as
//! produced by Go's `encoding/json`:
//!
//! ```text
//! caddy-storage-redis{"Value":"LS0tLS1CRUdJTi...","Modified":"2024-05-01T10:20:30.123456789Z"}
//! ```
//!
//! `Value` is standard base64 (Go's encoding of `[]byte`), `Modified` is an
//! RFC 3339 timestamp with optional fractional seconds.

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::SystemTime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("stored value is not a valid JSON record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stored Value is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// One decoded certificate component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
    pub value: Vec<u8>,
    pub modified: DateTime<Utc>,
}

impl StoredValue {
    /// `modified` as a filesystem timestamp
    #[must_use]
    pub fn modified_system_time(&self) -> SystemTime {
        SystemTime::from(self.modified)
    }
}

#[derive(Deserialize)]
struct WireRecord {
    #[serde(rename = "Value")]
    value: Option<String>,
    #[serde(rename = "Modified")]
    modified: DateTime<Utc>,
}

/// Decode a raw stored string
///
/// A missing prefix is tolerated; anything after it must be a valid record.
pub fn decode_stored_value(raw: &str, value_prefix: &str) -> Result<StoredValue, DecodeError> {
    let body = raw.strip_prefix(value_prefix).unwrap_or(raw);
    let record: WireRecord = serde_json::from_str(body)?;
    let value = match record.value {
        Some(encoded) => general_purpose::STANDARD.decode(encoded)?,
        None => Vec::new(),
    };
    Ok(StoredValue {
        value,
        modified: record.modified,
    })
}

/// Encode a value the way the producing plugin does
///
/// Used to seed stores in tests and tooling.
#[must_use]
pub fn encode_stored_value(value: &[u8], modified: DateTime<Utc>, value_prefix: &str) -> String {
    let record = serde_json::json!({
        "Value": general_purpose::STANDARD.encode(value),
        "Modified": modified.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true),
    });
    format!("{value_prefix}{record}")
}
