//! # Change Events
//!
//! Classification of keyspace notifications received for the certificates
//! namespace.

use crate::provider::StoreMessage;
use std::fmt;

/// Why a key disappeared from the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteReason {
    Del,
    Expired,
    Evicted,
}

/// What happened to a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Key written
    Set,
    /// Key removed
    Delete(DeleteReason),
    /// Any other store event (`expire`, `rename_from`, ...)
    Unknown(String),
}

impl EventKind {
    #[must_use]
    pub fn from_payload(payload: &str) -> Self {
        match payload {
            "set" => EventKind::Set,
            "del" => EventKind::Delete(DeleteReason::Del),
            "expired" => EventKind::Delete(DeleteReason::Expired),
            "evicted" => EventKind::Delete(DeleteReason::Evicted),
            other => EventKind::Unknown(other.to_string()),
        }
    }

    /// Short label used for metrics
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Set => "set",
            EventKind::Delete(_) => "delete",
            EventKind::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Set => f.write_str("set"),
            EventKind::Delete(DeleteReason::Del) => f.write_str("del"),
            EventKind::Delete(DeleteReason::Expired) => f.write_str("expired"),
            EventKind::Delete(DeleteReason::Evicted) => f.write_str("evicted"),
            EventKind::Unknown(other) => f.write_str(other),
        }
    }
}

/// A notification for one stored key, relative to the certificates namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// `<name>/<name><suffix>`
    pub key: String,
    pub kind: EventKind,
}

impl ChangeEvent {
    /// Build an event from a subscription message
    ///
    /// The channel prefix is stripped when present; otherwise the whole
    /// channel is used as the key.
    #[must_use]
    pub fn from_message(message: &StoreMessage, channel_prefix: &str) -> Self {
        let key = message
            .channel
            .strip_prefix(channel_prefix)
            .unwrap_or(&message.channel);
        Self {
            key: key.to_string(),
            kind: EventKind::from_payload(&message.payload),
        }
    }

    /// Watched names the event applies to: every name that prefixes the key
    pub fn matching_names<'a>(
        &'a self,
        watched: &'a [String],
    ) -> impl Iterator<Item = &'a String> + 'a {
        watched.iter().filter(|name| self.key.starts_with(name.as_str()))
    }

    /// Extension of the key's last path segment, including the dot
    ///
    /// Empty when the key has none.
    #[must_use]
    pub fn extension(&self) -> &str {
        let file = self.key.rsplit('/').next().unwrap_or(&self.key);
        match file.rfind('.') {
            Some(idx) => &file[idx..],
            None => "",
        }
    }
}
