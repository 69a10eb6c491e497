//! Event identity.
//!
//! An [`EventId`] is the sink-native token for one logical trap. It is minted
//! once when the event is normalized and travels with the event through the
//! sink index, the cursor, fallback files and the store's unique key, so that
//! duplicates introduced at the relay hop collapse at persistence time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque event token.
///
/// Format: `<unix_millis>-<8 hex chars>`. Tokens sort roughly by creation
/// time, but the sink index (not the token) defines arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    /// Mint a new token for an event observed at `at`.
    pub fn generate(at: DateTime<Utc>) -> Self {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        EventId(format!("{}-{}", at.timestamp_millis(), &uuid[..8]))
    }

    /// Borrow the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Sink key under which the event body is stored.
    pub fn record_key(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        EventId(s.to_string())
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        EventId(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn generated_ids_embed_millis_and_are_unique() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let a = EventId::generate(at);
        let b = EventId::generate(at);
        assert!(a.as_str().starts_with("1709294400000-"));
        assert_eq!(a.as_str().len(), "1709294400000-".len() + 8);
        assert_ne!(a, b);
    }

    #[test]
    fn record_key_applies_prefix() {
        let id = EventId::from("42-deadbeef");
        assert_eq!(id.record_key("snmp:trap:"), "snmp:trap:42-deadbeef");
    }

    #[test]
    fn serializes_transparently() {
        let id = EventId::from("1-abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"1-abc\"");
    }
}
