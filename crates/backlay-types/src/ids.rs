//! Identifiers used throughout Backlay.
//!
//! Engine-minted entities (wagers, match records) use UUIDv7 so ids sort by
//! creation time. Users and markets are named by the external collaborators
//! that own them (identity and reference-data feeds), so they wrap strings.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// WagerId
// ---------------------------------------------------------------------------

/// Globally unique wager identifier. Uses UUIDv7 for time-ordered sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct WagerId(pub Uuid);

impl WagerId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Extract the embedded timestamp (milliseconds since UNIX epoch) from UUIDv7.
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        let bytes = self.0.as_bytes();
        u64::from_be_bytes([
            0, 0, bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5],
        ])
    }
}

impl Default for WagerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// MatchId
// ---------------------------------------------------------------------------

/// Identifier of a single back/lay pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct MatchId(pub Uuid);

impl MatchId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for MatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "match:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// UserId
// ---------------------------------------------------------------------------

/// Authenticated username, handed to the engine by the identity layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

// ---------------------------------------------------------------------------
// MarketId
// ---------------------------------------------------------------------------

/// Market identifier as issued by the reference-data feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct MarketId(pub String);

impl MarketId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MarketId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ---------------------------------------------------------------------------
// BookKey
// ---------------------------------------------------------------------------

/// Partition key of the order book: one (market, runner) pair.
///
/// Both sides of a runner live under the same key so a placement can read
/// the opposing side and write its own side in one critical section.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct BookKey {
    pub market: MarketId,
    pub runner: String,
}

impl BookKey {
    #[must_use]
    pub fn new(market: MarketId, runner: impl Into<String>) -> Self {
        Self {
            market,
            runner: runner.into(),
        }
    }
}

impl fmt::Display for BookKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.market, self.runner)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wager_id_uniqueness() {
        let a = WagerId::new();
        let b = WagerId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn wager_id_ordering() {
        let a = WagerId::new();
        let b = WagerId::new();
        assert!(a < b);
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn wager_id_timestamp_extraction() {
        let before = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        let id = WagerId::new();
        let after = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        let ts = id.timestamp_ms();
        assert!(
            ts >= before && ts <= after,
            "ts={ts}, before={before}, after={after}"
        );
    }

    #[test]
    fn book_keys_sort_by_market_then_runner() {
        let a = BookKey::new(MarketId::from("1.100"), "Arsenal");
        let b = BookKey::new(MarketId::from("1.100"), "Chelsea");
        let c = BookKey::new(MarketId::from("1.200"), "Arsenal");
        assert!(a < b);
        assert!(b < c);
        assert_eq!(format!("{a}"), "1.100/Arsenal");
    }

    #[test]
    fn user_id_serde_roundtrip() {
        let user = UserId::from("alice");
        let json = serde_json::to_string(&user).unwrap();
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(user, back);
        assert_eq!(back.as_str(), "alice");
    }
}
