use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a recorded trip.
///
/// Scopes which offline tile set is consulted. The crate never generates trip ids, it only passes
/// them through to the [offline store](crate::offline::OfflineTileStore).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripId(Arc<str>);

impl TripId {
    /// Creates a new id.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().into())
    }

    /// String form of the id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TripId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TripId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TripId {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl From<u64> for TripId {
    fn from(value: u64) -> Self {
        Self(value.to_string().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_and_string_ids_are_equal() {
        assert_eq!(TripId::from(42u64), TripId::from("42"));
        assert_eq!(TripId::from(42u64).as_str(), "42");
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&TripId::from("trip-7")).expect("serialize");
        assert_eq!(json, "\"trip-7\"");
    }
}
