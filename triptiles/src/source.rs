//! User preference for the map source and the pure rule that turns it into the source in use.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TileSourceError;

/// Map source selected by the user.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapSourcePreference {
    /// Always use the online tile server.
    Online,
    /// Use the offline tile set of the trip, falling back to online if there is none.
    Offline,
    /// Prefer offline tiles if the trip has them, otherwise online.
    #[default]
    Auto,
}

impl MapSourcePreference {
    /// String value used when the preference is persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Auto => "auto",
        }
    }
}

impl Display for MapSourcePreference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapSourcePreference {
    type Err = TileSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "online" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            "auto" => Ok(Self::Auto),
            other => Err(TileSourceError::Generic(format!(
                "unknown map source preference: {other:?}"
            ))),
        }
    }
}

/// Source that is actually used to satisfy tile requests.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedSource {
    /// Templated public tile server.
    #[default]
    Online,
    /// Offline tile set of the current trip.
    Offline,
}

impl Display for ResolvedSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => f.write_str("online"),
            Self::Offline => f.write_str("offline"),
        }
    }
}

/// Derives the source in use from the user preference and the offline availability of the current
/// trip.
///
/// Never returns [`ResolvedSource::Offline`] unless `offline_available` is true.
pub fn resolve_source(preference: MapSourcePreference, offline_available: bool) -> ResolvedSource {
    match (preference, offline_available) {
        (MapSourcePreference::Online, _) => ResolvedSource::Online,
        (MapSourcePreference::Offline, true) | (MapSourcePreference::Auto, true) => {
            ResolvedSource::Offline
        }
        (MapSourcePreference::Offline, false) | (MapSourcePreference::Auto, false) => {
            ResolvedSource::Online
        }
    }
}
