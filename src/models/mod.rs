use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A geographic coordinate as reported by the place-details endpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

/// Cached result of a remote lookup for one place id
///
/// Field names follow the persisted cache blob: `loc`, `closed`, `notFound`
/// and `ts`. A record without a timestamp is treated as already expired.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaceRecord {
    /// Location of the linked place, absent when the lookup found no match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<Coordinate>,

    /// The remote source flags this place as permanently closed
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub closed: bool,

    /// The remote source had no entity for this id
    #[serde(rename = "notFound", default, skip_serializing_if = "std::ops::Not::not")]
    pub not_found: bool,

    /// When this record was last (re)populated
    #[serde(rename = "ts", default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl PlaceRecord {
    /// Record for a place the remote source located
    pub fn found(location: Coordinate, closed: bool) -> Self {
        Self {
            loc: Some(location),
            closed,
            not_found: false,
            fetched_at: None,
        }
    }

    /// Record for an id the remote source has no entity for
    pub fn not_found() -> Self {
        Self {
            loc: None,
            closed: false,
            not_found: true,
            fetched_at: None,
        }
    }

    /// Whether this record is older than `ttl` at time `now`
    ///
    /// A record that was never stamped counts as expired.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match self.fetched_at {
            Some(fetched_at) => now - fetched_at > ttl,
            None => true,
        }
    }
}

/// Raw response of the place-details endpoint
///
/// Only the two shapes the coordinator cares about are modeled: a bare
/// `NOT_FOUND` status, or a result carrying a geometry and a closed flag.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceDetailsResponse {
    pub status: String,
    #[serde(default)]
    pub result: Option<PlaceDetailsResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceDetailsResult {
    pub geometry: PlaceGeometry,
    #[serde(default)]
    pub permanently_closed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceGeometry {
    pub location: Coordinate,
}

/// Status value the remote source uses for missing entities
pub const STATUS_NOT_FOUND: &str = "NOT_FOUND";
