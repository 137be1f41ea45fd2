//! Latest known state of a vessel.

use chrono::{DateTime, Utc};
use lookout_core::VesselId;
use serde::{Deserialize, Serialize};

/// One vessel's most recent position report.
///
/// Records are replaced wholesale on every report; fields are never merged
/// with a previous record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipRecord {
    /// External vessel identifier (MMSI).
    pub id: VesselId,
    /// Display name, when the feed supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Latitude in WGS84 degrees.
    pub latitude: f64,
    /// Longitude in WGS84 degrees.
    pub longitude: f64,
    /// Speed over ground in knots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// When this record was ingested.
    pub last_update: DateTime<Utc>,
}
