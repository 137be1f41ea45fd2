//! Feed wire format.
//!
//! Outbound, a single subscribe frame:
//!
//! ```json
//! {"APIKey": "…", "BoundingBoxes": [[[lat, lon], [lat, lon]]], "FilterMessageTypes": ["PositionReport"]}
//! ```
//!
//! Inbound, envelopes of which only `Message.PositionReport` is consumed:
//!
//! ```json
//! {"MessageType": "PositionReport",
//!  "MetaData": {"ShipName": "ARGO   "},
//!  "Message": {"PositionReport": {"UserID": 111222333, "Latitude": 37.9, "Longitude": 23.7, "Sog": 11.2}}}
//! ```

use chrono::{DateTime, Utc};
use lookout_core::VesselId;
use lookout_settings::BoundingBox;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::ShipRecord;

/// Message type the subscription is filtered to.
pub const POSITION_REPORT: &str = "PositionReport";

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SubscribeFrame<'a> {
    #[serde(rename = "APIKey")]
    api_key: &'a str,
    bounding_boxes: &'a [BoundingBox],
    filter_message_types: [&'static str; 1],
}

/// Encode the subscribe frame.
pub fn subscribe_frame(api_key: &str, bounding_boxes: &[BoundingBox]) -> serde_json::Result<String> {
    serde_json::to_string(&SubscribeFrame {
        api_key,
        bounding_boxes,
        filter_message_types: [POSITION_REPORT],
    })
}

#[derive(Deserialize)]
struct RawPositionReport {
    #[serde(rename = "UserID")]
    user_id: u64,
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Longitude")]
    longitude: f64,
    #[serde(rename = "Sog", default)]
    speed: Option<f64>,
}

/// A decoded position report, not yet stamped with an ingest time.
#[derive(Clone, Debug, PartialEq)]
pub struct PositionUpdate {
    /// Vessel identifier.
    pub id: VesselId,
    /// Display name from the envelope metadata.
    pub name: Option<String>,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Speed over ground in knots.
    pub speed: Option<f64>,
}

impl PositionUpdate {
    /// Build the full store record.
    pub fn into_record(self, now: DateTime<Utc>) -> ShipRecord {
        ShipRecord {
            id: self.id,
            name: self.name,
            latitude: self.latitude,
            longitude: self.longitude,
            speed: self.speed,
            last_update: now,
        }
    }
}

/// Decode an inbound text frame.
///
/// - `Err` when the text is not JSON at all (the frame is malformed)
/// - `Ok(None)` for valid JSON that is not a usable position report,
///   including reports whose coordinates are the AIS "not available"
///   sentinels (latitude 91, longitude 181)
/// - `Ok(Some(_))` for a position report
pub fn decode_position(text: &str) -> serde_json::Result<Option<PositionUpdate>> {
    let envelope: Value = serde_json::from_str(text)?;

    let Some(raw) = envelope.pointer("/Message/PositionReport") else {
        return Ok(None);
    };
    let Ok(report) = RawPositionReport::deserialize(raw) else {
        return Ok(None);
    };
    if !(-90.0..=90.0).contains(&report.latitude) || !(-180.0..=180.0).contains(&report.longitude)
    {
        return Ok(None);
    }

    let name = envelope
        .pointer("/MetaData/ShipName")
        .and_then(Value::as_str)
        .map(|n| n.trim().trim_end_matches('@').trim_end().to_owned())
        .filter(|n| !n.is_empty());

    Ok(Some(PositionUpdate {
        id: VesselId::from(report.user_id.to_string()),
        name,
        latitude: report.latitude,
        longitude: report.longitude,
        speed: report.speed,
    }))
}
