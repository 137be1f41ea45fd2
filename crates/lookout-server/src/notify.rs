//! Typed producer helpers.
//!
//! Domain services publish through these instead of naming groups and events
//! by hand. Each helper returns the total number of deliveries queued; a
//! client that is in several target groups receives one copy per group.

use lookout_core::Group;
use serde_json::Value;

use crate::hub::BroadcastHub;

/// What happened to an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// Newly created.
    Created,
    /// Modified.
    Updated,
    /// Removed.
    Deleted,
}

impl ChangeKind {
    fn suffix(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Updated => "Updated",
            Self::Deleted => "Deleted",
        }
    }
}

/// Roster refresh event name.
pub const ROSTER_UPDATED: &str = "RosterUpdated";
/// Dispatcher-wide alert event name.
pub const DISPATCH_ALERT: &str = "DispatchAlert";

fn publish_all(hub: &BroadcastHub, groups: &[Group], event: &str, payload: &Value) -> usize {
    groups
        .iter()
        .map(|group| hub.publish(group, event, payload))
        .sum()
}

/// `Incident{Created,Updated,Deleted}` to the owning agency and the incident's viewers.
pub fn incident_changed(
    hub: &BroadcastHub,
    agency_id: i64,
    incident_id: i64,
    kind: ChangeKind,
    payload: &Value,
) -> usize {
    let event = format!("Incident{}", kind.suffix());
    publish_all(
        hub,
        &[Group::Agency(agency_id), Group::Incident(incident_id)],
        &event,
        payload,
    )
}

/// `Vehicle{Created,Updated,Deleted}` to the owning agency and the vehicle's viewers.
pub fn vehicle_changed(
    hub: &BroadcastHub,
    agency_id: i64,
    vehicle_id: i64,
    kind: ChangeKind,
    payload: &Value,
) -> usize {
    let event = format!("Vehicle{}", kind.suffix());
    publish_all(
        hub,
        &[Group::Agency(agency_id), Group::Vehicle(vehicle_id)],
        &event,
        payload,
    )
}

/// `RosterUpdated` to the agency roster view and, when given, the station roster view.
pub fn roster_changed(
    hub: &BroadcastHub,
    agency_id: i64,
    station_id: Option<i64>,
    payload: &Value,
) -> usize {
    let mut groups = vec![Group::RosterAgency(agency_id)];
    groups.extend(station_id.map(Group::RosterStation));
    publish_all(hub, &groups, ROSTER_UPDATED, payload)
}

/// `DispatchAlert` to every dispatcher.
pub fn dispatch_alert(hub: &BroadcastHub, payload: &Value) -> usize {
    hub.publish(&Group::GlobalDispatchers, DISPATCH_ALERT, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use lookout_core::{Claims, ConnectionId};
    use serde_json::json;
    use tokio::sync::mpsc;

    use crate::websocket::connection::ClientConnection;

    fn connect(hub: &BroadcastHub, id: &str, claims: Claims) -> mpsc::Receiver<Arc<String>> {
        let (tx, rx) = mpsc::channel(16);
        let conn = Arc::new(ClientConnection::new(ConnectionId::from(id), tx));
        let _ = hub.on_connect(conn, claims);
        rx
    }

    fn drain(rx: &mut mpsc::Receiver<Arc<String>>) -> Vec<Value> {
        let mut events = Vec::new();
        while let Ok(text) = rx.try_recv() {
            events.push(serde_json::from_str(&text).unwrap());
        }
        events
    }

    #[test]
    fn incident_goes_to_agency_and_viewers() {
        let hub = BroadcastHub::new();
        let mut agency = connect(&hub, "agency", Claims::new(1).with_agency(5));
        let mut viewer = connect(&hub, "viewer", Claims::new(2).with_agency(6));
        let _ = hub.join_group(&ConnectionId::from("viewer"), Group::Incident(42));

        let sent = incident_changed(&hub, 5, 42, ChangeKind::Created, &json!({"id": 42}));
        assert_eq!(sent, 2);

        let events = drain(&mut agency);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["event"], "IncidentCreated");
        assert_eq!(events[0]["group"], "Agency_5");
        assert_eq!(drain(&mut viewer)[0]["group"], "Incident_42");
    }

    #[test]
    fn vehicle_event_names() {
        let hub = BroadcastHub::new();
        let mut rx = connect(&hub, "c", Claims::new(1).with_agency(5));
        let _ = vehicle_changed(&hub, 5, 3, ChangeKind::Deleted, &json!(null));
        assert_eq!(drain(&mut rx)[0]["event"], "VehicleDeleted");
    }

    #[test]
    fn roster_skips_general_groups() {
        let hub = BroadcastHub::new();
        let mut rx = connect(&hub, "c", Claims::new(1).with_agency(5).with_station(12));
        assert_eq!(roster_changed(&hub, 5, Some(12), &json!({})), 2);
        let groups: Vec<Value> = drain(&mut rx).into_iter().map(|e| e["group"].clone()).collect();
        assert_eq!(groups, vec![json!("RosterAgency_5"), json!("RosterStation_12")]);
        assert_eq!(roster_changed(&hub, 5, None, &json!({})), 1);
    }

    #[test]
    fn alert_reaches_dispatchers_across_agencies() {
        let hub = BroadcastHub::new();
        let mut d1 = connect(&hub, "d1", Claims::new(1).with_role("Dispatcher").with_agency(5));
        let mut d2 = connect(&hub, "d2", Claims::new(2).with_role("Dispatcher").with_agency(9));
        let mut viewer = connect(&hub, "v", Claims::new(3).with_role("Viewer").with_agency(5));

        assert_eq!(dispatch_alert(&hub, &json!({"level": "high"})), 2);
        assert_eq!(drain(&mut d1)[0]["event"], "DispatchAlert");
        assert_eq!(drain(&mut d2).len(), 1);
        assert!(drain(&mut viewer).is_empty());
    }
}
