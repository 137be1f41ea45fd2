//! End-to-end tests using a real WebSocket client.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use lookout_ais::PositionStore;
use lookout_core::{ConnectionId, Group};
use lookout_server::metrics::detached_handle;
use lookout_server::notify::{self, ChangeKind};
use lookout_server::{JwtClaimsResolver, LookoutServer};
use lookout_settings::ServerSettings;

const TIMEOUT: Duration = Duration::from_secs(5);
const SECRET: &str = "integration-secret";

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Boot a test server on an auto-assigned port.
async fn boot_server() -> (String, Arc<LookoutServer>) {
    let settings = ServerSettings {
        host: "127.0.0.1".into(),
        port: 0,
        ..ServerSettings::default()
    };
    let server = Arc::new(LookoutServer::new(
        settings,
        Arc::new(JwtClaimsResolver::new(SECRET, None)),
        Arc::new(PositionStore::new()),
        detached_handle(),
    ));
    let (addr, _handle) = server.listen().await.unwrap();
    (format!("ws://{addr}/ws"), server)
}

fn token(claims: &Value) -> String {
    let mut claims = claims.clone();
    claims["exp"] = json!(chrono::Utc::now().timestamp() + 3600);
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

/// Connect and return the stream plus the greeting.
async fn connect(url: &str, claims: &Value) -> (WsStream, Value) {
    let url = format!("{url}?access_token={}", token(claims));
    let (mut ws, _) = connect_async(url).await.unwrap();
    let greeting = read_json(&mut ws).await;
    (ws, greeting)
}

/// Read the next text message as JSON.
async fn read_json(ws: &mut WsStream) -> Value {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timeout waiting for message")
            .expect("stream closed")
            .expect("ws error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn send_json(ws: &mut WsStream, value: Value) -> Value {
    ws.send(Message::text(value.to_string())).await.unwrap();
    read_json(ws).await
}

async fn wait_for_connections(server: &LookoutServer, count: usize) {
    timeout(TIMEOUT, async {
        while server.hub().connection_count() != count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timeout waiting for connection count");
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_greeting_lists_claim_groups() {
    let (url, server) = boot_server().await;
    let (_ws, greeting) = connect(
        &url,
        &json!({"sub": "7", "role": "Dispatcher", "agencyId": 5, "stationId": 12}),
    )
    .await;

    assert_eq!(greeting["type"], "connection.established");
    assert!(greeting["data"]["connectionId"].is_string());
    assert_eq!(
        greeting["data"]["groups"],
        json!([
            "Agency_5",
            "RosterAgency_5",
            "Station_12",
            "RosterStation_12",
            "Role_Dispatcher",
            "GlobalDispatchers"
        ])
    );

    let conn_id = greeting["data"]["connectionId"].as_str().unwrap();
    let info = server.hub().connection(conn_id).unwrap();
    assert_eq!(info.claims.user_id, 7);

    server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_viewer_only_role_group() {
    let (url, server) = boot_server().await;
    let (_ws, greeting) = connect(&url, &json!({"sub": "8", "role": "Viewer"})).await;
    assert_eq!(greeting["data"]["groups"], json!(["Role_Viewer"]));
    server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_missing_or_bad_token_rejected() {
    let (url, server) = boot_server().await;

    let err = connect_async(url.as_str()).await.unwrap_err();
    let WsError::Http(resp) = err else {
        panic!("expected HTTP rejection, got {err:?}");
    };
    assert_eq!(resp.status(), 401);

    let err = connect_async(format!("{url}?access_token=nope")).await.unwrap_err();
    assert!(matches!(err, WsError::Http(ref r) if r.status() == 401));

    assert_eq!(server.hub().connection_count(), 0);
    server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_agency_publish_reaches_members_only() {
    let (url, server) = boot_server().await;
    let (mut a, _) = connect(&url, &json!({"sub": "1", "agencyId": 5})).await;
    let (mut b, _) = connect(&url, &json!({"sub": "2", "agencyId": 6})).await;

    let sent = server
        .hub()
        .publish(&Group::Agency(5), "IncidentUpdated", &json!({"incidentId": 42}));
    assert_eq!(sent, 1);

    let event = read_json(&mut a).await;
    assert_eq!(event["event"], "IncidentUpdated");
    assert_eq!(event["group"], "Agency_5");
    assert_eq!(event["payload"]["incidentId"], 42);

    let reply = send_json(&mut b, json!({"type": "joinGroup", "group": "Incident_42"})).await;
    assert_eq!(reply["type"], "groupJoined");
    server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_join_incident_then_receive() {
    let (url, server) = boot_server().await;
    let (mut ws, _) = connect(&url, &json!({"sub": "1", "agencyId": 9})).await;

    let reply = send_json(&mut ws, json!({"type": "joinGroup", "group": "Incident_42"})).await;
    assert_eq!(reply, json!({"type": "groupJoined", "group": "Incident_42"}));

    let sent = notify::incident_changed(server.hub(), 5, 42, ChangeKind::Updated, &json!({"id": 42}));
    assert_eq!(sent, 1);
    let event = read_json(&mut ws).await;
    assert_eq!(event["event"], "IncidentUpdated");
    assert_eq!(event["group"], "Incident_42");

    let reply = send_json(&mut ws, json!({"type": "leaveGroup", "group": "Incident_42"})).await;
    assert_eq!(reply["type"], "groupLeft");
    assert_eq!(
        notify::incident_changed(server.hub(), 5, 42, ChangeKind::Deleted, &json!(null)),
        0
    );
    server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_claim_group_join_is_forbidden() {
    let (url, server) = boot_server().await;
    let (mut ws, _) = connect(&url, &json!({"sub": "1", "agencyId": 5})).await;

    let reply = send_json(&mut ws, json!({"type": "joinGroup", "group": "GlobalDispatchers"})).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["code"], "FORBIDDEN_GROUP");

    let reply = send_json(&mut ws, json!({"type": "bogus"})).await;
    assert_eq!(reply["code"], "INVALID_MESSAGE");

    // Connection survives bad commands.
    let reply = send_json(&mut ws, json!({"type": "joinRosterGroups"})).await;
    assert_eq!(reply, json!({"type": "rosterGroupsJoined", "groups": ["RosterAgency_5"]}));
    server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_multi_device_presence_and_disconnect() {
    let (url, server) = boot_server().await;
    let (phone, g1) = connect(&url, &json!({"sub": "3", "agencyId": 5})).await;
    let (_laptop, _) = connect(&url, &json!({"sub": "3", "agencyId": 5})).await;
    wait_for_connections(&server, 2).await;
    assert_eq!(
        server
            .hub()
            .query_presence(&lookout_server::PresenceFilter::User(3))
            .len(),
        2
    );

    drop(phone);
    wait_for_connections(&server, 1).await;
    let gone = ConnectionId::from(g1["data"]["connectionId"].as_str().unwrap());
    assert!(server.hub().groups_of(&gone).is_empty());
    assert_eq!(server.hub().publish(&Group::Agency(5), "E", &json!(null)), 1);
    server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_shutdown_closes_sessions() {
    let (url, server) = boot_server().await;
    let (mut ws, _) = connect(&url, &json!({"sub": "1"})).await;
    wait_for_connections(&server, 1).await;

    server.shutdown().shutdown();
    wait_for_connections(&server, 0).await;

    let closed = timeout(TIMEOUT, async {
        loop {
            match ws.next().await {
                None | Some(Err(_) | Ok(Message::Close(_))) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok());
}
