use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use dorm2door::config::AppConfig;
use dorm2door::db;
use dorm2door::handlers;
use dorm2door::state::AppState;
use dorm2door::store::{InMemoryStore, SqliteStore, Store};

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        cors_allow_any: true,
    }
}

fn sqlite_state() -> Arc<AppState> {
    let conn = db::init_db(":memory:").unwrap();
    Arc::new(AppState {
        store: Arc::new(SqliteStore::new(conn)),
        config: test_config(),
    })
}

fn memory_state() -> Arc<AppState> {
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    Arc::new(AppState {
        store,
        config: test_config(),
    })
}

fn test_app(state: Arc<AppState>) -> Router {
    handlers::router(state)
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

/// Mon-Fri, 9 AM to 6 PM.
async fn seed_provider(app: &Router) {
    let (status, _) = send(
        app,
        json_request(
            "PUT",
            "/api/providers/prov-1",
            serde_json::json!({
                "display_name": "Sam's Cuts",
                "availability": {"days": [5, 1, 2, 3, 4], "startTime": "9:00 AM", "endTime": "6:00 PM"}
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

fn booking(consumer: &str, date: &str, slot: &str) -> serde_json::Value {
    serde_json::json!({
        "consumer_id": consumer,
        "provider_id": "prov-1",
        "service_id": "svc-1",
        "date": date,
        "slot": slot,
    })
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let app = test_app(memory_state());
    let (status, json) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

// ── Providers ──

#[tokio::test]
async fn test_provider_round_trip() {
    let app = test_app(sqlite_state());
    seed_provider(&app).await;

    let (status, json) = send(&app, get("/api/providers/prov-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["display_name"], "Sam's Cuts");
    assert_eq!(json["availability"]["days"], serde_json::json!([1, 2, 3, 4, 5]));
    assert_eq!(json["hours"], "Mon, Tue, Wed, Thu, Fri: 9:00 AM-6:00 PM");
}

#[tokio::test]
async fn test_provider_not_found() {
    let app = test_app(memory_state());
    let (status, json) = send(&app, get("/api/providers/nobody")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_provider_rejects_bad_weekday() {
    let app = test_app(memory_state());
    let (status, _) = send(
        &app,
        json_request(
            "PUT",
            "/api/providers/prov-1",
            serde_json::json!({
                "display_name": "Sam",
                "availability": {"days": [7], "startTime": "9:00 AM", "endTime": "6:00 PM"}
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Slots ──

#[tokio::test]
async fn test_slots_for_weekday_and_weekend() {
    let app = test_app(sqlite_state());
    seed_provider(&app).await;

    // 2032-06-14 is a Monday
    let (status, json) = send(&app, get("/api/providers/prov-1/slots?date=2032-06-14")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["bookable"], true);
    let slots = json["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 9);
    assert_eq!(slots[0]["label"], "9:00 AM");
    assert_eq!(slots[8]["label"], "5:00 PM");

    let (_, json) = send(&app, get("/api/providers/prov-1/slots?date=2032-06-19")).await;
    assert_eq!(json["bookable"], false);
    assert_eq!(json["slots"], serde_json::json!([]));
}

#[tokio::test]
async fn test_slots_show_taken() {
    let app = test_app(sqlite_state());
    seed_provider(&app).await;
    let (status, _) = send(
        &app,
        json_request("POST", "/api/appointments", booking("alice", "2032-06-14", "2:00 PM")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, json) = send(&app, get("/api/providers/prov-1/slots?date=2032-06-14")).await;
    let taken: Vec<&str> = json["slots"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|s| s["taken"] == true)
        .map(|s| s["label"].as_str().unwrap())
        .collect();
    assert_eq!(taken, vec!["2:00 PM"]);
}

#[tokio::test]
async fn test_slots_on_last_representable_date() {
    let app = test_app(sqlite_state());
    let (status, _) = send(
        &app,
        json_request(
            "PUT",
            "/api/providers/prov-1",
            serde_json::json!({"display_name": "Sam", "availability": null}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, get("/api/providers/prov-1/slots?date=%2B262143-12-31")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["slots"].as_array().unwrap().len(), 12);

    // the store is still healthy for everyone else
    let (status, _) = send(&app, get("/api/providers/prov-1")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, get("/api/providers/prov-1/slots?date=2032-06-14")).await;
    assert_eq!(status, StatusCode::OK);
}

// ── Appointments ──

#[tokio::test]
async fn test_booking_in_the_past_rejected() {
    let app = test_app(memory_state());
    seed_provider(&app).await;
    // 2020-06-15 is a Monday
    let (status, json) = send(
        &app,
        json_request("POST", "/api/appointments", booking("alice", "2020-06-15", "10:00 AM")),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "That date has already passed.");
}

#[tokio::test]
async fn test_double_booking_conflict() {
    for state in [sqlite_state(), memory_state()] {
        let app = test_app(state);
        seed_provider(&app).await;

        let (status, json) = send(
            &app,
            json_request("POST", "/api/appointments", booking("alice", "2032-06-14", "10:00 AM")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["status"], "pending");
        assert_eq!(json["scheduled_at"], "2032-06-14T10:00:00");

        let (status, json) = send(
            &app,
            json_request("POST", "/api/appointments", booking("bob", "2032-06-14", "10:00 AM")),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["code"], "slot_taken");
        assert_eq!(
            json["error"],
            "That time slot was just booked. Please choose another time."
        );
    }
}

#[tokio::test]
async fn test_booking_outside_hours_rejected() {
    let app = test_app(memory_state());
    seed_provider(&app).await;
    let (status, _) = send(
        &app,
        json_request("POST", "/api/appointments", booking("alice", "2032-06-19", "10:00 AM")),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &app,
        json_request("POST", "/api/appointments", booking("alice", "2032-06-14", "10:30 AM")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_transitions_over_http() {
    let app = test_app(sqlite_state());
    seed_provider(&app).await;
    let (_, json) = send(
        &app,
        json_request("POST", "/api/appointments", booking("alice", "2032-06-14", "10:00 AM")),
    )
    .await;
    let id = json["id"].as_str().unwrap().to_string();
    let uri = format!("/api/appointments/{id}/status");

    // consumers cannot confirm
    let (status, json) = send(
        &app,
        json_request(
            "POST",
            &uri,
            serde_json::json!({"actor": "consumer", "from": "pending", "to": "confirmed"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "invalid_transition");

    let (status, json) = send(
        &app,
        json_request(
            "POST",
            &uri,
            serde_json::json!({"actor": "provider", "from": "pending", "to": "confirmed"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "confirmed");

    // stale view of the row
    let (status, json) = send(
        &app,
        json_request(
            "POST",
            &uri,
            serde_json::json!({"actor": "consumer", "from": "pending", "to": "cancelled"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "status_changed");

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/appointments/missing/status",
            serde_json::json!({"actor": "provider", "from": "pending", "to": "confirmed"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_frees_slot() {
    let app = test_app(sqlite_state());
    seed_provider(&app).await;
    let (_, json) = send(
        &app,
        json_request("POST", "/api/appointments", booking("alice", "2032-06-14", "10:00 AM")),
    )
    .await;
    let id = json["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/appointments/{id}/status"),
            serde_json::json!({"actor": "consumer", "from": "pending", "to": "cancelled"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        json_request("POST", "/api/appointments", booking("bob", "2032-06-14", "10:00 AM")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_list_appointments() {
    let app = test_app(sqlite_state());
    seed_provider(&app).await;
    for (who, day) in [("alice", "2032-06-14"), ("alice", "2032-06-15"), ("bob", "2032-06-16")] {
        let (status, _) = send(
            &app,
            json_request("POST", "/api/appointments", booking(who, day, "11:00 AM")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, json) = send(&app, get("/api/appointments?consumer_id=alice")).await;
    assert_eq!(status, StatusCode::OK);
    let mine = json.as_array().unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0]["scheduled_at"], "2032-06-15T11:00:00");

    let (_, json) = send(&app, get("/api/appointments?provider_id=prov-1")).await;
    assert_eq!(json.as_array().unwrap().len(), 3);

    let (status, _) = send(&app, get("/api/appointments")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
