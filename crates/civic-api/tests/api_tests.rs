//! Integration tests for the civic events API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server, against in-memory backends. "Today" is pinned so
//! upcoming-event filters are deterministic.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::too_many_lines)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::{NaiveDate, Utc};
use civic_api::router::build_router;
use civic_api::state::AppState;
use civic_core::AppConfig;
use civic_types::{NewEvent, ShapedEvent, StateCode};
use serde_json::{Value, json};
use tower::ServiceExt;

const ADMIN_KEY: &str = "test-admin-key";

fn config_with_key(key: Option<&str>) -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.admin_api_key = key.map(str::to_owned);
    config
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()
}

fn make_test_state() -> Arc<AppState> {
    Arc::new(AppState::in_memory(&config_with_key(Some(ADMIN_KEY))).with_fixed_today(today()))
}

async fn seed(state: &AppState, body: Value) -> ShapedEvent {
    let input: NewEvent = serde_json::from_value(body).unwrap();
    state.events.create(input.into_draft(Utc::now())).await.unwrap()
}

/// E1 has two bills and a tag, E2 has no children and is a day earlier.
/// A past California event and a Texas event must never appear in a
/// California listing.
async fn seed_california(state: &AppState) {
    seed(
        state,
        json!({
            "id": "e1",
            "name": "Assembly Budget Hearing",
            "date": "2030-03-02",
            "time": "10:00 AM",
            "state": "CA",
            "level": "state",
            "lat": 38.5767,
            "lng": -121.4934,
            "bills": [
                {"number": "AB 1", "title": "Budget Act"},
                {"number": "SB 2", "url": "https://example.gov/sb2"}
            ],
            "tags": ["budget"]
        }),
    )
    .await;
    seed(
        state,
        json!({
            "id": "e2",
            "name": "Board of Supervisors",
            "date": "2030-03-01",
            "state": "CA",
            "level": "local",
            "lat": 37.7793,
            "lng": -122.4193
        }),
    )
    .await;
    seed(
        state,
        json!({"id": "e3", "name": "Old hearing", "date": "2020-06-01", "state": "CA"}),
    )
    .await;
    seed(
        state,
        json!({"id": "e4", "name": "Texas hearing", "date": "2030-03-01", "state": "TX"}),
    )
    .await;
}

async fn send(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, Value) {
    let response = build_router(Arc::clone(state))
        .oneshot(request)
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn with_body(method: Method, uri: &str, key: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = key {
        builder = builder.header("X-API-Key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn delete(uri: &str, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::delete(uri);
    if let Some(key) = key {
        builder = builder.header("X-API-Key", key);
    }
    builder.body(Body::empty()).unwrap()
}

fn ids(body: &Value) -> Vec<&str> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect()
}

// =============================================================================
// Health and routing
// =============================================================================

#[tokio::test]
async fn health_reports_ok() {
    let state = make_test_state();
    let (status, body) = send(&state, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn unknown_path_is_json_404() {
    let state = make_test_state();
    let (status, body) = send(&state, get("/api/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn options_preflight_is_empty_200_with_cors() {
    let state = make_test_state();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/admin-events")
        .header(header::ORIGIN, "https://civic.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = build_router(state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn responses_carry_allow_origin() {
    let state = make_test_state();
    let request = Request::get("/health")
        .header(header::ORIGIN, "https://civic.example")
        .body(Body::empty())
        .unwrap();
    let response = build_router(state).oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

// =============================================================================
// State events
// =============================================================================

#[tokio::test]
async fn state_events_are_upcoming_shaped_and_date_ascending() {
    let state = make_test_state();
    seed_california(&state).await;

    let (status, body) = send(&state, get("/api/state-events?state=CA")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["e2", "e1"]);

    let e2 = &body[0];
    assert_eq!(e2["bills"], json!([]));
    assert_eq!(e2["tags"], json!([]));
    assert!(e2.get("agendaSummary").is_none());

    let e1 = &body[1];
    assert_eq!(e1["bills"].as_array().unwrap().len(), 2);
    assert_eq!(e1["bills"][0]["number"], "AB 1");
    assert_eq!(e1["bills"][1]["number"], "SB 2");
    assert_eq!(e1["tags"], json!(["budget"]));
    assert_eq!(e1["locationName"], Value::Null);
    assert_eq!(e1["allowsPublicParticipation"], false);
    assert!(e1.get("agendaSummary").is_none());
}

#[tokio::test]
async fn state_code_is_case_insensitive_and_limit_applies() {
    let state = make_test_state();
    seed_california(&state).await;

    let (status, body) = send(&state, get("/api/state-events?state=ca&limit=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["e2"]);
}

#[tokio::test]
async fn unknown_state_is_rejected() {
    let state = make_test_state();
    let (status, body) = send(&state, get("/api/state-events?state=ZZ")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert!(body["message"].as_str().unwrap().contains("state"));
}

#[tokio::test]
async fn missing_state_is_rejected() {
    let state = make_test_state();
    let (status, _) = send(&state, get("/api/state-events")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&state, get("/api/state-events?state=CA&limit=abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn every_listing_returns_bill_and_tag_arrays() {
    let state = make_test_state();
    seed_california(&state).await;

    for uri in [
        "/api/state-events?state=CA",
        "/api/admin-events",
        "/api/local-meetings?lat=38.0&lng=-122.0&radius=200",
    ] {
        let (status, body) = send(&state, get(uri)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        let events = body.as_array().unwrap();
        assert!(!events.is_empty(), "{uri}");
        for event in events {
            assert!(event["bills"].is_array(), "{uri}");
            assert!(event["tags"].is_array(), "{uri}");
        }
    }
}

// =============================================================================
// Local meetings
// =============================================================================

#[tokio::test]
async fn local_meetings_are_nearest_first_within_radius() {
    let state = make_test_state();
    seed_california(&state).await;
    seed(
        &state,
        json!({"id": "nogeo", "name": "Ungeocoded", "date": "2030-02-01", "state": "CA"}),
    )
    .await;

    // Centered on Sacramento; San Francisco is roughly 75 miles away.
    let (status, body) = send(
        &state,
        get("/api/local-meetings?lat=38.58&lng=-121.49&radius=100"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["e1", "e2"]);

    let (_, body) = send(
        &state,
        get("/api/local-meetings?lat=38.58&lng=-121.49&radius=10"),
    )
    .await;
    assert_eq!(ids(&body), vec!["e1"]);

    let (_, body) = send(
        &state,
        get("/api/local-meetings?lat=38.58&lng=-121.49&radius=100&level=local"),
    )
    .await;
    assert_eq!(ids(&body), vec!["e2"]);
}

#[tokio::test]
async fn local_meetings_validate_parameters() {
    let state = make_test_state();

    for uri in [
        "/api/local-meetings?lng=-121.49",
        "/api/local-meetings?lat=38.58",
        "/api/local-meetings?lat=north&lng=-121.49",
        "/api/local-meetings?lat=95&lng=-121.49",
        "/api/local-meetings?lat=38.58&lng=-121.49&radius=1000",
        "/api/local-meetings?lat=38.58&lng=-121.49&radius=0",
        "/api/local-meetings?lat=38.58&lng=-121.49&level=galactic",
    ] {
        let (status, body) = send(&state, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].is_string(), "{uri}");
    }
}

// =============================================================================
// Admin events
// =============================================================================

fn new_event_body(id: &str) -> Value {
    json!({
        "id": id,
        "name": "Planning Commission",
        "date": "2030-04-10",
        "state": "or",
        "committeeName": "Planning",
        "detailsUrl": "https://example.gov/planning",
        "bills": [{"number": "HB 3"}],
        "tags": ["zoning", "zoning", "housing"]
    })
}

#[tokio::test]
async fn create_without_key_is_rejected_and_nothing_is_stored() {
    let state = make_test_state();

    let (status, body) = send(
        &state,
        with_body(Method::POST, "/api/admin-events", None, &new_event_body("x1")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &state,
        with_body(
            Method::POST,
            "/api/admin-events",
            Some("wrong-key"),
            &new_event_body("x1"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, listed) = send(&state, get("/api/admin-events")).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn auth_runs_before_body_parsing() {
    let state = make_test_state();
    let request = Request::post("/api/admin-events")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&state, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn mutations_are_rejected_when_no_key_is_configured() {
    let state = Arc::new(AppState::in_memory(&config_with_key(None)).with_fixed_today(today()));
    let (status, _) = send(
        &state,
        with_body(Method::POST, "/api/admin-events", Some(""), &new_event_body("x1")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let blank = Arc::new(AppState::in_memory(&config_with_key(Some("  "))));
    let (status, _) = send(&blank, delete("/api/admin-events?id=x1", Some("  "))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_returns_201_with_shaped_event() {
    let state = make_test_state();
    let (status, body) = send(
        &state,
        with_body(
            Method::POST,
            "/api/admin-events",
            Some(ADMIN_KEY),
            &new_event_body("or-planning"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], "or-planning");
    assert_eq!(body["state"], "OR");
    assert_eq!(body["committeeName"], "Planning");
    assert_eq!(body["bills"], json!([{"number": "HB 3", "title": null, "url": null, "summary": null}]));
    assert_eq!(body["tags"], json!(["zoning", "housing"]));

    let (status, fetched) = send(&state, get("/api/admin-events?id=or-planning")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, body);

    let (status, _) = send(&state, get("/api/state-events?state=OR")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn create_generates_an_id_when_absent() {
    let state = make_test_state();
    let mut body = new_event_body("unused");
    body.as_object_mut().unwrap().remove("id");

    let (status, created) = send(
        &state,
        with_body(Method::POST, "/api/admin-events", Some(ADMIN_KEY), &body),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["id"].as_str().unwrap().starts_with("evt-"));
}

#[tokio::test]
async fn create_rejects_invalid_bodies() {
    let state = make_test_state();

    let mut bad_state = new_event_body("bad-state");
    bad_state["state"] = json!("ZZ");
    let mut bad_url = new_event_body("bad-url");
    bad_url["detailsUrl"] = json!("not a url");
    let missing_name = json!({"date": "2030-04-10", "state": "OR"});
    let bad_date = json!({"name": "x", "date": "April 10th", "state": "OR"});

    for body in [bad_state, bad_url, missing_name, bad_date] {
        let (status, response) = send(
            &state,
            with_body(Method::POST, "/api/admin-events", Some(ADMIN_KEY), &body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert!(response["error"].is_string());
    }

    let (_, listed) = send(&state, get("/api/admin-events")).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn duplicate_id_is_a_conflict() {
    let state = make_test_state();
    seed_california(&state).await;

    let (status, body) = send(
        &state,
        with_body(
            Method::POST,
            "/api/admin-events",
            Some(ADMIN_KEY),
            &new_event_body("e1"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn admin_listing_includes_past_events_latest_first() {
    let state = make_test_state();
    seed_california(&state).await;

    let (status, body) = send(&state, get("/api/admin-events")).await;
    assert_eq!(status, StatusCode::OK);
    let listed = ids(&body);
    assert_eq!(listed.len(), 4);
    assert_eq!(listed[0], "e1");
    assert_eq!(listed[3], "e3");

    let (_, body) = send(&state, get("/api/admin-events?limit=2")).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, _) = send(&state, get("/api/admin-events?id=missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_merges_fields_and_replaces_children() {
    let state = make_test_state();
    seed_california(&state).await;

    let (status, body) = send(
        &state,
        with_body(
            Method::PUT,
            "/api/admin-events?id=e1",
            Some(ADMIN_KEY),
            &json!({"name": "Renamed hearing", "tags": ["revenue"], "bills": []}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "e1");
    assert_eq!(body["name"], "Renamed hearing");
    assert_eq!(body["time"], "10:00 AM");
    assert_eq!(body["tags"], json!(["revenue"]));
    assert_eq!(body["bills"], json!([]));

    // Omitting bills and tags keeps them.
    let (_, body) = send(
        &state,
        with_body(
            Method::PUT,
            "/api/admin-events?id=e1",
            Some(ADMIN_KEY),
            &json!({"allowsPublicParticipation": true}),
        ),
    )
    .await;
    assert_eq!(body["tags"], json!(["revenue"]));
    assert_eq!(body["allowsPublicParticipation"], true);
}

#[tokio::test]
async fn update_reports_missing_and_unknown_ids() {
    let state = make_test_state();

    let (status, _) = send(
        &state,
        with_body(
            Method::PUT,
            "/api/admin-events?id=ghost",
            Some(ADMIN_KEY),
            &json!({"name": "x"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &state,
        with_body(
            Method::PUT,
            "/api/admin-events",
            Some(ADMIN_KEY),
            &json!({"name": "x"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &state,
        with_body(
            Method::PUT,
            "/api/admin-events?id=ghost",
            None,
            &json!({"name": "x"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let state = make_test_state();
    seed_california(&state).await;

    let (status, body) = send(&state, delete("/api/admin-events?id=e1", Some(ADMIN_KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"deleted": true, "id": "e1"}));

    let (status, body) = send(&state, delete("/api/admin-events?id=e1", Some(ADMIN_KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"deleted": false, "id": "e1"}));

    let (_, body) = send(&state, get("/api/state-events?state=CA")).await;
    assert_eq!(ids(&body), vec!["e2"]);

    let (status, _) = send(&state, delete("/api/admin-events", Some(ADMIN_KEY))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&state, delete("/api/admin-events?id=e2", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn agenda_summary_is_attached_to_listings() {
    let state = make_test_state();
    seed_california(&state).await;

    let (status, body) = send(
        &state,
        with_body(
            Method::POST,
            "/api/agenda-summaries",
            Some(ADMIN_KEY),
            &json!({"eventId": "e2", "summary": "Budget review and public comment."}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["agendaSummary"], "Budget review and public comment.");

    let (_, listed) = send(&state, get("/api/state-events?state=CA")).await;
    assert_eq!(listed[0]["agendaSummary"], "Budget review and public comment.");
    assert!(listed[1].get("agendaSummary").is_none());

    let (status, _) = send(
        &state,
        with_body(
            Method::POST,
            "/api/agenda-summaries",
            Some(ADMIN_KEY),
            &json!({"eventId": "ghost", "summary": "x"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &state,
        with_body(
            Method::POST,
            "/api/agenda-summaries",
            Some(ADMIN_KEY),
            &json!({"eventId": "e1", "summary": ""}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn blank_summary_is_rejected_and_keeps_the_previous_one() {
    let state = make_test_state();
    seed_california(&state).await;

    let (status, _) = send(
        &state,
        with_body(
            Method::POST,
            "/api/agenda-summaries",
            Some(ADMIN_KEY),
            &json!({"eventId": "e1", "summary": "Budget hearing with public testimony."}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &state,
        with_body(
            Method::POST,
            "/api/agenda-summaries",
            Some(ADMIN_KEY),
            &json!({"eventId": "e1", "summary": "   "}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &state,
        with_body(
            Method::POST,
            "/api/agenda-summaries",
            Some(ADMIN_KEY),
            &json!({"eventId": "  ", "summary": "Orphan"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, fetched) = send(&state, get("/api/admin-events?id=e1")).await;
    assert_eq!(
        fetched["agendaSummary"],
        "Budget hearing with public testimony."
    );
}

#[tokio::test]
async fn repeated_bill_numbers_are_stored_once() {
    let state = make_test_state();
    let mut body = new_event_body("dup-bills");
    body["bills"] = json!([
        {"number": "AB 1", "title": "Budget Act"},
        {"number": "AB 1", "title": "Budget Act (again)"}
    ]);

    let (status, created) = send(
        &state,
        with_body(Method::POST, "/api/admin-events", Some(ADMIN_KEY), &body),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["bills"].as_array().unwrap().len(), 1);
    assert_eq!(created["bills"][0]["title"], "Budget Act");

    let (status, updated) = send(
        &state,
        with_body(
            Method::PUT,
            "/api/admin-events?id=dup-bills",
            Some(ADMIN_KEY),
            &json!({"bills": [{"number": "SB 5"}, {"number": "SB 5"}, {"number": "AB 1"}]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let numbers: Vec<&str> = updated["bills"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["number"].as_str().unwrap())
        .collect();
    assert_eq!(numbers, vec!["SB 5", "AB 1"]);
}

// =============================================================================
// Scraper configurations
// =============================================================================

fn scraper_body(name: &str) -> Value {
    json!({
        "name": name,
        "url": "https://example.gov/calendar",
        "fields": {"title": ".event-title", "date": {"selector": ".when", "format": "%m/%d/%Y"}},
        "aiFields": {"summary": {"prompt": "Summarize the agenda", "maxTokens": 200}},
        "storage": {"type": "database", "table": "events"}
    })
}

#[tokio::test]
async fn scraper_config_round_trips() {
    let state = make_test_state();
    let input = scraper_body("County calendar");

    let (status, created) = send(
        &state,
        with_body(Method::POST, "/api/scraper-configs", Some(ADMIN_KEY), &input),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_owned();
    assert_eq!(created["enabled"], true);

    let (status, listed) = send(&state, get("/api/scraper-configs")).await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], id.as_str());
    assert_eq!(listed[0]["fields"], input["fields"]);
    assert_eq!(listed[0]["aiFields"], input["aiFields"]);
    assert_eq!(listed[0]["storage"], input["storage"]);

    let (status, one) = send(&state, get(&format!("/api/scraper-configs?id={id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one, created);

    let mut replacement = scraper_body("Renamed calendar");
    replacement["enabled"] = json!(false);
    let (status, replaced) = send(
        &state,
        with_body(
            Method::PUT,
            &format!("/api/scraper-configs?id={id}"),
            Some(ADMIN_KEY),
            &replacement,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replaced["name"], "Renamed calendar");
    assert_eq!(replaced["enabled"], false);
    assert_eq!(replaced["createdAt"], created["createdAt"]);

    let uri = format!("/api/scraper-configs?id={id}");
    let (status, body) = send(&state, delete(&uri, Some(ADMIN_KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"deleted": true, "id": id}));

    let (status, _) = send(&state, delete(&uri, Some(ADMIN_KEY))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&state, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&state, get("/api/scraper-configs?id=not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn scraper_config_mutations_validate_ids_and_keys() {
    let state = make_test_state();

    let (status, _) = send(
        &state,
        with_body(
            Method::POST,
            "/api/scraper-configs",
            None,
            &scraper_body("No key"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &state,
        delete("/api/scraper-configs?id=not-a-uuid", Some(ADMIN_KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&state, delete("/api/scraper-configs", Some(ADMIN_KEY))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let unknown = uuid::Uuid::now_v7();
    let (status, _) = send(
        &state,
        with_body(
            Method::PUT,
            &format!("/api/scraper-configs?id={unknown}"),
            Some(ADMIN_KEY),
            &scraper_body("Ghost"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut bad_fields = scraper_body("Bad");
    bad_fields["fields"] = json!("title");
    let (status, _) = send(
        &state,
        with_body(Method::POST, "/api/scraper-configs", Some(ADMIN_KEY), &bad_fields),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, listed) = send(&state, get("/api/scraper-configs")).await;
    assert_eq!(listed, json!([]));
}

// =============================================================================
// Scrape cache
// =============================================================================

#[tokio::test]
async fn cache_info_and_invalidate() {
    let state = make_test_state();
    let ca = StateCode::parse("CA").unwrap();
    let ny = StateCode::parse("NY").unwrap();
    state
        .cache
        .put(&ca, "senate", &json!([{"id": "e1"}]), None)
        .await
        .unwrap();
    state
        .cache
        .put(&ny, "assembly", &json!([]), Some(std::time::Duration::from_secs(3600)))
        .await
        .unwrap();

    let (status, body) = send(&state, get("/api/cache-info?state=CA")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "CA");
    assert_eq!(body["count"], 1);
    assert_eq!(body["entries"][0]["key"], "scrape:CA:senate");
    assert!(body["entries"][0]["cachedAt"].is_string());
    assert_eq!(body["entries"][0]["ttlSeconds"], Value::Null);

    let (_, body) = send(&state, get("/api/cache-info")).await;
    assert_eq!(body["state"], Value::Null);
    assert_eq!(body["count"], 2);

    let (status, body) = send(&state, get("/api/invalidate-cache?state=ca")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"state": "CA", "invalidated": 1}));

    let (_, body) = send(&state, get("/api/cache-info?state=CA")).await;
    assert_eq!(body["count"], 0);

    let (status, _) = send(&state, get("/api/invalidate-cache")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&state, get("/api/cache-info?state=ZZ")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
