//! Integration tests for visibility settings and nearby lookups.

mod common;

use axum::http::StatusCode;
use common::{get_request, parse_response_body, TestApp};
use domain::geo;
use domain::models::{ConnectionStatus, Coordinate};
use serde_json::json;
use uuid::Uuid;

const SF_LAT: f64 = 37.7749;
const SF_LNG: f64 = -122.4194;

fn nearby_uri(latitude: f64, longitude: f64, radius: f64) -> String {
    format!(
        "/api/v1/nearby?latitude={}&longitude={}&radiusMeters={}",
        latitude, longitude, radius
    )
}

fn user_visibility_uri(user: Uuid, latitude: f64, longitude: f64, radius: f64) -> String {
    format!(
        "/api/v1/users/{}/visibility?latitude={}&longitude={}&radiusMeters={}",
        user, latitude, longitude, radius
    )
}

fn listed_ids(body: &serde_json::Value) -> Vec<String> {
    body["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["userId"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_set_beacon_uses_default_duration() {
    let test = TestApp::new();
    let user = Uuid::new_v4();

    let response = test.set_visibility(user, json!({ "level": "beacon" })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["level"], "beacon");
    assert!(body["beaconExpiresAt"].is_string());

    let response = test.send(get_request("/api/v1/visibility", user)).await;
    let body = parse_response_body(response).await;
    assert_eq!(body["level"], "beacon");
}

#[tokio::test]
async fn test_duration_rejected_for_non_beacon_level() {
    let test = TestApp::new();
    let response = test
        .set_visibility(
            Uuid::new_v4(),
            json!({ "level": "ghost", "beaconDurationMinutes": 30 }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ghost_member_absent_from_nearby() {
    let test = TestApp::new();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    test.store.add_circle_member(Uuid::new_v4(), &[a, b]);

    test.report_location(b, SF_LAT, SF_LNG).await;

    // Default level is circles, so A sees B exactly.
    let response = test
        .send(get_request(&nearby_uri(SF_LAT, SF_LNG, 50_000.0), a))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(listed_ids(&body), vec![b.to_string()]);
    assert_eq!(body["users"][0]["precision"], "exact");

    test.set_visibility(b, json!({ "level": "ghost" })).await;

    let response = test
        .send(get_request(&nearby_uri(SF_LAT, SF_LNG, 50_000.0), a))
        .await;
    let body = parse_response_body(response).await;
    assert_eq!(body["total"], 0);
    assert!(listed_ids(&body).is_empty());
}

#[tokio::test]
async fn test_ghost_connection_absent_from_nearby() {
    let test = TestApp::new();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    test.store.add_connection(a, b, ConnectionStatus::Accepted);

    test.report_location(b, SF_LAT, SF_LNG).await;
    test.set_visibility(b, json!({ "level": "social" })).await;

    let response = test
        .send(get_request(&nearby_uri(SF_LAT, SF_LNG, 50_000.0), a))
        .await;
    let body = parse_response_body(response).await;
    assert_eq!(listed_ids(&body), vec![b.to_string()]);

    test.set_visibility(b, json!({ "level": "ghost" })).await;

    let response = test
        .send(get_request(&nearby_uri(SF_LAT, SF_LNG, 50_000.0), a))
        .await;
    let body = parse_response_body(response).await;
    assert!(listed_ids(&body).is_empty());

    let response = test
        .send(get_request(&user_visibility_uri(b, SF_LAT, SF_LNG, 50_000.0), a))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["visible"], false);
}

#[tokio::test]
async fn test_fuzzy_user_blurred_for_strangers_exact_for_members() {
    let test = TestApp::new();
    let c = Uuid::new_v4();
    let d = Uuid::new_v4();
    let e = Uuid::new_v4();
    test.store.add_circle_member(Uuid::new_v4(), &[c, e]);

    test.report_location(c, SF_LAT, SF_LNG).await;
    test.set_visibility(c, json!({ "level": "fuzzy" })).await;

    let response = test
        .send(get_request(&user_visibility_uri(c, SF_LAT, SF_LNG, 10_000.0), d))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["visible"], true);
    assert_eq!(body["precision"], "approximate");
    let blurred = Coordinate::new(
        body["coordinate"]["latitude"].as_f64().unwrap(),
        body["coordinate"]["longitude"].as_f64().unwrap(),
    );
    let offset = geo::distance(Coordinate::new(SF_LAT, SF_LNG), blurred);
    assert!((499.0..=1501.0).contains(&offset), "offset {}", offset);

    // Same observer, same day: same point.
    let response = test
        .send(get_request(&user_visibility_uri(c, SF_LAT, SF_LNG, 10_000.0), d))
        .await;
    let again = parse_response_body(response).await;
    assert_eq!(again["coordinate"], body["coordinate"]);

    let response = test
        .send(get_request(&user_visibility_uri(c, SF_LAT, SF_LNG, 10_000.0), e))
        .await;
    let body = parse_response_body(response).await;
    assert_eq!(body["precision"], "exact");
    assert_eq!(body["coordinate"]["latitude"], SF_LAT);
    assert_eq!(body["coordinate"]["longitude"], SF_LNG);
}

#[tokio::test]
async fn test_hidden_user_reports_not_visible() {
    let test = TestApp::new();
    let stranger = Uuid::new_v4();
    let observer = Uuid::new_v4();
    test.report_location(stranger, SF_LAT, SF_LNG).await;

    let response = test
        .send(get_request(
            &user_visibility_uri(stranger, SF_LAT, SF_LNG, 1_000.0),
            observer,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["visible"], false);
    assert!(body.get("coordinate").is_none());
}

#[tokio::test]
async fn test_nearby_rejects_oversized_radius() {
    let test = TestApp::new();
    let response = test
        .send(get_request(
            &nearby_uri(SF_LAT, SF_LNG, 60_000.0),
            Uuid::new_v4(),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "validation_error");
}
