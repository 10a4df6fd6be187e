//! Integration tests for proximity alert endpoints.

mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use common::{delete_request, get_request, json_request, parse_response_body, TestApp};
use domain::services::InMemoryStore;
use fake::{faker::lorem::en::Word, Fake};
use serde_json::json;
use uuid::Uuid;

fn alert_body() -> serde_json::Value {
    let name: String = Word().fake();
    json!({
        "name": name,
        "latitude": 37.7749,
        "longitude": -122.4194,
        "radiusMeters": 1000,
        "criteria": {
            "minAge": 25,
            "maxAge": 40,
            "interests": ["Climbing", "climbing", "Jazz"]
        }
    })
}

async fn create(test: &TestApp, owner: Uuid, body: serde_json::Value) -> axum::response::Response {
    test.send(json_request(
        Method::POST,
        "/api/v1/proximity-alerts",
        body,
        owner,
    ))
    .await
}

#[tokio::test]
async fn test_create_proximity_alert_success() {
    let test = TestApp::new();
    let owner = Uuid::new_v4();

    let response = create(&test, owner, alert_body()).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = parse_response_body(response).await;
    assert!(body["alertId"].is_string());
    assert_eq!(body["radiusMeters"], 1000);
    assert_eq!(body["cooldownMinutes"], 60);
    assert_eq!(body["maxTriggersPerDay"], 10);
    assert_eq!(body["triggersToday"], 0);
    assert_eq!(body["isActive"], true);
    assert_eq!(body["criteria"]["interests"], json!(["climbing", "jazz"]));
}

#[tokio::test]
async fn test_create_rejects_radius_out_of_range() {
    let test = TestApp::new();
    let mut body = alert_body();
    body["radiusMeters"] = json!(10);

    let response = create(&test, Uuid::new_v4(), body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_rejects_inverted_age_range() {
    let test = TestApp::new();
    let mut body = alert_body();
    body["criteria"]["minAge"] = json!(50);

    let response = create(&test, Uuid::new_v4(), body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sixth_alert_hits_limit() {
    let test = TestApp::new();
    let owner = Uuid::new_v4();

    for _ in 0..5 {
        let response = create(&test, owner, alert_body()).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = create(&test, owner, alert_body()).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "limit_exceeded");

    let response = test
        .send(get_request("/api/v1/proximity-alerts", owner))
        .await;
    let body = parse_response_body(response).await;
    assert_eq!(body["total"], 5);
}

#[tokio::test]
async fn test_non_premium_owner_forbidden() {
    let test = TestApp::with_store(Arc::new(InMemoryStore::new()));
    let response = create(&test, Uuid::new_v4(), alert_body()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let premium = Uuid::new_v4();
    test.store.set_premium(premium, true);
    let response = create(&test, premium, alert_body()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_other_owners_alert_is_not_found() {
    let test = TestApp::new();
    let owner = Uuid::new_v4();
    let body = parse_response_body(create(&test, owner, alert_body()).await).await;
    let alert_id = body["alertId"].as_str().unwrap();
    let uri = format!("/api/v1/proximity-alerts/{}", alert_id);

    let intruder = Uuid::new_v4();
    let response = test.send(get_request(&uri, intruder)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = test.send(delete_request(&uri, intruder)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = test.send(get_request(&uri, owner)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_update_proximity_alert() {
    let test = TestApp::new();
    let owner = Uuid::new_v4();
    let body = parse_response_body(create(&test, owner, alert_body()).await).await;
    let uri = format!(
        "/api/v1/proximity-alerts/{}",
        body["alertId"].as_str().unwrap()
    );

    let response = test
        .send(json_request(
            Method::PATCH,
            &uri,
            json!({ "radiusMeters": 2500, "isActive": false }),
            owner,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = parse_response_body(response).await;
    assert_eq!(updated["radiusMeters"], 2500);
    assert_eq!(updated["isActive"], false);
    assert_eq!(updated["name"], body["name"]);

    // Moving the center needs both coordinates.
    let response = test
        .send(json_request(
            Method::PATCH,
            &uri,
            json!({ "latitude": 40.0 }),
            owner,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = test
        .send(json_request(
            Method::PATCH,
            &uri,
            json!({ "latitude": 40.7128, "longitude": -74.0060 }),
            owner,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let moved = parse_response_body(response).await;
    assert_eq!(moved["latitude"], 40.7128);
}

#[tokio::test]
async fn test_delete_proximity_alert() {
    let test = TestApp::new();
    let owner = Uuid::new_v4();
    let body = parse_response_body(create(&test, owner, alert_body()).await).await;
    let uri = format!(
        "/api/v1/proximity-alerts/{}",
        body["alertId"].as_str().unwrap()
    );

    let response = test.send(delete_request(&uri, owner)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = test.send(get_request(&uri, owner)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = test
        .send(get_request(&format!("{}/matches", uri), owner))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_requires_user_header() {
    let test = TestApp::new();
    let request = axum::http::Request::builder()
        .uri("/api/v1/proximity-alerts")
        .header("X-User-Id", "not-a-uuid")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = test.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_endpoints_on_memory_backend() {
    let test = TestApp::new();
    let request = axum::http::Request::builder()
        .uri("/api/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = test.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "memory");
    assert!(body.get("database").is_none());
}
