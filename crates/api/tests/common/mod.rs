//! Common test utilities for integration tests.
//!
//! The router is driven in-process over the in-memory backend.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use uuid::Uuid;

use domain::services::{InMemoryStore, MockNotificationDispatcher};
use proximity_api::app::{create_app, AppState, Stores};
use proximity_api::config::{
    Config, DatabaseConfig, JobsConfig, LoggingConfig, ProximityConfig, SecurityConfig,
    ServerConfig, StorageBackend, StorageConfig,
};
use proximity_api::extractors::USER_ID_HEADER;

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
        },
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 10,
            idle_timeout_secs: 600,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig::default(),
        storage: StorageConfig {
            backend: StorageBackend::Memory,
        },
        proximity: ProximityConfig::default(),
        jobs: JobsConfig { enabled: false },
    }
}

/// A router plus handles on its backing store and dispatcher.
pub struct TestApp {
    pub app: Router,
    pub store: Arc<InMemoryStore>,
    pub dispatcher: Arc<MockNotificationDispatcher>,
}

impl TestApp {
    /// Every user is premium.
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryStore::with_all_premium()))
    }

    pub fn with_store(store: Arc<InMemoryStore>) -> Self {
        let dispatcher = Arc::new(MockNotificationDispatcher::new());
        let state = AppState::new(
            test_config(),
            Stores::memory(store.clone()),
            dispatcher.clone(),
            None,
        );
        Self {
            app: create_app(state),
            store,
            dispatcher,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        use tower::ServiceExt;
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Report a position for `user` and return the response.
    pub async fn report_location(&self, user: Uuid, latitude: f64, longitude: f64) -> Response {
        self.send(json_request(
            Method::POST,
            "/api/v1/locations",
            serde_json::json!({ "latitude": latitude, "longitude": longitude }),
            user,
        ))
        .await
    }

    pub async fn set_visibility(&self, user: Uuid, body: serde_json::Value) -> Response {
        self.send(json_request(Method::PUT, "/api/v1/visibility", body, user))
            .await
    }
}

/// Build a JSON request carrying the caller id header.
pub fn json_request(
    method: Method,
    uri: &str,
    body: serde_json::Value,
    user: Uuid,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(USER_ID_HEADER, user.to_string())
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

pub fn get_request(uri: &str, user: Uuid) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(USER_ID_HEADER, user.to_string())
        .body(Body::empty())
        .unwrap()
}

pub fn delete_request(uri: &str, user: Uuid) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header(USER_ID_HEADER, user.to_string())
        .body(Body::empty())
        .unwrap()
}

pub async fn parse_response_body(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
}
