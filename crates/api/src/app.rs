use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use domain::services::{
    AlertService, EntitlementService, InMemoryStore, LocationService, LocationStore,
    NotificationDispatcher, ProfileProvider, ProximityAlertStore, ProximityEngine, SocialGraph,
    VisibilityResolver,
};
use persistence::repositories::{
    LocationRepository, ProfileRepository, ProximityAlertRepository, SocialGraphRepository,
    SubscriptionRepository,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{health, locations, proximity_alerts, visibility};

/// Store implementations behind the domain services.
#[derive(Clone)]
pub struct Stores {
    pub locations: Arc<dyn LocationStore>,
    pub social: Arc<dyn SocialGraph>,
    pub alerts: Arc<dyn ProximityAlertStore>,
    pub profiles: Arc<dyn ProfileProvider>,
    pub entitlements: Arc<dyn EntitlementService>,
}

impl Stores {
    /// Every store served by one in-memory instance.
    pub fn memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            locations: store.clone(),
            social: store.clone(),
            alerts: store.clone(),
            profiles: store.clone(),
            entitlements: store,
        }
    }

    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            locations: Arc::new(LocationRepository::new(pool.clone())),
            social: Arc::new(SocialGraphRepository::new(pool.clone())),
            alerts: Arc::new(ProximityAlertRepository::new(pool.clone())),
            profiles: Arc::new(ProfileRepository::new(pool.clone())),
            entitlements: Arc::new(SubscriptionRepository::new(pool.clone())),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub locations: Arc<LocationService>,
    pub alerts: Arc<AlertService>,
    pub visibility: Arc<VisibilityResolver>,
    /// Present only with the postgres backend.
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn new(
        config: Config,
        stores: Stores,
        dispatcher: Arc<dyn NotificationDispatcher>,
        pool: Option<PgPool>,
    ) -> Self {
        let settings = config.proximity.settings();

        let engine = Arc::new(ProximityEngine::new(
            stores.locations.clone(),
            stores.alerts.clone(),
            dispatcher,
            settings.clone(),
        ));
        let locations = LocationService::new(
            stores.locations.clone(),
            stores.profiles.clone(),
            engine,
            settings.clone(),
        );
        let alerts = AlertService::new(
            stores.alerts.clone(),
            stores.entitlements.clone(),
            settings.clone(),
        );
        let visibility = VisibilityResolver::new(stores.locations, stores.social, settings);

        Self {
            config: Arc::new(config),
            locations: Arc::new(locations),
            alerts: Arc::new(alerts),
            visibility: Arc::new(visibility),
            pool,
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security.cors_origins);
    let request_timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    // Caller identity comes from the X-User-Id extractor on each handler.
    let api_routes = Router::new()
        .route("/api/v1/locations", post(locations::report_location))
        .route(
            "/api/v1/visibility",
            get(visibility::get_visibility_settings).put(visibility::set_visibility_level),
        )
        .route("/api/v1/nearby", get(visibility::list_nearby_users))
        .route(
            "/api/v1/users/:user_id/visibility",
            get(visibility::resolve_user_visibility),
        )
        .route(
            "/api/v1/proximity-alerts",
            post(proximity_alerts::create_proximity_alert)
                .get(proximity_alerts::list_proximity_alerts),
        )
        .route(
            "/api/v1/proximity-alerts/:alert_id",
            get(proximity_alerts::get_proximity_alert)
                .patch(proximity_alerts::update_proximity_alert)
                .delete(proximity_alerts::delete_proximity_alert),
        )
        .route(
            "/api/v1/proximity-alerts/:alert_id/matches",
            get(proximity_alerts::list_proximity_matches),
        );

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
