//! Domain services for the proximity backend.
//!
//! Services contain business logic that operates on domain models and talks
//! to storage only through the traits in [`store`].

pub mod alert_management;
pub mod location;
pub mod memory;
pub mod notification;
pub mod proximity_engine;
pub mod settings;
pub mod store;
pub mod visibility;

pub use alert_management::AlertService;
pub use location::LocationService;
pub use memory::InMemoryStore;
pub use notification::{
    MockNotificationDispatcher, NotificationDispatcher, NotificationResult, NotificationType,
    ProximityMatchEvent,
};
pub use proximity_engine::{evaluate_criteria, CriteriaMiss, CriteriaOutcome, ProximityEngine};
pub use settings::ProximitySettings;
pub use store::{
    EntitlementService, LocationStore, ProfileProvider, ProximityAlertStore, SocialGraph,
    StoreResult,
};
pub use visibility::{decide, Relation, VisibilityResolver};
