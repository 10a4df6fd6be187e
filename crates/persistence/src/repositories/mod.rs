//! Repository implementations of the domain store traits.

pub mod location;
pub mod profile;
pub mod proximity_alert;
pub mod social;

pub use location::LocationRepository;
pub use profile::{ProfileRepository, SubscriptionRepository};
pub use proximity_alert::ProximityAlertRepository;
pub use social::SocialGraphRepository;
