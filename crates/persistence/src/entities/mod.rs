//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod location;
pub mod profile;
pub mod proximity_alert;
pub mod proximity_match;

pub use location::UserLocationEntity;
pub use profile::UserProfileEntity;
pub use proximity_alert::ProximityAlertEntity;
pub use proximity_match::ProximityMatchEntity;
