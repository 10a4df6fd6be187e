//! Domain models for the proximity backend.

pub mod location;
pub mod profile;
pub mod proximity_alert;
pub mod proximity_match;
pub mod social;
pub mod visibility;

pub use location::{Coordinate, UserLocationState};
pub use profile::{Gender, UserProfileSnapshot};
pub use proximity_alert::{AlertCriteria, AlertUpdate, NewProximityAlert, ProximityAlert};
pub use proximity_match::{MatchInsert, NewProximityMatch, ProximityMatch};
pub use social::{CircleMembership, CircleRole, Connection, ConnectionStatus};
pub use visibility::{Precision, VisibilityDecision, VisibilityLevel, VisibleUser};
