//! HTTP route handlers.

pub mod health;
pub mod locations;
pub mod proximity_alerts;
pub mod visibility;
