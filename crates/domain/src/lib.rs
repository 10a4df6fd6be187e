//! Domain layer for the proximity backend.
//!
//! This crate contains:
//! - Domain models (location state, visibility, proximity alerts and matches)
//! - Geo primitives (distance, blurring, geohash cells)
//! - Store and collaborator traits
//! - The visibility resolver and the proximity alert engine
//! - Domain error types

pub mod error;
pub mod geo;
pub mod models;
pub mod services;

pub use error::{DomainError, StoreError};
