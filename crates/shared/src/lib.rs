//! Shared utilities and common types for the proximity backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Hashing utilities (seed derivation for deterministic offsets)
//! - Common validation logic for coordinates and tags

pub mod crypto;
pub mod validation;
