//! Social graph records consumed for visibility scoping.
//!
//! Circles and connections are created elsewhere; this crate only reads them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Role within a circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CircleRole {
    Owner,
    Admin,
    Member,
}

impl CircleRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircleRole::Owner => "owner",
            CircleRole::Admin => "admin",
            CircleRole::Member => "member",
        }
    }
}

impl FromStr for CircleRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(CircleRole::Owner),
            "admin" => Ok(CircleRole::Admin),
            "member" => Ok(CircleRole::Member),
            _ => Err(format!("Invalid circle role: {}", s)),
        }
    }
}

/// Membership of a user in a circle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleMembership {
    pub circle_id: Uuid,
    pub user_id: Uuid,
    pub role: CircleRole,
}

/// Status of a symmetric connection between two users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Blocked,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Pending => "pending",
            ConnectionStatus::Accepted => "accepted",
            ConnectionStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A connection between two users. Direction carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub user_a_id: Uuid,
    pub user_b_id: Uuid,
    pub status: ConnectionStatus,
}

impl Connection {
    /// Returns the other side of the connection if `user_id` is one of its ends.
    pub fn other(&self, user_id: Uuid) -> Option<Uuid> {
        if self.user_a_id == user_id {
            Some(self.user_b_id)
        } else if self.user_b_id == user_id {
            Some(self.user_a_id)
        } else {
            None
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == ConnectionStatus::Accepted
    }
}
