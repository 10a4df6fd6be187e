//! Read-only profile snapshot consumed by alert matching.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Self-reported gender used for alert criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Female,
    Male,
    NonBinary,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "female",
            Gender::Male => "male",
            Gender::NonBinary => "non_binary",
            Gender::Other => "other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "female" => Ok(Gender::Female),
            "male" => Ok(Gender::Male),
            "non_binary" => Ok(Gender::NonBinary),
            "other" => Ok(Gender::Other),
            _ => Err(format!("Invalid gender: {}", s)),
        }
    }
}

/// Profile fields of the reporting user, owned by the profile subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileSnapshot {
    pub user_id: Uuid,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    #[serde(default)]
    pub interests: Vec<String>,
    pub trust_score: Option<i32>,
    pub activity_intent: Option<String>,
}

impl UserProfileSnapshot {
    /// Returns false for snapshots whose values cannot be trusted for matching.
    pub fn is_well_formed(&self) -> bool {
        self.age.map_or(true, |age| (0..=150).contains(&age))
            && self
                .trust_score
                .map_or(true, |score| (0..=100).contains(&score))
    }
}
