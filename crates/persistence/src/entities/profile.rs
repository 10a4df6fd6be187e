//! User profile read-model entity.

use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{Gender, UserProfileSnapshot};
use domain::StoreError;

/// Database row mapping for the user_profiles table.
#[derive(Debug, Clone, FromRow)]
pub struct UserProfileEntity {
    pub user_id: Uuid,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub interests: Vec<String>,
    pub trust_score: Option<i32>,
    pub activity_intent: Option<String>,
}

impl TryFrom<UserProfileEntity> for UserProfileSnapshot {
    type Error = StoreError;

    fn try_from(entity: UserProfileEntity) -> Result<Self, Self::Error> {
        let gender = entity
            .gender
            .as_deref()
            .map(str::parse::<Gender>)
            .transpose()
            .map_err(StoreError::InvalidData)?;
        Ok(Self {
            user_id: entity.user_id,
            age: entity.age,
            gender,
            interests: entity.interests,
            trust_score: entity.trust_score,
            activity_intent: entity.activity_intent,
        })
    }
}
