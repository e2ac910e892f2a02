// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! The services only see the store traits below; Firestore is the production
//! backend and [`MemoryDb`] backs local runs and tests.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{Activity, DeadLetter, NewActivity, Recommendation};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const ACTIVITIES: &str = "activities";
    /// Keyed by activity ID
    pub const RECOMMENDATIONS: &str = "recommendations";
    pub const DEAD_LETTERS: &str = "dead_letters";
}

/// Persistence for tracked activities.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Persist a new activity, assigning its identifier and timestamps.
    async fn create_activity(&self, activity: NewActivity) -> Result<Activity, AppError>;

    async fn get_activity(&self, activity_id: &str) -> Result<Option<Activity>, AppError>;

    /// Activities for a user, most recent first.
    async fn get_activities_for_user(&self, user_id: &str) -> Result<Vec<Activity>, AppError>;
}

/// Persistence for normalized recommendations.
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    /// Create or overwrite the recommendation for `recommendation.activity_id`.
    async fn upsert_recommendation(&self, recommendation: &Recommendation)
        -> Result<(), AppError>;

    async fn get_recommendation(
        &self,
        activity_id: &str,
    ) -> Result<Option<Recommendation>, AppError>;

    /// Recommendations for a user, most recent first.
    async fn get_recommendations_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Recommendation>, AppError>;
}

/// Parking lot for messages that ran out of delivery attempts.
#[async_trait]
pub trait DeadLetterStore: Send + Sync {
    async fn record_dead_letter(&self, letter: &DeadLetter) -> Result<(), AppError>;
}
