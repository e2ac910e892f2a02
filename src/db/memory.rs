// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store for local development and tests.
//!
//! Same semantics as the Firestore backend: activity IDs are UUIDs,
//! recommendations are keyed by activity ID, lists come back most recent first.

use crate::db::{ActivityStore, DeadLetterStore, RecommendationStore};
use crate::error::AppError;
use crate::models::{Activity, DeadLetter, NewActivity, Recommendation};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Process-local database. Cloning shares the underlying maps.
#[derive(Clone, Default)]
pub struct MemoryDb {
    activities: Arc<DashMap<String, Activity>>,
    recommendations: Arc<DashMap<String, Recommendation>>,
    dead_letters: Arc<DashMap<String, DeadLetter>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activity_count(&self) -> usize {
        self.activities.len()
    }

    pub fn recommendation_count(&self) -> usize {
        self.recommendations.len()
    }

    /// Snapshot of every dead-lettered message.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl ActivityStore for MemoryDb {
    async fn create_activity(&self, activity: NewActivity) -> Result<Activity, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let activity = activity.into_activity(id, chrono::Utc::now());
        self.activities.insert(activity.id.clone(), activity.clone());
        Ok(activity)
    }

    async fn get_activity(&self, activity_id: &str) -> Result<Option<Activity>, AppError> {
        Ok(self
            .activities
            .get(activity_id)
            .map(|entry| entry.value().clone()))
    }

    async fn get_activities_for_user(&self, user_id: &str) -> Result<Vec<Activity>, AppError> {
        let mut activities: Vec<Activity> = self
            .activities
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        activities.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(activities)
    }
}

#[async_trait]
impl RecommendationStore for MemoryDb {
    async fn upsert_recommendation(
        &self,
        recommendation: &Recommendation,
    ) -> Result<(), AppError> {
        self.recommendations
            .insert(recommendation.activity_id.clone(), recommendation.clone());
        Ok(())
    }

    async fn get_recommendation(
        &self,
        activity_id: &str,
    ) -> Result<Option<Recommendation>, AppError> {
        Ok(self
            .recommendations
            .get(activity_id)
            .map(|entry| entry.value().clone()))
    }

    async fn get_recommendations_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Recommendation>, AppError> {
        let mut recommendations: Vec<Recommendation> = self
            .recommendations
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        recommendations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(recommendations)
    }
}

#[async_trait]
impl DeadLetterStore for MemoryDb {
    async fn record_dead_letter(&self, letter: &DeadLetter) -> Result<(), AppError> {
        tracing::warn!(
            dead_letter_id = %letter.id,
            attempts = letter.attempts,
            reason = %letter.reason,
            "Message dead-lettered"
        );
        self.dead_letters.insert(letter.id.clone(), letter.clone());
        Ok(())
    }
}
