// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Activities (tracked sessions, document ID = assigned UUID)
//! - Recommendations (document ID = activity ID, so writes are upserts)
//! - Dead letters (queue messages that exhausted their retries)

use crate::db::{collections, ActivityStore, DeadLetterStore, RecommendationStore};
use crate::error::AppError;
use crate::models::{Activity, DeadLetter, NewActivity, Recommendation};
use async_trait::async_trait;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator rejects real credentials, so skip the credential lookup entirely.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }
}

// ─── Activity Operations ─────────────────────────────────────

#[async_trait]
impl ActivityStore for FirestoreDb {
    async fn create_activity(&self, activity: NewActivity) -> Result<Activity, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let activity = activity.into_activity(id, chrono::Utc::now());

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ACTIVITIES)
            .document_id(&activity.id)
            .object(&activity)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(
            activity_id = %activity.id,
            user_id = %activity.user_id,
            "Activity stored"
        );

        Ok(activity)
    }

    async fn get_activity(&self, activity_id: &str) -> Result<Option<Activity>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITIES)
            .obj()
            .one(activity_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn get_activities_for_user(&self, user_id: &str) -> Result<Vec<Activity>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(|q| q.for_all([q.field("userId").eq(user_id)]))
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

// ─── Recommendation Operations ───────────────────────────────

#[async_trait]
impl RecommendationStore for FirestoreDb {
    async fn upsert_recommendation(
        &self,
        recommendation: &Recommendation,
    ) -> Result<(), AppError> {
        // update() writes the whole document, creating it if missing.
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::RECOMMENDATIONS)
            .document_id(&recommendation.activity_id)
            .object(recommendation)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_recommendation(
        &self,
        activity_id: &str,
    ) -> Result<Option<Recommendation>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::RECOMMENDATIONS)
            .obj()
            .one(activity_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn get_recommendations_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Recommendation>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::RECOMMENDATIONS)
            .filter(|q| q.for_all([q.field("userId").eq(user_id)]))
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

// ─── Dead Letter Operations ──────────────────────────────────

#[async_trait]
impl DeadLetterStore for FirestoreDb {
    async fn record_dead_letter(&self, letter: &DeadLetter) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::DEAD_LETTERS)
            .document_id(&letter.id)
            .object(letter)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::warn!(
            dead_letter_id = %letter.id,
            attempts = letter.attempts,
            reason = %letter.reason,
            "Message dead-lettered"
        );
        Ok(())
    }
}
