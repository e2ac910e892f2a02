// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity ingestion: validate, persist, publish.
//!
//! Persistence is the point of commit. Publishing afterwards is best-effort:
//! a queue outage degrades the outcome (`published = false`) but never fails
//! the request or rolls back the stored activity.

use crate::db::ActivityStore;
use crate::error::{AppError, Result};
use crate::models::{Activity, NewActivity};
use crate::services::tasks::WorkQueue;
use crate::services::user_validator::UserValidator;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of tracking one activity.
#[derive(Debug, Clone)]
pub struct TrackedActivity {
    pub activity: Activity,
    /// Whether the queue confirmed the message within the publish timeout
    pub published: bool,
}

#[derive(Clone)]
pub struct ActivityIngestor {
    store: Arc<dyn ActivityStore>,
    validator: Arc<dyn UserValidator>,
    queue: Arc<dyn WorkQueue>,
    publish_timeout: Duration,
}

impl ActivityIngestor {
    pub fn new(
        store: Arc<dyn ActivityStore>,
        validator: Arc<dyn UserValidator>,
        queue: Arc<dyn WorkQueue>,
        publish_timeout: Duration,
    ) -> Self {
        Self {
            store,
            validator,
            queue,
            publish_timeout,
        }
    }

    /// Track a new activity.
    ///
    /// Fails with `InvalidUser` before anything is written when the user is
    /// unknown.
    pub async fn track_activity(&self, request: NewActivity) -> Result<TrackedActivity> {
        if request.user_id.trim().is_empty() {
            return Err(AppError::InvalidUser("userId is required".to_string()));
        }

        if !self.validator.validate(&request.user_id).await? {
            tracing::info!(user_id = %request.user_id, "Rejected activity for unknown user");
            return Err(AppError::InvalidUser(format!(
                "Invalid User: {}",
                request.user_id
            )));
        }

        let activity = self.store.create_activity(request).await?;
        tracing::info!(
            activity_id = %activity.id,
            user_id = %activity.user_id,
            activity_type = %activity.activity_type,
            "Activity tracked"
        );

        let published = self.publish(&activity).await;
        Ok(TrackedActivity {
            activity,
            published,
        })
    }

    async fn publish(&self, activity: &Activity) -> bool {
        match tokio::time::timeout(self.publish_timeout, self.queue.publish(activity)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::warn!(
                    activity_id = %activity.id,
                    error = %e,
                    "Failed to publish activity, recommendation will not be generated"
                );
                false
            }
            Err(_) => {
                tracing::warn!(
                    activity_id = %activity.id,
                    timeout_ms = self.publish_timeout.as_millis() as u64,
                    "Timed out publishing activity"
                );
                false
            }
        }
    }

    /// Activities for a user, most recent first.
    pub async fn get_user_activities(&self, user_id: &str) -> Result<Vec<Activity>> {
        self.store.get_activities_for_user(user_id).await
    }

    pub async fn get_activity(&self, activity_id: &str) -> Result<Activity> {
        self.store
            .get_activity(activity_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Activity not found: {}", activity_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;
    use crate::models::{ActivityType, AdditionalMetrics};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedValidator(bool);

    #[async_trait]
    impl UserValidator for FixedValidator {
        async fn validate(&self, _user_id: &str) -> Result<bool> {
            Ok(self.0)
        }
    }

    #[derive(Default)]
    struct CapturingQueue {
        published: Mutex<Vec<Activity>>,
    }

    #[async_trait]
    impl WorkQueue for CapturingQueue {
        async fn publish(&self, activity: &Activity) -> Result<()> {
            self.published.lock().unwrap().push(activity.clone());
            Ok(())
        }
    }

    struct StalledQueue;

    #[async_trait]
    impl WorkQueue for StalledQueue {
        async fn publish(&self, _activity: &Activity) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    fn request(user_id: &str) -> NewActivity {
        NewActivity {
            user_id: user_id.to_string(),
            activity_type: ActivityType::Swimming,
            duration: 40,
            calories_burnt: 380,
            start_time: chrono::Utc::now(),
            additional_metrics: AdditionalMetrics::new(),
        }
    }

    #[tokio::test]
    async fn test_valid_user_is_persisted_and_published() {
        let db = MemoryDb::new();
        let queue = Arc::new(CapturingQueue::default());
        let ingestor = ActivityIngestor::new(
            Arc::new(db.clone()),
            Arc::new(FixedValidator(true)),
            queue.clone(),
            Duration::from_millis(100),
        );

        let tracked = ingestor.track_activity(request("user-1")).await.unwrap();

        assert!(tracked.published);
        assert_eq!(db.activity_count(), 1);
        let published = queue.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0], tracked.activity);
    }

    #[tokio::test]
    async fn test_invalid_user_writes_nothing() {
        let db = MemoryDb::new();
        let queue = Arc::new(CapturingQueue::default());
        let ingestor = ActivityIngestor::new(
            Arc::new(db.clone()),
            Arc::new(FixedValidator(false)),
            queue.clone(),
            Duration::from_millis(100),
        );

        let err = ingestor.track_activity(request("ghost")).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidUser(_)));
        assert_eq!(db.activity_count(), 0);
        assert!(queue.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_user_id_rejected() {
        let db = MemoryDb::new();
        let ingestor = ActivityIngestor::new(
            Arc::new(db.clone()),
            Arc::new(FixedValidator(true)),
            Arc::new(CapturingQueue::default()),
            Duration::from_millis(100),
        );

        let err = ingestor.track_activity(request("  ")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidUser(_)));
        assert_eq!(db.activity_count(), 0);
    }

    #[tokio::test]
    async fn test_stalled_queue_still_returns_activity() {
        let db = MemoryDb::new();
        let ingestor = ActivityIngestor::new(
            Arc::new(db.clone()),
            Arc::new(FixedValidator(true)),
            Arc::new(StalledQueue),
            Duration::from_millis(20),
        );

        let tracked = ingestor.track_activity(request("user-1")).await.unwrap();

        assert!(!tracked.published);
        assert_eq!(
            ingestor.get_activity(&tracked.activity.id).await.unwrap(),
            tracked.activity
        );
    }

    #[tokio::test]
    async fn test_unknown_activity_is_not_found() {
        let ingestor = ActivityIngestor::new(
            Arc::new(MemoryDb::new()),
            Arc::new(FixedValidator(true)),
            Arc::new(CapturingQueue::default()),
            Duration::from_millis(100),
        );

        let err = ingestor.get_activity("missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
