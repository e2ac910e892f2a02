// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Recommendation generation and the queue consumer.
//!
//! Handles the core workflow for one delivered activity:
//! 1. Render the prompt
//! 2. Ask the model for an answer
//! 3. Normalize the answer (never fails)
//! 4. Upsert the recommendation keyed by activity ID
//!
//! [`RecommendationWorker`] wraps this with the delivery protocol shared by
//! every queue transport: ack on success, ask for redelivery on transient
//! failure, dead-letter once the attempt budget is spent.

use crate::db::{DeadLetterStore, RecommendationStore};
use crate::error::{AppError, Result};
use crate::models::{Activity, DeadLetter, Recommendation};
use crate::services::gemini::RecommendationModel;
use crate::services::{normalizer, prompt};
use std::sync::Arc;

/// Generates and serves recommendations.
#[derive(Clone)]
pub struct RecommendationService {
    model: Arc<dyn RecommendationModel>,
    store: Arc<dyn RecommendationStore>,
}

impl RecommendationService {
    pub fn new(model: Arc<dyn RecommendationModel>, store: Arc<dyn RecommendationStore>) -> Self {
        Self { model, store }
    }

    /// Generate and persist the recommendation for `activity`.
    ///
    /// Only model and store failures surface as errors; a malformed answer
    /// still yields a stored default recommendation.
    pub async fn generate(&self, activity: &Activity) -> Result<Recommendation> {
        tracing::info!(
            activity_id = %activity.id,
            activity_type = %activity.activity_type,
            "Generating recommendation"
        );

        let prompt = prompt::build_prompt(activity);
        let answer = self.model.get_answer(&prompt).await?;
        let recommendation = normalizer::normalize(activity, &answer);

        self.store.upsert_recommendation(&recommendation).await?;

        tracing::info!(
            activity_id = %activity.id,
            improvements = recommendation.improvements.len(),
            suggestions = recommendation.suggestions.len(),
            "Recommendation stored"
        );
        Ok(recommendation)
    }

    /// All recommendations for a user, most recent first.
    pub async fn get_user_recommendations(&self, user_id: &str) -> Result<Vec<Recommendation>> {
        self.store.get_recommendations_for_user(user_id).await
    }

    pub async fn get_activity_recommendation(&self, activity_id: &str) -> Result<Recommendation> {
        self.store
            .get_recommendation(activity_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No recommendation found for activity {}", activity_id))
            })
    }
}

/// Outcome of handling one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Recommendation stored; ack the message
    Completed,
    /// Transient failure; the queue should redeliver
    Retry(String),
    /// Out of attempts; the message was parked and must be acked
    DeadLettered(String),
}

impl Delivery {
    /// Whether the transport should acknowledge (and drop) the message.
    pub fn is_ack(&self) -> bool {
        !matches!(self, Delivery::Retry(_))
    }
}

/// Queue consumer applying the ack/retry/dead-letter protocol.
#[derive(Clone)]
pub struct RecommendationWorker {
    service: RecommendationService,
    dead_letters: Arc<dyn DeadLetterStore>,
    max_attempts: u32,
}

impl RecommendationWorker {
    pub fn new(
        service: RecommendationService,
        dead_letters: Arc<dyn DeadLetterStore>,
        max_attempts: u32,
    ) -> Self {
        Self {
            service,
            dead_letters,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Handle a delivered activity. `attempt` is 1-based.
    pub async fn handle(&self, activity: &Activity, attempt: u32) -> Delivery {
        let err = match self.service.generate(activity).await {
            Ok(_) => return Delivery::Completed,
            Err(e) => e,
        };

        let reason = err.to_string();
        if err.is_retryable() && attempt < self.max_attempts {
            tracing::warn!(
                activity_id = %activity.id,
                attempt,
                max_attempts = self.max_attempts,
                error = %reason,
                "Recommendation failed, requesting redelivery"
            );
            return Delivery::Retry(reason);
        }

        let payload = serde_json::to_value(activity).unwrap_or(serde_json::Value::Null);
        self.park(Some(activity.id.clone()), payload, reason, attempt)
            .await
    }

    /// Park a message whose body could not even be decoded.
    ///
    /// Redelivery cannot fix a malformed payload, so it is dead-lettered on
    /// first sight.
    pub async fn dead_letter_raw(
        &self,
        payload: serde_json::Value,
        reason: String,
        attempt: u32,
    ) -> Delivery {
        let activity_id = payload
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        self.park(activity_id, payload, reason, attempt).await
    }

    async fn park(
        &self,
        activity_id: Option<String>,
        payload: serde_json::Value,
        reason: String,
        attempts: u32,
    ) -> Delivery {
        let letter = DeadLetter {
            id: activity_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            activity_id,
            payload,
            reason: reason.clone(),
            attempts,
            dead_lettered_at: chrono::Utc::now(),
        };

        tracing::error!(
            activity_id = ?letter.activity_id,
            attempts,
            reason = %reason,
            "Dead-lettering recommendation message"
        );

        if let Err(e) = self.dead_letters.record_dead_letter(&letter).await {
            // Not parked; let the queue try again rather than lose it.
            tracing::error!(error = %e, "Failed to record dead letter");
            return Delivery::Retry(format!("{}; dead letter not recorded: {}", reason, e));
        }

        Delivery::DeadLettered(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;
    use crate::models::{ActivityType, AdditionalMetrics, NewActivity};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` calls, then answers with `answer`.
    struct FlakyModel {
        failures: u32,
        calls: AtomicU32,
        answer: String,
    }

    #[async_trait]
    impl RecommendationModel for FlakyModel {
        async fn get_answer(&self, _prompt: &str) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(AppError::ModelUnavailable("down".to_string()))
            } else {
                Ok(self.answer.clone())
            }
        }
    }

    fn activity() -> Activity {
        let now = chrono::Utc::now();
        NewActivity {
            user_id: "user-1".to_string(),
            activity_type: ActivityType::Running,
            duration: 30,
            calories_burnt: 300,
            start_time: now,
            additional_metrics: AdditionalMetrics::new(),
        }
        .into_activity("act-1".to_string(), now)
    }

    fn worker(db: &MemoryDb, failures: u32, answer: &str, max_attempts: u32) -> RecommendationWorker {
        let model = Arc::new(FlakyModel {
            failures,
            calls: AtomicU32::new(0),
            answer: answer.to_string(),
        });
        let service = RecommendationService::new(model, Arc::new(db.clone()));
        RecommendationWorker::new(service, Arc::new(db.clone()), max_attempts)
    }

    fn envelope(text: &str) -> String {
        serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_success_stores_recommendation() {
        let db = MemoryDb::new();
        let answer = envelope(r#"{"analysis":{"overall":"Solid run"},"safety":["Hydrate"]}"#);
        let worker = worker(&db, 0, &answer, 3);

        assert_eq!(worker.handle(&activity(), 1).await, Delivery::Completed);

        let stored = db.get_recommendation("act-1").await.unwrap().unwrap();
        assert_eq!(stored.recommendation, "Overall:Solid run");
        assert_eq!(stored.safety, vec!["Hydrate".to_string()]);
    }

    #[tokio::test]
    async fn test_garbage_answer_still_completes_with_default() {
        let db = MemoryDb::new();
        let worker = worker(&db, 0, "not json at all", 3);

        assert_eq!(worker.handle(&activity(), 1).await, Delivery::Completed);

        let stored = db.get_recommendation("act-1").await.unwrap().unwrap();
        assert_eq!(stored.recommendation, normalizer::DEFAULT_ANALYSIS);
        assert!(db.dead_letters().is_empty());
    }

    #[tokio::test]
    async fn test_model_failure_retries_then_dead_letters() {
        let db = MemoryDb::new();
        let worker = worker(&db, 10, "", 2);
        let a = activity();

        assert!(matches!(worker.handle(&a, 1).await, Delivery::Retry(_)));
        assert!(db.dead_letters().is_empty());

        let outcome = worker.handle(&a, 2).await;
        assert!(matches!(outcome, Delivery::DeadLettered(_)));
        assert!(outcome.is_ack());

        let letters = db.dead_letters();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].activity_id.as_deref(), Some("act-1"));
        assert_eq!(letters[0].attempts, 2);
        assert_eq!(db.recommendation_count(), 0);
    }

    #[tokio::test]
    async fn test_redelivery_overwrites_single_record() {
        let db = MemoryDb::new();
        let worker = worker(&db, 0, &envelope(r#"{"safety":["Stretch"]}"#), 3);
        let a = activity();

        worker.handle(&a, 1).await;
        worker.handle(&a, 1).await;

        assert_eq!(db.recommendation_count(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_parked() {
        let db = MemoryDb::new();
        let worker = worker(&db, 0, "", 3);

        let outcome = worker
            .dead_letter_raw(serde_json::json!({"id": 7}), "bad payload".to_string(), 1)
            .await;

        assert_eq!(outcome, Delivery::DeadLettered("bad payload".to_string()));
        let letters = db.dead_letters();
        assert_eq!(letters.len(), 1);
        assert!(letters[0].activity_id.is_none());
    }

    #[tokio::test]
    async fn test_missing_recommendation_is_not_found() {
        let db = MemoryDb::new();
        let service = RecommendationService::new(
            Arc::new(FlakyModel {
                failures: 0,
                calls: AtomicU32::new(0),
                answer: String::new(),
            }),
            Arc::new(db),
        );

        let err = service.get_activity_recommendation("nope").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
