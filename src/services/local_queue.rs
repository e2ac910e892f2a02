// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process work queue for local development.
//!
//! Same delivery contract as Cloud Tasks: at-least-once, retried with
//! backoff, dead-lettered after `max_attempts`. Messages do not survive a
//! restart.

use crate::error::{AppError, Result};
use crate::models::Activity;
use crate::services::recommendation::{Delivery, RecommendationWorker};
use crate::services::tasks::WorkQueue;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

const CHANNEL_CAPACITY: usize = 1024;
const BASE_BACKOFF: Duration = Duration::from_millis(200);

struct Message {
    activity: Activity,
    attempt: u32,
}

/// Producer handle for the in-process queue.
#[derive(Clone)]
pub struct LocalQueue {
    tx: mpsc::Sender<Message>,
}

impl LocalQueue {
    /// Start the consumer loop with `workers` concurrent handlers.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(worker: RecommendationWorker, workers: usize) -> Self {
        Self::start_with_backoff(worker, workers, BASE_BACKOFF)
    }

    pub fn start_with_backoff(
        worker: RecommendationWorker,
        workers: usize,
        backoff: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(consume(rx, tx.downgrade(), worker, workers.max(1), backoff));
        Self { tx }
    }
}

#[async_trait]
impl WorkQueue for LocalQueue {
    async fn publish(&self, activity: &Activity) -> Result<()> {
        self.tx
            .try_send(Message {
                activity: activity.clone(),
                attempt: 1,
            })
            .map_err(|e| AppError::Publish(format!("Local queue rejected message: {}", e)))?;

        tracing::debug!(activity_id = %activity.id, "Activity queued locally");
        Ok(())
    }
}

/// Runs until every `LocalQueue` handle is dropped and the channel drains.
///
/// Redeliveries go through a weak sender so the consumer never keeps its own
/// channel open. A retry still pending at shutdown is dropped.
async fn consume(
    mut rx: mpsc::Receiver<Message>,
    tx: mpsc::WeakSender<Message>,
    worker: RecommendationWorker,
    workers: usize,
    backoff: Duration,
) {
    let permits = Arc::new(Semaphore::new(workers));

    while let Some(message) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let worker = worker.clone();
        let tx = tx.clone();

        tokio::spawn(async move {
            let outcome = worker.handle(&message.activity, message.attempt).await;
            drop(permit);

            if let Delivery::Retry(_) = outcome {
                // Linear backoff. The permit is already released.
                tokio::time::sleep(backoff * message.attempt).await;
                let redelivery = Message {
                    activity: message.activity,
                    attempt: message.attempt + 1,
                };
                let Some(tx) = tx.upgrade() else {
                    tracing::warn!(
                        activity_id = %redelivery.activity.id,
                        "Local queue closed, dropping redelivery"
                    );
                    return;
                };
                if let Err(e) = tx.send(redelivery).await {
                    tracing::error!(error = %e, "Local queue closed, dropping redelivery");
                }
            }
        });
    }

    tracing::info!("Local queue consumer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryDb, RecommendationStore};
    use crate::models::{ActivityType, AdditionalMetrics, NewActivity};
    use crate::services::gemini::RecommendationModel;
    use crate::services::recommendation::RecommendationService;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingModel {
        failures: u32,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl RecommendationModel for CountingModel {
        async fn get_answer(&self, _prompt: &str) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(AppError::ModelUnavailable("busy".to_string()));
            }
            Ok(r#"{"candidates":[{"content":{"parts":[{"text":"{\"safety\":[\"Rest\"]}"}]}}]}"#
                .to_string())
        }
    }

    fn activity(id: &str) -> Activity {
        let now = chrono::Utc::now();
        NewActivity {
            user_id: "user-1".to_string(),
            activity_type: ActivityType::Cycling,
            duration: 45,
            calories_burnt: 410,
            start_time: now,
            additional_metrics: AdditionalMetrics::new(),
        }
        .into_activity(id.to_string(), now)
    }

    fn queue(db: &MemoryDb, failures: u32, max_attempts: u32) -> (LocalQueue, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let model = Arc::new(CountingModel {
            failures,
            calls: calls.clone(),
        });
        let service = RecommendationService::new(model, Arc::new(db.clone()));
        let worker = RecommendationWorker::new(service, Arc::new(db.clone()), max_attempts);
        (
            LocalQueue::start_with_backoff(worker, 2, Duration::from_millis(5)),
            calls,
        )
    }

    #[tokio::test]
    async fn test_consumer_stops_when_queue_dropped() {
        let db = MemoryDb::new();
        let service = RecommendationService::new(
            Arc::new(CountingModel {
                failures: 0,
                calls: Arc::new(AtomicU32::new(0)),
            }),
            Arc::new(db.clone()),
        );
        let worker = RecommendationWorker::new(service, Arc::new(db.clone()), 3);

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let consumer = tokio::spawn(consume(
            rx,
            tx.downgrade(),
            worker,
            1,
            Duration::from_millis(5),
        ));
        let queue = LocalQueue { tx };

        queue.publish(&activity("a4")).await.unwrap();
        wait_for(|| db.recommendation_count() == 1).await;
        drop(queue);

        tokio::time::timeout(Duration::from_secs(2), consumer)
            .await
            .expect("consumer kept running after the last handle was dropped")
            .unwrap();
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn test_published_activity_gets_recommendation() {
        let db = MemoryDb::new();
        let (queue, _) = queue(&db, 0, 3);

        queue.publish(&activity("a1")).await.unwrap();
        wait_for(|| db.recommendation_count() == 1).await;

        let stored = db.get_recommendation("a1").await.unwrap().unwrap();
        assert_eq!(stored.safety, vec!["Rest".to_string()]);
    }

    #[tokio::test]
    async fn test_transient_failure_is_redelivered() {
        let db = MemoryDb::new();
        let (queue, calls) = queue(&db, 2, 5);

        queue.publish(&activity("a2")).await.unwrap();
        wait_for(|| db.recommendation_count() == 1).await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(db.dead_letters().is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_message_is_dead_lettered() {
        let db = MemoryDb::new();
        let (queue, calls) = queue(&db, u32::MAX, 3);

        queue.publish(&activity("a3")).await.unwrap();
        wait_for(|| !db.dead_letters().is_empty()).await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(db.dead_letters()[0].attempts, 3);
        assert_eq!(db.recommendation_count(), 0);
    }
}
