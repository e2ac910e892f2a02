// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Work queue for asynchronous recommendation generation.
//!
//! Tracked activities are published as JSON onto a durable queue and pushed
//! to the consumer endpoint (`exchange + routing_key`). Delivery is
//! at-least-once; retry and backoff are owned by the queue.
//!
//! Uses the official google-cloud-tasks-v2 SDK.

use crate::config::QueueConfig;
use crate::error::{AppError, Result};
use crate::models::Activity;
use async_trait::async_trait;

/// Producer side of the activity queue.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Enqueue the full activity record for recommendation generation.
    async fn publish(&self, activity: &Activity) -> Result<()>;
}

/// Encode an activity as a queue message body.
pub fn encode_message(activity: &Activity) -> Result<Vec<u8>> {
    serde_json::to_vec(activity)
        .map_err(|e| AppError::Publish(format!("JSON error: {}", e)))
}

/// Cloud Tasks client wrapper.
pub struct TasksService {
    project_id: String,
    queue: QueueConfig,
}

impl TasksService {
    pub fn new(project_id: &str, queue: QueueConfig) -> Self {
        Self {
            project_id: project_id.to_string(),
            queue,
        }
    }

    /// Fully qualified queue resource name.
    pub fn queue_path(&self) -> String {
        format!(
            "projects/{}/locations/{}/queues/{}",
            self.project_id, self.queue.location, self.queue.queue_name
        )
    }

    /// Service account whose OIDC token accompanies each push.
    fn service_account_email(&self) -> String {
        self.queue.service_account_email.clone().unwrap_or_else(|| {
            format!(
                "fitness-recommender@{}.iam.gserviceaccount.com",
                self.project_id
            )
        })
    }

    /// Create one HTTP task carrying `body`.
    async fn queue_task(&self, body: Vec<u8>) -> Result<()> {
        use google_cloud_tasks_v2::client::CloudTasks;
        use google_cloud_tasks_v2::model::{HttpRequest, OidcToken, Task};

        let client = CloudTasks::builder()
            .build()
            .await
            .map_err(|e| AppError::Publish(format!("Cloud Tasks client error: {}", e)))?;

        let http_request = HttpRequest::default()
            .set_url(self.queue.target_url())
            .set_http_method("POST")
            .set_body(axum::body::Bytes::from(body))
            .set_headers(std::collections::HashMap::from([(
                "Content-Type".to_string(),
                "application/json".to_string(),
            )]))
            .set_oidc_token(
                OidcToken::default()
                    .set_service_account_email(self.service_account_email())
                    .set_audience(self.queue.exchange.clone()),
            );

        let task = Task::default().set_http_request(http_request);

        let _response = client
            .create_task()
            .set_parent(self.queue_path())
            .set_task(task)
            .send()
            .await
            .map_err(|e| AppError::Publish(format!("Cloud Tasks create error: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl WorkQueue for TasksService {
    async fn publish(&self, activity: &Activity) -> Result<()> {
        let body = encode_message(activity)?;
        self.queue_task(body).await?;

        tracing::debug!(
            activity_id = %activity.id,
            queue = %self.queue.queue_name,
            routing_key = %self.queue.routing_key,
            "Activity queued for recommendation"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn queue_path_uses_configured_names() {
        let mut queue = Config::test_default().queue;
        queue.location = "europe-west1".to_string();
        queue.queue_name = "recs".to_string();

        let service = TasksService::new("proj", queue);
        assert_eq!(
            service.queue_path(),
            "projects/proj/locations/europe-west1/queues/recs"
        );
    }

    #[test]
    fn service_account_defaults_from_project() {
        let service = TasksService::new("proj", Config::test_default().queue);
        assert_eq!(
            service.service_account_email(),
            "fitness-recommender@proj.iam.gserviceaccount.com"
        );

        let mut queue = Config::test_default().queue;
        queue.service_account_email = Some("svc@other.iam.gserviceaccount.com".to_string());
        let service = TasksService::new("proj", queue);
        assert_eq!(
            service.service_account_email(),
            "svc@other.iam.gserviceaccount.com"
        );
    }
}
