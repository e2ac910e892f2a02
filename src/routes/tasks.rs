// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Task handler routes for Cloud Tasks callbacks.
//!
//! These endpoints are called by Cloud Tasks, not directly by users.
//! Status codes are the acknowledgment: 2xx acks the message, anything
//! else makes Cloud Tasks redeliver it with backoff.

use crate::middleware::require_tasks_auth;
use crate::models::Activity;
use crate::services::Delivery;
use crate::AppState;
use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    middleware,
    routing::post,
    Router,
};
use std::sync::Arc;

/// Zero-based retry counter set by Cloud Tasks.
pub const RETRY_COUNT_HEADER: &str = "x-cloudtasks-taskretrycount";

/// Task handler routes (called by Cloud Tasks).
///
/// Mounted at the configured routing key.
pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let routing_key = state.config.queue.routing_key.clone();

    Router::new()
        .route(&routing_key, post(generate_recommendation))
        .route_layer(middleware::from_fn_with_state(state, require_tasks_auth))
}

/// 1-based attempt number of this delivery.
fn attempt_from_headers(headers: &HeaderMap) -> u32 {
    headers
        .get(RETRY_COUNT_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.trim().parse::<u32>().ok())
        .map(|retries| retries.saturating_add(1))
        .unwrap_or(1)
}

fn ack_status(delivery: &Delivery) -> StatusCode {
    if delivery.is_ack() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Generate the recommendation for one queued activity.
async fn generate_recommendation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<serde_json::Value>,
) -> StatusCode {
    let attempt = attempt_from_headers(&headers);

    let activity: Activity = match serde_json::from_value(payload.clone()) {
        Ok(activity) => activity,
        Err(e) => {
            tracing::error!(error = %e, attempt, "Undecodable recommendation message");
            let outcome = state
                .worker
                .dead_letter_raw(payload, format!("Invalid message payload: {}", e), attempt)
                .await;
            return ack_status(&outcome);
        }
    };

    tracing::info!(
        activity_id = %activity.id,
        user_id = %activity.user_id,
        attempt,
        "Processing recommendation task"
    );

    let outcome = state.worker.handle(&activity, attempt).await;
    match &outcome {
        Delivery::Completed => {
            tracing::info!(activity_id = %activity.id, "Recommendation task completed");
        }
        Delivery::Retry(reason) => {
            tracing::warn!(activity_id = %activity.id, attempt, reason = %reason, "Recommendation task will be retried");
        }
        Delivery::DeadLettered(reason) => {
            tracing::error!(activity_id = %activity.id, attempt, reason = %reason, "Recommendation task dead-lettered");
        }
    }

    ack_status(&outcome)
}
