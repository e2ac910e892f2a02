// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public API routes for activities and recommendations.
//!
//! Authentication happens at the gateway, which injects the caller's
//! identity as `X-User-ID`.

use crate::error::{AppError, Result};
use crate::models::{ActivityResponse, ActivityType, AdditionalMetrics, NewActivity, Recommendation};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::{Validate, ValidationError};

/// Header carrying the authenticated user ID.
pub const USER_ID_HEADER: &str = "x-user-id";

const MAX_METRIC_KEYS: usize = 50;
const MAX_USER_ID_LEN: usize = 128;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities", get(get_activities).post(track_activity))
        .route("/api/activities/{id}", get(get_activity))
        .route(
            "/api/recommendations/user/{user_id}",
            get(get_user_recommendations),
        )
        .route(
            "/api/recommendations/activity/{activity_id}",
            get(get_activity_recommendation),
        )
}

fn user_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ─── Activities ──────────────────────────────────────────────

/// Body of `POST /api/activities`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRequest {
    #[validate(length(min = 1, max = 128))]
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    /// Minutes
    #[validate(range(max = 1440))]
    pub duration: u32,
    #[validate(range(max = 100_000))]
    pub calories_burnt: u32,
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    #[validate(custom(function = "validate_metrics"))]
    pub additional_metrics: AdditionalMetrics,
}

fn validate_metrics(metrics: &AdditionalMetrics) -> std::result::Result<(), ValidationError> {
    if metrics.len() > MAX_METRIC_KEYS {
        return Err(ValidationError::new("too_many_metrics"));
    }
    Ok(())
}

impl ActivityRequest {
    /// Resolve the owner (body first, then header) and default the start time.
    ///
    /// The length limit applies to whichever source supplied the user.
    fn into_new_activity(
        self,
        header_user: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<NewActivity> {
        let user_id = self.user_id.or(header_user).unwrap_or_default();
        if user_id.chars().count() > MAX_USER_ID_LEN {
            return Err(AppError::BadRequest(format!(
                "userId longer than {} characters",
                MAX_USER_ID_LEN
            )));
        }

        Ok(NewActivity {
            user_id,
            activity_type: self.activity_type,
            duration: self.duration,
            calories_burnt: self.calories_burnt,
            start_time: self.start_time.unwrap_or(now),
            additional_metrics: self.additional_metrics,
        })
    }
}

/// Response for a tracked activity.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct TrackActivityResponse {
    #[serde(flatten)]
    #[cfg_attr(feature = "binding-generation", ts(flatten))]
    pub activity: ActivityResponse,
    /// False when the activity was stored but could not be queued
    pub published: bool,
}

async fn track_activity(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ActivityRequest>,
) -> Result<Json<TrackActivityResponse>> {
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let new_activity = request.into_new_activity(user_id_from_headers(&headers), Utc::now())?;
    let tracked = state.ingestor.track_activity(new_activity).await?;

    Ok(Json(TrackActivityResponse {
        activity: tracked.activity.into(),
        published: tracked.published,
    }))
}

async fn get_activities(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ActivityResponse>>> {
    let user_id = user_id_from_headers(&headers)
        .ok_or_else(|| AppError::BadRequest("Missing X-User-ID header".to_string()))?;

    let activities = state.ingestor.get_user_activities(&user_id).await?;
    Ok(Json(activities.into_iter().map(Into::into).collect()))
}

async fn get_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ActivityResponse>> {
    let activity = state.ingestor.get_activity(&id).await?;
    Ok(Json(activity.into()))
}

// ─── Recommendations ─────────────────────────────────────────

async fn get_user_recommendations(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Recommendation>>> {
    let recommendations = state
        .recommendations
        .get_user_recommendations(&user_id)
        .await?;
    Ok(Json(recommendations))
}

async fn get_activity_recommendation(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<String>,
) -> Result<Json<Recommendation>> {
    let recommendation = state
        .recommendations
        .get_activity_recommendation(&activity_id)
        .await?;
    Ok(Json(recommendation))
}
