// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tracked activity model for storage, queue messages and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Kind of exercise session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    Running,
    Walking,
    Cycling,
    Swimming,
    WeightTraining,
    Yoga,
    Hiit,
    Cardio,
    // Older clients still send the misspelled variant.
    #[serde(alias = "STREACHING")]
    Stretching,
    Other,
}

impl ActivityType {
    /// Wire name, as used in JSON and in prompts.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Running => "RUNNING",
            ActivityType::Walking => "WALKING",
            ActivityType::Cycling => "CYCLING",
            ActivityType::Swimming => "SWIMMING",
            ActivityType::WeightTraining => "WEIGHT_TRAINING",
            ActivityType::Yoga => "YOGA",
            ActivityType::Hiit => "HIIT",
            ActivityType::Cardio => "CARDIO",
            ActivityType::Stretching => "STRETCHING",
            ActivityType::Other => "OTHER",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form metrics attached to an activity (heart rate, distance, ...).
///
/// Ordered so that prompt rendering is deterministic.
pub type AdditionalMetrics = BTreeMap<String, serde_json::Value>;

/// Stored activity record.
///
/// This is also the queue message body: the full record, including the
/// store-assigned `id`, is published for recommendation generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Store-assigned identifier (also used as document ID)
    pub id: String,
    /// Owner of the activity (validated before persistence)
    pub user_id: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    /// Duration in minutes
    pub duration: u32,
    pub calories_burnt: u32,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub additional_metrics: AdditionalMetrics,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Activity fields supplied by the caller, before the store assigns an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub user_id: String,
    pub activity_type: ActivityType,
    pub duration: u32,
    pub calories_burnt: u32,
    pub start_time: DateTime<Utc>,
    pub additional_metrics: AdditionalMetrics,
}

impl NewActivity {
    /// Materialize the record once the store has picked an identifier.
    pub fn into_activity(self, id: String, now: DateTime<Utc>) -> Activity {
        Activity {
            id,
            user_id: self.user_id,
            activity_type: self.activity_type,
            duration: self.duration,
            calories_burnt: self.calories_burnt,
            start_time: self.start_time,
            additional_metrics: self.additional_metrics,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Activity as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResponse {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub duration: u32,
    pub calories_burnt: u32,
    pub start_time: DateTime<Utc>,
    pub additional_metrics: AdditionalMetrics,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Activity> for ActivityResponse {
    fn from(activity: Activity) -> Self {
        Self {
            id: activity.id,
            user_id: activity.user_id,
            activity_type: activity.activity_type,
            duration: activity.duration,
            calories_burnt: activity.calories_burnt,
            start_time: activity.start_time,
            additional_metrics: activity.additional_metrics,
            created_at: activity.created_at,
            updated_at: activity.updated_at,
        }
    }
}
