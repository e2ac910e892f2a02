// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Normalized AI recommendation for a single activity.

use super::ActivityType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Recommendation record, keyed by `activity_id` (one per activity).
///
/// A later delivery of the same activity overwrites the stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Source activity (also used as document ID)
    pub activity_id: String,
    pub user_id: String,
    pub activity_type: ActivityType,
    /// Analysis narrative, sections separated by blank lines
    pub recommendation: String,
    /// "area: detail" entries
    pub improvements: Vec<String>,
    /// "workout: description" entries
    pub suggestions: Vec<String>,
    pub safety: Vec<String>,
    /// When this recommendation was generated
    pub created_at: DateTime<Utc>,
}
