// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Prompt rendering for recommendation generation.
//!
//! The schema block below is the contract the response normalizer parses
//! against. Keep the two in lockstep.

use crate::models::{Activity, AdditionalMetrics};
use std::fmt::Write;

/// JSON shape requested from the model.
///
/// The model is asked for `caloriesBurned`; the normalizer also accepts
/// `caloriesBurnt`.
pub const RESPONSE_SCHEMA: &str = r#"{
    "analysis": {
        "overall": "Overall analysis here",
        "pace": "Pace analysis here",
        "heartRate": "Heart rate analysis here",
        "caloriesBurned": "Calories analysis here"
    },
    "improvements": [
        {
            "area": "Area name",
            "recommendation": "Detailed recommendation"
        }
    ],
    "suggestions": [
        {
            "workout": "Workout name",
            "description": "Detailed workout description"
        }
    ],
    "safety": [
        "Safety point 1",
        "Safety point 2"
    ]
}"#;

/// Render the model prompt for an activity. Pure function of its input.
pub fn build_prompt(activity: &Activity) -> String {
    format!(
        "Analyze this fitness activity and provide detailed recommendations in the following EXACT JSON format:\n\
         {schema}\n\
         \n\
         Analyze this activity:\n\
         Activity Type: {activity_type}\n\
         Duration: {duration} minutes\n\
         Calories Burnt: {calories}\n\
         Additional Metrics: {metrics}\n\
         \n\
         Provide detailed analysis focusing on performance, improvements, next workout suggestions, and safety guidelines.\n\
         Ensure the response follows the EXACT JSON format shown above.\n",
        schema = RESPONSE_SCHEMA,
        activity_type = activity.activity_type,
        duration = activity.duration,
        calories = activity.calories_burnt,
        metrics = render_metrics(&activity.additional_metrics),
    )
}

/// Render metrics as `key=value` pairs in key order, or `none`.
fn render_metrics(metrics: &AdditionalMetrics) -> String {
    if metrics.is_empty() {
        return "none".to_string();
    }

    let mut out = String::new();
    for (i, (key, value)) in metrics.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        match value {
            serde_json::Value::String(s) => {
                let _ = write!(out, "{}={}", key, s);
            }
            other => {
                let _ = write!(out, "{}={}", key, other);
            }
        }
    }
    out
}
