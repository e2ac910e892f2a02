// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Turns raw model output into a [`Recommendation`].
//!
//! The pipeline is:
//! 1. Unwrap the provider envelope (`candidates[0].content.parts[0].text`)
//! 2. Strip code-fence decoration around the JSON block
//! 3. Parse the payload as a JSON object
//! 4. Extract each section, defaulting sections that are missing or empty
//!
//! A failure in stages 1-3 discards the whole response and yields the fixed
//! default recommendation. Inside a parsed document every section is
//! defaulted independently.

use crate::models::{Activity, Recommendation};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};

pub const DEFAULT_ANALYSIS: &str = "Unable to generate detailed analysis";
pub const DEFAULT_IMPROVEMENT: &str = "Continue with your current routine";
pub const DEFAULT_SUGGESTION: &str = "Consider consulting a fitness professional";
pub const DEFAULT_SAFETY: [&str; 3] = [
    "Always warm up before exercise",
    "Stay hydrated",
    "Listen to your body",
];

pub const NO_ANALYSIS: &str = "No specific analysis provided";
pub const NO_IMPROVEMENTS: &str = "No specific improvements provided";
pub const NO_SUGGESTIONS: &str = "No specific suggestions provided";
pub const NO_SAFETY: &str = "Follow general safety guidelines";

/// Analysis keys in output order, with their narrative labels.
const ANALYSIS_SECTIONS: [(&[&str], &str); 4] = [
    (&["overall"], "Overall:"),
    (&["pace"], "Pace:"),
    (&["heartRate"], "Heart Rate:"),
    (&["caloriesBurnt", "caloriesBurned"], "Calories Burnt:"),
];

const FENCE: &str = "```";

/// Why a model response could not be used at all.
#[derive(Debug, thiserror::Error)]
pub enum ResponseShapeError {
    #[error("response is not a valid envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("envelope has no candidate text")]
    MissingText,

    #[error("candidate text is empty after stripping decoration")]
    EmptyPayload,

    #[error("payload is not valid JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),

    #[error("payload is JSON but not an object")]
    NotAnObject,
}

// ─── Provider envelope ───────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Stage 1: pull the first candidate's first text part out of the envelope.
pub fn extract_envelope_text(raw: &str) -> Result<String, ResponseShapeError> {
    let envelope: Envelope = serde_json::from_str(raw).map_err(ResponseShapeError::Envelope)?;

    envelope
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or(ResponseShapeError::MissingText)
}

/// Stage 2: remove surrounding whitespace and a ```` ```json ```` fence.
pub fn strip_decorations(text: &str) -> Result<&str, ResponseShapeError> {
    let mut body = text.trim();

    if let Some(rest) = body.strip_prefix(FENCE) {
        body = strip_language_tag(rest);
    }
    if let Some(rest) = body.strip_suffix(FENCE) {
        body = rest;
    }

    let body = body.trim();
    if body.is_empty() {
        return Err(ResponseShapeError::EmptyPayload);
    }
    Ok(body)
}

/// Drop the `json` info string that follows an opening fence, if any.
fn strip_language_tag(rest: &str) -> &str {
    match rest.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
        _ => rest,
    }
}

/// Stage 3: parse the payload; only a JSON object is a usable document.
pub fn parse_document(payload: &str) -> Result<Map<String, Value>, ResponseShapeError> {
    match serde_json::from_str::<Value>(payload).map_err(ResponseShapeError::MalformedJson)? {
        Value::Object(document) => Ok(document),
        _ => Err(ResponseShapeError::NotAnObject),
    }
}

/// Sections extracted from a well-formed document.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationSections {
    pub analysis: String,
    pub improvements: Vec<String>,
    pub suggestions: Vec<String>,
    pub safety: Vec<String>,
}

impl RecommendationSections {
    /// Stage 4: extract every section. Never fails; gaps get placeholders.
    pub fn from_document(document: &Map<String, Value>) -> Self {
        let analysis = extract_analysis(document.get("analysis"));
        Self {
            analysis: if analysis.is_empty() {
                NO_ANALYSIS.to_string()
            } else {
                analysis
            },
            improvements: or_placeholder(
                extract_pairs(document.get("improvements"), "area", "recommendation"),
                NO_IMPROVEMENTS,
            ),
            suggestions: or_placeholder(
                extract_pairs(document.get("suggestions"), "workout", "description"),
                NO_SUGGESTIONS,
            ),
            safety: or_placeholder(extract_strings(document.get("safety")), NO_SAFETY),
        }
    }
}

/// Build the labelled narrative from the `analysis` object, trimmed.
fn extract_analysis(analysis: Option<&Value>) -> String {
    let Some(Value::Object(analysis)) = analysis else {
        return String::new();
    };

    let mut narrative = String::new();
    for (keys, label) in ANALYSIS_SECTIONS {
        let value = keys
            .iter()
            .filter_map(|key| analysis.get(*key))
            .find(|value| !value.is_null());

        if let Some(text) = value.and_then(text_of) {
            narrative.push_str(label);
            narrative.push_str(&text);
            narrative.push_str("\n\n");
        }
    }

    narrative.trim().to_string()
}

/// Format `"{first}: {second}"` for every array element carrying both fields.
fn extract_pairs(section: Option<&Value>, first: &str, second: &str) -> Vec<String> {
    let Some(Value::Array(items)) = section else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let a = item.get(first).and_then(Value::as_str)?;
            let b = item.get(second).and_then(Value::as_str)?;
            Some(format!("{}: {}", a, b))
        })
        .collect()
}

fn extract_strings(section: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = section else {
        return Vec::new();
    };

    items.iter().filter_map(text_of).collect()
}

/// Text form of a scalar; structured values are rendered as compact JSON.
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn or_placeholder(items: Vec<String>, placeholder: &str) -> Vec<String> {
    if items.is_empty() {
        vec![placeholder.to_string()]
    } else {
        items
    }
}

/// Run stages 1-4 over a raw provider response.
pub fn parse_response(raw: &str) -> Result<RecommendationSections, ResponseShapeError> {
    let text = extract_envelope_text(raw)?;
    let payload = strip_decorations(&text)?;
    let document = parse_document(payload)?;
    Ok(RecommendationSections::from_document(&document))
}

/// Normalize a raw model response for `activity`. Never fails.
pub fn normalize(activity: &Activity, raw: &str) -> Recommendation {
    match parse_response(raw) {
        Ok(sections) => Recommendation {
            activity_id: activity.id.clone(),
            user_id: activity.user_id.clone(),
            activity_type: activity.activity_type,
            recommendation: sections.analysis,
            improvements: sections.improvements,
            suggestions: sections.suggestions,
            safety: sections.safety,
            created_at: Utc::now(),
        },
        Err(e) => {
            tracing::warn!(
                activity_id = %activity.id,
                error = %e,
                "Unusable model response, using default recommendation"
            );
            default_recommendation(activity)
        }
    }
}

/// Fixed fallback used whenever the response cannot be parsed.
pub fn default_recommendation(activity: &Activity) -> Recommendation {
    Recommendation {
        activity_id: activity.id.clone(),
        user_id: activity.user_id.clone(),
        activity_type: activity.activity_type,
        recommendation: DEFAULT_ANALYSIS.to_string(),
        improvements: vec![DEFAULT_IMPROVEMENT.to_string()],
        suggestions: vec![DEFAULT_SUGGESTION.to_string()],
        safety: DEFAULT_SAFETY.iter().map(|s| s.to_string()).collect(),
        created_at: Utc::now(),
    }
}
