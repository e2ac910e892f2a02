// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Terminal record for queue messages that exhausted their retry budget.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Queue message parked after its final failed attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    /// Activity ID when the payload could be decoded, otherwise a fresh UUID
    pub id: String,
    pub activity_id: Option<String>,
    /// Raw message body, kept so the message can be replayed
    pub payload: serde_json::Value,
    pub reason: String,
    pub attempts: u32,
    pub dead_lettered_at: DateTime<Utc>,
}
