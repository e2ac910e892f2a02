// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Gemini API client for recommendation generation.
//!
//! Handles:
//! - Sending the rendered prompt to `generateContent`
//! - Bounding each call with a timeout
//! - Mapping transport and HTTP failures to `ModelUnavailable` (queue retry)
//!
//! The response body is returned untouched; unwrapping the envelope is the
//! normalizer's job.

use crate::config::Config;
use crate::error::AppError;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// API key header. The key must never appear in a URL.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Source of raw model answers.
#[async_trait]
pub trait RecommendationModel: Send + Sync {
    /// Send `prompt` and return the provider's raw response text.
    async fn get_answer(&self, prompt: &str) -> Result<String, AppError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [GenerateContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct GenerateContent<'a> {
    parts: [TextPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

/// Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    /// Create a client whose requests give up after `timeout`.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(
            config.gemini_api_url.clone(),
            config.gemini_model.clone(),
            config.gemini_api_key.clone(),
            config.model_timeout,
        )
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl RecommendationModel for GeminiClient {
    async fn get_answer(&self, prompt: &str) -> Result<String, AppError> {
        let body = GenerateRequest {
            contents: [GenerateContent {
                parts: [TextPart { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(self.generate_url())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                if e.is_timeout() {
                    AppError::ModelUnavailable("Gemini request timed out".to_string())
                } else {
                    AppError::ModelUnavailable(format!("Gemini request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            // Rate limit - should trigger queue retry
            if status.as_u16() == 429 {
                tracing::warn!("Gemini rate limit hit (429)");
            }

            return Err(AppError::ModelUnavailable(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        response.text().await.map_err(|e| {
            AppError::ModelUnavailable(format!("Failed to read response: {}", e.without_url()))
        })
    }
}
