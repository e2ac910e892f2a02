// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User identity validation against the user service.

use crate::error::AppError;
use async_trait::async_trait;
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Answers whether a user ID belongs to a known user.
#[async_trait]
pub trait UserValidator: Send + Sync {
    async fn validate(&self, user_id: &str) -> Result<bool, AppError>;
}

/// HTTP client for `GET /api/users/{id}/validate`.
#[derive(Clone)]
pub struct HttpUserValidator {
    http: reqwest::Client,
    base_url: String,
}

impl HttpUserValidator {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn validate_url(&self, user_id: &str) -> Result<reqwest::Url, AppError> {
        let mut url = reqwest::Url::parse(self.base_url.trim_end_matches('/'))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid user service URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("User service URL cannot be a base")))?
            .pop_if_empty()
            .extend(["api", "users", user_id, "validate"]);
        Ok(url)
    }
}

#[async_trait]
impl UserValidator for HttpUserValidator {
    async fn validate(&self, user_id: &str) -> Result<bool, AppError> {
        tracing::debug!(user_id, "Calling user validation API");

        let response = self
            .http
            .get(self.validate_url(user_id)?)
            .send()
            .await
            .map_err(|e| AppError::UserService(e.to_string()))?;

        match response.status().as_u16() {
            404 => return Err(AppError::InvalidUser("User not found".to_string())),
            400 => return Err(AppError::InvalidUser("Invalid request".to_string())),
            _ => {}
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UserService(format!("HTTP {}: {}", status, body)));
        }

        response
            .json::<bool>()
            .await
            .map_err(|e| AppError::UserService(format!("JSON parse error: {}", e)))
    }
}
