// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fitness Recommender: AI recommendations for tracked workouts
//!
//! This crate provides the backend API that tracks fitness activities,
//! queues them, and turns model output into structured recommendations.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use services::{ActivityIngestor, RecommendationService, RecommendationWorker};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub ingestor: ActivityIngestor,
    pub recommendations: RecommendationService,
    /// Queue consumer behind the routing-key endpoint
    pub worker: RecommendationWorker,
}
