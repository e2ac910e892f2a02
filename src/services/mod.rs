// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod gemini;
pub mod ingest;
pub mod local_queue;
pub mod normalizer;
pub mod prompt;
pub mod recommendation;
pub mod tasks;
pub mod user_validator;

pub use gemini::{GeminiClient, RecommendationModel};
pub use ingest::{ActivityIngestor, TrackedActivity};
pub use local_queue::LocalQueue;
pub use recommendation::{Delivery, RecommendationService, RecommendationWorker};
pub use tasks::{TasksService, WorkQueue};
pub use user_validator::{HttpUserValidator, UserValidator};
