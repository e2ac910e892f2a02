// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod activity;
pub mod dead_letter;
pub mod recommendation;

pub use activity::{Activity, ActivityResponse, ActivityType, AdditionalMetrics, NewActivity};
pub use dead_letter::DeadLetter;
pub use recommendation::Recommendation;
