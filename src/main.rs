// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fitness Recommender API Server
//!
//! Tracks workouts and generates AI recommendations for them asynchronously
//! through a work queue.

use fitness_recommender::{
    config::{Config, QueueBackend, StorageBackend},
    db::{ActivityStore, DeadLetterStore, FirestoreDb, MemoryDb, RecommendationStore},
    services::{
        ActivityIngestor, GeminiClient, HttpUserValidator, LocalQueue, RecommendationService,
        RecommendationWorker, TasksService, WorkQueue,
    },
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Store handles for each persistence concern.
struct Stores {
    activities: Arc<dyn ActivityStore>,
    recommendations: Arc<dyn RecommendationStore>,
    dead_letters: Arc<dyn DeadLetterStore>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Fitness Recommender API");

    let stores = match config.storage_backend {
        StorageBackend::Firestore => {
            let db = Arc::new(FirestoreDb::new(&config.gcp_project_id).await?);
            tracing::info!(project = %config.gcp_project_id, "Firestore initialized");
            Stores {
                activities: db.clone(),
                recommendations: db.clone(),
                dead_letters: db,
            }
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            let db = Arc::new(MemoryDb::new());
            Stores {
                activities: db.clone(),
                recommendations: db.clone(),
                dead_letters: db,
            }
        }
    };

    let model = Arc::new(GeminiClient::from_config(&config)?);
    let recommendations = RecommendationService::new(model, stores.recommendations);
    let worker = RecommendationWorker::new(
        recommendations.clone(),
        stores.dead_letters,
        config.queue.max_attempts,
    );

    let queue: Arc<dyn WorkQueue> = match config.queue.backend {
        QueueBackend::CloudTasks => {
            let tasks = TasksService::new(&config.gcp_project_id, config.queue.clone());
            tracing::info!(
                queue = %tasks.queue_path(),
                target = %config.queue.target_url(),
                "Cloud Tasks queue initialized"
            );
            Arc::new(tasks)
        }
        QueueBackend::Local => {
            tracing::info!(
                workers = config.queue.local_workers,
                "Local in-process queue initialized"
            );
            Arc::new(LocalQueue::start(worker.clone(), config.queue.local_workers))
        }
    };

    let validator = Arc::new(HttpUserValidator::new(config.user_service_url.clone())?);
    let ingestor = ActivityIngestor::new(
        stores.activities,
        validator,
        queue,
        config.publish_timeout,
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        ingestor,
        recommendations,
        worker,
    });

    // Build router
    let app = fitness_recommender::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fitness_recommender=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .try_init()?;
    Ok(())
}
