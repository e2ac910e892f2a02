// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use fitness_recommender::config::Config;
use fitness_recommender::db::{FirestoreDb, MemoryDb};
use fitness_recommender::error::{AppError, Result};
use fitness_recommender::models::Activity;
use fitness_recommender::routes::create_router;
use fitness_recommender::services::{
    ActivityIngestor, RecommendationModel, RecommendationService, RecommendationWorker,
    UserValidator, WorkQueue,
};
use fitness_recommender::AppState;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

/// Users the fake user service knows about.
#[allow(dead_code)]
pub const KNOWN_USERS: [&str; 2] = ["user-1", "user-2"];

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Wrap model text in a Gemini `generateContent` envelope.
#[allow(dead_code)]
pub fn gemini_envelope(text: &str) -> String {
    serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    })
    .to_string()
}

/// User validator backed by a fixed set of IDs.
pub struct StaticValidator {
    known: HashSet<String>,
}

impl StaticValidator {
    pub fn new(users: &[&str]) -> Self {
        Self {
            known: users.iter().map(|u| u.to_string()).collect(),
        }
    }
}

#[async_trait]
impl UserValidator for StaticValidator {
    async fn validate(&self, user_id: &str) -> Result<bool> {
        Ok(self.known.contains(user_id))
    }
}

/// Queue that records published activities without delivering them.
#[derive(Default)]
pub struct RecordingQueue {
    published: Mutex<Vec<Activity>>,
}

impl RecordingQueue {
    #[allow(dead_code)]
    pub fn published(&self) -> Vec<Activity> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkQueue for RecordingQueue {
    async fn publish(&self, activity: &Activity) -> Result<()> {
        self.published.lock().unwrap().push(activity.clone());
        Ok(())
    }
}

/// Queue whose broker is unreachable.
#[allow(dead_code)]
pub struct FailingQueue;

#[async_trait]
impl WorkQueue for FailingQueue {
    async fn publish(&self, _activity: &Activity) -> Result<()> {
        Err(AppError::Publish("connection refused".to_string()))
    }
}

/// Model that plays back scripted answers, then repeats the last one.
pub struct ScriptedModel {
    answers: Mutex<VecDeque<Result<String>>>,
    last: Mutex<Option<String>>,
    calls: Mutex<u32>,
}

impl ScriptedModel {
    pub fn new(answers: Vec<Result<String>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            last: Mutex::new(None),
            calls: Mutex::new(0),
        }
    }

    /// Always answers with `text` wrapped in a Gemini envelope.
    #[allow(dead_code)]
    pub fn answering(text: &str) -> Self {
        Self::new(vec![Ok(gemini_envelope(text))])
    }

    #[allow(dead_code)]
    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl RecommendationModel for ScriptedModel {
    async fn get_answer(&self, _prompt: &str) -> Result<String> {
        *self.calls.lock().unwrap() += 1;
        let next = self.answers.lock().unwrap().pop_front();
        match next {
            Some(Ok(answer)) => {
                *self.last.lock().unwrap() = Some(answer.clone());
                Ok(answer)
            }
            Some(Err(e)) => Err(e),
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| AppError::ModelUnavailable("no scripted answer".to_string())),
        }
    }
}

/// A router wired to in-memory fakes.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub db: MemoryDb,
}

/// Create a test app with the given model and queue.
#[allow(dead_code)]
pub fn build_test_app(model: Arc<dyn RecommendationModel>, queue: Arc<dyn WorkQueue>) -> TestApp {
    let config = Config::test_default();
    let db = MemoryDb::new();

    let recommendations = RecommendationService::new(model, Arc::new(db.clone()));
    let worker = RecommendationWorker::new(
        recommendations.clone(),
        Arc::new(db.clone()),
        config.queue.max_attempts,
    );
    let ingestor = ActivityIngestor::new(
        Arc::new(db.clone()),
        Arc::new(StaticValidator::new(&KNOWN_USERS)),
        queue,
        config.publish_timeout,
    );

    let state = Arc::new(AppState {
        config,
        ingestor,
        recommendations,
        worker,
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
    }
}

/// Create a test app whose queue only records publications.
#[allow(dead_code)]
pub fn create_test_app() -> (TestApp, Arc<RecordingQueue>) {
    let queue = Arc::new(RecordingQueue::default());
    let model = Arc::new(ScriptedModel::answering(
        r#"{"analysis":{"overall":"Good session"},"safety":["Cool down"]}"#,
    ));
    (build_test_app(model, queue.clone()), queue)
}
