#![allow(dead_code)]

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use transcription_queue::{Engine, EngineConfig, EngineRegistry, JobRecord, JobState, JobStore, Scheduler, TranscriptionRequest};

/// Fresh single-connection in-memory store.
pub async fn memory_store() -> JobStore {
	let pool = SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap();
	let store = JobStore::new(pool);
	store.migrate().await.unwrap();
	store
}

/// A whisper.cpp request with the given scheduling knobs.
pub fn request(priority: i64, notification_type: &str, notification_url: Option<&str>, expiration: i64) -> TranscriptionRequest {
	let mut value = serde_json::json!({
		"version": "1",
		"notification_type": notification_type,
		"expiration": expiration,
		"priority": priority,
		"options": {
			"engine": "whisper.cpp",
			"language": "en",
			"model": "small.en",
			"input": "http://media.test/input.mp3",
			"outputs": {"txt_url": "http://media.test/out.txt"}
		}
	});
	if let Some(url) = notification_url {
		value["notification_url"] = url.into();
	}
	serde_json::from_value(value).unwrap()
}

pub fn poll_request(priority: i64) -> TranscriptionRequest {
	request(priority, "poll", None, 3600)
}

/// Engine double that records the order jobs reach it and finishes them
/// immediately.
pub struct RecordingEngine {
	pub processed: Arc<Mutex<Vec<i64>>>,
}

impl RecordingEngine {
	pub fn new() -> (Arc<Self>, Arc<Mutex<Vec<i64>>>) {
		let processed = Arc::new(Mutex::new(Vec::new()));
		(
			Arc::new(Self {
				processed: Arc::clone(&processed),
			}),
			processed,
		)
	}
}

#[async_trait]
impl Engine for RecordingEngine {
	fn tag(&self) -> &'static str {
		"whisper.cpp"
	}

	async fn process(&self, job: &mut JobRecord, _config: &EngineConfig) {
		self.processed.lock().unwrap().push(job.id);
		job.state = JobState::Finished;
		job.message = "Transcription has completed successfully".to_string();
		job.processing_time = 0.01;
	}
}

/// Engine double that parks mid-flight so tests can interleave request-path
/// writes with a running job.
pub struct GatedEngine {
	pub started: Arc<Semaphore>,
	pub release: Arc<Semaphore>,
}

impl GatedEngine {
	pub fn new() -> (Arc<Self>, Arc<Semaphore>, Arc<Semaphore>) {
		let started = Arc::new(Semaphore::new(0));
		let release = Arc::new(Semaphore::new(0));
		(
			Arc::new(Self {
				started: Arc::clone(&started),
				release: Arc::clone(&release),
			}),
			started,
			release,
		)
	}
}

#[async_trait]
impl Engine for GatedEngine {
	fn tag(&self) -> &'static str {
		"whisper.cpp"
	}

	async fn process(&self, job: &mut JobRecord, _config: &EngineConfig) {
		self.started.add_permits(1);
		let permit = self.release.acquire().await.unwrap();
		permit.forget();
		job.state = JobState::Finished;
		job.message = "Transcription has completed successfully".to_string();
	}
}

/// Scheduler wired to the given engine over a fresh registry.
pub fn scheduler_with(store: &JobStore, engine: Arc<dyn Engine>) -> Scheduler {
	let mut registry = EngineRegistry::new();
	registry.register(engine);
	Scheduler::new(store.clone(), registry, Arc::new(EngineConfig::default()))
}
