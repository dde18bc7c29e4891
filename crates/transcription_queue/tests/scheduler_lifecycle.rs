mod common;

use common::{memory_store, poll_request, request, scheduler_with, GatedEngine, RecordingEngine};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use transcription_queue::{EngineConfig, EngineRegistry, JobState, QueueError, Scheduler, Visibility};

#[tokio::test]
async fn claims_highest_priority_then_fifo() {
	let store = memory_store().await;
	let (engine, processed) = RecordingEngine::new();
	let scheduler = scheduler_with(&store, engine);

	let low_first = store.create("alice", &poll_request(0)).await.unwrap();
	tokio::time::sleep(Duration::from_millis(5)).await;
	let high = store.create("alice", &poll_request(2)).await.unwrap();
	tokio::time::sleep(Duration::from_millis(5)).await;
	let low_second = store.create("alice", &poll_request(0)).await.unwrap();

	for _ in 0..3 {
		scheduler.cycle().await.unwrap();
	}

	assert_eq!(*processed.lock().unwrap(), vec![high.id, low_first.id, low_second.id]);
	assert_eq!(store.get(high.id).await.unwrap().state, JobState::Finished);
}

#[tokio::test]
async fn equal_priorities_run_in_submission_order() {
	let store = memory_store().await;
	let (engine, processed) = RecordingEngine::new();
	let scheduler = scheduler_with(&store, engine);

	let mut expected = Vec::new();
	for _ in 0..4 {
		expected.push(store.create("alice", &poll_request(1)).await.unwrap().id);
		tokio::time::sleep(Duration::from_millis(5)).await;
	}

	for _ in 0..4 {
		scheduler.cycle().await.unwrap();
	}

	assert_eq!(*processed.lock().unwrap(), expected);
}

#[tokio::test]
async fn rejected_request_never_reaches_the_store() {
	let store = memory_store().await;

	let mut bad = poll_request(1);
	match &mut bad.options {
		transcription_queue::EngineOptions::WhisperCpp(options) => options.outputs = Default::default(),
		_ => unreachable!(),
	}

	let err = store.create("alice", &bad).await.unwrap_err();
	assert!(matches!(err, QueueError::Validation(_)));
	assert!(store.list(&Visibility::All, 0, 100).await.unwrap().is_empty());
}

#[tokio::test]
async fn crash_recovery_requeues_and_runs_exactly_once() {
	let store = memory_store().await;
	let (engine, processed) = RecordingEngine::new();
	let scheduler = scheduler_with(&store, engine);

	let mut job = store.create("alice", &poll_request(1)).await.unwrap();
	job.state = JobState::Running;
	job.start_time = Some(chrono::Utc::now());
	store.update(&job).await.unwrap();

	// Simulated restart: whatever was running is treated as never started.
	assert_eq!(store.reset_running_to_queued().await.unwrap(), 1);
	assert_eq!(store.get(job.id).await.unwrap().state, JobState::Queued);

	scheduler.cycle().await.unwrap();
	scheduler.cycle().await.unwrap();

	assert_eq!(*processed.lock().unwrap(), vec![job.id]);
}

#[tokio::test]
async fn unregistered_engine_tag_is_a_job_error() {
	let store = memory_store().await;
	let scheduler = Scheduler::new(store.clone(), EngineRegistry::new(), Arc::new(EngineConfig::default()));

	let job = store.create("alice", &poll_request(1)).await.unwrap();
	scheduler.cycle().await.unwrap();

	let job = store.get(job.id).await.unwrap();
	assert_eq!(job.state, JobState::Error);
	assert!(job.message.contains("whisper.cpp"), "message should name the missing engine: {}", job.message);
	assert!(job.finish_time.is_some());
}

#[tokio::test]
async fn delete_while_queued_removes_the_row() {
	let store = memory_store().await;
	let (engine, processed) = RecordingEngine::new();
	let scheduler = scheduler_with(&store, engine);

	let job = store.create("alice", &poll_request(1)).await.unwrap();
	store.delete(job.id).await.unwrap();

	scheduler.cycle().await.unwrap();

	assert!(processed.lock().unwrap().is_empty());
	assert!(matches!(store.get(job.id).await.unwrap_err(), QueueError::NotFound));
}

#[tokio::test]
async fn cancel_while_running_is_overwritten_by_the_engine_result() {
	let store = memory_store().await;
	let (engine, started, release) = GatedEngine::new();
	let scheduler = Arc::new(scheduler_with(&store, engine));

	let job = store.create("alice", &poll_request(1)).await.unwrap();

	let cycle = {
		let scheduler = Arc::clone(&scheduler);
		tokio::spawn(async move { scheduler.cycle().await })
	};

	// Wait until the engine holds the job, then cancel it the way the
	// DELETE handler does for a running job.
	let permit = started.acquire().await.unwrap();
	permit.forget();
	let mut running = store.get(job.id).await.unwrap();
	assert_eq!(running.state, JobState::Running);
	running.state = JobState::Canceled;
	running.message = "Job has been canceled".to_string();
	store.update(&running).await.unwrap();
	assert_eq!(store.get(job.id).await.unwrap().state, JobState::Canceled);

	release.add_permits(1);
	cycle.await.unwrap().unwrap();

	// The engine's terminal write silently resurrects the canceled job.
	// This is the documented race in the original service, kept as-is.
	assert_eq!(store.get(job.id).await.unwrap().state, JobState::Finished);
}

#[tokio::test]
async fn canceled_rows_are_swept_each_cycle() {
	let store = memory_store().await;
	let (engine, _processed) = RecordingEngine::new();
	let scheduler = scheduler_with(&store, engine);

	let mut job = store.create("alice", &poll_request(1)).await.unwrap();
	job.state = JobState::Canceled;
	store.update(&job).await.unwrap();

	scheduler.cycle().await.unwrap();

	assert!(matches!(store.get(job.id).await.unwrap_err(), QueueError::NotFound));
}

#[tokio::test]
async fn run_loop_drains_the_queue_until_shutdown() {
	let store = memory_store().await;
	let (engine, processed) = RecordingEngine::new();
	let scheduler = scheduler_with(&store, engine).with_idle_delay(Duration::from_millis(10));

	let first = store.create("alice", &request(1, "expire", None, 3600)).await.unwrap();
	let second = store.create("bob", &request(2, "expire", None, 3600)).await.unwrap();

	let shutdown = CancellationToken::new();
	let handle = tokio::spawn(scheduler.run(shutdown.clone()));

	tokio::time::sleep(Duration::from_millis(200)).await;
	shutdown.cancel();
	handle.await.unwrap();

	assert_eq!(*processed.lock().unwrap(), vec![second.id, first.id]);
	assert_eq!(store.get(first.id).await.unwrap().state, JobState::Finished);
	assert_eq!(store.get(second.id).await.unwrap().state, JobState::Finished);
}
