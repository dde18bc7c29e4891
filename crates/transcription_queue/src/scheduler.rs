use crate::engines::{EngineConfig, EngineRegistry};
use crate::error::QueueError;
use crate::models::{JobRecord, JobState};
use crate::notify::Notifier;
use crate::store::JobStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const DEFAULT_IDLE_DELAY: Duration = Duration::from_secs(10);

/// The single background task that drives the queue.
///
/// Exactly one scheduler owns a store; it is the only writer of
/// QUEUED -> RUNNING -> terminal transitions. Request handlers touch rows
/// only for isolated create/delete/cancel operations, so no locking beyond
/// the store's per-call atomicity is needed.
pub struct Scheduler {
	store: JobStore,
	engines: EngineRegistry,
	notifier: Notifier,
	engine_config: Arc<EngineConfig>,
	idle_delay: Duration,
}

impl Scheduler {
	pub fn new(store: JobStore, engines: EngineRegistry, engine_config: Arc<EngineConfig>) -> Self {
		Self {
			store,
			engines,
			notifier: Notifier::new(),
			engine_config,
			idle_delay: DEFAULT_IDLE_DELAY,
		}
	}

	/// Seconds the loop sleeps when there is nothing to run.
	#[must_use]
	pub fn with_idle_delay(mut self, idle_delay: Duration) -> Self {
		self.idle_delay = idle_delay;
		self
	}

	/// Run until `shutdown` fires.
	///
	/// A failed cycle is logged and retried after the idle delay; the loop
	/// itself only exits on deliberate shutdown.
	pub async fn run(self, shutdown: CancellationToken) {
		match self.store.reset_running_to_queued().await {
			Ok(0) => {}
			Ok(requeued) => info!(requeued, "requeued jobs left running by a previous process"),
			Err(e) => error!(error = %e, "crash recovery sweep failed"),
		}

		info!("scheduler started");

		loop {
			if let Err(e) = self.cycle().await {
				error!(error = %e, "scheduler cycle failed, retrying after delay");
			}

			tokio::select! {
				() = shutdown.cancelled() => {
					info!("scheduler shutting down");
					break;
				}
				() = tokio::time::sleep(self.idle_delay) => {}
			}
		}
	}

	/// One pass over the queue: cleanup, notification/reclaim, then claim
	/// and execute at most one job.
	pub async fn cycle(&self) -> Result<(), QueueError> {
		let removed = self.store.delete_canceled().await?;
		if removed > 0 {
			debug!(removed, "removed canceled jobs");
		}

		self.sweep_completed().await?;

		let Some(job) = self.store.select_next_queued().await? else {
			return Ok(());
		};

		self.execute(job).await
	}

	/// Notification dispatch plus expiration reclaim for every completed
	/// row. Reclaim fires regardless of notification outcome so storage is
	/// bounded no matter what the client does.
	async fn sweep_completed(&self) -> Result<(), QueueError> {
		let now = Utc::now();

		for mut job in self.store.completed().await? {
			if self.notifier.dispatch(&mut job).await {
				self.store.update(&job).await?;
			}

			if job.is_reclaimable(now) {
				debug!(id = job.id, state = job.state.as_str(), "reclaiming expired job");
				self.store.delete(job.id).await?;
			}
		}

		Ok(())
	}

	/// Claim one job, hand it to its engine, and record the outcome.
	async fn execute(&self, mut job: JobRecord) -> Result<(), QueueError> {
		job.state = JobState::Running;
		job.start_time = Some(Utc::now());
		job.message = "Transcription started".to_string();
		// Persist the claim before dispatch so concurrent readers observe RUNNING.
		self.store.update(&job).await?;

		match job.parse_request() {
			Ok(request) => {
				let tag = request.options.engine_tag();
				match self.engines.get(tag) {
					Some(engine) => {
						info!(id = job.id, engine = tag, "transcription started");
						let config = Arc::clone(&self.engine_config);
						let fallback = job.clone();
						// The engine runs on its own task so the cleanup and
						// notification work above is never stuck behind a long
						// job. Execution is still strictly serialized: this
						// await holds the cycle until the engine returns.
						let handle = tokio::spawn(async move {
							let mut job = job;
							engine.process(&mut job, &config).await;
							job
						});
						job = match handle.await {
							Ok(job) => job,
							Err(e) => {
								error!(id = fallback.id, error = %e, "engine task failure");
								let mut job = fallback;
								job.state = JobState::Error;
								job.message = format!("Engine task failure: {e}");
								job
							}
						};
					}
					None => {
						job.state = JobState::Error;
						job.message = format!("Selected transcription engine {tag} is not available");
					}
				}
			}
			Err(e) => {
				warn!(id = job.id, error = %e, "stored request is unreadable");
				job.state = JobState::Error;
				job.message = format!("Stored request is unreadable: {e}");
			}
		}

		job.finish_time = Some(Utc::now());
		// A cancel that raced with the engine set this row to CANCELED; the
		// write below overwrites that marker with the engine's terminal state.
		// Known behavior carried over from the original service.
		self.store.update(&job).await?;
		info!(id = job.id, state = job.state.as_str(), "transcription finished");

		// Immediate pass so url clients are not forced to wait a full idle
		// delay for their callback.
		if self.notifier.dispatch(&mut job).await {
			self.store.update(&job).await?;
		}

		Ok(())
	}
}
