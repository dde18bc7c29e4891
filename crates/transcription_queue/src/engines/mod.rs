pub mod media;

mod faster_whisper;
mod whisper;
mod whisper_cpp;

pub use faster_whisper::FasterWhisperEngine;
pub use whisper::WhisperEngine;
pub use whisper_cpp::WhisperCppEngine;

use crate::models::{JobRecord, JobState};
use async_trait::async_trait;
use media::MediaError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;

/// Paths and knobs the executors need; built once at startup and shared.
#[derive(Debug, Clone)]
pub struct EngineConfig {
	/// Root directory for downloaded model files
	pub models_dir: PathBuf,
	/// whisper.cpp `whisper-cli` binary
	pub whisper_cpp_bin: PathBuf,
	/// openai-whisper `whisper` CLI
	pub whisper_bin: PathBuf,
	/// faster-whisper `whisper-ctranslate2` CLI
	pub faster_whisper_bin: PathBuf,
	/// Threads handed to the model run
	pub threads: usize,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			models_dir: PathBuf::from("models"),
			whisper_cpp_bin: PathBuf::from("whisper-cli"),
			whisper_bin: PathBuf::from("whisper"),
			faster_whisper_bin: PathBuf::from("whisper-ctranslate2"),
			threads: 8,
		}
	}
}

/// A pluggable transcription executor.
///
/// `process` receives the claimed job and mutates `state`, `message` and the
/// telemetry fields in place. It must never propagate an error past this
/// boundary: every failure has to end up as a terminal state on the record.
#[async_trait]
pub trait Engine: Send + Sync {
	/// The `engine` tag this executor serves.
	fn tag(&self) -> &'static str;

	async fn process(&self, job: &mut JobRecord, config: &EngineConfig);
}

/// Closed dispatch table keyed by the request's `engine` tag.
///
/// A tag with no registered executor is a data error: the scheduler marks
/// the job ERROR instead of dispatching.
#[derive(Default)]
pub struct EngineRegistry {
	engines: HashMap<&'static str, Arc<dyn Engine>>,
}

impl EngineRegistry {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// All three stock engines.
	#[must_use]
	pub fn with_defaults() -> Self {
		let mut registry = Self::new();
		registry.register(Arc::new(WhisperEngine::new()));
		registry.register(Arc::new(WhisperCppEngine::new()));
		registry.register(Arc::new(FasterWhisperEngine::new()));
		registry
	}

	pub fn register(&mut self, engine: Arc<dyn Engine>) {
		self.engines.insert(engine.tag(), engine);
	}

	#[must_use]
	pub fn get(&self, tag: &str) -> Option<Arc<dyn Engine>> {
		self.engines.get(tag).cloned()
	}
}

/// Fold a transcription attempt into the job record.
///
/// Denied presigned-URL access becomes EXPIRED; everything else becomes
/// ERROR with the cause as the message. Success paths set FINISHED before
/// returning Ok.
pub(crate) fn apply_outcome(job: &mut JobRecord, result: anyhow::Result<()>) {
	let Err(e) = result else { return };

	if let Some(media) = e.downcast_ref::<MediaError>() {
		if media.is_access_denied() {
			job.state = JobState::Expired;
			job.message = media.to_string();
			return;
		}
	}

	error!(id = job.id, error = %e, "transcription failed");
	job.state = JobState::Error;
	job.message = e.to_string();
}
