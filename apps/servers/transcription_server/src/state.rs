use crate::config::Config;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use transcription_queue::JobStore;

/// Shared request-handler state.
#[derive(Clone)]
pub struct AppState {
	pub store: JobStore,
	pub config: Arc<Config>,
	/// Admission gate: while set, POST /jobs is refused.
	pub locked: Arc<AtomicBool>,
}

impl AppState {
	#[must_use]
	pub fn new(store: JobStore, config: Arc<Config>) -> Self {
		Self {
			store,
			config,
			locked: Arc::new(AtomicBool::new(false)),
		}
	}
}
