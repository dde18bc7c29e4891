mod job;
mod request;

pub use job::{JobRecord, JobState};
pub use request::{
	ComputeType, EngineOptions, FasterWhisperOptions, Language, NotificationType, TranscriptOutputs, TranscriptionRequest, WhisperCppOptions, WhisperOptions,
	DEFAULT_EXPIRATION_SECS,
};
