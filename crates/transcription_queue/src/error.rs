#[derive(Debug, thiserror::Error)]
pub enum QueueError {
	#[error("invalid transcription request: {0}")]
	Validation(String),

	#[error("job not found")]
	NotFound,

	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}
