use super::request::TranscriptionRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a transcription job.
///
/// QUEUED and RUNNING are the only non-terminal states. The scheduler is the
/// sole writer of QUEUED -> RUNNING and RUNNING -> terminal transitions; the
/// request path only creates QUEUED rows, deletes them, or flips a RUNNING
/// row to CANCELED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum JobState {
	Queued,
	Running,
	Canceled,
	Finished,
	Error,
	Expired,
}

impl JobState {
	/// True once no further engine execution will happen for the job.
	pub const fn is_terminal(self) -> bool {
		matches!(self, Self::Canceled | Self::Finished | Self::Error | Self::Expired)
	}

	/// Terminal states produced by job completion (CANCELED excluded);
	/// these are the states the notification pass looks at.
	pub const fn is_completed(self) -> bool {
		matches!(self, Self::Finished | Self::Error | Self::Expired)
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Queued => "QUEUED",
			Self::Running => "RUNNING",
			Self::Canceled => "CANCELED",
			Self::Finished => "FINISHED",
			Self::Error => "ERROR",
			Self::Expired => "EXPIRED",
		}
	}
}

/// One persisted transcription job.
///
/// The embedded `request` column is the verbatim JSON the client submitted
/// and is never rewritten; everything else is status the scheduler and the
/// engines fill in as the job moves through its lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobRecord {
	/// Store-assigned id, stable for the lifetime of the row
	pub id: i64,
	/// Principal that submitted the job
	pub owner: String,
	pub state: JobState,
	/// Human-readable status, overwritten on every transition
	pub message: String,
	/// 0..=2, higher value is served first
	pub priority: i64,
	/// Set once at creation, never changed
	pub queue_time: DateTime<Utc>,
	pub start_time: Option<DateTime<Utc>>,
	/// Recorded by the scheduler when the engine call returns
	pub finish_time: Option<DateTime<Utc>>,
	/// Duration of the input media in seconds, filled in on success
	pub media_length: f64,
	/// Wall-clock seconds the model run took
	pub processing_time: f64,
	pub language_used: String,
	/// Verbatim serialized `TranscriptionRequest`
	pub request: String,
	/// True once a url-type callback has received HTTP 200
	pub url_notified: bool,
}

impl JobRecord {
	/// Re-derive the immutable client request from the stored JSON.
	pub fn parse_request(&self) -> Result<TranscriptionRequest, serde_json::Error> {
		serde_json::from_str(&self.request)
	}

	/// Whether the expiration reclaim should delete this row at `now`.
	pub fn is_reclaimable(&self, now: DateTime<Utc>) -> bool {
		let Some(finish_time) = self.finish_time else {
			return false;
		};
		let expiration = self.parse_request().map(|r| r.expiration).unwrap_or(super::request::DEFAULT_EXPIRATION_SECS);
		now > finish_time + chrono::Duration::seconds(expiration)
	}
}
