use crate::error::QueueError;
use crate::models::{JobRecord, JobState, TranscriptionRequest};
use chrono::Utc;
use sqlx::SqlitePool;

/// Listing responses never return more rows than this per call.
pub const MAX_LIST_LIMIT: i64 = 100;

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS transcription_jobs (
	id INTEGER PRIMARY KEY AUTOINCREMENT,
	owner TEXT NOT NULL,
	state TEXT NOT NULL,
	message TEXT NOT NULL,
	priority INTEGER NOT NULL DEFAULT 1,
	queue_time TIMESTAMP NOT NULL,
	start_time TIMESTAMP,
	finish_time TIMESTAMP,
	media_length REAL NOT NULL DEFAULT 0.0,
	processing_time REAL NOT NULL DEFAULT 0.0,
	language_used TEXT NOT NULL DEFAULT '',
	request TEXT NOT NULL,
	url_notified BOOLEAN NOT NULL DEFAULT FALSE
)";

const ALL_COLUMNS: &str = "id, owner, state, message, priority, queue_time, start_time, finish_time, media_length, processing_time, language_used, request, url_notified";

/// Which rows a caller is allowed to see.
#[derive(Debug, Clone)]
pub enum Visibility {
	/// Admin principals see every row
	All,
	/// Everyone else sees only their own submissions
	Owner(String),
}

/// Durable CRUD over job rows; the single source of truth for job existence
/// and state. Every call commits atomically on its own.
#[derive(Debug, Clone)]
pub struct JobStore {
	pool: SqlitePool,
}

impl JobStore {
	pub const fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create the backing table and indexes if they do not exist yet.
	pub async fn migrate(&self) -> Result<(), QueueError> {
		sqlx::query(CREATE_TABLE_SQL).execute(&self.pool).await?;
		sqlx::query("CREATE INDEX IF NOT EXISTS idx_transcription_jobs_state ON transcription_jobs (state)")
			.execute(&self.pool)
			.await?;
		sqlx::query("CREATE INDEX IF NOT EXISTS idx_transcription_jobs_owner ON transcription_jobs (owner)")
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	/// Validate and persist a new submission as a QUEUED row.
	///
	/// An invalid request (no outputs, missing notification URL, ...) is
	/// rejected here and never reaches the table.
	pub async fn create(&self, owner: &str, request: &TranscriptionRequest) -> Result<JobRecord, QueueError> {
		request.validate().map_err(QueueError::Validation)?;
		let request_json = serde_json::to_string(request)?;

		let result = sqlx::query(
			"INSERT INTO transcription_jobs (owner, state, message, priority, queue_time, request, url_notified)
			 VALUES (?, ?, ?, ?, ?, ?, FALSE)",
		)
		.bind(owner)
		.bind(JobState::Queued)
		.bind("Job has been queued")
		.bind(request.priority)
		.bind(Utc::now())
		.bind(&request_json)
		.execute(&self.pool)
		.await?;

		self.get(result.last_insert_rowid()).await
	}

	pub async fn get(&self, id: i64) -> Result<JobRecord, QueueError> {
		let sql = format!("SELECT {ALL_COLUMNS} FROM transcription_jobs WHERE id = ?");
		sqlx::query_as::<_, JobRecord>(&sql).bind(id).fetch_optional(&self.pool).await?.ok_or(QueueError::NotFound)
	}

	/// Rows visible to the caller, oldest first. `limit` is capped at
	/// [`MAX_LIST_LIMIT`] to bound response size.
	pub async fn list(&self, visibility: &Visibility, offset: i64, limit: i64) -> Result<Vec<JobRecord>, QueueError> {
		let offset = offset.max(0);
		let limit = if limit <= 0 { MAX_LIST_LIMIT } else { limit.min(MAX_LIST_LIMIT) };

		let records = match visibility {
			Visibility::All => {
				let sql = format!("SELECT {ALL_COLUMNS} FROM transcription_jobs ORDER BY id LIMIT ? OFFSET ?");
				sqlx::query_as::<_, JobRecord>(&sql).bind(limit).bind(offset).fetch_all(&self.pool).await?
			}
			Visibility::Owner(owner) => {
				let sql = format!("SELECT {ALL_COLUMNS} FROM transcription_jobs WHERE owner = ? ORDER BY id LIMIT ? OFFSET ?");
				sqlx::query_as::<_, JobRecord>(&sql).bind(owner).bind(limit).bind(offset).fetch_all(&self.pool).await?
			}
		};

		Ok(records)
	}

	/// Whole-row write keyed by id. `owner`, `queue_time` and `request` are
	/// immutable and deliberately not part of the SET list.
	pub async fn update(&self, job: &JobRecord) -> Result<(), QueueError> {
		sqlx::query(
			"UPDATE transcription_jobs
			 SET state = ?, message = ?, priority = ?, start_time = ?, finish_time = ?, media_length = ?, processing_time = ?, language_used = ?, url_notified = ?
			 WHERE id = ?",
		)
		.bind(job.state)
		.bind(&job.message)
		.bind(job.priority)
		.bind(job.start_time)
		.bind(job.finish_time)
		.bind(job.media_length)
		.bind(job.processing_time)
		.bind(&job.language_used)
		.bind(job.url_notified)
		.bind(job.id)
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	/// Remove a row. Deleting an id that is already gone is a no-op.
	pub async fn delete(&self, id: i64) -> Result<(), QueueError> {
		sqlx::query("DELETE FROM transcription_jobs WHERE id = ?").bind(id).execute(&self.pool).await?;
		Ok(())
	}

	/// The QUEUED row to run next: highest priority first, FIFO by
	/// `queue_time` within a priority band.
	pub async fn select_next_queued(&self) -> Result<Option<JobRecord>, QueueError> {
		let sql = format!("SELECT {ALL_COLUMNS} FROM transcription_jobs WHERE state = ? ORDER BY priority DESC, queue_time ASC LIMIT 1");
		Ok(sqlx::query_as::<_, JobRecord>(&sql).bind(JobState::Queued).fetch_optional(&self.pool).await?)
	}

	/// Crash recovery: anything still marked RUNNING cannot be trusted to
	/// have finished, so it goes back to the queue to be redone.
	pub async fn reset_running_to_queued(&self) -> Result<u64, QueueError> {
		let result = sqlx::query("UPDATE transcription_jobs SET state = ?, message = ? WHERE state = ?")
			.bind(JobState::Queued)
			.bind("Requeued after service restart")
			.bind(JobState::Running)
			.execute(&self.pool)
			.await?;
		Ok(result.rows_affected())
	}

	/// Remove every CANCELED row; runs at the top of each scheduler cycle.
	pub async fn delete_canceled(&self) -> Result<u64, QueueError> {
		let result = sqlx::query("DELETE FROM transcription_jobs WHERE state = ?").bind(JobState::Canceled).execute(&self.pool).await?;
		Ok(result.rows_affected())
	}

	/// All FINISHED / ERROR / EXPIRED rows, for the notification and
	/// reclaim pass.
	pub async fn completed(&self) -> Result<Vec<JobRecord>, QueueError> {
		let sql = format!("SELECT {ALL_COLUMNS} FROM transcription_jobs WHERE state IN (?, ?, ?) ORDER BY id");
		Ok(
			sqlx::query_as::<_, JobRecord>(&sql)
				.bind(JobState::Finished)
				.bind(JobState::Error)
				.bind(JobState::Expired)
				.fetch_all(&self.pool)
				.await?,
		)
	}
}
