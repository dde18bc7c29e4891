use crate::auth::Principal;
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::atomic::Ordering;
use transcription_queue::{JobRecord, JobState, NotificationType, TranscriptionRequest, Visibility};

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
	#[serde(default)]
	pub offset: i64,
	#[serde(default)]
	pub limit: i64,
}

pub async fn create(State(state): State<AppState>, principal: Principal, Json(payload): Json<TranscriptionRequest>) -> Result<(StatusCode, Json<JobRecord>), ApiError> {
	if state.locked.load(Ordering::SeqCst) {
		return Err(ApiError::SubmissionsLocked);
	}

	let job = state.store.create(&principal.name, &payload).await?;
	tracing::info!(id = job.id, owner = %principal.name, "job submitted");
	Ok((StatusCode::CREATED, Json(job)))
}

pub async fn list(State(state): State<AppState>, principal: Principal, Query(params): Query<ListParams>) -> Result<Json<Vec<JobRecord>>, ApiError> {
	let visibility = if principal.is_admin { Visibility::All } else { Visibility::Owner(principal.name) };

	let jobs = state.store.list(&visibility, params.offset, params.limit).await?;
	Ok(Json(jobs))
}

/// Fetch one job. For poll-mode jobs a read of a terminal record is also its
/// acknowledgement: the row is deleted before the response goes out, so the
/// result can be fetched exactly once.
pub async fn info(State(state): State<AppState>, principal: Principal, Path(id): Path<i64>) -> Result<Json<JobRecord>, ApiError> {
	let job = state.store.get(id).await?;
	authorize(&principal, &job)?;

	if job.state.is_terminal() && notification_type(&job) == NotificationType::Poll {
		state.store.delete(job.id).await?;
		tracing::debug!(id = job.id, "poll result delivered, job removed");
	}

	Ok(Json(job))
}

/// Cancel or remove a job.
///
/// A QUEUED or terminal job is removed outright. A RUNNING job is only
/// marked CANCELED: the scheduler owns the running transition, and its
/// cleanup pass removes the marker row on the next cycle.
pub async fn remove(State(state): State<AppState>, principal: Principal, Path(id): Path<i64>) -> Result<Json<serde_json::Value>, ApiError> {
	let mut job = state.store.get(id).await?;
	authorize(&principal, &job)?;

	if job.state == JobState::Running {
		job.state = JobState::Canceled;
		job.message = "Job has been canceled".to_string();
		state.store.update(&job).await?;
		tracing::info!(id = job.id, "running job marked canceled");
	} else {
		state.store.delete(job.id).await?;
		tracing::info!(id = job.id, "job removed");
	}

	Ok(Json(serde_json::json!({ "ok": true })))
}

fn authorize(principal: &Principal, job: &JobRecord) -> Result<(), ApiError> {
	if principal.is_admin || principal.name == job.owner {
		Ok(())
	} else {
		Err(ApiError::Forbidden)
	}
}

/// A record whose stored request no longer parses falls back to poll so the
/// reclaim path still applies to it.
fn notification_type(job: &JobRecord) -> NotificationType {
	job.parse_request().map(|request| request.notification_type).unwrap_or_default()
}
