use crate::auth::Principal;
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::atomic::Ordering;

/// Stop accepting new submissions, e.g. ahead of a maintenance restart.
/// Queued and running work is unaffected.
pub async fn lock(State(state): State<AppState>, principal: Principal) -> Result<Json<serde_json::Value>, ApiError> {
	set_locked(&state, &principal, true)
}

pub async fn unlock(State(state): State<AppState>, principal: Principal) -> Result<Json<serde_json::Value>, ApiError> {
	set_locked(&state, &principal, false)
}

fn set_locked(state: &AppState, principal: &Principal, locked: bool) -> Result<Json<serde_json::Value>, ApiError> {
	if !principal.is_admin {
		return Err(ApiError::Forbidden);
	}

	state.locked.store(locked, Ordering::SeqCst);
	tracing::info!(admin = %principal.name, locked, "submission gate changed");
	Ok(Json(serde_json::json!({ "locked": locked })))
}
