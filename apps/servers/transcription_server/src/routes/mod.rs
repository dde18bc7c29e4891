pub mod admin;
pub mod jobs;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;

pub fn router() -> Router<AppState> {
	Router::new()
		.route("/jobs", post(jobs::create).get(jobs::list))
		.route("/jobs/:id", get(jobs::info).delete(jobs::remove))
		.route("/admin/lock", get(admin::lock))
		.route("/admin/unlock", get(admin::unlock))
}
