use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use transcription_queue::QueueError;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
	#[error("authentication required")]
	Unauthorized,

	#[error("user may not perform that action")]
	Forbidden,

	#[error("job not found")]
	NotFound,

	#[error("submissions are locked")]
	SubmissionsLocked,

	#[error("error in the request body: {0}")]
	UnprocessableEntity(String),

	#[error("an internal server error occurred")]
	Anyhow(#[from] anyhow::Error),
}

impl ApiError {
	const fn status_code(&self) -> StatusCode {
		match self {
			Self::Unauthorized => StatusCode::UNAUTHORIZED,
			Self::Forbidden => StatusCode::FORBIDDEN,
			Self::NotFound => StatusCode::NOT_FOUND,
			Self::SubmissionsLocked => StatusCode::SERVICE_UNAVAILABLE,
			Self::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
			Self::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl From<QueueError> for ApiError {
	fn from(e: QueueError) -> Self {
		match e {
			QueueError::Validation(message) => Self::UnprocessableEntity(message),
			QueueError::NotFound => Self::NotFound,
			other => Self::Anyhow(other.into()),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		match self {
			Self::Unauthorized => (self.status_code(), [(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"))], self.to_string()).into_response(),
			Self::UnprocessableEntity(ref message) => (self.status_code(), Json(serde_json::json!({ "detail": message }))).into_response(),
			Self::Anyhow(ref e) => {
				tracing::error!("Generic error: {:?}", e);
				(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
			}
			_ => (self.status_code(), self.to_string()).into_response(),
		}
	}
}
