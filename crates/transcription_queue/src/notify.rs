use crate::models::{JobRecord, NotificationType};
use reqwest::StatusCode;
use tracing::{debug, warn};

/// Pushes completion callbacks for `url`-mode jobs.
///
/// A callback counts as delivered only on HTTP 200; anything else leaves
/// `url_notified` false so the next scheduler pass retries it. The record
/// survives retries until the expiration reclaim removes it.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
	client: reqwest::Client,
}

impl Notifier {
	pub fn new() -> Self {
		Self { client: reqwest::Client::new() }
	}

	/// Attempt a completion callback if this job asks for one.
	///
	/// Returns true when the record was modified and needs to be persisted
	/// by the caller.
	pub async fn dispatch(&self, job: &mut JobRecord) -> bool {
		if job.url_notified || !job.state.is_completed() {
			return false;
		}

		let request = match job.parse_request() {
			Ok(request) => request,
			Err(e) => {
				warn!(id = job.id, error = %e, "stored request is unreadable, skipping notification");
				return false;
			}
		};

		if request.notification_type != NotificationType::Url {
			return false;
		}

		let Some(url) = request.notification_url.as_deref() else {
			warn!(id = job.id, "url notification requested without a notification_url");
			return false;
		};

		match self.client.put(url).json(job).send().await {
			Ok(response) if response.status() == StatusCode::OK => {
				debug!(id = job.id, url, "completion callback delivered");
				job.url_notified = true;
				true
			}
			Ok(response) => {
				warn!(id = job.id, url, status = %response.status(), "completion callback rejected, will retry");
				false
			}
			Err(e) => {
				warn!(id = job.id, url, error = %e, "completion callback failed, will retry");
				false
			}
		}
	}
}
