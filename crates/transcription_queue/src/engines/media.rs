use crate::models::JobRecord;
use futures::StreamExt;
use reqwest::StatusCode;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Failures while moving media through the presigned URLs.
///
/// Access-denied variants are the ones the job model maps to EXPIRED; the
/// rest surface as ERROR.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
	#[error("The presigned URL has likely expired")]
	InputDenied,

	#[error("Expired URL when uploading {format} to {url}")]
	UploadDenied { format: String, url: String },

	#[error("http error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("i/o error: {0}")]
	Io(#[from] std::io::Error),
}

impl MediaError {
	pub const fn is_access_denied(&self) -> bool {
		matches!(self, Self::InputDenied | Self::UploadDenied { .. })
	}
}

/// Stream the input media to a scratch file. A 403 is taken to mean the
/// presigned URL has expired rather than a permission problem.
pub async fn download_input(client: &reqwest::Client, url: &str, dest: &Path) -> Result<(), MediaError> {
	let response = client.get(url).send().await?;
	if response.status() == StatusCode::FORBIDDEN {
		return Err(MediaError::InputDenied);
	}
	let response = response.error_for_status()?;

	let mut file = tokio::fs::File::create(dest).await?;
	let mut stream = response.bytes_stream();
	while let Some(chunk) = stream.next().await {
		file.write_all(&chunk?).await?;
	}
	file.flush().await?;

	Ok(())
}

/// PUT one produced transcript to its presigned destination.
pub async fn upload_output(client: &reqwest::Client, format: &str, url: &str, body: Vec<u8>) -> Result<(), MediaError> {
	let response = client.put(url).body(body).send().await?;
	if response.status() == StatusCode::FORBIDDEN {
		return Err(MediaError::UploadDenied {
			format: format.to_string(),
			url: url.to_string(),
		});
	}
	response.error_for_status()?;
	Ok(())
}

/// Best-effort PUT of the job record to the optional meta destination;
/// failure here never fails the job.
pub async fn upload_metadata(client: &reqwest::Client, url: &str, job: &JobRecord) {
	if let Err(e) = client.put(url).json(job).send().await {
		debug!(id = job.id, url, error = %e, "metadata upload failed, ignoring");
	}
}
