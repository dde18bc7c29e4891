use super::media;
use super::{apply_outcome, Engine, EngineConfig};
use crate::models::{EngineOptions, FasterWhisperOptions, JobRecord, JobState, Language};
use async_trait::async_trait;
use std::time::Instant;
use tokio::process::Command;
use tracing::warn;

/// Executor for the `faster-whisper` engine via the `whisper-ctranslate2`
/// CLI, which mirrors the upstream whisper CLI surface and adds a compute
/// type knob.
pub struct FasterWhisperEngine {
	client: reqwest::Client,
}

impl FasterWhisperEngine {
	#[must_use]
	pub fn new() -> Self {
		Self { client: reqwest::Client::new() }
	}

	async fn transcribe(&self, job: &mut JobRecord, config: &EngineConfig) -> anyhow::Result<()> {
		let options = engine_options(job)?;
		let workdir = tempfile::tempdir()?;

		let input_path = workdir.path().join("input_audio.dat");
		media::download_input(&self.client, &options.input, &input_path).await?;

		let mut cli = Command::new(&config.faster_whisper_bin);
		cli
			.arg(&input_path)
			.arg("--model")
			.arg(&options.model)
			.args(["--compute_type", options.compute_type.as_str()])
			.arg("--output_dir")
			.arg(workdir.path())
			.args(["--output_format", "all"])
			.args(["--threads", &config.threads.to_string()]);
		if options.language != Language::Auto {
			cli.args(["--language", options.language.code()]);
		}

		let start = Instant::now();
		let run = cli.output().await?;
		job.processing_time = start.elapsed().as_secs_f64();
		anyhow::ensure!(
			run.status.success(),
			"whisper-ctranslate2 exited with {}: {}{}",
			run.status,
			String::from_utf8_lossy(&run.stdout),
			String::from_utf8_lossy(&run.stderr)
		);

		let transcript = tokio::fs::read(workdir.path().join("input_audio.json")).await?;
		match serde_json::from_slice::<serde_json::Value>(&transcript) {
			Ok(data) => {
				job.language_used = data["language"].as_str().unwrap_or_default().to_string();
				job.media_length = data["segments"].as_array().and_then(|s| s.last()).and_then(|s| s["end"].as_f64()).unwrap_or(0.0);
			}
			Err(e) => warn!(id = job.id, error = %e, "cannot parse faster-whisper json output"),
		}

		for (format, url) in [
			("json", options.outputs.json_url.as_deref()),
			("vtt", options.outputs.vtt_url.as_deref()),
			("txt", options.outputs.txt_url.as_deref()),
		] {
			if let Some(url) = url {
				let data = tokio::fs::read(workdir.path().join(format!("input_audio.{format}"))).await?;
				media::upload_output(&self.client, format, url, data).await?;
			}
		}

		job.state = JobState::Finished;
		job.message = "Transcription has completed successfully".to_string();

		if let Some(meta_url) = options.outputs.meta_url.as_deref() {
			media::upload_metadata(&self.client, meta_url, job).await;
		}

		Ok(())
	}
}

impl Default for FasterWhisperEngine {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl Engine for FasterWhisperEngine {
	fn tag(&self) -> &'static str {
		"faster-whisper"
	}

	async fn process(&self, job: &mut JobRecord, config: &EngineConfig) {
		let result = self.transcribe(job, config).await;
		apply_outcome(job, result);
	}
}

fn engine_options(job: &JobRecord) -> anyhow::Result<FasterWhisperOptions> {
	match job.parse_request()?.options {
		EngineOptions::FasterWhisper(options) => Ok(options),
		other => anyhow::bail!("faster-whisper engine received {} options", other.engine_tag()),
	}
}
