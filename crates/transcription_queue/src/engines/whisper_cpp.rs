use super::media;
use super::{apply_outcome, Engine, EngineConfig};
use crate::models::{EngineOptions, JobRecord, JobState, WhisperCppOptions};
use async_trait::async_trait;
use futures::StreamExt;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

const MODEL_SOURCE: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Executor for the `whisper.cpp` engine: converts the input with ffmpeg and
/// shells out to the `whisper-cli` binary.
pub struct WhisperCppEngine {
	client: reqwest::Client,
}

impl WhisperCppEngine {
	#[must_use]
	pub fn new() -> Self {
		Self { client: reqwest::Client::new() }
	}

	async fn transcribe(&self, job: &mut JobRecord, config: &EngineConfig) -> anyhow::Result<()> {
		let options = engine_options(job)?;
		let workdir = tempfile::tempdir()?;

		let input_path = workdir.path().join("input_audio.dat");
		media::download_input(&self.client, &options.input, &input_path).await?;

		// whisper-cli wants wav input; convert whatever the client uploaded.
		let wav_path = workdir.path().join("input_audio.wav");
		let ffmpeg = Command::new("ffmpeg").arg("-i").arg(&input_path).arg(&wav_path).output().await?;
		anyhow::ensure!(ffmpeg.status.success(), "ffmpeg failed: {}", String::from_utf8_lossy(&ffmpeg.stderr));

		let model_file = self.ensure_model(config, &options.model).await?;

		let output_base = workdir.path().join("output");
		let start = Instant::now();
		let run = Command::new(&config.whisper_cpp_bin)
			.arg(&wav_path)
			.arg("--model")
			.arg(&model_file)
			.arg("-of")
			.arg(&output_base)
			.args(["-ojf", "-otxt", "-ovtt", "-ocsv"])
			.arg("-t")
			.arg(config.threads.to_string())
			.arg("-l")
			.arg(options.language.code())
			.output()
			.await?;
		job.processing_time = start.elapsed().as_secs_f64();

		let cli_output = format!("{}{}", String::from_utf8_lossy(&run.stdout), String::from_utf8_lossy(&run.stderr));
		anyhow::ensure!(run.status.success(), "whisper-cli exited with {}: {cli_output}", run.status);

		for (format, url) in [
			("json", options.outputs.json_url.as_deref()),
			("vtt", options.outputs.vtt_url.as_deref()),
			("csv", options.outputs.csv_url.as_deref()),
			("txt", options.outputs.txt_url.as_deref()),
		] {
			if let Some(url) = url {
				let data = tokio::fs::read(workdir.path().join(format!("output.{format}"))).await?;
				media::upload_output(&self.client, format, url, data).await?;
			}
		}

		// whisper-cli reports the sample count and detected language on stderr.
		let sample_line = Regex::new(r"samples, (\d+\.\d+) sec\),.+, lang = (..)")?;
		if let Some(caps) = sample_line.captures(&cli_output) {
			job.media_length = caps[1].parse().unwrap_or(0.0);
			job.language_used = caps[2].to_string();
		} else {
			warn!(id = job.id, "cannot parse sample data from whisper-cli output");
		}

		job.state = JobState::Finished;
		job.message = "Transcription has completed successfully".to_string();

		if let Some(meta_url) = options.outputs.meta_url.as_deref() {
			media::upload_metadata(&self.client, meta_url, job).await;
		}

		Ok(())
	}

	/// Fetch the ggml model from huggingface on first use.
	async fn ensure_model(&self, config: &EngineConfig, model: &str) -> anyhow::Result<PathBuf> {
		let model_file = config.models_dir.join("whisper.cpp").join(format!("ggml-{model}.bin"));
		if tokio::fs::try_exists(&model_file).await? {
			return Ok(model_file);
		}

		info!(model, "downloading whisper.cpp model");
		if let Some(parent) = model_file.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}

		let response = self.client.get(format!("{MODEL_SOURCE}/ggml-{model}.bin")).send().await?.error_for_status()?;
		write_stream(&model_file, response).await?;

		Ok(model_file)
	}
}

impl Default for WhisperCppEngine {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl Engine for WhisperCppEngine {
	fn tag(&self) -> &'static str {
		"whisper.cpp"
	}

	async fn process(&self, job: &mut JobRecord, config: &EngineConfig) {
		let result = self.transcribe(job, config).await;
		apply_outcome(job, result);
	}
}

fn engine_options(job: &JobRecord) -> anyhow::Result<WhisperCppOptions> {
	match job.parse_request()?.options {
		EngineOptions::WhisperCpp(options) => Ok(options),
		other => anyhow::bail!("whisper.cpp engine received {} options", other.engine_tag()),
	}
}

async fn write_stream(dest: &Path, response: reqwest::Response) -> anyhow::Result<()> {
	let mut file = tokio::fs::File::create(dest).await?;
	let mut stream = response.bytes_stream();
	while let Some(chunk) = stream.next().await {
		file.write_all(&chunk?).await?;
	}
	file.flush().await?;
	Ok(())
}
