use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use transcription_queue::EngineConfig;

#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Config {
	/// Server host
	#[arg(long, env = "HOST", default_value = "0.0.0.0")]
	pub host: String,

	/// Server port
	#[arg(long, env = "PORT", default_value = "8000")]
	pub port: u16,

	/// SQLite connection string for the job table
	#[arg(long, env = "DATABASE_URL", default_value = "sqlite://var/transcription.db")]
	pub database_url: String,

	/// Token file with one `is_admin:user:token` entry per line
	#[arg(long, env = "USERS_FILE", default_value = "etc/users.txt")]
	pub users_file: PathBuf,

	/// Directory engine models are downloaded into
	#[arg(long, env = "MODELS_DIR", default_value = "models")]
	pub models_dir: PathBuf,

	/// whisper.cpp CLI binary
	#[arg(long, env = "WHISPER_CPP_BIN", default_value = "whisper-cli")]
	pub whisper_cpp_bin: PathBuf,

	/// openai-whisper CLI binary
	#[arg(long, env = "WHISPER_BIN", default_value = "whisper")]
	pub whisper_bin: PathBuf,

	/// faster-whisper CLI binary
	#[arg(long, env = "FASTER_WHISPER_BIN", default_value = "whisper-ctranslate2")]
	pub faster_whisper_bin: PathBuf,

	/// Threads handed to the transcription CLIs
	#[arg(long, env = "ENGINE_THREADS", default_value = "8")]
	pub engine_threads: usize,

	/// Seconds the scheduler sleeps between queue polls
	#[arg(long, env = "IDLE_DELAY_SECS", default_value = "10")]
	pub idle_delay_secs: u64,

	/// Log level
	#[arg(long, env = "RUST_LOG")]
	pub rust_log: Option<String>,
}

impl Config {
	/// Fail fast on settings that would otherwise surface as confusing
	/// runtime errors.
	pub fn validate(&self) -> anyhow::Result<()> {
		anyhow::ensure!(self.users_file.is_file(), "users file {} does not exist", self.users_file.display());
		anyhow::ensure!(self.idle_delay_secs > 0, "idle delay must be at least one second");
		Ok(())
	}

	#[must_use]
	pub fn engine_config(&self) -> EngineConfig {
		EngineConfig {
			models_dir: self.models_dir.clone(),
			whisper_cpp_bin: self.whisper_cpp_bin.clone(),
			whisper_bin: self.whisper_bin.clone(),
			faster_whisper_bin: self.faster_whisper_bin.clone(),
			threads: self.engine_threads,
		}
	}

	#[must_use]
	pub const fn idle_delay(&self) -> Duration {
		Duration::from_secs(self.idle_delay_secs)
	}
}
