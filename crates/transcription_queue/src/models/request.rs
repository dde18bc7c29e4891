use serde::{Deserialize, Serialize};

/// Seconds a completed job survives before the reclaim sweep deletes it.
pub const DEFAULT_EXPIRATION_SECS: i64 = 3600;

const REQUEST_VERSION: &str = "1";

const WHISPER_MODELS: &[&str] = &[
	"tiny.en", "tiny", "base.en", "base", "small.en", "small", "medium.en", "medium", "large-v1", "large-v2", "large-v3", "large-v3-turbo",
];

const WHISPER_CPP_MODELS: &[&str] = &[
	"tiny",
	"tiny.en",
	"tiny-q5_1",
	"tiny.en-q5_1",
	"tiny-q8_0",
	"base",
	"base.en",
	"base-q5_1",
	"base.en-q5_1",
	"base-q8_0",
	"small",
	"small.en",
	"small.en-tdrz",
	"small-q5_1",
	"small.en-q5_1",
	"small-q8_0",
	"medium",
	"medium.en",
	"medium-q5_0",
	"medium.en-q5_0",
	"medium-q8_0",
	"large-v1",
	"large-v2",
	"large-v2-q5_0",
	"large-v2-q8_0",
	"large-v3",
	"large-v3-q5_0",
	"large-v3-turbo",
	"large-v3-turbo-q5_0",
	"large-v3-turbo-q8_0",
];

const FASTER_WHISPER_MODELS: &[&str] = &[
	"tiny",
	"tiny.en",
	"small",
	"small.en",
	"medium",
	"medium.en",
	"distil-small.en",
	"distil-medium.en",
	"large-v2",
	"large-v3",
	"large-v3-turbo",
	"distil-large-v2",
	"distil-large-v3",
];

/// How the client wants to learn about job completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
	/// No push; the record is deleted on the first terminal-state read
	#[default]
	Poll,
	/// PUT the full job record to `notification_url` until a 200 comes back
	Url,
	/// No push, no read-once delete; the expiration reclaim is the only exit
	Expire,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
	Auto,
	#[default]
	En,
	Es,
	De,
	Fr,
}

impl Language {
	pub const fn code(self) -> &'static str {
		match self {
			Self::Auto => "auto",
			Self::En => "en",
			Self::Es => "es",
			Self::De => "de",
			Self::Fr => "fr",
		}
	}
}

/// Presigned destinations for the produced transcript formats.
///
/// `meta_url` receives the job record itself and does not count as a
/// transcript output; `csv_url` is only honored by the whisper.cpp engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptOutputs {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub json_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub vtt_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub txt_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub csv_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub meta_url: Option<String>,
}

impl TranscriptOutputs {
	/// At least one transcript format must be requested for the job to be
	/// worth running.
	pub fn has_transcript_output(&self) -> bool {
		[&self.json_url, &self.vtt_url, &self.txt_url].into_iter().any(|url| url.as_deref().is_some_and(|u| !u.is_empty()))
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperOptions {
	#[serde(default)]
	pub language: Language,
	#[serde(default = "default_model")]
	pub model: String,
	/// Presigned URL of the input media
	pub input: String,
	pub outputs: TranscriptOutputs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOptions {
	#[serde(default)]
	pub language: Language,
	#[serde(default = "default_model")]
	pub model: String,
	pub input: String,
	pub outputs: TranscriptOutputs,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeType {
	#[default]
	Default,
	Fp32,
	Int8,
}

impl ComputeType {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Default => "default",
			Self::Fp32 => "fp32",
			Self::Int8 => "int8",
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FasterWhisperOptions {
	#[serde(default)]
	pub language: Language,
	#[serde(default = "default_model")]
	pub model: String,
	#[serde(default)]
	pub compute_type: ComputeType,
	pub input: String,
	pub outputs: TranscriptOutputs,
}

fn default_model() -> String {
	"small.en".to_string()
}

/// Engine-discriminated options; the `engine` field picks the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "engine")]
pub enum EngineOptions {
	#[serde(rename = "openai-whisper")]
	Whisper(WhisperOptions),
	#[serde(rename = "whisper.cpp")]
	WhisperCpp(WhisperCppOptions),
	#[serde(rename = "faster-whisper")]
	FasterWhisper(FasterWhisperOptions),
}

impl EngineOptions {
	pub const fn engine_tag(&self) -> &'static str {
		match self {
			Self::Whisper(_) => "openai-whisper",
			Self::WhisperCpp(_) => "whisper.cpp",
			Self::FasterWhisper(_) => "faster-whisper",
		}
	}

	pub fn outputs(&self) -> &TranscriptOutputs {
		match self {
			Self::Whisper(o) => &o.outputs,
			Self::WhisperCpp(o) => &o.outputs,
			Self::FasterWhisper(o) => &o.outputs,
		}
	}

	fn model(&self) -> &str {
		match self {
			Self::Whisper(o) => &o.model,
			Self::WhisperCpp(o) => &o.model,
			Self::FasterWhisper(o) => &o.model,
		}
	}

	fn allowed_models(&self) -> &'static [&'static str] {
		match self {
			Self::Whisper(_) => WHISPER_MODELS,
			Self::WhisperCpp(_) => WHISPER_CPP_MODELS,
			Self::FasterWhisper(_) => FASTER_WHISPER_MODELS,
		}
	}
}

/// The immutable client submission, embedded verbatim in the job row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionRequest {
	#[serde(default = "default_version")]
	pub version: String,
	#[serde(default)]
	pub notification_type: NotificationType,
	/// Required iff `notification_type` is `url`
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notification_url: Option<String>,
	/// Seconds after completion before the forced reclaim
	#[serde(default = "default_expiration")]
	pub expiration: i64,
	#[serde(default = "default_priority")]
	pub priority: i64,
	pub options: EngineOptions,
}

fn default_version() -> String {
	REQUEST_VERSION.to_string()
}

const fn default_expiration() -> i64 {
	DEFAULT_EXPIRATION_SECS
}

const fn default_priority() -> i64 {
	1
}

impl TranscriptionRequest {
	/// Reject malformed submissions before anything is persisted.
	pub fn validate(&self) -> Result<(), String> {
		if self.version != REQUEST_VERSION {
			return Err(format!("unsupported request version {}", self.version));
		}

		if self.notification_type == NotificationType::Url && self.notification_url.as_deref().map_or(true, str::is_empty) {
			return Err("notification_url is required for url notifications".to_string());
		}

		if self.expiration < 0 {
			return Err("expiration must not be negative".to_string());
		}

		if !(0..=2).contains(&self.priority) {
			return Err(format!("priority {} is outside 0..=2", self.priority));
		}

		if !self.options.outputs().has_transcript_output() {
			return Err("at least one output must be selected".to_string());
		}

		let model = self.options.model();
		if !self.options.allowed_models().contains(&model) {
			return Err(format!("model {} is not available for engine {}", model, self.options.engine_tag()));
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn request_json(outputs: &str) -> String {
		format!(
			r#"{{"version": "1", "options": {{"engine": "whisper.cpp", "language": "en", "model": "small.en", "input": "http://example.com/in.mp3", "outputs": {outputs}}}}}"#
		)
	}

	#[test]
	fn parses_tagged_engine_options() {
		let req: TranscriptionRequest = serde_json::from_str(&request_json(r#"{"vtt_url": "http://example.com/out.vtt"}"#)).unwrap();
		assert_eq!(req.options.engine_tag(), "whisper.cpp");
		assert_eq!(req.priority, 1);
		assert_eq!(req.expiration, DEFAULT_EXPIRATION_SECS);
		assert_eq!(req.notification_type, NotificationType::Poll);
		assert!(req.validate().is_ok());
	}

	#[test]
	fn rejects_empty_outputs() {
		let req: TranscriptionRequest = serde_json::from_str(&request_json("{}")).unwrap();
		assert!(req.validate().is_err());
	}

	#[test]
	fn meta_url_alone_is_not_an_output() {
		let req: TranscriptionRequest = serde_json::from_str(&request_json(r#"{"meta_url": "http://example.com/meta.json"}"#)).unwrap();
		assert!(req.validate().is_err());
	}

	#[test]
	fn url_notification_requires_a_url() {
		let mut req: TranscriptionRequest = serde_json::from_str(&request_json(r#"{"txt_url": "http://example.com/out.txt"}"#)).unwrap();
		req.notification_type = NotificationType::Url;
		assert!(req.validate().is_err());
		req.notification_url = Some("http://example.com/callback".to_string());
		assert!(req.validate().is_ok());
	}

	#[test]
	fn rejects_out_of_band_priority() {
		let mut req: TranscriptionRequest = serde_json::from_str(&request_json(r#"{"txt_url": "http://example.com/out.txt"}"#)).unwrap();
		req.priority = 3;
		assert!(req.validate().is_err());
	}

	#[test]
	fn rejects_unknown_model() {
		let json = r#"{"version": "1", "options": {"engine": "faster-whisper", "model": "huge-v9", "input": "http://example.com/in.mp3", "outputs": {"txt_url": "http://example.com/out.txt"}}}"#;
		let req: TranscriptionRequest = serde_json::from_str(json).unwrap();
		assert!(req.validate().is_err());
	}

	#[test]
	fn round_trips_verbatim_fields() {
		let json = request_json(r#"{"json_url": "http://example.com/out.json", "meta_url": "http://example.com/meta.json"}"#);
		let req: TranscriptionRequest = serde_json::from_str(&json).unwrap();
		let reserialized = serde_json::to_string(&req).unwrap();
		let reparsed: TranscriptionRequest = serde_json::from_str(&reserialized).unwrap();
		assert_eq!(reparsed.options.outputs().json_url, req.options.outputs().json_url);
	}
}
