pub mod engines;
pub mod error;
pub mod models;
pub mod notify;
pub mod scheduler;
pub mod store;

pub use engines::{Engine, EngineConfig, EngineRegistry};
pub use error::QueueError;
pub use models::{EngineOptions, JobRecord, JobState, NotificationType, TranscriptionRequest};
pub use notify::Notifier;
pub use scheduler::Scheduler;
pub use store::{JobStore, Visibility};
