pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use crate::auth::Principal;
pub use crate::config::Config;
pub use crate::error::ApiError;
pub use crate::routes::router;
pub use crate::state::AppState;
