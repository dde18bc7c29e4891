use anyhow::Result;
use clap::Parser;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use transcription_server::{router, AppState, Config};
use transcription_queue::{EngineRegistry, JobStore, Scheduler};

#[tokio::main]
async fn main() -> Result<()> {
	dotenv::dotenv().ok();
	let config = Config::parse();
	config.validate()?;

	init_tracing(&config);

	let connect_options = SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
	let pool = SqlitePoolOptions::new().connect_with(connect_options).await?;

	let store = JobStore::new(pool);
	store.migrate().await?;

	let config = Arc::new(config);
	let shutdown_token = CancellationToken::new();

	let scheduler = Scheduler::new(store.clone(), EngineRegistry::with_defaults(), Arc::new(config.engine_config())).with_idle_delay(config.idle_delay());
	let scheduler_handle = tokio::spawn(scheduler.run(shutdown_token.clone()));

	let app_state = AppState::new(store, config.clone());
	let app = router().layer(TraceLayer::new_for_http()).with_state(app_state);

	let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
	tracing::info!("listening on {}", listener.local_addr()?);

	let signal_shutdown_token = shutdown_token.clone();
	tokio::spawn(async move {
		tokio::signal::ctrl_c().await.ok();
		tracing::info!("Received Ctrl+C, initiating shutdown...");
		signal_shutdown_token.cancel();
	});

	let server_token = shutdown_token.clone();
	axum::serve(listener, app)
		.with_graceful_shutdown(async move {
			server_token.cancelled().await;
		})
		.await?;

	tracing::info!("Server stopped, waiting for the scheduler...");
	shutdown_token.cancel();
	scheduler_handle.await?;

	tracing::info!("Shutdown complete");
	Ok(())
}

fn init_tracing(config: &Config) {
	let filter = config
		.rust_log
		.as_deref()
		.map_or_else(|| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")), EnvFilter::new);

	tracing_subscriber::fmt().with_env_filter(filter).init();
}
