use std::{sync::Arc, time::Instant};

use axum::{
  extract::State,
  headers::ContentType,
  response::IntoResponse,
  routing::{get, post},
  Json, Router, TypedHeader,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod extractor;
mod format;
mod relay;
mod resolver;
mod util;

pub use error::{Error, Result};
pub use util::W;

use config::Config;
use extractor::{MetadataExtractor, Ytdlp};

pub const HOMEPAGE_HTML: &str = include_str!("../html/homepage.html");

/// Read-only per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
  pub extractor: Arc<dyn MetadataExtractor + Send + Sync>,
  pub http: reqwest::Client,
  pub started_at: Instant,
}

impl AppState {
  pub fn new(extractor: impl MetadataExtractor + Send + Sync + 'static) -> Self {
    Self {
      extractor: Arc::new(extractor),
      // no overall timeout, media files can take arbitrarily long
      http: reqwest::Client::new(),
      started_at: Instant::now(),
    }
  }
}

pub fn app(state: AppState) -> Router {
  Router::new()
    .route("/", get(homepage))
    .route("/health", get(health))
    .route("/download-info", post(resolver::download_info))
    .route("/proxy-download", get(relay::proxy_download))
    .layer(CorsLayer::permissive())
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
  init_logging();

  let config = Config::from_env()?;
  let state = AppState::new(Ytdlp::from_config(&config));

  info!("Listening on http://{}", config.listen_addr);

  axum::Server::try_bind(&config.listen_addr)?
    .serve(app(state).into_make_service())
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  Ok(())
}

fn init_logging() {
  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
    EnvFilter::new("info,video_download_proxy=debug,tower_http=debug")
  });

  tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

async fn shutdown_signal() {
  if let Err(err) = tokio::signal::ctrl_c().await {
    tracing::error!("failed to install ctrl-c handler: {}", err);
  }
  info!("shutting down");
}

async fn homepage() -> impl IntoResponse {
  (
    TypedHeader::<ContentType>(ContentType::html()),
    HOMEPAGE_HTML,
  )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Health {
  status: &'static str,
  uptime_secs: u64,
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
  Json(Health {
    status: "ok",
    uptime_secs: state.started_at.elapsed().as_secs(),
  })
}
