use axum::{
  response::{IntoResponse, Response},
  Json,
};
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{error, warn};

use crate::W;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("invalid input: {0}")]
  InvalidInput(&'static str),
  #[error("extraction failed: {0}")]
  Extraction(String),
  #[error("no downloadable format found")]
  NoDownloadableFormat,
  #[error("upstream fetch failed: {0}")]
  UpstreamFetch(#[source] reqwest::Error),
}

impl Error {
  pub fn status(&self) -> StatusCode {
    match self {
      Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
      Error::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
      Error::NoDownloadableFormat => StatusCode::INTERNAL_SERVER_ERROR,
      Error::UpstreamFetch(_) => StatusCode::BAD_GATEWAY,
    }
  }

  /// Stable message shown to API clients. Never includes raw internals.
  pub fn user_message(&self) -> &'static str {
    match self {
      Error::InvalidInput(_) => "Video URL is required.",
      Error::Extraction(_) => {
        "Failed to process the video link. \
         It may be private, unsupported, or invalid."
      }
      Error::NoDownloadableFormat => "No downloadable format found.",
      Error::UpstreamFetch(_) => "Error during video download.",
    }
  }

  /// Short plain-text message for browser-facing endpoints.
  pub fn plain_message(&self) -> &'static str {
    match self {
      Error::InvalidInput(_) => "Missing video URL",
      other => other.user_message(),
    }
  }

  // client mistakes are not server faults
  fn log(&self) {
    if self.status().is_client_error() {
      warn!("{}", self);
    } else {
      error!("{}", self);
    }
  }

  pub fn details(&self) -> Option<String> {
    match self {
      Error::Extraction(msg) => Some(msg.clone()),
      _ => None,
    }
  }
}

// plain text, used by the relay endpoint
impl IntoResponse for Error {
  fn into_response(self) -> Response {
    self.log();
    (self.status(), self.plain_message()).into_response()
  }
}

#[derive(Serialize)]
struct ErrorBody {
  success: bool,
  error: &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  details: Option<String>,
}

// json, used by the api endpoint
impl IntoResponse for W<Error> {
  fn into_response(self) -> Response {
    let err = self.0;
    err.log();

    let body = ErrorBody {
      success: false,
      error: err.user_message(),
      details: err.details(),
    };

    (err.status(), Json(body)).into_response()
  }
}

impl From<Error> for W<Error> {
  fn from(err: Error) -> Self {
    W(err)
  }
}
