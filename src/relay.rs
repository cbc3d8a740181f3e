use axum::{
  body::StreamBody,
  extract::{Query, State},
  http::header,
  response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
  util::{truncate_for_log, RelayStream},
  AppState, Error, Result,
};

const LOGGED_URL_CHARS: usize = 200;
const DEFAULT_FILENAME: &str = "video";

#[derive(Deserialize)]
pub struct ProxyDownloadReq {
  url: Option<String>,
  title: Option<String>,
}

#[axum::debug_handler]
pub async fn proxy_download(
  State(state): State<AppState>,
  Query(req): Query<ProxyDownloadReq>,
) -> Result<Response> {
  let direct_url = req
    .url
    .filter(|url| !url.trim().is_empty())
    .ok_or(Error::InvalidInput("url"))?;
  let filename = header_safe_filename(req.title.as_deref().unwrap_or_default());

  relay(&state.http, &direct_url, &filename).await
}

// drop only what would break the quoted Content-Disposition value
fn header_safe_filename(title: &str) -> String {
  let filename = title
    .chars()
    .filter(|c| !matches!(c, '"' | '\\') && !c.is_control())
    .collect::<String>();
  let filename = filename.trim();

  if filename.is_empty() {
    DEFAULT_FILENAME.to_string()
  } else {
    filename.to_string()
  }
}

/// Stream `direct_url` back to the caller as `<filename>.mp4`.
///
/// The first upstream chunk is awaited before the response is built, so a
/// failure that happens before any byte is relayed still becomes a plain
/// text error. Later failures can only cut the body short.
pub async fn relay(
  client: &reqwest::Client,
  direct_url: &str,
  filename: &str,
) -> Result<Response> {
  info!("proxying download for: {}", filename);
  debug!(
    "source url (first {} chars): {}",
    LOGGED_URL_CHARS,
    truncate_for_log(direct_url, LOGGED_URL_CHARS)
  );

  let upstream = client
    .get(direct_url)
    .send()
    .await
    .and_then(|resp| resp.error_for_status())
    .map_err(Error::UpstreamFetch)?;

  let mut body = Box::pin(upstream.bytes_stream());
  let first = body.next().await.transpose().map_err(Error::UpstreamFetch)?;
  let body = futures::stream::iter(first.map(Ok::<Bytes, reqwest::Error>))
    .chain(body);

  let headers = [
    (header::CONTENT_TYPE, "video/mp4".to_string()),
    (
      header::CONTENT_DISPOSITION,
      format!("attachment; filename=\"{filename}.mp4\""),
    ),
  ];
  let stream = RelayStream::new(body, filename);

  Ok((headers, StreamBody::new(stream)).into_response())
}
