use axum::{
  extract::{rejection::JsonRejection, State},
  Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
  extractor::MetadataExtractor, format::ResolvedDownload, AppState, Error,
  Result, W,
};

#[derive(Deserialize)]
pub struct DownloadInfoReq {
  #[serde(default)]
  url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadInfoResp {
  success: bool,
  download_url: String,
  title: String,
}

/// Ask the extractor about `page_url` and pick the url worth downloading.
pub async fn resolve(
  extractor: &(dyn MetadataExtractor + Send + Sync),
  page_url: &str,
) -> Result<ResolvedDownload> {
  let page_url = page_url.trim();
  if page_url.is_empty() {
    return Err(Error::InvalidInput("url"));
  }

  info!("resolving {}", page_url);
  let metadata = extractor.extract(page_url).await?;
  debug!("extractor reported {} formats", metadata.formats().len());

  let download = metadata.into_download()?;
  info!("resolved {} to title {}", page_url, download.title);

  Ok(download)
}

pub async fn download_info(
  State(state): State<AppState>,
  payload: Result<Json<DownloadInfoReq>, JsonRejection>,
) -> Result<Json<DownloadInfoResp>, W<Error>> {
  let page_url = payload
    .ok()
    .and_then(|Json(req)| req.url)
    .ok_or(Error::InvalidInput("url"))?;

  let download = resolve(state.extractor.as_ref(), &page_url).await?;

  Ok(Json(DownloadInfoResp {
    success: true,
    download_url: download.direct_url,
    title: download.title,
  }))
}
