mod ytdlp;

use async_trait::async_trait;

use crate::{format::VideoMetadata, Result};

pub use ytdlp::Ytdlp;

/// Source of encoding metadata for a video page.
///
/// Failures of any kind are reported as `Error::Extraction`.
#[async_trait]
pub trait MetadataExtractor {
  async fn extract(&self, page_url: &str) -> Result<VideoMetadata>;
}
