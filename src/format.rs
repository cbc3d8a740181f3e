use serde::Deserialize;
use tracing::{debug, warn};

use crate::{Error, Result};

const DEFAULT_TITLE: &str = "video";
const NONE_CODEC: &str = "none";

/// One rendition of a video as reported by yt-dlp.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EncodingRecord {
  #[serde(rename = "ext")]
  pub container: Option<String>,
  #[serde(rename = "vcodec")]
  pub video_codec: Option<String>,
  #[serde(rename = "acodec")]
  pub audio_codec: Option<String>,
  pub height: Option<u32>,
  #[serde(rename = "url")]
  pub media_url: Option<String>,
}

impl EncodingRecord {
  // a single mp4 stream carrying both audio and video, no mux needed
  fn is_combined_mp4(&self) -> bool {
    let has = |codec: &Option<String>| codec.as_deref() != Some(NONE_CODEC);
    has(&self.video_codec)
      && has(&self.audio_codec)
      && self.container.as_deref() == Some("mp4")
  }

  fn height(&self) -> u32 {
    self.height.unwrap_or(0)
  }

  fn media_url(&self) -> Option<&str> {
    self.media_url.as_deref().filter(|url| !url.is_empty())
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoMetadata {
  pub title: Option<String>,
  #[serde(default)]
  pub formats: Option<Vec<EncodingRecord>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDownload {
  pub direct_url: String,
  pub title: String,
}

impl VideoMetadata {
  pub fn formats(&self) -> &[EncodingRecord] {
    self.formats.as_deref().unwrap_or_default()
  }

  pub fn into_download(self) -> Result<ResolvedDownload> {
    let format = select_format(self.formats())?;
    let direct_url = format
      .media_url()
      .ok_or(Error::NoDownloadableFormat)?
      .to_string();
    let title = sanitize_title(self.title.as_deref().unwrap_or_default());

    Ok(ResolvedDownload { direct_url, title })
  }
}

/// Pick the tallest combined audio+video mp4, or else the first record
/// with any url at all.
pub fn select_format(formats: &[EncodingRecord]) -> Result<&EncodingRecord> {
  let mut combined = formats.iter().filter(|f| f.is_combined_mp4());

  if let Some(first) = combined.next() {
    // only a strictly taller record replaces the current best
    let best = combined.fold(first, |best, current| {
      if current.height() > best.height() {
        current
      } else {
        best
      }
    });
    debug!("best combined format: {}p", best.height());
    return Ok(best);
  }

  warn!("no combined mp4 format, falling back to any format with url");
  formats
    .iter()
    .find(|f| f.media_url().is_some())
    .ok_or(Error::NoDownloadableFormat)
}

/// Reduce a title to `[A-Za-z0-9_]`, suitable as a file name stem.
///
/// Other characters are dropped and each run of whitespace becomes a
/// single `_`. An existing `_` counts as whitespace, which keeps the
/// function idempotent.
pub fn sanitize_title(title: &str) -> String {
  let mut sanitized = String::with_capacity(title.len());
  let mut in_gap = false;

  for c in title.chars() {
    if c.is_ascii_alphanumeric() {
      sanitized.push(c);
      in_gap = false;
    } else if (c.is_whitespace() || c == '_') && !in_gap {
      sanitized.push('_');
      in_gap = true;
    }
  }

  if sanitized.is_empty() {
    DEFAULT_TITLE.to_string()
  } else {
    sanitized
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn record(
    ext: &str,
    vcodec: &str,
    acodec: &str,
    height: Option<u32>,
    url: Option<&str>,
  ) -> EncodingRecord {
    EncodingRecord {
      container: Some(ext.into()),
      video_codec: Some(vcodec.into()),
      audio_codec: Some(acodec.into()),
      height,
      media_url: url.map(Into::into),
    }
  }

  fn combined(height: Option<u32>, url: &str) -> EncodingRecord {
    record("mp4", "h264", "aac", height, Some(url))
  }

  #[test]
  fn test_select_tallest_combined_mp4() {
    let formats = vec![
      combined(Some(360), "a"),
      combined(Some(1080), "b"),
      record("webm", "vp9", "opus", Some(2160), Some("c")),
      record("mp4", "avc1", "none", Some(1440), Some("d")),
      combined(Some(720), "e"),
    ];

    let best = select_format(&formats).unwrap();
    assert_eq!(best.media_url(), Some("b"));

    for f in formats.iter().filter(|f| f.is_combined_mp4()) {
      assert!(best.height() >= f.height());
    }
  }

  #[test]
  fn test_select_ties_keep_first() {
    let formats = vec![
      combined(Some(720), "first"),
      combined(Some(720), "second"),
      combined(None, "third"),
    ];
    let best = select_format(&formats).unwrap();
    assert_eq!(best.media_url(), Some("first"));
  }

  #[test]
  fn test_select_missing_height_counts_as_zero() {
    let formats = vec![combined(None, "a"), combined(Some(144), "b")];
    assert_eq!(select_format(&formats).unwrap().media_url(), Some("b"));
  }

  #[test]
  fn test_select_fallback_first_with_url() {
    let formats = vec![
      record("webm", "vp9", "none", Some(1080), None),
      record("webm", "vp9", "none", Some(1080), Some("")),
      record("m4a", "none", "mp4a", None, Some("audio")),
      record("webm", "vp9", "none", Some(2160), Some("video")),
    ];
    let best = select_format(&formats).unwrap();
    assert_eq!(best.media_url(), Some("audio"));
  }

  #[test]
  fn test_select_without_any_url_fails() {
    let formats = vec![record("webm", "vp9", "none", Some(1080), None)];
    assert!(matches!(
      select_format(&formats),
      Err(Error::NoDownloadableFormat)
    ));
    assert!(matches!(select_format(&[]), Err(Error::NoDownloadableFormat)));
  }

  #[test]
  fn test_absent_codec_is_not_none() {
    let format = EncodingRecord {
      container: Some("mp4".into()),
      media_url: Some("x".into()),
      ..Default::default()
    };
    assert!(format.is_combined_mp4());
  }

  #[test]
  fn test_sanitize_title() {
    assert_eq!(sanitize_title("My Video!"), "My_Video");
    assert_eq!(sanitize_title("a \t b\n\nc"), "a_b_c");
    assert_eq!(sanitize_title(" padded "), "_padded_");
    assert_eq!(sanitize_title("a ! b"), "a_b");
    assert_eq!(sanitize_title("Ünïcødé — test #1"), "ncd_test_1");
    assert_eq!(sanitize_title(""), "video");
    assert_eq!(sanitize_title("!!!"), "video");
    assert_eq!(sanitize_title("already_clean"), "already_clean");
    assert_eq!(sanitize_title("snake__case _ name"), "snake_case_name");
  }

  #[test]
  fn test_sanitize_title_idempotent_and_charset() {
    let samples = [
      "My Video!",
      "",
      "   ",
      "a_b",
      "tab\tand\nnewline",
      "日本語 title (official) [4K]",
      "\"quoted\" / slashed \\ name.mp4",
    ];

    for s in samples {
      let once = sanitize_title(s);
      assert_eq!(sanitize_title(&once), once, "not idempotent for {s:?}");
      assert!(!once.is_empty());
      assert!(once.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }
  }

  #[test]
  fn test_metadata_scenarios() {
    let json = r#"{
      "title": "My Video!",
      "formats": [
        {"ext": "mp4", "vcodec": "h264", "acodec": "aac", "height": 720, "url": "A"},
        {"ext": "mp4", "vcodec": "h264", "acodec": "aac", "height": 1080, "url": "B"}
      ]
    }"#;
    let meta: VideoMetadata = serde_json::from_str(json).unwrap();
    assert_eq!(
      meta.into_download().unwrap(),
      ResolvedDownload {
        direct_url: "B".into(),
        title: "My_Video".into()
      }
    );

    let json = r#"{
      "title": "",
      "formats": [{"ext": "webm", "vcodec": "vp9", "acodec": "none", "url": "C"}]
    }"#;
    let meta: VideoMetadata = serde_json::from_str(json).unwrap();
    assert_eq!(
      meta.into_download().unwrap(),
      ResolvedDownload {
        direct_url: "C".into(),
        title: "video".into()
      }
    );

    let meta: VideoMetadata = serde_json::from_str(r#"{"formats": []}"#).unwrap();
    assert!(matches!(
      meta.into_download(),
      Err(Error::NoDownloadableFormat)
    ));

    let meta: VideoMetadata = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
    assert!(matches!(
      meta.into_download(),
      Err(Error::NoDownloadableFormat)
    ));
  }

  #[test]
  fn test_metadata_tolerates_null_fields() {
    let json = r#"{
      "title": null,
      "formats": [{"ext": "mp4", "vcodec": "avc1", "acodec": "mp4a", "height": null, "url": "Z", "tbr": 1.5}]
    }"#;
    let meta: VideoMetadata = serde_json::from_str(json).unwrap();
    let download = meta.into_download().unwrap();
    assert_eq!(download.direct_url, "Z");
    assert_eq!(download.title, "video");
  }
}
