use std::{process::Stdio, sync::LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::{config::Config, format::VideoMetadata, Error, Result};

use super::MetadataExtractor;

// keep error reports readable when yt-dlp dumps a long traceback
const STDERR_TAIL_CHARS: usize = 2000;

// run yt-dlp command line to dump the video metadata as one json document.
// requires yt-dlp executable at `program` (or in PATH).
#[derive(Debug, Clone)]
pub struct Ytdlp {
  program: String,
  proxy: Option<String>,
}

impl Ytdlp {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      proxy: None,
    }
  }

  pub fn with_proxy(self, proxy: Option<String>) -> Self {
    Self { proxy, ..self }
  }

  pub fn from_config(config: &Config) -> Self {
    Self::new(&config.ytdlp_path).with_proxy(config.ytdlp_proxy.clone())
  }

  fn command(&self, page_url: &str) -> Command {
    let mut cmd = Command::new(&self.program);
    cmd
      // emit the output as a single json object instead of jsonl
      .arg("--dump-single-json")
      .arg("--no-warnings")
      .arg("--no-check-certificate");

    if let Some(proxy) = &self.proxy {
      info!("using proxy: {}", redact_proxy(proxy));
      cmd.arg("--proxy").arg(proxy);
    }

    // stop option parsing so a page url can't be read as a flag
    cmd.arg("--").arg(page_url);

    cmd
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      // abandoned requests shouldn't leave yt-dlp running
      .kill_on_drop(true);

    cmd
  }
}

#[async_trait]
impl MetadataExtractor for Ytdlp {
  async fn extract(&self, page_url: &str) -> Result<VideoMetadata> {
    debug!("running {} for {}", self.program, page_url);

    let output = self
      .command(page_url)
      .output()
      .await
      .map_err(|e| Error::Extraction(format!("{}: {}", self.program, e)))?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      error!("yt-dlp stderr: {}", stderr.trim_end());
      return Err(Error::Extraction(format!(
        "yt-dlp exited with {}: {}",
        output.status,
        stderr_tail(&stderr)
      )));
    }

    serde_json::from_slice(&output.stdout)
      .map_err(|e| Error::Extraction(format!("invalid yt-dlp output: {e}")))
  }
}

fn stderr_tail(stderr: &str) -> &str {
  let stderr = stderr.trim();
  match stderr.char_indices().rev().nth(STDERR_TAIL_CHARS - 1) {
    Some((idx, _)) => &stderr[idx..],
    None => stderr,
  }
}

// used to remove cred info from proxy url before printing
fn redact_proxy(proxy: &str) -> std::borrow::Cow<'_, str> {
  static AUTH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"//[^:/@]+(:[^@]+)?@").unwrap());
  AUTH_REGEX.replace(proxy, "//<REDACTED>@")
}
