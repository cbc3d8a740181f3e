use std::net::SocketAddr;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_YTDLP_PATH: &str = "yt-dlp";

#[derive(Debug, thiserror::Error)]
#[error("invalid {name}: {value:?}")]
pub struct ConfigError {
  name: &'static str,
  value: String,
}

/// Runtime settings, read from the environment once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  pub listen_addr: SocketAddr,
  pub ytdlp_path: String,
  pub ytdlp_proxy: Option<String>,
}

impl Config {
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|name| std::env::var(name).ok())
  }

  fn from_lookup(
    lookup: impl Fn(&str) -> Option<String>,
  ) -> Result<Self, ConfigError> {
    // empty values are treated as unset
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let listen_addr = var("LISTEN_ADDR")
      .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
    let listen_addr: SocketAddr =
      listen_addr.trim().parse().map_err(|_| ConfigError {
        name: "LISTEN_ADDR",
        value: listen_addr.clone(),
      })?;

    Ok(Self {
      listen_addr,
      ytdlp_path: var("YTDLP_PATH")
        .unwrap_or_else(|| DEFAULT_YTDLP_PATH.to_string()),
      ytdlp_proxy: var("YTDLP_PROXY"),
    })
  }
}
