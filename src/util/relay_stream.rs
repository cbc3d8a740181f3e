use std::{
  pin::Pin,
  task::{Context, Poll},
};

use bytes::Bytes;
use futures::Stream;
use tracing::{error, info};

/// Passes chunks through unchanged, keeping count of the bytes relayed.
///
/// Logs once when the inner stream ends, and stops after the first error
/// so the response body terminates instead of polling a broken upstream.
pub struct RelayStream<T> {
  stream: T,
  label: String,
  relayed_bytes: u64,
  done: bool,
}

impl<T> RelayStream<T> {
  pub fn new(stream: T, label: impl Into<String>) -> Self {
    RelayStream {
      stream,
      label: label.into(),
      relayed_bytes: 0,
      done: false,
    }
  }
}

impl<T, E> Stream for RelayStream<T>
where
  T: Stream<Item = Result<Bytes, E>> + Unpin,
  E: std::fmt::Display,
{
  type Item = Result<Bytes, E>;

  fn poll_next(
    mut self: Pin<&mut Self>,
    cx: &mut Context<'_>,
  ) -> Poll<Option<Self::Item>> {
    let this = &mut *self;
    if this.done {
      return Poll::Ready(None);
    }

    match Pin::new(&mut this.stream).poll_next(cx) {
      Poll::Ready(Some(Ok(bytes))) => {
        this.relayed_bytes += bytes.len() as u64;
        Poll::Ready(Some(Ok(bytes)))
      }
      Poll::Ready(Some(Err(err))) => {
        // headers are already sent, all we can do is cut the body short
        error!(
          "stream error for {} after {} bytes: {}",
          this.label, this.relayed_bytes, err
        );
        this.done = true;
        Poll::Ready(Some(Err(err)))
      }
      Poll::Ready(None) => {
        info!(
          "finished streaming {} ({} bytes)",
          this.label, this.relayed_bytes
        );
        this.done = true;
        Poll::Ready(None)
      }
      Poll::Pending => Poll::Pending,
    }
  }
}
