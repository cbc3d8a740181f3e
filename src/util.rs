mod relay_stream;

pub use relay_stream::RelayStream;

#[derive(Default)]
pub struct W<T>(pub T);

// only the head of a direct url is useful in logs, they tend to be huge
pub fn truncate_for_log(s: &str, max_chars: usize) -> &str {
  match s.char_indices().nth(max_chars) {
    Some((idx, _)) => &s[..idx],
    None => s,
  }
}
