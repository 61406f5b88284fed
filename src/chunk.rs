/// Line-safe chunking of text increments.
///
/// Splits arbitrary text into chunks of at most `limit` characters, breaking
/// only after a newline, and hands each chunk to a sink in order. A single
/// line longer than the limit cannot be broken at a line boundary; the
/// [`OverflowPolicy`] decides how it is emitted.
use crate::config::{ConfigError, OverflowPolicy};
use crate::sink::Sink;

#[derive(Debug, Clone, Copy)]
pub struct ChunkForwarder {
    limit: usize,
    policy: OverflowPolicy,
}

impl ChunkForwarder {
    /// Create a forwarder. `limit` is measured in characters and must be non-zero.
    pub fn new(limit: usize, policy: OverflowPolicy) -> Result<Self, ConfigError> {
        if limit == 0 {
            return Err(ConfigError::Invalid {
                field: "forward.chunk_limit",
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(Self { limit, policy })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Split `text` and deliver every chunk to `sink`. Empty text delivers nothing.
    pub fn forward<S: Sink + ?Sized>(&self, text: &str, sink: &mut S) {
        for chunk in self.split(text) {
            sink.accept(chunk);
        }
    }

    /// Split `text` into the chunks `forward` would deliver.
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut chunks = Vec::new();
        let mut rest = text;

        // `window_end` exists only while more than `limit` characters remain.
        while let Some(window_end) = char_offset(rest, self.limit) {
            let (chunk_end, skip) = match rest[..window_end].rfind('\n') {
                Some(nl) => (nl + 1, 0),
                None => self.overflow_bounds(rest, window_end),
            };
            chunks.push(&rest[..chunk_end]);
            rest = &rest[chunk_end + skip..];
        }

        if !rest.is_empty() {
            chunks.push(rest);
        }
        chunks
    }

    /// Chunk end and number of bytes to skip after it, for a window with no newline.
    fn overflow_bounds(&self, rest: &str, window_end: usize) -> (usize, usize) {
        tracing::warn!(
            limit = self.limit,
            policy = ?self.policy,
            "line exceeds chunk limit, emitting oversized chunk"
        );
        match self.policy {
            OverflowPolicy::WholeLine => {
                let end = rest[window_end..]
                    .find('\n')
                    .map_or(rest.len(), |nl| window_end + nl + 1);
                (end, 0)
            }
            OverflowPolicy::Legacy => {
                let skip = rest[window_end..].chars().next().map_or(0, char::len_utf8);
                (window_end, skip)
            }
        }
    }
}

/// Byte offset of the `n`th character, if `text` has more than `n` characters.
fn char_offset(text: &str, n: usize) -> Option<usize> {
    text.char_indices().nth(n).map(|(i, _)| i)
}
