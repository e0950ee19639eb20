//! Incremental decoder for `text/event-stream` bodies.

use tracing::warn;

pub const DONE_MARKER: &str = "[DONE]";

/// Buffers raw body bytes and yields the payload of each complete `data:`
/// line. Comment lines, blank lines and other fields are skipped.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut payloads = Vec::new();
        while let Some(line_end) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = match std::str::from_utf8(&line) {
                Ok(line) => line.trim_end_matches(['\n', '\r']),
                Err(error) => {
                    warn!(%error, "skipping non UTF-8 stream line");
                    continue;
                }
            };
            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim();
                if !data.is_empty() {
                    payloads.push(data.to_owned());
                }
            }
        }
        payloads
    }

    /// Payload of a trailing line that was never newline-terminated.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let line = String::from_utf8(rest).ok()?;
        line.trim()
            .strip_prefix("data:")
            .map(str::trim)
            .filter(|data| !data.is_empty())
            .map(str::to_owned)
    }
}
