//! Decoder for OpenAI-style server-sent event streams.

use serde::Deserialize;
use tracing::warn;

use super::{ProviderError, StreamEvent};

/// Streaming response chunk (SSE format).
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Error object, either inside a stream chunk or as a whole error response body.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamErrorBody {
    pub(crate) message: String,
}

/// Error response wrapper returned with non-success statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: StreamErrorBody,
}

/// Turns raw body bytes into stream events.
///
/// Bytes are buffered until a full line is available, so chunk boundaries may
/// fall anywhere, including inside a multi-byte character.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    finished: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a terminal event (`Done` or `Error`) has been produced.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed a chunk of body bytes and collect every event completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }
        self.buffer.extend_from_slice(chunk);

        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.decode_line(line.trim()) {
                let terminal = !matches!(event, StreamEvent::Token(_));
                events.push(event);
                if terminal {
                    self.finished = true;
                    self.buffer.clear();
                    break;
                }
            }
        }

        events
    }

    fn decode_line(&self, line: &str) -> Option<StreamEvent> {
        // Blank lines separate events; comments and other fields carry nothing we use.
        let data = line.strip_prefix("data:")?.trim_start();

        if data == "[DONE]" {
            return Some(StreamEvent::Done);
        }

        match serde_json::from_str::<StreamChunk>(data) {
            Ok(chunk) => {
                if let Some(error) = chunk.error {
                    return Some(StreamEvent::Error(ProviderError::StreamError(error.message)));
                }
                chunk
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.delta.content)
                    .filter(|content| !content.is_empty())
                    .map(StreamEvent::Token)
            }
            Err(e) => {
                warn!(error = %e, data, "skipping unparseable stream chunk");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(text: &str) -> StreamEvent {
        StreamEvent::Token(text.to_string())
    }

    #[test]
    fn test_decodes_tokens_and_done() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"H\"}}]}\n\n\
              data: {\"choices\":[{\"delta\":{\"content\":\"i\"}}]}\n\n\
              data: [DONE]\n\n",
        );
        assert_eq!(events, vec![token("H"), token("i"), StreamEvent::Done]);
        assert!(decoder.is_finished());
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: {\"choices\":[{\"del").is_empty());
        let events = decoder.feed(b"ta\":{\"content\":\"Par\"}}]}\n");
        assert_eq!(events, vec![token("Par")]);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"é\"}}]}\n".as_bytes();
        let split = line.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(&line[..split]).is_empty());
        assert_eq!(decoder.feed(&line[split..]), vec![token("é")]);
    }

    #[test]
    fn test_error_object_ends_stream() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(
            b"data: {\"error\":{\"message\":\"connection reset\"}}\n\
              data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n",
        );
        assert_eq!(
            events,
            vec![StreamEvent::Error(ProviderError::StreamError(
                "connection reset".to_string()
            ))]
        );
        assert!(decoder.feed(b"data: [DONE]\n").is_empty());
    }

    #[test]
    fn test_ignores_role_only_deltas_comments_and_garbage() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(
            b": keep-alive\n\
              event: message\n\
              data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\
              data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n\
              data: not json\n\
              data:{\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n",
        );
        assert_eq!(events, vec![token("ok")]);
        assert!(!decoder.is_finished());
    }
}
