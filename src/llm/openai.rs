//! Provider for OpenAI-compatible chat completion endpoints.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::sse::ErrorResponse;
use super::{
    ChatMessage, ChatRequest, LlmConfig, LlmProvider, ProviderError, ProviderResult, SseDecoder,
    StreamEvent,
};
use crate::error::ConfigError;

/// Capacity of the channel between the body reader and the turn consumer.
const EVENT_BUFFER: usize = 64;

/// Provider speaking the OpenAI chat completions protocol.
pub struct OpenAiProvider {
    client: Client,
    config: Arc<LlmConfig>,
}

impl OpenAiProvider {
    /// Validate the config and build the HTTP client.
    pub fn new(config: LlmConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'))
    }

    fn request(&self, messages: Vec<ChatMessage>) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages,
            stream: true,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn open_stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> ProviderResult<mpsc::Receiver<StreamEvent>> {
        let url = self.completions_url();
        let request = self.request(messages);
        debug!(
            %url,
            model = %request.model,
            messages = request.messages.len(),
            "opening chat stream"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|resp| resp.error.message)
                .unwrap_or(body);
            warn!(status = status.as_u16(), %message, "chat request rejected");
            return Err(ProviderError::from_status(status.as_u16(), message));
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(forward_events(response.bytes_stream(), tx));
        Ok(rx)
    }
}

/// Decode a body stream and forward its events until a terminal event,
/// the end of the body, or the receiver going away.
pub(crate) async fn forward_events<S, B, E>(body: S, tx: mpsc::Sender<StreamEvent>)
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<ProviderError>,
{
    futures::pin_mut!(body);
    let mut decoder = SseDecoder::new();

    loop {
        let chunk = tokio::select! {
            _ = tx.closed() => {
                debug!("stream receiver dropped; closing body");
                return;
            }
            chunk = body.next() => chunk,
        };

        let events = match chunk {
            Some(Ok(bytes)) => decoder.feed(bytes.as_ref()),
            Some(Err(e)) => vec![StreamEvent::Error(e.into())],
            // A body that ends without [DONE] still counts as a finished reply.
            None => vec![StreamEvent::Done],
        };

        for event in events {
            let terminal = !matches!(event, StreamEvent::Token(_));
            if tx.send(event).await.is_err() || terminal {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn configured() -> LlmConfig {
        LlmConfig {
            api_key: "test-key".to_string(),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_new_rejects_missing_key() {
        assert!(matches!(
            OpenAiProvider::new(LlmConfig::default()),
            Err(ConfigError::MissingCredential)
        ));
    }

    #[test]
    fn test_completions_url_trims_slash() {
        let provider = OpenAiProvider::new(LlmConfig {
            api_base: "http://localhost:11434/v1/".to_string(),
            ..configured()
        })
        .unwrap();
        assert_eq!(
            provider.completions_url(),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_always_streams() {
        let provider = OpenAiProvider::new(LlmConfig {
            model: "test-model".to_string(),
            ..configured()
        })
        .unwrap();
        let request = provider.request(vec![ChatMessage::new("user", "Hello")]);
        assert!(request.stream);
        assert_eq!(request.model, "test-model");
        assert_eq!(provider.model(), "test-model");
    }

    #[test]
    fn test_request_body_omits_unset_options() {
        let provider = OpenAiProvider::new(LlmConfig {
            model: "test-model".to_string(),
            ..configured()
        })
        .unwrap();
        let request = provider.request(vec![ChatMessage::new("user", "Hello")]);
        let body = serde_json::to_string_pretty(&request).unwrap();
        insta::assert_snapshot!(body, @r###"
        {
          "model": "test-model",
          "messages": [
            {
              "role": "user",
              "content": "Hello"
            }
          ],
          "stream": true
        }
        "###);
    }

    #[tokio::test]
    async fn test_forward_events_until_done() {
        let chunks: Vec<Result<&[u8], ProviderError>> = vec![
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"H\"}}]}\n".as_slice()),
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"i\"}}]}\ndata: [DONE]\n".as_slice()),
        ];
        let (tx, mut rx) = mpsc::channel(8);
        forward_events(stream::iter(chunks), tx).await;

        assert_eq!(rx.recv().await, Some(StreamEvent::Token("H".to_string())));
        assert_eq!(rx.recv().await, Some(StreamEvent::Token("i".to_string())));
        assert_eq!(rx.recv().await, Some(StreamEvent::Done));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_forward_events_body_error() {
        let chunks: Vec<Result<&[u8], ProviderError>> = vec![
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"Par\"}}]}\n".as_slice()),
            Err(ProviderError::NetworkError("connection reset".to_string())),
        ];
        let (tx, mut rx) = mpsc::channel(8);
        forward_events(stream::iter(chunks), tx).await;

        assert_eq!(rx.recv().await, Some(StreamEvent::Token("Par".to_string())));
        assert_eq!(
            rx.recv().await,
            Some(StreamEvent::Error(ProviderError::NetworkError(
                "connection reset".to_string()
            )))
        );
    }

    #[tokio::test]
    async fn test_forward_events_body_end_without_done_marker() {
        let chunks: Vec<Result<&[u8], ProviderError>> =
            vec![Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n".as_slice())];
        let (tx, mut rx) = mpsc::channel(8);
        forward_events(stream::iter(chunks), tx).await;

        assert_eq!(rx.recv().await, Some(StreamEvent::Token("x".to_string())));
        assert_eq!(rx.recv().await, Some(StreamEvent::Done));
    }

    #[tokio::test]
    async fn test_forward_events_stops_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        // A body that never yields would hang forever without the closed check.
        let body = stream::pending::<Result<&'static [u8], ProviderError>>();
        forward_events(body, tx).await;
    }
}
