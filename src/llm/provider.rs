//! LLM provider trait for the turn pipeline.
//!
//! This module defines the `LlmProvider` trait that the turn pipeline talks to.
//! The HTTP implementation lives in `openai`; tests plug in scripted providers.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::{ChatMessage, StreamEvent};

/// Trait for LLM providers.
///
/// Opening a stream is split from consuming it so that a request that never
/// got established can be told apart from one that broke half-way.
///
/// # Example
///
/// ```ignore
/// use relay_chat::llm::{ChatMessage, LlmProvider, StreamEvent};
///
/// async fn chat(provider: &dyn LlmProvider) {
///     let messages = vec![ChatMessage::new("user", "Hello!")];
///     let mut rx = provider.open_stream(messages).await.unwrap();
///     while let Some(event) = rx.recv().await {
///         if let StreamEvent::Token(text) = event {
///             print!("{text}");
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the model identifier sent with every request.
    fn model(&self) -> &str;

    /// Send a streaming chat completion request.
    ///
    /// Resolves once the remote side has accepted the request. The returned
    /// receiver then yields:
    /// - `StreamEvent::Token(String)` - A chunk of generated text
    /// - `StreamEvent::Done` - Stream completed successfully
    /// - `StreamEvent::Error(ProviderError)` - The stream broke
    ///
    /// Dropping the receiver stops the provider from reading any further.
    async fn open_stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> ProviderResult<mpsc::Receiver<StreamEvent>>;
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur during provider operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Rate limit exceeded
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Network or connection error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// API returned an error status
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// The service reported an error inside an open stream
    #[error("{0}")]
    StreamError(String),

    /// No fragment arrived within the configured idle timeout
    #[error("no data received for {0:?}")]
    IdleTimeout(Duration),

    /// Provider-specific error
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::NetworkError("Request timed out".to_string())
        } else if err.is_connect() {
            Self::NetworkError(format!("Connection failed: {}", err))
        } else {
            Self::NetworkError(err.to_string())
        }
    }
}

impl ProviderError {
    /// Build the error for a non-success HTTP status.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed(message),
            429 => Self::RateLimited(message),
            _ => Self::ApiError { status, message },
        }
    }
}
