//! Error types for turn submission and execution.
//!
//! Every error here is recovered locally: the control loop or the turn worker
//! renders it inline in the transcript and the application keeps running.

use thiserror::Error;

use crate::llm::ProviderError;

/// The client configuration cannot be used to talk to the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no API key configured; set OPENAI_API_KEY or api_key under [llm] in the config file")]
    MissingCredential,

    #[error("invalid API base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("no model configured; set MODEL or add model to the [llm] section of the config file")]
    MissingModel,

    #[error("could not build HTTP client: {0}")]
    HttpClient(String),
}

/// Why a single turn did not commit a reply.
#[derive(Debug, Clone, Error)]
pub enum TurnError {
    /// The streaming request could not be established.
    #[error("Stream error: {0}")]
    StreamInit(ProviderError),

    /// The stream broke after it was established.
    #[error("Stream error: {0}")]
    StreamRecv(ProviderError),

    /// The turn was interrupted by shutdown.
    #[error("turn cancelled")]
    Cancelled,
}

impl TurnError {
    /// Whether the user message reached the remote service before the failure.
    pub fn request_was_sent(&self) -> bool {
        matches!(self, TurnError::StreamRecv(_))
    }
}

/// A submission was not accepted by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("nothing to send")]
    Empty,

    #[error("{0} turn(s) already pending; try again shortly")]
    Busy(usize),

    #[error("shutting down")]
    Closed,
}
