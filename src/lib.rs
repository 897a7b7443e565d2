//! relay-chat - a terminal chat client for OpenAI-compatible endpoints.
//!
//! This library exposes the core modules for testing and reuse.

pub mod app;
pub mod config;
pub mod conversation;
pub mod error;
pub mod input;
pub mod lifecycle;
pub mod llm;
pub mod logging;
pub mod message;
pub mod transcript;
pub mod turn;
pub mod ui;
