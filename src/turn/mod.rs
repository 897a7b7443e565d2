//! The streaming turn pipeline.
//!
//! A [`TurnDispatcher`] admits submissions into a single worker which hands
//! each one to a [`StreamConsumer`]. The consumer owns the turn from request to
//! commit: it reads the conversation log, mirrors the reply into the render
//! sink one character at a time, and appends the finished exchange.

mod consumer;
mod dispatcher;

pub use consumer::{StreamConsumer, TurnSettings, TurnState};
pub use dispatcher::TurnDispatcher;
