//! UI module for relay-chat.
//!
//! This module contains all UI rendering logic including:
//! - Main UI layout and rendering
//! - Transcript styling
//! - Gradient utilities
//! - Text wrapping

mod gradient;
mod render;
pub mod text;

pub use render::{transcript_lines, ui};
