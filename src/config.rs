use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::llm::{LlmConfig, DEFAULT_API_BASE, DEFAULT_MODEL};

/// RGB color represented as a 3-element array.
pub type Rgb = [u8; 3];

/// Directory name used under the platform config and cache directories.
pub const APP_DIR: &str = "relay-chat";

/// LLM configuration for API access.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfigFile {
    /// API base URL (can also be set via OPENAI_BASE_URL env var)
    pub api_base: String,
    /// API key (can also be set via OPENAI_API_KEY env var)
    pub api_key: Option<String>,
    /// Model name (can also be set via MODEL env var)
    pub model: String,
    /// Temperature for generation
    pub temperature: Option<f32>,
    /// Max tokens for generation
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfigFile {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Color configuration for the UI.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Chat area gradient start color (Purple by default)
    pub chat_gradient_start: Rgb,
    /// Chat area gradient end color (Blue by default)
    pub chat_gradient_end: Rgb,
    /// Input area gradient start color (Green by default)
    pub input_gradient_start: Rgb,
    /// Input area gradient end color (Cyan by default)
    pub input_gradient_end: Rgb,
    /// User text
    pub user_text: Rgb,
    /// Assistant text
    pub assistant_text: Rgb,
    /// Failed and cancelled turn notices
    pub error_text: Rgb,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            chat_gradient_start: [147, 51, 234],  // Purple
            chat_gradient_end: [59, 130, 246],    // Blue
            input_gradient_start: [16, 185, 129], // Green
            input_gradient_end: [6, 182, 212],    // Cyan
            user_text: [0, 255, 255],             // Cyan
            assistant_text: [100, 255, 100],      // Green
            error_text: [255, 100, 100],          // Red
        }
    }
}

/// Behavior configuration for the UI and the turn pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Number of lines to scroll with Page Up/Down
    pub scroll_page_size: usize,
    /// Frame duration while a reply is streaming, in milliseconds
    pub animation_frame_ms: u64,
    /// Idle polling interval in milliseconds
    pub idle_poll_ms: u64,
    /// Pause after each rendered reply character, in milliseconds (0 disables)
    pub char_delay_ms: u64,
    /// Turns that may wait behind the running one
    pub max_queued_turns: usize,
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: Option<u64>,
    /// Fail a turn when no fragment arrives for this many seconds
    pub stream_idle_timeout_secs: Option<u64>,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            scroll_page_size: 10,
            animation_frame_ms: 16, // ~60 FPS
            idle_poll_ms: 100,
            char_delay_ms: 0,
            max_queued_turns: 4,
            connect_timeout_secs: Some(10),
            stream_idle_timeout_secs: None,
        }
    }
}

impl BehaviorConfig {
    pub fn char_delay(&self) -> Option<Duration> {
        (self.char_delay_ms > 0).then(|| Duration::from_millis(self.char_delay_ms))
    }

    pub fn stream_idle_timeout(&self) -> Option<Duration> {
        self.stream_idle_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    pub colors: ColorConfig,
    pub behavior: BehaviorConfig,
    pub llm: LlmConfigFile,
}

impl Config {
    /// Returns the default config file path: ~/.config/relay-chat/config.toml
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_DIR).join("config.toml"))
    }

    /// Load configuration from the default path, falling back to defaults.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from_path(&path).unwrap_or_else(|e| {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "ignoring unreadable config file"
                );
                Self::default()
            }),
            _ => Self::default(),
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Resolve the client settings, letting environment variables override the file.
    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            connect_timeout: self.behavior.connect_timeout(),
            ..LlmConfig::from_env_and_config(Some(&self.llm))
        }
    }
}

impl ColorConfig {
    /// Convert an RGB array to a tuple for compatibility with existing code.
    pub fn to_tuple(rgb: &Rgb) -> (u8, u8, u8) {
        (rgb[0], rgb[1], rgb[2])
    }

    /// Convert an RGB array to a ratatui Color.
    pub fn to_color(rgb: &Rgb) -> ratatui::style::Color {
        ratatui::style::Color::Rgb(rgb[0], rgb[1], rgb[2])
    }

    /// Get chat gradient colors as tuples.
    pub fn chat_gradient(&self) -> ((u8, u8, u8), (u8, u8, u8)) {
        (
            Self::to_tuple(&self.chat_gradient_start),
            Self::to_tuple(&self.chat_gradient_end),
        )
    }

    /// Get input gradient colors as tuples.
    pub fn input_gradient(&self) -> ((u8, u8, u8), (u8, u8, u8)) {
        (
            Self::to_tuple(&self.input_gradient_start),
            Self::to_tuple(&self.input_gradient_end),
        )
    }
}
