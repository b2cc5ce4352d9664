//! Configuration types for the relay.
//!
//! `RelayConfig` represents the top-level `relay.toml`. Every field has a
//! default, so an empty file (or no file at all) yields a working
//! configuration. Secrets are never part of this file; they come from the
//! environment.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Persona prompt seeded as the first turn of every conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly male psychiatrist named \"หมอแสนดี\" who evaluates patients for depression using PHQ-9 criteria. The patient should not be aware of the evaluation. Provide results when the patient says, 'I want the test results.' Then recommend care methods based on the depression level. Respond in Thai. Embed questions subtly into the conversation. Handle various input types (text, images, audio, video, stickers) appropriately. Keep responses within token limits.";

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub conversation: ConversationConfig,

    #[serde(default)]
    pub line: LineConfig,
}

impl RelayConfig {
    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.completion;
        if !(0.0..=2.0).contains(&c.temperature) {
            return Err(ConfigError::Invalid(format!(
                "completion.temperature must be within [0, 2], got {}",
                c.temperature
            )));
        }
        if !(0.0..=1.0).contains(&c.top_p) {
            return Err(ConfigError::Invalid(format!(
                "completion.top_p must be within [0, 1], got {}",
                c.top_p
            )));
        }
        for (name, value) in [
            ("frequency_penalty", c.frequency_penalty),
            ("presence_penalty", c.presence_penalty),
        ] {
            if !(-2.0..=2.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "completion.{name} must be within [-2, 2], got {value}"
                )));
            }
        }
        if c.max_tokens == 0 {
            return Err(ConfigError::Invalid(
                "completion.max_tokens must be greater than zero".to_string(),
            ));
        }
        if c.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "completion.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "completion.model must not be empty".to_string(),
            ));
        }
        if !self.server.webhook_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "server.webhook_path must start with '/', got '{}'",
                self.server.webhook_path
            )));
        }
        if self.server.webhook_path == "/health" {
            return Err(ConfigError::Invalid(
                "server.webhook_path collides with the health route".to_string(),
            ));
        }
        if self.conversation.max_history_turns == Some(0) {
            return Err(ConfigError::Invalid(
                "conversation.max_history_turns must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Route the messaging platform posts webhook deliveries to.
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,

    /// Seconds to wait for in-flight requests after a shutdown signal.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    6789
}

fn default_webhook_path() -> String {
    "/callback".to_string()
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            webhook_path: default_webhook_path(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

/// Completion engine endpoint and fixed generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub top_p: f64,

    #[serde(default)]
    pub frequency_penalty: f64,

    #[serde(default)]
    pub presence_penalty: f64,

    /// Upper bound on a single completion call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    250
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: 0.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Conversation seeding and bounding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Keep at most this many turns after the system seed. Unbounded when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_history_turns: Option<usize>,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            max_history_turns: None,
        }
    }
}

/// Messaging platform API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineConfig {
    #[serde(default = "default_line_api_base")]
    pub api_base: String,

    /// Host serving message content (images, video, audio).
    #[serde(default = "default_line_data_api_base")]
    pub data_api_base: String,
}

fn default_line_api_base() -> String {
    "https://api.line.me".to_string()
}

fn default_line_data_api_base() -> String {
    "https://api-data.line.me".to_string()
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            api_base: default_line_api_base(),
            data_api_base: default_line_data_api_base(),
        }
    }
}
