//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Chatbot engine configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Fixed delay before a bot reply is appended (simulated typing).
    pub reply_delay: Duration,
    /// Capacity of the session event broadcast channel.
    pub broadcast_capacity: usize,
    /// Welcome message seeded once per session by `initialize()`.
    pub welcome_message: String,
    /// Shorter welcome re-seeded by `clear()`.
    pub clear_message: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            reply_delay: Duration::from_millis(500),
            broadcast_capacity: 256,
            welcome_message: "Hello! 👋 Welcome to our social media platform. I'm your \
                              assistant, here to help you navigate and get the most out of \
                              our features. What would you like to know?"
                .to_string(),
            clear_message: "Hello! 👋 How can I help you today?".to_string(),
        }
    }
}

/// Configuration for the Gemini content-generation collaborator.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key for the Generative Language API.
    pub api_key: SecretString,
    /// Model name. The default is tuned for free-tier quotas.
    pub model: String,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl GeminiConfig {
    /// Default model — cost-efficient and fine for short post copy.
    pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-lite";

    /// Create a config with default generation parameters.
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            model: Self::DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
        }
    }

    /// Read the config from `GEMINI_API_KEY` / `GEMINI_MODEL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;
        let mut config = Self::new(SecretString::from(api_key));
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            config.model = model;
        }
        Ok(config)
    }
}
