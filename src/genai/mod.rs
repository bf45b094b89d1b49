//! Generative-content collaborator — Gemini-backed post assistance.
//!
//! Both operations are single request/response calls with no retry policy.
//! Failures never escape this boundary: `generate_suggestion` falls back to
//! an error-labeled suggestion and `enhance_content` returns the original
//! text unmodified.

use async_trait::async_trait;
use regex::Regex;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::GeminiConfig;
use crate::error::GenAiError;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Enhanced content is capped at this many characters.
const ENHANCE_CHAR_LIMIT: usize = 250;

/// Suggestion content salvaged from a malformed reply is capped at this.
const SUGGESTION_CHAR_LIMIT: usize = 200;

/// A generated post idea.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSuggestion {
    pub title: String,
    pub content: String,
}

impl ContentSuggestion {
    /// Fixed fallback returned when generation fails.
    pub fn error_fallback() -> Self {
        Self {
            title: "Error Generating Content".to_string(),
            content: "There was an error generating content. Please try again later."
                .to_string(),
        }
    }
}

/// Content-generation collaborator contract. The server depends on this
/// trait so tests can substitute a stub.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generate a post suggestion for a topic. Total — never fails.
    async fn generate_suggestion(&self, topic: &str) -> ContentSuggestion;

    /// Rewrite content to be more engaging. Total — returns the input
    /// unmodified on failure.
    async fn enhance_content(&self, content: &str) -> String;
}

/// Gemini REST client.
pub struct GeminiClient {
    config: GeminiConfig,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        info!(model = %config.model, "Using Gemini for content assistance");
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// One generateContent round-trip, returning the first candidate's text.
    async fn generate_text(&self, prompt: &str) -> Result<String, GenAiError> {
        let endpoint = format!("{API_BASE}/{}:generateContent", self.config.model);

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.config.temperature,
                "topK": self.config.top_k,
                "topP": self.config.top_p,
                "maxOutputTokens": self.config.max_output_tokens,
            },
            "safetySettings": safety_settings(),
        });

        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", self.config.api_key.expose_secret())])
            .json(&body)
            .send()
            .await
            .map_err(|e| GenAiError::RequestFailed {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenAiError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            GenAiError::RequestFailed {
                endpoint,
                reason: e.to_string(),
            }
        })?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GenAiError::EmptyResponse {
                reason: "no candidate text".to_string(),
            })
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate_suggestion(&self, topic: &str) -> ContentSuggestion {
        match self.generate_text(&suggestion_prompt(topic)).await {
            Ok(text) => parse_suggestion(&text),
            Err(e) => {
                warn!(error = %e, "Content generation failed, returning fallback");
                ContentSuggestion::error_fallback()
            }
        }
    }

    async fn enhance_content(&self, content: &str) -> String {
        match self.generate_text(&enhance_prompt(content)).await {
            Ok(text) => truncate_chars(&text, ENHANCE_CHAR_LIMIT),
            Err(e) => {
                warn!(error = %e, "Content enhancement failed, returning original");
                content.to_string()
            }
        }
    }
}

// ── Prompts ─────────────────────────────────────────────────────────

fn suggestion_prompt(topic: &str) -> String {
    format!(
        r#"Task: Create an engaging social media post about "{topic}"

Requirements:
1. Create a catchy title (maximum 50 characters)
2. Write creative and engaging content (maximum 200 characters)
3. Structure your response in JSON format as follows:
{{
  "title": "Your catchy title here",
  "content": "Your engaging content here"
}}

Ensure the JSON is properly formatted and contains only these two fields."#
    )
}

fn enhance_prompt(content: &str) -> String {
    format!(
        r#"Task: Enhance the following social media post to make it more engaging and impactful.

Original Post: "{content}"

Requirements:
1. Keep the same general topic and core message
2. Make it more captivating, creative, and shareable
3. Add compelling language that encourages engagement
4. Keep the enhanced content under 250 characters
5. Do not use hashtags or emojis unless they were in the original
6. Return only the enhanced text with no additional formatting or explanation"#
    )
}

// ── Response parsing ────────────────────────────────────────────────

/// Parse the model's reply into a suggestion: strict JSON first, then a
/// regex salvage of the title/content fields, then a truncation fallback.
fn parse_suggestion(text: &str) -> ContentSuggestion {
    #[derive(Deserialize)]
    struct RawSuggestion {
        title: Option<String>,
        content: Option<String>,
    }

    if let Ok(raw) = serde_json::from_str::<RawSuggestion>(text) {
        return ContentSuggestion {
            title: raw.title.unwrap_or_else(|| "Generated Title".to_string()),
            content: raw.content.unwrap_or_else(|| "Generated Content".to_string()),
        };
    }

    let title_re = Regex::new(r#"(?i)title["']?\s*:\s*["'](.+?)["']"#).expect("valid regex");
    let content_re = Regex::new(r#"(?i)content["']?\s*:\s*["'](.+?)["']"#).expect("valid regex");

    let title = title_re
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "Generated Title".to_string());
    let content = content_re
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| truncate_chars(text, SUGGESTION_CHAR_LIMIT));

    ContentSuggestion { title, content }
}

/// Truncate on a character boundary.
fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

fn safety_settings() -> serde_json::Value {
    const CATEGORIES: [&str; 4] = [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ];
    serde_json::Value::Array(
        CATEGORIES
            .iter()
            .map(|category| {
                serde_json::json!({
                    "category": category,
                    "threshold": "BLOCK_MEDIUM_AND_ABOVE",
                })
            })
            .collect(),
    )
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}
