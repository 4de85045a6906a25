use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{GenerateOptions, TextGenerator};
use crate::config::GeneratorConfig;
use crate::error::TutorError;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Google Generative Language API client (blocking)
#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    pub name: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    http_client: reqwest::blocking::Client,
}

impl GeminiGenerator {
    pub fn new(api_key: String, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let model = model.into();
        let http_client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for Gemini")?;

        Ok(Self {
            name: format!("Gemini {}", model),
            api_key,
            model,
            temperature: 0.3,
            max_tokens: 2048,
            http_client,
        })
    }

    /// Build from configuration, falling back to `GEMINI_API_KEY`
    pub fn from_config(config: &GeneratorConfig) -> std::result::Result<Self, TutorError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                TutorError::Config(
                    "GEMINI_API_KEY not set; provide an API key or use the mock provider"
                        .to_string(),
                )
            })?;

        let mut generator = Self::new(
            api_key,
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
        .map_err(|e| TutorError::Config(format!("{:#}", e)))?;

        if let Some(t) = config.temperature {
            generator = generator.with_temperature(t);
        }
        if let Some(m) = config.max_tokens {
            generator = generator.with_max_tokens(m);
        }
        Ok(generator)
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            API_BASE, self.model, self.api_key
        )
    }

    fn build_request(&self, prompt: &str, options: &GenerateOptions) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: Some(GeminiGenerationConfig {
                temperature: options.temperature.unwrap_or(self.temperature),
                max_output_tokens: options.max_tokens.unwrap_or(self.max_tokens),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "generationConfig")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f64,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

impl GeminiResponse {
    fn first_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default()
    }
}

impl TextGenerator for GeminiGenerator {
    fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String> {
        let request = self.build_request(prompt, options);
        tracing::debug!("Gemini request: model={} prompt_len={}", self.model, prompt.len());

        let response = self
            .http_client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .context("Failed to send request to Gemini")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().unwrap_or_default();
            anyhow::bail!("Gemini API error ({}): {}", status, error_text);
        }

        let completion: GeminiResponse = response
            .json()
            .context("Failed to parse Gemini response")?;

        Ok(completion.first_text())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiGenerator {
        GeminiGenerator::new("test-key".to_string(), "gemini-pro", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_request_shape() {
        let request = client().build_request("hello", &GenerateOptions::default());
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 2048);
    }

    #[test]
    fn test_options_override_defaults() {
        let options = GenerateOptions {
            temperature: Some(0.9),
            max_tokens: Some(64),
        };
        let request = client().build_request("hi", &options);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 64);
        assert_eq!(json["generationConfig"]["temperature"], 0.9);
    }

    #[test]
    fn test_response_first_text() {
        let body = r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "answer"}, {"text": "ignored"}]}}]}"#;
        let response: GeminiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.first_text(), "answer");

        let empty: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.first_text(), "");
    }

    #[test]
    fn test_endpoint_includes_model() {
        let endpoint = client().endpoint();
        assert!(endpoint.contains("/gemini-pro:generateContent"));
        assert!(endpoint.ends_with("key=test-key"));
    }

    #[test]
    fn test_from_config_uses_explicit_key() {
        let config = GeneratorConfig {
            api_key: Some("explicit".to_string()),
            model: "gemini-1.5-flash".to_string(),
            max_tokens: Some(128),
            ..GeneratorConfig::default()
        };
        let generator = GeminiGenerator::from_config(&config).unwrap();
        assert_eq!(generator.name(), "Gemini gemini-1.5-flash");
        assert_eq!(generator.max_tokens, 128);
    }
}
