//! Text generation providers
//!
//! The builder and runtime only see the [`TextGenerator`] trait. Concrete
//! providers are picked once, at construction, from [`GeneratorConfig`].

pub mod gemini;
pub mod mock;

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::{GeneratorConfig, ProviderKind};
use crate::error::TutorError;

pub use gemini::GeminiGenerator;
pub use mock::MockGenerator;

/// Per-call generation knobs; `None` means provider default
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

/// Prompt in, text out
pub trait TextGenerator: Send + Sync {
    /// Generate text for `prompt`. Implementations own their timeouts.
    fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String>;

    /// Human-readable provider name for logs
    fn name(&self) -> &str;
}

/// Build the configured provider
pub fn create_generator(
    config: &GeneratorConfig,
) -> std::result::Result<Arc<dyn TextGenerator>, TutorError> {
    match config.provider {
        ProviderKind::Mock => Ok(Arc::new(MockGenerator::new())),
        ProviderKind::Gemini => Ok(Arc::new(GeminiGenerator::from_config(config)?)),
    }
}
