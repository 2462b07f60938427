//! Reasoning service implementations for prdigest.
//!
//! Every provider implements `prdigest_core::Provider`; [`build_provider`]
//! picks one from the `[model]` config section.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use prdigest_config::AppConfig;
use prdigest_core::provider::Provider;
use std::sync::Arc;

/// Build the provider named in `[model]`.
///
/// All supported services speak the OpenAI chat completions dialect, so the
/// name only selects the default base URL; `model.api_url` overrides it.
pub fn build_provider(config: &AppConfig) -> Arc<dyn Provider> {
    let model = &config.model;
    let base_url = model
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(&model.provider));
    let api_key = model.api_key.clone().unwrap_or_default();

    Arc::new(OpenAiCompatProvider::new(&model.provider, base_url, api_key))
}

/// Default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "github" => "https://models.github.ai/inference".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
