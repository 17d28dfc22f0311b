use std::time::Duration;

use serde_json::{Value, json};
use tracing::{info, warn};

use crate::config::LlmSettings;
use crate::errors::ProviderError;

/// Closed set of text-generation backends. Each variant is a thin HTTP call
/// with its own request and response shape; the router tries them in the
/// configured priority order.
#[derive(Debug, Clone)]
pub enum Provider {
    Gemini { api_key: Option<String>, model: String },
    Groq { api_key: Option<String>, base_url: String, model: String },
    HuggingFace { api_key: Option<String>, base_url: String, model: String },
    Ollama { base_url: String, model: String },
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini { .. } => "gemini",
            Provider::Groq { .. } => "groq",
            Provider::HuggingFace { .. } => "huggingface",
            Provider::Ollama { .. } => "ollama",
        }
    }

    pub async fn generate(
        &self,
        client: &reqwest::Client,
        prompt: &str,
    ) -> Result<String, ProviderError> {
        match self {
            Provider::Gemini { api_key, model } => {
                let key = api_key.as_deref().ok_or(ProviderError::MissingApiKey("gemini"))?;
                let url = format!(
                    "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent?key={key}"
                );
                let body = json!({
                    "contents": [{ "parts": [{ "text": prompt }] }],
                    "generationConfig": { "temperature": 0.7, "maxOutputTokens": 512 }
                });
                let value = post_json(client, &url, None, &body, 20).await?;
                extract_gemini(&value)
                    .ok_or_else(|| ProviderError::Parse("no candidate text".to_string()))
            }
            Provider::Groq { api_key, base_url, model } => {
                let key = api_key.as_deref().ok_or(ProviderError::MissingApiKey("groq"))?;
                let url = format!("{base_url}/chat/completions");
                let body = json!({
                    "model": model,
                    "messages": [{ "role": "user", "content": prompt }],
                    "temperature": 0.7,
                    "max_tokens": 512
                });
                let value = post_json(client, &url, Some(key), &body, 10).await?;
                extract_openai_chat(&value)
                    .ok_or_else(|| ProviderError::Parse("no chat choices".to_string()))
            }
            Provider::HuggingFace { api_key, base_url, model } => {
                let key = api_key.as_deref().ok_or(ProviderError::MissingApiKey("huggingface"))?;
                let url = format!("{base_url}/{model}");
                // HF instruct models expect the prompt wrapped as an instruction.
                let body = json!({
                    "inputs": format!("[INST] {prompt} [/INST]"),
                    "parameters": {
                        "max_new_tokens": 512,
                        "return_full_text": false,
                        "temperature": 0.7
                    }
                });
                let value = post_json(client, &url, Some(key), &body, 20).await?;
                extract_huggingface(&value)
                    .ok_or_else(|| ProviderError::Parse("no generated_text".to_string()))
            }
            Provider::Ollama { base_url, model } => {
                let url = format!("{base_url}/api/generate");
                let body = json!({
                    "model": model,
                    "prompt": prompt,
                    "stream": false,
                    "options": { "temperature": 1.0 }
                });
                let value = post_json(client, &url, None, &body, 120).await?;
                extract_ollama(&value)
                    .ok_or_else(|| ProviderError::Parse("no response field".to_string()))
            }
        }
    }
}

async fn post_json(
    client: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
    body: &Value,
    timeout_s: u64,
) -> Result<Value, ProviderError> {
    let mut req = client
        .post(url)
        .json(body)
        .timeout(Duration::from_secs(timeout_s));
    if let Some(token) = bearer {
        req = req.bearer_auth(token);
    }
    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ProviderError::Api { status: status.as_u16(), body });
    }
    Ok(resp.json().await?)
}

fn extract_gemini(value: &Value) -> Option<String> {
    let text = value
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()?;
    Some(text.trim().to_string())
}

fn extract_openai_chat(value: &Value) -> Option<String> {
    let text = value
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()?;
    Some(text.trim().to_string())
}

fn extract_huggingface(value: &Value) -> Option<String> {
    let text = value.get(0)?.get("generated_text")?.as_str()?;
    Some(text.trim().to_string())
}

fn extract_ollama(value: &Value) -> Option<String> {
    Some(value.get("response")?.as_str()?.trim().to_string())
}

/// Tries providers in the configured order until one returns a usable
/// result. Failures are logged and skipped; all retry policy lives here,
/// never in the caption core.
pub struct LlmRouter {
    providers: Vec<Provider>,
    client: reqwest::Client,
}

impl LlmRouter {
    pub fn from_settings(settings: &LlmSettings, client: reqwest::Client) -> Self {
        let providers = build_providers(settings);
        LlmRouter { providers, client }
    }

    pub async fn generate_with_fallback(&self, prompt: &str) -> anyhow::Result<(String, &'static str)> {
        for provider in &self.providers {
            info!("Attempting generation with provider: {}", provider.name());
            match provider.generate(&self.client, prompt).await {
                Ok(text) if text.trim().len() > 5 => return Ok((text, provider.name())),
                Ok(_) => warn!("Provider {} returned an empty or too-short result", provider.name()),
                Err(e) => warn!("Provider {} failed: {}", provider.name(), e),
            }
        }
        anyhow::bail!("All LLM providers failed to produce text")
    }
}

/// Expand the configured provider order into concrete providers, pulling
/// API keys from the environment. Unknown names are skipped with a warning.
fn build_providers(settings: &LlmSettings) -> Vec<Provider> {
    let mut providers = Vec::new();
    for name in &settings.provider_order {
        match name.as_str() {
            "gemini" => providers.push(Provider::Gemini {
                api_key: std::env::var("GEMINI_API_KEY").ok(),
                model: settings.gemini_model.clone(),
            }),
            "groq" => providers.push(Provider::Groq {
                api_key: std::env::var("GROQ_API_KEY").ok(),
                base_url: settings.groq_base_url.clone(),
                model: settings.groq_model.clone(),
            }),
            "huggingface" => providers.push(Provider::HuggingFace {
                api_key: std::env::var("HUGGINGFACE_API_KEY").ok(),
                base_url: settings.huggingface_base_url.clone(),
                model: settings.huggingface_model.clone(),
            }),
            "ollama" => providers.push(Provider::Ollama {
                base_url: settings.ollama_base_url.clone(),
                model: settings.ollama_model.clone(),
            }),
            other => warn!("Unknown LLM provider '{}' in provider_order; skipping", other),
        }
    }
    providers
}
