use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::{info, warn};

/// Application settings, loaded from a YAML file. Every field has a default
/// so a missing or partial file still yields a runnable configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: Paths,
    pub llm: LlmSettings,
    pub image_generation: ImageSettings,
    pub captions: CaptionSettings,
    pub upload: UploadSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub temp: String,
    pub music: String,
    pub output: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Providers tried in order until one returns a usable result.
    pub provider_order: Vec<String>,
    pub gemini_model: String,
    pub groq_model: String,
    pub groq_base_url: String,
    pub huggingface_model: String,
    pub huggingface_base_url: String,
    pub ollama_model: String,
    pub ollama_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptionSettings {
    /// Narration longer than this switches to multi-cue segmentation.
    pub long_form_threshold_s: f64,
    /// Extra words rendered with emphasis styling.
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    pub privacy_status: String,
    pub description_template: String,
    pub drive_folder: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            paths: Paths::default(),
            llm: LlmSettings::default(),
            image_generation: ImageSettings::default(),
            captions: CaptionSettings::default(),
            upload: UploadSettings::default(),
        }
    }
}

impl Default for Paths {
    fn default() -> Self {
        Paths {
            temp: "assets/temp".to_string(),
            music: "assets/music".to_string(),
            output: "assets/output".to_string(),
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        LlmSettings {
            provider_order: vec![
                "gemini".to_string(),
                "groq".to_string(),
                "huggingface".to_string(),
                "ollama".to_string(),
            ],
            gemini_model: "gemini-2.0-flash".to_string(),
            groq_model: "llama3-8b-8192".to_string(),
            groq_base_url: "https://api.groq.com/openai/v1".to_string(),
            huggingface_model: "mistralai/Mistral-7B-Instruct-v0.2".to_string(),
            huggingface_base_url: "https://api-inference.huggingface.co/models".to_string(),
            ollama_model: "phi3".to_string(),
            ollama_base_url: "http://localhost:11434".to_string(),
        }
    }
}

impl Default for ImageSettings {
    fn default() -> Self {
        ImageSettings { width: 768, height: 1024 }
    }
}

impl Default for CaptionSettings {
    fn default() -> Self {
        CaptionSettings { long_form_threshold_s: 60.0, keywords: Vec::new() }
    }
}

impl Default for UploadSettings {
    fn default() -> Self {
        UploadSettings {
            privacy_status: "private".to_string(),
            description_template: "{quote}\n\n#motivation #shorts".to_string(),
            drive_folder: "ShortsAutomation_Uploads".to_string(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Settings> {
        if !Path::new(path).exists() {
            warn!("Settings file {} not found; using defaults", path);
            return Ok(Settings::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {path}"))?;
        let settings: Settings =
            serde_yaml::from_str(&raw).with_context(|| format!("Invalid settings in {path}"))?;
        info!("Loaded settings from {}", path);
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let s = Settings::default();
        assert_eq!(s.paths.temp, "assets/temp");
        assert_eq!(s.llm.provider_order.len(), 4);
        assert_eq!(s.captions.long_form_threshold_s, 60.0);
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let yaml = "paths:\n  output: out\ncaptions:\n  long_form_threshold_s: 45\n";
        let s: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(s.paths.output, "out");
        // Unset sibling fields fall back to defaults.
        assert_eq!(s.paths.temp, "assets/temp");
        assert_eq!(s.captions.long_form_threshold_s, 45.0);
        assert_eq!(s.upload.privacy_status, "private");
    }

    #[test]
    fn missing_file_uses_defaults() {
        let s = Settings::load("definitely/not/here.yaml").unwrap();
        assert_eq!(s.llm.ollama_model, "phi3");
    }
}
