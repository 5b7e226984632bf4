pub mod config;
pub mod diagnose;
pub mod scan;
pub mod sweep;
pub mod verify;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use meteofinder_core::pipeline::RunConfig;
use meteofinder_core::verify::{
    api_key_looks_valid, AnthropicClassifier, AnthropicSettings, MeteorClassifier,
};

/// Environment variable holding the verification API key.
pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Load a TOML run config, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    let Some(path) = path else {
        return Ok(RunConfig::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("Invalid config {}", path.display()))
}

/// The API key from the environment, if it looks usable.
pub fn api_key() -> Option<String> {
    std::env::var(API_KEY_VAR)
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| api_key_looks_valid(key))
}

pub fn anthropic_classifier(
    key: String,
    settings: &AnthropicSettings,
) -> Result<Arc<dyn MeteorClassifier>> {
    let classifier = AnthropicClassifier::new(key, settings.clone())
        .context("Failed to set up the verification client")?;
    Ok(Arc::new(classifier))
}
