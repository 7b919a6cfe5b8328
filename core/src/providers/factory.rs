use crate::config::Config;
use crate::providers::OpenAIProvider;
use crate::traits::Provider;
use anyhow::{Result, anyhow};
use std::sync::Arc;

/// Connection defaults for a known OpenAI-compatible service.
#[derive(Debug, Clone, Copy)]
pub struct ProviderPreset {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub base_url: &'static str,
    pub default_model: &'static str,
    pub env_vars: &'static [&'static str],
}

pub const PRESETS: &[ProviderPreset] = &[
    ProviderPreset {
        name: "openai",
        aliases: &[],
        base_url: "https://api.openai.com/v1",
        default_model: "gpt-4o",
        env_vars: &["OPENAI_API_KEY", "SANDBOT_API_KEY"],
    },
    ProviderPreset {
        name: "deepseek",
        aliases: &[],
        base_url: "https://api.deepseek.com/v1",
        default_model: "deepseek-chat",
        env_vars: &["DEEPSEEK_API_KEY", "SANDBOT_API_KEY"],
    },
    ProviderPreset {
        name: "bailian",
        aliases: &["qwen", "dashscope"],
        base_url: "https://dashscope.aliyuncs.com/compatible-mode/v1",
        default_model: "qwen-turbo",
        env_vars: &["DASHSCOPE_API_KEY", "BAILIAN_API_KEY", "SANDBOT_API_KEY"],
    },
];

pub fn find_preset(name: &str) -> Option<&'static ProviderPreset> {
    let name = name.to_lowercase();
    PRESETS
        .iter()
        .find(|p| p.name == name || p.aliases.contains(&name.as_str()))
}

pub fn create_provider(config: &Config) -> Result<Arc<dyn Provider>> {
    let provider_name = config.provider.as_deref().unwrap_or("openai");
    let preset = find_preset(provider_name).ok_or_else(|| {
        let available: Vec<_> = PRESETS.iter().map(|p| p.name).collect();
        anyhow!(
            "Unknown provider: {}. Available: {}",
            provider_name,
            available.join(", ")
        )
    })?;

    let api_key = resolve_api_key_with_fallback(preset.env_vars, &config.api_key)
        .map_err(|_| {
            anyhow!(
                "No API key found for {}. Set {} or api_key in the config file.",
                preset.name,
                preset.env_vars[0]
            )
        })?;

    let provider = OpenAIProvider::new(api_key)
        .with_name(preset.name)
        .with_model(config.model.as_deref().unwrap_or(preset.default_model))
        .with_base_url(config.base_url.as_deref().unwrap_or(preset.base_url))
        .with_temperature(config.temperature);

    tracing::info!(
        provider = preset.name,
        model = provider.model(),
        base_url = provider.base_url(),
        "backend configured"
    );
    Ok(Arc::new(provider))
}

fn resolve_api_key_with_fallback(env_vars: &[&str], config_key: &str) -> Result<String> {
    for var_name in env_vars {
        if let Ok(key) = resolve_api_key_from_env(var_name) {
            return Ok(key);
        }
    }
    if !config_key.is_empty() {
        Ok(config_key.to_string())
    } else {
        Err(anyhow!("No API key found"))
    }
}

fn resolve_api_key_from_env(var_name: &str) -> Result<String> {
    std::env::var(var_name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("Environment variable {} not set", var_name))
}
