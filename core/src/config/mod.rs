use crate::agent::context::DEFAULT_SYSTEM_PROMPT;
use crate::agent::history::DEFAULT_MAX_TURNS;
use crate::agent::loop_::DEFAULT_MAX_STEPS;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "sandbot.toml";
pub const DEFAULT_SANDBOX_DIR: &str = "sandbox";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: f64,
    pub sandbox_dir: PathBuf,
    pub max_steps: usize,
    pub max_turns: usize,
    pub system_prompt: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: None,
            api_key: String::new(),
            base_url: None,
            model: None,
            temperature: 1.0,
            sandbox_dir: PathBuf::from(DEFAULT_SANDBOX_DIR),
            max_steps: DEFAULT_MAX_STEPS,
            max_turns: DEFAULT_MAX_TURNS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

pub fn get_config_path() -> PathBuf {
    PathBuf::from(CONFIG_FILE)
}

pub fn config_exists() -> bool {
    get_config_path().exists()
}

impl Config {
    /// Loads `path` if given, else `./sandbot.toml` if present, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => load_config(path),
            None if config_exists() => load_config(&get_config_path()),
            None => Ok(Config::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            bail!("max_steps must be at least 1");
        }
        if self.max_turns == 0 {
            bail!("max_turns must be at least 1");
        }
        if self.sandbox_dir.as_os_str().is_empty() {
            bail!("sandbox_dir must not be empty");
        }
        Ok(())
    }
}

pub fn load_config(config_path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(config_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            anyhow::anyhow!(
                "Config file {} not found. Run 'sandbot init' to create one.",
                config_path.display()
            )
        } else {
            anyhow::anyhow!("Failed to read config from {}: {}", config_path.display(), e)
        }
    })?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config in {}", config_path.display()))?;

    Ok(config)
}

pub fn save_config(config: &Config, config_path: &Path) -> Result<()> {
    if let Some(parent) = config_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config to TOML")?;

    std::fs::write(config_path, content)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    Ok(())
}
