use crate::error::{Result, VelosubError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default playback speed multiplier applied before upload.
pub const DEFAULT_SPEED_FACTOR: f64 = 1.2;

/// Default number of concurrent transcription requests.
pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API key for the remote transcription service.
    pub api_key: Option<String>,
    /// Playback speed multiplier applied before upload (1.0 disables scaling).
    pub speed_factor: f64,
    /// Number of concurrent transcription requests.
    pub concurrency: usize,
    /// Override the transcription API base URL (mainly for testing).
    pub api_base_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            speed_factor: DEFAULT_SPEED_FACTOR,
            concurrency: DEFAULT_CONCURRENCY,
            api_base_url: None,
        }
    }
}

impl Config {
    /// Load configuration from the config file, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                config = toml::from_str(&contents).map_err(|e| {
                    VelosubError::Config(format!(
                        "Failed to parse {}: {e}",
                        config_path.display()
                    ))
                })?;
            }
        }

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.api_key = Some(key);
        }
        if let Ok(factor) = std::env::var("VELOSUB_SPEED_FACTOR") {
            if let Ok(f) = factor.parse() {
                config.speed_factor = f;
            }
        }
        if let Ok(concurrency) = std::env::var("VELOSUB_CONCURRENCY") {
            if let Ok(c) = concurrency.parse() {
                config.concurrency = c;
            }
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_none() {
            return Err(VelosubError::Config(
                "API key not set. Export it with: export OPENAI_API_KEY=sk-...".to_string(),
            ));
        }

        if self.speed_factor <= 0.0 {
            return Err(VelosubError::Config(format!(
                "Speed factor must be positive, got {}",
                self.speed_factor
            )));
        }

        if self.concurrency == 0 {
            return Err(VelosubError::Config(
                "Concurrency must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("velosub").join("config.toml"))
    }
}
