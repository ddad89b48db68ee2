use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

/// One ticker endpoint, with the JSON field names to try per currency entry,
/// in priority order.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourceConfig {
    pub base_url: String,
    pub fields: Vec<String>,
}

fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            base_url: "https://api.bitcoinaverage.com/ticker/global/all".to_string(),
            fields: vec!["24h_avg".to_string(), "last".to_string()],
        },
        SourceConfig {
            base_url: "https://blockchain.info/ticker".to_string(),
            fields: vec!["15m".to_string()],
        },
    ]
}

fn default_currency() -> String {
    crate::core::resolve::DEFAULT_EXCHANGE_CURRENCY.to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Rate sources in fallback priority order.
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
    /// The user's preferred display currency code.
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            sources: default_sources(),
            currency: default_currency(),
            data_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "coinrates", "coinrates")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "coinrates", "coinrates")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
sources:
  - base_url: "http://example.com/ticker/all"
    fields: ["24h_avg", "last"]
  - base_url: "http://example.com/ticker"
    fields: ["15m"]
currency: "EUR"
data_path: "/tmp/coinrates"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].base_url, "http://example.com/ticker/all");
        assert_eq!(config.sources[0].fields, vec!["24h_avg", "last"]);
        assert_eq!(config.sources[1].fields, vec!["15m"]);
        assert_eq!(config.currency, "EUR");
        assert_eq!(config.data_path.as_deref(), Some("/tmp/coinrates"));
    }

    #[test]
    fn test_config_defaults() {
        let config: AppConfig = serde_yaml::from_str("data_path: null").unwrap();
        assert_eq!(config.sources.len(), 2);
        assert!(config.sources[0].base_url.contains("api.bitcoinaverage.com"));
        assert!(config.sources[1].base_url.contains("blockchain.info"));
        assert_eq!(config.currency, "USD");
        assert!(config.data_path.is_none());
    }
}
