use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cache settings
    pub cache: CacheConfig,

    /// Alternate caption gateway settings
    pub gateway: GatewayConfig,

    /// Outbound network settings
    pub network: NetworkConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether page/transcript caching is enabled
    pub enabled: bool,

    /// Maximum entry age in seconds before lazy expiry
    pub max_age_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Whether the alternate caption gateway is consulted at all
    pub enabled: bool,

    /// Base addresses tried in order until one succeeds
    pub base_urls: Vec<String>,

    /// Per-request timeout in seconds for gateway fetches
    pub timeout_secs: u64,

    /// Consult the gateway before the primary path instead of after it fails
    pub try_first: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Cookie header attached to every watch-page request
    pub cookie: Option<String>,

    /// Proxy address (http, https or socks5)
    pub proxy: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Override for the outgoing User-Agent header
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default output format
    pub default_format: String,

    /// Default language preference list
    pub default_languages: Vec<String>,

    /// Abort a batch on the first failure instead of attempting all items
    pub stop_on_error: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig {
                enabled: true,
                max_age_secs: 300,
            },
            gateway: GatewayConfig {
                enabled: false,
                base_urls: Vec::new(),
                timeout_secs: 10,
                try_first: false,
            },
            network: NetworkConfig {
                cookie: None,
                proxy: None,
                timeout_secs: 30,
                user_agent: None,
            },
            app: AppConfig {
                default_format: "json".to_string(),
                default_languages: vec!["en".to_string()],
                stop_on_error: false,
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config: Config = serde_yaml::from_str(&content)
                .context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("tubetext").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.gateway.enabled && self.gateway.base_urls.is_empty() {
            anyhow::bail!("Gateway is enabled but no base URLs are configured");
        }

        if self.cache.enabled && self.cache.max_age_secs == 0 {
            anyhow::bail!("Cache max age must be greater than zero when caching is enabled");
        }

        if self.network.timeout_secs == 0 {
            anyhow::bail!("Network timeout must be greater than zero");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Cache Enabled: {}", self.cache.enabled);
        println!("  Cache Max Age: {}s", self.cache.max_age_secs);
        println!("  Gateway Enabled: {}", self.gateway.enabled);
        if !self.gateway.base_urls.is_empty() {
            println!("  Gateway URLs: {}", self.gateway.base_urls.join(", "));
        }
        if let Some(proxy) = &self.network.proxy {
            println!("  Proxy: {}", proxy);
        }
        println!("  Request Timeout: {}s", self.network.timeout_secs);
        println!("  Default Format: {}", self.app.default_format);
        println!("  Default Languages: {}", self.app.default_languages.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_enabled_gateway_requires_urls() {
        let mut config = Config::default();
        config.gateway.enabled = true;
        assert!(config.validate().is_err());

        config.gateway.base_urls = vec!["https://mirror.example".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_cache_age_rejected() {
        let mut config = Config::default();
        config.cache.max_age_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_yaml_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let restored: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(restored.cache.max_age_secs, config.cache.max_age_secs);
        assert_eq!(restored.app.default_languages, config.app.default_languages);
    }
}
