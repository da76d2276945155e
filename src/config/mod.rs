use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub lookup: LookupConfig,
    pub cache: CacheConfig,
}

/// Remote place-details endpoint settings.
///
/// The API key is deliberately configuration, not code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// File holding the compressed cache blob.
    pub slot_path: PathBuf,
    /// Age beyond which a record is evicted.
    pub ttl_secs: i64,
    /// How often the sweep-and-flush cycle runs.
    pub sweep_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lookup: LookupConfig {
                endpoint: "https://maps.googleapis.com/maps/api/place/details/json".to_string(),
                api_key: String::new(),
                timeout_secs: 30,
            },
            cache: CacheConfig {
                slot_path: PathBuf::from("./data/link-cache.blob"),
                ttl_secs: 6 * 3600,
                sweep_interval_secs: 60,
            },
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(&config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::create_dir_all("./data")?;
            std::fs::write(&config_file, contents)?;
            Ok(default_config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let config = Config::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.cache.ttl_secs, 6 * 3600);
        assert_eq!(parsed.cache.sweep_interval_secs, 60);
        assert_eq!(parsed.lookup.timeout_secs, 30);
    }

    #[test]
    fn durations_convert() {
        let config = Config::default();
        assert_eq!(config.cache.ttl(), chrono::Duration::hours(6));
        assert_eq!(
            config.cache.sweep_interval(),
            std::time::Duration::from_secs(60)
        );
    }
}
