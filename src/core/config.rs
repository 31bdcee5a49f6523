use crate::core::currency::Currency;
use anyhow::{Context, Result};
use chrono::Duration;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_KEY_PRICE: f64 = 2.49;

pub const DEFAULT_CASES: [&str; 15] = [
    "Kilowatt Case",
    "Revolution Case",
    "Spectrum Case",
    "Danger Zone Case",
    "Prisma 2 Case",
    "Prisma Case",
    "Chroma 3 Case",
    "Chroma 2 Case",
    "Chroma Case",
    "Falchion Case",
    "Horizon Case",
    "Gamma 2 Case",
    "Gamma Case",
    "Glove Case",
    "Operation Hydra Case",
];

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SteamProviderConfig {
    #[serde(default = "SteamProviderConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "SteamProviderConfig::default_app_id")]
    pub app_id: u32,
    #[serde(default = "SteamProviderConfig::default_currency_code")]
    pub currency_code: u32,
}

impl SteamProviderConfig {
    fn default_base_url() -> String {
        "https://steamcommunity.com".to_string()
    }

    fn default_app_id() -> u32 {
        730
    }

    fn default_currency_code() -> u32 {
        1
    }
}

impl Default for SteamProviderConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            app_id: Self::default_app_id(),
            currency_code: Self::default_currency_code(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FrankfurterProviderConfig {
    pub base_url: String,
}

impl Default for FrankfurterProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.frankfurter.app".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub steam: SteamProviderConfig,
    #[serde(default)]
    pub frankfurter: FrankfurterProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "CacheConfig::default_product_ttl")]
    pub product_ttl_minutes: i64,
    #[serde(default = "CacheConfig::default_exchange_ttl")]
    pub exchange_ttl_minutes: i64,
}

impl CacheConfig {
    fn default_product_ttl() -> i64 {
        60
    }

    fn default_exchange_ttl() -> i64 {
        120
    }

    pub fn product_ttl(&self) -> Duration {
        Duration::minutes(self.product_ttl_minutes)
    }

    pub fn exchange_ttl(&self) -> Duration {
        Duration::minutes(self.exchange_ttl_minutes)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            product_ttl_minutes: Self::default_product_ttl(),
            exchange_ttl_minutes: Self::default_exchange_ttl(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default = "AppConfig::default_base_currency")]
    pub base_currency: Currency,
    #[serde(default = "AppConfig::default_key_price")]
    pub key_price: f64,
    #[serde(default = "AppConfig::default_cases")]
    pub cases: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            providers: ProvidersConfig::default(),
            cache: CacheConfig::default(),
            base_currency: Self::default_base_currency(),
            key_price: Self::default_key_price(),
            cases: Self::default_cases(),
        }
    }
}

impl AppConfig {
    fn default_base_currency() -> Currency {
        Currency::Usd
    }

    fn default_key_price() -> f64 {
        DEFAULT_KEY_PRICE
    }

    fn default_cases() -> Vec<String> {
        DEFAULT_CASES.iter().map(|c| c.to_string()).collect()
    }

    /// Loads the default config file, falling back to built-in defaults when
    /// it does not exist yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "caseprice", "caseprice")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
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
