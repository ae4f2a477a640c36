//! Extension pour la section `tunehub` de moonconfig
//!
//! L'URL et la clé se lisent dans la configuration, puis dans les variables
//! `TUNEHUB_BASE_URL` et `TUNEHUB_API_KEY`, puis prennent leur défaut.
//!
//! ```rust,ignore
//! use moonconfig::get_config;
//! use moontune::TuneHubConfigExt;
//!
//! let settings = get_config().get_tunehub_settings()?;
//! println!("TuneHub enabled: {}", settings.enabled);
//! ```

use crate::gateway::{DEFAULT_BASE_URL, DEFAULT_CACHE_TTL, TuneHubSettings};
use anyhow::Result;
use moonconfig::Config;
use serde_yaml::Value;
use std::env;
use std::time::Duration;

pub const ENV_BASE_URL: &str = "TUNEHUB_BASE_URL";
pub const ENV_API_KEY: &str = "TUNEHUB_API_KEY";

/// Trait d'extension pour la section `tunehub`
pub trait TuneHubConfigExt {
    fn get_tunehub_enabled(&self) -> Result<bool>;

    fn set_tunehub_enabled(&self, enabled: bool) -> Result<()>;

    /// Clé API, configuration puis environnement
    fn get_tunehub_api_key(&self) -> Option<String>;

    fn get_tunehub_settings(&self) -> Result<TuneHubSettings>;
}

fn from_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl TuneHubConfigExt for Config {
    fn get_tunehub_enabled(&self) -> Result<bool> {
        Ok(matches!(
            self.get_value(&["tunehub", "enabled"]),
            Ok(Value::Bool(true))
        ))
    }

    fn set_tunehub_enabled(&self, enabled: bool) -> Result<()> {
        self.set_value(&["tunehub", "enabled"], Value::Bool(enabled))
    }

    fn get_tunehub_api_key(&self) -> Option<String> {
        self.get_string(&["tunehub", "api_key"])
            .or_else(|| from_env(ENV_API_KEY))
    }

    fn get_tunehub_settings(&self) -> Result<TuneHubSettings> {
        let base_url = self
            .get_string(&["tunehub", "base_url"])
            .or_else(|| from_env(ENV_BASE_URL))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let cache_ttl = match self.get_value(&["tunehub", "cache_ttl_secs"]) {
            Ok(Value::Number(n)) => n.as_u64().map(Duration::from_secs),
            Ok(Value::String(s)) => s.trim().parse().ok().map(Duration::from_secs),
            _ => None,
        }
        .filter(|ttl| !ttl.is_zero())
        .unwrap_or(DEFAULT_CACHE_TTL);

        Ok(TuneHubSettings {
            enabled: self.get_tunehub_enabled()?,
            base_url,
            api_key: self.get_tunehub_api_key(),
            cache_ttl,
        })
    }
}
