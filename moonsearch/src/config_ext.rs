//! Extension pour lire les réglages de recherche dans moonconfig
//!
//! ```rust,ignore
//! use moonconfig::get_config;
//! use moonsearch::SearchConfigExt;
//!
//! let settings = get_config().get_search_settings()?;
//! println!("Per-source budget: {:?}", settings.source_timeout);
//! ```

use crate::filter::ContentFilter;
use anyhow::Result;
use moonconfig::Config;
use serde_yaml::{Number, Value};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Réglages lus à chaque requête
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub source_timeout: Duration,
    /// Durée de cache CDN des réponses, en secondes
    pub cache_time: usize,
    /// `None` quand le filtre est désactivé
    pub filter: Option<ContentFilter>,
}

/// Trait d'extension pour les sections `search` et `site`
pub trait SearchConfigExt {
    /// Budget de temps d'une source (`search.timeout_secs`)
    fn get_search_timeout(&self) -> Result<Duration>;

    fn set_search_timeout(&self, timeout: Duration) -> Result<()>;

    /// Filtre de contenu, ou `None` si `site.disable_yellow_filter` est vrai
    fn get_content_filter(&self) -> Result<Option<ContentFilter>>;

    fn get_search_settings(&self) -> Result<SearchSettings>;
}

impl SearchConfigExt for Config {
    fn get_search_timeout(&self) -> Result<Duration> {
        let secs = match self.get_value(&["search", "timeout_secs"]) {
            Ok(Value::Number(n)) => n.as_u64().unwrap_or(DEFAULT_TIMEOUT_SECS),
            Ok(Value::String(s)) => s.trim().parse().unwrap_or(DEFAULT_TIMEOUT_SECS),
            _ => DEFAULT_TIMEOUT_SECS,
        };
        Ok(Duration::from_secs(secs.max(1)))
    }

    fn set_search_timeout(&self, timeout: Duration) -> Result<()> {
        self.set_value(
            &["search", "timeout_secs"],
            Value::Number(Number::from(timeout.as_secs())),
        )
    }

    fn get_content_filter(&self) -> Result<Option<ContentFilter>> {
        if self.get_disable_yellow_filter()? {
            return Ok(None);
        }
        Ok(Some(ContentFilter::new(self.get_yellow_words())))
    }

    fn get_search_settings(&self) -> Result<SearchSettings> {
        Ok(SearchSettings {
            source_timeout: self.get_search_timeout()?,
            cache_time: self.get_cache_time()?,
            filter: self.get_content_filter()?,
        })
    }
}
