//! Extension pour intégrer la configuration OpenList dans moonconfig
//!
//! OpenList est la bibliothèque privée : un index de dossiers décrit par des
//! métadonnées TMDB, stocké sous la clé `video.metainfo`.
//!
//! ```rust,ignore
//! use moonconfig::get_config;
//! use moonsource::OpenListConfigExt;
//!
//! let openlist = get_config().get_openlist_config()?;
//! if openlist.is_configured() {
//!     println!("Private library rooted at {}", openlist.root_path);
//! }
//! ```

use anyhow::Result;
use moonconfig::Config;
use serde_yaml::Value;

const DEFAULT_ROOT_PATH: &str = "/";

/// Paramètres OpenList
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenListConfig {
    pub enabled: bool,
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub root_path: String,
}

impl OpenListConfig {
    /// Vrai si la bibliothèque est activée et que les accès sont renseignés
    pub fn is_configured(&self) -> bool {
        self.enabled && self.url.is_some() && self.username.is_some() && self.password.is_some()
    }
}

/// Trait d'extension pour la section `openlist`
pub trait OpenListConfigExt {
    /// Lit la section `openlist` ; les valeurs absentes prennent leur défaut
    fn get_openlist_config(&self) -> Result<OpenListConfig>;

    /// Active ou désactive la recherche dans la bibliothèque privée
    fn set_openlist_enabled(&self, enabled: bool) -> Result<()>;
}

impl OpenListConfigExt for Config {
    fn get_openlist_config(&self) -> Result<OpenListConfig> {
        let enabled = matches!(
            self.get_value(&["openlist", "enabled"]),
            Ok(Value::Bool(true))
        );

        Ok(OpenListConfig {
            enabled,
            url: self.get_string(&["openlist", "url"]),
            username: self.get_string(&["openlist", "username"]),
            password: self.get_string(&["openlist", "password"]),
            root_path: self
                .get_string(&["openlist", "root_path"])
                .unwrap_or_else(|| DEFAULT_ROOT_PATH.to_string()),
        })
    }

    fn set_openlist_enabled(&self, enabled: bool) -> Result<()> {
        self.set_value(&["openlist", "enabled"], Value::Bool(enabled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_not_configured() {
        let config = Config::from_yaml_str("openlist:\n  enabled: true\n").unwrap();
        let openlist = config.get_openlist_config().unwrap();
        assert!(openlist.enabled);
        assert_eq!(openlist.root_path, "/");
        assert!(!openlist.is_configured());
    }

    #[test]
    fn test_complete_section() {
        let yaml = r#"
openlist:
  enabled: true
  url: "https://list.example"
  username: "admin"
  password: "secret"
  root_path: "/movies"
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        let openlist = config.get_openlist_config().unwrap();
        assert!(openlist.is_configured());
        assert_eq!(openlist.root_path, "/movies");

        config.set_openlist_enabled(false).unwrap();
        assert!(!config.get_openlist_config().unwrap().is_configured());
    }
}
