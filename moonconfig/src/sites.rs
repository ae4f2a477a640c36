//! Search sites and per-user access rules
//!
//! The `api_sites` section lists every configured video API; the `users` section
//! can restrict which of them a given user is allowed to query.

use crate::Config;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One configured search API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSite {
    /// Stable identifier, used as the `source` of every result
    pub key: String,
    /// Human readable name
    pub name: String,
    /// Base URL of the API (`?ac=videolist&wd=` is appended for searches)
    pub api: String,
    /// Optional detail page base URL
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub disabled: bool,
}

/// Access rules for one user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    pub username: String,
    /// A banned user may not search any site
    #[serde(default)]
    pub banned: bool,
    /// Keys of the sites this user may query; empty means no restriction
    #[serde(default)]
    pub enabled_apis: Vec<String>,
}

impl Config {
    /// Every configured site, disabled ones included
    pub fn get_api_sites(&self) -> Result<Vec<ApiSite>> {
        match self.get_value(&["api_sites"]) {
            Ok(serde_yaml::Value::Null) | Err(_) => Ok(Vec::new()),
            Ok(value) => Ok(serde_yaml::from_value(value)?),
        }
    }

    pub fn get_users(&self) -> Result<Vec<UserEntry>> {
        match self.get_value(&["users"]) {
            Ok(serde_yaml::Value::Null) | Err(_) => Ok(Vec::new()),
            Ok(value) => Ok(serde_yaml::from_value(value)?),
        }
    }

    /// Sites a user is allowed to search, in configuration order
    ///
    /// Disabled sites are never returned and a banned user gets none. When the
    /// user has a non-empty `enabled_apis` list only those sites are kept;
    /// unknown users get every enabled site.
    pub fn get_available_api_sites(&self, username: &str) -> Result<Vec<ApiSite>> {
        let sites: Vec<ApiSite> = self
            .get_api_sites()?
            .into_iter()
            .filter(|site| !site.disabled)
            .collect();

        let users = self.get_users()?;
        let Some(user) = users.iter().find(|u| u.username == username) else {
            return Ok(sites);
        };

        if user.banned {
            return Ok(Vec::new());
        }

        if user.enabled_apis.is_empty() {
            return Ok(sites);
        }

        Ok(sites
            .into_iter()
            .filter(|site| user.enabled_apis.iter().any(|k| k == &site.key))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::Config;

    const YAML: &str = r#"
api_sites:
  - key: alpha
    name: Alpha
    api: https://alpha.example/api.php/provide/vod
  - key: beta
    name: Beta
    api: https://beta.example/api
    disabled: true
  - key: gamma
    name: Gamma
    api: https://gamma.example/api
users:
  - username: alice
    enabled_apis: [gamma, beta]
  - username: bob
  - username: mallory
    banned: true
    enabled_apis: [alpha]
"#;

    #[test]
    fn test_disabled_sites_are_skipped() {
        let config = Config::from_yaml_str(YAML).unwrap();
        let keys: Vec<_> = config
            .get_available_api_sites("stranger")
            .unwrap()
            .into_iter()
            .map(|s| s.key)
            .collect();
        assert_eq!(keys, vec!["alpha", "gamma"]);
    }

    #[test]
    fn test_user_restriction_keeps_config_order() {
        let config = Config::from_yaml_str(YAML).unwrap();
        let keys: Vec<_> = config
            .get_available_api_sites("alice")
            .unwrap()
            .into_iter()
            .map(|s| s.key)
            .collect();
        assert_eq!(keys, vec!["gamma"]);
    }

    #[test]
    fn test_user_without_restriction() {
        let config = Config::from_yaml_str(YAML).unwrap();
        assert_eq!(config.get_available_api_sites("bob").unwrap().len(), 2);
    }

    #[test]
    fn test_banned_user_gets_no_site() {
        let config = Config::from_yaml_str(YAML).unwrap();
        assert!(config.get_available_api_sites("mallory").unwrap().is_empty());
        assert!(config.get_users().unwrap()[2].banned);
    }

    #[test]
    fn test_no_sites_configured() {
        let config = Config::from_yaml_str("").unwrap();
        assert!(config.get_available_api_sites("bob").unwrap().is_empty());
    }
}
