//! # moonsource
//!
//! Sources de recherche de MoonHub.
//!
//! Une source de recherche prend une requête en texte libre et répond par une
//! liste de [`SearchResult`]. Le moteur de diffusion de `moonsearch` ne connaît
//! que le trait [`SearchSource`] ; ce crate fournit aussi les deux sortes de
//! sources qu'utilise MoonHub :
//!
//! - [`ApiSiteSource`] : une API vidéo de type MacCMS configurée
//! - [`LocalIndex`] : l'index de la bibliothèque privée gardé dans le stockage clé-valeur
//!
//! ## Utilisation
//!
//! ```rust,ignore
//! use moonconfig::get_config;
//! use moonsource::{default_client, sources_for_user, SearchSource};
//!
//! let client = default_client()?;
//! let sources = sources_for_user(&get_config(), "alice", &client)?;
//! for source in &sources {
//!     let results = source.search("Dune").await?;
//!     println!("{}: {} results", source.name(), results.len());
//! }
//! ```

pub mod api_site;
pub mod config_ext;
pub mod error;
pub mod local_index;
pub mod models;

pub use api_site::ApiSiteSource;
pub use config_ext::{OpenListConfig, OpenListConfigExt};
pub use error::{Result, SourceError};
pub use local_index::{FolderInfo, LocalIndex, MetaInfo, METAINFO_KEY};
pub use models::SearchResult;

use async_trait::async_trait;
use moonconfig::Config;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// Backend répondant aux recherches en texte libre
///
/// Les implémentations doivent être `Send + Sync` : le moteur interroge toutes
/// les sources d'une requête en parallèle depuis la même tâche.
#[async_trait]
pub trait SearchSource: Debug + Send + Sync {
    /// Clé stable de la source, copiée dans le champ `source` de chaque résultat
    fn id(&self) -> &str;

    /// Nom lisible, utilisé dans les logs
    fn name(&self) -> &str;

    /// Lance une recherche
    ///
    /// Une erreur ne touche que cette source ; l'appelant la traite comme une
    /// contribution vide.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;
}

/// Client HTTP partagé par les sites API
pub fn default_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(api_site::DEFAULT_USER_AGENT)
        .build()?)
}

/// Sources que `username` peut interroger, dans l'ordre de la configuration
///
/// Le timeout et le nombre de pages viennent de la section `search` de la
/// configuration.
pub fn sources_for_user(
    config: &Config,
    username: &str,
    client: &reqwest::Client,
) -> anyhow::Result<Vec<Arc<dyn SearchSource>>> {
    let request_timeout = config
        .get_typed::<u64>(&["search", "request_timeout_secs"])
        .unwrap_or(api_site::DEFAULT_REQUEST_TIMEOUT_SECS);
    let max_pages = config
        .get_typed::<usize>(&["search", "max_pages"])
        .unwrap_or(api_site::DEFAULT_MAX_PAGES);

    Ok(config
        .get_available_api_sites(username)?
        .into_iter()
        .map(|site| {
            Arc::new(
                ApiSiteSource::with_client(site, client.clone())
                    .request_timeout(Duration::from_secs(request_timeout))
                    .max_pages(max_pages),
            ) as Arc<dyn SearchSource>
        })
        .collect())
}
