//! Extension de moonserver::Server pour la recherche fédérée

use crate::api_rest::{ConfiguredSources, SearchState, SourceProvider, create_router};
use anyhow::Result;
use moonconfig::get_config;
use moonserver::Server;
use moonsource::LocalIndex;
use std::sync::Arc;
use tracing::info;

/// Trait d'extension pour ajouter `GET /search` à un serveur moonserver
///
/// ```rust,no_run
/// use moonsearch::SearchServerExt;
/// use moonserver::ServerBuilder;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let mut server = ServerBuilder::new_configured().build();
///     server.init_search_configured(None).await?;
///     server.start().await?;
///     server.wait().await;
///     Ok(())
/// }
/// ```
pub trait SearchServerExt {
    /// Enregistre la route avec un fournisseur de sources explicite
    async fn init_search(
        &mut self,
        sources: Arc<dyn SourceProvider>,
        local_index: Option<Arc<LocalIndex>>,
    ) -> Result<()>;

    /// Enregistre la route avec les sites de la configuration globale
    async fn init_search_configured(&mut self, local_index: Option<Arc<LocalIndex>>) -> Result<()>;
}

impl SearchServerExt for Server {
    async fn init_search(
        &mut self,
        sources: Arc<dyn SourceProvider>,
        local_index: Option<Arc<LocalIndex>>,
    ) -> Result<()> {
        let state = SearchState {
            config: get_config(),
            authorizer: self.authorizer(),
            sources,
            local_index,
        };
        self.add_router("/", create_router(state)).await;
        info!("Search endpoint available at /search");
        Ok(())
    }

    async fn init_search_configured(&mut self, local_index: Option<Arc<LocalIndex>>) -> Result<()> {
        let config = get_config();
        let client = moonsource::default_client()?;
        let sites = config.get_api_sites()?;
        info!("{} search site(s) configured", sites.len());
        for site in sites.iter().filter(|s| !s.disabled) {
            info!("  - {} ({})", site.name, site.key);
        }

        let provider = Arc::new(ConfiguredSources::new(config, client));
        self.init_search(provider, local_index).await
    }
}
