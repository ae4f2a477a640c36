//! Extension de moonserver::Server pour la passerelle musique

use crate::api_rest::{MusicState, create_router};
use crate::config_ext::TuneHubConfigExt;
use crate::gateway::Gateway;
use crate::snapshot::SnapshotHeartbeat;
use anyhow::Result;
use moonconfig::get_config;
use moonserver::Server;
use std::sync::Arc;
use tracing::{info, warn};

/// Trait d'extension pour ajouter `/music` à un serveur moonserver
///
/// ```rust,no_run
/// use moonserver::ServerBuilder;
/// use moontune::TuneHubServerExt;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let mut server = ServerBuilder::new_configured().build();
///     server.init_tunehub_configured(None).await?;
///     server.start().await?;
///     server.wait().await;
///     Ok(())
/// }
/// ```
pub trait TuneHubServerExt {
    /// Enregistre les routes avec une passerelle déjà construite
    async fn init_tunehub(
        &mut self,
        gateway: Arc<Gateway>,
        heartbeat: Option<Arc<SnapshotHeartbeat>>,
    ) -> Result<Arc<Gateway>>;

    /// Construit la passerelle depuis la configuration globale
    async fn init_tunehub_configured(
        &mut self,
        heartbeat: Option<Arc<SnapshotHeartbeat>>,
    ) -> Result<Arc<Gateway>>;
}

impl TuneHubServerExt for Server {
    async fn init_tunehub(
        &mut self,
        gateway: Arc<Gateway>,
        heartbeat: Option<Arc<SnapshotHeartbeat>>,
    ) -> Result<Arc<Gateway>> {
        let state = MusicState {
            gateway: gateway.clone(),
            authorizer: self.authorizer(),
            heartbeat,
        };
        self.add_router("/", create_router(state)).await;
        info!("Music endpoints available at /music");
        Ok(gateway)
    }

    async fn init_tunehub_configured(
        &mut self,
        heartbeat: Option<Arc<SnapshotHeartbeat>>,
    ) -> Result<Arc<Gateway>> {
        let settings = get_config().get_tunehub_settings()?;
        if settings.enabled {
            info!("TuneHub gateway enabled on {}", settings.base_url);
            if settings.api_key.is_none() {
                warn!("No TuneHub API key configured, song resolution will be refused");
            }
            warn!("POST relay accepts any target URL; restrict access to trusted users");
        } else {
            info!("TuneHub gateway disabled, /music answers 403");
        }

        let gateway = Arc::new(Gateway::new(settings)?);
        self.init_tunehub(gateway, heartbeat).await
    }
}
