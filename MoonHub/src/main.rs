use mooncache::{FileStore, KeyValueStore};
use moonconfig::get_config;
use moonsearch::SearchServerExt;
use moonserver::{LoggingOptions, ServerBuilder};
use moonsource::{LocalIndex, OpenListConfigExt};
use moontune::{HEARTBEAT_INTERVAL, PlaybackStore, SnapshotHeartbeat, TuneHubServerExt};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ========== PHASE 1 : Infrastructure ==========

    let config = get_config();
    let mut server = ServerBuilder::new_configured().build();
    server
        .init_logging(LoggingOptions::from_config(&config))
        .await;
    info!("📁 Configuration loaded from {}", config.directory());

    server
        .add_route("/info", || async {
            serde_json::json!({"name": "MoonHub", "version": env!("CARGO_PKG_VERSION")})
        })
        .await;

    let storage_dir = config.get_storage_dir()?;
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&storage_dir)?);
    info!("💾 Key-value storage at {}", storage_dir);

    // ========== PHASE 2 : Recherche ==========

    let openlist = config.get_openlist_config()?;
    let local_index = if openlist.is_configured() {
        info!("🗂️ Private library enabled (root {})", openlist.root_path);
        Some(Arc::new(LocalIndex::new(store.clone(), openlist.root_path)))
    } else {
        None
    };

    info!("🔎 Initializing federated search...");
    server.init_search_configured(local_index).await?;

    // ========== PHASE 3 : Musique ==========

    let playback = PlaybackStore::new(store);
    match playback.load().await {
        Ok(Some(snapshot)) => info!(
            "🎵 Resuming playback state: {} song(s) queued, index {}",
            snapshot.queue.len(),
            snapshot.queue_index
        ),
        Ok(None) => info!("🎵 No saved playback state"),
        Err(e) => warn!("⚠️ Failed to read saved playback state: {}", e),
    }

    let heartbeat = Arc::new(SnapshotHeartbeat::spawn(
        playback,
        HEARTBEAT_INTERVAL,
        server.shutdown_token(),
    ));

    info!("🎧 Initializing TuneHub gateway...");
    server
        .init_tunehub_configured(Some(heartbeat.clone()))
        .await?;

    // ========== PHASE 4 : Démarrage du serveur ==========

    info!("🌐 Starting HTTP server...");
    server.start().await?;

    info!("✅ MoonHub is ready!");
    info!("Press Ctrl+C to stop...");
    server.wait().await;

    // Dernière sauvegarde de l'état de lecture
    heartbeat.join().await;
    info!("👋 MoonHub stopped");

    Ok(())
}
