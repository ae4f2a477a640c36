//! État de lecture du client et sauvegarde périodique
//!
//! L'état est un seul blob JSON sous la clé `musicPlayState`, réécrit en entier
//! à chaque sauvegarde. [`SnapshotHeartbeat`] est la tâche qui l'écrit :
//!
//! - toutes les 20 secondes si un nouvel état attend,
//! - tout de suite sur demande (pause, changement de morceau),
//! - une dernière fois à l'arrêt, quand le `CancellationToken` est annulé.

use crate::error::Result;
use crate::models::{LyricLine, PlayMode, Quality, ResolvedSong, Song};
use mooncache::{KeyValueStore, KeyValueStoreExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Clé de stockage de l'état
pub const SNAPSHOT_KEY: &str = "musicPlayState";

/// Période de sauvegarde pendant la lecture
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);

/// Vue affichée par le client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerView {
    #[default]
    Playlists,
    Songs,
}

/// État complet du lecteur, tel que le client le persiste
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPlaybackSnapshot {
    #[serde(rename = "currentSong", default)]
    pub current_item: Option<Song>,
    /// -1 quand rien n'est sélectionné
    #[serde(rename = "currentSongIndex", default = "no_index")]
    pub queue_index: i64,
    #[serde(rename = "songs", default)]
    pub queue: Vec<Song>,
    #[serde(default)]
    pub current_playlist_title: String,
    #[serde(rename = "currentSource", default = "default_source")]
    pub source_id: String,
    #[serde(default)]
    pub current_view: PlayerView,
    #[serde(default)]
    pub quality: Quality,
    #[serde(default)]
    pub play_mode: PlayMode,
    #[serde(default = "full_volume")]
    pub volume: u8,
    #[serde(rename = "currentTime", default)]
    pub current_position_seconds: f64,
    #[serde(rename = "currentSongUrl", default)]
    pub resolved_media_url: String,
    #[serde(rename = "lyrics", default)]
    pub lyric_lines: Vec<LyricLine>,
}

fn no_index() -> i64 {
    -1
}

fn default_source() -> String {
    "netease".to_string()
}

fn full_volume() -> u8 {
    100
}

impl Default for ClientPlaybackSnapshot {
    fn default() -> Self {
        Self {
            current_item: None,
            queue_index: no_index(),
            queue: Vec::new(),
            current_playlist_title: String::new(),
            source_id: default_source(),
            current_view: PlayerView::default(),
            quality: Quality::default(),
            play_mode: PlayMode::default(),
            volume: full_volume(),
            current_position_seconds: 0.0,
            resolved_media_url: String::new(),
            lyric_lines: Vec::new(),
        }
    }
}

impl ClientPlaybackSnapshot {
    /// Reporte un morceau résolu : URL de lecture, paroles, et pochette du
    /// morceau courant si l'amont en fournit une
    pub fn apply_resolved(&mut self, resolved: &ResolvedSong) {
        self.resolved_media_url = resolved.url.clone();
        self.lyric_lines = resolved.lyric_lines.clone();
        if let (Some(cover), Some(item)) = (&resolved.cover, self.current_item.as_mut()) {
            item.pic = Some(cover.clone());
        }
    }
}

/// Lecture et écriture de l'état dans un [`KeyValueStore`]
#[derive(Clone)]
pub struct PlaybackStore {
    store: Arc<dyn KeyValueStore>,
}

impl PlaybackStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Result<Option<ClientPlaybackSnapshot>> {
        Ok(self.store.get_json(SNAPSHOT_KEY).await?)
    }

    pub async fn save(&self, snapshot: &ClientPlaybackSnapshot) -> Result<()> {
        self.store.put_json(SNAPSHOT_KEY, snapshot).await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.delete(SNAPSHOT_KEY).await?;
        Ok(())
    }
}

struct HeartbeatInner {
    store: PlaybackStore,
    pending: Mutex<Option<ClientPlaybackSnapshot>>,
    flush_now: Notify,
}

impl HeartbeatInner {
    /// Écrit l'état en attente ; `Ok(false)` s'il n'y avait rien à écrire
    ///
    /// Le verrou n'est pas tenu pendant l'écriture. Un état arrivé entre-temps
    /// reste en attente pour la prochaine sauvegarde.
    async fn flush(&self) -> Result<bool> {
        let Some(snapshot) = self.pending.lock().await.clone() else {
            return Ok(false);
        };
        self.store.save(&snapshot).await?;

        let mut pending = self.pending.lock().await;
        if pending.as_ref() == Some(&snapshot) {
            *pending = None;
        }
        Ok(true)
    }

    async fn flush_logged(&self, reason: &str) {
        match self.flush().await {
            Ok(true) => debug!("Playback state saved ({})", reason),
            Ok(false) => {}
            Err(e) => warn!("Failed to save playback state ({}): {}", reason, e),
        }
    }
}

/// Tâche de sauvegarde de l'état de lecture
pub struct SnapshotHeartbeat {
    inner: Arc<HeartbeatInner>,
    handle: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SnapshotHeartbeat {
    /// Démarre la tâche ; elle s'arrête après une dernière écriture quand
    /// `shutdown` est annulé
    pub fn spawn(store: PlaybackStore, interval: Duration, shutdown: CancellationToken) -> Self {
        let inner = Arc::new(HeartbeatInner {
            store,
            pending: Mutex::new(None),
            flush_now: Notify::new(),
        });

        let task = inner.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        task.flush_logged("shutdown").await;
                        break;
                    }
                    _ = task.flush_now.notified() => task.flush_logged("on demand").await,
                    _ = ticker.tick() => task.flush_logged("heartbeat").await,
                }
            }
            info!("Playback state heartbeat stopped");
        });

        Self {
            inner,
            handle: std::sync::Mutex::new(Some(handle)),
        }
    }

    /// Enregistre un nouvel état, écrit au prochain battement
    pub async fn update(&self, snapshot: ClientPlaybackSnapshot) {
        *self.inner.pending.lock().await = Some(snapshot);
    }

    /// Enregistre un nouvel état et demande une écriture immédiate
    pub async fn update_now(&self, snapshot: ClientPlaybackSnapshot) {
        self.update(snapshot).await;
        self.inner.flush_now.notify_one();
    }

    /// Écrit l'état en attente sans passer par la tâche
    pub async fn flush(&self) -> Result<bool> {
        self.inner.flush().await
    }

    /// Dernier état connu : en attente s'il y en a un, sinon celui du stockage
    pub async fn latest(&self) -> Result<Option<ClientPlaybackSnapshot>> {
        if let Some(pending) = self.inner.pending.lock().await.clone() {
            return Ok(Some(pending));
        }
        self.inner.store.load().await
    }

    /// Attend la fin de la tâche (après annulation du token)
    pub async fn join(&self) {
        let handle = match self.handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Playback state heartbeat panicked: {}", e);
            }
        }
    }
}
