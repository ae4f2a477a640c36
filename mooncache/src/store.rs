//! Stockage clé-valeur pour les blobs JSON
//!
//! Ce module sert de collaborateur « stockage global » : métadonnées de la
//! bibliothèque locale (`video.metainfo`), état de lecture du client
//! (`musicPlayState`), etc. Chaque valeur est réécrite en entier à chaque
//! sauvegarde.
//!
//! Deux implémentations :
//! - [`MemoryStore`] : table en mémoire, pour les tests et les déploiements sans disque
//! - [`FileStore`] : un fichier `{clé}.json` par valeur dans un répertoire

use crate::error::{CacheError, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Stockage clé-valeur asynchrone
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// Helpers JSON pour tout [`KeyValueStore`]
#[async_trait]
pub trait KeyValueStoreExt: KeyValueStore {
    /// Charge et désérialise une valeur
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Sérialise et remplace une valeur
    async fn put_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, raw).await
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}

/// Stockage en mémoire
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.values.write().await.remove(key);
        Ok(())
    }
}

/// Stockage sur disque, un fichier JSON par clé
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Répertoire de stockage
    dir: PathBuf,
}

impl FileStore {
    /// Crée le stockage, et son répertoire s'il n'existe pas
    ///
    /// ```rust,no_run
    /// use mooncache::FileStore;
    ///
    /// let store = FileStore::new(".moonhub/storage")?;
    /// # Ok::<(), mooncache::CacheError>(())
    /// ```
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();

        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
            info!("Created storage directory: {}", dir.display());
        }

        Ok(Self { dir })
    }

    /// Format: `{dir}/{key}.json`
    fn value_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(|c: char| c == '/' || c == '\\') || key.starts_with('.') {
            return Err(CacheError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.value_path(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                debug!("Loaded {} from {}", key, path.display());
                Ok(Some(raw))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let path = self.value_path(key)?;
        // Écriture atomique : fichier temporaire puis renommage
        let tmp = self.dir.join(format!(".{}.tmp", key));
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!("Saved {} to {}", key, path.display());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.value_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
