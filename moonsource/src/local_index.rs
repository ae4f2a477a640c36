//! Recherche dans la bibliothèque privée
//!
//! La bibliothèque privée est décrite par un seul blob JSON stocké sous
//! [`METAINFO_KEY`] : nom de dossier vers les métadonnées TMDB récupérées.
//! Le blob est chargé une fois par racine puis gardé en mémoire.
//!
//! Contrairement aux sources distantes, la recherche dans l'index n'échoue
//! jamais : un blob absent ou illisible est journalisé et ne donne rien.

use crate::error::Result;
use crate::models::SearchResult;
use crate::SearchSource;
use async_trait::async_trait;
use indexmap::IndexMap;
use mooncache::{KeyValueStore, KeyValueStoreExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

/// Clé de stockage des métadonnées de la bibliothèque
pub const METAINFO_KEY: &str = "video.metainfo";

/// Clé de source des résultats de la bibliothèque privée
pub const LOCAL_SOURCE_KEY: &str = "openlist";

/// Nom affiché de la bibliothèque privée
pub const LOCAL_SOURCE_NAME: &str = "私人影库";

const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";

/// Métadonnées d'un dossier de la bibliothèque
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderInfo {
    #[serde(default)]
    pub tmdb_id: Option<u64>,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub vote_average: Option<f64>,
    /// `movie` ou `tv`
    #[serde(default)]
    pub media_type: String,
}

/// Index complet de la bibliothèque
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaInfo {
    #[serde(default)]
    pub folders: IndexMap<String, FolderInfo>,
}

impl MetaInfo {
    /// Dossiers dont le nom ou le titre contient `query`, sans tenir compte de la casse
    pub fn matching<'a>(&'a self, query: &str) -> impl Iterator<Item = (&'a String, &'a FolderInfo)> {
        let needle = query.to_lowercase();
        self.folders.iter().filter(move |(folder, info)| {
            folder.to_lowercase().contains(&needle) || info.title.to_lowercase().contains(&needle)
        })
    }
}

/// URL complète d'une affiche TMDB
pub fn tmdb_image_url(poster_path: Option<&str>) -> String {
    match poster_path {
        Some(path) if !path.is_empty() => format!("{}{}", TMDB_IMAGE_BASE, path),
        _ => String::new(),
    }
}

impl FolderInfo {
    fn to_result(&self, folder: &str) -> SearchResult {
        let year = self.release_date.split('-').next().unwrap_or_default();
        let category = if self.media_type == "movie" {
            "电影"
        } else {
            "电视剧"
        };

        SearchResult {
            poster: tmdb_image_url(self.poster_path.as_deref()),
            year: year.to_string(),
            desc: self.overview.clone(),
            ..SearchResult::new(folder, &self.title, LOCAL_SOURCE_KEY, LOCAL_SOURCE_NAME)
                .with_type_name(category)
        }
    }
}

/// Recherche dans l'index de la bibliothèque privée
pub struct LocalIndex {
    store: Arc<dyn KeyValueStore>,
    root_path: String,
    memo: RwLock<HashMap<String, Arc<MetaInfo>>>,
}

impl std::fmt::Debug for LocalIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalIndex")
            .field("root_path", &self.root_path)
            .finish_non_exhaustive()
    }
}

impl LocalIndex {
    pub fn new(store: Arc<dyn KeyValueStore>, root_path: impl Into<String>) -> Self {
        Self {
            store,
            root_path: root_path.into(),
            memo: RwLock::new(HashMap::new()),
        }
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// Index de la racine courante, chargé au premier usage
    pub async fn meta_info(&self) -> Result<Option<Arc<MetaInfo>>> {
        if let Some(info) = self.memo.read().await.get(&self.root_path) {
            return Ok(Some(info.clone()));
        }

        let Some(info) = self.store.get_json::<MetaInfo>(METAINFO_KEY).await? else {
            debug!("No library index stored under {}", METAINFO_KEY);
            return Ok(None);
        };

        let info = Arc::new(info);
        self.memo
            .write()
            .await
            .insert(self.root_path.clone(), info.clone());
        debug!(
            "Library index loaded for {}: {} folders",
            self.root_path,
            info.folders.len()
        );
        Ok(Some(info))
    }

    /// Oublie l'index mémorisé : la prochaine recherche le recharge
    pub async fn invalidate(&self) {
        self.memo.write().await.remove(&self.root_path);
    }

    /// Entrées correspondantes ; n'échoue jamais
    pub async fn lookup(&self, query: &str) -> Vec<SearchResult> {
        match self.meta_info().await {
            Ok(Some(info)) => info
                .matching(query)
                .map(|(folder, entry)| entry.to_result(folder))
                .collect(),
            Ok(None) => Vec::new(),
            Err(e) => {
                error!("Failed to read library index: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl SearchSource for LocalIndex {
    fn id(&self) -> &str {
        LOCAL_SOURCE_KEY
    }

    fn name(&self) -> &str {
        LOCAL_SOURCE_NAME
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        Ok(self.lookup(query).await)
    }
}
