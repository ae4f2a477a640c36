//! Types d'erreurs des sources de recherche

/// Alias de Result pour les opérations des sources
pub type Result<T> = std::result::Result<T, SourceError>;

/// Erreurs possibles lors de l'interrogation d'une source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Échec de la requête HTTP
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Échec du parsing JSON
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// URL invalide
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// L'amont a répondu avec un statut d'échec
    #[error("{source_key} returned HTTP {status}")]
    Status { source_key: String, status: u16 },

    /// Échec du stockage
    #[error("Storage error: {0}")]
    Store(#[from] mooncache::CacheError),

    /// Erreur générique
    #[error("{0}")]
    Other(String),
}

impl SourceError {
    /// Crée une erreur générique à partir d'une chaîne
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
