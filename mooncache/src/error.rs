//! Erreurs du cache et du stockage clé-valeur

use thiserror::Error;

/// Type Result personnalisé pour mooncache
pub type Result<T> = std::result::Result<T, CacheError>;

#[derive(Error, Debug)]
pub enum CacheError {
    /// Erreur d'entrée/sortie du stockage sur disque
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Valeur stockée illisible
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Clé refusée par le stockage
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}
