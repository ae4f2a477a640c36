//! Erreurs du moteur de recherche

use thiserror::Error;

/// Type Result personnalisé pour moonsearch
pub type Result<T> = std::result::Result<T, SearchError>;

/// Erreurs qui remontent jusqu'à l'appelant
///
/// Les échecs d'une source n'en font pas partie : ils sont absorbés par le
/// moteur et ne se traduisent que par une contribution vide.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Appelant non identifié
    #[error("Unauthorized")]
    Unauthorized,

    /// Valeur d'en-tête HTTP impossible à construire
    #[error("Invalid header value: {0}")]
    Header(#[from] axum::http::header::InvalidHeaderValue),

    /// Configuration illisible (sites, utilisateurs, réglages)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Source setup failed: {0}")]
    Source(#[from] moonsource::SourceError),
}
