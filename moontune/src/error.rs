//! Types d'erreurs de la passerelle TuneHub

use axum::http::StatusCode;

/// Alias de Result pour les opérations de la passerelle
pub type Result<T> = std::result::Result<T, TuneHubError>;

/// Erreurs possibles lors du traitement d'une requête musicale
#[derive(Debug, thiserror::Error)]
pub enum TuneHubError {
    /// La fonction musique est désactivée
    #[error("music feature disabled")]
    Disabled,

    /// L'appelant n'a pas pu être identifié
    #[error("Unauthorized")]
    Unauthorized,

    /// La résolution des morceaux exige une clé fournisseur
    #[error("TuneHub API key not configured")]
    MissingApiKey,

    /// Un paramètre requis est absent ou vide
    #[error("missing {0} parameter")]
    MissingParam(&'static str),

    /// `action` inconnue
    #[error("unsupported action: {0}")]
    UnsupportedAction(String),

    /// Le corps de la requête n'est pas un JSON valide
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// URL invalide
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Échec de la requête HTTP
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Échec du parsing JSON
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// L'amont a répondu avec un statut d'échec
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// L'amont a répondu, mais pas ce qui était attendu
    #[error("upstream error: {0}")]
    Upstream(String),

    /// La transformation n'a pas pu être évaluée
    #[error("transform failed: {0}")]
    Transform(String),

    /// Échec du stockage
    #[error("storage error: {0}")]
    Store(#[from] mooncache::CacheError),
}

impl TuneHubError {
    /// Statut HTTP renvoyé quand l'erreur atteint l'appelant
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Disabled | Self::MissingApiKey => StatusCode::FORBIDDEN,
            Self::MissingParam(_)
            | Self::UnsupportedAction(_)
            | Self::InvalidBody(_)
            | Self::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Vrai pour les erreurs dues aux entrées ou aux droits de l'appelant
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(TuneHubError::Disabled.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(TuneHubError::MissingApiKey.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            TuneHubError::MissingParam("platform").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TuneHubError::Upstream("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            TuneHubError::MissingParam("url").to_string(),
            "missing url parameter"
        );
    }
}
