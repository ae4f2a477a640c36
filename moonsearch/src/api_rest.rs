//! Endpoint `GET /search`
//!
//! Réponse : `{"results": [...]}`. L'appelant doit être identifié (401 sinon).
//! Les en-têtes de cache ne sont posés que sur une réponse cachable.

use crate::config_ext::SearchConfigExt;
use crate::engine::{SearchEngine, SearchRequest};
use crate::error::SearchError;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use moonconfig::Config;
use moonserver::Authorizer;
use moonsource::{LocalIndex, OpenListConfigExt, SearchResult, SearchSource};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// Fournit les sources autorisées pour un utilisateur
pub trait SourceProvider: Send + Sync {
    fn sources_for(&self, username: &str) -> anyhow::Result<Vec<Arc<dyn SearchSource>>>;
}

/// Sources lues dans la configuration à chaque requête
pub struct ConfiguredSources {
    config: Arc<Config>,
    client: reqwest::Client,
}

impl ConfiguredSources {
    pub fn new(config: Arc<Config>, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

impl SourceProvider for ConfiguredSources {
    fn sources_for(&self, username: &str) -> anyhow::Result<Vec<Arc<dyn SearchSource>>> {
        moonsource::sources_for_user(&self.config, username, &self.client)
    }
}

/// État partagé du endpoint
#[derive(Clone)]
pub struct SearchState {
    pub config: Arc<Config>,
    pub authorizer: Arc<dyn Authorizer>,
    pub sources: Arc<dyn SourceProvider>,
    /// Index privé, interrogé seulement si la section `openlist` est complète
    pub local_index: Option<Arc<LocalIndex>>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

/// Crée le router de recherche
pub fn create_router(state: SearchState) -> Router {
    Router::new()
        .route("/search", get(search))
        .with_state(state)
}

async fn search(
    State(state): State<SearchState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Response, AppError> {
    let auth = state
        .authorizer
        .authorize(&headers)
        .ok_or(SearchError::Unauthorized)?;

    let query = params.q.unwrap_or_default();
    let settings = state.config.get_search_settings()?;

    let (sources, local) = if query.is_empty() {
        (Vec::new(), Vec::new())
    } else {
        let sources = state.sources.sources_for(&auth.username)?;
        let openlist = state.config.get_openlist_config()?;
        let local = match &state.local_index {
            Some(index) if openlist.is_configured() => index.lookup(&query).await,
            _ => Vec::new(),
        };
        (sources, local)
    };

    let engine = SearchEngine::new(settings.source_timeout);
    let outcome = engine
        .search(
            SearchRequest {
                query: &query,
                local,
                filter: settings.filter.as_ref(),
            },
            &sources,
        )
        .await;

    let cache_headers = outcome.headers(settings.cache_time)?;
    let body = SearchResponse {
        results: outcome.into_results(),
    };
    Ok((cache_headers, Json(body)).into_response())
}

// ============ Gestion des erreurs ============

struct AppError(SearchError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.0 {
            SearchError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "Unauthorized" })),
            )
                .into_response(),
            other => {
                error!("Search request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({
                        "error": "search failed",
                        "details": other.to_string(),
                    })),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<SearchError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
