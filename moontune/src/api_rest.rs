//! Endpoints `/music`
//!
//! - `GET /music?action=methods|platform-methods|method-config|proxy`
//! - `POST /music` avec `{"action": "parse" | "proxy-post", ...}`
//! - `GET|PUT /music/state` : état de lecture du client, si le heartbeat est actif
//!
//! Ordre des contrôles : identification (401), feature flag (403), puis paramètres (400).

use crate::error::TuneHubError;
use crate::gateway::Gateway;
use crate::models::{ParseEnvelope, ParseRequest};
use crate::snapshot::{ClientPlaybackSnapshot, SnapshotHeartbeat};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use indexmap::IndexMap;
use moonserver::Authorizer;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, error};

/// État partagé des endpoints musique
#[derive(Clone)]
pub struct MusicState {
    pub gateway: Arc<Gateway>,
    pub authorizer: Arc<dyn Authorizer>,
    /// Absent : `/music/state` n'est pas exposé
    pub heartbeat: Option<Arc<SnapshotHeartbeat>>,
}

impl MusicState {
    fn check(&self, headers: &HeaderMap) -> Result<(), TuneHubError> {
        let auth = self
            .authorizer
            .authorize(headers)
            .ok_or(TuneHubError::Unauthorized)?;
        if !self.gateway.is_enabled() {
            return Err(TuneHubError::Disabled);
        }
        debug!("Music request from {}", auth.username);
        Ok(())
    }
}

/// Crée le router musique
pub fn create_router(state: MusicState) -> Router {
    let mut router = Router::new().route("/music", get(music_get).post(music_post));
    if state.heartbeat.is_some() {
        router = router.route("/music/state", get(state_get).put(state_put));
    }
    router.with_state(state)
}

fn param<'a>(params: &'a [(String, String)], name: &str) -> &'a str {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
        .unwrap_or("")
}

async fn music_get(
    State(state): State<MusicState>,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Value>, AppError> {
    state.check(&headers)?;
    let gateway = &state.gateway;

    let payload = match param(&params, "action") {
        "" => return Err(TuneHubError::MissingParam("action").into()),
        "methods" => gateway.methods().await?,
        "platform-methods" => gateway.platform_methods(param(&params, "platform")).await?,
        "method-config" => {
            gateway
                .method_config(param(&params, "platform"), param(&params, "function"))
                .await?
        }
        "proxy" => {
            let extra: Vec<(String, String)> = params
                .iter()
                .filter(|(key, _)| key != "action" && key != "url")
                .cloned()
                .collect();
            gateway.proxy(param(&params, "url"), &extra).await?
        }
        other => return Err(TuneHubError::UnsupportedAction(other.to_string()).into()),
    };

    Ok(Json(payload))
}

#[derive(Debug, Default, Deserialize)]
struct ProxyPostBody {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    headers: IndexMap<String, Value>,
}

async fn music_post(
    State(state): State<MusicState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    state.check(&headers)?;

    let body: Value =
        serde_json::from_slice(&body).map_err(|e| TuneHubError::InvalidBody(e.to_string()))?;
    let action = body.get("action").and_then(Value::as_str).unwrap_or("");

    match action {
        "" => Err(TuneHubError::MissingParam("action").into()),
        "parse" => {
            let request: ParseRequest = serde_json::from_value(body.clone())
                .map_err(|e| AppError::Envelope(TuneHubError::InvalidBody(e.to_string())))?;
            let envelope = state
                .gateway
                .parse(request)
                .await
                .map_err(AppError::Envelope)?;
            Ok(Json(envelope).into_response())
        }
        "proxy-post" => {
            let relay: ProxyPostBody = serde_json::from_value(body.clone())
                .map_err(|e| TuneHubError::InvalidBody(e.to_string()))?;
            let overrides: IndexMap<String, String> = relay
                .headers
                .into_iter()
                .map(|(name, value)| match value {
                    Value::String(s) => (name, s),
                    other => (name, other.to_string()),
                })
                .collect();
            let payload = state
                .gateway
                .proxy_post(
                    relay.url.as_deref().unwrap_or(""),
                    relay.data.as_ref(),
                    &overrides,
                )
                .await?;
            Ok(Json(payload).into_response())
        }
        other => Err(TuneHubError::UnsupportedAction(other.to_string()).into()),
    }
}

#[derive(Debug, Deserialize)]
struct StateParams {
    #[serde(default)]
    flush: bool,
}

async fn state_get(
    State(state): State<MusicState>,
    headers: HeaderMap,
) -> Result<Json<Option<ClientPlaybackSnapshot>>, AppError> {
    state.check(&headers)?;
    let snapshot = match &state.heartbeat {
        Some(heartbeat) => heartbeat.latest().await?,
        None => None,
    };
    Ok(Json(snapshot))
}

async fn state_put(
    State(state): State<MusicState>,
    headers: HeaderMap,
    Query(params): Query<StateParams>,
    Json(snapshot): Json<ClientPlaybackSnapshot>,
) -> Result<StatusCode, AppError> {
    state.check(&headers)?;
    if let Some(heartbeat) = &state.heartbeat {
        if params.flush {
            heartbeat.update_now(snapshot).await;
        } else {
            heartbeat.update(snapshot).await;
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

// ============ Gestion des erreurs ============

enum AppError {
    /// `{"error": ...}`
    Plain(TuneHubError),
    /// `{"code": -1, "message": ..., "error": ...}` pour `parse`
    Envelope(TuneHubError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (err, envelope) = match self {
            Self::Plain(err) => (err, false),
            Self::Envelope(err) => (err, true),
        };
        let status = err.status_code();

        if status.is_server_error() {
            error!("Music request failed: {}", err);
            return (
                status,
                Json(json!({ "error": "request failed", "details": err.to_string() })),
            )
                .into_response();
        }

        if envelope {
            (status, Json(ParseEnvelope::failure(err.to_string()))).into_response()
        } else {
            (status, Json(json!({ "error": err.to_string() }))).into_response()
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<TuneHubError>,
{
    fn from(err: E) -> Self {
        Self::Plain(err.into())
    }
}
