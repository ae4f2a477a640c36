//! Logs de MoonHub : buffer circulaire, diffusion SSE et niveau réglable à chaud
//!
//! [`init_logging`] installe le subscriber global :
//! - un filtre de niveau rechargeable (`host.logger.min_level`)
//! - un [`BufferLayer`] qui garde les derniers événements (`host.logger.buffer_capacity`)
//! - une sortie console optionnelle (`host.logger.enable_console`)
//!
//! Les routes associées sont `/log-dump`, `/log-sse` et `/api/log_setup`.

mod layer;

pub use layer::BufferLayer;

use std::{
    collections::VecDeque,
    sync::{Arc, RwLock},
};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use chrono::{DateTime, Utc};
use moonconfig::Config;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::Level;
use tracing_subscriber::{
    Registry, filter::LevelFilter, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

const AVAILABLE_LEVELS: [&str; 5] = ["ERROR", "WARN", "INFO", "DEBUG", "TRACE"];

/// Une entrée de log
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub target: String,
    pub message: String,
}

/// Buffer circulaire partagé
#[derive(Clone)]
pub struct LogState {
    buffer: Arc<RwLock<VecDeque<LogEntry>>>,
    capacity: usize,
    tx: broadcast::Sender<LogEntry>,
    max_level: Arc<RwLock<Level>>,
    reload_handle: Option<reload::Handle<LevelFilter, Registry>>,
}

impl LogState {
    /// Buffer sans filtre rechargeable (le niveau n'est alors que mémorisé)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
            tx: broadcast::channel(capacity).0,
            max_level: Arc::new(RwLock::new(Level::TRACE)),
            reload_handle: None,
        }
    }

    pub fn with_reload_handle(mut self, handle: reload::Handle<LevelFilter, Registry>) -> Self {
        self.reload_handle = Some(handle);
        self
    }

    pub fn set_max_level(&self, level: Level) {
        *self.max_level.write().unwrap_or_else(|e| e.into_inner()) = level;

        if let Some(handle) = &self.reload_handle {
            if let Err(e) = handle.reload(LevelFilter::from_level(level)) {
                eprintln!("Failed to reload log level filter: {}", e);
            }
        }
    }

    pub fn get_max_level(&self) -> Level {
        *self.max_level.read().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, entry: LogEntry) {
        let mut buf = self.buffer.write().unwrap_or_else(|e| e.into_inner());
        if buf.len() >= self.capacity {
            buf.pop_front();
        }
        buf.push_back(entry.clone());
        drop(buf);
        // Pas d'abonné : l'entrée reste seulement dans le buffer
        let _ = self.tx.send(entry);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.tx.subscribe()
    }

    pub fn dump(&self) -> Vec<LogEntry> {
        self.buffer
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}

/// Options d'initialisation du système de logging
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Nombre d'entrées conservées
    pub buffer_capacity: usize,
    /// Sortie vers la console
    pub enable_console: bool,
    pub min_level: Level,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            buffer_capacity: 1000,
            enable_console: true,
            min_level: Level::INFO,
        }
    }
}

impl LoggingOptions {
    /// Lit la section `host.logger`
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();
        Self {
            buffer_capacity: config
                .get_log_cache_size()
                .unwrap_or(defaults.buffer_capacity),
            enable_console: config
                .get_log_enable_console()
                .unwrap_or(defaults.enable_console),
            min_level: config
                .get_log_min_level()
                .ok()
                .and_then(|l| string_to_level(&l))
                .unwrap_or(defaults.min_level),
        }
    }
}

/// Installe le subscriber global et retourne l'état partagé du buffer
///
/// Si un subscriber global existe déjà, il est conservé et le buffer ne reçoit
/// rien ; l'appel ne panique pas.
pub fn init_logging(options: LoggingOptions) -> LogState {
    let (filter, reload_handle) = reload::Layer::new(LevelFilter::from_level(options.min_level));

    let log_state = LogState::new(options.buffer_capacity).with_reload_handle(reload_handle);
    *log_state.max_level.write().unwrap_or_else(|e| e.into_inner()) = options.min_level;

    // Le filtre passe avant le buffer
    let subscriber = Registry::default()
        .with(filter)
        .with(BufferLayer::new(log_state.clone()));

    let result = if options.enable_console {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true),
            )
            .try_init()
    } else {
        subscriber.try_init()
    };

    if let Err(e) = result {
        eprintln!("Logging already initialised: {}", e);
    }

    log_state
}

/// Paramètres de `/log-sse`
#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

impl LogQuery {
    fn accepts(&self, entry: &LogEntry) -> bool {
        if let Some(level) = &self.level {
            if !entry.level.eq_ignore_ascii_case(level) {
                return false;
            }
        }
        match &self.search {
            Some(search) => entry.message.contains(search) || entry.target.contains(search),
            None => true,
        }
    }
}

/// Handler SSE : l'historique d'abord, puis le flux en direct
pub async fn log_sse(
    State(state): State<LogState>,
    Query(params): Query<LogQuery>,
) -> impl IntoResponse {
    let mut rx = state.subscribe();
    let history = state.dump();

    let stream = async_stream::stream! {
        for entry in history.into_iter().filter(|e| params.accepts(e)) {
            if let Ok(event) = Event::default().json_data(&entry) {
                yield Ok::<_, axum::Error>(event);
            }
        }

        loop {
            match rx.recv().await {
                Ok(entry) if params.accepts(&entry) => {
                    if let Ok(event) = Event::default().json_data(&entry) {
                        yield Ok::<_, axum::Error>(event);
                    }
                }
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Handler REST : contenu du buffer en JSON
pub async fn log_dump(State(state): State<LogState>) -> impl IntoResponse {
    Json(state.dump())
}

/// Corps de `POST /api/log_setup`
#[derive(Debug, Deserialize)]
pub struct LogSetupRequest {
    pub level: String,
}

/// Réponse de `/api/log_setup`
#[derive(Debug, Serialize)]
pub struct LogSetupResponse {
    pub current_level: String,
    pub available_levels: Vec<String>,
}

impl LogSetupResponse {
    fn new(level: Level) -> Self {
        Self {
            current_level: level_to_string(level),
            available_levels: AVAILABLE_LEVELS.iter().map(|l| l.to_string()).collect(),
        }
    }
}

pub async fn log_setup_get(State(state): State<LogState>) -> impl IntoResponse {
    Json(LogSetupResponse::new(state.get_max_level()))
}

pub async fn log_setup_post(
    State(state): State<LogState>,
    Json(payload): Json<LogSetupRequest>,
) -> impl IntoResponse {
    let Some(level) = string_to_level(&payload.level) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": format!("Invalid log level. Must be one of: {}", AVAILABLE_LEVELS.join(", "))
            })),
        )
            .into_response();
    };

    state.set_max_level(level);
    tracing::info!("Log level changed to: {}", level);

    (StatusCode::OK, Json(LogSetupResponse::new(level))).into_response()
}

/// Router des routes de logs, à fusionner à la racine
pub fn create_logs_router(log_state: LogState) -> Router {
    Router::new()
        .route("/log-dump", get(log_dump))
        .route("/log-sse", get(log_sse))
        .route("/api/log_setup", get(log_setup_get).post(log_setup_post))
        .with_state(log_state)
}

fn string_to_level(s: &str) -> Option<Level> {
    s.trim().parse::<Level>().ok()
}

fn level_to_string(level: Level) -> String {
    level.as_str().to_string()
}
