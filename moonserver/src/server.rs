//! # Module Server - API de haut niveau pour Axum
//!
//! Le serveur accumule des routers (directement ou via les traits d'extension
//! des autres crates), puis les sert tous sur un seul port.
//!
//! - Routes JSON simples avec `add_route()`
//! - Sous-routers avec `add_router()`
//! - Handlers avec état avec `add_handler_with_state()`
//! - Arrêt gracieux sur Ctrl+C ou via le [`CancellationToken`] du serveur

use crate::auth::{Authorizer, CookieAuthorizer};
use crate::logs::{LogState, LoggingOptions, create_logs_router, init_logging};
use anyhow::Result;
use axum::handler::Handler;
use axum::routing::get;
use axum::{Json, Router};
use moonconfig::get_config;
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{signal, sync::RwLock, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Nom par défaut du serveur
pub const DEFAULT_SERVER_NAME: &str = "MoonHub";

/// Info serveur sérialisable
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub base_url: String,
    pub http_port: u16,
}

/// Serveur principal
pub struct Server {
    name: String,
    base_url: String,
    http_port: u16,
    router: Arc<RwLock<Router>>,
    authorizer: Arc<dyn Authorizer>,
    shutdown: CancellationToken,
    join_handle: Option<JoinHandle<()>>,
    log_state: Option<LogState>,
}

impl Server {
    /// Crée une nouvelle instance de serveur
    ///
    /// # Arguments
    ///
    /// * `name` - Nom du serveur (pour les logs)
    /// * `base_url` - Hôte annoncé (ex: "localhost")
    /// * `http_port` - Port HTTP à écouter
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http_port,
            router: Arc::new(RwLock::new(Router::new())),
            authorizer: Arc::new(CookieAuthorizer),
            shutdown: CancellationToken::new(),
            join_handle: None,
            log_state: None,
        }
    }

    pub fn new_configured() -> Self {
        let config = get_config();
        Self::new(DEFAULT_SERVER_NAME, config.get_base_url(), config.get_http_port())
    }

    /// Remplace le collaborateur d'autorisation (cookie `auth` par défaut)
    pub fn set_authorizer(&mut self, authorizer: Arc<dyn Authorizer>) {
        self.authorizer = authorizer;
    }

    /// Collaborateur d'autorisation partagé par les extensions
    pub fn authorizer(&self) -> Arc<dyn Authorizer> {
        self.authorizer.clone()
    }

    /// Jeton annulé à l'arrêt du serveur
    ///
    /// Les tâches de fond (heartbeat, etc.) s'y abonnent pour terminer proprement.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Ajoute une route JSON dynamique
    ///
    /// ```rust,no_run
    /// # use moonserver::Server;
    /// # #[tokio::main]
    /// # async fn main() {
    /// let mut server = Server::new("Test", "localhost", 3000);
    /// server.add_route("/info", || async {
    ///     serde_json::json!({"version": "1.0.0"})
    /// }).await;
    /// # }
    /// ```
    pub async fn add_route<F, Fut, T>(&mut self, path: &str, f: F)
    where
        F: Fn() -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        let handler = move || {
            let f = f.clone();
            async move { Json(f().await) }
        };
        self.add_router(path, Router::new().route("/", get(handler)))
            .await;
    }

    /// Ajoute un handler GET avec état
    pub async fn add_handler_with_state<H, T, S>(&mut self, path: &str, handler: H, state: S)
    where
        H: Handler<T, S> + Clone + 'static,
        T: 'static,
        S: Clone + Send + Sync + 'static,
    {
        let route = Router::new()
            .route("/", get(handler))
            .with_state(state);
        self.add_router(path, route).await;
    }

    /// Ajoute un sous-router au serveur
    ///
    /// - Si `path` est "/", merge directement au router principal
    /// - Sinon, nest le router sous le chemin donné
    pub async fn add_router(&mut self, path: &str, sub_router: Router) {
        let mut r = self.router.write().await;

        *r = if path == "/" {
            std::mem::take(&mut *r).merge(sub_router)
        } else {
            let normalized = format!("/{}", path.trim_start_matches('/'));
            std::mem::take(&mut *r).nest(&normalized, sub_router)
        };
    }

    /// Copie du router courant, pour les tests ou un serveur externe
    pub async fn router(&self) -> Router {
        self.router.read().await.clone()
    }

    /// Initialise le logging et enregistre `/log-dump`, `/log-sse` et `/api/log_setup`
    pub async fn init_logging(&mut self, options: LoggingOptions) -> LogState {
        let log_state = init_logging(options);
        self.add_router("/", create_logs_router(log_state.clone()))
            .await;
        self.log_state = Some(log_state.clone());
        log_state
    }

    pub fn log_state(&self) -> Option<LogState> {
        self.log_state.clone()
    }

    /// Démarre le serveur HTTP
    ///
    /// Le port est réservé avant le retour : une erreur de bind remonte ici.
    /// Ctrl+C ou l'annulation du jeton d'arrêt terminent le serveur proprement.
    pub async fn start(&mut self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.http_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(
            "Server {} running at http://{}:{}",
            self.name, self.base_url, self.http_port
        );

        let router = self.router.read().await.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(cancel_on_signal(signal::ctrl_c(), self.shutdown.clone()));

        self.join_handle = Some(tokio::spawn(async move {
            let served = axum::serve(listener, router.into_make_service())
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await;
            if let Err(e) = served {
                error!("HTTP server error: {}", e);
            }
        }));

        Ok(())
    }

    /// Demande l'arrêt du serveur
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Attend la fin du serveur
    pub async fn wait(&mut self) {
        if let Some(h) = self.join_handle.take() {
            let _ = h.await;
        }
    }

    /// Récupère les infos du serveur
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            name: self.name.clone(),
            base_url: self.base_url.clone(),
            http_port: self.http_port,
        }
    }
}

/// Builder pattern
pub struct ServerBuilder {
    name: String,
    base_url: String,
    http_port: u16,
}

impl ServerBuilder {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http_port,
        }
    }

    pub fn new_configured() -> Self {
        let config = get_config();
        Self {
            name: DEFAULT_SERVER_NAME.to_string(),
            base_url: config.get_base_url(),
            http_port: config.get_http_port(),
        }
    }

    pub fn http_port(mut self, port: u16) -> Self {
        self.http_port = port;
        self
    }

    /// Construit le serveur
    pub fn build(self) -> Server {
        Server::new(self.name, self.base_url, self.http_port)
    }
}

/// Annule `token` quand `signal` se déclenche
///
/// Si l'écoute du signal échoue, l'erreur est journalisée et le serveur
/// continue : seul un arrêt explicite l'interrompt alors.
async fn cancel_on_signal<F>(signal: F, token: CancellationToken)
where
    F: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        result = signal => match result {
            Ok(()) => {
                info!("Ctrl+C reçu, arrêt gracieux");
                token.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        },
        _ = token.cancelled() => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_cancels_token() {
        let token = CancellationToken::new();
        cancel_on_signal(async { Ok::<(), std::io::Error>(()) }, token.clone()).await;
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_signal_listener_error_keeps_server_running() {
        let token = CancellationToken::new();
        let failing = async { Err::<(), _>(std::io::Error::other("no signal handler")) };
        cancel_on_signal(failing, token.clone()).await;
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn test_explicit_stop_ends_the_watcher() {
        let token = CancellationToken::new();
        token.cancel();
        cancel_on_signal(std::future::pending::<std::io::Result<()>>(), token.clone()).await;
        assert!(token.is_cancelled());
    }
}
