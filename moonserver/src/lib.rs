//! # moonserver - Serveur web haut niveau basé sur Axum
//!
//! Cette crate fournit le serveur HTTP de MoonHub. Les autres crates s'y
//! branchent par des traits d'extension (`SearchServerExt`, `TuneHubServerExt`)
//! sans que `moonserver` ne les connaisse.
//!
//! ## Modules
//!
//! - [`server`] : serveur principal et builder
//! - [`logs`] : buffer de logs, flux SSE, niveau réglable
//! - [`auth`] : identification de l'appelant (cookie `auth`)
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use moonserver::{ServerBuilder, logs::LoggingOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut server = ServerBuilder::new("MyServer", "localhost", 8080).build();
//!     server.init_logging(LoggingOptions::default()).await;
//!
//!     server.add_route("/api/status", || async {
//!         serde_json::json!({"status": "ok"})
//!     }).await;
//!
//!     server.start().await?;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod logs;
pub mod server;

pub use auth::{AUTH_COOKIE, AuthInfo, Authorizer, CookieAuthorizer};
pub use logs::{BufferLayer, LogState, LoggingOptions, log_dump, log_sse};
pub use server::{Server, ServerBuilder, ServerInfo};
