//! # moontune
//!
//! Passerelle vers l'API musicale TuneHub.
//!
//! - [`Gateway`] : lectures mises en cache 24 h, résolution des morceaux,
//!   relais GET et POST
//! - [`build_request`] : descripteur de méthode + arguments → requête concrète
//! - [`apply_transform`] : réponse brute → liste canonique (chansons ou playlists)
//! - [`parse_lrc`] : paroles LRC → lignes horodatées
//! - [`SnapshotHeartbeat`] : sauvegarde de l'état du lecteur client
//! - [`TuneHubServerExt`] : routes `/music` sur un `moonserver::Server`
//!
//! ```rust,ignore
//! use moontune::{Gateway, RequestArgs, ResultKind, TuneHubConfigExt};
//!
//! let gateway = Gateway::new(moonconfig::get_config().get_tunehub_settings()?)?;
//! let songs = gateway
//!     .run_method("netease", "search", &RequestArgs::new().keyword("晴天"), ResultKind::Songs)
//!     .await?;
//! ```

pub mod api_rest;
pub mod config_ext;
pub mod error;
pub mod gateway;
pub mod lyrics;
pub mod models;
pub mod request;
pub mod server_ext;
pub mod snapshot;
pub mod transform;

pub use api_rest::{MusicState, create_router};
pub use config_ext::TuneHubConfigExt;
pub use error::{Result, TuneHubError};
pub use gateway::{
    DEFAULT_BASE_URL, DEFAULT_CACHE_TTL, Gateway, TuneHubSettings, USER_AGENT, normalize_envelope,
};
pub use lyrics::{current_line, parse_lrc};
pub use models::{
    HttpMethod, LyricLine, MethodDescriptor, ParseEnvelope, ParseRequest, PlayMode, Quality,
    ResolvedSong, ResultKind, Song,
};
pub use request::{BuiltRequest, NEUTRAL_VALUE, RequestArgs, build_request};
pub use server_ext::TuneHubServerExt;
pub use snapshot::{
    ClientPlaybackSnapshot, HEARTBEAT_INTERVAL, PlaybackStore, PlayerView, SNAPSHOT_KEY,
    SnapshotHeartbeat,
};
pub use transform::{FieldRule, FieldSpec, TransformSpec, apply_transform, lookup, probe_fallback};
