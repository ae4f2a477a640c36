//! # moonsearch
//!
//! Recherche fédérée : une requête, toutes les sources autorisées en parallèle,
//! un seul résultat agrégé.
//!
//! - [`SearchEngine`] : fan-out avec budget de temps par source, fusion ordonnée
//! - [`ContentFilter`] : exclusion par mots bloqués sur la catégorie
//! - [`AggregationOutcome`] : résultat cachable ou non, et ses en-têtes
//! - [`SearchServerExt`] : route `GET /search` sur un `moonserver::Server`
//!
//! ```rust,ignore
//! use moonsearch::{SearchEngine, SearchRequest};
//!
//! let engine = SearchEngine::default();
//! let outcome = engine
//!     .search(SearchRequest { query: "Dune", ..Default::default() }, &sources)
//!     .await;
//! println!("{} results", outcome.results().len());
//! ```

pub mod api_rest;
pub mod config_ext;
pub mod engine;
pub mod error;
pub mod filter;
pub mod policy;
pub mod server_ext;

pub use api_rest::{ConfiguredSources, SearchResponse, SearchState, SourceProvider, create_router};
pub use config_ext::{SearchConfigExt, SearchSettings};
pub use engine::{AggregationOutcome, DEFAULT_SOURCE_TIMEOUT, SearchEngine, SearchRequest};
pub use error::{Result, SearchError};
pub use filter::ContentFilter;
pub use policy::cache_headers;
pub use server_ext::SearchServerExt;
