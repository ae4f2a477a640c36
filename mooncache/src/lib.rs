//! # mooncache - Caches et stockage pour MoonHub
//!
//! - [`TtlCache`] : cache en mémoire à durée de vie fixe, expiration constatée à la
//!   lecture, horloge injectable ([`Clock`], [`SystemClock`], [`ManualClock`])
//! - [`KeyValueStore`] : stockage clé-valeur de blobs JSON ([`MemoryStore`], [`FileStore`])
//!
//! ```rust
//! use mooncache::TtlCache;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache = TtlCache::new(Duration::from_secs(24 * 3600));
//! cache.insert("methods-all", serde_json::json!({"code": 0})).await;
//! assert!(cache.get("methods-all").await.is_some());
//! # }
//! ```

pub mod clock;
pub mod error;
pub mod store;
pub mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CacheError, Result};
pub use store::{FileStore, KeyValueStore, KeyValueStoreExt, MemoryStore};
pub use ttl::{CacheEntry, CacheStats, TtlCache};
