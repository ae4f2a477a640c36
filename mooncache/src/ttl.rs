//! Cache en mémoire à durée de vie fixe
//!
//! Chaque entrée garde sa date d'insertion. Une entrée est valide tant que
//! `now - inserted_at < ttl` ; l'expiration n'est constatée qu'à la lecture,
//! rien ne purge le cache en arrière-plan. Une entrée périmée reste en place
//! jusqu'à ce qu'un nouvel `insert` la remplace.
//!
//! Le cache est partagé entre requêtes concurrentes : la table est protégée par
//! un `RwLock`. Deux absences simultanées sur la même clé peuvent déclencher
//! deux appels amont, le dernier `insert` gagne.

use crate::clock::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Entrée du cache : la valeur et son horodatage d'insertion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    pub payload: V,
    pub inserted_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    pub fn new(payload: V, inserted_at: DateTime<Utc>) -> Self {
        Self {
            payload,
            inserted_at,
        }
    }

    /// Vrai si l'entrée est encore lisible à l'instant `now`
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        now.signed_duration_since(self.inserted_at) < ttl
    }
}

/// Cache clé → valeur avec TTL fixe et horloge injectable
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone + Send + Sync> TtlCache<V> {
    /// Crée un cache basé sur l'horloge système
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Récupère une valeur encore valide
    pub async fn get(&self, key: &str) -> Option<V> {
        self.get_entry(key).await.map(|entry| entry.payload)
    }

    /// Récupère une entrée encore valide avec son horodatage
    pub async fn get_entry(&self, key: &str) -> Option<CacheEntry<V>> {
        let now = self.clock.now();
        let entries = self.entries.read().await;

        match entries.get(key) {
            Some(entry) if entry.is_fresh(now, self.ttl) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key, "Cache hit");
                Some(entry.clone())
            }
            Some(_) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key, "Cache entry expired");
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key, "Cache miss");
                None
            }
        }
    }

    /// Insère (ou remplace) une valeur datée de maintenant
    pub async fn insert(&self, key: impl Into<String>, payload: V) {
        let entry = CacheEntry::new(payload, self.clock.now());
        self.entries.write().await.insert(key.into(), entry);
    }

    /// Nombre d'entrées stockées, périmées comprises
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Retourne des statistiques sur le cache
    pub async fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        let fresh = entries
            .values()
            .filter(|e| e.is_fresh(now, self.ttl))
            .count();

        CacheStats {
            entries: entries.len(),
            fresh_entries: fresh,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ttl_secs: self.ttl.as_secs(),
        }
    }
}

/// Statistiques du cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Nombre total d'entrées stockées
    pub entries: usize,
    /// Entrées encore valides
    pub fresh_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub ttl_secs: u64,
}
