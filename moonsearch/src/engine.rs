//! Moteur de recherche fédérée
//!
//! Une requête est envoyée à toutes les sources en parallèle. Chaque source
//! dispose du même budget de temps ; au-delà, son futur est abandonné, ce qui
//! ferme la requête HTTP en cours. Une source en erreur ou hors délai
//! contribue une liste vide et n'interrompt jamais les autres.
//!
//! L'ordre du résultat est fixe : index local d'abord, puis chaque source dans
//! l'ordre de la liste, quel que soit l'ordre d'arrivée des réponses.

use crate::error::Result;
use crate::filter::ContentFilter;
use crate::policy::cache_headers;
use axum::http::HeaderMap;
use futures::future::join_all;
use moonsource::{SearchResult, SearchSource};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Budget par défaut d'une source
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(20);

/// Résultat agrégé d'une recherche
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationOutcome {
    /// Résultats à servir avec les en-têtes de cache
    Cacheable(Vec<SearchResult>),
    /// Résultats à ne jamais mettre en cache
    Uncached(Vec<SearchResult>),
}

impl AggregationOutcome {
    pub fn results(&self) -> &[SearchResult] {
        match self {
            Self::Cacheable(results) | Self::Uncached(results) => results,
        }
    }

    pub fn into_results(self) -> Vec<SearchResult> {
        match self {
            Self::Cacheable(results) | Self::Uncached(results) => results,
        }
    }

    pub fn is_cacheable(&self) -> bool {
        matches!(self, Self::Cacheable(_))
    }

    /// En-têtes à joindre à la réponse ; vides si la réponse n'est pas cachable
    pub fn headers(&self, max_age: usize) -> Result<HeaderMap> {
        if self.is_cacheable() {
            cache_headers(max_age)
        } else {
            Ok(HeaderMap::new())
        }
    }
}

/// Paramètres d'une recherche
#[derive(Debug, Clone, Default)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    /// Résultats de l'index local déjà calculés
    pub local: Vec<SearchResult>,
    /// `None` désactive le filtre de contenu
    pub filter: Option<&'a ContentFilter>,
}

/// Moteur de fan-out
#[derive(Debug, Clone)]
pub struct SearchEngine {
    source_timeout: Duration,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_TIMEOUT)
    }
}

impl SearchEngine {
    pub fn new(source_timeout: Duration) -> Self {
        Self { source_timeout }
    }

    pub fn source_timeout(&self) -> Duration {
        self.source_timeout
    }

    /// Interroge une source sous le budget de temps ; ne renvoie jamais d'erreur
    async fn settle(&self, source: &dyn SearchSource, query: &str) -> Vec<SearchResult> {
        let started = Instant::now();
        match timeout(self.source_timeout, source.search(query)).await {
            Ok(Ok(results)) => {
                debug!(
                    "{} answered {} results in {:?}",
                    source.name(),
                    results.len(),
                    started.elapsed()
                );
                results
            }
            Ok(Err(e)) => {
                warn!("Search failed on {}: {}", source.name(), e);
                Vec::new()
            }
            Err(_) => {
                warn!(
                    "Search on {} timed out after {:?}",
                    source.name(),
                    self.source_timeout
                );
                Vec::new()
            }
        }
    }

    /// Lance la requête sur toutes les sources et attend qu'elles aient toutes répondu
    ///
    /// Retourne une liste par source, dans l'ordre de `sources`.
    pub async fn fan_out(&self, query: &str, sources: &[Arc<dyn SearchSource>]) -> Vec<Vec<SearchResult>> {
        join_all(sources.iter().map(|source| self.settle(source.as_ref(), query))).await
    }

    /// Recherche complète : fan-out, fusion, filtre et politique de cache
    ///
    /// Une requête vide ne touche aucune source et reste cachable. Un résultat
    /// vide après filtrage ne l'est jamais.
    pub async fn search(
        &self,
        request: SearchRequest<'_>,
        sources: &[Arc<dyn SearchSource>],
    ) -> AggregationOutcome {
        if request.query.is_empty() {
            return AggregationOutcome::Cacheable(Vec::new());
        }

        let per_source = self.fan_out(request.query, sources).await;

        let mut merged = request.local;
        merged.extend(per_source.into_iter().flatten());

        let merged = match request.filter {
            Some(filter) => filter.apply(merged),
            None => merged,
        };

        debug!(
            "Search '{}' over {} sources: {} results",
            request.query,
            sources.len(),
            merged.len()
        );

        if merged.is_empty() {
            AggregationOutcome::Uncached(merged)
        } else {
            AggregationOutcome::Cacheable(merged)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use moonsource::SourceError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    enum Behaviour {
        Answer(Vec<&'static str>),
        Fail,
        Hang,
        Slow(Duration, Vec<&'static str>),
    }

    #[derive(Debug)]
    struct MockSource {
        key: &'static str,
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl MockSource {
        fn new(key: &'static str, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                key,
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }

        fn results(&self, ids: &[&str]) -> Vec<SearchResult> {
            ids.iter()
                .map(|id| SearchResult::new(*id, *id, self.key, self.key).with_type_name("剧情片"))
                .collect()
        }
    }

    #[async_trait]
    impl SearchSource for MockSource {
        fn id(&self) -> &str {
            self.key
        }

        fn name(&self) -> &str {
            self.key
        }

        async fn search(&self, _query: &str) -> moonsource::Result<Vec<SearchResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behaviour {
                Behaviour::Answer(ids) => Ok(self.results(ids)),
                Behaviour::Fail => Err(SourceError::other("boom")),
                Behaviour::Hang => std::future::pending().await,
                Behaviour::Slow(delay, ids) => {
                    tokio::time::sleep(*delay).await;
                    Ok(self.results(ids))
                }
            }
        }
    }

    fn ids(outcome: &AggregationOutcome) -> Vec<String> {
        outcome.results().iter().map(|r| r.id.clone()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_isolated_and_order_is_fixed() {
        let sources: Vec<Arc<dyn SearchSource>> = vec![
            MockSource::new("slow", Behaviour::Slow(Duration::from_secs(5), vec!["s1"])),
            MockSource::new("broken", Behaviour::Fail),
            MockSource::new("hung", Behaviour::Hang),
            MockSource::new("fast", Behaviour::Answer(vec!["f1", "f2"])),
        ];
        let engine = SearchEngine::new(Duration::from_secs(20));

        let started = tokio::time::Instant::now();
        let outcome = engine
            .search(
                SearchRequest {
                    query: "dune",
                    local: vec![SearchResult::new("l1", "l1", "openlist", "私人影库")],
                    filter: None,
                },
                &sources,
            )
            .await;

        assert_eq!(ids(&outcome), vec!["l1", "s1", "f1", "f2"]);
        assert!(outcome.is_cacheable());
        // Bounded by one budget, not by the number of sources
        assert!(started.elapsed() <= Duration::from_secs(21));
    }

    #[tokio::test]
    async fn test_empty_query_touches_no_source() {
        let source = MockSource::new("a", Behaviour::Answer(vec!["1"]));
        let sources: Vec<Arc<dyn SearchSource>> = vec![source.clone()];

        let outcome = SearchEngine::default()
            .search(SearchRequest::default(), &sources)
            .await;

        assert!(outcome.results().is_empty());
        assert!(outcome.is_cacheable());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_sources_failing_is_uncached_empty() {
        let sources: Vec<Arc<dyn SearchSource>> = vec![
            MockSource::new("a", Behaviour::Fail),
            MockSource::new("b", Behaviour::Fail),
        ];
        let outcome = SearchEngine::default()
            .search(
                SearchRequest {
                    query: "x",
                    ..Default::default()
                },
                &sources,
            )
            .await;

        assert_eq!(outcome, AggregationOutcome::Uncached(Vec::new()));
        assert!(outcome.headers(7200).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_filter_both_branches() {
        let sources: Vec<Arc<dyn SearchSource>> =
            vec![MockSource::new("a", Behaviour::Answer(vec!["1", "2"]))];
        let filter = ContentFilter::new(["剧情"]);
        let engine = SearchEngine::default();

        let filtered = engine
            .search(
                SearchRequest {
                    query: "x",
                    local: Vec::new(),
                    filter: Some(&filter),
                },
                &sources,
            )
            .await;
        assert_eq!(filtered, AggregationOutcome::Uncached(Vec::new()));

        let unfiltered = engine
            .search(
                SearchRequest {
                    query: "x",
                    local: Vec::new(),
                    filter: None,
                },
                &sources,
            )
            .await;
        assert_eq!(ids(&unfiltered), vec!["1", "2"]);
        assert!(unfiltered.headers(60).unwrap().contains_key("cdn-cache-control"));
    }
}
