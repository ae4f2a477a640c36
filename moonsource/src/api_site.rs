//! Adaptateur HTTP pour les API vidéo de type MacCMS
//!
//! Un site répond à `GET {api}?ac=videolist&wd=<query>[&pg=<n>]` par
//! `{"pagecount": n, "list": [{vod_id, vod_name, vod_pic, vod_play_url, ...}]}`.
//! La première page est lue, puis jusqu'à `max_pages - 1` pages suivantes en
//! parallèle. Une page suivante en échec ne perd que ses propres résultats.

use crate::error::{Result, SourceError};
use crate::models::SearchResult;
use crate::SearchSource;
use async_trait::async_trait;
use futures::future::join_all;
use moonconfig::ApiSite;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Timeout par défaut d'une requête de page
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 8;

/// Nombre de pages lues par recherche, première comprise
pub const DEFAULT_MAX_PAGES: usize = 5;

/// User-Agent par défaut
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n+").expect("valid regex"));
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").expect("valid regex"));

/// Source de recherche adossée à un site API configuré
#[derive(Debug, Clone)]
pub struct ApiSiteSource {
    client: Client,
    site: ApiSite,
    request_timeout: Duration,
    max_pages: usize,
}

impl ApiSiteSource {
    /// Crée une source avec son propre client HTTP et les réglages par défaut
    pub fn new(site: ApiSite) -> Result<Self> {
        Ok(Self::with_client(site, crate::default_client()?))
    }

    /// Crée une source partageant un pool de connexions existant
    pub fn with_client(site: ApiSite, client: Client) -> Self {
        Self {
            client,
            site,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Fixe le timeout d'une requête de page
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Fixe le nombre de pages lues par recherche, au moins une
    pub fn max_pages(mut self, pages: usize) -> Self {
        self.max_pages = pages.max(1);
        self
    }

    pub fn site(&self) -> &ApiSite {
        &self.site
    }

    fn search_url(&self, query: &str, page: Option<usize>) -> Result<Url> {
        let mut url = Url::parse(&self.site.api)?;
        url.query_pairs_mut()
            .append_pair("ac", "videolist")
            .append_pair("wd", query);
        if let Some(page) = page {
            url.query_pairs_mut().append_pair("pg", &page.to_string());
        }
        Ok(url)
    }

    async fn fetch_page(&self, query: &str, page: Option<usize>) -> Result<Value> {
        let url = self.search_url(query, page)?;
        debug!("Fetching {} page {:?}: {}", self.site.key, page, url);

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Status {
                source_key: self.site.key.clone(),
                status: response.status().as_u16(),
            });
        }

        Ok(response.json::<Value>().await?)
    }

    /// Convertit une page en résultats, sans les entrées sans épisode jouable
    fn map_page(&self, body: &Value) -> Vec<SearchResult> {
        body.get("list")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| map_item(&self.site, item))
                    .filter(|r| !r.episodes.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl SearchSource for ApiSiteSource {
    fn id(&self) -> &str {
        &self.site.key
    }

    fn name(&self) -> &str {
        &self.site.name
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let first = self.fetch_page(query, None).await?;
        let mut results = self.map_page(&first);

        let page_count = first
            .get("pagecount")
            .and_then(value_as_u64)
            .unwrap_or(1) as usize;
        let extra_pages = page_count.min(self.max_pages).saturating_sub(1);
        if extra_pages == 0 {
            return Ok(results);
        }

        let fetches = (2..=extra_pages + 1).map(|page| self.fetch_page(query, Some(page)));
        for (offset, page) in join_all(fetches).await.into_iter().enumerate() {
            match page {
                Ok(body) => results.extend(self.map_page(&body)),
                Err(e) => warn!("{} page {} failed: {}", self.site.name, offset + 2, e),
            }
        }

        Ok(results)
    }
}

/// Convertit une entrée de `list[]` ; `None` si un champ obligatoire manque
fn map_item(site: &ApiSite, item: &Value) -> Option<SearchResult> {
    let id = item.get("vod_id").and_then(value_as_string)?;
    let name = item.get("vod_name").and_then(Value::as_str)?;

    let play_url = item
        .get("vod_play_url")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let (episodes, episodes_titles) = extract_episodes(play_url);

    let year = match item.get("vod_year").and_then(value_as_string) {
        Some(raw) if !raw.is_empty() => YEAR
            .find(&raw)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
        _ => "unknown".to_string(),
    };

    Some(SearchResult {
        id,
        title: WHITESPACE.replace_all(name.trim(), " ").into_owned(),
        poster: string_field(item, "vod_pic"),
        episodes,
        episodes_titles,
        source: site.key.clone(),
        source_name: site.name.clone(),
        class: item.get("vod_class").and_then(value_as_string),
        year,
        desc: clean_html_tags(&string_field(item, "vod_content")),
        type_name: string_field(item, "type_name"),
        douban_id: item
            .get("vod_douban_id")
            .and_then(value_as_u64)
            .unwrap_or_default(),
    })
}

/// Choisit le groupe d'URLs de lecture qui a le plus d'épisodes `.m3u8`
///
/// Les groupes sont séparés par `$$$`, les épisodes par `#`, et chaque épisode
/// s'écrit `title$url`. Renvoie `(urls, titles)`.
pub fn extract_episodes(play_url: &str) -> (Vec<String>, Vec<String>) {
    let mut best: (Vec<String>, Vec<String>) = (Vec::new(), Vec::new());

    for group in play_url.split("$$$") {
        let mut urls = Vec::new();
        let mut titles = Vec::new();
        for episode in group.split('#') {
            let parts: Vec<&str> = episode.split('$').collect();
            if let [title, url] = parts.as_slice() {
                if url.ends_with(".m3u8") {
                    titles.push(title.to_string());
                    urls.push(url.to_string());
                }
            }
        }
        if urls.len() > best.0.len() {
            best = (urls, titles);
        }
    }

    best
}

/// Retire le balisage HTML d'une description
pub fn clean_html_tags(text: &str) -> String {
    let text = HTML_TAG.replace_all(text, "\n");
    let text = BLANK_LINES.replace_all(&text, "\n");
    let text = SPACES.replace_all(&text, " ");
    text.replace("&nbsp;", " ").trim().to_string()
}

fn string_field(item: &Value, key: &str) -> String {
    item.get(key).and_then(value_as_string).unwrap_or_default()
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
