//! Passerelle TuneHub
//!
//! Les lectures (`methods`, `platform-methods`, `method-config`, `proxy`) passent
//! par un [`TtlCache`] partagé : un hit renvoie la charge stockée sans appel
//! amont, un miss fait exactement un appel puis stocke le JSON. Deux miss
//! simultanés sur la même clé peuvent faire deux appels ; le cache reste cohérent.
//!
//! Les écritures (`parse`, relais POST) ne sont jamais mises en cache. Le
//! relais POST accepte n'importe quelle URL : il n'est protégé que par le
//! feature flag et l'authentification de l'appelant.

use crate::error::{Result, TuneHubError};
use crate::models::{
    HttpMethod, MethodDescriptor, ParseEnvelope, ParseRequest, Quality, ResolvedSong, ResultKind,
};
use crate::request::{RequestArgs, build_request};
use crate::transform::apply_transform;
use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use indexmap::IndexMap;
use mooncache::{CacheStats, Clock, SystemClock, TtlCache};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// URL de l'API quand ni la configuration ni l'environnement n'en donnent une
pub const DEFAULT_BASE_URL: &str = "https://tunehub.sayqz.com/api";

/// Durée de vie des entrées du cache
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 3600);

/// User-Agent envoyé à l'amont, certains hôtes filtrant les clients nus
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const PARSE_FAILED: &str = "parse failed";
const PARSE_REQUEST_FAILED: &str = "parse request failed";

/// Réglages de la passerelle
#[derive(Debug, Clone, PartialEq)]
pub struct TuneHubSettings {
    pub enabled: bool,
    pub base_url: String,
    /// Clé fournisseur, requise pour `parse`
    pub api_key: Option<String>,
    pub cache_ttl: Duration,
}

impl Default for TuneHubSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

/// Passerelle vers l'API TuneHub
pub struct Gateway {
    client: reqwest::Client,
    settings: TuneHubSettings,
    cache: TtlCache<Value>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("enabled", &self.settings.enabled)
            .field("base_url", &self.settings.base_url)
            .field("has_api_key", &self.settings.api_key.is_some())
            .finish()
    }
}

impl Gateway {
    /// Crée une passerelle avec un client HTTP par défaut
    pub fn new(settings: TuneHubSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self::with_client(settings, client))
    }

    pub fn with_client(settings: TuneHubSettings, client: reqwest::Client) -> Self {
        Self::with_clock(settings, client, Arc::new(SystemClock))
    }

    /// Horloge injectable, pour tester l'expiration sans attendre
    pub fn with_clock(settings: TuneHubSettings, client: reqwest::Client, clock: Arc<dyn Clock>) -> Self {
        let cache = TtlCache::with_clock(settings.cache_ttl, clock);
        Self {
            client,
            settings,
            cache,
        }
    }

    pub fn settings(&self) -> &TuneHubSettings {
        &self.settings
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    fn ensure_enabled(&self) -> Result<()> {
        if self.settings.enabled {
            Ok(())
        } else {
            Err(TuneHubError::Disabled)
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    async fn fetch_json(&self, url: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TuneHubError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    /// Lecture via le cache ; `url` n'est construite qu'en cas de miss
    async fn cached<F>(&self, key: String, url: F) -> Result<Value>
    where
        F: FnOnce() -> Result<String>,
    {
        if let Some(payload) = self.cache.get(&key).await {
            return Ok(payload);
        }

        let url = url()?;
        debug!("Fetching {} for {}", url, key);
        let payload = self.fetch_json(&url).await?;
        self.cache.insert(key, payload.clone()).await;
        Ok(payload)
    }

    /// Toutes les méthodes de toutes les plateformes
    pub async fn methods(&self) -> Result<Value> {
        self.ensure_enabled()?;
        let url = self.endpoint("/v1/methods");
        self.cached("methods-all".to_string(), || Ok(url)).await
    }

    /// Méthodes d'une plateforme
    pub async fn platform_methods(&self, platform: &str) -> Result<Value> {
        self.ensure_enabled()?;
        let platform = required(platform, "platform")?;
        let url = self.endpoint(&format!("/v1/methods/{}", platform));
        self.cached(format!("platform-methods-{}", platform), || Ok(url))
            .await
    }

    /// Descripteur brut d'une méthode
    pub async fn method_config(&self, platform: &str, function: &str) -> Result<Value> {
        self.ensure_enabled()?;
        let platform = required(platform, "platform")?;
        let function = required(function, "function")?;
        let url = self.endpoint(&format!("/v1/methods/{}/{}", platform, function));
        self.cached(format!("method-config-{}-{}", platform, function), || Ok(url))
            .await
    }

    /// Proxy GET générique
    ///
    /// La clé de cache est l'URL cible telle que reçue, avant l'ajout des
    /// paramètres `extra` : deux requêtes qui ne diffèrent que par ces
    /// paramètres partagent donc la même entrée.
    pub async fn proxy(&self, target: &str, extra: &[(String, String)]) -> Result<Value> {
        self.ensure_enabled()?;
        let target = required(target, "url")?;
        self.cached(format!("proxy-{}", target), || {
            let mut url = Url::parse(target)?;
            if !extra.is_empty() {
                let mut pairs = url.query_pairs_mut();
                for (key, value) in extra {
                    pairs.append_pair(key, value);
                }
            }
            Ok(url.to_string())
        })
        .await
    }

    /// Résolution des URLs de lecture
    ///
    /// Les erreurs de l'appelant (clé absente, paramètres manquants) sont des
    /// `Err`. Les échecs amont sont réécrits en [`ParseEnvelope`] avec `code = -1`.
    pub async fn parse(&self, request: ParseRequest) -> Result<ParseEnvelope> {
        self.ensure_enabled()?;
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(TuneHubError::MissingApiKey)?;
        let quality = request.quality().map_err(TuneHubError::InvalidBody)?;
        let platform = request
            .platform
            .filter(|p| !p.trim().is_empty())
            .ok_or(TuneHubError::MissingParam("platform"))?;
        let ids = request
            .ids
            .filter(|ids| !is_blank(ids))
            .ok_or(TuneHubError::MissingParam("ids"))?;

        let body = json!({ "platform": platform, "ids": ids, "quality": quality });
        debug!("Parsing {} on {} at {}", ids, platform, quality);

        match self.post_parse(api_key, &body).await {
            Ok((ok, envelope)) => Ok(normalize_envelope(ok, envelope)),
            Err(e) => {
                warn!("Parse request to TuneHub failed: {}", e);
                Ok(ParseEnvelope {
                    code: -1,
                    message: Some(PARSE_REQUEST_FAILED.to_string()),
                    error: Some(e.to_string()),
                    ..Default::default()
                })
            }
        }
    }

    async fn post_parse(&self, api_key: &str, body: &Value) -> Result<(bool, ParseEnvelope)> {
        let response = self
            .client
            .post(self.endpoint("/v1/parse"))
            .header(header::USER_AGENT, USER_AGENT)
            .header("X-API-Key", api_key)
            .json(body)
            .send()
            .await?;
        let ok = response.status().is_success();
        let envelope = response.json::<ParseEnvelope>().await?;
        Ok((ok, envelope))
    }

    /// Résout un morceau en URL de lecture, pochette et paroles synchronisées
    ///
    /// `Ok(None)` quand l'amont répond sans morceau jouable. Un échec amont
    /// devient [`TuneHubError::Upstream`] avec le message normalisé.
    pub async fn resolve_song(&self, platform: &str, id: &str, quality: Quality) -> Result<Option<ResolvedSong>> {
        let request = ParseRequest {
            platform: Some(platform.to_string()),
            ids: Some(Value::String(id.to_string())),
            quality: Some(quality.to_string()),
        };
        let envelope = self.parse(request).await?;
        if !envelope.is_success() {
            let reason = envelope.message.unwrap_or_else(|| PARSE_FAILED.to_string());
            return Err(TuneHubError::Upstream(reason));
        }

        let song = envelope.first_song();
        match &song {
            Some(song) => debug!("Resolved {} on {} ({} lyric lines)", id, platform, song.lyric_lines.len()),
            None => warn!("No playable url for {} on {}", id, platform),
        }
        Ok(song)
    }

    /// Relais POST vers une URL fournie par l'appelant
    ///
    /// `Content-Type: application/json` par défaut, remplacé par `headers` si
    /// besoin. La réponse JSON est renvoyée telle quelle.
    pub async fn proxy_post(
        &self,
        url: &str,
        data: Option<&Value>,
        headers: &IndexMap<String, String>,
    ) -> Result<Value> {
        self.ensure_enabled()?;
        let target = Url::parse(required(url, "url")?)?;
        warn!("Relaying POST to caller-supplied URL {}", target);

        let mut header_map = HeaderMap::new();
        header_map.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        header_map.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| TuneHubError::InvalidBody(format!("invalid header name {}", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| TuneHubError::InvalidBody(format!("invalid value for header {}", name)))?;
            header_map.insert(name, value);
        }

        let mut request = self.client.post(target).headers(header_map);
        if let Some(data) = data {
            request = request.body(serde_json::to_vec(data)?);
        }

        let response = request.send().await?;
        Ok(response.json().await?)
    }

    /// Descripteur typé d'une méthode, s'il est disponible
    pub async fn method_descriptor(&self, platform: &str, function: &str) -> Result<MethodDescriptor> {
        let raw = self.method_config(platform, function).await?;
        let data = match (raw.get("code").and_then(Value::as_i64), raw.get("data")) {
            (Some(0), Some(data)) if !data.is_null() => data.clone(),
            _ => {
                return Err(TuneHubError::Upstream(format!(
                    "no method config for {}/{}",
                    platform, function
                )));
            }
        };

        let mut descriptor: MethodDescriptor = serde_json::from_value(data)?;
        if descriptor.platform.is_empty() {
            descriptor.platform = platform.to_string();
        }
        if descriptor.function.is_empty() {
            descriptor.function = function.to_string();
        }
        Ok(descriptor)
    }

    /// Exécute une méthode de bout en bout
    ///
    /// Descripteur, construction de la requête, appel (GET via le cache du
    /// proxy), puis transformation en liste canonique.
    pub async fn run_method(
        &self,
        platform: &str,
        function: &str,
        args: &RequestArgs,
        kind: ResultKind,
    ) -> Result<Vec<Value>> {
        let descriptor = self.method_descriptor(platform, function).await?;
        let request = build_request(&descriptor, args)?;

        let payload = match request.method {
            HttpMethod::Get => self.proxy(&request.url, &[]).await?,
            HttpMethod::Post => {
                self.proxy_post(&request.url, request.body.as_ref(), &request.headers)
                    .await?
            }
        };

        let items = apply_transform(&payload, descriptor.transform.as_ref(), kind);
        info!("{}/{} returned {} items", platform, function, items.len());
        Ok(items)
    }
}

fn required<'a>(value: &'a str, name: &'static str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        Err(TuneHubError::MissingParam(name))
    } else {
        Ok(value)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Forme canonique d'une réponse de `parse`
///
/// Un succès (`ok` et `code == 0`) passe tel quel. Sinon seuls `code`, `message`
/// et `error` sont gardés, chacun complété par l'autre puis par un message générique.
pub fn normalize_envelope(ok: bool, envelope: ParseEnvelope) -> ParseEnvelope {
    if ok && envelope.is_success() {
        return envelope;
    }

    let message = non_blank(envelope.message);
    let error = non_blank(envelope.error);
    ParseEnvelope {
        code: if envelope.code != 0 { envelope.code } else { -1 },
        message: message.clone().or_else(|| error.clone()).or_else(|| Some(PARSE_FAILED.to_string())),
        error: error.or(message).or_else(|| Some(PARSE_FAILED.to_string())),
        ..Default::default()
    }
}
