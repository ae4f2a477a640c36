//! Politique de cache des réponses de recherche
//!
//! Une réponse cachable porte la même durée sur les en-têtes standard, CDN et
//! edge, plus `Netlify-Vary: query` pour que l'edge distingue les requêtes.

use crate::error::Result;
use axum::http::{HeaderMap, HeaderName, HeaderValue, header::CACHE_CONTROL};

pub const CDN_CACHE_CONTROL: HeaderName = HeaderName::from_static("cdn-cache-control");
pub const VERCEL_CDN_CACHE_CONTROL: HeaderName =
    HeaderName::from_static("vercel-cdn-cache-control");
pub const NETLIFY_VARY: HeaderName = HeaderName::from_static("netlify-vary");

/// En-têtes de cache pour une durée `max_age` en secondes
pub fn cache_headers(max_age: usize) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_str(&format!("public, max-age={max_age}, s-maxage={max_age}"))?,
    );
    let shared = HeaderValue::from_str(&format!("public, s-maxage={max_age}"))?;
    headers.insert(CDN_CACHE_CONTROL, shared.clone());
    headers.insert(VERCEL_CDN_CACHE_CONTROL, shared);
    headers.insert(NETLIFY_VARY, HeaderValue::from_static("query"));
    Ok(headers)
}
