//! Authorization collaborator
//!
//! The front-end stores the logged-in user in an `auth` cookie holding
//! URL-encoded JSON such as `{"username":"alice","role":"user"}`. Handlers only
//! need to know who is calling; password checks happen elsewhere.

use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::debug;

/// Name of the session cookie
pub const AUTH_COOKIE: &str = "auth";

/// Identity extracted from a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    pub username: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Decides who is calling
pub trait Authorizer: Debug + Send + Sync {
    /// `None` when the request carries no usable identity
    fn authorize(&self, headers: &HeaderMap) -> Option<AuthInfo>;
}

/// Reads the identity from the `auth` cookie
#[derive(Debug, Clone, Copy, Default)]
pub struct CookieAuthorizer;

impl CookieAuthorizer {
    /// Decodes a raw cookie value
    pub fn decode(raw: &str) -> Option<AuthInfo> {
        let decoded = urlencoding::decode(raw).ok()?;
        let info: AuthInfo = match serde_json::from_str(&decoded) {
            Ok(info) => info,
            Err(e) => {
                debug!("Unreadable auth cookie: {}", e);
                return None;
            }
        };
        (!info.username.trim().is_empty()).then_some(info)
    }
}

impl Authorizer for CookieAuthorizer {
    fn authorize(&self, headers: &HeaderMap) -> Option<AuthInfo> {
        let jar = CookieJar::from_headers(headers);
        let cookie = jar.get(AUTH_COOKIE)?;
        Self::decode(cookie.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, cookie.parse().unwrap());
        headers
    }

    #[test]
    fn test_reads_encoded_cookie() {
        let value = urlencoding::encode(r#"{"username":"alice","role":"owner"}"#);
        let info = CookieAuthorizer
            .authorize(&headers(&format!("theme=dark; auth={}", value)))
            .unwrap();
        assert_eq!(info.username, "alice");
        assert_eq!(info.role.as_deref(), Some("owner"));
    }

    #[test]
    fn test_rejects_missing_or_anonymous() {
        assert!(CookieAuthorizer.authorize(&HeaderMap::new()).is_none());
        assert!(CookieAuthorizer.authorize(&headers("auth=garbage")).is_none());

        let blank = urlencoding::encode(r#"{"username":"  "}"#);
        assert!(
            CookieAuthorizer
                .authorize(&headers(&format!("auth={}", blank)))
                .is_none()
        );
    }
}
