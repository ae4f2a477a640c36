//! Construction des requêtes à partir des descripteurs de méthode
//!
//! Les placeholders ont la forme `{{name}}`. Les noms connus sont remplacés par
//! les arguments d'exécution ; ceux qui restent deviennent `0`, une construction
//! n'échoue donc jamais sur un argument manquant.

use crate::error::Result;
use crate::models::{HttpMethod, MethodDescriptor};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use url::Url;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("valid regex"));
static LEFTOVER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{.*?\}\}").expect("valid regex"));

/// Caractères laissés tels quels dans un segment d'URL (non réservés RFC 3986)
const URL_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Valeur des placeholders que personne n'a fournis
pub const NEUTRAL_VALUE: &str = "0";

/// Arguments d'exécution d'un appel de méthode
///
/// Démarre avec `page = 1`, `limit = 20` et `pageSize = 20`.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestArgs {
    values: IndexMap<String, String>,
}

impl Default for RequestArgs {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestArgs {
    pub fn new() -> Self {
        let mut values = IndexMap::new();
        values.insert("page".to_string(), "1".to_string());
        values.insert("limit".to_string(), "20".to_string());
        values.insert("pageSize".to_string(), "20".to_string());
        Self { values }
    }

    pub fn set(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.values.insert(name.into(), value.to_string());
        self
    }

    pub fn id(self, id: impl ToString) -> Self {
        self.set("id", id)
    }

    pub fn keyword(self, keyword: impl ToString) -> Self {
        self.set("keyword", keyword)
    }

    pub fn page(self, page: u32) -> Self {
        self.set("page", page)
    }

    /// Positionne à la fois `limit` et `pageSize`
    pub fn limit(self, limit: u32) -> Self {
        self.set("limit", limit).set("pageSize", limit)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Remplace les placeholders connus puis neutralise les autres
    pub fn substitute(&self, template: &str) -> String {
        self.render(template, |value| value.to_string())
    }

    /// Comme [`substitute`](Self::substitute), mais encode chaque valeur
    /// pour l'insérer dans une URL
    pub fn substitute_encoded(&self, template: &str) -> String {
        self.render(template, |value| utf8_percent_encode(value, URL_VALUE).to_string())
    }

    fn render(&self, template: &str, encode: impl Fn(&str) -> String) -> String {
        let resolved = PLACEHOLDER.replace_all(template, |caps: &Captures| match self.get(&caps[1]) {
            Some(value) => encode(value),
            None => caps[0].to_string(),
        });
        LEFTOVER.replace_all(&resolved, NEUTRAL_VALUE).into_owned()
    }
}

/// Requête concrète prête à être envoyée
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltRequest {
    pub method: HttpMethod,
    /// URL finale ; en GET elle porte déjà la query string
    pub url: String,
    /// Paramètres résolus, dans l'ordre du descripteur
    pub params: Vec<(String, String)>,
    /// Corps JSON des requêtes POST
    pub body: Option<Value>,
    pub headers: IndexMap<String, String>,
}

fn template_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Construit la requête décrite par `descriptor` pour `args`
///
/// Les valeurs insérées dans l'URL sont encodées ; celles des paramètres et
/// des en-têtes restent brutes. En POST, un paramètre non textuel du
/// descripteur garde son type JSON.
pub fn build_request(descriptor: &MethodDescriptor, args: &RequestArgs) -> Result<BuiltRequest> {
    let mut url = Url::parse(&args.substitute_encoded(&descriptor.url))?;

    let params: Vec<(String, String)> = descriptor
        .params
        .iter()
        .map(|(key, template)| (key.clone(), args.substitute(&template_text(template))))
        .collect();

    let headers = descriptor
        .headers
        .iter()
        .map(|(name, value)| (name.clone(), args.substitute(value)))
        .collect();

    let body = match descriptor.method {
        HttpMethod::Get => {
            if !params.is_empty() {
                let mut pairs = url.query_pairs_mut();
                for (key, value) in &params {
                    pairs.append_pair(key, value);
                }
            }
            None
        }
        HttpMethod::Post => {
            let object: Map<String, Value> = descriptor
                .params
                .iter()
                .map(|(key, template)| {
                    let value = match template {
                        Value::String(text) => Value::String(args.substitute(text)),
                        other => other.clone(),
                    };
                    (key.clone(), value)
                })
                .collect();
            Some(Value::Object(object))
        }
    };

    Ok(BuiltRequest {
        method: descriptor.method,
        url: url.to_string(),
        params,
        body,
        headers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TuneHubError;
    use serde_json::json;

    fn descriptor(url: &str, method: HttpMethod, params: Value) -> MethodDescriptor {
        MethodDescriptor {
            url: url.to_string(),
            method,
            params: serde_json::from_value(params).unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn test_substitutes_url_and_params() {
        let d = descriptor(
            "https://music.example/playlist/{{id}}",
            HttpMethod::Get,
            json!({"id": "{{id}}", "s": "{{keyword}}", "n": "{{limit}}", "offset": "{{offset}}"}),
        );
        let args = RequestArgs::new().id("42").keyword("jay chou");

        let built = build_request(&d, &args).unwrap();

        assert_eq!(
            built.url,
            "https://music.example/playlist/42?id=42&s=jay+chou&n=20&offset=0"
        );
        assert_eq!(built.params[3], ("offset".to_string(), "0".to_string()));
        assert!(built.body.is_none());
    }

    #[test]
    fn test_unresolved_placeholders_never_fail() {
        let args = RequestArgs::new();
        assert_eq!(args.substitute("{{ page }}-{{missing}}-{{a b}}"), "1-0-0");
        assert_eq!(args.substitute("plain"), "plain");
    }

    #[test]
    fn test_post_puts_params_in_body() {
        let d = descriptor(
            "https://music.example/api",
            HttpMethod::Post,
            json!({"page": "{{page}}", "type": 1000}),
        );
        let built = build_request(&d, &RequestArgs::new().page(3)).unwrap();
        assert_eq!(built.url, "https://music.example/api");
        assert_eq!(built.body, Some(json!({"page": "3", "type": 1000})));
        assert_eq!(built.params[1], ("type".to_string(), "1000".to_string()));
    }

    #[test]
    fn test_post_body_keeps_json_types() {
        let d = descriptor(
            "https://music.example/api",
            HttpMethod::Post,
            json!({"n": 30, "total": true, "filter": {"lang": "fr"}, "q": "{{keyword}}"}),
        );
        let built = build_request(&d, &RequestArgs::new().keyword("moon")).unwrap();
        assert_eq!(
            built.body,
            Some(json!({"n": 30, "total": true, "filter": {"lang": "fr"}, "q": "moon"}))
        );
    }

    #[test]
    fn test_url_values_are_percent_encoded() {
        let d = descriptor(
            "https://music.example/search/{{keyword}}",
            HttpMethod::Get,
            json!({"s": "{{keyword}}"}),
        );
        let built = build_request(&d, &RequestArgs::new().keyword("AC/DC #1")).unwrap();

        assert_eq!(
            built.url,
            "https://music.example/search/AC%2FDC%20%231?s=AC%2FDC+%231"
        );
        assert_eq!(built.params[0], ("s".to_string(), "AC/DC #1".to_string()));
    }

    #[test]
    fn test_headers_keep_raw_values() {
        let mut d = descriptor("https://music.example/{{id}}", HttpMethod::Get, json!({}));
        d.headers.insert("Referer".to_string(), "https://music.example/{{keyword}}".to_string());
        let built = build_request(&d, &RequestArgs::new().id("a b").keyword("x/y")).unwrap();

        assert_eq!(built.url, "https://music.example/a%20b");
        assert_eq!(built.headers["Referer"], "https://music.example/x/y");
    }

    #[test]
    fn test_invalid_url_is_reported() {
        let d = descriptor("not a url", HttpMethod::Get, json!({}));
        assert!(matches!(
            build_request(&d, &RequestArgs::new()),
            Err(TuneHubError::InvalidUrl(_))
        ));
    }
}
