//! Transformations déclaratives des réponses
//!
//! Un descripteur peut porter un objet de transformation :
//!
//! ```json
//! {
//!   "root": "result.songs",
//!   "fields": {
//!     "id": "id",
//!     "name": "name",
//!     "artist": { "path": "ar.*.name", "join": "/" },
//!     "album": { "path": "al.name", "default": "" },
//!     "link": { "template": "https://music.example/song/{{id}}" }
//!   }
//! }
//! ```
//!
//! Les chemins sont séparés par des points. Un segment numérique indexe un
//! tableau, `*` applique la suite du chemin à chaque élément. L'évaluateur ne
//! fait que lire la réponse, aucun code n'est exécuté : les chaînes de code des
//! anciens descripteurs sont refusées et toute erreur se replie sur les champs
//! connus.

use crate::error::{Result, TuneHubError};
use crate::models::ResultKind;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

static TEMPLATE_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([\w.*]+)\s*\}\}").expect("valid regex"));

/// Objet de transformation porté par un descripteur de méthode
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformSpec {
    /// Chemin du tableau d'éléments ; la réponse elle-même s'il est absent
    #[serde(default)]
    pub root: Option<String>,
    /// Nom du champ produit vers sa règle d'extraction
    pub fields: IndexMap<String, FieldRule>,
}

/// Règle d'extraction d'un champ produit
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldRule {
    /// Raccourci pour `{ "path": ... }`
    Path(String),
    Detailed(FieldSpec),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    #[serde(default)]
    pub path: Option<String>,
    /// Chemins essayés dans l'ordre quand `path` ne donne rien
    #[serde(default)]
    pub fallback: Vec<String>,
    /// Joint un résultat tableau en une chaîne
    #[serde(default)]
    pub join: Option<String>,
    /// Chaîne avec des références `{{path}}` vers l'élément
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub default: Option<Value>,
}

impl TransformSpec {
    /// Lit la valeur `transform` d'un descripteur
    pub fn from_value(raw: &Value) -> Result<Self> {
        match raw {
            Value::String(_) => Err(TuneHubError::Transform(
                "code transforms are not evaluated".to_string(),
            )),
            other => serde_json::from_value(other.clone())
                .map_err(|e| TuneHubError::Transform(format!("invalid transform: {}", e))),
        }
    }

    /// Transforme chaque élément sous `root` en objet portant les champs déclarés
    pub fn evaluate(&self, payload: &Value) -> Result<Vec<Value>> {
        let items = match self.root.as_deref() {
            Some(root) if !root.is_empty() => lookup(payload, root),
            _ => Some(payload.clone()),
        };

        let items = match items {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(TuneHubError::Transform(format!(
                    "'{}' is not an array",
                    self.root.as_deref().unwrap_or("")
                )));
            }
            None => {
                return Err(TuneHubError::Transform(format!(
                    "'{}' not found",
                    self.root.as_deref().unwrap_or("")
                )));
            }
        };

        items
            .iter()
            .map(|item| {
                let mut out = Map::new();
                for (name, rule) in &self.fields {
                    out.insert(name.clone(), rule.extract(name, item)?);
                }
                Ok(Value::Object(out))
            })
            .collect()
    }
}

impl FieldRule {
    fn extract(&self, name: &str, item: &Value) -> Result<Value> {
        match self {
            Self::Path(path) => Ok(lookup(item, path).unwrap_or(Value::Null)),
            Self::Detailed(spec) => spec.extract(name, item),
        }
    }
}

impl FieldSpec {
    fn extract(&self, name: &str, item: &Value) -> Result<Value> {
        if let Some(template) = &self.template {
            let rendered = TEMPLATE_FIELD.replace_all(template, |caps: &Captures| {
                lookup(item, &caps[1]).map(|v| text(&v)).unwrap_or_default()
            });
            return Ok(Value::String(rendered.into_owned()));
        }

        let Some(path) = &self.path else {
            return Err(TuneHubError::Transform(format!(
                "field '{}' has neither path nor template",
                name
            )));
        };

        let found = std::iter::once(path)
            .chain(self.fallback.iter())
            .filter_map(|p| lookup(item, p))
            .find(|v| !v.is_null());

        let value = match (found, &self.join) {
            (Some(Value::Array(values)), Some(separator)) => Value::String(
                values
                    .iter()
                    .map(text)
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(separator),
            ),
            (Some(value), _) => value,
            (None, _) => self.default.clone().unwrap_or(Value::Null),
        };
        Ok(value)
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Suit un chemin pointé ; `*` parcourt les tableaux
pub fn lookup(value: &Value, path: &str) -> Option<Value> {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    lookup_segments(value, &segments)
}

fn lookup_segments(value: &Value, segments: &[&str]) -> Option<Value> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(value.clone());
    };

    match (*head, value) {
        ("*", Value::Array(items)) => Some(Value::Array(
            items
                .iter()
                .filter_map(|item| lookup_segments(item, rest))
                .collect(),
        )),
        (key, Value::Object(map)) => map.get(key).and_then(|v| lookup_segments(v, rest)),
        (index, Value::Array(items)) => index
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .and_then(|v| lookup_segments(v, rest)),
        _ => None,
    }
}

/// Premier champ tableau connu de la réponse brute, sinon une liste vide
pub fn probe_fallback(payload: &Value, kind: ResultKind) -> Vec<Value> {
    for field in kind.fallback_fields() {
        if let Some(Value::Array(items)) = payload.get(*field) {
            debug!("Using fallback field '{}' ({} items)", field, items.len());
            return items.clone();
        }
    }
    Vec::new()
}

/// Produit la liste canonique de `payload`
///
/// N'échoue jamais : sans transformation valide, on se replie sur
/// [`probe_fallback`].
pub fn apply_transform(payload: &Value, transform: Option<&Value>, kind: ResultKind) -> Vec<Value> {
    if let Some(raw) = transform {
        match TransformSpec::from_value(raw).and_then(|spec| spec.evaluate(payload)) {
            Ok(items) => return items,
            Err(e) => warn!("{}, probing fallback fields", e),
        }
    }
    probe_fallback(payload, kind)
}
