//! Structures échangées avec TuneHub et avec le client musical

use crate::lyrics::parse_lrc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Verbe HTTP d'un descripteur de méthode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    #[serde(alias = "get")]
    Get,
    #[serde(alias = "post")]
    Post,
}

/// Comment construire et lire une capacité d'une plateforme
///
/// Obtenu via `GET {base}/v1/methods/{platform}/{function}`. Seuls le
/// constructeur de requêtes et l'évaluateur de transformations l'interprètent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    #[serde(default)]
    pub platform: String,
    #[serde(default, alias = "functionName")]
    pub function: String,
    /// Modèle d'URL, peut contenir des placeholders comme `{{id}}`
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    /// Modèles de paramètres, dans l'ordre de déclaration
    #[serde(default)]
    pub params: IndexMap<String, Value>,
    /// En-têtes supplémentaires envoyés avec la requête
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, String>,
    /// Transformation déclarative, ou ancienne chaîne de code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Value>,
}

/// Réponse canonique de la résolution d'un morceau
///
/// `code == 0` signifie succès. Les champs amont inconnus restent dans `extra`
/// pour qu'une réponse réussie soit relayée intacte.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseEnvelope {
    #[serde(default = "failure_code")]
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn failure_code() -> i64 {
    -1
}

impl ParseEnvelope {
    /// Enveloppe d'échec portant le même texte dans `message` et `error`
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            code: -1,
            message: Some(message.clone()),
            error: Some(message),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Premier morceau jouable de `data.data`
    ///
    /// Le morceau doit porter `success: true` et une URL non vide ; ses paroles
    /// LRC sont découpées en lignes horodatées.
    pub fn first_song(&self) -> Option<ResolvedSong> {
        if !self.is_success() {
            return None;
        }
        let entry = self.data.as_ref()?.get("data")?.as_array()?.first()?;
        if entry.get("success").and_then(Value::as_bool) != Some(true) {
            return None;
        }
        let url = entry.get("url").and_then(Value::as_str).map(str::trim)?;
        if url.is_empty() {
            return None;
        }

        let text = |field: &str| {
            entry
                .get(field)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
        };
        Some(ResolvedSong {
            url: url.to_string(),
            cover: text("cover").map(str::to_string),
            lyric_lines: text("lyrics").map(parse_lrc).unwrap_or_default(),
        })
    }
}

/// Morceau résolu : URL de lecture, pochette et paroles synchronisées
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSong {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(default, rename = "lyrics")]
    pub lyric_lines: Vec<LyricLine>,
}

/// Corps de `POST /music` avec `action=parse`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParseRequest {
    #[serde(default)]
    pub platform: Option<String>,
    /// Un id, ou plusieurs séparés par des virgules
    #[serde(default)]
    pub ids: Option<Value>,
    /// Un des noms de [`Quality`] ; vide vaut le niveau par défaut
    #[serde(default)]
    pub quality: Option<String>,
}

impl ParseRequest {
    pub fn quality(&self) -> Result<Quality, String> {
        match self.quality.as_deref().map(str::trim) {
            None | Some("") => Ok(Quality::default()),
            Some(name) => name.parse(),
        }
    }
}

/// Niveaux de qualité audio proposés par le fournisseur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "128k")]
    Standard,
    #[default]
    #[serde(rename = "320k")]
    High,
    #[serde(rename = "flac")]
    Lossless,
    #[serde(rename = "flac24bit")]
    HiRes,
}

impl Quality {
    pub const ALL: [Quality; 4] = [Self::Standard, Self::High, Self::Lossless, Self::HiRes];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "128k",
            Self::High => "320k",
            Self::Lossless => "flac",
            Self::HiRes => "flac24bit",
        }
    }

    /// Niveau suivant du sélecteur de qualité, en boucle
    pub fn next(self) -> Self {
        match self {
            Self::Standard => Self::High,
            Self::High => Self::Lossless,
            Self::Lossless => Self::HiRes,
            Self::HiRes => Self::Standard,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|q| q.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown quality: {}", s))
    }
}

/// Ordre de lecture de la file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    #[default]
    Loop,
    Single,
    Random,
}

impl PlayMode {
    pub fn next(self) -> Self {
        match self {
            Self::Loop => Self::Single,
            Self::Single => Self::Random,
            Self::Random => Self::Loop,
        }
    }
}

/// Liste canonique produite par une transformation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Songs,
    Playlists,
}

impl ResultKind {
    /// Champs essayés sur la réponse brute quand aucune transformation ne s'applique
    pub fn fallback_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Songs => &["songs", "data"],
            Self::Playlists => &["list", "data"],
        }
    }
}

/// Un morceau tel que gardé dans la file du client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Song {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Une ligne de paroles horodatée
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricLine {
    /// Secondes depuis le début du morceau
    pub time: f64,
    pub text: String,
}
