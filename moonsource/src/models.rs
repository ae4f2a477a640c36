//! Types partagés par toutes les sources de recherche

use serde::{Deserialize, Serialize};

/// Un résultat de recherche, tel que l'affiche le front-end
///
/// Les noms de champs JSON sont ceux que lisent les pages du lecteur ; certains
/// ne disent pas ce qu'ils contiennent : `desc` est la description, `type_name`
/// le libellé de catégorie et `douban_id` la référence de notation externe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub poster: String,
    /// URLs jouables des épisodes, dans l'ordre
    #[serde(default)]
    pub episodes: Vec<String>,
    /// Titres des épisodes, parallèles à `episodes`
    #[serde(default)]
    pub episodes_titles: Vec<String>,
    /// Clé de la source qui a produit ce résultat
    pub source: String,
    pub source_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub type_name: String,
    #[serde(default)]
    pub douban_id: u64,
}

impl SearchResult {
    /// Résultat minimal, pour les tests et les adaptateurs qui remplissent les champs un à un
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        source: impl Into<String>,
        source_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            poster: String::new(),
            episodes: Vec::new(),
            episodes_titles: Vec::new(),
            source: source.into(),
            source_name: source_name.into(),
            class: None,
            year: String::new(),
            desc: String::new(),
            type_name: String::new(),
            douban_id: 0,
        }
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_field_names() {
        let result = SearchResult::new("42", "Kind of Blue", "alpha", "Alpha").with_type_name("纪录片");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type_name"], "纪录片");
        assert_eq!(json["source_name"], "Alpha");
        assert!(json.get("class").is_none());
        assert_eq!(json["episodes"], serde_json::json!([]));
    }
}
