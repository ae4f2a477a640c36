//! Filtre de contenu par liste de mots bloqués
//!
//! Un résultat est écarté dès que son libellé de catégorie (`type_name`)
//! contient l'un des mots, sans tenir compte de la casse.

use moonsource::SearchResult;

/// Liste de mots bloqués, normalisés en minuscules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentFilter {
    words: Vec<String>,
}

impl ContentFilter {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Vrai si le libellé contient un mot bloqué
    pub fn blocks(&self, category: &str) -> bool {
        let category = category.to_lowercase();
        self.words.iter().any(|w| category.contains(w.as_str()))
    }

    /// Retire les résultats bloqués en gardant l'ordre
    pub fn apply(&self, results: Vec<SearchResult>) -> Vec<SearchResult> {
        if self.words.is_empty() {
            return results;
        }
        results
            .into_iter()
            .filter(|r| !self.blocks(&r.type_name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_case_insensitive_substring() {
        let filter = ContentFilter::new(["福利", "Cosplay", "  "]);
        assert!(filter.blocks("福利片"));
        assert!(filter.blocks("COSPLAY 视频"));
        assert!(!filter.blocks("动作片"));
        assert!(!filter.blocks(""));
    }

    #[test]
    fn test_apply_keeps_order() {
        let filter = ContentFilter::new(["伦理"]);
        let results = vec![
            SearchResult::new("1", "a", "s", "S").with_type_name("动作片"),
            SearchResult::new("2", "b", "s", "S").with_type_name("伦理片"),
            SearchResult::new("3", "c", "s", "S").with_type_name("喜剧片"),
        ];
        let ids: Vec<String> = filter.apply(results).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let filter = ContentFilter::default();
        assert!(filter.is_empty());
        let results = vec![SearchResult::new("1", "a", "s", "S").with_type_name("福利")];
        assert_eq!(filter.apply(results).len(), 1);
    }
}
