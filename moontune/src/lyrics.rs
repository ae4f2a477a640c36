//! Parsing des paroles au format LRC
//!
//! Une ligne peut porter plusieurs balises `[mm:ss]`, `[mm:ss.xx]` ou
//! `[mm:ss.xxx]` ; chaque balise produit une entrée. Les lignes sans texte
//! (balises d'en-tête, lignes vides) sont ignorées.

use crate::models::LyricLine;
use once_cell::sync::Lazy;
use regex::Regex;

static TIME_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d{2}):(\d{2})(?:\.(\d{2,3}))?\]").expect("valid LRC regex"));

/// Parse un texte LRC en lignes triées par temps
pub fn parse_lrc(lrc: &str) -> Vec<LyricLine> {
    let mut lines = Vec::new();

    for raw in lrc.lines() {
        let text = TIME_TAG.replace_all(raw, "").trim().to_string();
        if text.is_empty() {
            continue;
        }

        for caps in TIME_TAG.captures_iter(raw) {
            let minutes: f64 = caps[1].parse().unwrap_or(0.0);
            let seconds: f64 = caps[2].parse().unwrap_or(0.0);
            // "12" vaut 120 ms
            let millis = caps
                .get(3)
                .map(|m| format!("{:0<3}", m.as_str()).parse::<f64>().unwrap_or(0.0))
                .unwrap_or(0.0);

            lines.push(LyricLine {
                time: minutes * 60.0 + seconds + millis / 1000.0,
                text: text.clone(),
            });
        }
    }

    lines.sort_by(|a, b| a.time.total_cmp(&b.time));
    lines
}

/// Index de la ligne active à `position` secondes
pub fn current_line(lines: &[LyricLine], position: f64) -> Option<usize> {
    lines.iter().rposition(|line| line.time <= position)
}
