//! Pronunciation normalization for clinical Spanish TTS
//!
//! Two passes over the text before it reaches the voice:
//! 1. the literal lexicon (drug names, study names, lab abbreviations),
//!    longest entry first so specific phrases win over their substrings
//! 2. rule regexes for units, percentages, and arithmetic symbols
//!
//! Everything is compiled once at first use.

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

use totem_config::pronunciation_lexicon;

/// Compiled lexicon, longest entry first
static LEXICON: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    let mut entries: Vec<_> = pronunciation_lexicon().to_vec();
    entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    entries
        .into_iter()
        .map(|(from, to)| {
            let pattern = format!("(?i){}", regex::escape(from));
            (Regex::new(&pattern).expect("lexicon entry must compile"), to)
        })
        .collect()
});

/// Unit and symbol rules, applied in order. Combined units must precede
/// the bare ones (mg/ml before mg before ml).
static RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    let rules: &[(&str, &str)] = &[
        // spelled abbreviations that the voice otherwise slurs
        (r"\bGIP\b", "G I P"),
        (r"\bgip\b", "g i p"),
        // combined units first
        (r"(?i)\bmg/ml\b", "miligramos por mililitro"),
        (r"(?i)\bmcg/ml\b", "microgramos por mililitro"),
        (r"(?i)\bU/ml\b", "Unidades por mililitro"),
        // bare units
        (r"\bMl\b|\bML\b", "Mililitros"),
        (r"\bml\b", "mililitros"),
        (r"\bMg\b|\bMG\b", "Miligramos"),
        (r"\bmg\b", "miligramos"),
        (r"(?i)\bmcg\b", "microgramos"),
        (r"\bU\b", "Unidades"),
        (r"\bu\b", "unidades"),
        // percentages and fractions
        (r"(\d+)%", "${1} por ciento"),
        (r"(\d+)/(\d+)", "${1} por ${2}"),
        // arithmetic symbols spoken out
        (r" \+ ", " más "),
        (r" - ", " menos "),
        (r" = ", " igual a "),
        (r" < ", " menor que "),
        (r" > ", " mayor que "),
        (r" ± ", " más menos "),
        // abbreviations that collide with drug names go last, bounded
        (r"\bTID\b", "T-I-D"),
        (r"\bIC\b", "I-C"),
    ];
    rules
        .iter()
        .map(|(pattern, replacement)| {
            (Regex::new(pattern).expect("rule must compile"), *replacement)
        })
        .collect()
});

/// Apply the full normalization pipeline
pub fn normalize_pronunciation(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut normalized = text.to_string();

    for (re, replacement) in LEXICON.iter() {
        normalized = re.replace_all(&normalized, NoExpand(replacement)).into_owned();
    }

    for (re, replacement) in RULES.iter() {
        normalized = re.replace_all(&normalized, *replacement).into_owned();
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drug_name_correction() {
        assert_eq!(
            normalize_pronunciation("Mounjaro es tirzepatida"),
            "Mounyaro es tirzepatida"
        );
        // case-insensitive lexicon match
        assert!(normalize_pronunciation("MOUNJARO").contains("Mounyaro"));
    }

    #[test]
    fn test_combined_units_before_bare_units() {
        assert_eq!(
            normalize_pronunciation("dosis de 2.5 mg/ml al día"),
            "dosis de 2.5 miligramos por mililitro al día"
        );
        assert_eq!(normalize_pronunciation("5 mg por semana"), "5 miligramos por semana");
    }

    #[test]
    fn test_percentages() {
        assert_eq!(normalize_pronunciation("redujo un 21%"), "redujo un 21 por ciento");
    }

    #[test]
    fn test_fractions() {
        assert_eq!(normalize_pronunciation("3/4 de los pacientes"), "3 por 4 de los pacientes");
    }

    #[test]
    fn test_arithmetic_symbols() {
        assert_eq!(normalize_pronunciation("dieta + ejercicio"), "dieta más ejercicio");
        assert_eq!(normalize_pronunciation("a < b"), "a menor que b");
    }

    #[test]
    fn test_spelled_abbreviations() {
        assert_eq!(normalize_pronunciation("el receptor GIP"), "el receptor G I P");
        assert_eq!(normalize_pronunciation("HbA1c basal"), "H-b-A-uno-C basal");
    }

    #[test]
    fn test_lexicon_beats_bounded_abbreviations() {
        // "IC 95%" is a lexicon phrase; the bare \bIC\b rule must not
        // mangle it first
        let normalized = normalize_pronunciation("IC 95% de 1.2 a 1.9");
        assert!(normalized.starts_with("intervalo de confianza del 95 por ciento"));
    }

    #[test]
    fn test_glargina_survives() {
        // no "GI" substring rule exists precisely because of this word
        assert_eq!(normalize_pronunciation("insulina glargina"), "insulina glargina");
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(normalize_pronunciation(""), "");
    }
}
