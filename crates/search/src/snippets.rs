//! Snippet post-processing for LLM grounding

use once_cell::sync::Lazy;
use regex::Regex;

use totem_config::NO_RESULTS_TEXT;
use totem_core::Snippet;

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NOISE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s.,;:!?¿¡()\-]").unwrap());

/// How many top-scored snippets make it into the LLM context
const TOP_SNIPPETS: usize = 2;

/// Combine the most relevant snippets into one grounding text.
///
/// Takes the two best-scored chunks, joins them, and strips formatting
/// noise. An empty result set yields a fixed "nothing found" text so the
/// LLM still has something honest to work with.
pub fn extract_relevant_text(snippets: &[Snippet]) -> String {
    if snippets.is_empty() {
        return NO_RESULTS_TEXT.to_string();
    }

    let mut ranked: Vec<&Snippet> = snippets.iter().collect();
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let combined = ranked
        .iter()
        .take(TOP_SNIPPETS)
        .map(|s| s.chunk.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    clean_text(&combined)
}

/// Strip URLs, noise characters, and excess whitespace from chunk text
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let without_urls = URL_RE.replace_all(text, "");
    let without_noise = NOISE_RE.replace_all(&without_urls, "");
    WHITESPACE_RE.replace_all(&without_noise, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_strips_urls_and_noise() {
        let dirty = "Mounjaro®   reduce   la HbA1c. Ver https://example.com/ficha para más.";
        let clean = clean_text(dirty);
        assert!(!clean.contains("https"));
        assert!(!clean.contains('®'));
        assert!(!clean.contains("  "));
        assert!(clean.contains("Mounjaro"));
    }

    #[test]
    fn test_clean_text_keeps_spanish_punctuation() {
        let clean = clean_text("¿Qué es? ¡Atención! (dosis: 5 mg)");
        assert!(clean.contains('¿'));
        assert!(clean.contains('¡'));
        assert!(clean.contains('('));
    }

    #[test]
    fn test_extract_takes_top_two_by_score() {
        let snippets = vec![
            Snippet::new(1.0, "tercero"),
            Snippet::new(9.0, "primero"),
            Snippet::new(5.0, "segundo"),
        ];

        let text = extract_relevant_text(&snippets);
        assert!(text.contains("primero"));
        assert!(text.contains("segundo"));
        assert!(!text.contains("tercero"));
    }

    #[test]
    fn test_extract_empty_results_gives_fallback() {
        assert_eq!(extract_relevant_text(&[]), NO_RESULTS_TEXT);
    }
}
