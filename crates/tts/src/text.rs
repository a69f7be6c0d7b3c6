//! Sentence-aware preprocessing for synthesis input

use unicode_segmentation::UnicodeSegmentation;

use totem_core::{Error, Result};

/// Normalize whitespace and cap length at a sentence boundary.
///
/// Empty input is an error; callers short-circuit empty text before the
/// synthesizer is ever involved.
pub fn preprocess(text: &str, max_chars: usize) -> Result<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return Err(Error::InvalidInput("synthesis text cannot be empty".into()));
    }

    Ok(truncate_at_sentence(&collapsed, max_chars))
}

/// Cut text to at most `max_chars` characters, preferring a sentence
/// boundary. Falls back to a hard cut with an ellipsis when not even the
/// first sentence fits.
pub fn truncate_at_sentence(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let mut kept = String::new();
    for sentence in text.split_sentence_bounds() {
        let candidate_len = kept.chars().count() + sentence.chars().count();
        if candidate_len > max_chars {
            break;
        }
        kept.push_str(sentence);
    }
    let kept = kept.trim().to_string();

    if !kept.is_empty() {
        return kept;
    }

    // first sentence alone is too long: hard cut
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}

/// Split text into chunks of at most `max_chars` characters on sentence
/// boundaries. A single over-long sentence becomes its own chunk rather
/// than being split mid-word.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in text.split_sentence_bounds() {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }

        if current.is_empty() {
            current = sentence.to_string();
        } else if current.chars().count() + 1 + sentence.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(sentence);
        } else {
            chunks.push(std::mem::take(&mut current));
            current = sentence.to_string();
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_collapses_whitespace() {
        let processed = preprocess("  Mounjaro   reduce\n\nla glucosa.  ", 2000).unwrap();
        assert_eq!(processed, "Mounjaro reduce la glucosa.");
    }

    #[test]
    fn test_preprocess_rejects_empty() {
        assert!(preprocess("   \n  ", 2000).is_err());
    }

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate_at_sentence("Hola.", 100), "Hola.");
    }

    #[test]
    fn test_truncate_cuts_at_sentence_boundary() {
        let text = "Primera frase corta. Segunda frase corta. Tercera frase bastante más larga que no cabe.";
        let truncated = truncate_at_sentence(text, 45);
        assert_eq!(truncated, "Primera frase corta. Segunda frase corta.");
    }

    #[test]
    fn test_truncate_hard_cut_with_ellipsis() {
        let text = "una sola frase interminable sin puntuación que sigue y sigue y sigue";
        let truncated = truncate_at_sentence(text, 20);
        assert!(truncated.ends_with("..."));
        assert!(truncated.chars().count() <= 20);
    }

    #[test]
    fn test_split_into_chunks_respects_limit() {
        let text = "Frase uno aquí. Frase dos aquí. Frase tres aquí. Frase cuatro aquí.";
        let chunks = split_into_chunks(text, 35);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 35, "chunk too long: {chunk}");
        }
        // nothing lost
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn test_split_short_text_single_chunk() {
        let chunks = split_into_chunks("Corto.", 500);
        assert_eq!(chunks, vec!["Corto."]);
    }
}
