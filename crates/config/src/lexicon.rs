//! Pronunciation lexicon for clinical TTS
//!
//! Literal phrase substitutions applied before synthesis so the voice
//! reads drug names, dosages, and study jargon the way a clinician would
//! say them. Longest entries must be applied first; the TTS crate sorts
//! by length before compiling, so ordering here is for humans.

/// One literal substitution: matched case-insensitively, replaced verbatim
pub type LexiconEntry = (&'static str, &'static str);

/// The clinical substitution table
pub fn pronunciation_lexicon() -> &'static [LexiconEntry] {
    &[
        // Drug names that the voice mangles without help
        ("Mounjaro", "Mounyaro"),
        ("tirzepatida", "tirzepatida"),
        ("semaglutida", "semaglutida"),
        ("liraglutida", "liraglutida"),
        ("dulaglutida", "dulaglutida"),
        ("glargina", "glargina"),
        // Dosage phrases
        ("5/10/15 mg", "5, 10 y 15 miligramos"),
        ("10/15 mg", "10 y 15 miligramos"),
        // Approximations
        ("~1.9–2.1%", "aproximadamente 1.9 a 2.1 por ciento"),
        ("1.9–2.1%", "1.9 a 2.1 por ciento"),
        ("7–9.5 kg", "7 a 9.5 kilogramos"),
        ("vs. placebo", "versus placebo"),
        ("vs placebo", "versus placebo"),
        // Lab values and abbreviations, spelled out
        ("HbA1c <7%", "H-b-A-uno-C menor al 7 por ciento"),
        ("HbA1c", "H-b-A-uno-C"),
        ("GLP-1RA", "G-L-P-1-R-A"),
        ("DM2", "diabetes mellitus tipo 2"),
        ("DM1", "diabetes mellitus tipo 1"),
        ("MACE", "M-A-C-E"),
        ("BMI", "B-M-I"),
        // Comparatives around thresholds
        (">80%", "más del 80 por ciento"),
        ("<7%", "menor al 7 por ciento"),
        ("≥7%", "mayor o igual al 7 por ciento"),
        ("≤7%", "menor o igual al 7 por ciento"),
        // Severity ranges
        ("leves-moderados", "leves a moderados"),
        ("moderados-graves", "moderados a graves"),
        ("grave/clínicamente significativa", "grave o clínicamente significativa"),
        // Study names read as-is; the dash must not become "menos"
        ("SURPASS-1 (40 semanas)", "SURPASS-1 a las 40 semanas"),
        // Statistics
        ("p<0.001", "p menor a 0.001"),
        ("p<0.01", "p menor a 0.01"),
        ("p<0.05", "p menor a 0.05"),
        ("IC 95%", "intervalo de confianza del 95 por ciento"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexicon_has_drug_corrections() {
        let lexicon = pronunciation_lexicon();
        assert!(lexicon.iter().any(|(from, to)| *from == "Mounjaro" && *to == "Mounyaro"));
        assert!(lexicon.iter().any(|(from, _)| *from == "HbA1c"));
    }
}
