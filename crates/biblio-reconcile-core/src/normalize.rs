//! Title normalization.
//!
//! Two references are treated as the same work when their normalized titles
//! are byte-equal. The normalization is deliberately coarse: it does not stem
//! words or fold accents, so `"Café"` and `"Cafe"` stay distinct.

/// Normalize a title into its comparison key.
///
/// Lower-cases, drops every character that is neither alphanumeric nor
/// whitespace, collapses whitespace runs to a single space and trims.
/// Total: an empty or punctuation-only title yields an empty string.
///
/// ```rust
/// use biblio_reconcile_core::normalize::normalize_title;
///
/// assert_eq!(normalize_title("Salmon   HABITAT!"), "salmon habitat");
/// assert_eq!(normalize_title(""), "");
/// ```
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let kept: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_punctuation_and_spacing_collapse() {
        assert_eq!(
            normalize_title("Climate  Change!!"),
            normalize_title("climate change")
        );
        assert_eq!(normalize_title("Climate  Change!!"), "climate change");
    }

    #[test]
    fn test_empty_and_symbol_only() {
        assert_eq!(normalize_title(""), "");
        assert_eq!(normalize_title("   "), "");
        assert_eq!(normalize_title("?!—…"), "");
    }

    #[test]
    fn test_whitespace_variants() {
        assert_eq!(
            normalize_title("\tWater\n\nQuality  \r\n"),
            "water quality"
        );
    }

    #[test]
    fn test_hyphen_is_dropped_not_spaced() {
        assert_eq!(normalize_title("Long-term trends"), "longterm trends");
    }

    #[test]
    fn test_no_accent_folding() {
        assert_ne!(normalize_title("Café"), normalize_title("Cafe"));
        assert_eq!(normalize_title("CAFÉ"), "café");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "",
            "Salmon Habitat",
            "salmon   HABITAT!",
            "  Nechako River: 1950–2020 (Part II) ",
            "İstanbul Straße",
            "ΣΊΣΥΦΟΣ",
            "under_score & ampersand",
            "tabs\tand\nnewlines",
            "１２３ full-width digits",
        ];
        for s in samples {
            let once = normalize_title(s);
            assert_eq!(normalize_title(&once), once, "not idempotent for {:?}", s);
        }
    }
}
