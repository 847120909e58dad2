use std::collections::BTreeMap;

use crate::resolver::normalize::normalize_text;

/// Canonical-name to variant-list table covering domain-specific typos
/// and homophones the transcription layer produces. Hand-tuned and
/// cuisine-dependent, so it is configuration data, not a constant: the
/// defaults below can be extended or replaced via `[resolver.synonyms]`
/// in the config file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynonymTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl Default for SynonymTable {
    fn default() -> Self {
        let mut entries = BTreeMap::new();
        let defaults: [(&str, &[&str]); 12] = [
            ("samosa", &["samosa", "simosa", "samosaa", "samos", "veg samosa", "vegetable samosa"]),
            ("biryani", &["biryani", "biriyani", "biriani", "biryani rice"]),
            ("butter chicken", &["butter chicken", "butterchicken", "butter chicken curry"]),
            ("paneer tikka", &["paneer tikka", "paneer tika", "paneer tikka masala"]),
            ("dal makhani", &["dal makhani", "dal makani", "dal makhni", "black dal"]),
            ("naan", &["naan", "nan", "naan bread"]),
            ("lassi", &["lassi", "lasi", "mango lassi", "yogurt drink"]),
            ("tikka masala", &["tikka masala", "tika masala", "tikka masla"]),
            ("palak paneer", &["palak paneer", "palak panner", "spinach paneer"]),
            ("tandoori chicken", &["tandoori chicken", "tandoor chicken", "tandori chicken"]),
            ("gulab jamun", &["gulab jamun", "gulab jamoon", "gulabjamun", "jamun"]),
            ("lemonade", &["lemonade", "lemmonade", "lemonaid", "lemon drink"]),
        ];
        for (canonical, variants) in defaults {
            entries.insert(
                canonical.to_string(),
                variants.iter().map(|variant| variant.to_string()).collect(),
            );
        }
        Self { entries }
    }
}

impl SynonymTable {
    pub fn empty() -> Self {
        Self { entries: BTreeMap::new() }
    }

    pub fn from_entries(entries: BTreeMap<String, Vec<String>>) -> Self {
        let mut normalized = BTreeMap::new();
        for (canonical, variants) in entries {
            normalized.insert(
                normalize_text(&canonical),
                variants.iter().map(|variant| normalize_text(variant)).collect(),
            );
        }
        Self { entries: normalized }
    }

    /// Merges configured entries over the defaults; a configured
    /// canonical name replaces its default variant list entirely.
    pub fn with_overrides(mut self, overrides: BTreeMap<String, Vec<String>>) -> Self {
        for (canonical, variants) in SynonymTable::from_entries(overrides).entries {
            self.entries.insert(canonical, variants);
        }
        self
    }

    /// Canonical names whose variants overlap the normalized phrase.
    /// Each hit becomes an extra search query for the fuzzy scorer.
    pub fn expand(&self, normalized_phrase: &str) -> Vec<String> {
        if normalized_phrase.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|(_, variants)| {
                variants.iter().any(|variant| {
                    normalized_phrase.contains(variant.as_str())
                        || variant.contains(normalized_phrase)
                })
            })
            .map(|(canonical, _)| canonical.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::SynonymTable;

    #[test]
    fn typo_variant_expands_to_canonical_name() {
        let table = SynonymTable::default();
        assert_eq!(table.expand("simosa"), vec!["samosa".to_string()]);
        assert_eq!(table.expand("biriyani"), vec!["biryani".to_string()]);
    }

    #[test]
    fn expansion_is_deterministic_and_sorted() {
        let table = SynonymTable::default();
        let first = table.expand("paneer tika");
        let second = table.expand("paneer tika");
        assert_eq!(first, second);
    }

    #[test]
    fn overrides_replace_default_variant_lists() {
        let mut overrides = BTreeMap::new();
        overrides.insert("samosa".to_string(), vec!["punjabi samosa".to_string()]);
        let table = SynonymTable::default().with_overrides(overrides);

        assert!(table.expand("simosa").is_empty());
        assert_eq!(table.expand("punjabi samosa"), vec!["samosa".to_string()]);
    }

    #[test]
    fn empty_phrase_expands_to_nothing() {
        assert!(SynonymTable::default().expand("").is_empty());
    }
}
