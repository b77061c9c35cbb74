use std::collections::BTreeSet;

/// Connector words that scraped answers are known to carry as plain text.
pub const DEFAULT_CONNECTOR_WORDS: &[&str] = &[
    "A", "AN", "FOR", "HER", "HIS", "IN", "IT", "THE", "THEIR", "TO", "WAS",
];

/// Knobs for puzzle assembly.
///
/// The default configuration performs no connector repair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyConfig {
    pub connector_words: BTreeSet<String>,
}

impl AssemblyConfig {
    /// Enables connector repair for the given words (stored uppercase).
    pub fn with_connectors<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            connector_words: words
                .into_iter()
                .map(|word| word.as_ref().trim().to_ascii_uppercase())
                .filter(|word| !word.is_empty())
                .collect(),
        }
    }

    pub fn repairs_connectors(&self) -> bool {
        !self.connector_words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_disables_repair() {
        assert!(!AssemblyConfig::default().repairs_connectors());
    }

    #[test]
    fn connectors_are_normalised() {
        let config = AssemblyConfig::with_connectors([" the ", "A", "", "a"]);
        let words: Vec<_> = config.connector_words.iter().map(String::as_str).collect();
        assert_eq!(words, vec!["A", "THE"]);
        assert!(config.repairs_connectors());
    }

    #[test]
    fn default_word_list_builds() {
        let config = AssemblyConfig::with_connectors(DEFAULT_CONNECTOR_WORDS);
        assert_eq!(config.connector_words.len(), DEFAULT_CONNECTOR_WORDS.len());
    }
}
