use serde::Serialize;
use std::fmt;

/// A scrambled/solved pair that has passed the anagram check but has not yet
/// been assigned any answer letters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWord {
    scrambled: String,
    solved: String,
}

impl PendingWord {
    /// Validates that `solved` is an anagram of `scrambled`, ignoring case.
    ///
    /// Surrounding whitespace and inline `*...*` annotations are removed from
    /// both sides first.
    pub fn new(scrambled: impl AsRef<str>, solved: impl AsRef<str>) -> Result<Self, WordError> {
        let scrambled = strip_annotation(scrambled.as_ref());
        let solved = strip_annotation(solved.as_ref());
        if letter_multiset(&scrambled) != letter_multiset(&solved) {
            return Err(WordError::LetterSetMismatch { scrambled, solved });
        }
        Ok(Self { scrambled, solved })
    }

    pub fn scrambled(&self) -> &str {
        &self.scrambled
    }

    pub fn solved(&self) -> &str {
        &self.solved
    }

    pub(crate) fn into_word(self, contribution_indices: Vec<usize>) -> Word {
        Word {
            scrambled: self.scrambled,
            solved: self.solved,
            contribution_indices,
        }
    }
}

/// A jumble word whose contributions to the final answer are known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Word {
    scrambled: String,
    solved: String,
    contribution_indices: Vec<usize>,
}

impl Word {
    pub fn scrambled(&self) -> &str {
        &self.scrambled
    }

    pub fn solved(&self) -> &str {
        &self.solved
    }

    /// Positions in [`Word::solved`] feeding the answer, in answer order.
    pub fn contribution_indices(&self) -> &[usize] {
        &self.contribution_indices
    }

    /// The uppercase letters at each contribution index, in answer order.
    pub fn contributed_letters(&self) -> String {
        contributed_letters(&self.solved, &self.contribution_indices)
    }
}

pub(crate) fn contributed_letters(solved: &str, indices: &[usize]) -> String {
    let letters: Vec<char> = solved.chars().collect();
    indices
        .iter()
        .filter_map(|&index| letters.get(index))
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Sorted uppercase characters of `text`; two strings are anagrams when these
/// are equal.
pub(crate) fn letter_multiset(text: &str) -> Vec<char> {
    let mut letters: Vec<char> = text.chars().map(|c| c.to_ascii_uppercase()).collect();
    letters.sort_unstable();
    letters
}

fn strip_annotation(raw: &str) -> String {
    match (raw.find('*'), raw.rfind('*')) {
        (Some(first), Some(last)) if first < last => {
            let mut cleaned = String::with_capacity(raw.len());
            cleaned.push_str(&raw[..first]);
            cleaned.push_str(&raw[last + 1..]);
            cleaned.trim().to_string()
        }
        _ => raw.trim().to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordError {
    LetterSetMismatch { scrambled: String, solved: String },
}

impl fmt::Display for WordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WordError::LetterSetMismatch { scrambled, solved } => write!(
                f,
                "solved word {solved:?} is not an anagram of scrambled word {scrambled:?}"
            ),
        }
    }
}

impl std::error::Error for WordError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_anagrams_case_insensitively() {
        let word = PendingWord::new("tac", "CAT").expect("anagram");
        assert_eq!(word.scrambled(), "tac");
        assert_eq!(word.solved(), "CAT");
    }

    #[test]
    fn rejects_differing_letter_counts() {
        // Same letter set, different multiset.
        let err = PendingWord::new("LOOP", "POLL").unwrap_err();
        assert_eq!(
            err,
            WordError::LetterSetMismatch {
                scrambled: "LOOP".into(),
                solved: "POLL".into(),
            }
        );
    }

    #[test]
    fn rejects_extra_letters() {
        assert!(PendingWord::new("TAC", "CATS").is_err());
    }

    #[test]
    fn trims_and_drops_annotations() {
        let word = PendingWord::new("  NOLEM ", "LEMON *circled twice*").expect("anagram");
        assert_eq!(word.scrambled(), "NOLEM");
        assert_eq!(word.solved(), "LEMON");
    }

    #[test]
    fn single_asterisk_is_not_an_annotation() {
        assert!(PendingWord::new("A*B", "B*A").is_ok());
    }

    #[test]
    fn contributed_letters_follow_index_order() {
        let word = PendingWord::new("TAC", "cat")
            .expect("anagram")
            .into_word(vec![2, 1, 0]);
        assert_eq!(word.contributed_letters(), "TAC");
        assert_eq!(word.contribution_indices(), &[2, 1, 0]);
    }

    #[test]
    fn mismatch_message_names_both_words() {
        let err = PendingWord::new("ABC", "ABD").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("\"ABC\""));
        assert!(message.contains("\"ABD\""));
    }
}
