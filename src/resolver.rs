use crate::word::PendingWord;
use std::fmt;

/// Assigns every letter of `answer` to a position in one of the candidates.
///
/// Letters are claimed left to right through the answer. For each one the
/// candidates are tried in order and the first unused matching position of
/// the first candidate that has one wins. The result is index-aligned with
/// `candidates`; each inner list is in answer order, and a candidate that
/// supplied nothing gets an empty list.
pub fn resolve(
    answer: &str,
    candidates: &[PendingWord],
) -> Result<Vec<Vec<usize>>, UnresolvableLetter> {
    let letters: Vec<Vec<char>> = candidates
        .iter()
        .map(|word| word.solved().chars().map(|c| c.to_ascii_uppercase()).collect())
        .collect();
    let mut used: Vec<Vec<bool>> = letters.iter().map(|word| vec![false; word.len()]).collect();
    let mut contributions = vec![Vec::new(); candidates.len()];

    for (position, letter) in answer.chars().enumerate() {
        let target = letter.to_ascii_uppercase();
        let claim = letters.iter().enumerate().find_map(|(word_idx, word)| {
            word.iter()
                .enumerate()
                .position(|(idx, &c)| c == target && !used[word_idx][idx])
                .map(|idx| (word_idx, idx))
        });
        let Some((word_idx, idx)) = claim else {
            return Err(UnresolvableLetter { letter, position });
        };
        used[word_idx][idx] = true;
        contributions[word_idx].push(idx);
    }

    Ok(contributions)
}

/// No candidate had an unused copy of `letter` for answer index `position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnresolvableLetter {
    pub letter: char,
    pub position: usize,
}

impl fmt::Display for UnresolvableLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no word has an unused {:?} for answer position {}",
            self.letter, self.position
        )
    }
}

impl std::error::Error for UnresolvableLetter {}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(pairs: &[(&str, &str)]) -> Vec<PendingWord> {
        pairs
            .iter()
            .map(|(scrambled, solved)| PendingWord::new(scrambled, solved).expect("anagram"))
            .collect()
    }

    #[test]
    fn single_word_in_order() {
        let result = resolve("CAT", &words(&[("TAC", "CAT")])).expect("resolves");
        assert_eq!(result, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn indices_follow_answer_order_not_word_order() {
        let result = resolve("TAC", &words(&[("TAC", "CAT")])).expect("resolves");
        assert_eq!(result, vec![vec![2, 1, 0]]);
        let result = resolve("ACT", &words(&[("TAC", "CAT")])).expect("resolves");
        assert_eq!(result, vec![vec![1, 0, 2]]);
    }

    #[test]
    fn first_word_is_drained_before_the_next() {
        let candidates = words(&[("BA", "AB"), ("BA", "AB")]);
        assert_eq!(
            resolve("AB", &candidates).expect("resolves"),
            vec![vec![0, 1], vec![]]
        );
        assert_eq!(
            resolve("ABBA", &candidates).expect("resolves"),
            vec![vec![0, 1], vec![1, 0]]
        );
    }

    #[test]
    fn never_claims_a_position_twice() {
        let candidates = words(&[("BA", "AB"), ("BA", "AB")]);
        let result = resolve("AA", &candidates).expect("resolves");
        assert_eq!(result, vec![vec![0], vec![0]]);
    }

    #[test]
    fn repeated_letters_within_a_word() {
        let result = resolve("LL", &words(&[("LOLA", "ALLO")])).expect("resolves");
        assert_eq!(result, vec![vec![1, 2]]);
    }

    #[test]
    fn exhausted_word_still_serves_other_letters() {
        // The first word runs out of A after one claim but still supplies T.
        let candidates = words(&[("TA", "AT"), ("AX", "XA")]);
        let result = resolve("AAT", &candidates).expect("resolves");
        assert_eq!(result, vec![vec![0, 1], vec![1]]);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let result = resolve("cat", &words(&[("tac", "cat")])).expect("resolves");
        assert_eq!(result, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn reports_missing_letter_and_position() {
        let err = resolve("CATS", &words(&[("TAC", "CAT")])).unwrap_err();
        assert_eq!(
            err,
            UnresolvableLetter {
                letter: 'S',
                position: 3
            }
        );
        assert!(err.to_string().contains("position 3"));
    }

    #[test]
    fn too_many_copies_is_unresolvable() {
        let err = resolve("CC", &words(&[("TAC", "CAT")])).unwrap_err();
        assert_eq!(err.position, 1);
    }

    #[test]
    fn empty_answer_claims_nothing() {
        let result = resolve("", &words(&[("TAC", "CAT")])).expect("resolves");
        assert_eq!(result, vec![Vec::<usize>::new()]);
    }
}
