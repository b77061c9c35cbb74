use crate::canonical::{canonicalize, wrap_connectors};
use crate::config::AssemblyConfig;
use crate::resolver::{UnresolvableLetter, resolve};
use crate::sanitize::sanitize;
use crate::word::{PendingWord, Word, contributed_letters, letter_multiset};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Textual form of a puzzle date, used for keys and display.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One day's jumble with every answer letter traced to a word position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Puzzle {
    value_date: NaiveDate,
    answer_display: String,
    answer_canonical: String,
    clue_sentence: String,
    words: Vec<Word>,
}

impl Puzzle {
    pub fn value_date(&self) -> NaiveDate {
        self.value_date
    }

    /// The date rendered with [`DATE_FORMAT`].
    pub fn date_key(&self) -> String {
        self.value_date.format(DATE_FORMAT).to_string()
    }

    pub fn answer_display(&self) -> &str {
        &self.answer_display
    }

    pub fn answer_canonical(&self) -> &str {
        &self.answer_canonical
    }

    /// Letters a player has to find; identical to the canonical answer.
    pub fn solved_letters(&self) -> &str {
        &self.answer_canonical
    }

    pub fn clue_sentence(&self) -> &str {
        &self.clue_sentence
    }

    /// Contributing words in scrape order.
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn sanitized(&self, mask: char) -> String {
        sanitize(&self.answer_display, &self.answer_canonical, mask)
    }
}

/// Builds a puzzle without connector repair.
pub fn assemble(
    value_date: NaiveDate,
    answer_display: &str,
    clue_sentence: &str,
    candidates: Vec<PendingWord>,
) -> Result<Puzzle, AssemblyError> {
    assemble_with(
        &AssemblyConfig::default(),
        value_date,
        answer_display,
        clue_sentence,
        candidates,
    )
}

/// Builds a puzzle, retrying once with connector words wrapped as hints when
/// the raw answer cannot be traced and `config` names connectors.
pub fn assemble_with(
    config: &AssemblyConfig,
    value_date: NaiveDate,
    answer_display: &str,
    clue_sentence: &str,
    candidates: Vec<PendingWord>,
) -> Result<Puzzle, AssemblyError> {
    let (display, traced) = match trace(answer_display, &candidates) {
        Ok(traced) => (answer_display.to_string(), traced),
        Err(err) if err.is_repairable() && config.repairs_connectors() => {
            let repaired = wrap_connectors(answer_display, &config.connector_words);
            if repaired == answer_display {
                return Err(err);
            }
            warn!(
                value_date = %value_date,
                error = %err,
                answer = answer_display,
                repaired = %repaired,
                "retrying with connector words treated as hints"
            );
            let traced = trace(&repaired, &candidates)?;
            (repaired, traced)
        }
        Err(err) => return Err(err),
    };
    let Traced {
        canonical,
        contributions,
    } = traced;

    let words: Vec<Word> = candidates
        .into_iter()
        .zip(contributions)
        .filter(|(_, indices)| !indices.is_empty())
        .map(|(word, indices)| word.into_word(indices))
        .collect();
    debug!(
        value_date = %value_date,
        answer = %canonical,
        words = words.len(),
        "assembled puzzle"
    );

    Ok(Puzzle {
        value_date,
        answer_display: display,
        answer_canonical: canonical,
        clue_sentence: clue_sentence.to_string(),
        words,
    })
}

struct Traced {
    canonical: String,
    contributions: Vec<Vec<usize>>,
}

fn trace(answer_display: &str, candidates: &[PendingWord]) -> Result<Traced, AssemblyError> {
    let canonical = canonicalize(answer_display);
    if canonical.is_empty() {
        return Err(AssemblyError::EmptyAnswer {
            answer: answer_display.to_string(),
        });
    }
    let contributions = resolve(&canonical, candidates)?;
    verify(&canonical, candidates, &contributions)?;
    Ok(Traced {
        canonical,
        contributions,
    })
}

/// Checks that the claimed positions are in range, unique per word, and
/// spell out exactly the letters of the canonical answer.
fn verify(
    canonical: &str,
    candidates: &[PendingWord],
    contributions: &[Vec<usize>],
) -> Result<(), AssemblyError> {
    if candidates.len() != contributions.len() {
        return Err(AssemblyError::Consistency {
            detail: format!(
                "{} contribution lists for {} words",
                contributions.len(),
                candidates.len()
            ),
        });
    }
    let mut letters = String::with_capacity(canonical.len());
    for (word, indices) in candidates.iter().zip(contributions) {
        let len = word.solved().chars().count();
        let mut seen = vec![false; len];
        for &index in indices {
            if index >= len {
                return Err(AssemblyError::Consistency {
                    detail: format!("index {index} out of range for {:?}", word.solved()),
                });
            }
            if std::mem::replace(&mut seen[index], true) {
                return Err(AssemblyError::Consistency {
                    detail: format!("index {index} of {:?} claimed twice", word.solved()),
                });
            }
        }
        letters.push_str(&contributed_letters(word.solved(), indices));
    }
    if letter_multiset(&letters) != letter_multiset(canonical) {
        return Err(AssemblyError::Consistency {
            detail: format!("contributed letters {letters:?} do not spell {canonical:?}"),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    EmptyAnswer { answer: String },
    Unresolvable(UnresolvableLetter),
    Consistency { detail: String },
}

impl AssemblyError {
    fn is_repairable(&self) -> bool {
        !matches!(self, AssemblyError::EmptyAnswer { .. })
    }
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssemblyError::EmptyAnswer { answer } => {
                write!(f, "answer {answer:?} contains no letters")
            }
            AssemblyError::Unresolvable(err) => write!(f, "unresolvable letter: {err}"),
            AssemblyError::Consistency { detail } => {
                write!(f, "letter provenance is inconsistent: {detail}")
            }
        }
    }
}

impl std::error::Error for AssemblyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssemblyError::Unresolvable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<UnresolvableLetter> for AssemblyError {
    fn from(value: UnresolvableLetter) -> Self {
        AssemblyError::Unresolvable(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).expect("valid date")
    }

    fn words(pairs: &[(&str, &str)]) -> Vec<PendingWord> {
        pairs
            .iter()
            .map(|(scrambled, solved)| PendingWord::new(scrambled, solved).expect("anagram"))
            .collect()
    }

    fn day_in_day_out() -> Vec<PendingWord> {
        words(&[
            ("SIADY", "DAISY"),
            ("DNAHY", "HANDY"),
            ("GHOUT", "TOUGH"),
            ("NOLEM", "LEMON"),
        ])
    }

    #[test]
    fn assembles_and_drops_idle_words() {
        let puzzle = assemble(
            date(),
            "DAY IN (AND) DAY OUT",
            "What the night shift felt like:",
            day_in_day_out(),
        )
        .expect("assembles");

        assert_eq!(puzzle.answer_canonical(), "DAYINDAYOUT");
        assert_eq!(puzzle.date_key(), "2024-03-09");
        let summary: Vec<_> = puzzle
            .words()
            .iter()
            .map(|w| (w.solved(), w.contribution_indices().to_vec()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("DAISY", vec![0, 1, 4, 2]),
                ("HANDY", vec![2, 3, 1, 4]),
                ("TOUGH", vec![1, 2, 0]),
            ]
        );
    }

    #[test]
    fn contributed_letters_cover_the_answer() {
        let puzzle =
            assemble(date(), "DAY IN (AND) DAY OUT", "", day_in_day_out()).expect("assembles");
        let letters: String = puzzle.words().iter().map(Word::contributed_letters).collect();
        assert_eq!(letter_multiset(&letters), letter_multiset(puzzle.answer_canonical()));
        assert_eq!(letters, "DAYINDAYOUT");
    }

    #[test]
    fn sanitized_masks_solution() {
        let puzzle =
            assemble(date(), "DAY IN (AND) DAY OUT", "", day_in_day_out()).expect("assembles");
        assert_eq!(puzzle.sanitized('*'), "*** ** (AND) *** ***");
    }

    #[test]
    fn empty_answer_is_rejected() {
        let err = assemble(date(), "(JUST A HINT) !!", "", day_in_day_out()).unwrap_err();
        assert!(matches!(err, AssemblyError::EmptyAnswer { .. }));
    }

    #[test]
    fn missing_letter_is_reported() {
        let err = assemble(date(), "CATS", "", words(&[("TAC", "CAT")])).unwrap_err();
        assert_eq!(
            err,
            AssemblyError::Unresolvable(UnresolvableLetter {
                letter: 'S',
                position: 3
            })
        );
    }

    #[test]
    fn connector_repair_is_opt_in() {
        let candidates = words(&[("MAXE", "EXAM")]);
        let err = assemble(date(), "TO THE MAX", "", candidates.clone()).unwrap_err();
        assert!(matches!(
            err,
            AssemblyError::Unresolvable(UnresolvableLetter {
                letter: 'T',
                position: 0
            })
        ));

        let config = AssemblyConfig::with_connectors(["TO", "THE"]);
        let puzzle =
            assemble_with(&config, date(), "TO THE MAX", "", candidates).expect("repaired");
        assert_eq!(puzzle.answer_display(), "(TO) (THE) MAX");
        assert_eq!(puzzle.answer_canonical(), "MAX");
        assert_eq!(puzzle.words()[0].contribution_indices(), &[3, 2, 1]);
        assert_eq!(puzzle.sanitized('*'), "(TO) (THE) ***");
    }

    #[test]
    fn repair_is_skipped_when_answer_resolves() {
        let config = AssemblyConfig::with_connectors(["A"]);
        let puzzle = assemble_with(&config, date(), "A CAT", "", words(&[("TACA", "ACAT")]))
            .expect("assembles");
        assert_eq!(puzzle.answer_display(), "A CAT");
        assert_eq!(puzzle.answer_canonical(), "ACAT");
    }

    #[test]
    fn failed_repair_surfaces_the_retry_error() {
        let config = AssemblyConfig::with_connectors(["TO"]);
        let err = assemble_with(&config, date(), "TO THE MAX", "", words(&[("MAXE", "EXAM")]))
            .unwrap_err();
        assert!(matches!(
            err,
            AssemblyError::Unresolvable(UnresolvableLetter { letter: 'T', .. })
        ));
    }

    #[test]
    fn verify_rejects_duplicate_claims() {
        let candidates = words(&[("TAC", "CAT")]);
        let err = verify("CC", &candidates, &[vec![0, 0]]).unwrap_err();
        assert!(err.to_string().contains("claimed twice"));
    }

    #[test]
    fn verify_rejects_wrong_letters() {
        let candidates = words(&[("TAC", "CAT")]);
        let err = verify("CAT", &candidates, &[vec![0, 1]]).unwrap_err();
        assert!(matches!(err, AssemblyError::Consistency { .. }));
    }

    #[test]
    fn verify_rejects_out_of_range_index() {
        let candidates = words(&[("TAC", "CAT")]);
        let err = verify("C", &candidates, &[vec![7]]).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }
}
