use regex::Regex;
use std::collections::BTreeSet;
use tracing::warn;

/// Reduces display text to the uppercase letters used for matching.
///
/// Parenthetical segments are dropped first: everything from a `(` up to the
/// first `)` that follows it, repeated until no closed pair remains. Every
/// remaining character that is not an ASCII letter is discarded.
pub fn canonicalize(text: &str) -> String {
    strip_parentheticals(text)
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

fn strip_parentheticals(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('(') {
        let Some(close) = rest[open..].find(')') else {
            break;
        };
        out.push_str(&rest[..open]);
        rest = &rest[open + close + 1..];
    }
    out.push_str(rest);
    out
}

/// Wraps whole-word occurrences of `connectors` in parentheses so that
/// [`canonicalize`] ignores them.
///
/// Matching is case-insensitive. Text already inside a closed parenthetical
/// is copied through untouched; an unclosed `(` is ordinary text, as it is
/// for [`canonicalize`].
pub fn wrap_connectors(text: &str, connectors: &BTreeSet<String>) -> String {
    let Some(pattern) = connector_pattern(connectors) else {
        return text.to_string();
    };
    let mut out = String::with_capacity(text.len() + 16);
    let mut rest = text;
    while let Some(open) = rest.find('(') {
        let Some(close) = rest[open..].find(')') else {
            break;
        };
        let end = open + close + 1;
        out.push_str(&pattern.replace_all(&rest[..open], "($0)"));
        out.push_str(&rest[open..end]);
        rest = &rest[end..];
    }
    out.push_str(&pattern.replace_all(rest, "($0)"));
    out
}

fn connector_pattern(connectors: &BTreeSet<String>) -> Option<Regex> {
    let mut words: Vec<&str> = connectors
        .iter()
        .map(|word| word.trim())
        .filter(|word| !word.is_empty())
        .collect();
    if words.is_empty() {
        return None;
    }
    // Longest first so overlapping alternatives prefer the full word.
    words.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    let alternation = words
        .iter()
        .map(|word| regex::escape(word))
        .collect::<Vec<_>>()
        .join("|");
    match Regex::new(&format!(r"(?i)\b(?:{alternation})\b")) {
        Ok(pattern) => Some(pattern),
        Err(err) => {
            warn!(
                error = %err,
                connectors = words.len(),
                "connector pattern rejected, repair disabled"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connectors(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn strips_parenthetical_hints() {
        assert_eq!(canonicalize("DAY IN (AND) DAY OUT"), "DAYINDAYOUT");
    }

    #[test]
    fn drops_punctuation_and_uppercases() {
        assert_eq!(canonicalize("Don't rock-the boat!"), "DONTROCKTHEBOAT");
        assert_eq!(canonicalize("4 x 4"), "X");
    }

    #[test]
    fn removes_every_closed_pair() {
        assert_eq!(canonicalize("(A) BIG (DEAL) FISH (IN) POND"), "BIGFISHPOND");
    }

    #[test]
    fn nested_parens_cut_at_first_close() {
        // "((A)" goes, the dangling ")" is punctuation.
        assert_eq!(canonicalize("((A)B) C"), "BC");
    }

    #[test]
    fn unclosed_paren_keeps_remaining_letters() {
        assert_eq!(canonicalize("OPEN (ENDED"), "OPENENDED");
    }

    #[test]
    fn no_letters_yields_empty() {
        assert_eq!(canonicalize(""), "");
        assert_eq!(canonicalize("(ONLY A HINT) 123 ?!"), "");
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let samples = [
            "DAY IN (AND) DAY OUT",
            "a-b c",
            "((x)y) z",
            "",
            "ÉCLAIR (pastry)",
        ];
        for sample in samples {
            let once = canonicalize(sample);
            assert_eq!(canonicalize(&once), once, "sample {sample:?}");
        }
    }

    #[test]
    fn wraps_whole_words_only() {
        let set = connectors(&["A", "THE", "IN"]);
        assert_eq!(
            wrap_connectors("A CAT IN THE HAT", &set),
            "(A) CAT (IN) (THE) HAT"
        );
        assert_eq!(wrap_connectors("THEATER ANTS", &set), "THEATER ANTS");
    }

    #[test]
    fn wrap_leaves_existing_hints_alone() {
        let set = connectors(&["IN", "AND"]);
        assert_eq!(
            wrap_connectors("DAY IN (AND) DAY OUT", &set),
            "DAY (IN) (AND) DAY OUT"
        );
    }

    #[test]
    fn wrap_treats_unclosed_paren_as_text() {
        let set = connectors(&["THE"]);
        assert_eq!(wrap_connectors("MAX (OF THE", &set), "MAX (OF (THE)");
        assert_eq!(
            wrap_connectors("(HINT) THE (OPEN THE", &set),
            "(HINT) (THE) (OPEN (THE)"
        );
    }

    #[test]
    fn oversized_connector_set_leaves_text_alone() {
        // Far past the compiled-size limit of the regex engine.
        let huge: BTreeSet<String> = (0..200_000)
            .map(|n| format!("W{n:05}{}", "X".repeat(40)))
            .collect();
        assert_eq!(wrap_connectors("TO THE MAX", &huge), "TO THE MAX");
    }

    #[test]
    fn wrap_is_case_insensitive() {
        let set = connectors(&["the"]);
        assert_eq!(wrap_connectors("To The Max", &set), "To (The) Max");
    }

    #[test]
    fn wrap_without_connectors_is_identity() {
        assert_eq!(wrap_connectors("TO THE MAX", &BTreeSet::new()), "TO THE MAX");
        assert_eq!(wrap_connectors("TO THE MAX", &connectors(&["  "])), "TO THE MAX");
    }

    #[test]
    fn wrapped_connectors_vanish_from_canonical_form() {
        let set = connectors(&["TO", "THE"]);
        assert_eq!(canonicalize(&wrap_connectors("TO THE MAX", &set)), "MAX");
    }
}
