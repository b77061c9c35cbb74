use std::collections::HashSet;

/// Mask character used when the caller does not choose one.
pub const DEFAULT_MASK: char = '*';

/// Replaces solved letters of the display answer with `mask`.
///
/// A letter is masked when its uppercase form appears anywhere in
/// `solved_letters`; the number of occurrences is irrelevant. Characters
/// between `(` and `)` are hints and are copied verbatim, as are the
/// parentheses themselves and anything that is not a letter.
pub fn sanitize(answer_display: &str, solved_letters: &str, mask: char) -> String {
    let solved: HashSet<char> = solved_letters.chars().flat_map(char::to_uppercase).collect();
    let mut inside_parens = false;
    let mut out = String::with_capacity(answer_display.len());
    for c in answer_display.chars() {
        match c {
            '(' => {
                inside_parens = true;
                out.push(c);
            }
            ')' => {
                out.push(c);
                inside_parens = false;
            }
            _ if !inside_parens
                && c.is_alphabetic()
                && c.to_uppercase().all(|upper| solved.contains(&upper)) =>
            {
                out.push(mask)
            }
            _ => out.push(c),
        }
    }
    out
}
