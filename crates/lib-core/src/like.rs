/// Default escape character of SQL `LIKE` patterns.
pub const LIKE_ESCAPE: char = '|';

/// Translate a SQL `LIKE` pattern into a regex: `%` becomes `.*`, `_`
/// becomes `.`, and a character preceded by the escape is literal.
///
/// Everything else passes through verbatim, so regex metacharacters keep
/// their regex meaning; matching is unanchored.
pub fn like_to_regex(pattern: &str, escape: char) -> String {
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut escaped = false;
    for c in pattern.chars() {
        if escaped {
            escaped = false;
            out.push(c);
            continue;
        }
        match c {
            _ if c == escape => escaped = true,
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            _ => out.push(c),
        }
    }
    out
}

pub fn like_to_regex_default(pattern: &str) -> String {
    like_to_regex(pattern, LIKE_ESCAPE)
}
