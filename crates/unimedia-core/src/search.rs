//! Substring search patterns for `LIKE` / `ILIKE`.

/// Wraps `term` in `%...%` with `\`, `%` and `_` escaped, so the term only
/// ever matches literally. Relies on Postgres' default `\` escape character.
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
