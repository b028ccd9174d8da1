/// Escape a search term for a bracket-style `LIKE` pattern and wrap it in `%`
///
/// `%` becomes `[%]`, `[` becomes `[[]` and `]` becomes `[]]`. Every other
/// character passes through.
pub fn escape_like(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        match ch {
            '%' => pattern.push_str("[%]"),
            '[' => pattern.push_str("[[]"),
            ']' => pattern.push_str("[]]"),
            other => pattern.push(other),
        }
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_term_is_wrapped() {
        assert_eq!(escape_like("abc"), "%abc%");
        assert_eq!(escape_like(""), "%%");
    }

    #[test]
    fn test_special_characters_are_bracketed_once() {
        assert_eq!(escape_like("50%"), "%50[%]%");
        assert_eq!(escape_like("[x]"), "%[[]x[]]%");
        assert_eq!(escape_like("a%]b"), "%a[%][]]b%");
    }
}
