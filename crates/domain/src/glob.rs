/// Shell-style wildcard match where `*` matches any run of characters,
/// dots included. Every other byte matches itself and the whole input must
/// be consumed.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern = pattern.as_bytes();
    let text = text.as_bytes();

    let (mut p, mut t) = (0usize, 0usize);
    // position of the last `*` seen and the text offset it currently covers up to
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some((star, covered)) = backtrack {
            p = star + 1;
            t = covered + 1;
            backtrack = Some((star, covered + 1));
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == b'*' {
        p += 1;
    }

    p == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::glob_match;

    #[test]
    fn test_wildcard_spans_labels() {
        assert!(glob_match("a*.*.com", "ads.google.com"));
        assert!(glob_match("a*.*.com", "ads.yahoo.com"));
        assert!(!glob_match("a*.*.com", "google.com"));
        assert!(!glob_match("a*.*.com", "ads.yahoo.org"));
        assert!(!glob_match("a*.*.com", "ads.com"));
    }

    #[test]
    fn test_literal_and_edges() {
        assert!(glob_match("google.com", "google.com"));
        assert!(!glob_match("google.com", "www.google.com"));
        assert!(glob_match("*", ""));
        assert!(glob_match("*.google.com", "mail.google.com"));
        assert!(!glob_match("*.google.com", "google.com"));
        assert!(glob_match("**", "anything.at.all"));
        assert!(!glob_match("", "x"));
    }
}
