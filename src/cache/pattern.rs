//! Glob patterns over canonical cache keys.
//!
//! `*` matches any run of characters (including none) and may appear any
//! number of times. Every other character, `?` included, is literal, since
//! canonical keys contain `?` and `=` themselves. Patterns are anchored at
//! both ends: `users:*` matches `users:7` but not `admin-users:7`.

/// Compiled invalidation pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPattern {
    /// Literal fragments between wildcards. A pattern without `*` has one.
    parts: Vec<String>,
}

impl KeyPattern {
    pub fn new(pattern: &str) -> Self {
        Self {
            parts: pattern.split('*').map(str::to_string).collect(),
        }
    }

    pub fn has_wildcard(&self) -> bool {
        self.parts.len() > 1
    }

    pub fn matches(&self, key: &str) -> bool {
        let (first, rest) = match self.parts.split_first() {
            Some(split) => split,
            None => return key.is_empty(),
        };
        if rest.is_empty() {
            return key == first;
        }
        let Some(mut remaining) = key.strip_prefix(first.as_str()) else {
            return false;
        };

        let Some((last, middle)) = rest.split_last() else {
            return false;
        };
        for part in middle {
            match remaining.find(part.as_str()) {
                Some(idx) => remaining = &remaining[idx + part.len()..],
                None => return false,
            }
        }
        remaining.len() >= last.len() && remaining.ends_with(last.as_str())
    }
}

impl From<&str> for KeyPattern {
    fn from(pattern: &str) -> Self {
        KeyPattern::new(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_wildcard_is_prefix_match() {
        let p = KeyPattern::new("users:*");
        assert!(p.matches("users:1"));
        assert!(p.matches("users:"));
        assert!(p.matches("users:1?page=2"));
        assert!(!p.matches("users"));
        assert!(!p.matches("admin-users:1"));
    }

    #[test]
    fn no_wildcard_is_exact() {
        let p = KeyPattern::new("profile");
        assert!(!p.has_wildcard());
        assert!(p.matches("profile"));
        assert!(!p.matches("profile:1"));
    }

    #[test]
    fn leading_and_inner_wildcards() {
        let p = KeyPattern::new("*?page=*");
        assert!(p.matches("animals?page=1"));
        assert!(!p.matches("animals:4"));

        let p = KeyPattern::new("tenants:*:members*");
        assert!(p.matches("tenants:3:members"));
        assert!(p.matches("tenants:3:members?role=\"owner\""));
        assert!(!p.matches("tenants:3"));
    }

    #[test]
    fn question_mark_is_literal() {
        let p = KeyPattern::new("a?x=*");
        assert!(p.matches("a?x=1"));
        assert!(!p.matches("ab?x=1"));
        assert!(!p.matches("abx=1"));
    }

    #[test]
    fn overlapping_prefix_and_suffix() {
        // "ab*ba" must not accept "aba" by sharing the middle character.
        let p = KeyPattern::new("ab*ba");
        assert!(!p.matches("aba"));
        assert!(p.matches("abba"));
        assert!(p.matches("ab-ba"));
    }

    #[test]
    fn lone_wildcard_matches_everything() {
        let p = KeyPattern::new("*");
        assert!(p.matches(""));
        assert!(p.matches("anything:at?all=1"));
    }
}
