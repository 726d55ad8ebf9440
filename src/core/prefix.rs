//! Logger-name prefix matching
//!
//! Logger names are hierarchical paths such as `github.com/user/repo`,
//! `app.net.http` or `app::net::http`. A configuration prefix only matches on
//! a segment boundary, so `git` never matches `github.com/x`.

/// Characters that separate segments of a logger name.
pub const SEPARATORS: [char; 3] = ['/', '.', ':'];

#[inline]
fn is_separator(c: char) -> bool {
    SEPARATORS.contains(&c)
}

/// Returns true when `prefix` selects the logger called `name`.
///
/// The empty prefix matches every name.
pub fn matches(name: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    let Some(rest) = name.strip_prefix(prefix) else {
        return false;
    };
    match rest.chars().next() {
        None => true,
        Some(next) => is_separator(next) || prefix.ends_with(is_separator),
    }
}

/// A configuration value attached to a name prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule<T> {
    pub prefix: String,
    pub value: T,
}

impl<T> Rule<T> {
    pub fn new(prefix: impl Into<String>, value: T) -> Self {
        Self {
            prefix: prefix.into(),
            value,
        }
    }
}

/// Picks the matching rule with the longest prefix.
///
/// Rules are scanned in registration order; on equal length the later rule
/// wins.
pub fn longest_match<'a, T>(rules: &'a [Rule<T>], name: &str) -> Option<&'a Rule<T>> {
    let mut best: Option<&Rule<T>> = None;
    for rule in rules {
        if !matches(name, &rule.prefix) {
            continue;
        }
        match best {
            Some(current) if rule.prefix.len() < current.prefix.len() => {}
            _ => best = Some(rule),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_prefix_matches_everything() {
        assert!(matches("", ""));
        assert!(matches("anything/at/all", ""));
    }

    #[test]
    fn test_segment_boundary() {
        assert!(!matches("github.com/x", "git"));
        assert!(matches("github.com/x", "github.com"));
        assert!(matches("github.com", "github.com"));
        assert!(matches("github.com/x", "github.com/"));
        assert!(matches("app::net::tcp", "app::net"));
        assert!(!matches("app::network", "app::net"));
        assert!(!matches("git", "github.com"));
    }

    #[test]
    fn test_longest_match_wins() {
        let rules = vec![Rule::new("", 0), Rule::new("a", 1), Rule::new("a/b", 2)];
        assert_eq!(longest_match(&rules, "a/b/c").map(|r| r.value), Some(2));
        assert_eq!(longest_match(&rules, "a/bc").map(|r| r.value), Some(1));
        assert_eq!(longest_match(&rules, "z").map(|r| r.value), Some(0));
    }

    #[test]
    fn test_equal_length_later_rule_wins() {
        let rules = vec![Rule::new("a", 1), Rule::new("a", 7)];
        assert_eq!(longest_match(&rules, "a/x").map(|r| r.value), Some(7));
    }

    #[test]
    fn test_no_match() {
        let rules = vec![Rule::new("a", 1)];
        assert!(longest_match(&rules, "b").is_none());
    }
}
