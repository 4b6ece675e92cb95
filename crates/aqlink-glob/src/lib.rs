//! aqlink-glob: FAT-style wildcard matching for directory listings.
//!
//! Implements the matcher used by OPENDIR filtering:
//! - `*` matches zero or more characters (consecutive `*` collapse)
//! - `?` matches exactly one character
//! - all comparisons are case-insensitive
//! - a match only succeeds when the entire pattern and the entire text are
//!   consumed — there is no substring matching
//!
//! This is deliberately smaller than a shell glob: no character classes, no
//! brace expansion, no path awareness. Patterns arrive from the FPGA side as
//! the last component of an OPENDIR path.

use std::cell::Cell;

/// Maximum number of recursive calls for a single match. Protects against
/// adversarial patterns like `*a*a*a*...*a` that cause exponential
/// backtracking. Counted as total work, not stack depth.
const MAX_MATCH_CALLS: usize = 100_000;

/// Check if a string contains wildcard metacharacters (`*`, `?`).
///
/// The path resolver uses this to decide whether the last path component is
/// a filter pattern rather than a real name.
///
/// ```
/// use aqlink_glob::contains_wildcard;
/// assert!(contains_wildcard("*.txt"));
/// assert!(contains_wildcard("re?dme"));
/// assert!(!contains_wildcard("readme.txt"));
/// ```
pub fn contains_wildcard(s: &str) -> bool {
    s.contains('*') || s.contains('?')
}

/// Match a filename against a wildcard pattern, case-insensitively.
///
/// Returns true only if the pattern covers the whole text. The star
/// backtracks, so `*ab` matches `aab` — this is not a single greedy
/// left-to-right scan, and it accepts some names a greedy matcher would
/// reject.
///
/// # Examples
/// ```
/// use aqlink_glob::wildcard_match;
///
/// assert!(wildcard_match("REPORT.TXT", "*.TXT"));
/// assert!(wildcard_match("readme", "re?dme"));
/// assert!(wildcard_match("AbC", "abc"));
/// assert!(!wildcard_match("readme", "re?dme2"));
/// assert!(!wildcard_match("notes.txt.bak", "*.txt"));
/// ```
pub fn wildcard_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().flat_map(|c| c.to_lowercase()).collect();
    let pattern: Vec<char> = pattern.chars().flat_map(|c| c.to_lowercase()).collect();
    let calls = Cell::new(0usize);
    match_bounded(&pattern, 0, &text, 0, &calls)
}

/// Work-bounded recursive matching with backtracking for `*`.
///
/// Returns `false` (non-match) once total recursive calls exceed
/// `MAX_MATCH_CALLS`.
fn match_bounded(pattern: &[char], pi: usize, text: &[char], ti: usize, calls: &Cell<usize>) -> bool {
    let count = calls.get() + 1;
    calls.set(count);
    if count > MAX_MATCH_CALLS {
        return false;
    }

    // A match requires both sides fully consumed
    if pi >= pattern.len() && ti >= text.len() {
        return true;
    }
    if pi >= pattern.len() {
        return false;
    }

    match pattern[pi] {
        '*' => {
            // Runs of stars collapse to one
            let mut next_pi = pi;
            while next_pi < pattern.len() && pattern[next_pi] == '*' {
                next_pi += 1;
            }

            // A trailing star swallows the rest of the text
            if next_pi >= pattern.len() {
                return true;
            }

            // Let the star absorb 0, 1, 2, ... characters and backtrack
            for skip in 0..=(text.len() - ti) {
                if match_bounded(pattern, next_pi, text, ti + skip, calls) {
                    return true;
                }
            }
            false
        }

        '?' => {
            // Must have exactly one character available
            if ti >= text.len() {
                return false;
            }
            match_bounded(pattern, pi + 1, text, ti + 1, calls)
        }

        c => {
            if ti >= text.len() {
                return false;
            }
            if c == text[ti] {
                match_bounded(pattern, pi + 1, text, ti + 1, calls)
            } else {
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("REPORT.TXT", "*.TXT", true)]
    #[case("readme", "re?dme", true)]
    #[case("readme", "re?dme2", false)]
    #[case("AbC", "abc", true)]
    #[case("demo.rom", "*.ROM", true)]
    #[case("demo.rom", "*.bas", false)]
    fn fat_listing_patterns(#[case] text: &str, #[case] pattern: &str, #[case] expected: bool) {
        assert_eq!(wildcard_match(text, pattern), expected);
    }

    #[test]
    fn literal_match_is_case_insensitive() {
        assert!(wildcard_match("AbC", "abc"));
        assert!(wildcard_match("abc", "ABC"));
        assert!(!wildcard_match("abc", "abd"));
    }

    #[test]
    fn star_matches_zero_or_more() {
        assert!(wildcard_match("REPORT.TXT", "*.TXT"));
        assert!(wildcard_match(".TXT", "*.TXT"));
        assert!(wildcard_match("anything", "*"));
        assert!(wildcard_match("", "*"));
    }

    #[test]
    fn consecutive_stars_collapse() {
        assert!(wildcard_match("REPORT.TXT", "**.TXT"));
        assert!(wildcard_match("abc", "a***c"));
    }

    #[test]
    fn question_mark_is_exactly_one() {
        assert!(wildcard_match("readme", "re?dme"));
        assert!(!wildcard_match("redme", "re?dme"));
        assert!(!wildcard_match("readme", "re?dme2"));
    }

    #[test]
    fn no_substring_match() {
        assert!(!wildcard_match("notes.txt.bak", "*.txt"));
        assert!(!wildcard_match("abc", "ab"));
        assert!(!wildcard_match("ab", "abc"));
    }

    #[test]
    fn star_needs_backtracking() {
        // Greedy-first matching would fail these
        assert!(wildcard_match("aab", "*ab"));
        assert!(wildcard_match("a.txt.txt", "*.txt"));
    }

    #[test]
    fn empty_pattern_matches_only_empty_text() {
        assert!(wildcard_match("", ""));
        assert!(!wildcard_match("a", ""));
    }

    #[test]
    fn adversarial_pattern_terminates() {
        let text = "a".repeat(64);
        let pattern = "a*a*a*a*a*a*a*a*b";
        // Must return (false) rather than hang
        assert!(!wildcard_match(&text, pattern));
    }
}
