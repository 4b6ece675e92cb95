//! Path resolution: caller path + current directory → backend selection,
//! backend-local path, optional wildcard.
//!
//! Resolution is a pure string operation — no backend is consulted. Network
//! scheme prefixes short-circuit untouched, because those backends own their
//! own path grammar. Everything else is split on `/` and `\`, normalized
//! (`.` drops, `..` pops), and rejoined with `/` into a root-relative path.

use aqlink_types::proto::ROM_PREFIX;

use crate::vfs::BackendKind;

/// Outcome of path resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Which backend the path selects.
    pub kind: BackendKind,
    /// Backend-local path: `/`-separated, no leading separator, no `.`/`..`.
    /// Network paths pass through unmodified.
    pub path: String,
    /// Wildcard extracted from the final component, when requested.
    pub wildcard: Option<String>,
}

/// Resolve `path` against `current_path` (the context's current directory,
/// possibly carrying an `esp:` prefix).
///
/// With `extract_wildcard` set, a final component containing `*` or `?` is
/// removed from the path and returned separately — directory enumeration
/// uses it as a filter pattern.
pub fn resolve_path(path: &str, current_path: &str, extract_wildcard: bool) -> Resolved {
    // Network schemes pass through without normalization
    if path.starts_with("http://") || path.starts_with("https://") {
        return Resolved {
            kind: BackendKind::Http,
            path: path.to_string(),
            wildcard: None,
        };
    }
    if path.starts_with("tcp://") {
        return Resolved {
            kind: BackendKind::Tcp,
            path: path.to_string(),
            wildcard: None,
        };
    }

    let mut kind = BackendKind::Sdcard;
    let mut path = path;
    let mut use_cwd = true;

    if path.starts_with(['/', '\\']) {
        use_cwd = false;
    } else if let Some(rest) = path.strip_prefix(ROM_PREFIX) {
        use_cwd = false;
        kind = BackendKind::Rom;
        path = rest;
    }

    let mut parts: Vec<String> = Vec::new();
    if use_cwd {
        let cwd = match current_path.strip_prefix(ROM_PREFIX) {
            Some(rest) => {
                kind = BackendKind::Rom;
                rest
            }
            None => current_path,
        };
        split_path(cwd, &mut parts);
    }
    split_path(path, &mut parts);

    // Normalize: drop `.`, let `..` pop the previous component (or itself at
    // the root). Pure array surgery, no filesystem lookups.
    let mut idx = 0;
    while idx < parts.len() {
        if parts[idx] == "." {
            parts.remove(idx);
            continue;
        }
        if parts[idx] == ".." {
            parts.remove(idx);
            if idx > 0 {
                idx -= 1;
                parts.remove(idx);
            }
            continue;
        }
        idx += 1;
    }

    let wildcard = if extract_wildcard {
        match parts.last() {
            Some(last) if aqlink_glob::contains_wildcard(last) => parts.pop(),
            _ => None,
        }
    } else {
        None
    };

    Resolved {
        kind,
        path: parts.join("/"),
        wildcard,
    }
}

/// Append `/`- and `\`-separated components of `path` to `parts`, skipping
/// empty components.
fn split_path(path: &str, parts: &mut Vec<String>) {
    for part in path.split(['/', '\\']) {
        if !part.is_empty() {
            parts.push(part.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn resolve(path: &str, cwd: &str) -> Resolved {
        resolve_path(path, cwd, false)
    }

    #[rstest]
    #[case("a/./b/../c", "", "a/c")]
    #[case("a/c", "", "a/c")]
    #[case("/foo/bar", "ignored", "foo/bar")]
    #[case("..", "a/b", "a")]
    #[case("../..", "a/b", "")]
    #[case("../../..", "a/b", "")]
    #[case(".", "a/b", "a/b")]
    #[case("sub\\file.txt", "", "sub/file.txt")]
    fn normalization(#[case] path: &str, #[case] cwd: &str, #[case] expected: &str) {
        let r = resolve(path, cwd);
        assert_eq!(r.kind, BackendKind::Sdcard);
        assert_eq!(r.path, expected);
    }

    #[test]
    fn normalization_is_idempotent() {
        assert_eq!(resolve("a/./b/../c", ""), resolve("a/c", ""));
    }

    #[test]
    fn relative_prepends_cwd() {
        let r = resolve("file.txt", "games/roms");
        assert_eq!(r.path, "games/roms/file.txt");
    }

    #[test]
    fn rom_prefix_selects_archive() {
        let r = resolve("esp:boot.bin", "games");
        assert_eq!(r.kind, BackendKind::Rom);
        assert_eq!(r.path, "boot.bin");
    }

    #[test]
    fn rom_cwd_carries_over_to_relative_paths() {
        let r = resolve("help.txt", "esp:docs");
        assert_eq!(r.kind, BackendKind::Rom);
        assert_eq!(r.path, "docs/help.txt");
    }

    #[test]
    fn absolute_path_ignores_rom_cwd() {
        let r = resolve("/sd/file", "esp:docs");
        assert_eq!(r.kind, BackendKind::Sdcard);
        assert_eq!(r.path, "sd/file");
    }

    #[rstest]
    #[case("http://example.com/x?q=*", BackendKind::Http)]
    #[case("https://example.com/a/../b", BackendKind::Http)]
    #[case("tcp://host:1234", BackendKind::Tcp)]
    fn network_schemes_pass_through(#[case] path: &str, #[case] kind: BackendKind) {
        let r = resolve_path(path, "some/cwd", true);
        assert_eq!(r.kind, kind);
        assert_eq!(r.path, path);
        assert_eq!(r.wildcard, None);
    }

    #[test]
    fn wildcard_extraction() {
        let r = resolve_path("games/*.rom", "", true);
        assert_eq!(r.path, "games");
        assert_eq!(r.wildcard.as_deref(), Some("*.rom"));
    }

    #[test]
    fn wildcard_left_in_place_when_not_requested() {
        let r = resolve_path("games/*.rom", "", false);
        assert_eq!(r.path, "games/*.rom");
        assert_eq!(r.wildcard, None);
    }

    #[test]
    fn bare_wildcard_empties_path() {
        let r = resolve_path("*", "", true);
        assert_eq!(r.path, "");
        assert_eq!(r.wildcard.as_deref(), Some("*"));
    }
}
