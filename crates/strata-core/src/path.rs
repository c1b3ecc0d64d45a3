//! Helpers for module-qualified paths such as `home:///docs/a.txt`.
//!
//! A path is an optional `scheme://` prefix followed by a slash-separated
//! remainder. The prefix is never split or rewritten by these helpers.

/// Split a path into its `scheme://` prefix (possibly empty) and the rest.
pub fn split_scheme(path: &str) -> (&str, &str) {
    match path.find("://") {
        Some(idx) => path.split_at(idx + 3),
        None => ("", path),
    }
}

/// Last non-empty segment of a path.
///
/// Returns an empty string for a module root such as `home:///`.
pub fn filename_of(path: &str) -> &str {
    let (_, rest) = split_scheme(path);
    rest.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("")
}

/// Parent directory of a path, keeping the scheme prefix.
///
/// The parent of a top-level entry is the module root (`home:///x` -> `home:///`).
pub fn parent_path(path: &str) -> String {
    let (scheme, rest) = split_scheme(path);
    let trimmed = rest.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => format!("{scheme}/"),
        Some(idx) => format!("{scheme}{}", &trimmed[..idx]),
    }
}

/// Join a directory path and an entry name.
pub fn join_path(dir: &str, name: &str) -> String {
    let name = name.trim_start_matches('/');
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Compare two paths ignoring trailing slashes (the root keeps its slash).
pub fn same_path(a: &str, b: &str) -> bool {
    fn canonical(p: &str) -> &str {
        let trimmed = p.trim_end_matches('/');
        if trimmed.ends_with(':') || trimmed.ends_with(":/") || trimmed.is_empty() {
            p
        } else {
            trimmed
        }
    }
    canonical(a) == canonical(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_of() {
        assert_eq!(filename_of("home:///docs/a.txt"), "a.txt");
        assert_eq!(filename_of("home:///docs/"), "docs");
        assert_eq!(filename_of("home:///"), "");
        assert_eq!(filename_of("/plain/file"), "file");
    }

    #[test]
    fn test_parent_path() {
        assert_eq!(parent_path("home:///docs/a.txt"), "home:///docs");
        assert_eq!(parent_path("home:///a.txt"), "home:///");
        assert_eq!(parent_path("home:///docs/"), "home:///");
        assert_eq!(parent_path("/plain/file"), "/plain");
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("home:///", "a.txt"), "home:///a.txt");
        assert_eq!(join_path("home:///docs", "a.txt"), "home:///docs/a.txt");
        assert_eq!(join_path("home:///docs/", "/a.txt"), "home:///docs/a.txt");
    }

    #[test]
    fn test_same_path() {
        assert!(same_path("home:///.packages", "home:///.packages/"));
        assert!(same_path("home:///", "home:///"));
        assert!(!same_path("home:///a", "home:///b"));
    }
}
