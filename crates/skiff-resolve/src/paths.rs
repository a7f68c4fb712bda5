//! Lexical path helpers.
//!
//! Resolution compares paths that were assembled from manifest fields and
//! specifier strings, so they are normalized without touching the filesystem:
//! `.` segments drop, `..` pops, separators collapse.

use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path: resolve `.` and `..` segments without
/// consulting the filesystem.
///
/// A `..` at the root is dropped rather than kept, matching what
/// `path.resolve`/`path.join` do for absolute inputs.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    // relative path escaping its base keeps the `..`
                    out.push(Component::ParentDir.as_os_str());
                }
            }
            Component::Normal(s) => out.push(s),
        }
    }
    out
}

/// Stringify a path for use as a remap-table or cache key.
#[must_use]
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Join an alias target with the remainder of a matched specifier.
///
/// `rest` is either empty or starts with `/`. The result is normalized the
/// way `path.join` would: `join_specifier("./src", "/x/../y")` is `"src/y"`.
#[must_use]
pub fn join_specifier(target: &str, rest: &str) -> String {
    let combined = if rest.is_empty() {
        target.to_string()
    } else {
        format!("{}/{}", target.trim_end_matches('/'), rest.trim_start_matches('/'))
    };

    let absolute = combined.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in combined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(segments.last(), Some(&s) if s != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            s => segments.push(s),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_dot_segments() {
        assert_eq!(
            normalize(Path::new("/a/./b/../c")),
            PathBuf::from("/a/c")
        );
    }

    #[test]
    fn normalize_keeps_escaping_parent_for_relative() {
        assert_eq!(normalize(Path::new("../x")), PathBuf::from("../x"));
    }

    #[test]
    fn join_specifier_strips_leading_dot_dir() {
        assert_eq!(join_specifier("./src", "/components"), "src/components");
    }

    #[test]
    fn join_specifier_empty_rest_is_target() {
        assert_eq!(join_specifier("lodash-es", ""), "lodash-es");
    }

    #[test]
    fn join_specifier_resolves_parent_segments() {
        assert_eq!(join_specifier("/pkg/lib", "/../dist/index.js"), "/pkg/dist/index.js");
    }
}
