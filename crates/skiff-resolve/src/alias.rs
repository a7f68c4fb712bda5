//! Import alias rewriting.
//!
//! Aliases rewrite a specifier before any file-system lookup. Matching is
//! prefix-based with a `/` boundary so alias `foo` rewrites `foo` and
//! `foo/bar` but never `foobar`. Chains are followed iteratively: after a
//! substitution the scan resumes *past* the matched entry, so each entry can
//! fire at most once per resolution and termination is bounded by table
//! length even for cyclic-looking tables.

use crate::paths;

/// Ordered alias table. Earlier entries shadow later ones when prefixes
/// overlap.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: Vec<(String, String)>,
}

fn is_relative(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../")
}

fn matches(specifier: &str, key: &str) -> bool {
    specifier == key
        || (specifier.starts_with(key) && specifier.as_bytes().get(key.len()) == Some(&b'/'))
}

impl AliasTable {
    /// Build a table from ordered `(prefix, replacement)` pairs.
    #[must_use]
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite a specifier through the table, following chains.
    ///
    /// Returns `None` when no alias applies. Explicitly relative specifiers
    /// bypass aliasing entirely, and a rewrite that produces a relative path
    /// stops the chain.
    #[must_use]
    pub fn rewrite(&self, specifier: &str) -> Option<String> {
        let mut current = specifier.to_string();
        let mut cursor = 0;
        let mut rewritten = false;

        while !is_relative(&current) {
            let hit = self.entries[cursor..]
                .iter()
                .enumerate()
                .find(|(_, (key, _))| matches(&current, key));
            let Some((offset, (key, target))) = hit else {
                break;
            };

            let rest = &current[key.len()..];
            current = paths::join_specifier(target, rest);
            // resume past the matched entry; each entry fires at most once
            cursor += offset + 1;
            rewritten = true;
        }

        rewritten.then_some(current)
    }
}
