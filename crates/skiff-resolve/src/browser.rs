//! Browser-field remapping.
//!
//! Implements the package "browser" field mapping protocol
//! (<https://github.com/defunctzombie/package-browser-field-spec>): a package
//! can substitute files for browser builds, or nullify a module entirely by
//! mapping it to `false`. Remapping is package-scoped, not request-scoped, so
//! the table built while resolving into a package is cached against the
//! resolved file; later resolutions importing *from* that file inherit it.

use crate::paths::{self, path_key};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// One entry of a browser remap table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserTarget {
    /// `"x": false` — substitute the shared empty module.
    Ignore,
    /// `"x": "./y.js"` — substitute this file (absolute, package-rooted).
    Redirect(PathBuf),
}

/// Remap table for one package: specifier-or-absolute-path → target.
pub type BrowserMap = HashMap<String, BrowserTarget>;

/// Build the remap table from a package manifest.
///
/// Returns `None` unless the manifest carries a top-level object-valued
/// `browser` field. Relative keys are additionally registered under their
/// absolute form and, when they carry no extension, under every configured
/// extension appended to that absolute form — so a bare relative key matches
/// however extension resolution ultimately spells the file.
#[must_use]
pub fn build_browser_map(
    manifest: &Value,
    pkg_dir: &Path,
    extensions: &[String],
) -> Option<BrowserMap> {
    let entries = manifest.get("browser")?.as_object()?;
    let mut map = BrowserMap::new();

    for (key, value) in entries {
        let target = match value {
            Value::Bool(false) => BrowserTarget::Ignore,
            Value::String(replacement) => {
                BrowserTarget::Redirect(paths::normalize(&pkg_dir.join(replacement)))
            }
            // only string-valued entries participate in the protocol
            _ => continue,
        };

        map.insert(key.clone(), target.clone());

        if key.starts_with('.') {
            let absolute = path_key(&paths::normalize(&pkg_dir.join(key)));
            if Path::new(key).extension().is_none() {
                for ext in extensions {
                    map.insert(format!("{absolute}{ext}"), target.clone());
                }
            }
            map.insert(absolute, target);
        }
    }

    Some(map)
}

/// Look up a specifier in an importer's remap table (remapper step 1).
///
/// The ignore sentinel is only honored for the literal specifier or its
/// directory-resolved form; redirects additionally match the resolved form
/// with a `.js` or `.json` suffix.
#[must_use]
pub fn remap_specifier(
    map: &BrowserMap,
    specifier: &str,
    base_dir: &Path,
) -> Option<BrowserTarget> {
    let resolved = path_key(&paths::normalize(&base_dir.join(specifier)));

    if matches!(map.get(specifier), Some(BrowserTarget::Ignore))
        || matches!(map.get(&resolved), Some(BrowserTarget::Ignore))
    {
        return Some(BrowserTarget::Ignore);
    }

    let with_js = format!("{resolved}.js");
    let with_json = format!("{resolved}.json");
    for key in [specifier, resolved.as_str(), with_js.as_str(), with_json.as_str()] {
        if let Some(BrowserTarget::Redirect(path)) = map.get(key) {
            return Some(BrowserTarget::Redirect(path.clone()));
        }
    }
    None
}

/// Process-wide association of resolved file → remap table, so a module
/// imported from a browser-mapped file inherits its package's mapping.
///
/// Writes are idempotent (re-deriving a package's table yields the same
/// content) and readers fall through to unmapped resolution on a miss, so no
/// coordination beyond the lock is needed.
#[derive(Debug, Default)]
pub struct BrowserMapCache {
    inner: RwLock<HashMap<String, Arc<BrowserMap>>>,
}

impl BrowserMapCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Table applying to modules imported from `importer`, if any.
    #[must_use]
    pub fn get(&self, importer: &Path) -> Option<Arc<BrowserMap>> {
        self.inner
            .read()
            .expect("browser map cache lock poisoned")
            .get(&path_key(importer))
            .cloned()
    }

    /// Register `resolved` as carrying `map` for its future importees.
    pub fn insert(&self, resolved: &Path, map: Arc<BrowserMap>) {
        self.inner
            .write()
            .expect("browser map cache lock poisoned")
            .insert(path_key(resolved), map);
    }

    /// End-of-build reset; tables are invalid across builds.
    pub fn clear(&self) {
        self.inner
            .write()
            .expect("browser map cache lock poisoned")
            .clear();
    }
}
