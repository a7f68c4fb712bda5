//! Node-style module location: `load_as_file`, `load_as_directory`, and the
//! `node_modules` ancestor walk.
//!
//! This layer is deliberately policy-free. It finds files the way `node`
//! does; which manifest field names the package entry (and whether the hit
//! should later be disregarded) is delegated to a [`ManifestHook`] supplied
//! by the caller.

use crate::builtins::is_builtin;
use crate::fs_cache::{FsError, ModuleFs};
use crate::paths;
use serde_json::Value;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};

/// Result of locating a module on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageOutcome {
    /// Found at this path.
    Resolved(PathBuf),
    /// Found at this path, but a manifest hook asked for the hit to be
    /// discarded by the caller.
    Disregarded(PathBuf),
    /// Nothing on disk, but the specifier names a runtime builtin.
    Builtin(String),
    /// Nothing on disk and not a builtin.
    NotFound,
}

/// What a [`ManifestHook`] decided for one `package.json`.
#[derive(Debug, Clone, Default)]
pub struct EntrySelection {
    /// Entry path relative to the package root, if the manifest names one.
    pub entry: Option<String>,
    /// Ask the caller to discard the final hit. Sticky across nested
    /// manifests within one resolution.
    pub disregard: bool,
}

/// Caller-supplied entry selection, invoked once per `package.json` read
/// while resolving a single specifier.
pub trait ManifestHook {
    fn package_entry(&mut self, manifest: &Value, pkg_dir: &Path) -> EntrySelection;
}

/// Selects `manifest.main` and nothing else.
#[derive(Debug, Default)]
pub struct MainFieldHook;

impl ManifestHook for MainFieldHook {
    fn package_entry(&mut self, manifest: &Value, _pkg_dir: &Path) -> EntrySelection {
        EntrySelection {
            entry: manifest
                .get("main")
                .and_then(Value::as_str)
                .map(str::to_owned),
            disregard: false,
        }
    }
}

/// Inputs for one resolution.
#[derive(Debug, Clone, Copy)]
pub struct NpmParams<'a> {
    /// Directory relative specifiers resolve against, and the start of the
    /// ancestor walk for bare ones.
    pub base_dir: &'a Path,
    /// Extensions to append when probing, each with its leading dot.
    pub extensions: &'a [String],
    /// Directory name walked at each ancestor, normally `node_modules`.
    pub module_directory: &'a str,
    /// Extra directories appended after the ancestor walk is exhausted.
    pub fallback_paths: &'a [PathBuf],
}

/// Locate `specifier` the way `node` would from `params.base_dir`.
///
/// Relative and absolute specifiers probe the named path directly; bare
/// specifiers walk `module_directory` under every ancestor and then the
/// fallback paths. A bare miss falls back to the builtin table, so a
/// package that shadows a builtin name wins over the builtin.
pub async fn resolve_module(
    specifier: &str,
    params: NpmParams<'_>,
    hook: &mut dyn ManifestHook,
    fs: &dyn ModuleFs,
) -> Result<PackageOutcome, FsError> {
    let mut walk = Walk {
        extensions: params.extensions,
        fs,
        hook,
        disregard: false,
    };

    let found = if is_path_like(specifier) {
        let target = paths::normalize(&params.base_dir.join(specifier));
        match walk.load_as_file(&target).await? {
            Some(hit) => Some(hit),
            None => walk.load_as_directory(&target).await?,
        }
    } else {
        walk.load_node_modules(specifier, &params).await?
    };

    Ok(match found {
        Some(path) if walk.disregard => PackageOutcome::Disregarded(path),
        Some(path) => PackageOutcome::Resolved(path),
        None if !is_path_like(specifier) && is_builtin(specifier) => {
            PackageOutcome::Builtin(specifier.to_owned())
        }
        None => PackageOutcome::NotFound,
    })
}

fn is_path_like(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
        || has_drive_prefix(specifier)
}

fn has_drive_prefix(specifier: &str) -> bool {
    let bytes = specifier.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

struct Walk<'a> {
    extensions: &'a [String],
    fs: &'a dyn ModuleFs,
    hook: &'a mut dyn ManifestHook,
    disregard: bool,
}

impl Walk<'_> {
    async fn exists(&self, path: &Path) -> Result<bool, FsError> {
        match self.fs.is_file(path).await {
            Ok(hit) => Ok(hit),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// The exact path, then the path with each extension appended.
    /// Extensions append to whatever is there, so `file.min` probes
    /// `file.min.js` rather than replacing the suffix.
    async fn load_as_file(&self, path: &Path) -> Result<Option<PathBuf>, FsError> {
        if self.exists(path).await? {
            return Ok(Some(path.to_path_buf()));
        }
        for ext in self.extensions {
            let mut candidate = OsString::from(path.as_os_str());
            candidate.push(ext);
            let candidate = PathBuf::from(candidate);
            if self.exists(&candidate).await? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    async fn load_index(&self, dir: &Path) -> Result<Option<PathBuf>, FsError> {
        for ext in self.extensions {
            let candidate = dir.join(format!("index{ext}"));
            if self.exists(&candidate).await? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    async fn load_as_directory(&mut self, dir: &Path) -> Result<Option<PathBuf>, FsError> {
        let manifest_path = dir.join("package.json");
        match self.fs.read_file(&manifest_path).await {
            Ok(source) => match serde_json::from_str::<Value>(&source) {
                Ok(manifest) => {
                    let selection = self.hook.package_entry(&manifest, dir);
                    self.disregard |= selection.disregard;
                    if let Some(entry) = selection.entry {
                        let entry_path = paths::normalize(&dir.join(entry));
                        if let Some(hit) = self.load_as_file(&entry_path).await? {
                            return Ok(Some(hit));
                        }
                        if let Some(hit) = self.load_index(&entry_path).await? {
                            return Ok(Some(hit));
                        }
                    }
                }
                Err(err) => {
                    tracing::debug!(path = %manifest_path.display(), error = %err, "skipping unparseable manifest");
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
        self.load_index(dir).await
    }

    async fn load_node_modules(
        &mut self,
        specifier: &str,
        params: &NpmParams<'_>,
    ) -> Result<Option<PathBuf>, FsError> {
        for dir in module_dirs(params) {
            let candidate = dir.join(specifier);
            if let Some(hit) = self.load_as_file(&candidate).await? {
                return Ok(Some(hit));
            }
            if let Some(hit) = self.load_as_directory(&candidate).await? {
                return Ok(Some(hit));
            }
        }
        Ok(None)
    }
}

/// `module_directory` under every ancestor of the base directory (skipping
/// ancestors that are themselves such a directory), then the fallbacks.
fn module_dirs(params: &NpmParams<'_>) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let mut current = Some(params.base_dir);
    while let Some(dir) = current {
        if dir.file_name() != Some(OsStr::new(params.module_directory)) {
            dirs.push(dir.join(params.module_directory));
        }
        current = dir.parent();
    }
    dirs.extend(params.fallback_paths.iter().cloned());
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs_cache::FsCache;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn params<'a>(base: &'a Path, extensions: &'a [String]) -> NpmParams<'a> {
        NpmParams {
            base_dir: base,
            extensions,
            module_directory: "node_modules",
            fallback_paths: &[],
        }
    }

    fn exts() -> Vec<String> {
        vec![".mjs".into(), ".js".into(), ".json".into(), ".node".into()]
    }

    async fn locate(specifier: &str, base: &Path) -> PackageOutcome {
        let extensions = exts();
        let fs = FsCache::new();
        resolve_module(specifier, params(base, &extensions), &mut MainFieldHook, &fs)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn relative_specifier_completes_extension() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/util.js", "");
        let outcome = locate("./util", &dir.path().join("src")).await;
        assert_eq!(
            outcome,
            PackageOutcome::Resolved(dir.path().join("src/util.js"))
        );
    }

    #[tokio::test]
    async fn extension_appends_rather_than_replaces() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "lib.min.js", "");
        let outcome = locate("./lib.min", dir.path()).await;
        assert_eq!(outcome, PackageOutcome::Resolved(dir.path().join("lib.min.js")));
    }

    #[tokio::test]
    async fn directory_uses_main_then_index() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "pkg/package.json", r#"{"main": "entry.js"}"#);
        write(dir.path(), "pkg/entry.js", "");
        write(dir.path(), "plain/index.js", "");

        let with_main = locate("./pkg", dir.path()).await;
        assert_eq!(
            with_main,
            PackageOutcome::Resolved(dir.path().join("pkg/entry.js"))
        );

        let with_index = locate("./plain", dir.path()).await;
        assert_eq!(
            with_index,
            PackageOutcome::Resolved(dir.path().join("plain/index.js"))
        );
    }

    #[tokio::test]
    async fn main_naming_a_directory_loads_its_index() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "pkg/package.json", r#"{"main": "lib"}"#);
        write(dir.path(), "pkg/lib/index.js", "");
        let outcome = locate("./pkg", dir.path()).await;
        assert_eq!(
            outcome,
            PackageOutcome::Resolved(dir.path().join("pkg/lib/index.js"))
        );
    }

    #[tokio::test]
    async fn unparseable_manifest_falls_back_to_index() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "pkg/package.json", "{ nope");
        write(dir.path(), "pkg/index.js", "");
        let outcome = locate("./pkg", dir.path()).await;
        assert_eq!(
            outcome,
            PackageOutcome::Resolved(dir.path().join("pkg/index.js"))
        );
    }

    #[tokio::test]
    async fn bare_specifier_walks_ancestors() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "node_modules/dep/package.json",
            r#"{"main": "dep.js"}"#,
        );
        write(dir.path(), "node_modules/dep/dep.js", "");
        let deep = dir.path().join("app/src/components");
        fs::create_dir_all(&deep).unwrap();
        let outcome = locate("dep", &deep).await;
        assert_eq!(
            outcome,
            PackageOutcome::Resolved(dir.path().join("node_modules/dep/dep.js"))
        );
    }

    #[tokio::test]
    async fn walk_from_inside_module_directory_finds_siblings() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "node_modules/dep/index.js", "");
        let base = dir.path().join("node_modules/app");
        fs::create_dir_all(&base).unwrap();
        let outcome = locate("dep", &base).await;
        assert_eq!(
            outcome,
            PackageOutcome::Resolved(dir.path().join("node_modules/dep/index.js"))
        );
    }

    #[tokio::test]
    async fn subpath_import_skips_manifest() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "node_modules/dep/package.json",
            r#"{"main": "dep.js"}"#,
        );
        write(dir.path(), "node_modules/dep/map.js", "");
        let outcome = locate("dep/map", dir.path()).await;
        assert_eq!(
            outcome,
            PackageOutcome::Resolved(dir.path().join("node_modules/dep/map.js"))
        );
    }

    #[tokio::test]
    async fn local_package_shadows_builtin() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "node_modules/fs/index.js", "");
        let outcome = locate("fs", dir.path()).await;
        assert_eq!(
            outcome,
            PackageOutcome::Resolved(dir.path().join("node_modules/fs/index.js"))
        );
    }

    #[tokio::test]
    async fn builtin_is_a_fallback_after_the_walk() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            locate("path", dir.path()).await,
            PackageOutcome::Builtin("path".into())
        );
        assert_eq!(locate("no-such-pkg", dir.path()).await, PackageOutcome::NotFound);
    }

    #[tokio::test]
    async fn fallback_paths_are_searched_last() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "vendored/dep/index.js", "");
        let extensions = exts();
        let fallback = vec![dir.path().join("vendored")];
        let p = NpmParams {
            base_dir: dir.path(),
            extensions: &extensions,
            module_directory: "node_modules",
            fallback_paths: &fallback,
        };
        let fs = FsCache::new();
        let outcome = resolve_module("dep", p, &mut MainFieldHook, &fs)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            PackageOutcome::Resolved(dir.path().join("vendored/dep/index.js"))
        );
    }

    #[tokio::test]
    async fn disregard_flag_survives_nested_manifests() {
        struct Disregarding;
        impl ManifestHook for Disregarding {
            fn package_entry(&mut self, manifest: &Value, _pkg_dir: &Path) -> EntrySelection {
                EntrySelection {
                    entry: manifest.get("main").and_then(Value::as_str).map(str::to_owned),
                    disregard: true,
                }
            }
        }

        let dir = TempDir::new().unwrap();
        write(dir.path(), "pkg/package.json", r#"{"main": "entry.js"}"#);
        write(dir.path(), "pkg/entry.js", "");
        let extensions = exts();
        let fs = FsCache::new();
        let outcome = resolve_module(
            "./pkg",
            params(dir.path(), &extensions),
            &mut Disregarding,
            &fs,
        )
        .await
        .unwrap();
        assert_eq!(
            outcome,
            PackageOutcome::Disregarded(dir.path().join("pkg/entry.js"))
        );
    }
}
