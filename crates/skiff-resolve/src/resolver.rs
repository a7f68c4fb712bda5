//! Resolution orchestrator.
//!
//! Ties the pieces together for one specifier: alias rewriting, inherited
//! browser remaps, the `only` allow-list, node-style location with the
//! configured entry-field policy, post-resolution browser substitution,
//! symlink normalization, builtin preference, jail confinement, and the
//! ES-module gate.

use crate::alias::AliasTable;
use crate::browser::{self, BrowserMap, BrowserMapCache, BrowserTarget};
use crate::builtins::is_builtin;
use crate::config::ResolveOptions;
use crate::error::Error;
use crate::esm;
use crate::fields;
use crate::fs_cache::{FsCache, FsError};
use crate::npm::{self, EntrySelection, ManifestHook, NpmParams, PackageOutcome};
use crate::paths::{self, path_key};
use regex_lite::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Module id handed to the host when a browser mapping nullifies a
/// specifier. The host serves [`EMPTY_MODULE_SOURCE`] for it. The leading
/// NUL keeps it out of every other resolver's way.
pub const EMPTY_MODULE_ID: &str = "\0virtual:empty";

/// Source text of the shared empty module.
pub const EMPTY_MODULE_SOURCE: &str = "export default {};\n";

/// Outcome of resolving one specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Resolved to this file.
    Path(PathBuf),
    /// Nullified by a browser mapping; the host should load
    /// [`EMPTY_MODULE_ID`].
    EmptyModule,
    /// Not ours to answer. The host falls through to its other resolvers.
    Defer,
}

enum OnlyMatcher {
    Exact(String),
    Pattern(Regex),
}

impl OnlyMatcher {
    fn matches(&self, id: &str) -> bool {
        match self {
            Self::Exact(s) => s == id,
            Self::Pattern(re) => re.is_match(id),
        }
    }
}

/// Node-style module resolver for a bundler host.
///
/// Construction validates the option set; [`resolve`](Self::resolve) never
/// fails, reporting anything it cannot answer as [`Resolution::Defer`].
#[derive(Debug)]
pub struct NodeResolver {
    fields: Vec<String>,
    extensions: Vec<String>,
    aliases: AliasTable,
    only: Option<Vec<OnlyMatcher>>,
    jail: Option<PathBuf>,
    prefer_builtins: bool,
    prefer_builtins_set: bool,
    modules_only: bool,
    preserve_symlinks: bool,
    module_directory: String,
    fallback_paths: Vec<PathBuf>,
    browser_active: bool,
    fs: FsCache,
    browser_maps: BrowserMapCache,
    warned_prefer_builtins: AtomicBool,
}

impl std::fmt::Debug for OnlyMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(s) => f.debug_tuple("Exact").field(s).finish(),
            Self::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
        }
    }
}

impl NodeResolver {
    /// Build a resolver from validated options.
    ///
    /// # Errors
    /// Rejects the removed `skip` option, contradictory or empty entry-field
    /// configuration, and malformed `only` patterns.
    pub fn new(options: ResolveOptions) -> Result<Self, Error> {
        Self::with_fs(options, FsCache::new())
    }

    /// Like [`new`](Self::new) with a caller-supplied filesystem layer.
    pub fn with_fs(options: ResolveOptions, fs: FsCache) -> Result<Self, Error> {
        if options.skip.is_some() {
            return Err(Error::SkipRemoved);
        }

        let fields = fields::main_fields(&options)?;

        let only = match &options.only {
            None => None,
            Some(patterns) => {
                let mut matchers = Vec::with_capacity(patterns.len());
                for pattern in patterns {
                    matchers.push(compile_only(pattern)?);
                }
                Some(matchers)
            }
        };

        let browser_active = fields.iter().any(|f| f == "browser");

        Ok(Self {
            browser_active,
            fields,
            extensions: options.extension_list(),
            aliases: AliasTable::new(options.alias),
            only,
            jail: options.jail.as_deref().map(paths::normalize),
            prefer_builtins: options.prefer_builtins.unwrap_or(true),
            prefer_builtins_set: options.prefer_builtins.is_some(),
            modules_only: options.modules_only,
            preserve_symlinks: options.preserve_symlinks,
            module_directory: options
                .custom
                .module_directory
                .unwrap_or_else(|| "node_modules".to_string()),
            fallback_paths: options.custom.paths,
            fs,
            browser_maps: BrowserMapCache::new(),
            warned_prefer_builtins: AtomicBool::new(false),
        })
    }

    /// Resolve `specifier` as imported from `importer`.
    ///
    /// Specifiers carrying a NUL byte belong to other resolvers and are
    /// deferred untouched. I/O failures defer rather than abort the build.
    pub async fn resolve(&self, specifier: &str, importer: Option<&Path>) -> Resolution {
        if specifier.contains('\0') {
            return Resolution::Defer;
        }
        match self.resolve_inner(specifier, importer).await {
            Ok(resolution) => resolution,
            Err(err) => {
                tracing::debug!(specifier, error = %err, "deferring after i/o failure");
                Resolution::Defer
            }
        }
    }

    async fn resolve_inner(
        &self,
        specifier: &str,
        importer: Option<&Path>,
    ) -> Result<Resolution, FsError> {
        let base_dir = match importer.and_then(Path::parent) {
            Some(dir) => dir.to_path_buf(),
            None => std::env::current_dir().map_err(Arc::new)?,
        };

        let mut specifier = specifier.to_string();
        if let Some(rewritten) = self.aliases.rewrite(&specifier) {
            specifier = rewritten;
        }

        // a remap table inherited from the importer rewrites the request
        // before any disk probing happens
        if self.browser_active {
            if let Some(map) = importer.and_then(|i| self.browser_maps.get(i)) {
                match browser::remap_specifier(&map, &specifier, &base_dir) {
                    Some(BrowserTarget::Ignore) => return Ok(Resolution::EmptyModule),
                    Some(BrowserTarget::Redirect(target)) => specifier = path_key(&target),
                    None => {}
                }
            }
        }

        if let Some(matchers) = &self.only {
            let id = classify(&specifier, &base_dir);
            if !matchers.iter().any(|m| m.matches(&id)) {
                return Ok(Resolution::Defer);
            }
        }

        let mut hook = FieldHook {
            fields: &self.fields,
            extensions: &self.extensions,
            browser_active: self.browser_active,
            browser_map: None,
        };
        let params = NpmParams {
            base_dir: &base_dir,
            extensions: &self.extensions,
            module_directory: &self.module_directory,
            fallback_paths: &self.fallback_paths,
        };
        let outcome = npm::resolve_module(&specifier, params, &mut hook, &self.fs).await?;

        let (mut resolved, disregard) = match outcome {
            PackageOutcome::Resolved(path) => (path, false),
            PackageOutcome::Disregarded(path) => (path, true),
            PackageOutcome::Builtin(name) => (PathBuf::from(name), false),
            PackageOutcome::NotFound => return Ok(Resolution::Defer),
        };

        // the package's own remap table applies to the file we just picked,
        // and is registered so the file's importees inherit it
        let mut browser_substituted = false;
        if let Some(map) = hook.browser_map.take() {
            match map.get(&path_key(&resolved)) {
                Some(BrowserTarget::Ignore) => {
                    self.browser_maps.insert(&resolved, map);
                    return Ok(Resolution::EmptyModule);
                }
                Some(BrowserTarget::Redirect(target)) => {
                    resolved = target.clone();
                    browser_substituted = true;
                }
                None => {}
            }
            self.browser_maps.insert(&resolved, map);
        }

        if disregard {
            // a package with no qualifying entry field opts out, unless the
            // browser table already forced a concrete stand-in
            if !browser_substituted {
                return Ok(Resolution::Defer);
            }
        } else {
            if !self.preserve_symlinks {
                if let Ok(real) = dunce::canonicalize(&resolved) {
                    resolved = real;
                }
            }

            if is_builtin(&path_key(&resolved)) {
                return Ok(Resolution::Defer);
            }

            if is_builtin(&specifier) && self.prefer_builtins {
                if !self.prefer_builtins_set
                    && !self.warned_prefer_builtins.swap(true, Ordering::Relaxed)
                {
                    tracing::warn!(
                        specifier,
                        local = %resolved.display(),
                        "preferring built-in module over local alternative; set \
                         'preferBuiltins' explicitly to choose or silence this"
                    );
                }
                return Ok(Resolution::Defer);
            }

            if let Some(jail) = &self.jail {
                if !resolved.starts_with(jail) {
                    return Ok(Resolution::Defer);
                }
            }
        }

        if self.modules_only {
            let source = self.fs.read_file(&resolved).await?;
            if !esm::is_es_module(&source) {
                return Ok(Resolution::Defer);
            }
        }

        Ok(Resolution::Path(resolved))
    }

    /// End-of-build hook: drop all per-build memoization.
    pub fn on_build_end(&self) {
        self.fs.clear();
        self.browser_maps.clear();
    }
}

fn compile_only(pattern: &str) -> Result<OnlyMatcher, Error> {
    let trimmed = pattern
        .strip_prefix('/')
        .and_then(|p| p.strip_suffix('/'))
        .filter(|p| !p.is_empty());
    match trimmed {
        Some(inner) => {
            let re = Regex::new(inner).map_err(|source| Error::OnlyPattern {
                pattern: pattern.to_string(),
                source,
            })?;
            Ok(OnlyMatcher::Pattern(re))
        }
        None => Ok(OnlyMatcher::Exact(pattern.to_string())),
    }
}

/// The identity the `only` allow-list is matched against: the package name
/// (two segments for scoped packages), or the absolute path for relative
/// requests.
fn classify(specifier: &str, base_dir: &Path) -> String {
    if specifier.starts_with('.') {
        return path_key(&paths::normalize(&base_dir.join(specifier)));
    }
    let mut parts = specifier.split(['/', '\\']);
    let first = parts.next().unwrap_or_default();
    if first.starts_with('@') {
        if let Some(second) = parts.next() {
            return format!("{first}/{second}");
        }
    }
    first.to_owned()
}

/// Entry selection driven by the configured field priority, plus browser
/// remap table capture.
struct FieldHook<'a> {
    fields: &'a [String],
    extensions: &'a [String],
    browser_active: bool,
    browser_map: Option<Arc<BrowserMap>>,
}

impl ManifestHook for FieldHook<'_> {
    fn package_entry(&mut self, manifest: &Value, pkg_dir: &Path) -> EntrySelection {
        if self.browser_active {
            if let Some(map) = browser::build_browser_map(manifest, pkg_dir, self.extensions) {
                self.browser_map = Some(Arc::new(map));
            }
        }

        // first string-valued non-"main" field wins; otherwise fall back to
        // the manifest's own main
        let mut overridden = None;
        for field in self.fields {
            if field == "main" {
                continue;
            }
            if let Some(value) = manifest.get(field.as_str()).and_then(Value::as_str) {
                overridden = Some(value.to_owned());
                break;
            }
        }

        let disregard = overridden.is_none() && !self.fields.iter().any(|f| f == "main");
        let entry = overridden.or_else(|| {
            manifest
                .get("main")
                .and_then(Value::as_str)
                .map(str::to_owned)
        });
        EntrySelection { entry, disregard }
    }
}
