//! Resolver configuration.
//!
//! Options are accepted once at construction; invalid combinations fail
//! immediately with a descriptive [`Error`](crate::Error) rather than lazily
//! during resolution.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Extensions probed during file resolution, in priority order.
///
/// `.mjs` must come before `.js` so packages shipping both ESM and CommonJS
/// entry files resolve to the ESM one.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".mjs", ".js", ".json", ".node"];

/// Value of a deprecated entry-field flag.
///
/// Host configs historically allowed these flags to carry a string as well
/// as a boolean. Only `true`/`false` adjust the field list; a string value
/// is accepted, counts as "set" for the `main_fields` conflict check, and
/// otherwise leaves the list alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldFlag {
    Toggle(bool),
    Name(String),
}

impl FieldFlag {
    /// The boolean value, if this flag is a toggle.
    #[must_use]
    pub fn as_toggle(&self) -> Option<bool> {
        match self {
            Self::Toggle(value) => Some(*value),
            Self::Name(_) => None,
        }
    }
}

/// Options for [`NodeResolver`](crate::NodeResolver).
///
/// Field names follow the bundler-facing camelCase convention when
/// deserialized from a host config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolveOptions {
    /// Ordered package.json field names to consult for a package entry point.
    /// Mutually exclusive with the deprecated flags below.
    pub main_fields: Option<Vec<String>>,

    /// Deprecated flag: toggle the `browser` field in the priority list.
    pub browser: Option<FieldFlag>,

    /// Deprecated flag: toggle the `module` field in the priority list.
    pub module: Option<FieldFlag>,

    /// Deprecated flag: toggle the legacy `jsnext:main` field.
    pub jsnext: Option<FieldFlag>,

    /// `false` removes `main` from the default priority list.
    pub main: Option<bool>,

    /// File extensions tried during resolution. Defaults to
    /// [`DEFAULT_EXTENSIONS`].
    pub extensions: Option<Vec<String>>,

    /// Whether a platform builtin wins over a same-named local package.
    /// Unset defaults to `true` and additionally emits a one-time advisory
    /// the first time the preference is exercised.
    pub prefer_builtins: Option<bool>,

    /// Confine successful resolutions to this directory subtree; results
    /// outside it are treated as unresolved.
    pub jail: Option<PathBuf>,

    /// Identifier allow-list. Plain strings match exactly; entries wrapped in
    /// `/` (e.g. `"/^@scope\\//"`) are compiled as regular expressions.
    /// Non-matching specifiers are deferred.
    pub only: Option<Vec<String>>,

    /// Ordered alias table seeding the alias resolver. Earlier entries shadow
    /// later ones when prefixes overlap.
    pub alias: Vec<(String, String)>,

    /// Only return files that are syntactically ES modules.
    pub modules_only: bool,

    /// Skip real-path normalization of resolved symlinks (inherited from the
    /// host build settings).
    pub preserve_symlinks: bool,

    /// Extra knobs forwarded to the package-resolution primitive.
    pub custom: CustomResolveOptions,

    /// Removed option, kept so stale configs fail loudly instead of silently
    /// changing behavior.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<serde_json::Value>,
}

/// Knobs forwarded verbatim to the package-resolution primitive, merged after
/// (and allowed to override) the core's own parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomResolveOptions {
    /// Directory name searched while walking up from the importer.
    /// Defaults to `node_modules`.
    pub module_directory: Option<String>,

    /// Extra directories consulted after the ancestor walk is exhausted.
    pub paths: Vec<PathBuf>,
}

impl ResolveOptions {
    /// Extensions to probe, falling back to [`DEFAULT_EXTENSIONS`].
    #[must_use]
    pub fn extension_list(&self) -> Vec<String> {
        self.extensions.clone().unwrap_or_else(|| {
            DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect()
        })
    }
}
