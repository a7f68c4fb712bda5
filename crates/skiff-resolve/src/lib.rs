#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::struct_excessive_bools)]

//! Node-style module resolution for a bundler host.
//!
//! [`NodeResolver`] answers "which file does this import specifier name"
//! the way `node` would, plus the bundler-side conventions layered on top
//! of it: alias substitution, package entry-field priority, browser-field
//! remapping, builtin preference, jail confinement, and an optional
//! ES-module-only gate. All disk access goes through a memoizing async
//! cache shared across concurrent resolutions.

pub mod alias;
pub mod browser;
pub mod builtins;
pub mod config;
pub mod error;
pub mod esm;
pub mod fields;
pub mod fs_cache;
pub mod npm;
pub mod paths;
pub mod resolver;

pub use alias::AliasTable;
pub use browser::{build_browser_map, BrowserMap, BrowserMapCache, BrowserTarget};
pub use builtins::{is_builtin, NODE_BUILTINS};
pub use config::{CustomResolveOptions, FieldFlag, ResolveOptions, DEFAULT_EXTENSIONS};
pub use error::Error;
pub use esm::is_es_module;
pub use fs_cache::{DiskFs, FsCache, FsError, ModuleFs};
pub use npm::{
    resolve_module, EntrySelection, MainFieldHook, ManifestHook, NpmParams, PackageOutcome,
};
pub use resolver::{NodeResolver, Resolution, EMPTY_MODULE_ID, EMPTY_MODULE_SOURCE};
