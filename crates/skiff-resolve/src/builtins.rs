//! Node.js builtin module detection.
//!
//! Builtins are names the platform provides directly; the resolver never
//! claims them as files (it defers so the host can treat them as external).

/// Builtin module names, sorted for binary search.
pub const NODE_BUILTINS: &[&str] = &[
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// Check whether a specifier names a Node builtin module.
///
/// Accepts both bare (`fs`) and prefixed (`node:fs`) forms, and subpath
/// builtins such as `fs/promises`.
#[must_use]
pub fn is_builtin(specifier: &str) -> bool {
    let name = specifier.strip_prefix("node:").unwrap_or(specifier);
    let root = name.split('/').next().unwrap_or(name);
    NODE_BUILTINS.binary_search(&root).is_ok()
}
