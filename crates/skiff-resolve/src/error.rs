use thiserror::Error;

/// Configuration errors raised by [`NodeResolver::new`](crate::NodeResolver::new).
///
/// These are the only hard failures this crate produces: everything that goes
/// wrong while resolving an individual specifier is absorbed and reported as
/// [`Resolution::Defer`](crate::Resolution::Defer) instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("do not use the deprecated 'browser', 'module', 'jsnext' or 'main' options together with 'main_fields'")]
    MainFieldsConflict,

    #[error("at least one 'main_fields' value must be specified")]
    EmptyMainFields,

    #[error("the 'skip' option is no longer supported; mark modules external in the bundler host instead")]
    SkipRemoved,

    #[error("invalid 'only' pattern '{pattern}': {source}")]
    OnlyPattern {
        pattern: String,
        #[source]
        source: regex_lite::Error,
    },
}
