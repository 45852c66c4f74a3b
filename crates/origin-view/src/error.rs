use camino::Utf8PathBuf;
use origin_cache::CacheError;
use origin_templates::TemplateError;
use thiserror::Error;

/// Failures raised while resolving, compiling or rendering a view.
#[derive(Debug, Error)]
pub enum ViewError {
    /// No registered loader could resolve the qualified name.
    #[error("no such view '{0}'")]
    NoMatchingTemplate(String),

    /// More than one candidate file exists for one logical name.
    #[error("multiple views matching '{0}'")]
    AmbiguousMatch(String),

    /// A loader named an engine nothing registered under that name.
    #[error("no engine registered for '{0}'")]
    NoSuchEngine(String),

    /// The cache holds no entry for the name. Recoverable: the caller
    /// falls back to a fresh compilation.
    #[error("no cached copy of '{0}'")]
    CacheMiss(String),

    #[error("failed to read from file \"{path}\"")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generated code referenced a variable the caller never bound.
    #[error("undefined variable '{0}'")]
    MissingVariable(String),

    /// Generated code called a collaborator that was never bound to the
    /// sandbox.
    #[error("no {0} bound to the sandbox")]
    MissingBinding(&'static str),

    /// The compiled source itself does not parse; either the cache entry
    /// was tampered with or an engine emitted something malformed.
    #[error("malformed compiled template: {0}")]
    Script(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}
