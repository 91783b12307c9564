use std::path::PathBuf;
use thiserror::Error;

/// Failure to load the registries of a version. Without them no chunk of that
/// version can be persisted, so callers treat this as fatal.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed report {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("registry directory {0} does not exist")]
    MissingRoot(PathBuf),
    #[error("registry load for {0} failed: {1}")]
    Failed(String, String),
    #[error("registry loader for {0} went away")]
    Abandoned(String),
}
