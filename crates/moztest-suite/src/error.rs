use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("error checking out test corpus r{revision} from {remote}: {reason}")]
    Checkout {
        remote: String,
        revision: String,
        reason: String,
    },

    #[error("attempted path traversal in {}: member {member:?}", archive.display())]
    PathTraversal { archive: PathBuf, member: String },

    #[error("invalid test identifier {id:?}: {reason}")]
    InvalidTestId { id: String, reason: &'static str },

    #[error("test source not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("invalid suite config {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("walk test tree: {0}")]
    Walk(#[from] walkdir::Error),
}

impl SuiteError {
    /// True for the failures that abort corpus provisioning.
    pub fn is_provisioning(&self) -> bool {
        matches!(self, Self::Checkout { .. } | Self::PathTraversal { .. })
    }
}

pub type Result<T, E = SuiteError> = std::result::Result<T, E>;

pub(crate) trait IoResultExt<T> {
    fn io_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn io_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|source| SuiteError::Io {
            context: f(),
            source,
        })
    }
}
