use std::{io, path::PathBuf};

use thiserror::Error;

/**
    Errors that may occur while resolving modules or writing a bundle.
*/
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("local module not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("external url not allowed in local-only mode: {url}")]
    PolicyViolation { url: String },
    #[error("failed to download {url}: {reason}")]
    Transport { url: String, reason: String },
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file at {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },
}

impl BundleError {
    /**
        Maps an io error for the given path, turning
        [`io::ErrorKind::NotFound`] into [`BundleError::NotFound`].
    */
    pub(crate) fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    pub(crate) fn transport(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transport {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

pub type BundleResult<T, E = BundleError> = std::result::Result<T, E>;
