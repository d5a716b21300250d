/// Export pipeline error types
use kiln_build::BuildError;
use kiln_package::PackageError;
use std::path::PathBuf;
use thiserror::Error;

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Invalid source '{0}': must be a local directory")]
    InvalidSource(String),

    #[error("Unsupported platform '{0}': expected one of ios, android, mac, linux")]
    UnsupportedPlatform(String),

    #[error("Configuration error in {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("Template '{name}': {message}")]
    Template { name: String, message: String },

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("I/O error at {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl ExportError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            error,
        }
    }

    /// Create a configuration error
    pub fn config(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Config {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn template(name: impl Into<String>, message: impl ToString) -> Self {
        Self::Template {
            name: name.into(),
            message: message.to_string(),
        }
    }
}

impl From<PackageError> for ExportError {
    fn from(error: PackageError) -> Self {
        match error {
            PackageError::ParseError { path, source } => ExportError::config(path, source),
            PackageError::IoError { path, source } => ExportError::io(path, source),
            other => ExportError::config(PathBuf::new(), other),
        }
    }
}
