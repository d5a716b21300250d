/// Build pipeline error types
use kiln_package::PackageError;
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid source '{0}': must be an existing local directory")]
    InvalidSource(String),

    #[error("Configuration error in {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("Compile error in {path} at line {line}, column {column}: {message}")]
    Compile {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Command `{command}` failed with exit code {code}\n{stdout}{stderr}")]
    ToolFailed {
        command: String,
        code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("Failed to start `{command}`: {error}")]
    ToolSpawn {
        command: String,
        error: std::io::Error,
    },

    #[error("Archive error at {path}: {error}")]
    Archive { path: PathBuf, error: String },

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
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

    /// Create a compile error with source position
    pub fn compile(path: impl Into<PathBuf>, line: usize, column: usize, message: impl ToString) -> Self {
        Self::Compile {
            path: path.into(),
            line,
            column,
            message: message.to_string(),
        }
    }

    /// Create an archive error
    pub fn archive(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::Archive {
            path: path.into(),
            error: error.to_string(),
        }
    }

    /// True for manifest and `.keys` problems
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

impl From<PackageError> for BuildError {
    fn from(error: PackageError) -> Self {
        match error {
            PackageError::ParseError { path, source } => BuildError::config(path, source),
            PackageError::IoError { path, source } => BuildError::io(path, source),
            other => BuildError::Config {
                path: PathBuf::new(),
                message: other.to_string(),
            },
        }
    }
}
