//! Error Handling
//!
//! Error type definitions used in labelkeep

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error types for labelkeep
#[derive(Error, Debug)]
pub enum Error {
    #[error("GitHub API error: {0}")]
    GitHubApi(#[from] octocrab::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid specification '{path}': {detail}")]
    InvalidSpecFormat { path: String, detail: String },

    #[error("Alias conflict: '{alias}' is claimed by both '{first}' and '{second}'")]
    AliasConflict {
        alias: String,
        first: String,
        second: String,
    },

    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Authentication failed: invalid token")]
    AuthenticationFailed,

    #[error("Rate limited by the GitHub API after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid target format: {0} (expected 'namespace/repo' or 'namespace')")]
    InvalidTarget(String),

    #[error("Invalid label color: {0} (expected 6-digit hex)")]
    InvalidLabelColor(String),

    #[error("{0}")]
    Usage(String),
}

impl Error {
    /// Create a new specification format error
    pub fn invalid_spec<P: Into<String>, D: Into<String>>(path: P, detail: D) -> Self {
        Error::InvalidSpecFormat {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Create a new usage error (reported with exit code 2)
    pub fn usage<S: Into<String>>(message: S) -> Self {
        Error::Usage(message.into())
    }

    /// Exit code this error maps to at the CLI boundary
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Usage(_) | Error::InvalidTarget(_) => 2,
            _ => 1,
        }
    }
}
