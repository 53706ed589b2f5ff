//! Error types for the portal core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is inactive. Contact your administrator")]
    AccountInactive,

    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("An account with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No security question is set up for this account")]
    NoRecoverySetup,

    #[error("Security answer does not match")]
    WrongAnswer,

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Mutation failed: {0}")]
    MutationFailed(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Collapse low-level storage failures into `MutationFailed` at a
    /// component boundary, leaving typed domain failures intact.
    pub(crate) fn into_mutation_failure(self) -> Self {
        match self {
            Self::Storage(msg) => Self::MutationFailed(msg),
            Self::Io(err) => Self::MutationFailed(err.to_string()),
            Self::Serialization(err) => Self::MutationFailed(err.to_string()),
            other => other,
        }
    }
}
