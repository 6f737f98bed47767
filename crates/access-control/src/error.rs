use narration::VerbosityTier;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoginError {
    #[error("please enter both user ID and password")]
    MissingInput,
    #[error("invalid user ID or password")]
    InvalidCredentials,
    #[error("access mismatch: user is assigned {assigned}, not {requested}")]
    AccessMismatch {
        assigned: VerbosityTier,
        requested: VerbosityTier,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("duplicate user id '{0}'")]
    DuplicateUser(String),
    #[error("user id must not be empty")]
    EmptyUserId,
}
