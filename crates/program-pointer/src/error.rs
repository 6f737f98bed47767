use thiserror::Error;

pub type Result<T, E = SourceError> = core::result::Result<T, E>;

/// Failures of the transport underneath a pointer source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("connection to {endpoint} failed: {reason}")]
    Connect { endpoint: String, reason: String },
    #[error("not connected to server")]
    NotConnected,
    #[error("subscription to {node_id} failed: {reason}")]
    Subscribe { node_id: String, reason: String },
    #[error("read of {0} failed")]
    Read(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("operation not supported on this source: {0}")]
    Unsupported(&'static str),
}

/// Failures turning a raw node value into a program pointer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    #[error("extension object has no body to unpack")]
    EmptyEnvelope,
    #[error("line number not convertible: {0}")]
    LineNotConvertible(String),
}
