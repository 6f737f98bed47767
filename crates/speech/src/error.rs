use thiserror::Error;

pub type Result<T, E = SpeechError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech engine unavailable: {0}")]
    Unavailable(String),
    #[error("speech engine failed: {0}")]
    Engine(String),
    #[error("speech rate must be between {min} and {max} words per minute, got {got}")]
    InvalidRate { got: u32, min: u32, max: u32 },
    #[error("backend `{0}` not enabled in this build")]
    BackendDisabled(&'static str),
}
