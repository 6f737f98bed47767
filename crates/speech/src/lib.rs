//! speech: serial text-to-speech with pluggable engines

mod error;
pub use error::{Result, SpeechError};

mod types;
pub use types::{SpeechConfig, DEFAULT_RATE_WPM, MAX_RATE_WPM, MIN_RATE_WPM};

mod traits;
pub use traits::SpeechEngine;

pub mod text;
pub use text::clean_text;

#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "mock")]
pub use mock::MockSpeech;

#[cfg(feature = "system-tts")]
mod system;
#[cfg(feature = "system-tts")]
pub use system::SystemSpeech;

pub mod plugin;
pub use plugin::{new_speech_backend, SpeechBackendKind};

mod manager;
pub use manager::{Completion, SpeechManager};
