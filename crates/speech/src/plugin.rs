use crate::{SpeechEngine, SpeechError};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechBackendKind {
    #[default]
    Mock,
    System,
    /// No engine: every utterance completes immediately.
    Silent,
}

pub fn new_speech_backend(
    kind: SpeechBackendKind,
) -> Result<Option<Box<dyn SpeechEngine>>, SpeechError> {
    match kind {
        SpeechBackendKind::Silent => Ok(None),
        SpeechBackendKind::Mock => {
            #[cfg(feature = "mock")]
            {
                Ok(Some(Box::new(crate::MockSpeech::new()) as Box<dyn SpeechEngine>))
            }
            #[cfg(not(feature = "mock"))]
            {
                Err(SpeechError::BackendDisabled("mock"))
            }
        }
        SpeechBackendKind::System => {
            #[cfg(feature = "system-tts")]
            {
                crate::SystemSpeech::new().map(|s| Some(Box::new(s) as Box<dyn SpeechEngine>))
            }
            #[cfg(not(feature = "system-tts"))]
            {
                Err(SpeechError::BackendDisabled("system-tts"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_has_no_engine() {
        assert!(matches!(new_speech_backend(SpeechBackendKind::Silent), Ok(None)));
    }

    #[cfg(feature = "mock")]
    #[test]
    fn test_mock_backend() {
        let engine = new_speech_backend(SpeechBackendKind::Mock).unwrap().unwrap();
        assert_eq!(engine.name(), "mock");
    }

    #[cfg(not(feature = "system-tts"))]
    #[test]
    fn test_system_backend_requires_feature() {
        assert!(matches!(
            new_speech_backend(SpeechBackendKind::System),
            Err(SpeechError::BackendDisabled("system-tts"))
        ));
    }
}
