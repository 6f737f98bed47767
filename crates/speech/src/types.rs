use crate::plugin::SpeechBackendKind;
use serde::{Deserialize, Serialize};

pub const DEFAULT_RATE_WPM: u32 = 150;
pub const MIN_RATE_WPM: u32 = 50;
pub const MAX_RATE_WPM: u32 = 400;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default)]
    pub backend: SpeechBackendKind,
    #[serde(default = "default_rate")]
    pub rate_wpm: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_rate() -> u32 {
    DEFAULT_RATE_WPM
}

fn default_enabled() -> bool {
    true
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            backend: SpeechBackendKind::default(),
            rate_wpm: DEFAULT_RATE_WPM,
            enabled: true,
        }
    }
}
