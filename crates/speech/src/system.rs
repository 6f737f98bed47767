//! Platform speech through the `tts` crate

use crate::{Result, SpeechEngine, SpeechError, DEFAULT_RATE_WPM};
use parking_lot::Mutex;
use std::time::Duration;
use tts::Tts;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct SystemSpeech {
    tts: Mutex<Tts>,
}

impl SystemSpeech {
    pub fn new() -> Result<Self> {
        let tts = Tts::default().map_err(|e| SpeechError::Unavailable(e.to_string()))?;
        tracing::info!("initialized system speech engine");
        Ok(Self {
            tts: Mutex::new(tts),
        })
    }

    fn speaking(&self) -> bool {
        self.tts.lock().is_speaking().unwrap_or(false)
    }
}

impl SpeechEngine for SystemSpeech {
    fn name(&self) -> &str {
        "system"
    }

    fn say(&self, text: &str) -> Result<()> {
        self.tts
            .lock()
            .speak(text, false)
            .map_err(|e| SpeechError::Engine(e.to_string()))?;
        // The lock is released between polls so `stop` can interrupt.
        while self.speaking() {
            std::thread::sleep(POLL_INTERVAL);
        }
        Ok(())
    }

    fn stop(&self) {
        if let Err(e) = self.tts.lock().stop() {
            tracing::warn!(error = %e, "failed to stop system speech");
        }
    }

    fn set_rate(&self, wpm: u32) -> Result<()> {
        let mut tts = self.tts.lock();
        // Backend rates are unitless; scale around the backend's normal rate.
        let scaled = tts.normal_rate() * wpm as f32 / DEFAULT_RATE_WPM as f32;
        let rate = scaled.clamp(tts.min_rate(), tts.max_rate());
        tts.set_rate(rate)
            .map(|_| ())
            .map_err(|e| SpeechError::Engine(e.to_string()))
    }
}
