use crate::{Result, SpeechEngine, SpeechError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

const SLICE: Duration = Duration::from_millis(5);

/// Records utterances instead of playing them.
///
/// Clones share the same log, so a test can keep one handle while the
/// manager owns another.
#[derive(Clone, Default)]
pub struct MockSpeech {
    inner: Arc<MockInner>,
}

#[derive(Default)]
struct MockInner {
    spoken: Mutex<Vec<String>>,
    rate: Mutex<Option<u32>>,
    fail_on: Mutex<Option<String>>,
    ms_per_char: Mutex<u64>,
    stops: Mutex<u32>,
}

impl MockSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend playback takes `ms` milliseconds per character. A `stop` during
    /// playback cuts the utterance short and it is not recorded.
    pub fn with_ms_per_char(self, ms: u64) -> Self {
        *self.inner.ms_per_char.lock() = ms;
        self
    }

    /// Fail every utterance containing `needle`.
    pub fn failing_on(self, needle: impl Into<String>) -> Self {
        *self.inner.fail_on.lock() = Some(needle.into());
        self
    }

    pub fn spoken(&self) -> Vec<String> {
        self.inner.spoken.lock().clone()
    }

    pub fn rate(&self) -> Option<u32> {
        *self.inner.rate.lock()
    }

    pub fn stop_count(&self) -> u32 {
        *self.inner.stops.lock()
    }
}

impl SpeechEngine for MockSpeech {
    fn name(&self) -> &str {
        "mock"
    }

    fn say(&self, text: &str) -> Result<()> {
        let stops = *self.inner.stops.lock();
        let delay = *self.inner.ms_per_char.lock() * text.len() as u64;
        let deadline = Instant::now() + Duration::from_millis(delay);
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                break;
            }
            std::thread::sleep(left.min(SLICE));
            if *self.inner.stops.lock() != stops {
                return Ok(());
            }
        }
        if let Some(needle) = self.inner.fail_on.lock().as_deref() {
            if text.contains(needle) {
                return Err(SpeechError::Engine(format!("mock failure on {text:?}")));
            }
        }
        self.inner.spoken.lock().push(text.to_string());
        Ok(())
    }

    fn stop(&self) {
        *self.inner.stops.lock() += 1;
    }

    fn set_rate(&self, wpm: u32) -> Result<()> {
        *self.inner.rate.lock() = Some(wpm);
        Ok(())
    }
}
