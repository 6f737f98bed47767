//! Serial speech playback

use crate::text::clean_text;
use crate::{
    new_speech_backend, Result, SpeechConfig, SpeechEngine, SpeechError, MAX_RATE_WPM,
    MIN_RATE_WPM,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Called exactly once when an utterance has finished, failed or was dropped.
pub type Completion = Box<dyn FnOnce() + Send + 'static>;

struct Queued {
    text: String,
    done: Completion,
}

struct State {
    busy: bool,
    enabled: bool,
    rate_wpm: u32,
    pending: VecDeque<Queued>,
}

struct Shared {
    engine: Option<Box<dyn SpeechEngine>>,
    state: Mutex<State>,
}

/// Plays utterances one at a time on a background worker.
///
/// Calls to [`speak`](Self::speak) never block on playback. While the worker
/// is busy further utterances wait in a FIFO and play in submission order.
#[derive(Clone)]
pub struct SpeechManager {
    shared: Arc<Shared>,
}

impl SpeechManager {
    pub fn new(engine: Option<Box<dyn SpeechEngine>>, config: &SpeechConfig) -> Self {
        if let Some(engine) = &engine {
            if let Err(e) = engine.set_rate(config.rate_wpm) {
                tracing::warn!(engine = engine.name(), error = %e, "could not apply speech rate");
            }
        }
        Self {
            shared: Arc::new(Shared {
                engine,
                state: Mutex::new(State {
                    busy: false,
                    enabled: config.enabled,
                    rate_wpm: config.rate_wpm,
                    pending: VecDeque::new(),
                }),
            }),
        }
    }

    /// Build the configured backend. A backend that fails to start leaves
    /// speech unavailable but the manager usable.
    pub fn from_config(config: &SpeechConfig) -> Self {
        let engine = match new_speech_backend(config.backend) {
            Ok(engine) => engine,
            Err(e) => {
                tracing::warn!(backend = ?config.backend, error = %e, "speech disabled");
                None
            }
        };
        Self::new(engine, config)
    }

    pub fn engine_name(&self) -> Option<&str> {
        self.shared.engine.as_deref().map(|e| e.name())
    }

    /// Queue `text` for playback and call `on_complete` when it is done.
    ///
    /// Completion is immediate, on the caller's thread, when the cleaned text
    /// is blank, speech is disabled or no engine is available.
    pub fn speak(&self, text: &str, on_complete: impl FnOnce() + Send + 'static) {
        let text = clean_text(text);
        if text.is_empty() || self.shared.engine.is_none() {
            on_complete();
            return;
        }

        let mut state = self.shared.state.lock();
        if !state.enabled {
            drop(state);
            on_complete();
            return;
        }
        state.pending.push_back(Queued {
            text,
            done: Box::new(on_complete),
        });
        if state.busy {
            tracing::debug!(pending = state.pending.len(), "speech busy, utterance queued");
            return;
        }
        state.busy = true;
        drop(state);

        let shared = Arc::clone(&self.shared);
        let spawned = std::thread::Builder::new()
            .name("speech-worker".into())
            .spawn(move || run_worker(&shared));
        if let Err(e) = spawned {
            tracing::error!(error = %e, "failed to start speech worker");
            let drained = {
                let mut state = self.shared.state.lock();
                state.busy = false;
                std::mem::take(&mut state.pending)
            };
            for item in drained {
                (item.done)();
            }
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.shared.state.lock().busy
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.state.lock().enabled
    }

    /// Enable or disable speech. Disabling stops playback.
    pub fn toggle(&self, enabled: bool) {
        self.shared.state.lock().enabled = enabled;
        tracing::info!(enabled, "speech toggled");
        if !enabled {
            self.stop();
        }
    }

    pub fn rate(&self) -> u32 {
        self.shared.state.lock().rate_wpm
    }

    pub fn set_rate(&self, wpm: u32) -> Result<()> {
        if !(MIN_RATE_WPM..=MAX_RATE_WPM).contains(&wpm) {
            return Err(SpeechError::InvalidRate {
                got: wpm,
                min: MIN_RATE_WPM,
                max: MAX_RATE_WPM,
            });
        }
        if let Some(engine) = &self.shared.engine {
            engine.set_rate(wpm)?;
        }
        self.shared.state.lock().rate_wpm = wpm;
        Ok(())
    }

    /// Halt the current utterance and drop everything still queued. Dropped
    /// utterances still report completion.
    pub fn stop(&self) {
        let drained = std::mem::take(&mut self.shared.state.lock().pending);
        if let Some(engine) = &self.shared.engine {
            engine.stop();
        }
        if !drained.is_empty() {
            tracing::debug!(dropped = drained.len(), "cleared pending speech");
        }
        for item in drained {
            (item.done)();
        }
    }
}

// Clears the busy flag if the worker unwinds, so later calls can start a new one.
struct BusyGuard<'a>(&'a Shared);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.state.lock().busy = false;
        }
    }
}

fn run_worker(shared: &Shared) {
    let _guard = BusyGuard(shared);
    let Some(engine) = shared.engine.as_deref() else {
        shared.state.lock().busy = false;
        return;
    };

    loop {
        // Checking for work and releasing busy happen under one lock so a
        // concurrent `speak` either sees busy or finds us gone.
        let next = {
            let mut state = shared.state.lock();
            match state.pending.pop_front() {
                Some(item) => item,
                None => {
                    state.busy = false;
                    return;
                }
            }
        };

        tracing::debug!(engine = engine.name(), text = %next.text, "speaking");
        if let Err(e) = engine.say(&next.text) {
            tracing::warn!(engine = engine.name(), error = %e, "speech failed");
        }
        (next.done)();
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::MockSpeech;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    fn manager(mock: &MockSpeech) -> SpeechManager {
        SpeechManager::new(Some(Box::new(mock.clone())), &SpeechConfig::default())
    }

    #[test]
    fn test_blank_text_completes_synchronously() {
        let mock = MockSpeech::new();
        let speech = manager(&mock);
        let fired = Arc::new(AtomicUsize::new(0));
        for text in ["", "   "] {
            let f = Arc::clone(&fired);
            speech.speak(text, move || {
                f.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert!(!speech.is_speaking());
        assert!(mock.spoken().is_empty());
    }

    #[test]
    fn test_disabled_or_missing_engine_completes_synchronously() {
        let fired = Arc::new(AtomicUsize::new(0));

        let no_engine = SpeechManager::new(None, &SpeechConfig::default());
        let f = Arc::clone(&fired);
        no_engine.speak("hello", move || {
            f.fetch_add(1, Ordering::SeqCst);
        });

        let mock = MockSpeech::new();
        let disabled = manager(&mock);
        disabled.toggle(false);
        let f = Arc::clone(&fired);
        disabled.speak("hello", move || {
            f.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert!(mock.spoken().is_empty());
    }

    #[test]
    fn test_utterances_play_in_order() {
        let mock = MockSpeech::new().with_ms_per_char(1);
        let speech = manager(&mock);
        let (tx, rx) = mpsc::channel();
        for i in 0..4 {
            let tx = tx.clone();
            speech.speak(&format!("[10:00:0{i}] message {i}"), move || {
                let _ = tx.send(i);
            });
        }
        let done: Vec<i32> = (0..4)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        assert_eq!(done, vec![0, 1, 2, 3]);
        assert_eq!(
            mock.spoken(),
            vec!["message 0", "message 1", "message 2", "message 3"]
        );
    }

    #[test]
    fn test_engine_error_still_completes_and_continues() {
        let mock = MockSpeech::new().failing_on("bad");
        let speech = manager(&mock);
        let (tx, rx) = mpsc::channel();
        for text in ["good one", "bad one", "good two"] {
            let tx = tx.clone();
            speech.speak(text, move || {
                let _ = tx.send(());
            });
        }
        for _ in 0..3 {
            rx.recv_timeout(Duration::from_secs(5)).unwrap();
        }
        assert_eq!(mock.spoken(), vec!["good one", "good two"]);

        // busy is released once the queue drains
        for _ in 0..100 {
            if !speech.is_speaking() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(!speech.is_speaking());
    }

    #[test]
    fn test_stop_fires_dropped_callbacks() {
        let mock = MockSpeech::new().with_ms_per_char(20);
        let speech = manager(&mock);
        let fired = Arc::new(AtomicUsize::new(0));
        for text in ["first long utterance", "second", "third"] {
            let f = Arc::clone(&fired);
            speech.speak(text, move || {
                f.fetch_add(1, Ordering::SeqCst);
            });
        }
        speech.stop();
        assert!(mock.stop_count() >= 1);
        for _ in 0..200 {
            if fired.load(Ordering::SeqCst) == 3 {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(fired.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_stop_cuts_current_utterance() {
        let mock = MockSpeech::new().with_ms_per_char(100);
        let speech = manager(&mock);
        let (tx, rx) = mpsc::channel();
        speech.speak("a rather long utterance", move || {
            let _ = tx.send(());
        });
        std::thread::sleep(Duration::from_millis(50));
        assert!(speech.is_speaking());

        speech.stop();
        rx.recv_timeout(Duration::from_millis(500)).unwrap();
        for _ in 0..50 {
            if !speech.is_speaking() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(!speech.is_speaking());
        assert!(mock.spoken().is_empty());
    }

    #[test]
    fn test_rate_bounds() {
        let mock = MockSpeech::new();
        let speech = manager(&mock);
        assert_eq!(speech.rate(), 150);
        assert_eq!(mock.rate(), Some(150));

        speech.set_rate(200).unwrap();
        assert_eq!(speech.rate(), 200);
        assert_eq!(mock.rate(), Some(200));

        assert!(matches!(
            speech.set_rate(5),
            Err(SpeechError::InvalidRate { got: 5, .. })
        ));
        assert_eq!(speech.rate(), 200);
    }
}
