use crate::Result;

/// A text-to-speech engine.
///
/// `say` blocks until the utterance has finished playing. The manager only
/// ever calls it from one worker thread at a time.
pub trait SpeechEngine: Send + Sync {
    fn name(&self) -> &str;

    fn say(&self, text: &str) -> Result<()>;

    /// Interrupt the current utterance, if any.
    fn stop(&self) {}

    fn set_rate(&self, _wpm: u32) -> Result<()> {
        Ok(())
    }
}
