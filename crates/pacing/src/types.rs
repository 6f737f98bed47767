use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Identifies one displayed pair of messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BatchId(pub u64);

/// Delayed continuation requested by the queue manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    /// Settle period after speech finished; clear the display.
    Clear(BatchId),
    /// Gap after clearing; look for the next batch.
    Resume(BatchId),
}

/// Side effect for the owner of the manager to carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Display { batch: BatchId, messages: [String; 2] },
    Speak { batch: BatchId, utterance: String },
    ClearDisplay,
    Schedule { after: Duration, timer: Timer },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Idle,
    DisplayingSpeaking(BatchId),
    Settling(BatchId),
    Cleared(BatchId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Time a finished batch stays on screen.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Gap between clearing and the next batch.
    #[serde(default = "default_resume_ms")]
    pub resume_ms: u64,
    #[serde(default = "default_speech_timeout_ms")]
    pub speech_timeout_ms: u64,
    #[serde(default = "default_lone_message_ms")]
    pub lone_message_ms: u64,
}

fn default_settle_ms() -> u64 {
    1000
}

fn default_resume_ms() -> u64 {
    500
}

fn default_speech_timeout_ms() -> u64 {
    30_000
}

fn default_lone_message_ms() -> u64 {
    10_000
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            resume_ms: default_resume_ms(),
            speech_timeout_ms: default_speech_timeout_ms(),
            lone_message_ms: default_lone_message_ms(),
        }
    }
}

impl PacingConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn resume_delay(&self) -> Duration {
        Duration::from_millis(self.resume_ms)
    }
}

/// Watchdog status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogStatus {
    pub name: String,
    pub healthy: bool,
    pub last_check: SystemTime,
    pub last_error: Option<String>,
    pub timeout_duration: Duration,
    pub consecutive_failures: u32,
}
