//! Reports pacing stalls
//!
//! The queue has no timeout for an engine that never finishes and no flush
//! for a message left without a partner. This watchdog does not change that;
//! it only notices when either has lasted too long.

use crate::{BatchId, MessageQueueManager, PacingConfig, QueueState, WatchdogStatus};
use std::time::{Duration, Instant, SystemTime};

pub struct PacingWatchdog {
    name: String,
    speech_timeout: Duration,
    lone_timeout: Duration,
    speaking: Option<(BatchId, Instant)>,
    lone_since: Option<Instant>,
    consecutive_failures: u32,
}

impl PacingWatchdog {
    pub fn new(config: &PacingConfig) -> Self {
        Self {
            name: "pacing_watchdog".to_string(),
            speech_timeout: Duration::from_millis(config.speech_timeout_ms),
            lone_timeout: Duration::from_millis(config.lone_message_ms),
            speaking: None,
            lone_since: None,
            consecutive_failures: 0,
        }
    }

    pub fn observe(&mut self, queue: &MessageQueueManager) {
        self.observe_at(queue, Instant::now());
    }

    /// Record the queue's current state as seen at `now`.
    pub fn observe_at(&mut self, queue: &MessageQueueManager, now: Instant) {
        self.speaking = match queue.state() {
            QueueState::DisplayingSpeaking(batch) => match self.speaking {
                Some((seen, since)) if seen == batch => Some((seen, since)),
                _ => Some((batch, now)),
            },
            _ => None,
        };
        self.lone_since = if queue.state() == QueueState::Idle && queue.pending_len() == 1 {
            Some(self.lone_since.unwrap_or(now))
        } else {
            None
        };
    }

    pub fn check(&mut self) -> WatchdogStatus {
        self.check_at(Instant::now())
    }

    pub fn check_at(&mut self, now: Instant) -> WatchdogStatus {
        let mut last_error = None;
        if let Some((batch, since)) = self.speaking {
            let elapsed = now.saturating_duration_since(since);
            if elapsed >= self.speech_timeout {
                last_error = Some(format!(
                    "Speech for batch {} running for {:.1}s",
                    batch.0,
                    elapsed.as_secs_f32()
                ));
            }
        }
        if last_error.is_none() {
            if let Some(since) = self.lone_since {
                let elapsed = now.saturating_duration_since(since);
                if elapsed >= self.lone_timeout {
                    last_error = Some(format!(
                        "Single message waiting for a partner for {:.1}s",
                        elapsed.as_secs_f32()
                    ));
                }
            }
        }

        let healthy = last_error.is_none();
        if healthy {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures += 1;
            if self.consecutive_failures == 1 {
                if let Some(err) = &last_error {
                    tracing::warn!(watchdog = %self.name, "{err}");
                }
            }
        }

        WatchdogStatus {
            name: self.name.clone(),
            healthy,
            last_check: SystemTime::now(),
            last_error,
            timeout_duration: self.speech_timeout,
            consecutive_failures: self.consecutive_failures,
        }
    }

    pub fn reset(&mut self) {
        self.speaking = None;
        self.lone_since = None;
        self.consecutive_failures = 0;
    }
}
