//! Message queue manager
//!
//! Narration messages are shown and spoken two at a time. A batch stays on
//! screen while it is spoken, then for a settle period, then the display is
//! cleared and after a short gap the next pair is taken. The manager holds
//! no timers or handles itself: every transition returns the [`Command`]s
//! its owner has to carry out, and delayed steps come back in through
//! [`MessageQueueManager::on_timer`].

use crate::{BatchId, Command, PacingConfig, QueueState, Timer};
use std::collections::VecDeque;

pub const BATCH_SIZE: usize = 2;

#[derive(Debug)]
pub struct MessageQueueManager {
    config: PacingConfig,
    pending: VecDeque<String>,
    state: QueueState,
    next_batch: u64,
}

impl MessageQueueManager {
    pub fn new(config: PacingConfig) -> Self {
        Self {
            config,
            pending: VecDeque::new(),
            state: QueueState::Idle,
            next_batch: 1,
        }
    }

    pub fn state(&self) -> QueueState {
        self.state
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn config(&self) -> &PacingConfig {
        &self.config
    }

    /// Append a message. A batch starts only from `Idle` with a full pair
    /// waiting; otherwise the message is held.
    pub fn enqueue(&mut self, message: impl Into<String>) -> Vec<Command> {
        self.pending.push_back(message.into());
        tracing::debug!(pending = self.pending.len(), state = ?self.state, "message queued");
        if self.state == QueueState::Idle {
            self.try_dispatch()
        } else {
            Vec::new()
        }
    }

    /// Speech for `batch` has finished. Notifications for any other batch are
    /// stale and ignored.
    pub fn on_speech_complete(&mut self, batch: BatchId) -> Vec<Command> {
        if self.state != QueueState::DisplayingSpeaking(batch) {
            tracing::debug!(?batch, state = ?self.state, "ignoring stale speech completion");
            return Vec::new();
        }
        self.state = QueueState::Settling(batch);
        vec![Command::Schedule {
            after: self.config.settle_delay(),
            timer: Timer::Clear(batch),
        }]
    }

    pub fn on_timer(&mut self, timer: Timer) -> Vec<Command> {
        match (timer, self.state) {
            (Timer::Clear(batch), QueueState::Settling(current)) if batch == current => {
                self.state = QueueState::Cleared(batch);
                vec![
                    Command::ClearDisplay,
                    Command::Schedule {
                        after: self.config.resume_delay(),
                        timer: Timer::Resume(batch),
                    },
                ]
            }
            (Timer::Resume(batch), QueueState::Cleared(current)) if batch == current => {
                self.state = QueueState::Idle;
                self.try_dispatch()
            }
            _ => {
                tracing::debug!(?timer, state = ?self.state, "ignoring stale timer");
                Vec::new()
            }
        }
    }

    /// Drop queued messages and return to `Idle`. Completions and timers
    /// still in flight for the old batch are ignored when they arrive.
    pub fn reset(&mut self) {
        if !self.pending.is_empty() {
            tracing::debug!(dropped = self.pending.len(), "discarding queued messages");
        }
        self.pending.clear();
        self.state = QueueState::Idle;
    }

    fn try_dispatch(&mut self) -> Vec<Command> {
        if self.pending.len() < BATCH_SIZE {
            return Vec::new();
        }
        let (Some(first), Some(second)) = (self.pending.pop_front(), self.pending.pop_front())
        else {
            return Vec::new();
        };

        let batch = BatchId(self.next_batch);
        self.next_batch += 1;
        self.state = QueueState::DisplayingSpeaking(batch);
        tracing::debug!(?batch, held = self.pending.len(), "dispatching batch");

        let utterance = format!("{first} {second}");
        vec![
            Command::Display {
                batch,
                messages: [first, second],
            },
            Command::Speak { batch, utterance },
        ]
    }
}

impl Default for MessageQueueManager {
    fn default() -> Self {
        Self::new(PacingConfig::default())
    }
}
