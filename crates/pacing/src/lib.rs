//! pacing: two-message display and speech pacing

mod types;
pub use types::{BatchId, Command, PacingConfig, QueueState, Timer, WatchdogStatus};

mod queue;
pub use queue::{MessageQueueManager, BATCH_SIZE};

mod watchdog;
pub use watchdog::PacingWatchdog;
