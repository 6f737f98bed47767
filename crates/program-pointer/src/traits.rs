use crate::{RawPointerValue, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Connection state reported by a source.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SourceStatus {
    pub connected: bool,
    pub monitoring: bool,
}

/// A program pointer transport (OPC UA client, recording, simulator).
///
/// Sources are driven from a single task: the connection worker calls these
/// methods in sequence and forwards every value returned by
/// [`next_change`](PointerSource::next_change) to the event loop.
#[async_trait]
pub trait PointerSource: Send {
    /// Endpoint this source talks to, for status messages.
    fn endpoint(&self) -> &str;

    fn status(&self) -> SourceStatus;

    async fn connect(&mut self) -> Result<()>;

    async fn disconnect(&mut self) -> Result<()>;

    /// Subscribe to data changes of `node_id`.
    async fn subscribe(&mut self, node_id: &str, publishing_interval: Duration) -> Result<()>;

    async fn unsubscribe(&mut self) -> Result<()>;

    /// Wait for the next data change. `Ok(None)` means the source has no more
    /// values to deliver.
    ///
    /// Implementations must be cancel safe: dropping the future before it
    /// completes must not lose a value.
    async fn next_change(&mut self) -> Result<Option<RawPointerValue>>;

    /// Read the node's current value once.
    async fn read_value(&mut self, node_id: &str) -> Result<RawPointerValue>;
}
