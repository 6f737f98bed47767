//! Connection worker
//!
//! Owns the pointer source and performs every transport call. Results and
//! data changes go to the event loop as [`UiEvent`]s; the worker never
//! touches display or pacing state.

use crate::session::UiEvent;
use program_pointer::{PointerSource, RawPointerValue, SourceStatus};
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionCommand {
    Connect,
    Disconnect,
    StartMonitoring,
    StopMonitoring,
    /// Report connection flags and the pointer's current value.
    Snapshot,
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    Connected { endpoint: String },
    ConnectFailed { endpoint: String, error: String },
    Disconnected,
    MonitoringStarted,
    MonitoringStopped,
    /// A command needed a connection that is not there.
    NotConnected { action: &'static str },
    Pointer(RawPointerValue),
    /// The source has no more values (end of a recording or script).
    SourceEnded,
    /// The transport failed while monitoring; the connection was dropped.
    TransportError(String),
    Snapshot {
        status: SourceStatus,
        value: Option<RawPointerValue>,
    },
}

pub struct ConnectionWorker {
    source: Box<dyn PointerSource>,
    node_id: String,
    publishing_interval: Duration,
    commands: UnboundedReceiver<ConnectionCommand>,
    events: UnboundedSender<UiEvent>,
}

impl ConnectionWorker {
    pub fn new(
        source: Box<dyn PointerSource>,
        node_id: impl Into<String>,
        publishing_interval: Duration,
        commands: UnboundedReceiver<ConnectionCommand>,
        events: UnboundedSender<UiEvent>,
    ) -> Self {
        Self {
            source,
            node_id: node_id.into(),
            publishing_interval,
            commands,
            events,
        }
    }

    pub async fn run(mut self) {
        info!(endpoint = %self.source.endpoint(), "connection worker started");
        loop {
            let monitoring = self.source.status().monitoring;
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    None | Some(ConnectionCommand::Shutdown) => break,
                    Some(cmd) => self.handle(cmd).await,
                },
                change = self.source.next_change(), if monitoring => match change {
                    Ok(Some(value)) => self.emit(ConnectionEvent::Pointer(value)),
                    Ok(None) => {
                        info!("pointer source finished");
                        let _ = self.source.unsubscribe().await;
                        self.emit(ConnectionEvent::SourceEnded);
                    }
                    Err(e) => {
                        warn!(error = %e, "transport error while monitoring");
                        let _ = self.source.disconnect().await;
                        self.emit(ConnectionEvent::TransportError(e.to_string()));
                    }
                },
            }
        }

        if self.source.status().connected {
            let _ = self.source.disconnect().await;
        }
        debug!("connection worker stopped");
    }

    async fn handle(&mut self, cmd: ConnectionCommand) {
        let status = self.source.status();
        match cmd {
            ConnectionCommand::Connect => {
                if status.connected {
                    self.emit(ConnectionEvent::Connected {
                        endpoint: self.source.endpoint().to_string(),
                    });
                    return;
                }
                let endpoint = self.source.endpoint().to_string();
                match self.source.connect().await {
                    Ok(()) => self.emit(ConnectionEvent::Connected { endpoint }),
                    Err(e) => {
                        warn!(%endpoint, error = %e, "connection failed");
                        self.emit(ConnectionEvent::ConnectFailed {
                            endpoint,
                            error: e.to_string(),
                        });
                    }
                }
            }
            ConnectionCommand::Disconnect => {
                if status.monitoring {
                    let _ = self.source.unsubscribe().await;
                }
                if let Err(e) = self.source.disconnect().await {
                    warn!(error = %e, "disconnect failed");
                }
                self.emit(ConnectionEvent::Disconnected);
            }
            ConnectionCommand::StartMonitoring => {
                if !status.connected {
                    self.emit(ConnectionEvent::NotConnected { action: "start monitoring" });
                    return;
                }
                if status.monitoring {
                    return;
                }
                let node_id = self.node_id.clone();
                match self.source.subscribe(&node_id, self.publishing_interval).await {
                    Ok(()) => self.emit(ConnectionEvent::MonitoringStarted),
                    Err(e) => {
                        warn!(%node_id, error = %e, "subscription failed");
                        let _ = self.source.disconnect().await;
                        self.emit(ConnectionEvent::TransportError(e.to_string()));
                    }
                }
            }
            ConnectionCommand::StopMonitoring => {
                if !status.monitoring {
                    return;
                }
                if let Err(e) = self.source.unsubscribe().await {
                    warn!(error = %e, "unsubscribe failed");
                }
                self.emit(ConnectionEvent::MonitoringStopped);
            }
            ConnectionCommand::Snapshot => {
                let value = if status.connected {
                    let node_id = self.node_id.clone();
                    match self.source.read_value(&node_id).await {
                        Ok(v) => Some(v),
                        Err(e) => {
                            debug!(error = %e, "status read failed");
                            None
                        }
                    }
                } else {
                    None
                };
                self.emit(ConnectionEvent::Snapshot { status, value });
            }
            ConnectionCommand::Shutdown => {}
        }
    }

    fn emit(&self, event: ConnectionEvent) {
        if self.events.send(UiEvent::Connection(event)).is_err() {
            debug!("event loop gone, dropping connection event");
        }
    }
}
