//! Operator-facing output: the message panel, execution log and status line

use narration::VerbosityTier;
use std::io::Write;
#[cfg(test)]
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;

/// Robot status shown next to the message panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub connected: bool,
    pub monitoring: bool,
    pub module: String,
    pub routine: String,
    pub line: String,
    pub pending: usize,
    pub speech_enabled: bool,
    pub tier: VerbosityTier,
}

impl StatusView {
    pub fn render(&self) -> String {
        format!(
            "connected={} monitoring={} module={} routine={} line={} queued={} speech={} level={}",
            self.connected,
            self.monitoring,
            self.module,
            self.routine,
            self.line,
            self.pending,
            if self.speech_enabled { "on" } else { "off" },
            self.tier,
        )
    }
}

pub trait NarrationDisplay: Send {
    /// Show a pair of messages, replacing whatever was shown.
    fn show_batch(&mut self, messages: &[String; 2]);

    fn clear(&mut self);

    /// Append a line to the execution log.
    fn log(&mut self, line: &str);

    fn status(&mut self, status: &StatusView);
}

/// `HH:MM:SS` in local time, falling back to UTC.
pub fn clock() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    format!("{:02}:{:02}:{:02}", now.hour(), now.minute(), now.second())
}

/// Writes everything to stdout.
#[derive(Default)]
pub struct ConsoleDisplay;

impl NarrationDisplay for ConsoleDisplay {
    fn show_batch(&mut self, messages: &[String; 2]) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, ">> {}", messages[0]);
        let _ = writeln!(out, ">> {}", messages[1]);
    }

    fn clear(&mut self) {
        let _ = writeln!(std::io::stdout().lock(), "--");
    }

    fn log(&mut self, line: &str) {
        let _ = writeln!(std::io::stdout().lock(), "[{}] {}", clock(), line);
    }

    fn status(&mut self, status: &StatusView) {
        let _ = writeln!(std::io::stdout().lock(), "status: {}", status.render());
    }
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    Batch([String; 2]),
    Clear,
    Log(String),
    Status(StatusView),
}

/// Keeps everything it is shown. Clones share the record.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct RecordingDisplay {
    events: Arc<Mutex<Vec<DisplayEvent>>>,
}

#[cfg(test)]
impl RecordingDisplay {
    pub fn events(&self) -> Vec<DisplayEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn batches(&self) -> Vec<[String; 2]> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DisplayEvent::Batch(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DisplayEvent::Log(l) => Some(l),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: DisplayEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
impl NarrationDisplay for RecordingDisplay {
    fn show_batch(&mut self, messages: &[String; 2]) {
        self.push(DisplayEvent::Batch(messages.clone()));
    }

    fn clear(&mut self) {
        self.push(DisplayEvent::Clear);
    }

    fn log(&mut self, line: &str) {
        self.push(DisplayEvent::Log(line.to_string()));
    }

    fn status(&mut self, status: &StatusView) {
        self.push(DisplayEvent::Status(status.clone()));
    }
}
