use crate::{PointerSource, RawPointerValue, Result, SourceError, SourceStatus};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Replays node values recorded as JSON lines.
///
/// Each non-empty line holds one value; lines that are not valid JSON are
/// delivered as text, the way the gateway renders values it cannot type.
pub struct ReplaySource {
    path: PathBuf,
    endpoint: String,
    pending: VecDeque<RawPointerValue>,
    last: Option<RawPointerValue>,
    step: Duration,
    connected: bool,
    monitoring: bool,
}

impl ReplaySource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            endpoint: format!("replay://{}", path.display()),
            path,
            pending: VecDeque::new(),
            last: None,
            step: Duration::from_millis(500),
            connected: false,
            monitoring: false,
        }
    }

    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    pub fn parse_recording(raw: &str) -> Vec<RawPointerValue> {
        raw.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(|l| match serde_json::from_str::<serde_json::Value>(l) {
                Ok(v) => RawPointerValue::from_json(v),
                Err(_) => RawPointerValue::Text(l.to_string()),
            })
            .collect()
    }
}

#[async_trait]
impl PointerSource for ReplaySource {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn status(&self) -> SourceStatus {
        SourceStatus {
            connected: self.connected,
            monitoring: self.monitoring,
        }
    }

    async fn connect(&mut self) -> Result<()> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SourceError::Connect {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            })?;
        self.pending = Self::parse_recording(&raw).into();
        self.connected = true;
        tracing::info!(
            path = %self.path.display(),
            values = self.pending.len(),
            "replay recording loaded"
        );
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        self.monitoring = false;
        self.pending.clear();
        Ok(())
    }

    async fn subscribe(&mut self, _node_id: &str, _publishing_interval: Duration) -> Result<()> {
        if !self.connected {
            return Err(SourceError::NotConnected);
        }
        self.monitoring = true;
        Ok(())
    }

    async fn unsubscribe(&mut self) -> Result<()> {
        self.monitoring = false;
        Ok(())
    }

    async fn next_change(&mut self) -> Result<Option<RawPointerValue>> {
        if !self.monitoring {
            return Err(SourceError::NotConnected);
        }
        if self.pending.is_empty() {
            return Ok(None);
        }
        tokio::time::sleep(self.step).await;
        let value = self.pending.pop_front();
        self.last.clone_from(&value);
        Ok(value)
    }

    async fn read_value(&mut self, node_id: &str) -> Result<RawPointerValue> {
        self.last
            .clone()
            .or_else(|| self.pending.front().cloned())
            .ok_or_else(|| SourceError::Read(node_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode_pointer;
    use std::io::Write;

    #[test]
    fn test_parse_recording_shapes() {
        let values = ReplaySource::parse_recording(
            r#"
            # recorded from the cell
            {"Body": {"Line": 15, "Module": "MainModule", "Routine": "main"}}
            {"line": "16"}
            Line=17, Module=MainModule, Routine=main
            "#,
        );
        assert_eq!(values.len(), 3);
        let lines: Vec<_> = values
            .iter()
            .map(|v| decode_pointer(v).unwrap().line)
            .collect();
        assert_eq!(lines, vec![Some(15), Some(16), Some(17)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_file() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, r#"{{"Line": 84, "Module": "MainModule", "Routine": "main"}}"#)?;
        writeln!(file, r#"{{"Line": 85, "Module": "MainModule", "Routine": "FinalMoves"}}"#)?;

        let mut src = ReplaySource::new(file.path()).with_step(Duration::from_millis(1));
        src.connect().await?;
        src.subscribe("node", Duration::from_millis(500)).await?;
        let first = src.next_change().await?.map(|v| decode_pointer(&v));
        assert_eq!(first.and_then(|d| d.ok()).and_then(|d| d.line), Some(84));
        assert!(src.next_change().await?.is_some());
        assert!(src.next_change().await?.is_none());

        let current = decode_pointer(&src.read_value("node").await?)?;
        assert_eq!(current.routine, "FinalMoves");
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_fails_connect() {
        let mut src = ReplaySource::new("/nonexistent/recording.jsonl");
        assert!(matches!(
            src.connect().await,
            Err(SourceError::Connect { .. })
        ));
    }
}
