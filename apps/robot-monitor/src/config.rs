use anyhow::{Context, Result};
use pacing::PacingConfig;
use program_pointer::{DEFAULT_ENDPOINT, DEFAULT_PUBLISHING_INTERVAL_MS, PROGRAM_POINTER_NODE_ID};
use serde::{Deserialize, Serialize};
use speech::SpeechConfig;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Built-in pick-and-place simulator
    #[default]
    Mock,
    /// Recorded values from a JSON lines file
    Replay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default = "default_publishing_interval_ms")]
    pub publishing_interval_ms: u64,
    /// Shape run by the simulator (1 circle .. 5 square).
    #[serde(default = "default_shape")]
    pub shape: u8,
    /// Delay between simulated or replayed values.
    #[serde(default = "default_step_ms")]
    pub step_ms: u64,
    /// Times the simulator reports each line, like a poller seeing it again.
    #[serde(default = "default_repeats")]
    pub repeats: usize,
    #[serde(default)]
    pub replay_path: Option<PathBuf>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_node_id() -> String {
    PROGRAM_POINTER_NODE_ID.to_string()
}

fn default_publishing_interval_ms() -> u64 {
    DEFAULT_PUBLISHING_INTERVAL_MS
}

fn default_shape() -> u8 {
    1
}

fn default_step_ms() -> u64 {
    800
}

fn default_repeats() -> usize {
    1
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            endpoint: default_endpoint(),
            node_id: default_node_id(),
            publishing_interval_ms: default_publishing_interval_ms(),
            shape: default_shape(),
            step_ms: default_step_ms(),
            repeats: default_repeats(),
            replay_path: None,
        }
    }
}

impl SourceConfig {
    pub fn publishing_interval(&self) -> Duration {
        Duration::from_millis(self.publishing_interval_ms)
    }

    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    /// Narration table to use instead of the built-in one.
    #[serde(default)]
    pub narration_table: Option<PathBuf>,
    /// Credential table to use instead of the built-in one.
    #[serde(default)]
    pub credentials: Option<PathBuf>,
    #[serde(default = "default_watchdog_interval_ms")]
    pub watchdog_interval_ms: u64,
}

fn default_watchdog_interval_ms() -> u64 {
    1000
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            pacing: PacingConfig::default(),
            speech: SpeechConfig::default(),
            narration_table: None,
            credentials: None,
            watchdog_interval_ms: default_watchdog_interval_ms(),
        }
    }
}

impl MonitorConfig {
    /// Load from YAML or JSON, chosen by file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let is_json = path.extension().and_then(|s| s.to_str()) == Some("json");
        let config = if is_json {
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing json: {}", path.display()))?
        } else {
            serde_yaml::from_str(&raw)
                .with_context(|| format!("parsing yaml: {}", path.display()))?
        };
        Ok(config)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms.max(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = MonitorConfig::default();
        assert_eq!(cfg.source.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(cfg.source.publishing_interval(), Duration::from_millis(500));
        assert_eq!(cfg.pacing.settle_delay(), Duration::from_secs(1));
        assert_eq!(cfg.speech.rate_wpm, 150);
    }

    #[test]
    fn test_partial_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "source:\n  kind: replay\n  replay_path: run.jsonl\npacing:\n  settle_ms: 250\nspeech:\n  backend: silent"
        )
        .unwrap();
        let cfg = MonitorConfig::load(file.path()).unwrap();
        assert_eq!(cfg.source.kind, SourceKind::Replay);
        assert_eq!(cfg.source.node_id, PROGRAM_POINTER_NODE_ID);
        assert_eq!(cfg.pacing.settle_ms, 250);
        assert_eq!(cfg.pacing.resume_ms, 500);
        assert_eq!(cfg.speech.backend, speech::SpeechBackendKind::Silent);
        assert_eq!(cfg.watchdog_interval_ms, 1000);
    }

    #[test]
    fn test_json_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"source": {{"shape": 4}}, "watchdog_interval_ms": 250}}"#).unwrap();
        let cfg = MonitorConfig::load(file.path()).unwrap();
        assert_eq!(cfg.source.shape, 4);
        assert_eq!(cfg.watchdog_interval(), Duration::from_millis(250));
    }
}
