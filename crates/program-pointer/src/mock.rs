use crate::{PointerRecord, PointerSource, RawPointerValue, Result, SourceError, SourceStatus};
use async_trait::async_trait;
use std::time::Duration;

/// RAPID lines executed by the pick-and-place program for one shape.
///
/// `shape` follows the TEST/CASE order of the program: 1 circle, 2 star,
/// 3 hexagon, 4 triangle, 5 square. Unknown shapes fall back to the circle.
pub fn pick_and_place_script(shape: u8) -> Vec<PointerRecord> {
    let (select, pickup, place): (i64, [i64; 5], Vec<i64>) = match shape {
        2 => (25, [39, 40, 41, 42, 43], vec![64, 65, 66, 67, 68]),
        3 => (27, [44, 45, 46, 47, 48], vec![69, 70, 71, 72, 73]),
        4 => (29, [49, 50, 51, 52, 53], vec![74, 75, 76, 77, 78]),
        5 => (31, [54, 55, 56, 57, 58], vec![79, 80, 81, 82, 83]),
        _ => (23, [34, 35, 36, 37, 38], vec![60, 61, 62, 63]),
    };

    let mut script = Vec::new();
    let main = |l: i64| PointerRecord::new(l, "MainModule", "main");
    for line in [15, 16, 17, 22, select] {
        script.push(main(line));
    }
    for line in pickup {
        script.push(PointerRecord::new(line, "MainModule", "PickShape"));
    }
    script.push(main(59));
    for line in place {
        script.push(PointerRecord::new(line, "MainModule", "PlaceShape"));
    }
    script.push(main(84));
    for line in 85..=89 {
        script.push(PointerRecord::new(line, "MainModule", "FinalMoves"));
    }
    for line in 90..=92 {
        script.push(main(line));
    }
    script
}

/// In-process simulator that replays a scripted sequence of pointer values.
pub struct MockSource {
    endpoint: String,
    script: Vec<RawPointerValue>,
    cursor: usize,
    step: Duration,
    repeats: usize,
    emitted_for_current: usize,
    connected: bool,
    monitoring: bool,
    refuse_connect: bool,
    reject_subscribe: bool,
}

impl MockSource {
    pub fn new(endpoint: &str, script: Vec<RawPointerValue>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            script,
            cursor: 0,
            step: Duration::from_millis(800),
            repeats: 1,
            emitted_for_current: 0,
            connected: false,
            monitoring: false,
            refuse_connect: false,
            reject_subscribe: false,
        }
    }

    /// Simulator running the pick-and-place program for `shape`.
    pub fn pick_and_place(endpoint: &str, shape: u8) -> Self {
        let script = pick_and_place_script(shape)
            .into_iter()
            .map(|r| RawPointerValue::wrap(r.into()))
            .collect();
        Self::new(endpoint, script)
    }

    /// Delay between two delivered values.
    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    /// Deliver every value `n` times, like a poller that keeps seeing the same
    /// pointer.
    pub fn with_repeats(mut self, n: usize) -> Self {
        self.repeats = n.max(1);
        self
    }

    /// Make every connection attempt fail.
    pub fn refusing_connections(mut self) -> Self {
        self.refuse_connect = true;
        self
    }

    /// Accept connections but fail every subscription.
    pub fn rejecting_subscriptions(mut self) -> Self {
        self.reject_subscribe = true;
        self
    }
}

#[async_trait]
impl PointerSource for MockSource {
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
        if self.refuse_connect {
            return Err(SourceError::Connect {
                endpoint: self.endpoint.clone(),
                reason: "connection refused".into(),
            });
        }
        self.connected = true;
        tracing::debug!(endpoint = %self.endpoint, "mock source connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.monitoring = false;
        self.connected = false;
        Ok(())
    }

    async fn subscribe(&mut self, node_id: &str, publishing_interval: Duration) -> Result<()> {
        if !self.connected {
            return Err(SourceError::NotConnected);
        }
        if self.reject_subscribe {
            return Err(SourceError::Subscribe {
                node_id: node_id.to_string(),
                reason: "bad node id".into(),
            });
        }
        tracing::debug!(node_id, ?publishing_interval, "mock subscription created");
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
        if self.cursor >= self.script.len() {
            return Ok(None);
        }
        tokio::time::sleep(self.step).await;

        let value = self.script[self.cursor].clone();
        self.emitted_for_current += 1;
        if self.emitted_for_current >= self.repeats {
            self.emitted_for_current = 0;
            self.cursor += 1;
        }
        Ok(Some(value))
    }

    async fn read_value(&mut self, node_id: &str) -> Result<RawPointerValue> {
        if !self.connected {
            return Err(SourceError::NotConnected);
        }
        let idx = self.cursor.min(self.script.len().saturating_sub(1));
        self.script
            .get(idx)
            .cloned()
            .ok_or_else(|| SourceError::Read(node_id.to_string()))
    }
}
