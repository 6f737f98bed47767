//! Single-owner event loop
//!
//! All display and pacing state lives here and is only touched from the task
//! running [`Session::run`]. The connection worker, the speech worker, the
//! console reader and pacing timers talk to it by sending [`UiEvent`]s.

use crate::connection::{ConnectionCommand, ConnectionEvent};
use crate::console::{OperatorCommand, HELP};
use crate::display::{NarrationDisplay, StatusView};
use crate::metrics::MetricsHub;
use message_generator::{MessageRenderer, StepDetails};
use narration::{LineTracker, NarrationTable, VerbosityTier};
use pacing::{
    BatchId, Command, MessageQueueManager, PacingConfig, PacingWatchdog, QueueState, Timer,
    BATCH_SIZE,
};
use program_pointer::{decode_pointer, DecodedPointer, RawPointerValue};
use speech::SpeechManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const MSG_CONNECTED: &str = "Successfully connected to ABB Robot via OPC UA";
pub const MSG_CONNECT_FAILED: &str = "Failed to connect to ABB Robot";
pub const MSG_MONITORING_STARTED: &str = "Started real-time monitoring of ABB Robot";
pub const MSG_MONITORING_STOPPED: &str = "Stopped robot monitoring";
pub const MSG_DISCONNECTED: &str = "Disconnected from ABB Robot";
pub const MSG_SPEECH_ON: &str = "Text-to-speech enabled";
pub const MSG_SPEECH_OFF: &str = "Text-to-speech disabled";

#[derive(Debug)]
pub enum UiEvent {
    Connection(ConnectionEvent),
    SpeechFinished(BatchId),
    Timer(Timer),
    Command(OperatorCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Session {
    id: Uuid,
    operator: String,
    tier: VerbosityTier,
    tracker: LineTracker,
    queue: MessageQueueManager,
    watchdog: PacingWatchdog,
    watchdog_interval: Duration,
    speech: SpeechManager,
    renderer: MessageRenderer,
    display: Box<dyn NarrationDisplay>,
    metrics: Option<MetricsHub>,
    events: UnboundedSender<UiEvent>,
    connection: Option<UnboundedSender<ConnectionCommand>>,
    connected: bool,
    monitoring: bool,
    source_ended: bool,
    exit_when_done: bool,
    pointer: DecodedPointer,
    last_logged_line: Option<i64>,
}

impl Session {
    pub fn new(
        operator: impl Into<String>,
        tier: VerbosityTier,
        table: Arc<NarrationTable>,
        pacing: PacingConfig,
        speech: SpeechManager,
        display: Box<dyn NarrationDisplay>,
        events: UnboundedSender<UiEvent>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            operator: operator.into(),
            tier,
            tracker: LineTracker::new(table),
            watchdog: PacingWatchdog::new(&pacing),
            watchdog_interval: Duration::from_secs(1),
            queue: MessageQueueManager::new(pacing),
            speech,
            renderer: MessageRenderer::new(),
            display,
            metrics: None,
            events,
            connection: None,
            connected: false,
            monitoring: false,
            source_ended: false,
            exit_when_done: false,
            pointer: DecodedPointer::empty(),
            last_logged_line: None,
        }
    }

    pub fn with_connection(mut self, commands: UnboundedSender<ConnectionCommand>) -> Self {
        self.connection = Some(commands);
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsHub) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_watchdog_interval(mut self, interval: Duration) -> Self {
        self.watchdog_interval = interval;
        self
    }

    /// Leave the loop once the source has ended and no full pair is left.
    pub fn exit_when_done(mut self, yes: bool) -> Self {
        self.exit_when_done = yes;
        self
    }

    pub async fn run(&mut self, events: &mut UnboundedReceiver<UiEvent>) {
        info!(session = %self.id, operator = %self.operator, tier = %self.tier, "session started");
        let mut ticker = tokio::time::interval(self.watchdog_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    if self.handle(event) == Flow::Quit {
                        break;
                    }
                }
                _ = ticker.tick() => self.check_watchdog(),
            }
            if self.drained() {
                info!(session = %self.id, "program finished and narration drained");
                break;
            }
        }

        self.speech.stop();
        info!(session = %self.id, "session ended");
    }

    pub fn handle(&mut self, event: UiEvent) -> Flow {
        match event {
            UiEvent::Connection(event) => self.on_connection(event),
            UiEvent::SpeechFinished(batch) => {
                let cmds = self.queue.on_speech_complete(batch);
                self.execute(cmds);
            }
            UiEvent::Timer(timer) => {
                let cmds = self.queue.on_timer(timer);
                self.execute(cmds);
            }
            UiEvent::Command(cmd) => return self.on_command(cmd),
        }
        Flow::Continue
    }

    pub fn status_view(&self) -> StatusView {
        StatusView {
            connected: self.connected,
            monitoring: self.monitoring,
            module: self.pointer.module.clone(),
            routine: self.pointer.routine.clone(),
            line: self.pointer.line_label(),
            pending: self.queue.pending_len(),
            speech_enabled: self.speech.is_enabled(),
            tier: self.tier,
        }
    }

    fn on_connection(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Connected { endpoint } => {
                info!(session = %self.id, %endpoint, "connected");
                self.connected = true;
                self.narrate(MSG_CONNECTED);
                self.refresh_status();
            }
            ConnectionEvent::ConnectFailed { endpoint, error } => {
                self.connected = false;
                self.log_error(&format!("Connection to {endpoint} failed: {error}"));
                self.narrate(MSG_CONNECT_FAILED);
            }
            ConnectionEvent::Disconnected => {
                self.connected = false;
                self.monitoring = false;
                self.narrate(MSG_DISCONNECTED);
                self.refresh_status();
            }
            ConnectionEvent::MonitoringStarted => {
                self.begin_monitoring();
                self.narrate(MSG_MONITORING_STARTED);
                self.refresh_status();
            }
            ConnectionEvent::MonitoringStopped => {
                self.monitoring = false;
                self.narrate(MSG_MONITORING_STOPPED);
                self.refresh_status();
            }
            ConnectionEvent::NotConnected { action } => {
                self.log_error(&format!("Cannot {action}: not connected to ABB Robot"));
            }
            ConnectionEvent::Pointer(value) => {
                if self.monitoring {
                    self.on_pointer(&value);
                } else {
                    debug!("pointer value outside monitoring dropped");
                }
            }
            ConnectionEvent::SourceEnded => {
                self.monitoring = false;
                self.source_ended = true;
                self.display.log("INFO: Program pointer source finished");
            }
            ConnectionEvent::TransportError(error) => {
                self.connected = false;
                self.monitoring = false;
                self.log_error(&format!("Connection lost: {error}"));
                self.refresh_status();
            }
            ConnectionEvent::Snapshot { status, value } => {
                self.connected = status.connected;
                self.monitoring = status.monitoring;
                if let Some(value) = value {
                    match decode_pointer(&value) {
                        Ok(decoded) => self.pointer = decoded,
                        Err(e) => debug!(error = %e, "status snapshot not decodable"),
                    }
                }
                self.refresh_status();
            }
        }
    }

    // A new monitoring run: fresh group memory and queue. Speech from the
    // previous run is cut off; its completion carries an old batch id.
    fn begin_monitoring(&mut self) {
        self.id = Uuid::new_v4();
        info!(session = %self.id, operator = %self.operator, "monitoring started");
        self.speech.stop();
        self.tracker.reset();
        self.queue.reset();
        self.watchdog.reset();
        self.display.clear();
        self.monitoring = true;
        self.source_ended = false;
        self.last_logged_line = None;
        self.pointer = DecodedPointer::empty();
        self.update_pending();
    }

    fn on_pointer(&mut self, value: &RawPointerValue) {
        if let Some(m) = &self.metrics {
            m.narration.pointer_events.inc();
        }
        let decoded = match decode_pointer(value) {
            Ok(decoded) => decoded,
            Err(e) => {
                if let Some(m) = &self.metrics {
                    m.narration.decode_errors.inc();
                }
                warn!(session = %self.id, error = %e, "dropping undecodable pointer value");
                self.log_error(&format!("Failed to decode program pointer: {e}"));
                return;
            }
        };

        let line = decoded.line;
        self.pointer = decoded;
        self.refresh_status();

        let Some(line) = line else {
            debug!("pointer value carried no line");
            return;
        };
        if self.last_logged_line != Some(line) {
            self.display.log(&format!(
                "Program Pointer: Module={}, Routine={}, Line={}",
                self.pointer.module, self.pointer.routine, line
            ));
            self.last_logged_line = Some(line);
        }

        if let Some(text) = self.tracker.resolve(line, self.tier) {
            self.narrate(&text);
        }
    }

    fn on_command(&mut self, cmd: OperatorCommand) -> Flow {
        match cmd {
            OperatorCommand::Connect => self.send_connection(ConnectionCommand::Connect),
            OperatorCommand::Disconnect => self.send_connection(ConnectionCommand::Disconnect),
            OperatorCommand::Start => self.send_connection(ConnectionCommand::StartMonitoring),
            OperatorCommand::Stop => self.send_connection(ConnectionCommand::StopMonitoring),
            OperatorCommand::Status => {
                if self.connection.is_some() {
                    self.send_connection(ConnectionCommand::Snapshot);
                } else {
                    self.refresh_status();
                }
            }
            OperatorCommand::Speech(enabled) => {
                self.speech.toggle(enabled);
                self.narrate(if enabled { MSG_SPEECH_ON } else { MSG_SPEECH_OFF });
                self.refresh_status();
            }
            OperatorCommand::Rate(wpm) => match self.speech.set_rate(wpm) {
                Ok(()) => self
                    .display
                    .log(&format!("INFO: Speech rate set to {wpm} words per minute")),
                Err(e) => self.log_error(&e.to_string()),
            },
            OperatorCommand::Say(text) => self.narrate(&text),
            OperatorCommand::Action { name, target } => {
                let details = StepDetails { target };
                let text = self.renderer.generate(&name, self.tier, &details);
                self.narrate(&text);
            }
            OperatorCommand::Help => {
                for line in HELP.lines() {
                    self.display.log(line);
                }
            }
            OperatorCommand::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// Queue a narration message. Non-ASCII characters are dropped first.
    fn narrate(&mut self, text: &str) {
        let text: String = text.chars().filter(char::is_ascii).collect();
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.display.log(&format!("INFO: {text}"));
        if let Some(m) = &self.metrics {
            m.narration.narrations.inc();
        }
        let cmds = self.queue.enqueue(text);
        self.execute(cmds);
    }

    fn execute(&mut self, cmds: Vec<Command>) {
        for cmd in cmds {
            match cmd {
                Command::Display { batch, messages } => {
                    debug!(session = %self.id, ?batch, "showing batch");
                    self.display.show_batch(&messages);
                    if let Some(m) = &self.metrics {
                        m.narration.batches.inc();
                    }
                }
                Command::Speak { batch, utterance } => {
                    let events = self.events.clone();
                    self.speech.speak(&utterance, move || {
                        let _ = events.send(UiEvent::SpeechFinished(batch));
                    });
                }
                Command::ClearDisplay => self.display.clear(),
                Command::Schedule { after, timer } => {
                    let events = self.events.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = events.send(UiEvent::Timer(timer));
                    });
                }
            }
        }
        self.update_pending();
    }

    fn update_pending(&mut self) {
        if let Some(m) = &self.metrics {
            m.narration.pending_messages.set(self.queue.pending_len() as i64);
        }
        self.watchdog.observe(&self.queue);
    }

    fn check_watchdog(&mut self) {
        let status = self.watchdog.check();
        if status.consecutive_failures == 1 {
            if let Some(err) = &status.last_error {
                self.display.log(&format!("WARNING: {err}"));
            }
        }
    }

    fn drained(&self) -> bool {
        self.exit_when_done
            && self.source_ended
            && self.queue.state() == QueueState::Idle
            && self.queue.pending_len() < BATCH_SIZE
    }

    fn send_connection(&mut self, cmd: ConnectionCommand) {
        let sent = self
            .connection
            .as_ref()
            .map(|tx| tx.send(cmd).is_ok())
            .unwrap_or(false);
        if !sent {
            self.log_error("Connection worker is not running");
        }
    }

    fn refresh_status(&mut self) {
        let view = self.status_view();
        self.display.status(&view);
    }

    fn log_error(&mut self, message: &str) {
        self.display.log(&format!("ERROR: {message}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{DisplayEvent, RecordingDisplay};
    use program_pointer::{pick_and_place_script, PointerRecord};
    use speech::{MockSpeech, SpeechConfig};
    use tokio::sync::mpsc::unbounded_channel;

    struct Harness {
        session: Session,
        events: UnboundedReceiver<UiEvent>,
        tx: UnboundedSender<UiEvent>,
        display: RecordingDisplay,
        metrics: MetricsHub,
        table: Arc<NarrationTable>,
    }

    fn harness(tier: VerbosityTier) -> Harness {
        harness_with_speech(tier, SpeechManager::new(None, &SpeechConfig::default()))
    }

    fn harness_with_speech(tier: VerbosityTier, speech: SpeechManager) -> Harness {
        let table = Arc::new(NarrationTable::builtin().unwrap());
        let (tx, events) = unbounded_channel();
        let display = RecordingDisplay::default();
        let metrics = MetricsHub::new().unwrap();
        let mut session = Session::new(
            "sai",
            tier,
            Arc::clone(&table),
            PacingConfig::default(),
            speech,
            Box::new(display.clone()),
            tx.clone(),
        )
        .with_metrics(metrics.clone())
        .exit_when_done(true);
        session.renderer = MessageRenderer::with_seed(11);
        Harness {
            session,
            events,
            tx,
            display,
            metrics,
            table,
        }
    }

    fn pointer(line: i64, routine: &str) -> UiEvent {
        UiEvent::Connection(ConnectionEvent::Pointer(
            PointerRecord::new(line, "MainModule", routine).into(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_program_is_narrated_in_pairs() {
        let mut h = harness(VerbosityTier::Level1);
        h.tx.send(UiEvent::Connection(ConnectionEvent::MonitoringStarted))
            .unwrap();
        for record in pick_and_place_script(1) {
            h.tx.send(UiEvent::Connection(ConnectionEvent::Pointer(record.into())))
                .unwrap();
        }
        h.tx.send(UiEvent::Connection(ConnectionEvent::SourceEnded))
            .unwrap();

        tokio::time::timeout(Duration::from_secs(120), h.session.run(&mut h.events))
            .await
            .unwrap();

        // the start message plus ten program narrations: five pairs, one held
        let batches = h.display.batches();
        assert_eq!(batches.len(), 5);
        assert_eq!(batches[0][0], MSG_MONITORING_STARTED);
        assert_eq!(
            batches[0][1],
            h.table.text_for(15, VerbosityTier::Level1).unwrap()
        );
        assert_eq!(h.session.queue.pending_len(), 1);
        assert_eq!(h.metrics.narration.batches.get(), 5);
        assert_eq!(h.metrics.narration.narrations.get(), 11);

        let logs = h.display.log_lines();
        assert!(logs
            .iter()
            .any(|l| l == "Program Pointer: Module=MainModule, Routine=main, Line=15"));
        assert!(logs.iter().any(|l| l == "INFO: Program pointer source finished"));
    }

    #[tokio::test]
    async fn test_repeated_line_logged_once() {
        let mut h = harness(VerbosityTier::Level2);
        h.session
            .handle(UiEvent::Connection(ConnectionEvent::MonitoringStarted));
        for _ in 0..3 {
            h.session.handle(pointer(15, "main"));
        }
        let pointer_logs = h
            .display
            .log_lines()
            .into_iter()
            .filter(|l| l.starts_with("Program Pointer:"))
            .count();
        assert_eq!(pointer_logs, 1);
        assert_eq!(h.metrics.narration.pointer_events.get(), 3);
        // start message and line 15 make the first pair
        assert_eq!(h.display.batches().len(), 1);
    }

    #[tokio::test]
    async fn test_decode_error_is_logged_and_dropped() {
        let mut h = harness(VerbosityTier::Level1);
        h.session
            .handle(UiEvent::Connection(ConnectionEvent::MonitoringStarted));
        h.session.handle(UiEvent::Connection(ConnectionEvent::Pointer(
            RawPointerValue::Envelope(None),
        )));
        assert_eq!(h.metrics.narration.decode_errors.get(), 1);
        assert!(h
            .display
            .log_lines()
            .iter()
            .any(|l| l.starts_with("ERROR: Failed to decode program pointer")));
        assert_eq!(h.session.tracker.last_line(), None);
    }

    #[tokio::test]
    async fn test_pointer_ignored_when_not_monitoring() {
        let mut h = harness(VerbosityTier::Level1);
        h.session.handle(pointer(15, "main"));
        assert_eq!(h.metrics.narration.pointer_events.get(), 0);
        assert!(h.display.log_lines().is_empty());
    }

    #[tokio::test]
    async fn test_action_command_renders_with_target() {
        let mut h = harness(VerbosityTier::Level1);
        h.session.handle(UiEvent::Command(OperatorCommand::Action {
            name: "move_to_home".into(),
            target: Some("p10".into()),
        }));
        let logs = h.display.log_lines();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].starts_with("INFO: "));
        assert!(logs[0].ends_with("towards p10"), "{}", logs[0]);
    }

    #[tokio::test]
    async fn test_narration_reduced_to_ascii() {
        let mut h = harness(VerbosityTier::Level1);
        h.session
            .handle(UiEvent::Command(OperatorCommand::Say("Gripper → open ✓".into())));
        assert_eq!(h.display.log_lines(), vec!["INFO: Gripper  open".to_string()]);
    }

    #[tokio::test]
    async fn test_transport_error_resets_flags() {
        let mut h = harness(VerbosityTier::Level3);
        h.session.handle(UiEvent::Connection(ConnectionEvent::Connected {
            endpoint: "opc.tcp://mock".into(),
        }));
        h.session
            .handle(UiEvent::Connection(ConnectionEvent::MonitoringStarted));
        assert!(h.session.status_view().monitoring);

        h.session.handle(UiEvent::Connection(ConnectionEvent::TransportError(
            "socket closed".into(),
        )));
        let view = h.session.status_view();
        assert!(!view.connected);
        assert!(!view.monitoring);
        assert!(h
            .display
            .log_lines()
            .iter()
            .any(|l| l == "ERROR: Connection lost: socket closed"));
    }

    #[tokio::test]
    async fn test_commands_without_worker_report_error() {
        let mut h = harness(VerbosityTier::Level1);
        assert_eq!(
            h.session.handle(UiEvent::Command(OperatorCommand::Connect)),
            Flow::Continue
        );
        assert!(h
            .display
            .log_lines()
            .iter()
            .any(|l| l == "ERROR: Connection worker is not running"));
        assert_eq!(
            h.session.handle(UiEvent::Command(OperatorCommand::Quit)),
            Flow::Quit
        );
    }

    fn status_count(display: &RecordingDisplay) -> usize {
        display
            .events()
            .iter()
            .filter(|e| matches!(e, DisplayEvent::Status(_)))
            .count()
    }

    #[tokio::test]
    async fn test_restart_cuts_previous_speech() {
        let mock = MockSpeech::new().with_ms_per_char(50);
        let speech = SpeechManager::new(Some(Box::new(mock.clone())), &SpeechConfig::default());
        let mut h = harness_with_speech(VerbosityTier::Level1, speech.clone());

        h.session
            .handle(UiEvent::Connection(ConnectionEvent::MonitoringStarted));
        h.session
            .handle(UiEvent::Command(OperatorCommand::Say("first batch".into())));
        assert_eq!(h.session.queue.state(), QueueState::DisplayingSpeaking(BatchId(1)));
        assert!(speech.is_speaking());
        std::thread::sleep(Duration::from_millis(30));

        h.session
            .handle(UiEvent::Connection(ConnectionEvent::MonitoringStarted));
        for _ in 0..100 {
            if !speech.is_speaking() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(!speech.is_speaking());
        assert!(mock.spoken().is_empty());

        // the cut-off batch still reports completion, which is ignored
        while let Ok(event) = h.events.try_recv() {
            h.session.handle(event);
        }
        assert_eq!(h.session.queue.state(), QueueState::Idle);

        h.session
            .handle(UiEvent::Command(OperatorCommand::Say("second batch".into())));
        let batches = h.display.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(
            batches[1],
            [MSG_MONITORING_STARTED.to_string(), "second batch".to_string()]
        );
        assert_eq!(h.session.queue.state(), QueueState::DisplayingSpeaking(BatchId(2)));
        speech.stop();
    }

    #[tokio::test]
    async fn test_status_follows_value_without_line() {
        let mut h = harness(VerbosityTier::Level1);
        h.session
            .handle(UiEvent::Connection(ConnectionEvent::MonitoringStarted));
        let before = status_count(&h.display);

        h.session.handle(UiEvent::Connection(ConnectionEvent::Pointer(
            RawPointerValue::Text("Module=Other, Routine=idle".into()),
        )));
        assert_eq!(status_count(&h.display), before + 1);
        let view = h.session.status_view();
        assert_eq!(view.module, "Other");
        assert_eq!(view.routine, "idle");
        assert_eq!(view.line, "---");
        assert!(!h
            .display
            .log_lines()
            .iter()
            .any(|l| l.starts_with("Program Pointer:")));
    }

    #[tokio::test]
    async fn test_status_follows_module_change_on_same_line() {
        let mut h = harness(VerbosityTier::Level2);
        h.session
            .handle(UiEvent::Connection(ConnectionEvent::MonitoringStarted));
        h.session.handle(pointer(15, "main"));
        let before = status_count(&h.display);

        h.session.handle(UiEvent::Connection(ConnectionEvent::Pointer(
            PointerRecord::new(15, "ServiceModule", "calib").into(),
        )));
        assert_eq!(status_count(&h.display), before + 1);
        let view = h.session.status_view();
        assert_eq!(view.module, "ServiceModule");
        assert_eq!(view.routine, "calib");
        assert_eq!(view.line, "15");

        let pointer_logs = h
            .display
            .log_lines()
            .into_iter()
            .filter(|l| l.starts_with("Program Pointer:"))
            .count();
        assert_eq!(pointer_logs, 1);
    }
}
