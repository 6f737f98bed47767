use access_control::{load_credentials_file, CredentialStore, Session as Operator};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use message_generator::{MessageRenderer, StepDetails};
use narration::{load_table_file, LineTracker, NarrationTable, VerbosityTier};
use program_pointer::{
    decode_pointer, pick_and_place_script, MockSource, PointerSource, RawPointerValue,
    ReplaySource,
};
use speech::SpeechManager;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::unbounded_channel;
use tracing::{error, info};

mod config;
mod connection;
mod console;
mod display;
mod metrics;
mod session;

use config::{MonitorConfig, SourceConfig, SourceKind};
use connection::{ConnectionCommand, ConnectionWorker};
use console::OperatorCommand;
use display::ConsoleDisplay;
use metrics::MetricsHub;
use session::{Session, UiEvent};

#[derive(Parser, Debug)]
#[command(
    name = "robot-monitor",
    version,
    about = "Narrates ABB robot program execution",
    disable_help_subcommand = true
)]
struct Cli {
    /// Config file (YAML, or JSON by extension)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log in and narrate the robot's program pointer
    Monitor {
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        password: Option<String>,
        /// Requested user level (Level1, Level2, Level3)
        #[arg(long)]
        level: Option<VerbosityTier>,
        /// Pointer source, overrides the config file
        #[arg(long, value_enum)]
        source: Option<SourceKind>,
        /// Recording for the replay source
        #[arg(long)]
        replay: Option<PathBuf>,
        /// Shape run by the simulator (1 circle .. 5 square)
        #[arg(long)]
        shape: Option<u8>,
        /// Connect and start monitoring right away
        #[arg(long)]
        auto_start: bool,
        /// Exit once the source ends and narration has drained
        #[arg(long)]
        exit_when_done: bool,
        /// Do not read operator commands from stdin
        #[arg(long)]
        no_console: bool,
        /// Print metrics on exit
        #[arg(long)]
        metrics: bool,
    },
    /// Print the narration of one program run without a robot
    Narrate {
        #[arg(long, default_value = "Level1")]
        level: VerbosityTier,
        #[arg(long, default_value_t = 1)]
        shape: u8,
        /// Narrate a recording instead of the simulated program
        #[arg(long)]
        replay: Option<PathBuf>,
    },
    /// Render a status message for a robot action
    Message {
        action: String,
        #[arg(long, default_value = "Level2")]
        level: VerbosityTier,
        #[arg(long)]
        target: Option<String>,
        /// Seed for reproducible template choice
        #[arg(long)]
        seed: Option<u64>,
    },
    /// List operators and their levels
    Users,
    /// Speak text with the configured engine
    Say {
        #[arg(required = true)]
        text: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::default(),
    };

    match cli.command {
        Commands::Monitor {
            user,
            password,
            level,
            source,
            replay,
            shape,
            auto_start,
            exit_when_done,
            no_console,
            metrics,
        } => {
            let mut config = config;
            if let Some(kind) = source {
                config.source.kind = kind;
            }
            if let Some(path) = replay {
                config.source.kind = SourceKind::Replay;
                config.source.replay_path = Some(path);
            }
            if let Some(shape) = shape {
                config.source.shape = shape;
            }
            let credentials = load_credentials(&config)?;
            let operator = login(&credentials, user, password, level)?;
            let opts = MonitorOptions {
                auto_start,
                exit_when_done,
                console: !no_console,
                print_metrics: metrics,
            };
            monitor(&config, operator, opts).await
        }
        Commands::Narrate {
            level,
            shape,
            replay,
        } => narrate(&config, level, shape, replay.as_deref()),
        Commands::Message {
            action,
            level,
            target,
            seed,
        } => {
            let mut renderer = seed.map(MessageRenderer::with_seed).unwrap_or_default();
            let category = message_generator::classify(&action);
            let text = renderer.generate(&action, level, &StepDetails { target });
            println!("[{category}] {text}");
            Ok(())
        }
        Commands::Users => {
            let credentials = load_credentials(&config)?;
            for (id, name, tier) in credentials.users() {
                println!("{id:<12} {name:<12} {tier}  {}", tier.message_style());
            }
            Ok(())
        }
        Commands::Say { text } => say(&config, &text.join(" ")),
    }
}

struct MonitorOptions {
    auto_start: bool,
    exit_when_done: bool,
    console: bool,
    print_metrics: bool,
}

async fn monitor(config: &MonitorConfig, operator: Operator, opts: MonitorOptions) -> Result<()> {
    let table = Arc::new(load_table(config)?);
    let source = build_source(&config.source)?;
    let metrics = MetricsHub::new().map_err(|e| anyhow!(e))?;
    let speech = SpeechManager::from_config(&config.speech);

    println!(
        "Logged in as {} ({}: {})",
        operator.name,
        operator.tier,
        operator.tier.description()
    );
    info!(
        endpoint = %source.endpoint(),
        table = %table.name(),
        entries = table.entry_count(),
        speech = speech.engine_name().unwrap_or("none"),
        "starting monitor"
    );

    let (ui_tx, mut ui_rx) = unbounded_channel();
    let (conn_tx, conn_rx) = unbounded_channel();
    let worker = ConnectionWorker::new(
        source,
        config.source.node_id.clone(),
        config.source.publishing_interval(),
        conn_rx,
        ui_tx.clone(),
    );
    let worker_handle = tokio::spawn(worker.run());

    let mut session = Session::new(
        operator.user_id.clone(),
        operator.tier,
        table,
        config.pacing.clone(),
        speech,
        Box::new(ConsoleDisplay),
        ui_tx.clone(),
    )
    .with_connection(conn_tx.clone())
    .with_metrics(metrics.clone())
    .with_watchdog_interval(config.watchdog_interval())
    .exit_when_done(opts.exit_when_done);

    if opts.console {
        println!("{}", console::HELP);
        console::spawn_console(ui_tx.clone()).context("starting console reader")?;
    }
    let quit_tx = ui_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = quit_tx.send(UiEvent::Command(OperatorCommand::Quit));
        }
    });
    if opts.auto_start {
        let _ = conn_tx.send(ConnectionCommand::Connect);
        let _ = conn_tx.send(ConnectionCommand::StartMonitoring);
    }

    session.run(&mut ui_rx).await;

    let _ = conn_tx.send(ConnectionCommand::Shutdown);
    if let Err(e) = worker_handle.await {
        error!(error = %e, "connection worker panicked");
    }
    if opts.print_metrics {
        print!("{}", metrics.encode_text());
    }
    Ok(())
}

fn narrate(
    config: &MonitorConfig,
    tier: VerbosityTier,
    shape: u8,
    replay: Option<&Path>,
) -> Result<()> {
    let table = Arc::new(load_table(config)?);
    let values: Vec<RawPointerValue> = match replay {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading recording: {}", path.display()))?;
            ReplaySource::parse_recording(&raw)
        }
        None => pick_and_place_script(shape)
            .into_iter()
            .map(RawPointerValue::from)
            .collect(),
    };

    let mut tracker = LineTracker::new(table);
    for value in &values {
        let decoded = match decode_pointer(value) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("skipping value: {e}");
                continue;
            }
        };
        let Some(event) = decoded.into_event() else {
            continue;
        };
        if let Some(text) = tracker.resolve(event.line, tier) {
            println!("{:>4}  {}/{}  {text}", event.line, event.module, event.routine);
        }
    }
    Ok(())
}

fn say(config: &MonitorConfig, text: &str) -> Result<()> {
    let speech = SpeechManager::from_config(&config.speech);
    let (tx, rx) = std::sync::mpsc::channel();
    speech.speak(text, move || {
        let _ = tx.send(());
    });
    rx.recv_timeout(Duration::from_secs(120))
        .context("speech did not finish")?;
    Ok(())
}

fn build_source(cfg: &SourceConfig) -> Result<Box<dyn PointerSource>> {
    match cfg.kind {
        SourceKind::Mock => Ok(Box::new(
            MockSource::pick_and_place(&cfg.endpoint, cfg.shape)
                .with_step(cfg.step())
                .with_repeats(cfg.repeats),
        )),
        SourceKind::Replay => {
            let path = cfg
                .replay_path
                .as_ref()
                .context("replay source needs a recording (--replay or source.replay_path)")?;
            Ok(Box::new(ReplaySource::new(path).with_step(cfg.step())))
        }
    }
}

fn load_table(config: &MonitorConfig) -> Result<NarrationTable> {
    match &config.narration_table {
        Some(path) => load_table_file(path),
        None => NarrationTable::builtin(),
    }
}

fn load_credentials(config: &MonitorConfig) -> Result<CredentialStore> {
    match &config.credentials {
        Some(path) => load_credentials_file(path),
        None => CredentialStore::builtin(),
    }
}

fn login(
    credentials: &CredentialStore,
    user: Option<String>,
    password: Option<String>,
    level: Option<VerbosityTier>,
) -> Result<Operator> {
    let user = match user {
        Some(u) => u,
        None => prompt("User ID: ")?,
    };
    let password = match password {
        Some(p) => p,
        None => prompt("Password: ")?,
    };
    let level = match level {
        Some(l) => l,
        None => prompt("User level (1-3): ")?
            .parse()
            .map_err(|e| anyhow!("{e}"))?,
    };
    credentials
        .login(&user, &password, level)
        .map_err(|e| anyhow!("login failed: {e}"))
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line).context("reading from stdin")?;
    Ok(line.trim().to_string())
}

fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();
}
