//! CLI entrypoint and subcommand orchestration.

mod config;
mod connectivity;
#[cfg(test)]
mod test_support;
mod tui;

use clap::{Parser, Subcommand};
use proto::{ModelProfile, SessionError, SessionEvent};
use session::QuotaLedger;

#[cfg(not(test))]
use std::sync::Arc;

#[cfg(not(test))]
use config::Config;
#[cfg(not(test))]
use connectivity::ConnectivityProbe;
#[cfg(not(test))]
use session::{
    GithubModelsProvider, MemoryStore, PreferenceStore, SessionConfiguration, SessionController,
    SqliteStore,
};
#[cfg(not(test))]
use tracing::{info, warn};
#[cfg(not(test))]
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Top-level command-line arguments for the incognito application.
#[derive(Parser)]
#[command(name = "incognito")]
#[command(about = "Private terminal chat over GitHub Models", version)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable debug logging to ~/.incognito/logs/debug.log
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Keep preferences and quota counters in memory only
    #[arg(long, default_value_t = false)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// CLI subcommands available in the application.
#[derive(Subcommand)]
enum Commands {
    /// Start the full-screen chat (default when no subcommand is given)
    Tui,

    /// Send a single message and print the reply
    Run {
        /// Message to send
        #[arg(short = 'e', long)]
        exec: String,

        /// Model id to use for this message
        #[arg(short = 'm', long)]
        model: Option<String>,
    },

    /// Show today's remaining requests per model
    Quota,

    /// List the model catalog
    Models,
}

/// Preference store selected for this run.
#[cfg(not(test))]
enum Store {
    Sqlite(Arc<SqliteStore>),
    Memory(Arc<MemoryStore>),
}

#[cfg(not(test))]
impl Store {
    async fn open(config: &Config, ephemeral: bool) -> anyhow::Result<Self> {
        if ephemeral {
            return Ok(Store::Memory(Arc::new(MemoryStore::new())));
        }
        let store = SqliteStore::open(&config.database.url).await?;
        Ok(Store::Sqlite(Arc::new(store)))
    }

    fn port(&self) -> Arc<dyn PreferenceStore> {
        match self {
            Store::Sqlite(store) => store.clone() as Arc<dyn PreferenceStore>,
            Store::Memory(store) => store.clone() as Arc<dyn PreferenceStore>,
        }
    }

    /// Waits for pending writes to reach disk.
    async fn flush(&self) {
        if let Store::Sqlite(store) = self
            && let Err(e) = store.flush().await
        {
            warn!("Failed to flush preferences: {e}");
        }
    }
}

#[cfg(not(test))]
#[tokio::main]
/// Program entrypoint.
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Commands::Tui);
    let is_tui = matches!(command, Commands::Tui);

    // Initialize tracing. Console output is suppressed in TUI mode.
    // When --debug is passed, write debug-level logs to ~/.incognito/logs/debug.YYYY-MM-DD.log
    // using daily rotation so logs accumulate across sessions.
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    // WorkerGuard must outlive main() so buffered file writes are flushed on exit.
    let _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>;

    let debug_writer = if cli.debug {
        let log_dir = config::home_dir().join("logs");
        std::fs::create_dir_all(&log_dir).ok();
        let appender = tracing_appender::rolling::daily(&log_dir, "debug.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        _file_guard = Some(guard);
        Some(writer)
    } else {
        _file_guard = None;
        None
    };

    match (is_tui, debug_writer) {
        (true, Some(writer)) => {
            let console = fmt::layer()
                .with_writer(std::io::sink)
                .with_target(false)
                .with_filter(console_filter);
            let file = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .with_filter(EnvFilter::new(
                    "debug,hyper_util=info,rustls=info,reqwest=info,sqlx=info",
                ));
            tracing_subscriber::registry()
                .with(console)
                .with(file)
                .init();
        }
        (true, None) => {
            fmt()
                .with_env_filter(console_filter)
                .with_writer(std::io::sink)
                .with_target(false)
                .init();
        }
        (false, Some(writer)) => {
            let console = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter);
            let file = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .with_filter(EnvFilter::new(
                    "debug,hyper_util=info,rustls=info,reqwest=info,sqlx=info",
                ));
            tracing_subscriber::registry()
                .with(console)
                .with(file)
                .init();
        }
        (false, None) => {
            fmt()
                .with_env_filter(console_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
    }

    if cli.debug {
        let cmd_label = match &command {
            Commands::Tui => "tui",
            Commands::Run { .. } => "run",
            Commands::Quota => "quota",
            Commands::Models => "models",
        };
        info!(
            version = env!("CARGO_PKG_VERSION"),
            command = cmd_label,
            log_level = %cli.log_level,
            "========== incognito session start =========="
        );
    }

    let config = Config::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!("Failed to load config ({e}), using defaults");
        Config::default()
    });

    match command {
        Commands::Tui => cmd_tui(config, cli.ephemeral).await,
        Commands::Run { exec, model } => cmd_run(config, cli.ephemeral, exec, model).await,
        Commands::Quota => cmd_quota(config, cli.ephemeral).await,
        Commands::Models => cmd_models(config),
    }
}

#[cfg(not(test))]
/// Builds the session controller over the given store.
fn build_controller(
    config: &Config,
    session_config: SessionConfiguration,
    store: Arc<dyn PreferenceStore>,
) -> SessionController {
    if config.api.token.is_empty() {
        warn!("No API token configured; set INCOGNITO_TOKEN or GITHUB_TOKEN");
    }
    let provider = Arc::new(
        GithubModelsProvider::with_endpoint(&config.api.token, &config.api.endpoint)
            .with_decode_grace(config.decode_grace()),
    );
    SessionController::new(session_config, store, provider)
}

#[cfg(not(test))]
/// Starts the full-screen chat.
async fn cmd_tui(config: Config, ephemeral: bool) -> anyhow::Result<()> {
    let store = Store::open(&config, ephemeral).await?;
    let port = store.port();
    let controller = build_controller(&config, config.session_configuration(port.as_ref()), port);

    let probe = if config.connectivity.enabled {
        match ConnectivityProbe::from_endpoint(&config.api.endpoint, &config.connectivity) {
            Ok(probe) => Some(probe.spawn()),
            Err(e) => {
                warn!("Connectivity probe disabled: {e}");
                None
            }
        }
    } else {
        None
    };
    let (online_rx, probe_task) = match probe {
        Some((rx, task)) => (Some(rx), Some(task)),
        None => (None, None),
    };

    let result = tui::run_tui(controller, online_rx).await;

    if let Some(task) = probe_task {
        task.abort();
    }
    store.flush().await;
    result
}

#[cfg(not(test))]
/// Sends one message, prints the revealed reply, and exits.
async fn cmd_run(
    config: Config,
    ephemeral: bool,
    exec: String,
    model: Option<String>,
) -> anyhow::Result<()> {
    let store = Store::open(&config, ephemeral).await?;
    let port = store.port();
    let session_config = config
        .run_configuration(port.as_ref(), model.as_deref())
        .map_err(proto::Error::from)?;
    let mut controller = build_controller(&config, session_config, port);
    let (_, mut events) = controller.subscribe();

    println!("{}", format_run_header(&exec, controller.active_model()));

    let exchange = controller.submit_text(&exec);
    if let Ok(Some(exchange)) = exchange {
        let completion = exchange.run().await;
        controller.complete(completion);
        while controller.tick_reveal().is_some() {}
    }
    store.flush().await;

    run_result(drain_notices(&mut events))?;

    if let Some(reply) = controller.timeline().last_assistant() {
        println!("{}", reply.content);
    }
    println!(
        "{}",
        format_quota_line(controller.ledger(), controller.active_model())
    );
    Ok(())
}

#[cfg(not(test))]
/// Prints today's remaining requests for every catalog model.
async fn cmd_quota(config: Config, ephemeral: bool) -> anyhow::Result<()> {
    let store = Store::open(&config, ephemeral).await?;
    let ledger = QuotaLedger::new(store.port());
    for profile in &config.models {
        println!("{}", format_quota_line(&ledger, profile));
    }
    Ok(())
}

#[cfg(not(test))]
/// Lists the model catalog, marking the configured model.
fn cmd_models(config: Config) -> anyhow::Result<()> {
    let active = config
        .active_profile()
        .map(|profile| profile.id.clone())
        .unwrap_or_default();
    for profile in &config.models {
        println!("{}", format_model_line(profile, profile.id == active));
    }
    Ok(())
}

/// Collects the notices emitted so far.
fn drain_notices(
    events: &mut tokio::sync::mpsc::UnboundedReceiver<SessionEvent>,
) -> Vec<SessionError> {
    std::iter::from_fn(|| events.try_recv().ok())
        .filter_map(|event| match event {
            SessionEvent::Notice(err) => Some(err),
            _ => None,
        })
        .collect()
}

/// A one-shot run fails with its first notice.
fn run_result(notices: Vec<SessionError>) -> proto::Result<()> {
    match notices.into_iter().next() {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

/// Formats run mode header text.
fn format_run_header(exec: &str, model: &ModelProfile) -> String {
    format!("[{}] {exec}", model.title)
}

/// `title (id): remaining/limit left today`
fn format_quota_line(ledger: &QuotaLedger, profile: &ModelProfile) -> String {
    format!(
        "{} ({}): {}/{} left today",
        profile.title,
        profile.id,
        ledger.remaining(profile),
        profile.daily_limit
    )
}

/// One catalog row; `*` marks the configured model.
fn format_model_line(profile: &ModelProfile, active: bool) -> String {
    let marker = if active { "*" } else { " " };
    format!(
        "{marker} {:<40} {:<28} {:>4}/day",
        profile.id, profile.title, profile.daily_limit
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proto::default_catalog;
    use session::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn format_run_header_embeds_model_and_text() {
        let catalog = default_catalog();
        assert_eq!(
            format_run_header("hello", &catalog[0]),
            "[OpenAI GPT-4o-mini] hello"
        );
    }

    #[test]
    fn format_quota_line_reports_remaining() {
        let ledger = QuotaLedger::new(Arc::new(MemoryStore::new()));
        let grok = ModelProfile::new("xai/grok-3-mini", "X Grok 3 Mini", 30);
        ledger.register_request(&grok.id);
        assert_eq!(
            format_quota_line(&ledger, &grok),
            "X Grok 3 Mini (xai/grok-3-mini): 29/30 left today"
        );
    }

    #[test]
    fn format_model_line_marks_active() {
        let catalog = default_catalog();
        assert!(format_model_line(&catalog[0], true).starts_with("* openai/gpt-4o-mini"));
        assert!(format_model_line(&catalog[1], false).starts_with("  openai/gpt-4.1-mini"));
        assert!(format_model_line(&catalog[3], false).ends_with("30/day"));
    }

    #[test]
    fn drain_notices_keeps_only_notices() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.send(SessionEvent::SendAvailabilityChanged(false)).unwrap();
        tx.send(SessionEvent::Notice(SessionError::EmptyReply)).unwrap();
        tx.send(SessionEvent::TimelineCleared).unwrap();
        assert_eq!(drain_notices(&mut rx), vec![SessionError::EmptyReply]);
    }

    #[test]
    fn run_result_fails_with_first_notice() {
        assert!(run_result(Vec::new()).is_ok());

        let err = run_result(vec![
            SessionError::NetworkUnavailable,
            SessionError::EmptyReply,
        ])
        .expect_err("notice fails the run");
        assert!(matches!(
            err,
            proto::Error::Session(SessionError::NetworkUnavailable)
        ));
        assert_eq!(err.to_string(), "No network connection");
    }

    #[test]
    fn cli_parses_run_with_model() {
        let cli = Cli::try_parse_from([
            "incognito",
            "--ephemeral",
            "run",
            "-e",
            "hi there",
            "-m",
            "xai/grok-3-mini",
        ])
        .expect("parse");
        assert!(cli.ephemeral);
        match cli.command {
            Some(Commands::Run { exec, model }) => {
                assert_eq!(exec, "hi there");
                assert_eq!(model.as_deref(), Some("xai/grok-3-mini"));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn cli_defaults_to_tui() {
        let cli = Cli::try_parse_from(["incognito"]).expect("parse");
        assert!(cli.command.is_none());
        assert!(!cli.ephemeral);
    }
}
