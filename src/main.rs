use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use connect_four::config::{AppConfig, LoggingConfig, StoreBackend};
use connect_four::session::GameController;
use connect_four::store;
use connect_four::ui::App;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Play Connect Four; the game is saved after every move.
#[derive(Parser)]
#[command(name = "connect-four", about = "Play Connect Four with a resumable saved game")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "connect-four.toml")]
    config: PathBuf,

    /// Keep the game in memory only (nothing is written to disk)
    #[arg(long)]
    memory: bool,

    /// Print the default configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let loaded = AppConfig::load_if_present(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let config_found = loaded.is_some();
    let mut config = loaded.unwrap_or_default();
    if cli.memory {
        config.persistence.backend = StoreBackend::Memory;
    }

    let _log_guard = init_logging(&config.logging)?;
    if !config_found {
        tracing::warn!(
            "Config file '{}' not found, using defaults",
            cli.config.display()
        );
    }
    tracing::info!(
        "Starting with {:?} store, document '{}'",
        config.persistence.backend,
        config.persistence.document_key
    );

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let store = store::open(&config.persistence);
    let controller = runtime.block_on(async {
        GameController::new(
            store,
            config.rules(),
            config.persistence.document_key.clone(),
            config.persistence.mode,
        )
    });
    let session = runtime.block_on(controller.initialize());

    let mut app = App::new(runtime.handle().clone(), controller, session);
    let res = run_terminal(&mut app);

    let controller = app.into_controller();
    if let Err(e) = runtime.block_on(controller.flush()) {
        tracing::warn!("Last game state may not be saved: {}", e);
        eprintln!("Warning: last game state may not be saved: {e}");
    }

    res.context("terminal UI failed")
}

fn run_terminal(app: &mut App) -> io::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = app.run(&mut terminal);

    // Restore terminal even if the app loop failed
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();

    res
}

/// Send logs to the configured file so they do not draw over the TUI.
/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let dir = config
        .file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = config
        .file
        .file_name()
        .context("logging.file must name a file")?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("invalid logging.level")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}
