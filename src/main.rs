mod app;
mod config;
mod form;
mod theme;
mod ui;
mod verify;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use app::App;
use config::AppConfig;
use verify::{HttpVerifier, Verifier};

/// How long the TUI waits on the startup health probe before drawing anyway
const STARTUP_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Parser, Debug)]
#[command(name = "titlecheck")]
#[command(author = "Sean Fournier")]
#[command(version = "0.1.0")]
#[command(about = "Check titles against a verification service from the terminal")]
struct Args {
    /// Base URL of the verification service (overrides config)
    #[arg(short, long)]
    server: Option<String>,

    /// Request timeout in seconds (overrides config; default is no timeout)
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Verify a single title and print the verdict as JSON
    #[arg(short, long, value_name = "TITLE")]
    check: Option<String>,

    /// Probe the service health endpoint and print the result as JSON
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let tui = args.check.is_none() && !args.health;

    // Initialize logging
    init_logging(tui);

    let mut config = AppConfig::load().unwrap_or_default();
    if let Some(server) = args.server {
        config.server_url = server;
    }
    if let Some(secs) = args.timeout {
        config.timeout_secs = Some(secs);
    }

    let verifier = HttpVerifier::new(&config.server_url, config.timeout())?;

    // Handle CLI-only commands
    if let Some(title) = args.check {
        return print_verdict(&verifier, &title).await;
    }

    if args.health {
        return print_health(&verifier).await;
    }

    // Run TUI
    run_tui(verifier, config).await
}

/// Stderr for one-shot commands; a log file for the TUI so output never lands on the screen
fn init_logging(tui: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("titlecheck=info"));

    if tui {
        if let Some(file) = open_log_file() {
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .with(filter)
                .init();
        }
        // No log file means no logging; stderr would garble the alternate screen
        return;
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn open_log_file() -> Option<std::fs::File> {
    let dir = dirs::cache_dir()?.join("titlecheck");
    std::fs::create_dir_all(&dir).ok()?;
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("titlecheck.log"))
        .ok()
}

async fn print_verdict(verifier: &HttpVerifier, title: &str) -> Result<()> {
    // Same collapse as the form: any failure becomes the generic negative verdict
    let (state, title) = form::FormState::default()
        .update_query(title)
        .begin_submit()?;
    let state = state.settle(verifier.verify(&title).await);

    let result = state
        .result
        .context("verification settled without a result")?;
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

async fn print_health(verifier: &HttpVerifier) -> Result<()> {
    let status = verifier.health().await;

    let detail = match &status {
        verify::HealthStatus::Healthy => None,
        verify::HealthStatus::Degraded(d) | verify::HealthStatus::Unreachable(d) => Some(d.as_str()),
    };
    let output = serde_json::json!({
        "server": verifier.base_url(),
        "status": status.label(),
        "healthy": status.is_healthy(),
        "detail": detail,
    });
    println!("{}", serde_json::to_string(&output)?);

    if !status.is_healthy() {
        anyhow::bail!("verification service at {} is {}", verifier.base_url(), status.label());
    }
    Ok(())
}

async fn run_tui(verifier: HttpVerifier, config: AppConfig) -> Result<()> {
    ui::init_theme(theme::Theme::from_config(&config.theme));

    let health = tokio::time::timeout(STARTUP_PROBE_TIMEOUT, verifier.health())
        .await
        .unwrap_or_else(|_| verify::HealthStatus::Unreachable("health probe timed out".to_string()));
    tracing::info!("Service {} is {}", config.server_url, health.label());

    let verifier: Arc<dyn Verifier> = Arc::new(verifier);
    let mut app = App::new(verifier, config.server_url.clone(), config.notifications);
    app.health = Some(health);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Esc if !app.show_help => return Ok(()),
                        KeyCode::Char('c') if key.modifiers.contains(event::KeyModifiers::CONTROL) => {
                            return Ok(())
                        }
                        _ => app.handle_key(key),
                    }
                }
            }
        }

        // Picks up a settled request, expires status messages
        app.tick();
    }
}
