use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

mod actions;
mod app;
mod config;
mod duration;
mod monitor;
mod process;

use actions::Action;
use app::App;
use config::MonitorConfig;
use monitor::Monitor;
use process::{PsProcessSource, SystemCwdResolver};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging on stderr; RUST_LOG overrides the warn default
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(
            &std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default(),
        ))
        .init();

    let config = MonitorConfig::load().context("Failed to load gmon config")?;
    let monitor = Monitor::new(PsProcessSource::new(), SystemCwdResolver::new(), &config)
        .context("Invalid session discovery settings")?;

    // Create event channel
    let (tx, mut rx) = mpsc::unbounded_channel::<Action>();

    // Initialize terminal
    let mut terminal = ratatui::init();

    // Spawn input handler
    let input_tx = tx.clone();
    tokio::spawn(async move {
        while !input_tx.is_closed() {
            if event::poll(Duration::from_millis(100)).unwrap_or(false) {
                if let Ok(Event::Key(key)) = event::read() {
                    if key.kind == KeyEventKind::Press {
                        let _ = input_tx.send(Action::KeyPress(key));
                    }
                }
            }
            tokio::task::yield_now().await;
        }
    });

    // Spawn interrupt handler
    let signal_tx = tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = signal_tx.send(Action::Quit);
        }
    });

    // Spawn refresh loop; each pass completes before the next sleep starts
    let refresh_tx = tx.clone();
    let interval = config.refresh_interval();
    tokio::spawn(async move {
        loop {
            match monitor.refresh().await {
                Ok(sessions) => {
                    let _ = refresh_tx.send(Action::SessionsUpdated(sessions));
                }
                Err(e) => {
                    tracing::debug!(error = %e, "process snapshot failed");
                    let _ = refresh_tx.send(Action::SessionsUpdated(Vec::new()));
                    let _ = refresh_tx.send(Action::Error(format!("Snapshot: {}", e)));
                }
            }
            tokio::time::sleep(interval).await;
        }
    });
    drop(tx);

    // Create app state
    let mut app = App::new(&config);

    // Main event loop
    let result = loop {
        if let Err(e) = terminal.draw(|f| app.render(f)) {
            break Err(e.into());
        }

        let Some(action) = rx.recv().await else {
            break Ok(());
        };
        match app.handle_action(action) {
            Ok(true) => break Ok(()),
            Ok(false) => {}
            Err(e) => break Err(e),
        }
    };

    // Restore terminal
    ratatui::restore();
    println!("gmon stopped");
    result
}

/// Logging filter: `directives` in `RUST_LOG` syntax, falling back to `warn`
fn log_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(directives)
}
