/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Interactive TUI browser for a remote directory information tree.
//!
//! Shows the directory as a navigable tree backed by
//! [`dit_browser::RootController`]. Nothing is fetched until the user
//! opens it: expanding an entry fetches one page of its children, and
//! large child sets page behind "Previous/Next Page" rows. Selecting
//! an entry shows its attributes on the right pane.
//!
//! Fetches run in the background; their completions are applied on
//! the event loop alongside keypresses, so the UI never blocks on the
//! network.
//!
//! ```bash
//! # Against a directory gateway, starting at the Root DSE
//! dit_tui --addr 127.0.0.1:8389
//!
//! # Starting beneath a base DN, 50 children per page, logging to a file
//! dit_tui --addr 127.0.0.1:8389 --base-dn dc=example,dc=com --page-size 50 --log-file /tmp/dit.log
//!
//! # Built-in sample directory, with simulated network latency
//! dit_tui --demo --demo-latency-ms 300
//! ```

mod actions;
mod app;
mod client;
mod model;
mod render;
mod theme;

use std::io;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

pub(crate) use actions::*;
use anyhow::Context;
pub(crate) use app::*;
use clap::Parser;
use crossterm::ExecutableCommand;
use crossterm::terminal::EnterAlternateScreen;
use crossterm::terminal::LeaveAlternateScreen;
use crossterm::terminal::disable_raw_mode;
use crossterm::terminal::enable_raw_mode;
use dit_browser::BrowserConfig;
use dit_browser::DirectoryService;
use dit_browser::Dn;
use dit_browser::RootController;
use dit_browser::memory::sample_directory;
use indicatif::ProgressBar;
use indicatif::ProgressStyle;
pub(crate) use model::*;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
pub(crate) use theme::*;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::client::HttpDirectory;

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "dit_browser=info";

// Terminal setup / teardown

/// Put the terminal into "TUI mode".
///
/// Enables raw mode, switches to the alternate screen, and clears it,
/// returning a `ratatui::Terminal` backed by crossterm.
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

/// Restore the terminal back to normal "shell mode".
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Send `tracing` output to `path`. The terminal belongs to the UI,
/// so without a log file nothing is installed.
fn init_logging(path: &Path) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();
    Ok(())
}

/// Environment configuration with CLI overrides applied.
fn browser_config(args: &Args) -> anyhow::Result<BrowserConfig> {
    let mut config = BrowserConfig::from_env()?;
    if let Some(page_size) = args.page_size {
        config.page_size = page_size;
    }
    if let Some(connection_id) = &args.connection_id {
        config.connection_id = connection_id.clone();
    }
    if args.private {
        config.include_private_naming_contexts = true;
    }
    config.validate()?;
    Ok(config)
}

/// The service to browse and a description of it for the header.
fn directory_service(args: &Args) -> anyhow::Result<(Arc<dyn DirectoryService>, String)> {
    if args.demo {
        let sample = sample_directory();
        sample.set_latency(args.demo_latency_ms.map(Duration::from_millis));
        return Ok((Arc::new(sample), Labels::en().demo_source.to_string()));
    }
    let addr = args
        .addr
        .as_deref()
        .context("--addr is required unless --demo is given")?;
    let http = HttpDirectory::connect(addr)?;
    let source = http.base_url().to_string();
    Ok((Arc::new(http), source))
}

/// Build the app and start the first load.
fn build_app(args: &Args) -> anyhow::Result<App> {
    let config = browser_config(args)?;
    let include_private = config.include_private_naming_contexts;
    let (service, source) = directory_service(args)?;

    let mut controller = RootController::new(service, config);
    match &args.base_dn {
        Some(base) => controller.load_roots(Dn::new(base.as_str())),
        None => controller.load_root_with_naming_contexts(include_private),
    }
    Ok(App::new(source, controller, args.theme))
}

/// Apply completions until the first load has landed.
async fn await_initial_load(app: &mut App) {
    while app.controller.in_flight() > 0 {
        match app.controller.next_completion().await {
            Some(completion) => {
                app.on_completion(completion);
            }
            None => break,
        }
    }
}

// Main loop

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if !io::stdout().is_terminal() {
        eprintln!("This TUI requires a real terminal.");
        return Ok(());
    }

    if let Some(path) = &args.log_file {
        init_logging(path)?;
    }

    let mut app = build_app(&args)?;

    // Spinner on stderr while the first load is in flight. Runs
    // before the alternate screen so it shows as a normal terminal
    // line.
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .expect("valid template"),
    );
    spinner.set_message(format!("dit-browser: loading {} ...", app.source));
    spinner.enable_steady_tick(Duration::from_millis(80));
    await_initial_load(&mut app).await;
    spinner.finish_and_clear();

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, app).await;
    restore_terminal(&mut terminal)?;
    Ok(result?)
}

#[cfg(test)]
mod tests;
