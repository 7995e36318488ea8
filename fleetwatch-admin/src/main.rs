//! Administrative surface for fleetwatch: weekly operator indicators and the store system check.

mod app;
mod config;
mod input;
mod report;
mod ui;

use std::{
    fs::OpenOptions,
    io::{self, Write},
    sync::{Arc, Mutex},
    time::Duration as StdDuration,
};

use anyhow::Result;
use chrono::Utc;
use chrono_tz::Tz;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event as CEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use fleetwatch_core::service::FleetwatchService;
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, fmt, fmt::writer::BoxMakeWriter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::app::App;
use crate::config::{Cli, Command, LogFormat};
use crate::input::Action;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command();
    init_tracing(&cli, command == Command::Tui)?;

    let time_zone = cli.time_zone()?;
    let gateways = cli.gateways(Utc::now(), &time_zone)?;
    let service = Arc::new(FleetwatchService::new(gateways, time_zone).with_timeout(cli.timeout()));
    info!(backend = ?cli.backend, zone = %cli.timezone, "fleetwatch admin starting");

    match command {
        Command::Tui => run_tui(service).await,
        Command::Report { format } => {
            let weekly = service.weekly_report(Utc::now()).await?;
            report::write_weekly_report(&mut io::stdout().lock(), &weekly, format)
        }
        Command::SystemCheck { format } => {
            let today = service.today(Utc::now());
            let check = service.system_check(today).await?;
            report::write_system_check(&mut io::stdout().lock(), &check, format)
        }
    }
}

// The terminal UI owns stdout, so it logs to a file; headless commands log to stderr.
fn init_tracing(cli: &Cli, interactive: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let writer = if interactive {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&cli.log_file)?;
        BoxMakeWriter::new(Mutex::new(file))
    } else {
        BoxMakeWriter::new(io::stderr)
    };

    let registry = tracing_subscriber::registry().with(filter);
    match cli.log_format {
        LogFormat::Json => registry.with(fmt::layer().json().with_writer(writer)).try_init()?,
        LogFormat::Text => registry
            .with(fmt::layer().with_ansi(!interactive).with_writer(writer))
            .try_init()?,
    }
    Ok(())
}

async fn run_tui(service: Arc<FleetwatchService<Tz>>) -> Result<()> {
    let app = App::new(service);

    // Terminal init
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run event loop
    let res = run(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    terminal.backend_mut().flush()?;

    res
}

async fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mut app: App) -> Result<()> {
    // The indicators screen opens with a fresh report.
    let mut pending = Action::RefreshReport;

    loop {
        match pending {
            Action::Quit => break,
            Action::None => {}
            Action::RefreshReport => {
                app.is_loading = true;
                terminal.draw(|frame| ui::draw(frame, &app))?;

                let result = app.service.weekly_report(Utc::now()).await;
                app.apply_report(result);
            }
            Action::RunSystemCheck => {
                app.is_loading = true;
                terminal.draw(|frame| ui::draw(frame, &app))?;

                let today = app.service.today(Utc::now());
                let result = app.service.system_check(today).await;
                app.apply_system_check(result);
            }
        }
        pending = Action::None;

        // Draw current UI
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Poll for input (non-blocking, small timeout to keep CPU low)
        if event::poll(StdDuration::from_millis(100))?
            && let CEvent::Key(key) = event::read()?
        {
            pending = input::handle_key_event(key, &mut app);
        }
    }

    Ok(())
}
