mod app;
mod args;
mod braille;
mod data;
mod error;
mod geo;
mod map;
mod model;
mod query;
mod session;
mod ui;

use anyhow::{Context, Result};
use app::App;
use args::Args;
use clap::Parser;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind};
use crossterm::execute;
use map::LineString;
use ratatui::DefaultTerminal;
use std::fs::File;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let (cities, routes) = args.sources()?;
    let basemap = load_basemap(&args);

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = (|| {
        let size = terminal.size()?;
        let mut app = App::new(size.width, size.height, &args, cities, routes, basemap);
        run(&mut terminal, &mut app)
    })();

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    if let Err(e) = &result {
        tracing::error!("exiting with error: {e:#}");
    }
    result
}

/// Log to a file: stdout belongs to the terminal UI
fn init_logging(args: &Args) -> Result<()> {
    let file = File::create(&args.log_file)
        .with_context(|| format!("cannot create log file {}", args.log_file.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("safemap=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "safemap starting");
    Ok(())
}

/// GeoJSON basemap if one was given and loads, else the built-in outline
fn load_basemap(args: &Args) -> Vec<LineString> {
    if let Some(path) = &args.basemap {
        match data::load_basemap(path) {
            Ok(lines) if !lines.is_empty() => return lines,
            Ok(_) => tracing::warn!(path = %path.display(), "basemap has no drawable geometry"),
            Err(e) => tracing::warn!(path = %path.display(), "failed to load basemap: {e:#}"),
        }
    }
    data::india_outline()
}

fn run(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    loop {
        app.update();

        // Draw
        terminal.draw(|frame| ui::render(frame, app))?;
        app.after_draw();

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                // Only handle key press events (not release)
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key),
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                Event::Resize(width, height) => app.resize(width, height),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    tracing::info!("quit");
    Ok(())
}
