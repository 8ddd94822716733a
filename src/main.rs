use std::fs::File;
use std::io::stdout;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{LevelFilter, error, info};
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{Config, WriteLogger};

use pagenote::event_source::KeyboardEventSource;
use pagenote::notes::SessionStore;
use pagenote::panic_handler::initialize_panic_handler;
use pagenote::pdf::{DocumentSource, RenderService, default_engine};
use pagenote::{App, Viewer, run_app_with_event_source, sample, settings};

/// Terminal PDF viewer with per-page session notes
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// PDF to open instead of the configured default document
    file: Option<PathBuf>,

    /// Settings file (default: <config dir>/pagenote/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep notes in this directory instead of a throwaway one
    /// (also read from PAGENOTE_SESSION_DIR)
    #[arg(long)]
    session_dir: Option<PathBuf>,

    /// Directory exported notes are written to
    #[arg(long)]
    export_dir: Option<PathBuf>,

    #[arg(long, default_value = "pagenote.log")]
    log_file: PathBuf,

    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let args = Args::parse();

    WriteLogger::init(
        args.log_level,
        Config::default(),
        File::create(&args.log_file)
            .with_context(|| format!("Failed to create log file {}", args.log_file.display()))?,
    )?;
    initialize_panic_handler();

    info!("Starting pagenote");
    settings::load_settings(args.config.as_deref());
    let config = settings::get_settings();

    let default_source = args
        .file
        .clone()
        .or_else(settings::get_default_document)
        .map(DocumentSource::Path)
        .unwrap_or_else(sample::sample_source);

    let store = SessionStore::resolve(args.session_dir.as_deref())?;
    info!(
        "Notes kept in {} ({})",
        store.root().display(),
        if store.is_ephemeral() {
            "this session only"
        } else {
            "persistent"
        }
    );

    let service = RenderService::with_config(
        default_engine(),
        config.zoom(),
        config.density(),
        config.cache_size,
    );
    let mut viewer = Viewer::new(service, store, default_source);
    viewer.open_default();

    let export_dir = match args.export_dir.or_else(settings::get_export_dir) {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    let mut app = App::new(viewer, settings::is_notes_panel_shown(), export_dir);

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app_with_event_source(&mut terminal, &mut app, &mut KeyboardEventSource);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("Application error: {err:?}");
        println!("{err:?}");
    }

    info!("Shutting down pagenote");
    Ok(())
}
