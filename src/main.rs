use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use iss_tui::app::{App, ViewMode};
use iss_tui::config::{Config, Overrides, Settings};
use iss_tui::telemetry::{fetch_latest, HttpSource, IssSample, Poller};
use iss_tui::{data, format, ui};
use log::{info, LevelFilter};
use ratatui::layout::Rect;
use ratatui::DefaultTerminal;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "iss-tui")]
#[command(about = "Track the International Space Station in the terminal")]
#[command(version)]
struct Cli {
    /// Settings file (default: <config dir>/iss-tui/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Telemetry endpoint returning {"last_row": {...}}
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Poll interval in milliseconds
    #[arg(long, value_name = "MS")]
    interval: Option<u64>,

    /// Request timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout: Option<u64>,

    /// Initial view
    #[arg(long, value_enum)]
    view: Option<ViewMode>,

    /// Do not recenter the view on new samples
    #[arg(long)]
    no_follow: bool,

    /// Directory with Natural Earth GeoJSON files
    #[arg(long, value_name = "DIR")]
    data: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Write logs to this file while the TUI is running
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch one sample, print it and exit
    Fetch,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            endpoint: self.endpoint.clone(),
            poll_interval_ms: self.interval,
            request_timeout_ms: self.timeout,
            view: self.view,
            no_follow: self.no_follow,
            data_dir: self.data.clone(),
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let settings = Settings::load(cli.config.as_deref())?;
    let config = Config::resolve(settings, cli.overrides())?;
    info!("starting iss-tui v{} against {}", env!("CARGO_PKG_VERSION"), config.endpoint);

    match cli.command {
        Some(Command::Fetch) => Ok(fetch_once(&config)),
        None => {
            run_tui(config)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Verbosity from `-v`, `RUST_LOG` overriding. The TUI owns the terminal, so
/// its logs go to `--log-file` or nowhere; `fetch` logs to stderr.
fn init_logging(cli: &Cli) -> Result<()> {
    logger(cli)?.init();
    Ok(())
}

fn logger(cli: &Cli) -> Result<env_logger::Builder> {
    let tui = cli.command.is_none();
    if tui && cli.log_file.is_none() {
        // Not from_env: a RUST_LOG directive would still reach stderr
        let mut builder = env_logger::Builder::new();
        builder.filter_level(LevelFilter::Off);
        return Ok(builder);
    }

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));

    if let (true, Some(path)) = (tui, &cli.log_file) {
        let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    Ok(builder)
}

fn fetch_once(config: &Config) -> ExitCode {
    let mut source = HttpSource::new(config.endpoint.clone(), config.request_timeout);
    match fetch_latest(&mut source) {
        Some(sample) => {
            print!("{}", describe(&sample));
            ExitCode::SUCCESS
        }
        None => {
            println!("loading");
            ExitCode::FAILURE
        }
    }
}

/// Plain-text block for the `fetch` command
fn describe(sample: &IssSample) -> String {
    format!(
        "Latitude: {}\nLongitude: {}\nAltitude: {} km\nVelocity: {} km/h\nTimestamp: {}\nLocal time: {}\n",
        format::number(Some(sample.latitude), 4),
        format::number(Some(sample.longitude), 4),
        format::number(Some(sample.altitude), 2),
        format::number(sample.velocity, 1),
        format::timestamp(sample.timestamp),
        format::local_time(sample.timestamp),
    )
}

fn run_tui(config: Config) -> Result<()> {
    let mut app = App::new(&config, Instant::now());
    data::prepare_map(&mut app.map_renderer, &config.data_dir);

    let source = HttpSource::new(config.endpoint.clone(), config.request_timeout);
    let poller = Poller::spawn(source, config.poll_interval);

    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, &mut app, &poller);

    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();
    poller.shutdown();

    result
}

/// Handle mouse events: selection bar clicks, drag to pan, wheel to zoom
fn handle_mouse(app: &mut App, mouse: MouseEvent, screen: Rect) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        MouseEventKind::Down(MouseButton::Left) => {
            let bar = ui::layout(screen, app.mode).bar;
            if let Some(mode) = ui::selection_hit(bar, mouse.column, mouse.row) {
                app.select_view(mode);
            } else if app.view_area().contains((mouse.column, mouse.row).into()) {
                app.begin_drag(mouse.column, mouse.row);
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => app.handle_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.end_drag(mouse.column, mouse.row),
        _ => {}
    }
}

fn handle_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),

        // Pan the map or rotate the globe
        KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
        KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
        KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
        KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

        KeyCode::Char('1') => app.select_view(ViewMode::Globe),
        KeyCode::Char('2') => app.select_view(ViewMode::Map),
        KeyCode::Tab => app.toggle_view(),

        KeyCode::Char('f') | KeyCode::Char('F') => app.toggle_follow(),
        KeyCode::Char('g') | KeyCode::Char('G') => app.map_renderer.toggle_graticule(),
        KeyCode::Char('b') | KeyCode::Char('B') => app.map_renderer.toggle_borders(),
        KeyCode::Char('p') | KeyCode::Char('P') => app.ticker.toggle_pause(),
        KeyCode::Char('n') | KeyCode::Char('N') => app.ticker.advance(),
        KeyCode::Char('r') | KeyCode::Char('0') => app.reset_view(),
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, app: &mut App, poller: &Poller) -> Result<()> {
    loop {
        for event in poller.drain() {
            app.apply(event);
        }
        app.tick(Instant::now());

        terminal.draw(|frame| ui::render(frame, app))?;

        // ~60fps
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key.code),
                Event::Mouse(mouse) => {
                    let size = terminal.size()?;
                    handle_mouse(app, mouse, Rect::new(0, 0, size.width, size.height));
                }
                _ => {}
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_sample() {
        let sample = IssSample {
            latitude: 51.64321,
            longitude: -12.25,
            altitude: 418.944,
            velocity: Some(27_580.44),
            timestamp: Some(1_700_000_000.0),
            fetched_at: None,
        };
        let text = describe(&sample);
        assert!(text.starts_with("Latitude: 51.6432\nLongitude: -12.25\nAltitude: 418.94 km\n"));
        assert!(text.contains("Velocity: 27,580.4 km/h\n"));
        assert!(text.contains("Timestamp: 1700000000\n"));
    }

    #[test]
    fn test_tui_without_log_file_ignores_rust_log() {
        std::env::set_var("RUST_LOG", "iss_tui=debug");
        let cli = Cli::parse_from(["iss-tui", "-vvv"]);
        assert_eq!(logger(&cli).unwrap().build().filter(), LevelFilter::Off);

        let cli = Cli::parse_from(["iss-tui", "fetch"]);
        assert_eq!(logger(&cli).unwrap().build().filter(), LevelFilter::Debug);
        std::env::remove_var("RUST_LOG");
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from(["iss-tui", "--interval", "500", "--view", "map", "--no-follow"]);
        let overrides = cli.overrides();
        assert_eq!(overrides.poll_interval_ms, Some(500));
        assert_eq!(overrides.view, Some(ViewMode::Map));
        assert!(overrides.no_follow);
        assert!(cli.command.is_none());

        let cli = Cli::parse_from(["iss-tui", "-vv", "fetch"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Some(Command::Fetch)));
    }
}
