mod app;
mod config;
mod driver;
mod error;
mod export;
mod grid;
mod halfblock;
mod palette;
mod params;
mod presets;
mod simulation;
mod stats;
mod ui;

use app::{App, Focus};
use clap::Parser;
use config::AppConfig;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use driver::{CanvasSize, Simulation};
use env_logger::{Builder, Target};
use export::GifRecorder;
use log::{info, warn, LevelFilter};
use crate::palette::Palette;
use presets::PresetManager;
use rand::rngs::StdRng;
use rand::SeedableRng;
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use stats::GridStats;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "schelling-simulator")]
#[command(about = "Schelling segregation model simulation in the terminal")]
struct Args {
    /// Size of one agent in pixels (one character is 1x2 pixels)
    #[arg(long)]
    cell_size: Option<u32>,

    /// Probability that a cell starts occupied (0.15-0.95)
    #[arg(short = 'o', long)]
    occupancy: Option<f32>,

    /// Number of agent groups (2-10)
    #[arg(short = 'g', long)]
    groups: Option<u16>,

    /// Minimum share of similar neighbours (0.0-1.0)
    #[arg(short = 'p', long)]
    preference: Option<f32>,

    /// Start from a named preset
    #[arg(long)]
    preset: Option<String>,

    /// Config file to load and save (defaults to the user config directory)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// RNG seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Milliseconds between ticks
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Ticks per interval (1-20)
    #[arg(long)]
    speed: Option<usize>,

    /// Write log output to this file (the terminal UI is otherwise silent)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Run without the terminal UI and print a JSON summary
    #[arg(long)]
    headless: bool,

    /// Headless canvas width in pixels
    #[arg(long, default_value_t = 240)]
    width: u32,

    /// Headless canvas height in pixels
    #[arg(long, default_value_t = 160)]
    height: u32,

    /// Headless tick limit
    #[arg(long, default_value_t = 1000)]
    max_ticks: u64,

    /// Save a PNG of the final headless grid
    #[arg(long)]
    png: Option<PathBuf>,

    /// Record the headless run as an animated GIF
    #[arg(long)]
    gif: Option<PathBuf>,
}

fn init_logging(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = Builder::new();
    if let Some(path) = &args.log_file {
        builder
            .filter(None, LevelFilter::Info)
            .target(Target::Pipe(Box::new(File::create(path)?)));
    } else if args.headless {
        builder.filter(None, LevelFilter::Info);
    } else {
        // stderr would draw over the alternate screen
        builder.filter(None, LevelFilter::Off);
    }
    // RUST_LOG still wins over the defaults above
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
    Ok(())
}

/// Merge config file, preset and command-line overrides, in that order
fn build_config(args: &Args) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let path = args.config.clone().or_else(AppConfig::default_path);
    let mut config = match &path {
        Some(path) if path.exists() => AppConfig::load_from_file(path)?,
        _ => AppConfig::default(),
    };

    if let Some(name) = &args.preset {
        let presets = PresetManager::new();
        let preset = presets.find(name).ok_or_else(|| {
            format!(
                "Unknown preset '{}' (available: {})",
                name,
                presets.preset_names().join(", ")
            )
        })?;
        config.params = preset.params;
    }

    let params = &mut config.params;
    if let Some(cell_size) = args.cell_size {
        params.cell_size = cell_size;
    }
    if let Some(occupancy) = args.occupancy {
        params.occupancy = occupancy;
    }
    if let Some(groups) = args.groups {
        params.group_count = groups;
    }
    if let Some(preference) = args.preference {
        params.preference = preference;
    }
    params.validate()?;
    let adjusted = config.ranges.clamped_fields(&config.params);
    if !adjusted.is_empty() {
        let clamped = config.ranges.clamp(&config.params);
        warn!(
            "Adjusted {} to fit the slider ranges: {:?} -> {:?}",
            adjusted.join(", "),
            config.params,
            clamped
        );
        config.params = clamped;
    }

    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(tick_ms) = args.tick_ms {
        config.tick_ms = tick_ms;
    }
    if let Some(speed) = args.speed {
        config.ticks_per_frame = speed;
    }
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args)?;
    let config = build_config(&args)?;

    if args.headless {
        return run_headless(&args, &config);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let size = terminal.size()?;
    let (canvas_width, canvas_height) =
        ui::get_canvas_size(Rect::new(0, 0, size.width, size.height), false);
    let mut app = App::new(canvas_width, canvas_height, config);
    app.config_path = args.config.clone();
    if let Some(name) = &args.preset {
        app.preset_index = app.presets.preset_names().iter().position(|p| p.eq_ignore_ascii_case(name));
    }

    let res = run_app(&mut terminal, &mut app);

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

/// Recompute the canvas after a resize or layout change
fn refit_canvas(app: &mut App, width: u16, height: u16) {
    let (canvas_width, canvas_height) =
        ui::get_canvas_size(Rect::new(0, 0, width, height), app.fullscreen_mode);
    app.resize(canvas_width, canvas_height);
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let mut next_tick = Instant::now();

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        let timeout = next_tick.saturating_duration_since(Instant::now());
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) => {
                    // Only process Press events
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }

                    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                        return Ok(());
                    }

                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char(' ') => app.toggle_pause(),
                        KeyCode::Char('r') | KeyCode::Char('R') => app.reshuffle(),
                        KeyCode::Char('c') | KeyCode::Char('C') => app.cycle_palette(),
                        KeyCode::Char('p') | KeyCode::Char('P') => app.cycle_preset(),
                        KeyCode::Char('w') | KeyCode::Char('W') => app.save_config(),
                        KeyCode::Char('x') | KeyCode::Char('X') => app.export_png(),
                        KeyCode::Char('v') | KeyCode::Char('V') => {
                            app.toggle_fullscreen();
                            let size = terminal.size()?;
                            refit_canvas(app, size.width, size.height);
                        }
                        KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('?') => app.toggle_help(),
                        KeyCode::Char('+') | KeyCode::Char('=') => {
                            app.focus = Focus::Speed;
                            app.adjust_focused_up();
                        }
                        KeyCode::Char('-') | KeyCode::Char('_') => {
                            app.focus = Focus::Speed;
                            app.adjust_focused_down();
                        }

                        // Navigation
                        KeyCode::Tab => app.next_focus(),
                        KeyCode::BackTab => app.prev_focus(),
                        KeyCode::Right => app.adjust_focused_up(),
                        KeyCode::Left => app.adjust_focused_down(),
                        KeyCode::Up => {
                            if !app.show_help {
                                if app.focus.is_param() {
                                    app.adjust_focused_up();
                                } else {
                                    app.scroll_controls_up();
                                }
                            }
                        }
                        KeyCode::Down => {
                            if !app.show_help {
                                if app.focus.is_param() {
                                    app.adjust_focused_down();
                                } else {
                                    let term_size = terminal.size()?;
                                    let visible = ui::get_controls_visible_lines(term_size.height);
                                    app.scroll_controls_down(ui::CONTROLS_CONTENT_LINES.saturating_sub(visible));
                                }
                            }
                        }
                        KeyCode::Esc => {
                            if app.show_help {
                                app.toggle_help();
                            } else if app.focus.is_param() {
                                app.focus = Focus::Controls;
                            }
                        }
                        KeyCode::Char('j') | KeyCode::Char('J') => {
                            if app.show_help {
                                app.scroll_help_down(ui::HELP_CONTENT_LINES);
                            }
                        }
                        KeyCode::Char('k') | KeyCode::Char('K') => {
                            if app.show_help {
                                app.scroll_help_up();
                            }
                        }
                        _ => {}
                    }
                }
                Event::Resize(width, height) => refit_canvas(app, width, height),
                _ => {}
            }
        }

        if Instant::now() >= next_tick {
            app.tick();
            next_tick = Instant::now() + Duration::from_millis(app.tick_ms);
        }
    }
}

/// Tick until the grid settles or the tick limit is hit, then print a summary
fn run_headless(args: &Args, config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let params = config.params;
    let mut simulation = Simulation::new(CanvasSize::new(args.width, args.height), config.seed);
    let mut palette_rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_entropy(),
    };
    let palette = Palette::generate(params.group_count, &mut palette_rng);

    let canvas = simulation.canvas();
    info!(
        "Headless run on a {}x{} canvas, limit {} ticks",
        canvas.width, canvas.height, args.max_ticks
    );

    let mut recorder = None;
    let mut relocations = 0usize;
    while simulation.ticks() < args.max_ticks {
        let report = simulation.tick(&params)?;
        relocations += report.relocations;

        if report.reinitialized {
            if let Some(path) = &args.gif {
                // The first frame is the grid after its first step
                recorder = Some(GifRecorder::create(
                    path,
                    simulation.grid(),
                    params.cell_size,
                    &palette,
                    (config.tick_ms / 10).clamp(2, u16::MAX as u64) as u16,
                )?);
            }
        }
        if report.stepped {
            if let Some(recorder) = recorder.as_mut() {
                recorder.record(simulation.grid(), palette.len())?;
            }
        }
        if !report.stepped || !report.changed {
            break;
        }
    }

    if !simulation.is_settled() {
        warn!("Stopped after {} ticks without settling", simulation.ticks());
    }
    if let Some(recorder) = recorder {
        let frames = recorder.frames();
        io::Write::flush(&mut recorder.finish()?)?;
        info!("Wrote {} gif frames", frames);
    }
    if let Some(path) = &args.png {
        export::save_png(simulation.grid(), params.cell_size, &palette, path)?;
    }

    let summary = serde_json::json!({
        "params": params,
        "seed": config.seed,
        "ticks": simulation.ticks(),
        "steps": simulation.steps(),
        "settled": simulation.is_settled(),
        "relocations": relocations,
        "stats": GridStats::measure(simulation.grid(), params.preference),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
