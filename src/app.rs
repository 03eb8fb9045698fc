use crate::config::AppConfig;
use crate::driver::{Simulation, TickReport};
use crate::export;
use crate::halfblock;
use crate::palette::Palette;
use crate::params::{ParamRanges, Parameters};
use crate::presets::PresetManager;
use crate::stats::GridStats;
use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

/// Focus state for parameter editing in the sidebar
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Focus {
    CellSize,
    Occupancy,
    Groups,
    Preference,
    Speed,
    // Controls box (not a param)
    #[default]
    Controls,
}

impl Focus {
    /// Tab cycles through the sliders top to bottom
    pub fn next(&self) -> Focus {
        match self {
            Focus::Controls => Focus::CellSize,
            Focus::CellSize => Focus::Occupancy,
            Focus::Occupancy => Focus::Groups,
            Focus::Groups => Focus::Preference,
            Focus::Preference => Focus::Speed,
            Focus::Speed => Focus::CellSize,
        }
    }

    pub fn prev(&self) -> Focus {
        match self {
            Focus::Controls | Focus::CellSize => Focus::Speed,
            Focus::Occupancy => Focus::CellSize,
            Focus::Groups => Focus::Occupancy,
            Focus::Preference => Focus::Groups,
            Focus::Speed => Focus::Preference,
        }
    }

    /// Line index in the parameters box, used to keep the focused line visible
    pub fn line_index(&self) -> u16 {
        match self {
            Focus::Controls | Focus::CellSize => 0,
            Focus::Occupancy => 1,
            Focus::Groups => 2,
            Focus::Preference => 3,
            Focus::Speed => 4,
        }
    }

    /// Check if focus is on a parameter rather than the controls box
    pub fn is_param(&self) -> bool {
        !matches!(self, Focus::Controls)
    }
}

/// Main application state
pub struct App {
    pub simulation: Simulation,
    /// Current slider values, read by the driver once per tick
    pub params: Parameters,
    pub ranges: ParamRanges,
    pub palette: Palette,
    palette_rng: StdRng,
    pub presets: PresetManager,
    pub preset_index: Option<usize>,
    pub stats: GridStats,
    pub last_report: TickReport,
    pub focus: Focus,
    pub fullscreen_mode: bool,
    pub paused: bool,
    pub ticks_per_frame: usize,
    pub tick_ms: u64,
    pub seed: Option<u64>,
    pub show_help: bool,
    pub help_scroll: u16,
    pub controls_scroll: u16,
    /// One-line feedback shown in the status box
    pub message: Option<String>,
    pub config_path: Option<PathBuf>,
}

impl App {
    pub fn new(canvas_width: u16, canvas_height: u16, config: AppConfig) -> Self {
        let canvas = halfblock::canvas_pixels(canvas_width, canvas_height);
        // Palette draws come from their own stream so colour re-rolls never
        // perturb a seeded simulation
        let mut palette_rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };
        let params = config.ranges.clamp(&config.params);
        Self {
            simulation: Simulation::new(canvas, config.seed),
            palette: Palette::generate(params.group_count, &mut palette_rng),
            palette_rng,
            params,
            ranges: config.ranges,
            presets: PresetManager::new(),
            preset_index: None,
            stats: GridStats::default(),
            last_report: TickReport::default(),
            focus: Focus::Controls,
            fullscreen_mode: false,
            paused: false,
            ticks_per_frame: config.ticks_per_frame.clamp(1, 20),
            tick_ms: config.tick_ms.max(10),
            seed: config.seed,
            show_help: false,
            help_scroll: 0,
            controls_scroll: 0,
            message: None,
            config_path: None,
        }
    }

    /// Run the driver for one frame
    pub fn tick(&mut self) {
        if self.paused {
            return;
        }
        for _ in 0..self.ticks_per_frame {
            match self.simulation.tick(&self.params) {
                Ok(report) => {
                    if report.resized {
                        debug!("Rebuilt grid for new canvas {:?}", self.simulation.canvas());
                    }
                    if report.changes.group_count {
                        self.palette = Palette::generate(self.params.group_count, &mut self.palette_rng);
                    }
                    if report.stepped || report.reinitialized {
                        self.stats = GridStats::measure(self.simulation.grid(), self.params.preference);
                    }
                    self.last_report = report;
                    if !report.stepped {
                        break;
                    }
                }
                Err(e) => {
                    error!("Tick rejected: {}", e);
                    self.message = Some(e.to_string());
                    break;
                }
            }
        }
    }

    /// Status label for the sidebar
    pub fn state_label(&self) -> &'static str {
        if self.paused {
            "PAUSED"
        } else if self.simulation.is_settled() {
            "SETTLED"
        } else {
            "RUNNING"
        }
    }

    /// Handle adjusting the currently focused parameter
    pub fn adjust_focused(&mut self, steps: i32) {
        match self.focus {
            Focus::Controls => {}
            Focus::CellSize => {
                self.params.cell_size = self.ranges.cell_size.adjust(self.params.cell_size, steps)
            }
            Focus::Occupancy => {
                self.params.occupancy = self.ranges.occupancy.adjust(self.params.occupancy, steps)
            }
            Focus::Groups => {
                self.params.group_count = self.ranges.group_count.adjust(self.params.group_count, steps)
            }
            Focus::Preference => {
                self.params.preference = self.ranges.preference.adjust(self.params.preference, steps)
            }
            Focus::Speed => {
                self.ticks_per_frame = (self.ticks_per_frame as i64 + steps as i64).clamp(1, 20) as usize
            }
        }
        if self.focus.is_param() && self.focus != Focus::Speed {
            self.preset_index = None;
        }
    }

    pub fn adjust_focused_up(&mut self) {
        self.adjust_focused(1);
    }

    pub fn adjust_focused_down(&mut self) {
        self.adjust_focused(-1);
    }

    pub fn next_focus(&mut self) {
        self.focus = self.focus.next();
    }

    /// Navigate to previous parameter (Shift+Tab)
    pub fn prev_focus(&mut self) {
        self.focus = self.focus.prev();
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Throw the current grid away and draw a new one
    pub fn reshuffle(&mut self) {
        self.simulation.reshuffle();
        self.message = Some("Reshuffled".to_string());
    }

    /// Re-roll the group colours
    pub fn cycle_palette(&mut self) {
        self.palette = Palette::generate(self.params.group_count, &mut self.palette_rng);
        debug!("Palette base hue {:.0}", self.palette.base_hue());
    }

    /// Apply the next preset; the driver picks up the new values on the next tick
    pub fn cycle_preset(&mut self) {
        if self.presets.is_empty() {
            return;
        }
        let index = self.preset_index.map_or(0, |i| (i + 1) % self.presets.len());
        self.apply_preset(index);
    }

    pub fn apply_preset(&mut self, index: usize) {
        if let Some(preset) = self.presets.get(index) {
            self.params = self.ranges.clamp(&preset.params);
            self.message = Some(format!("Preset: {}", preset.name));
            info!("Applied preset '{}': {}", preset.name, preset.description);
            self.preset_index = Some(index);
        }
    }

    pub fn preset_name(&self) -> Option<&str> {
        self.preset_index
            .and_then(|i| self.presets.get(i))
            .map(|p| p.name.as_str())
    }

    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen_mode = !self.fullscreen_mode;
    }

    /// Toggle help overlay
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
        if self.show_help {
            self.help_scroll = 0; // Reset scroll when opening
        }
    }

    pub fn scroll_help_up(&mut self) {
        self.help_scroll = self.help_scroll.saturating_sub(1);
    }

    pub fn scroll_help_down(&mut self, max_scroll: u16) {
        self.help_scroll = (self.help_scroll + 1).min(max_scroll);
    }

    pub fn scroll_controls_up(&mut self) {
        self.controls_scroll = self.controls_scroll.saturating_sub(1);
    }

    pub fn scroll_controls_down(&mut self, max_scroll: u16) {
        self.controls_scroll = (self.controls_scroll + 1).min(max_scroll);
    }

    /// Resize simulation to match new canvas size
    pub fn resize(&mut self, canvas_width: u16, canvas_height: u16) {
        self.simulation
            .resize(halfblock::canvas_pixels(canvas_width, canvas_height));
    }

    pub fn to_config(&self) -> AppConfig {
        AppConfig {
            version: 1,
            params: self.params,
            ranges: self.ranges.clone(),
            tick_ms: self.tick_ms,
            ticks_per_frame: self.ticks_per_frame,
            seed: self.seed,
        }
    }

    /// Write the current settings to the config file
    pub fn save_config(&mut self) {
        let Some(path) = self.config_path.clone().or_else(AppConfig::default_path) else {
            self.message = Some("No config directory".to_string());
            return;
        };
        self.message = Some(match self.to_config().save_to_file(&path) {
            Ok(()) => {
                info!("Saved config to {}", path.display());
                format!("Saved {}", path.display())
            }
            Err(e) => {
                error!("{}", e);
                e
            }
        });
    }

    /// Save a PNG of the current grid in the working directory
    pub fn export_png(&mut self) {
        let path = PathBuf::from(format!("schelling-{:05}.png", self.simulation.ticks()));
        self.message = Some(
            match export::save_png(self.simulation.grid(), self.params.cell_size, &self.palette, &path) {
                Ok(()) => format!("Saved {}", path.display()),
                Err(e) => {
                    error!("PNG export failed: {}", e);
                    e.to_string()
                }
            },
        );
    }
}
