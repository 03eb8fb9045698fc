use crate::error::ParamError;
use crate::grid::Grid;
use crate::params::Parameters;
use crate::simulation::{initialize, step};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Which parameters differ from the previous tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParamChanges {
    pub cell_size: bool,
    pub occupancy: bool,
    pub group_count: bool,
    pub preference: bool,
}

impl ParamChanges {
    fn all() -> Self {
        Self {
            cell_size: true,
            occupancy: true,
            group_count: true,
            preference: true,
        }
    }

    /// Structural changes invalidate the current grid
    pub fn requires_reinit(&self) -> bool {
        self.cell_size || self.occupancy || self.group_count
    }

    pub fn any(&self) -> bool {
        self.requires_reinit() || self.preference
    }
}

/// Remembers the last observed parameters and reports what changed.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    previous: Option<Parameters>,
}

impl ChangeDetector {
    /// Compare against the previous observation, then record `current`.
    /// The first observation reports every parameter as changed.
    pub fn observe(&mut self, current: &Parameters) -> ParamChanges {
        let changes = match &self.previous {
            None => ParamChanges::all(),
            Some(prev) => ParamChanges {
                cell_size: prev.cell_size != current.cell_size,
                occupancy: prev.occupancy != current.occupancy,
                group_count: prev.group_count != current.group_count,
                preference: prev.preference != current.preference,
            },
        };
        self.previous = Some(*current);
        changes
    }
}

/// Canvas size in pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// What a single tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub changes: ParamChanges,
    pub resized: bool,
    pub reinitialized: bool,
    pub stepped: bool,
    /// The step relocated at least one agent
    pub changed: bool,
    pub relocations: usize,
    pub stranded: usize,
}

/// Owns the grid between ticks and decides, per tick, whether to rebuild it,
/// advance it, or leave it alone.
pub struct Simulation<R = StdRng> {
    grid: Grid,
    rng: R,
    detector: ChangeDetector,
    canvas: CanvasSize,
    reinit_pending: bool,
    /// The last step moved someone, so the next tick steps again
    unsettled: bool,
    ticks: u64,
    steps: u64,
    generation: u64,
}

impl Simulation<StdRng> {
    /// Seeded for reproducible runs, otherwise seeded from OS entropy
    pub fn new(canvas: CanvasSize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(canvas, rng)
    }
}

impl<R: Rng> Simulation<R> {
    pub fn with_rng(canvas: CanvasSize, rng: R) -> Self {
        Self {
            grid: Grid::new(0, 0),
            rng,
            detector: ChangeDetector::default(),
            canvas,
            reinit_pending: false,
            unsettled: false,
            ticks: 0,
            steps: 0,
            generation: 0,
        }
    }

    /// Record a new canvas size; the next tick rebuilds the grid if it differs.
    pub fn resize(&mut self, canvas: CanvasSize) {
        if canvas != self.canvas {
            debug!("Canvas resized to {}x{}", canvas.width, canvas.height);
            self.canvas = canvas;
            self.reinit_pending = true;
        }
    }

    /// Force a fresh random grid on the next tick
    pub fn reshuffle(&mut self) {
        self.reinit_pending = true;
    }

    /// Run one tick with the host's current parameter values.
    ///
    /// Invalid parameters are rejected before anything is recorded, so the
    /// grid and the change detector are left untouched.
    pub fn tick(&mut self, params: &Parameters) -> Result<TickReport, ParamError> {
        params.validate()?;

        let changes = self.detector.observe(params);
        if changes.any() {
            debug!("Parameters changed: {:?}", changes);
        }
        let resized = std::mem::take(&mut self.reinit_pending);
        let mut report = TickReport {
            changes,
            resized,
            ..Default::default()
        };

        if changes.requires_reinit() || resized {
            let (width, height) = params.grid_size(self.canvas.width, self.canvas.height);
            self.grid = initialize(width, height, params.occupancy, params.group_count, &mut self.rng)?;
            self.generation += 1;
            report.reinitialized = true;
            info!(
                "Generation {}: {}x{} grid, {} agents, {} groups",
                self.generation,
                width,
                height,
                self.grid.occupied_count(),
                params.group_count
            );
        }

        if report.reinitialized || changes.preference || self.unsettled {
            let outcome = step(&self.grid, params.preference, &mut self.rng)?;
            report.stepped = true;
            report.changed = outcome.changed;
            report.relocations = outcome.relocations.len();
            report.stranded = outcome.stranded.len();
            self.grid = outcome.grid;
            self.steps += 1;

            if self.unsettled && !outcome.changed {
                info!("Settled after {} steps in generation {}", self.steps, self.generation);
            }
            self.unsettled = outcome.changed;
        }

        self.ticks += 1;
        Ok(report)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    /// At least one step has run and the last one moved nobody
    pub fn is_settled(&self) -> bool {
        self.steps > 0 && !self.unsettled
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Steps run since the program started
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Number of grids built so far
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
