use crate::grid::{Cell, Grid};
use crate::simulation::neighborhood;
use serde::Serialize;

/// Aggregate measurements of a grid under a given preference threshold
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GridStats {
    pub width: usize,
    pub height: usize,
    pub occupied: usize,
    pub empty: usize,
    /// Agents per group index
    pub group_counts: Vec<usize>,
    /// Agents whose similarity ratio is below the threshold
    pub unhappy: usize,
    /// Mean similarity ratio over all agents (1.0 for an agent-free grid)
    pub mean_similarity: f32,
}

impl GridStats {
    pub fn measure(grid: &Grid, threshold: f32) -> Self {
        let mut unhappy = 0;
        let mut ratio_sum = 0.0f64;
        let mut occupied = 0;

        for (x, y, cell) in grid.iter() {
            if let Cell::Occupied(group) = cell {
                let nb = neighborhood(grid, x, y, group);
                occupied += 1;
                ratio_sum += nb.ratio() as f64;
                if nb.is_unhappy(threshold) {
                    unhappy += 1;
                }
            }
        }

        let mean_similarity = if occupied == 0 {
            1.0
        } else {
            (ratio_sum / occupied as f64) as f32
        };

        Self {
            width: grid.width(),
            height: grid.height(),
            occupied,
            empty: grid.area() - occupied,
            group_counts: grid.group_counts(),
            unhappy,
            mean_similarity,
        }
    }

    /// Fraction of agents that are content, 1.0 when there are none
    pub fn content_share(&self) -> f32 {
        if self.occupied == 0 {
            1.0
        } else {
            1.0 - self.unhappy as f32 / self.occupied as f32
        }
    }
}
