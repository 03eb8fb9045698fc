use crate::error::ParamError;
use crate::grid::{Cell, Grid, GroupId};
use crate::params::{validate_group_count, validate_occupancy, validate_preference};
use log::{debug, trace};
use rand::Rng;

/// Similar and occupied neighbour counts of one agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Neighborhood {
    /// Occupied neighbours sharing the agent's group
    pub similar: u8,
    /// Occupied neighbours of any group (8 minus the empty ones)
    pub occupied: u8,
}

impl Neighborhood {
    /// Share of occupied neighbours that are similar. An agent with no
    /// occupied neighbours counts as fully satisfied.
    pub fn ratio(&self) -> f32 {
        if self.occupied == 0 {
            1.0
        } else {
            self.similar as f32 / self.occupied as f32
        }
    }

    /// Strict comparison: a ratio equal to the threshold is content.
    pub fn is_unhappy(&self, threshold: f32) -> bool {
        self.ratio() < threshold
    }
}

/// Count the neighbours of the agent at (x, y) as if it belonged to `group`.
pub fn neighborhood(grid: &Grid, x: usize, y: usize, group: GroupId) -> Neighborhood {
    let mut similar = 0u8;
    let mut occupied = 8u8;
    for neighbor in grid.neighbors(x, y) {
        match neighbor {
            Cell::Empty => occupied -= 1,
            Cell::Occupied(g) if g == group => similar += 1,
            Cell::Occupied(_) => {}
        }
    }
    Neighborhood { similar, occupied }
}

/// Fill a fresh `width x height` grid. Each cell is independently occupied
/// with probability `occupancy`, by a group drawn uniformly from `[0, group_count)`.
pub fn initialize<R: Rng + ?Sized>(
    width: usize,
    height: usize,
    occupancy: f32,
    group_count: GroupId,
    rng: &mut R,
) -> Result<Grid, ParamError> {
    validate_occupancy(occupancy)?;
    validate_group_count(group_count)?;

    let mut grid = Grid::new(width, height);
    for idx in 0..grid.area() {
        if rng.gen::<f32>() < occupancy {
            let group = rng.gen_range(0..group_count);
            grid.set_at(idx, Cell::Occupied(group));
        }
    }

    debug!(
        "Initialized {}x{} grid: {} agents in {} groups (p = {:.2})",
        width,
        height,
        grid.occupied_count(),
        group_count,
        occupancy
    );
    Ok(grid)
}

/// One agent moved during a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub group: GroupId,
    pub from: (usize, usize),
    pub to: (usize, usize),
}

/// Result of advancing the grid by one tick
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub grid: Grid,
    /// True when at least one agent relocated
    pub changed: bool,
    pub relocations: Vec<Relocation>,
    /// Unhappy agents that found no vacancy and stayed in place
    pub stranded: Vec<(usize, usize)>,
}

impl StepOutcome {
    /// Every agent found unhappy this tick, moved or not
    #[cfg(test)]
    pub fn unhappy_origins(&self) -> Vec<(usize, usize)> {
        let mut origins: Vec<(usize, usize)> = self
            .relocations
            .iter()
            .map(|r| r.from)
            .chain(self.stranded.iter().copied())
            .collect();
        origins.sort_unstable_by_key(|&(x, y)| (y, x));
        origins
    }
}

/// Advance the grid by one tick.
///
/// Satisfaction is evaluated against the pre-step grid for every agent, while
/// destinations are drawn uniformly from the cells that are empty in the grid
/// being built, so a cell vacated earlier in the tick can be reused and no two
/// agents land on the same cell.
pub fn step<R: Rng + ?Sized>(grid: &Grid, threshold: f32, rng: &mut R) -> Result<StepOutcome, ParamError> {
    validate_preference(threshold)?;

    let mut next = grid.clone();
    let mut vacancies: Vec<usize> = grid
        .cells()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_empty())
        .map(|(i, _)| i)
        .collect();
    let mut relocations = Vec::new();
    let mut stranded = Vec::new();

    for (x, y, cell) in grid.iter() {
        let Cell::Occupied(group) = cell else {
            continue;
        };
        if !neighborhood(grid, x, y, group).is_unhappy(threshold) {
            continue;
        }

        if vacancies.is_empty() {
            stranded.push((x, y));
            continue;
        }
        let dest = vacancies.swap_remove(rng.gen_range(0..vacancies.len()));
        let origin = grid.index(x, y);
        next.set_at(dest, Cell::Occupied(group));
        next.set_at(origin, Cell::Empty);
        vacancies.push(origin);

        let moved = Relocation {
            group,
            from: (x, y),
            to: grid.position(dest),
        };
        trace!("group {} agent moved {:?} -> {:?}", moved.group, moved.from, moved.to);
        relocations.push(moved);
    }

    if !stranded.is_empty() {
        debug!("{} unhappy agents had no vacancy to move to", stranded.len());
    }

    Ok(StepOutcome {
        grid: next,
        changed: !relocations.is_empty(),
        relocations,
        stranded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0x5EED)
    }

    fn sorted_groups(grid: &Grid) -> Vec<GroupId> {
        let mut groups: Vec<GroupId> = grid.cells().iter().filter_map(Cell::group).collect();
        groups.sort_unstable();
        groups
    }

    #[test]
    fn test_initialize_zero_occupancy_is_empty() {
        let grid = initialize(20, 15, 0.0, 3, &mut rng()).unwrap();
        assert_eq!((grid.width(), grid.height()), (20, 15));
        assert_eq!(grid.occupied_count(), 0);
    }

    #[test]
    fn test_initialize_full_occupancy() {
        let grid = initialize(12, 9, 1.0, 4, &mut rng()).unwrap();
        assert_eq!(grid.occupied_count(), 12 * 9);
        assert!(grid.cells().iter().all(|c| matches!(c, Cell::Occupied(g) if *g < 4)));
    }

    #[test]
    fn test_initialize_rejects_bad_parameters() {
        assert!(matches!(
            initialize(5, 5, 1.2, 2, &mut rng()),
            Err(ParamError::Occupancy(_))
        ));
        assert!(matches!(
            initialize(5, 5, 0.5, 0, &mut rng()),
            Err(ParamError::GroupCount(0))
        ));
    }

    #[test]
    fn test_initialize_zero_area() {
        let grid = initialize(0, 10, 0.9, 2, &mut rng()).unwrap();
        assert!(grid.is_zero_area());
        let outcome = step(&grid, 0.7, &mut rng()).unwrap();
        assert!(!outcome.changed);
        assert_eq!(outcome.grid, grid);
    }

    #[test]
    fn test_isolated_agent_is_satisfied() {
        let mut grid = Grid::new(5, 5);
        grid.set(2, 2, Cell::Occupied(1));
        let nb = neighborhood(&grid, 2, 2, 1);
        assert_eq!(nb.occupied, 0);
        assert_eq!(nb.ratio(), 1.0);
        assert!(!nb.is_unhappy(1.0));

        let outcome = step(&grid, 1.0, &mut rng()).unwrap();
        assert!(!outcome.changed);
        assert_eq!(outcome.grid, grid);
    }

    #[test]
    fn test_ratio_bounds() {
        let grid = initialize(10, 10, 0.6, 3, &mut rng()).unwrap();
        for (x, y, cell) in grid.iter() {
            if let Cell::Occupied(g) = cell {
                let nb = neighborhood(&grid, x, y, g);
                assert!(nb.occupied <= 8);
                assert!(nb.similar <= nb.occupied);
                let ratio = nb.ratio();
                assert!((0.0..=1.0).contains(&ratio));
            }
        }
    }

    #[test]
    fn test_empty_grid_is_fixed_point() {
        let grid = Grid::new(8, 8);
        let outcome = step(&grid, 0.5, &mut rng()).unwrap();
        assert!(!outcome.changed);
        assert!(outcome.relocations.is_empty());
        assert_eq!(outcome.grid, grid);
    }

    #[test]
    fn test_zero_threshold_never_moves() {
        let mut r = rng();
        for _ in 0..5 {
            let grid = initialize(16, 16, 0.7, 5, &mut r).unwrap();
            let outcome = step(&grid, 0.0, &mut r).unwrap();
            assert!(!outcome.changed);
            assert_eq!(outcome.grid, grid);
        }
    }

    #[test]
    fn test_step_conserves_agents_and_groups() {
        let mut r = rng();
        let mut grid = initialize(24, 18, 0.75, 4, &mut r).unwrap();
        let count = grid.occupied_count();
        let groups = sorted_groups(&grid);
        for _ in 0..10 {
            grid = step(&grid, 0.6, &mut r).unwrap().grid;
            assert_eq!(grid.occupied_count(), count);
            assert_eq!(sorted_groups(&grid), groups);
        }
    }

    #[test]
    fn test_full_three_by_three_scenario() {
        // Every cell of a 3x3 torus sees the other eight. Five agents of group 0
        // see 4/8 similar, four agents of group 1 see 3/8.
        let grid = Grid::from_rows(&[
            vec![Some(0), Some(0), Some(1)],
            vec![Some(0), Some(1), Some(1)],
            vec![Some(1), Some(0), Some(0)],
        ]);
        for (x, y, cell) in grid.iter() {
            let g = cell.group().unwrap();
            let nb = neighborhood(&grid, x, y, g);
            assert_eq!(nb.occupied, 8);
            let expected = if g == 0 { 0.5 } else { 0.375 };
            assert_eq!(nb.ratio(), expected);
        }

        let outcome = step(&grid, 0.6, &mut rng()).unwrap();
        // All nine are unhappy, but a full grid has nowhere to move
        assert_eq!(outcome.unhappy_origins().len(), 9);
        assert!(outcome.relocations.is_empty());
        assert!(!outcome.changed);
        assert_eq!(outcome.grid.occupied_count(), 9);
        assert_eq!(outcome.grid, grid);

        // At 0.45 only group 1 falls short
        let outcome = step(&grid, 0.45, &mut rng()).unwrap();
        let expected: Vec<(usize, usize)> = grid
            .iter()
            .filter(|(_, _, c)| *c == Cell::Occupied(1))
            .map(|(x, y, _)| (x, y))
            .collect();
        assert_eq!(outcome.unhappy_origins(), expected);
    }

    #[test]
    fn test_unhappy_agents_relocate_into_vacancies() {
        // A lone group-1 agent among group-0 agents, with one vacancy
        let mut rows = vec![vec![Some(0); 4]; 4];
        rows[1][1] = Some(1);
        rows[3][3] = None;
        let grid = Grid::from_rows(&rows);

        let outcome = step(&grid, 0.3, &mut rng()).unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.relocations.len(), 1);
        let moved = outcome.relocations[0];
        assert_eq!(moved.group, 1);
        assert_eq!(moved.from, (1, 1));
        assert_eq!(moved.to, (3, 3));
        assert_eq!(outcome.grid.get(1, 1), Some(Cell::Empty));
        assert_eq!(outcome.grid.get(3, 3), Some(Cell::Occupied(1)));
    }

    #[test]
    fn test_vacated_cell_can_be_reused_in_same_tick() {
        // Two group-1 agents in a sea of group 0, a single vacancy: the first
        // mover takes the vacancy, the second can only take the first's origin.
        let mut rows = vec![vec![Some(0); 5]; 5];
        rows[0][0] = Some(1);
        rows[2][2] = Some(1);
        rows[4][4] = None;
        let grid = Grid::from_rows(&rows);

        let outcome = step(&grid, 0.5, &mut rng()).unwrap();
        let ones: Vec<&Relocation> = outcome.relocations.iter().filter(|r| r.group == 1).collect();
        assert_eq!(ones.len(), 2);
        assert_eq!(ones[0].from, (0, 0));
        assert_eq!(ones[0].to, (4, 4));
        assert_eq!(ones[1].from, (2, 2));
        assert_eq!(ones[1].to, (0, 0));
        assert_eq!(outcome.grid.occupied_count(), grid.occupied_count());
    }

    #[test]
    fn test_threshold_one_moves_every_mixed_agent() {
        let grid = Grid::from_rows(&[
            vec![Some(0), Some(1), None, None, None, None],
            vec![None, None, None, None, None, None],
            vec![None, None, None, Some(0), Some(0), None],
            vec![None, None, None, None, None, None],
            vec![None, None, None, None, None, None],
        ]);
        let outcome = step(&grid, 1.0, &mut rng()).unwrap();
        let mut movers: Vec<(usize, usize)> = outcome.relocations.iter().map(|r| r.from).collect();
        movers.sort_unstable();
        // The mixed pair moves; the homogeneous pair stays
        assert_eq!(movers, vec![(0, 0), (1, 0)]);
        assert!(outcome.stranded.is_empty());
    }

    #[test]
    fn test_threshold_equal_ratio_is_content() {
        let grid = Grid::from_rows(&[
            vec![Some(0), Some(1), None, None],
            vec![None, None, None, None],
            vec![None, None, None, None],
            vec![None, None, None, None],
        ]);
        // Each agent has one occupied neighbour and zero similar; 0/1 = 0.0
        let outcome = step(&grid, 0.0, &mut rng()).unwrap();
        assert!(!outcome.changed);
        // Half-similar case: ratio 0.5 against threshold 0.5 stays
        let grid = Grid::from_rows(&[
            vec![Some(0), Some(0), Some(1), None, None],
            vec![None, None, None, None, None],
            vec![None, None, None, None, None],
            vec![None, None, None, None, None],
            vec![None, None, None, None, None],
        ]);
        let nb = neighborhood(&grid, 1, 0, 0);
        assert_eq!(nb.ratio(), 0.5);
        assert!(!nb.is_unhappy(0.5));
    }

    #[test]
    fn test_settled_grid_stays_settled() {
        let mut r = rng();
        let mut grid = initialize(20, 20, 0.6, 2, &mut r).unwrap();
        let mut settled = false;
        for _ in 0..500 {
            let outcome = step(&grid, 0.3, &mut r).unwrap();
            grid = outcome.grid;
            if !outcome.changed {
                settled = true;
                break;
            }
        }
        assert!(settled, "low-preference run should settle");
        for _ in 0..5 {
            let outcome = step(&grid, 0.3, &mut r).unwrap();
            assert!(!outcome.changed);
            assert_eq!(outcome.grid, grid);
        }
    }

    #[test]
    fn test_step_rejects_bad_threshold() {
        let grid = Grid::new(3, 3);
        assert!(matches!(step(&grid, 1.5, &mut rng()), Err(ParamError::Preference(_))));
    }
}
