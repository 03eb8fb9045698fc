use serde::{Deserialize, Serialize};

/// Group index of an agent.
pub type GroupId = u16;

/// Offsets of the 8-cell Moore neighbourhood, row by row.
pub const MOORE_OFFSETS: [(i32, i32); 8] = [
    (-1, -1), (0, -1), (1, -1),
    (-1, 0),           (1, 0),
    (-1, 1),  (0, 1),  (1, 1),
];

/// A single grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    Occupied(GroupId),
}

impl Cell {
    pub fn group(&self) -> Option<GroupId> {
        match self {
            Cell::Empty => None,
            Cell::Occupied(group) => Some(*group),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

/// Rectangular toroidal grid, stored row-major (`y * width + x`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// All-empty grid. Either dimension may be zero.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::Empty; width * height],
        }
    }

    /// Build a grid from rows of group indices, `None` meaning empty.
    /// Ragged rows are padded with empty cells.
    #[cfg(test)]
    pub fn from_rows(rows: &[Vec<Option<GroupId>>]) -> Self {
        let height = rows.len();
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        let mut grid = Self::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, group) in row.iter().enumerate() {
                if let Some(g) = group {
                    grid.set(x, y, Cell::Occupied(*g));
                }
            }
        }
        grid
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn area(&self) -> usize {
        self.cells.len()
    }

    pub fn is_zero_area(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn position(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    /// Cell at (x, y), or `None` outside the grid
    pub fn get(&self, x: usize, y: usize) -> Option<Cell> {
        if x < self.width && y < self.height {
            Some(self.cells[self.index(x, y)])
        } else {
            None
        }
    }

    /// Set a cell. Writes outside the grid are ignored.
    #[cfg(test)]
    pub fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            self.cells[idx] = cell;
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub(crate) fn set_at(&mut self, index: usize, cell: Cell) {
        self.cells[index] = cell;
    }

    /// Wrap a coordinate plus offset onto `[0, extent)`.
    #[inline]
    fn wrap(coord: usize, offset: i32, extent: usize) -> usize {
        (coord as i64 + offset as i64).rem_euclid(extent as i64) as usize
    }

    /// The 8 Moore neighbours of (x, y) with toroidal wraparound.
    ///
    /// On grids narrower than 3 cells the same cell can appear more than once
    /// (and may be (x, y) itself); every offset is still visited exactly once.
    pub fn neighbors(&self, x: usize, y: usize) -> impl Iterator<Item = Cell> + '_ {
        let (width, height) = (self.width, self.height);
        MOORE_OFFSETS.iter().map(move |&(dx, dy)| {
            let nx = Self::wrap(x, dx, width);
            let ny = Self::wrap(y, dy, height);
            self.cells[ny * width + nx]
        })
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }

    /// Number of agents per group; the vector is long enough for the largest group present.
    pub fn group_counts(&self) -> Vec<usize> {
        let mut counts = Vec::new();
        for group in self.cells.iter().filter_map(Cell::group) {
            let g = group as usize;
            if counts.len() <= g {
                counts.resize(g + 1, 0);
            }
            counts[g] += 1;
        }
        counts
    }

    /// Row-major iterator over `(x, y, cell)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (i % self.width, i / self.width, *cell))
    }
}
