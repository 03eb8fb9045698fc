use crate::driver::CanvasSize;
use crate::grid::{Cell, Grid};
use crate::palette::Palette;
use ratatui::style::Color;

/// Half-block rendering: each terminal character shows two stacked pixels,
/// the upper one as foreground of `▀` and the lower one as background.
const UPPER_HALF: char = '▀';
const LOWER_HALF: char = '▄';

/// A single rendered character cell with position and colours
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HalfBlockCell {
    pub x: u16,
    pub y: u16,
    pub char: char,
    pub fg: Color,
    pub bg: Color,
}

/// Pixel size of a canvas area measured in terminal characters
pub fn canvas_pixels(char_width: u16, char_height: u16) -> CanvasSize {
    CanvasSize::new(char_width as u32, char_height as u32 * 2)
}

/// Colour of the pixel at (px, py), or `None` where there is no agent
fn pixel(grid: &Grid, cell_size: u32, palette: &Palette, px: u32, py: u32) -> Option<Color> {
    let cs = cell_size.max(1);
    match grid.get((px / cs) as usize, (py / cs) as usize)? {
        Cell::Empty => None,
        Cell::Occupied(group) => Some(palette.color(group)),
    }
}

/// Render the grid to half-block characters. Characters without any agent
/// pixel are omitted.
pub fn render_to_halfblocks(
    grid: &Grid,
    cell_size: u32,
    palette: &Palette,
    canvas_width: u16,
    canvas_height: u16,
) -> Vec<HalfBlockCell> {
    let mut cells = Vec::with_capacity(canvas_width as usize * canvas_height as usize);

    for cy in 0..canvas_height {
        for cx in 0..canvas_width {
            let px = cx as u32;
            let top = pixel(grid, cell_size, palette, px, cy as u32 * 2);
            let bottom = pixel(grid, cell_size, palette, px, cy as u32 * 2 + 1);

            let rendered = match (top, bottom) {
                (None, None) => continue,
                (Some(fg), Some(bg)) => (UPPER_HALF, fg, bg),
                (Some(fg), None) => (UPPER_HALF, fg, Color::Reset),
                (None, Some(fg)) => (LOWER_HALF, fg, Color::Reset),
            };

            cells.push(HalfBlockCell {
                x: cx,
                y: cy,
                char: rendered.0,
                fg: rendered.1,
                bg: rendered.2,
            });
        }
    }

    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_pixels_doubles_height() {
        assert_eq!(canvas_pixels(80, 24), CanvasSize::new(80, 48));
    }

    #[test]
    fn test_render_maps_cells_to_pixels() {
        // 2x2 grid at cell size 1: row 0 is (A, empty), row 1 is (empty, B)
        let grid = Grid::from_rows(&[vec![Some(0), None], vec![None, Some(1)]]);
        let palette = Palette::with_base_hue(2, 0.0);
        let cells = render_to_halfblocks(&grid, 1, &palette, 2, 1);

        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].char, UPPER_HALF);
        assert_eq!(cells[0].fg, palette.color(0));
        assert_eq!(cells[1].char, LOWER_HALF);
        assert_eq!(cells[1].fg, palette.color(1));
    }

    #[test]
    fn test_render_scales_by_cell_size() {
        let grid = Grid::from_rows(&[vec![Some(0)]]);
        let palette = Palette::with_base_hue(1, 90.0);
        // One 4x4 cell covers 4 columns and 2 character rows
        let cells = render_to_halfblocks(&grid, 4, &palette, 6, 3);
        assert_eq!(cells.len(), 8);
        assert!(cells.iter().all(|c| c.x < 4 && c.y < 2));
        assert!(cells.iter().all(|c| c.fg == c.bg));
    }

    #[test]
    fn test_render_empty_grid() {
        let palette = Palette::with_base_hue(2, 0.0);
        assert!(render_to_halfblocks(&Grid::new(0, 0), 3, &palette, 10, 10).is_empty());
    }
}
