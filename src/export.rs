use crate::error::ExportError;
use crate::grid::{Cell, Grid};
use crate::palette::Palette;
use image::{Rgb, RgbImage};
use log::{debug, info, warn};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Colour of empty cells in exported images
pub const BACKGROUND: [u8; 3] = [18, 18, 24];

fn image_size(grid: &Grid, cell_size: u32) -> Result<(u32, u32), ExportError> {
    if grid.is_zero_area() {
        return Err(ExportError::EmptyCanvas);
    }
    let cs = cell_size.max(1) as u64;
    let width = grid.width() as u64 * cs;
    let height = grid.height() as u64 * cs;
    if width > u32::MAX as u64 || height > u32::MAX as u64 {
        return Err(ExportError::TooLarge {
            width: width.min(u32::MAX as u64) as u32,
            height: height.min(u32::MAX as u64) as u32,
        });
    }
    Ok((width as u32, height as u32))
}

/// Draw every agent as a `cell_size x cell_size` square at
/// `(x * cell_size, y * cell_size)`.
pub fn render_image(grid: &Grid, cell_size: u32, palette: &Palette) -> Result<RgbImage, ExportError> {
    let (width, height) = image_size(grid, cell_size)?;
    let cs = cell_size.max(1);
    let mut img = RgbImage::from_pixel(width, height, Rgb(BACKGROUND));

    for (x, y, cell) in grid.iter() {
        if let Cell::Occupied(group) = cell {
            let color = Rgb(palette.rgb(group));
            let (x0, y0) = (x as u32 * cs, y as u32 * cs);
            for py in y0..y0 + cs {
                for px in x0..x0 + cs {
                    img.put_pixel(px, py, color);
                }
            }
        }
    }

    Ok(img)
}

/// Write a PNG snapshot of the grid
pub fn save_png(grid: &Grid, cell_size: u32, palette: &Palette, path: &Path) -> Result<(), ExportError> {
    let img = render_image(grid, cell_size, palette)?;
    img.save_with_format(path, image::ImageFormat::Png)?;
    info!("Saved {}x{} snapshot to {}", img.width(), img.height(), path.display());
    Ok(())
}

/// Appends one indexed frame per recorded grid to an animated GIF.
///
/// Palette index 0 is the background, index `g + 1` is group `g`.
pub struct GifRecorder<W: Write> {
    encoder: gif::Encoder<W>,
    grid_width: usize,
    grid_height: usize,
    cell_size: u32,
    delay: u16,
    frames: usize,
}

impl GifRecorder<BufWriter<File>> {
    pub fn create(path: &Path, grid: &Grid, cell_size: u32, palette: &Palette, delay: u16) -> Result<Self, ExportError> {
        let file = BufWriter::new(File::create(path)?);
        debug!("Recording gif to {}", path.display());
        Self::new(file, grid, cell_size, palette, delay)
    }
}

impl<W: Write> GifRecorder<W> {
    /// `delay` is the per-frame delay in hundredths of a second.
    pub fn new(writer: W, grid: &Grid, cell_size: u32, palette: &Palette, delay: u16) -> Result<Self, ExportError> {
        let (width, height) = image_size(grid, cell_size)?;
        if width > u16::MAX as u32 || height > u16::MAX as u32 || palette.len() > 255 {
            return Err(ExportError::TooLarge { width, height });
        }

        let mut global = Vec::with_capacity((palette.len() + 1) * 3);
        global.extend_from_slice(&BACKGROUND);
        for group in 0..palette.len() {
            global.extend_from_slice(&palette.rgb(group as u16));
        }

        let mut encoder = gif::Encoder::new(writer, width as u16, height as u16, &global)?;
        encoder.set_repeat(gif::Repeat::Infinite)?;

        Ok(Self {
            encoder,
            grid_width: grid.width(),
            grid_height: grid.height(),
            cell_size: cell_size.max(1),
            delay,
            frames: 0,
        })
    }

    /// Append a frame. Grids whose dimensions differ from the first frame are
    /// skipped, returning `false`.
    pub fn record(&mut self, grid: &Grid, palette_len: usize) -> Result<bool, ExportError> {
        if grid.width() != self.grid_width || grid.height() != self.grid_height {
            warn!(
                "Skipping gif frame: grid is {}x{}, recording is {}x{}",
                grid.width(),
                grid.height(),
                self.grid_width,
                self.grid_height
            );
            return Ok(false);
        }

        let cs = self.cell_size as usize;
        let width = self.grid_width * cs;
        let mut buffer = vec![0u8; width * self.grid_height * cs];
        for (x, y, cell) in grid.iter() {
            if let Cell::Occupied(group) = cell {
                let index = (group as usize % palette_len.max(1)) as u8 + 1;
                for py in y * cs..(y + 1) * cs {
                    let row = py * width;
                    buffer[row + x * cs..row + (x + 1) * cs].fill(index);
                }
            }
        }

        let frame = gif::Frame {
            width: width as u16,
            height: (self.grid_height * cs) as u16,
            delay: self.delay,
            buffer: Cow::Owned(buffer),
            ..Default::default()
        };
        self.encoder.write_frame(&frame)?;
        self.frames += 1;
        Ok(true)
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Flush the trailer and hand back the writer
    pub fn finish(self) -> Result<W, ExportError> {
        let frames = self.frames;
        let writer = self.encoder.into_inner()?;
        debug!("Finished gif with {} frames", frames);
        Ok(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_grid() -> Grid {
        Grid::from_rows(&[vec![Some(0), None, Some(1)], vec![None, Some(1), None]])
    }

    #[test]
    fn test_render_image_squares() {
        let palette = Palette::with_base_hue(2, 0.0);
        let img = render_image(&sample_grid(), 3, &palette).unwrap();
        assert_eq!((img.width(), img.height()), (9, 6));
        assert_eq!(img.get_pixel(0, 0).0, palette.rgb(0));
        assert_eq!(img.get_pixel(2, 2).0, palette.rgb(0));
        assert_eq!(img.get_pixel(3, 0).0, BACKGROUND);
        assert_eq!(img.get_pixel(4, 4).0, palette.rgb(1));
        assert_eq!(img.get_pixel(8, 0).0, palette.rgb(1));
    }

    #[test]
    fn test_render_zero_area_fails() {
        let palette = Palette::with_base_hue(2, 0.0);
        assert!(matches!(
            render_image(&Grid::new(0, 4), 2, &palette),
            Err(ExportError::EmptyCanvas)
        ));
    }

    #[test]
    fn test_save_png_roundtrip() {
        let palette = Palette::with_base_hue(2, 0.0);
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        save_png(&sample_grid(), 2, &palette, file.path()).unwrap();

        let loaded = image::open(file.path()).unwrap().to_rgb8();
        assert_eq!((loaded.width(), loaded.height()), (6, 4));
        assert_eq!(loaded.get_pixel(0, 0).0, palette.rgb(0));
    }

    #[test]
    fn test_gif_recorder_writes_frames() {
        let palette = Palette::with_base_hue(2, 0.0);
        let grid = sample_grid();
        let mut recorder = GifRecorder::new(Vec::new(), &grid, 2, &palette, 10).unwrap();
        assert!(recorder.record(&grid, palette.len()).unwrap());
        assert!(recorder.record(&grid, palette.len()).unwrap());
        assert!(!recorder.record(&Grid::new(5, 5), palette.len()).unwrap());
        assert_eq!(recorder.frames(), 2);

        let bytes = recorder.finish().unwrap();
        assert!(bytes.starts_with(b"GIF89a"));
        assert_eq!(bytes.last(), Some(&0x3B));
    }
}
