use thiserror::Error;

/// Rejected simulation parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("cell size must be at least 1 pixel, got {0}")]
    CellSize(u32),
    #[error("occupancy probability must be within [0, 1], got {0}")]
    Occupancy(f32),
    #[error("group count must be at least 1, got {0}")]
    GroupCount(u16),
    #[error("preference threshold must be within [0, 1], got {0}")]
    Preference(f32),
}

/// Failures while writing rendered grids to disk.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("grid has zero area, nothing to export")]
    EmptyCanvas,
    #[error("image too large to encode: {width}x{height}")]
    TooLarge { width: u32, height: u32 },
    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to encode gif frame: {0}")]
    Gif(#[from] gif::EncodingError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
