use crate::error::ParamError;
use crate::grid::GroupId;
use serde::{Deserialize, Serialize};

/// Slider bounds for a single parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange<T> {
    pub min: T,
    pub max: T,
    pub default: T,
    pub step: T,
}

impl ParamRange<f32> {
    /// Clamp to the range and snap to the nearest step
    pub fn snap(&self, value: f32) -> f32 {
        let clamped = value.clamp(self.min, self.max);
        if self.step <= 0.0 {
            return clamped;
        }
        let steps = ((clamped - self.min) / self.step).round();
        // Rounded to 1e-4 so repeated adjustments compare equal to typed-in values
        let snapped = ((self.min + steps * self.step) * 10_000.0).round() / 10_000.0;
        snapped.clamp(self.min, self.max)
    }

    pub fn adjust(&self, value: f32, steps: i32) -> f32 {
        self.snap(value + steps as f32 * self.step)
    }
}

impl ParamRange<u32> {
    pub fn adjust(&self, value: u32, steps: i32) -> u32 {
        let delta = steps as i64 * self.step.max(1) as i64;
        (value as i64 + delta).clamp(self.min as i64, self.max as i64) as u32
    }
}

impl ParamRange<u16> {
    pub fn adjust(&self, value: u16, steps: i32) -> u16 {
        let delta = steps as i64 * self.step.max(1) as i64;
        (value as i64 + delta).clamp(self.min as i64, self.max as i64) as u16
    }
}

/// Slider ranges for all four parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamRanges {
    pub cell_size: ParamRange<u32>,
    pub occupancy: ParamRange<f32>,
    pub group_count: ParamRange<u16>,
    pub preference: ParamRange<f32>,
}

impl Default for ParamRanges {
    fn default() -> Self {
        Self {
            // Terminal pixels are half a character tall, so smaller cells than a
            // browser canvas would use
            cell_size: ParamRange { min: 1, max: 10, default: 2, step: 1 },
            occupancy: ParamRange { min: 0.15, max: 0.95, default: 0.8, step: 0.01 },
            group_count: ParamRange { min: 2, max: 10, default: 2, step: 1 },
            preference: ParamRange { min: 0.0, max: 1.0, default: 0.5, step: 0.01 },
        }
    }
}

impl ParamRanges {
    pub fn defaults(&self) -> Parameters {
        Parameters {
            cell_size: self.cell_size.default,
            occupancy: self.occupancy.default,
            group_count: self.group_count.default,
            preference: self.preference.default,
        }
    }

    /// Names of the fields that `clamp` would change
    pub fn clamped_fields(&self, params: &Parameters) -> Vec<&'static str> {
        let clamped = self.clamp(params);
        let mut fields = Vec::new();
        if clamped.cell_size != params.cell_size {
            fields.push("cell size");
        }
        if clamped.occupancy != params.occupancy {
            fields.push("occupancy");
        }
        if clamped.group_count != params.group_count {
            fields.push("group count");
        }
        if clamped.preference != params.preference {
            fields.push("preference");
        }
        fields
    }

    /// Clamp every field of `params` into its slider range
    pub fn clamp(&self, params: &Parameters) -> Parameters {
        Parameters {
            cell_size: params.cell_size.clamp(self.cell_size.min, self.cell_size.max),
            occupancy: self.occupancy.snap(params.occupancy),
            group_count: params.group_count.clamp(self.group_count.min, self.group_count.max),
            preference: self.preference.snap(params.preference),
        }
    }
}

/// The four user-adjustable simulation inputs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Pixels per cell edge
    pub cell_size: u32,
    /// Probability that a cell starts occupied
    pub occupancy: f32,
    /// Number of distinct agent groups
    pub group_count: u16,
    /// Minimum share of occupied neighbours that must be similar
    pub preference: f32,
}

impl Default for Parameters {
    fn default() -> Self {
        ParamRanges::default().defaults()
    }
}

impl Parameters {
    /// Check every field against its domain (not the slider range).
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.cell_size == 0 {
            return Err(ParamError::CellSize(self.cell_size));
        }
        validate_occupancy(self.occupancy)?;
        validate_group_count(self.group_count)?;
        validate_preference(self.preference)
    }

    /// Grid dimensions covering a canvas of the given pixel size
    pub fn grid_size(&self, canvas_width: u32, canvas_height: u32) -> (usize, usize) {
        let cs = self.cell_size.max(1);
        ((canvas_width / cs) as usize, (canvas_height / cs) as usize)
    }
}

pub fn validate_occupancy(occupancy: f32) -> Result<(), ParamError> {
    if occupancy.is_finite() && (0.0..=1.0).contains(&occupancy) {
        Ok(())
    } else {
        Err(ParamError::Occupancy(occupancy))
    }
}

pub fn validate_group_count(group_count: GroupId) -> Result<(), ParamError> {
    if group_count >= 1 {
        Ok(())
    } else {
        Err(ParamError::GroupCount(group_count))
    }
}

pub fn validate_preference(preference: f32) -> Result<(), ParamError> {
    if preference.is_finite() && (0.0..=1.0).contains(&preference) {
        Ok(())
    } else {
        Err(ParamError::Preference(preference))
    }
}
