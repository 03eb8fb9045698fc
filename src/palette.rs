use crate::grid::GroupId;
use ::palette::{FromColor, Hsv, Srgb};
use rand::Rng;
use ratatui::style::Color;

const SATURATION: f32 = 0.5;
const BRIGHTNESS: f32 = 0.75;

/// One colour per group, evenly spaced around the hue circle
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    base_hue: f32,
    colors: Vec<[u8; 3]>,
}

impl Palette {
    /// Palette with a random base hue
    pub fn generate<R: Rng + ?Sized>(group_count: GroupId, rng: &mut R) -> Self {
        Self::with_base_hue(group_count, rng.gen_range(0.0..360.0))
    }

    pub fn with_base_hue(group_count: GroupId, base_hue: f32) -> Self {
        let count = group_count.max(1) as f32;
        let offset = 360.0 / count;
        let colors = (0..group_count)
            .map(|i| hsv_to_rgb((base_hue + offset * i as f32) % 360.0))
            .collect();
        Self { base_hue, colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn base_hue(&self) -> f32 {
        self.base_hue
    }

    /// RGB colour for a group. Groups beyond the palette wrap around.
    pub fn rgb(&self, group: GroupId) -> [u8; 3] {
        if self.colors.is_empty() {
            return [255, 255, 255];
        }
        self.colors[group as usize % self.colors.len()]
    }

    pub fn color(&self, group: GroupId) -> Color {
        let [r, g, b] = self.rgb(group);
        Color::Rgb(r, g, b)
    }
}

/// Group colour at `hue` degrees with the fixed saturation and brightness
fn hsv_to_rgb(hue: f32) -> [u8; 3] {
    let hsv: Hsv = Hsv::new(hue, SATURATION, BRIGHTNESS);
    let rgb: Srgb = Srgb::from_color(hsv);
    let rgb: Srgb<u8> = rgb.into_format();
    [rgb.red, rgb.green, rgb.blue]
}
