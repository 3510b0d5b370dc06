use image::Rgba;
use palette::{FromColor, Hsl, Srgb};

const SATURATION: f32 = 0.9;
const LIGHTNESS: f32 = 0.5;

/// Spreads `n` colors evenly around the HSL hue wheel, starting at red.
pub(crate) fn contrasting_colors(n: usize, alpha: u8) -> Vec<Rgba<u8>> {
    (0..n)
        .map(|i| hue_to_rgba(i as f32 * 360.0 / n as f32, alpha))
        .collect()
}

fn hue_to_rgba(hue: f32, alpha: u8) -> Rgba<u8> {
    let rgb: Srgb<u8> = Srgb::from_color(Hsl::new(hue, SATURATION, LIGHTNESS)).into_format();
    Rgba([rgb.red, rgb.green, rgb.blue, alpha])
}
