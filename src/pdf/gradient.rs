use crate::config::GradientStops;
use crate::model::Rgb;

use super::Page;

/// Number of horizontal bands used to approximate the gradient.
pub(crate) const GRADIENT_BANDS: usize = 120;

/// One filled band, in PDF coordinates (origin bottom-left).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Band {
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: Rgb,
}

fn lerp(a: Rgb, b: Rgb, t: f32) -> Rgb {
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round().clamp(0.0, 255.0) as u8;
    [mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2])]
}

/// Color at relative depth `t` (0 = page top, 1 = page bottom).
pub fn gradient_color(stops: &GradientStops, t: f32) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    if t <= 0.5 {
        lerp(stops.top, stops.middle, t * 2.0)
    } else {
        lerp(stops.middle, stops.bottom, (t - 0.5) * 2.0)
    }
}

/// Three-stop vertical gradient covering a `width` x `height` page, top band first.
pub fn gradient_bands(width: f32, height: f32, stops: &GradientStops) -> Vec<Band> {
    let band_h = height / GRADIENT_BANDS as f32;
    (0..GRADIENT_BANDS)
        .map(|i| {
            let t = if GRADIENT_BANDS > 1 {
                i as f32 / (GRADIENT_BANDS - 1) as f32
            } else {
                0.0
            };
            let top = height - i as f32 * band_h;
            // Slight overlap hides hairline seams between bands
            let overlap = if i + 1 < GRADIENT_BANDS { 0.5 } else { 0.0 };
            Band {
                y: (top - band_h - overlap).max(0.0),
                width,
                height: band_h + overlap,
                color: gradient_color(stops, t),
            }
        })
        .collect()
}

pub fn paint_gradient(page: &mut Page, stops: &GradientStops) {
    for band in gradient_bands(page.width(), page.height(), stops) {
        page.fill_rect(0.0, band.y, band.width, band.height, band.color);
    }
}
