//! Pixel geometry
//!
//! The only place day offsets become pixels. Everything upstream works in
//! day space and stays independent of the zoom level.

use serde::Serialize;

use crate::segments::finite_or;
use crate::timing::Schedule;

const DEFAULT_PIXELS_PER_UNIT: f64 = 24.0;

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Scale {
    pub pixels_per_day: f64,
}

impl Scale {
    /// `pixels_per_unit / date_scale`, with zero or non-finite inputs
    /// replaced by defaults
    pub fn new(pixels_per_unit: f64, date_scale: f64) -> Self {
        let ppu = finite_or(pixels_per_unit, DEFAULT_PIXELS_PER_UNIT);
        let ppu = if ppu > 0.0 { ppu } else { DEFAULT_PIXELS_PER_UNIT };
        let days = finite_or(date_scale, 1.0);
        let days = if days > 0.0 { days } else { 1.0 };
        Self {
            pixels_per_day: ppu / days,
        }
    }

    pub fn day_to_x(&self, day: f64) -> f64 {
        day * self.pixels_per_day
    }

    pub fn x_to_day(&self, x: f64) -> f64 {
        finite_or(x, 0.0) / self.pixels_per_day
    }
}

/// Axis-aligned rectangle in chart pixels
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    /// Rectangle spanned by two corners in any order
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        Self {
            left: a.0.min(b.0),
            top: a.1.min(b.1),
            right: a.0.max(b.0),
            bottom: a.1.max(b.1),
        }
    }

    /// AABB overlap, shared edges count
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left <= other.right
            && other.left <= self.right
            && self.top <= other.bottom
            && other.top <= self.bottom
    }
}

/// Bar rectangle spanning the full row band vertically
pub fn bar_rect(row: usize, start_day: f64, duration_days: f64, scale: Scale, row_height: f64) -> Rect {
    let top = row as f64 * row_height;
    Rect {
        left: scale.day_to_x(start_day),
        top,
        right: scale.day_to_x(start_day + duration_days),
        bottom: top + row_height,
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BarGeometry {
    pub id: String,
    pub row: usize,
    pub bar: Rect,
    pub red: Rect,
}

pub fn bars(schedule: &Schedule, scale: Scale, row_height: f64) -> Vec<BarGeometry> {
    schedule
        .timings
        .iter()
        .enumerate()
        .map(|(row, timing)| BarGeometry {
            id: timing.id.clone(),
            row,
            bar: bar_rect(row, timing.start_day, timing.duration_days, scale, row_height),
            red: bar_rect(row, timing.red_start, timing.red_end - timing.red_start, scale, row_height),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_guards_bad_input() {
        assert_eq!(Scale::new(30.0, 10.0).pixels_per_day, 3.0);
        assert_eq!(Scale::new(0.0, 0.0).pixels_per_day, DEFAULT_PIXELS_PER_UNIT);
        assert_eq!(Scale::new(f64::NAN, -1.0).pixels_per_day, DEFAULT_PIXELS_PER_UNIT);
    }

    #[test]
    fn bar_geometry_uses_row_band() {
        let rect = bar_rect(2, 5.0, 10.0, Scale::new(10.0, 1.0), 30.0);
        assert_eq!(rect, Rect { left: 50.0, top: 60.0, right: 150.0, bottom: 90.0 });
        assert!(rect.intersects(&Rect::from_corners((140.0, 100.0), (200.0, 85.0))));
        assert!(!rect.intersects(&Rect::from_corners((151.0, 60.0), (200.0, 90.0))));
    }
}
