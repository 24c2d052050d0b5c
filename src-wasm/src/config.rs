//! Engine configuration
//!
//! Passed in from JS at `initialize` (like the scheduling calendar) and
//! replaceable later with `update_config`. Every field has a default so a
//! partial object is enough.

use serde::{Deserialize, Serialize};

use crate::layout::Scale;
use crate::types::Calendar;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TimelineConfig {
    /// Pixels per timeline column
    pub pixels_per_unit: f64,
    /// Days per timeline column (zoom level: 1, 5, 10, 30...)
    pub date_scale: f64,
    /// Height of one task row band in pixels
    pub row_height: f64,
    /// Snap distance for drag/resize/draw, in pixels
    pub snap_threshold_px: f64,
    /// Pointer travel below this is a click, not a move
    pub click_threshold_px: f64,
    pub min_task_days: f64,
    pub min_subtask_days: f64,
    /// Remarks value that marks a task as parallel work
    pub parallel_remark: String,
    /// Route debug records to the console
    pub debug: bool,
    pub calendar: Option<Calendar>,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            pixels_per_unit: 24.0,
            date_scale: 1.0,
            row_height: 36.0,
            snap_threshold_px: 14.0,
            click_threshold_px: 3.0,
            min_task_days: 1.0,
            min_subtask_days: 0.1,
            parallel_remark: "parallel".to_string(),
            debug: false,
            calendar: None,
        }
    }
}

impl TimelineConfig {
    pub fn scale(&self) -> Scale {
        Scale::new(self.pixels_per_unit, self.date_scale)
    }

    pub fn log_level(&self) -> log::LevelFilter {
        if self.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}
