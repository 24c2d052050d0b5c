//! Construction Estimate Timeline - WASM Engine
//!
//! This crate computes the estimate timeline (start days, critical red ranges,
//! critical-path connectors, crew load) for an ordered list of construction
//! work items and drives the pointer interactions that edit it. It exposes a
//! `TimelineEngine` class to JavaScript.
//!
//! ## Usage from JavaScript
//!
//! ```javascript
//! import init, { TimelineEngine } from 'timeline_wasm';
//!
//! await init();
//! const engine = new TimelineEngine();
//! engine.initialize(items, { pixelsPerUnit: 24, dateScale: 1 });
//! const timeline = engine.calculate();
//! ```

pub mod config;
pub mod critical_path;
pub mod date_utils;
pub mod engine_state;
pub mod error;
pub mod interaction;
pub mod layout;
pub mod links;
pub mod segments;
pub mod timeline;
pub mod timing;
pub mod types;
mod utils;

use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;

use crate::config::TimelineConfig;
use crate::engine_state::{endpoint, ProjectState};
use crate::error::EngineError;
use crate::interaction::Target;
use crate::types::{link_from_value, list_from_value, subtask_draft_from_value, subtask_from_value, task_from_value};

fn from_js(value: JsValue, what: &'static str) -> Result<Value, EngineError> {
    if value.is_undefined() || value.is_null() {
        return Ok(Value::Null);
    }
    serde_wasm_bindgen::from_value(value).map_err(|e| EngineError::Deserialize {
        what,
        message: e.to_string(),
    })
}

fn to_js<T: Serialize>(value: &T, what: &'static str) -> Result<JsValue, EngineError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| EngineError::Serialize {
            what,
            message: e.to_string(),
        })
}

fn config_from_js(value: JsValue) -> Result<TimelineConfig, EngineError> {
    match from_js(value, "config")? {
        Value::Null => Ok(TimelineConfig::default()),
        value => serde_json::from_value(value).map_err(|e| EngineError::Deserialize {
            what: "config",
            message: e.to_string(),
        }),
    }
}

fn target(kind: &str, id: String) -> Result<Target, EngineError> {
    Target::parse(kind, id).ok_or_else(|| EngineError::InvalidArgument(format!("unknown target kind {kind:?}")))
}

/// The timeline engine exposed to JavaScript
///
/// Holds the work items, sub-tasks, links and display configuration, and
/// recomputes the timeline from them on every `calculate`.
#[wasm_bindgen]
pub struct TimelineEngine {
    state: ProjectState,
}

#[wasm_bindgen]
impl TimelineEngine {
    /// Create a new TimelineEngine instance
    #[wasm_bindgen(constructor)]
    pub fn new() -> TimelineEngine {
        utils::set_panic_hook();
        log::debug!("TimelineEngine created");
        TimelineEngine {
            state: ProjectState::new(),
        }
    }

    /// Initialize the engine with work items and configuration
    ///
    /// # Arguments
    /// * `tasks_val` - JavaScript array of item records (camelCase or
    ///   snake_case fields)
    /// * `config_val` - JavaScript config object, may be partial or undefined
    pub fn initialize(&mut self, tasks_val: JsValue, config_val: JsValue) -> Result<(), JsValue> {
        let tasks = list_from_value(&from_js(tasks_val, "tasks")?, "task", task_from_value)?;
        let config = config_from_js(config_val)?;
        utils::init_logger(config.log_level());
        self.state.initialize(tasks, config);
        Ok(())
    }

    /// Load persisted sub-tasks and links
    pub fn load_children(&mut self, subtasks_val: JsValue, links_val: JsValue) -> Result<(), JsValue> {
        let subtasks = list_from_value(&from_js(subtasks_val, "sub-tasks")?, "sub-task", subtask_from_value)?;
        let links = list_from_value(&from_js(links_val, "links")?, "link", link_from_value)?;
        self.state.load_children(subtasks, links);
        log::debug!(
            "loaded {} sub-tasks, {} links",
            self.state.subtasks.len(),
            self.state.links.len()
        );
        Ok(())
    }

    /// Sync all items (bulk replace, keeps sub-tasks of surviving items)
    pub fn sync_tasks(&mut self, tasks_val: JsValue) -> Result<(), JsValue> {
        let tasks = list_from_value(&from_js(tasks_val, "tasks")?, "task", task_from_value)?;
        self.state.load_tasks(tasks);
        log::debug!("synced {} tasks", self.state.task_count());
        Ok(())
    }

    /// Replace the display configuration
    pub fn update_config(&mut self, config_val: JsValue) -> Result<(), JsValue> {
        let config = config_from_js(config_val)?;
        utils::init_logger(config.log_level());
        self.state.config = config;
        Ok(())
    }

    /// Returns false when replacing an existing task would push one of its
    /// sub-tasks into critical time
    pub fn add_task(&mut self, task_val: JsValue) -> Result<bool, JsValue> {
        let task = task_from_value(&from_js(task_val, "task")?)?;
        Ok(self.state.add_task(task)?)
    }

    /// Update an existing item
    ///
    /// # Arguments
    /// * `task_id` - ID of the item to update
    /// * `updates_val` - JavaScript object with the fields to change
    ///
    /// Returns false, leaving the item untouched, when the change would move
    /// its critical range over one of its sub-tasks
    pub fn update_task(&mut self, task_id: String, updates_val: JsValue) -> Result<bool, JsValue> {
        let updates = from_js(updates_val, "task update")?;
        Ok(self.state.update_task(&task_id, &updates)?)
    }

    /// Delete an item with its sub-tasks and links
    pub fn delete_task(&mut self, task_id: String) -> Result<(), JsValue> {
        Ok(self.state.delete_task(&task_id)?)
    }

    pub fn reorder_task(&mut self, task_id: String, index: usize) -> Result<bool, JsValue> {
        Ok(self.state.reorder_task(&task_id, index)?)
    }

    pub fn pin_task(&mut self, task_id: String, start_day: f64) -> Result<bool, JsValue> {
        Ok(self.state.pin_task(&task_id, start_day)?)
    }

    pub fn unpin_task(&mut self, task_id: String) -> Result<bool, JsValue> {
        Ok(self.state.unpin_task(&task_id)?)
    }

    /// Returns false when the sub-task would overlap a sibling or the
    /// parent's critical range
    pub fn add_subtask(&mut self, subtask_val: JsValue) -> Result<bool, JsValue> {
        let subtask = subtask_draft_from_value(&from_js(subtask_val, "sub-task")?)?;
        Ok(self.state.add_subtask(subtask)?)
    }

    pub fn update_subtask(&mut self, id: String, updates_val: JsValue) -> Result<bool, JsValue> {
        let updates = from_js(updates_val, "sub-task update")?;
        Ok(self.state.update_subtask(&id, &updates)?)
    }

    pub fn delete_subtask(&mut self, id: String) -> Result<(), JsValue> {
        Ok(self.state.delete_subtask(&id)?)
    }

    /// Returns false for duplicates
    pub fn add_link(&mut self, link_val: JsValue) -> Result<bool, JsValue> {
        let link = link_from_value(&from_js(link_val, "link")?)?;
        Ok(self.state.add_link(link)?)
    }

    /// Link two anchors directly. Returns the new link, or null if rejected.
    pub fn connect(&mut self, from_id: String, from_anchor: String, to_id: String, to_anchor: String) -> Result<JsValue, JsValue> {
        let from = endpoint(&from_id, &from_anchor)?;
        let to = endpoint(&to_id, &to_anchor)?;
        let link = self.state.connect(from, to)?;
        Ok(to_js(&link, "link")?)
    }

    pub fn remove_link(&mut self, id: String) -> Result<(), JsValue> {
        Ok(self.state.remove_link(&id)?)
    }

    pub fn set_link_lag(&mut self, id: String, lag: f64) -> Result<(), JsValue> {
        Ok(self.state.set_link_lag(&id, lag)?)
    }

    /// Run the timing pass and critical-path analysis
    ///
    /// # Returns
    /// A JavaScript object containing:
    /// - `rows`: one entry per item with computed days and flags
    /// - `connectors`: critical-path lines in day/row space
    /// - `dailyLoad`: crew count per day
    /// - `stats`: calculation statistics
    pub fn calculate(&self) -> Result<JsValue, JsValue> {
        let timeline = self.state.calculate()?;

        log::info!(
            "timeline complete: {} tasks, {} critical, {:.2}ms",
            timeline.stats.task_count,
            timeline.stats.critical_count,
            timeline.stats.calc_time
        );

        Ok(to_js(&timeline, "timeline")?)
    }

    /// Bar rectangles in pixels at the current zoom
    pub fn get_bars(&self) -> Result<JsValue, JsValue> {
        Ok(to_js(&self.state.bars()?, "bars")?)
    }

    // === Gestures ===

    /// Pointer-down on a bar body. `kind` is "task" or "subtask".
    pub fn begin_drag(&mut self, kind: String, id: String, x: f64) -> Result<bool, JsValue> {
        Ok(self.state.begin_drag(target(&kind, id)?, x)?)
    }

    /// Pointer-down on a bar's end handle
    pub fn begin_resize(&mut self, kind: String, id: String, x: f64) -> Result<bool, JsValue> {
        Ok(self.state.begin_resize(target(&kind, id)?, x)?)
    }

    /// Pointer-down on a row in sub-task drawing mode
    pub fn begin_draw(&mut self, item_id: String, x: f64) -> Result<bool, JsValue> {
        Ok(self.state.begin_draw(&item_id, x)?)
    }

    /// Start a link draft from an anchor; `pointer_move` then returns the
    /// rubber-band line
    pub fn begin_link(&mut self, id: String, anchor: String) -> Result<(), JsValue> {
        Ok(self.state.begin_link(endpoint(&id, &anchor)?)?)
    }

    pub fn begin_selection(&mut self, x: f64, y: f64) -> Result<(), JsValue> {
        Ok(self.state.begin_selection(x, y)?)
    }

    /// Preview for the active gesture, or null
    pub fn pointer_move(&mut self, x: f64, y: f64) -> Result<JsValue, JsValue> {
        let preview = self.state.pointer_move(x, y)?;
        Ok(to_js(&preview, "preview")?)
    }

    /// Finish the active gesture. Returns `{ outcome, committed }`.
    pub fn pointer_up(&mut self, x: f64, y: f64) -> Result<JsValue, JsValue> {
        let result = self.state.pointer_up(x, y)?;
        Ok(to_js(&result, "gesture result")?)
    }

    /// Click on an anchor dot in link mode
    pub fn click_anchor(&mut self, id: String, anchor: String) -> Result<JsValue, JsValue> {
        let result = self.state.click_anchor(endpoint(&id, &anchor)?)?;
        Ok(to_js(&result, "gesture result")?)
    }

    pub fn click_background(&mut self) -> Result<JsValue, JsValue> {
        Ok(to_js(&self.state.click_background(), "gesture result")?)
    }

    pub fn cancel_gesture(&mut self) -> Result<JsValue, JsValue> {
        Ok(to_js(&self.state.cancel_gesture(), "outcome")?)
    }

    /// Name of the active gesture, if any
    pub fn active_gesture(&self) -> Option<String> {
        self.state.active_gesture().map(str::to_string)
    }

    pub fn select(&mut self, kind: String, id: String, additive: bool) -> Result<(), JsValue> {
        let target = target(&kind, id)?;
        self.state.select(&target, additive);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.state.clear_selection();
    }

    pub fn get_selection(&self) -> Result<JsValue, JsValue> {
        Ok(to_js(self.state.selection(), "selection")?)
    }

    // === Accessors ===

    /// Get current item count
    pub fn task_count(&self) -> usize {
        self.state.task_count()
    }

    /// Check if engine is initialized
    pub fn is_initialized(&self) -> bool {
        self.state.initialized
    }

    /// Get all items in row order
    pub fn get_tasks(&self) -> Result<JsValue, JsValue> {
        Ok(to_js(&self.state.get_tasks_ordered(), "tasks")?)
    }

    pub fn get_subtasks(&self) -> Result<JsValue, JsValue> {
        Ok(to_js(&self.state.subtasks, "sub-tasks")?)
    }

    pub fn get_links(&self) -> Result<JsValue, JsValue> {
        Ok(to_js(&self.state.links, "links")?)
    }

    /// Dispose and free resources
    pub fn dispose(&mut self) {
        self.state.clear();
        log::debug!("TimelineEngine disposed");
    }
}

impl Default for TimelineEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Module initialization - called when WASM module is loaded
#[wasm_bindgen(start)]
pub fn main() {
    utils::set_panic_hook();
    utils::init_logger(log::LevelFilter::Info);
    log::info!("timeline WASM module loaded");
}
