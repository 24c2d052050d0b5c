//! Engine State Container
//!
//! Holds the project data behind the WASM engine: the ordered task store,
//! sub-tasks, links, configuration and the active pointer gesture.
//! Everything derived (timing, critical path, layout) is recomputed from this
//! state on demand and never stored.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::config::TimelineConfig;
use crate::error::EngineError;
use crate::interaction::{
    self, Endpoint, InteractionController, LayoutContext, Outcome, Placement, Preview, Selection, Target,
};
use crate::layout::{self, BarGeometry};
use crate::links;
use crate::segments::{finite_or, Segment, EPSILON};
use crate::timeline;
use crate::timing::{self, Schedule};
use crate::types::{self, Anchor, Link, LinkType, SubTask, Task, Timeline};

/// Outcome of a finished gesture and whether it changed the project
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GestureResult {
    pub outcome: Outcome,
    pub committed: bool,
}

/// Project state container
#[derive(Debug, Default)]
pub struct ProjectState {
    /// Tasks indexed by ID for O(1) lookup
    pub tasks: HashMap<String, Task>,

    /// Row order, which is also the dependency chain of the timing pass
    pub task_order: Vec<String>,

    pub subtasks: Vec<SubTask>,
    pub links: Vec<Link>,
    pub config: TimelineConfig,

    /// Initialization flag
    pub initialized: bool,

    gestures: InteractionController,
}

impl ProjectState {
    /// Create new empty state
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(&mut self, tasks: Vec<Task>, config: TimelineConfig) {
        self.clear();
        self.load_tasks(tasks);
        self.config = config;
        self.initialized = true;
        log::info!("project initialized with {} tasks", self.task_order.len());
    }

    fn ensure_initialized(&self) -> Result<(), EngineError> {
        if self.initialized {
            Ok(())
        } else {
            Err(EngineError::NotInitialized)
        }
    }

    // === Tasks ===

    /// Replace every task. A repeated id keeps its first row position and the
    /// last record. Sub-tasks follow their parent's new start.
    pub fn load_tasks(&mut self, tasks: Vec<Task>) {
        let before = self.schedule();
        self.tasks.clear();
        self.task_order.clear();
        for task in tasks {
            if self.tasks.contains_key(&task.id) {
                log::warn!("duplicate task id {}, keeping the later record", task.id);
            } else {
                self.task_order.push(task.id.clone());
            }
            self.tasks.insert(task.id.clone(), task);
        }
        self.prune_orphans();
        self.subtasks = self.carried_subtasks(&before, &self.schedule());
    }

    /// Add a new task at the end, or replace one with the same id in place.
    /// `Ok(false)` means the replacement would push a sub-task into red time.
    pub fn add_task(&mut self, task: Task) -> Result<bool, EngineError> {
        self.ensure_initialized()?;
        let task_id = task.id.clone();
        if task_id.is_empty() {
            return Err(EngineError::InvalidRecord {
                what: "task",
                reason: "missing id".to_string(),
            });
        }

        Ok(self.reflow(|state| {
            state.tasks.insert(task_id.clone(), task);
            if !state.task_order.contains(&task_id) {
                state.task_order.push(task_id);
            }
        }))
    }

    /// Partial update from a JSON object. Absent fields are left alone.
    /// `Ok(false)` means the update was rolled back.
    pub fn update_task(&mut self, id: &str, updates: &Value) -> Result<bool, EngineError> {
        self.ensure_initialized()?;
        let obj = updates.as_object().ok_or_else(|| EngineError::InvalidRecord {
            what: "task update",
            reason: "expected an object".to_string(),
        })?;
        self.require_task(id)?;
        Ok(self.reflow(|state| {
            if let Some(task) = state.tasks.get_mut(id) {
                types::apply_task_fields(task, obj);
            }
        }))
    }

    /// Delete a task with its sub-tasks and every link touching either.
    /// Rows below slide up and take their sub-tasks with them.
    pub fn delete_task(&mut self, task_id: &str) -> Result<(), EngineError> {
        self.ensure_initialized()?;
        let before = self.schedule();
        if self.tasks.remove(task_id).is_none() {
            return Err(EngineError::TaskNotFound(task_id.to_string()));
        }
        self.task_order.retain(|id| id != task_id);
        self.prune_orphans();
        self.subtasks = self.carried_subtasks(&before, &self.schedule());
        Ok(())
    }

    /// Move a task to `index` in the row order (clamped to the list)
    pub fn reorder_task(&mut self, task_id: &str, index: usize) -> Result<bool, EngineError> {
        self.ensure_initialized()?;
        let from = self
            .task_order
            .iter()
            .position(|id| id == task_id)
            .ok_or_else(|| EngineError::TaskNotFound(task_id.to_string()))?;
        Ok(self.reflow(|state| {
            let id = state.task_order.remove(from);
            let to = index.min(state.task_order.len());
            state.task_order.insert(to, id);
        }))
    }

    pub fn pin_task(&mut self, task_id: &str, start_day: f64) -> Result<bool, EngineError> {
        self.ensure_initialized()?;
        if !start_day.is_finite() {
            return Err(EngineError::InvalidArgument(format!("start day {start_day} is not finite")));
        }
        self.require_task(task_id)?;
        Ok(self.reflow(|state| {
            if let Some(task) = state.tasks.get_mut(task_id) {
                task.pinned_start = Some(start_day.max(0.0));
            }
        }))
    }

    pub fn unpin_task(&mut self, task_id: &str) -> Result<bool, EngineError> {
        self.ensure_initialized()?;
        self.require_task(task_id)?;
        Ok(self.reflow(|state| {
            if let Some(task) = state.tasks.get_mut(task_id) {
                task.pinned_start = None;
            }
        }))
    }

    fn require_task(&self, id: &str) -> Result<(), EngineError> {
        if self.tasks.contains_key(id) {
            Ok(())
        } else {
            Err(EngineError::TaskNotFound(id.to_string()))
        }
    }

    /// Run a task-level change and carry every sub-task along with its
    /// parent's start. The change is undone if a sub-task that fitted before
    /// no longer fits its parent afterwards.
    fn reflow(&mut self, change: impl FnOnce(&mut Self)) -> bool {
        let before = self.schedule();
        let saved_tasks = self.tasks.clone();
        let saved_order = self.task_order.clone();

        change(self);
        let after = self.schedule();
        let carried = self.carried_subtasks(&before, &after);

        let broken = carried.iter().zip(&self.subtasks).find(|(moved, original)| {
            fits_parent(original, &self.subtasks, &before) && !fits_parent(moved, &carried, &after)
        });
        if let Some((moved, _)) = broken {
            log::debug!("task change rejected: sub-task {} would leave parallel time", moved.id);
            self.tasks = saved_tasks;
            self.task_order = saved_order;
            return false;
        }
        self.subtasks = carried;
        true
    }

    /// Sub-tasks shifted by their parent's start delta between two schedules
    fn carried_subtasks(&self, before: &Schedule, after: &Schedule) -> Vec<SubTask> {
        self.subtasks
            .iter()
            .map(|sub| {
                let delta = match (before.get(&sub.item_id), after.get(&sub.item_id)) {
                    (Some(old), Some(new)) => new.start_day - old.start_day,
                    _ => 0.0,
                };
                if delta.abs() <= EPSILON {
                    return sub.clone();
                }
                SubTask {
                    start_day: (sub.start_day + delta).max(0.0),
                    ..sub.clone()
                }
            })
            .collect()
    }

    /// Get all tasks in order
    pub fn get_tasks_ordered(&self) -> Vec<Task> {
        self.task_order
            .iter()
            .filter_map(|id| self.tasks.get(id).cloned())
            .collect()
    }

    /// Get task count
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    // === Sub-tasks ===

    /// Replace every sub-task and link, e.g. from persisted data.
    /// Records pointing at unknown tasks are dropped.
    pub fn load_children(&mut self, subtasks: Vec<SubTask>, links: Vec<Link>) {
        self.subtasks = subtasks;
        self.links = links;
        self.prune_orphans();
    }

    /// Add a sub-task if it fits in its parent's parallel time.
    ///
    /// `Ok(false)` means the placement was rejected and nothing changed.
    /// An empty id is replaced by a fresh one.
    pub fn add_subtask(&mut self, mut subtask: SubTask) -> Result<bool, EngineError> {
        self.ensure_initialized()?;
        if !self.tasks.contains_key(&subtask.item_id) {
            return Err(EngineError::TaskNotFound(subtask.item_id));
        }
        if subtask.id.is_empty() {
            subtask.id = new_subtask_id();
        } else if self.subtasks.iter().any(|s| s.id == subtask.id) {
            return Err(EngineError::InvalidRecord {
                what: "sub-task",
                reason: format!("duplicate id {}", subtask.id),
            });
        }

        let schedule = self.schedule();
        if !self.subtask_placement_ok(&subtask, &schedule) {
            log::debug!("sub-task {} rejected under {}", subtask.id, subtask.item_id);
            return Ok(false);
        }
        self.subtasks.push(subtask);
        Ok(true)
    }

    /// Partial sub-task update, validated like an add
    pub fn update_subtask(&mut self, id: &str, updates: &Value) -> Result<bool, EngineError> {
        self.ensure_initialized()?;
        let obj = updates.as_object().ok_or_else(|| EngineError::InvalidRecord {
            what: "sub-task update",
            reason: "expected an object".to_string(),
        })?;
        let index = self.subtask_index(id)?;

        let mut candidate = self.subtasks[index].clone();
        types::apply_subtask_fields(&mut candidate, obj);
        if !self.tasks.contains_key(&candidate.item_id) {
            return Err(EngineError::TaskNotFound(candidate.item_id));
        }

        let schedule = self.schedule();
        if !self.subtask_placement_ok(&candidate, &schedule) {
            log::debug!("sub-task {id} update rejected");
            return Ok(false);
        }
        self.subtasks[index] = candidate;
        Ok(true)
    }

    pub fn delete_subtask(&mut self, id: &str) -> Result<(), EngineError> {
        self.ensure_initialized()?;
        let index = self.subtask_index(id)?;
        self.subtasks.remove(index);
        self.prune_orphans();
        Ok(())
    }

    fn subtask_index(&self, id: &str) -> Result<usize, EngineError> {
        self.subtasks
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| EngineError::SubTaskNotFound(id.to_string()))
    }

    /// Minimum length, then the same fit rule as a drawn sub-task
    fn subtask_placement_ok(&self, candidate: &SubTask, schedule: &Schedule) -> bool {
        if candidate.duration_days < self.config.min_subtask_days - EPSILON {
            return false;
        }
        let Some(parent) = schedule.get(&candidate.item_id) else {
            return false;
        };
        let siblings: Vec<Segment> = self
            .subtasks
            .iter()
            .filter(|s| s.item_id == candidate.item_id && s.id != candidate.id)
            .map(SubTask::range)
            .collect();
        interaction::subtask_fits(candidate.range(), parent, siblings.iter())
    }

    // === Links ===

    fn endpoint_exists(&self, id: &str) -> bool {
        self.tasks.contains_key(id) || self.subtasks.iter().any(|s| s.id == id)
    }

    /// Add a link unless it duplicates an existing one. `Ok(false)` means
    /// rejected.
    pub fn add_link(&mut self, link: Link) -> Result<bool, EngineError> {
        self.ensure_initialized()?;
        for endpoint in [&link.from, &link.to] {
            if !self.endpoint_exists(endpoint) {
                return Err(EngineError::InvalidRecord {
                    what: "link",
                    reason: format!("unknown endpoint {endpoint}"),
                });
            }
        }
        let same_anchor = matches!(link.link_type, LinkType::StartToStart | LinkType::FinishToFinish);
        if link.from == link.to && same_anchor {
            return Ok(false);
        }
        if self.links.iter().any(|l| l.id == link.id) || links::is_duplicate(&self.links, &link) {
            log::debug!("link {} -> {} rejected as duplicate", link.from, link.to);
            return Ok(false);
        }
        self.links.push(link);
        Ok(true)
    }

    /// Build and add a link from two anchors
    pub fn connect(&mut self, from: Endpoint, to: Endpoint) -> Result<Option<Link>, EngineError> {
        if from == to {
            return Ok(None);
        }
        let link = links::build(&from.id, from.anchor, &to.id, to.anchor);
        Ok(self.add_link(link.clone())?.then_some(link))
    }

    pub fn remove_link(&mut self, id: &str) -> Result<(), EngineError> {
        self.ensure_initialized()?;
        let before = self.links.len();
        self.links.retain(|l| l.id != id);
        if self.links.len() == before {
            return Err(EngineError::LinkNotFound(id.to_string()));
        }
        Ok(())
    }

    pub fn set_link_lag(&mut self, id: &str, lag: f64) -> Result<(), EngineError> {
        self.ensure_initialized()?;
        if !lag.is_finite() {
            return Err(EngineError::InvalidArgument(format!("lag {lag} is not finite")));
        }
        let link = self
            .links
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| EngineError::LinkNotFound(id.to_string()))?;
        link.lag = lag;
        Ok(())
    }

    /// Drop sub-tasks of missing tasks, links to missing endpoints and
    /// selections of either
    fn prune_orphans(&mut self) {
        let tasks = &self.tasks;
        self.subtasks.retain(|s| tasks.contains_key(&s.item_id));

        let subtasks = &self.subtasks;
        let exists = |id: &str| tasks.contains_key(id) || subtasks.iter().any(|s| s.id == id);
        self.links.retain(|l| exists(&l.from) && exists(&l.to));

        self.gestures
            .retain_selection(|id| tasks.contains_key(id), |id| subtasks.iter().any(|s| s.id == id));
    }

    // === Calculation ===

    fn schedule(&self) -> Schedule {
        timing::compute(&self.get_tasks_ordered())
    }

    pub fn calculate(&self) -> Result<Timeline, EngineError> {
        self.ensure_initialized()?;
        Ok(timeline::build(&self.get_tasks_ordered(), &self.subtasks, &self.config))
    }

    /// Pixel rectangles for every bar at the current zoom
    pub fn bars(&self) -> Result<Vec<BarGeometry>, EngineError> {
        self.ensure_initialized()?;
        Ok(layout::bars(&self.schedule(), self.config.scale(), self.config.row_height))
    }

    // === Gestures ===

    fn with_layout<R>(&mut self, f: impl FnOnce(&mut InteractionController, &LayoutContext<'_>) -> R) -> R {
        let schedule = self.schedule();
        let ctx = LayoutContext {
            schedule: &schedule,
            subtasks: &self.subtasks,
            links: &self.links,
            config: &self.config,
        };
        f(&mut self.gestures, &ctx)
    }

    pub fn begin_drag(&mut self, target: Target, x: f64) -> Result<bool, EngineError> {
        self.ensure_initialized()?;
        Ok(self.with_layout(|ctl, ctx| ctl.begin_drag(target, x, ctx)))
    }

    pub fn begin_resize(&mut self, target: Target, x: f64) -> Result<bool, EngineError> {
        self.ensure_initialized()?;
        Ok(self.with_layout(|ctl, ctx| ctl.begin_resize(target, x, ctx)))
    }

    pub fn begin_draw(&mut self, item_id: &str, x: f64) -> Result<bool, EngineError> {
        self.ensure_initialized()?;
        Ok(self.with_layout(|ctl, ctx| ctl.begin_draw(item_id, x, ctx)))
    }

    pub fn begin_link(&mut self, from: Endpoint) -> Result<(), EngineError> {
        self.ensure_initialized()?;
        self.gestures.begin_link(from);
        Ok(())
    }

    pub fn begin_selection(&mut self, x: f64, y: f64) -> Result<(), EngineError> {
        self.ensure_initialized()?;
        self.gestures.begin_selection(x, y);
        Ok(())
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> Result<Option<Preview>, EngineError> {
        self.ensure_initialized()?;
        if !self.gestures.is_active() {
            return Ok(None);
        }
        Ok(self.with_layout(|ctl, ctx| ctl.pointer_move(x, y, ctx)))
    }

    pub fn pointer_up(&mut self, x: f64, y: f64) -> Result<GestureResult, EngineError> {
        self.ensure_initialized()?;
        let outcome = self.with_layout(|ctl, ctx| ctl.pointer_up(x, y, ctx));
        Ok(self.commit(outcome))
    }

    pub fn click_anchor(&mut self, endpoint: Endpoint) -> Result<GestureResult, EngineError> {
        self.ensure_initialized()?;
        let outcome = self.with_layout(|ctl, ctx| ctl.click_anchor(endpoint, ctx));
        Ok(self.commit(outcome))
    }

    pub fn click_background(&mut self) -> GestureResult {
        let outcome = self.gestures.click_background();
        self.commit(outcome)
    }

    pub fn cancel_gesture(&mut self) -> Outcome {
        self.gestures.cancel()
    }

    pub fn active_gesture(&self) -> Option<&'static str> {
        self.gestures.active_gesture()
    }

    pub fn select(&mut self, target: &Target, additive: bool) {
        self.gestures.select(target, additive);
    }

    pub fn clear_selection(&mut self) {
        self.gestures.clear_selection();
    }

    pub fn selection(&self) -> &Selection {
        self.gestures.selection()
    }

    fn commit(&mut self, outcome: Outcome) -> GestureResult {
        let committed = self.apply(&outcome);
        GestureResult { outcome, committed }
    }

    /// Commit a gesture outcome. Returns whether project data changed.
    ///
    /// Task moves pin the task at its new start. Task moves and resizes carry
    /// every sub-task along with its parent and are undone if that pushes one
    /// into red time. Sub-task moves and resizes are re-validated against the
    /// current state as a group and dropped whole if any member fails.
    pub fn apply(&mut self, outcome: &Outcome) -> bool {
        match outcome {
            Outcome::Moved(moved) => self.apply_moves(&moved.placements),
            Outcome::Resized(resized) => self.apply_resize(&resized.target, resized.duration_days),
            Outcome::SubTaskDrafted(draft) => {
                let subtask = SubTask {
                    id: new_subtask_id(),
                    item_id: draft.item_id.clone(),
                    start_day: draft.start_day,
                    duration_days: draft.duration_days,
                    label: String::new(),
                };
                self.add_subtask(subtask).unwrap_or(false)
            }
            Outcome::Linked(link) => self.add_link(link.clone()).unwrap_or(false),
            _ => false,
        }
    }

    fn apply_moves(&mut self, placements: &[Placement]) -> bool {
        let mut task_moves: Vec<(String, f64)> = Vec::new();
        let mut sub_moves: Vec<(usize, f64)> = Vec::new();

        for placement in placements {
            let start = finite_or(placement.start_day, 0.0).max(0.0);
            match &placement.target {
                Target::Task(id) => {
                    if self.tasks.contains_key(id) {
                        task_moves.push((id.clone(), start));
                    }
                }
                Target::SubTask(id) => {
                    if let Ok(index) = self.subtask_index(id) {
                        sub_moves.push((index, start));
                    }
                }
            }
        }

        let moved_tasks = !task_moves.is_empty();
        if moved_tasks {
            let pinned = self.reflow(|state| {
                for (id, start) in task_moves {
                    if let Some(task) = state.tasks.get_mut(&id) {
                        task.pinned_start = Some(start);
                    }
                }
            });
            if !pinned {
                return false;
            }
        }

        if !sub_moves.is_empty() {
            let schedule = self.schedule();
            let proposed: Vec<(&SubTask, Segment)> = sub_moves
                .iter()
                .map(|&(index, start)| {
                    let sub = &self.subtasks[index];
                    (sub, Segment::new(start, start + sub.duration_days))
                })
                .collect();
            if !interaction::placements_fit(&proposed, &self.subtasks, &schedule) {
                log::debug!("sub-task move rejected on commit");
                return moved_tasks;
            }
        }

        let changed = moved_tasks || !sub_moves.is_empty();
        for (index, start) in sub_moves {
            self.subtasks[index].start_day = start;
        }
        changed
    }

    fn apply_resize(&mut self, target: &Target, duration_days: f64) -> bool {
        let duration = finite_or(duration_days, 0.0);
        match target {
            Target::Task(id) => {
                if !self.tasks.contains_key(id) {
                    return false;
                }
                let duration = duration.max(self.config.min_task_days);
                self.reflow(|state| {
                    if let Some(task) = state.tasks.get_mut(id) {
                        task.duration_days = duration;
                    }
                })
            }
            Target::SubTask(id) => {
                let Ok(index) = self.subtask_index(id) else {
                    return false;
                };
                let candidate = SubTask {
                    duration_days: duration,
                    ..self.subtasks[index].clone()
                };
                let schedule = self.schedule();
                if !self.subtask_placement_ok(&candidate, &schedule) {
                    return false;
                }
                self.subtasks[index] = candidate;
                true
            }
        }
    }

    /// Clear all state
    pub fn clear(&mut self) {
        self.tasks.clear();
        self.task_order.clear();
        self.subtasks.clear();
        self.links.clear();
        self.config = TimelineConfig::default();
        self.gestures = InteractionController::new();
        self.initialized = false;
    }
}

/// Placement rule of `subtask_fits` for a sub-task already in `all`
fn fits_parent(sub: &SubTask, all: &[SubTask], schedule: &Schedule) -> bool {
    let Some(parent) = schedule.get(&sub.item_id) else {
        return false;
    };
    let siblings: Vec<Segment> = all
        .iter()
        .filter(|s| s.item_id == sub.item_id && s.id != sub.id)
        .map(SubTask::range)
        .collect();
    interaction::subtask_fits(sub.range(), parent, siblings.iter())
}

fn new_subtask_id() -> String {
    format!("sub-{}", Uuid::new_v4())
}

/// Endpoint from loose JS input
pub fn endpoint(id: &str, anchor: &str) -> Result<Endpoint, EngineError> {
    let anchor = Anchor::parse(anchor).ok_or_else(|| EngineError::InvalidArgument(format!("unknown anchor {anchor:?}")))?;
    Ok(Endpoint {
        id: id.to_string(),
        anchor,
    })
}
