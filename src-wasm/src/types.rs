//! Type definitions for the timeline engine
//!
//! Canonical records serialize camelCase to match JS.
//! Incoming records pass through the `*_from_value` adapters, which resolve
//! the historical camelCase/snake_case spellings and coerce loose numbers.
//! Core modules only ever see the canonical field names.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::critical_path::Connector;
use crate::error::EngineError;
use crate::segments::Segment;

// Field spellings, first present non-null name wins
const ID_KEYS: &[&str] = &["id"];
const MAIN_CATEGORY_KEYS: &[&str] = &["mainCategory", "main_category"];
const PROCESS_KEYS: &[&str] = &["process"];
const WORK_TYPE_KEYS: &[&str] = &["workType", "work_type"];
const DURATION_KEYS: &[&str] = &["durationDays", "calendar_days", "duration_days", "duration"];
const PIN_KEYS: &[&str] = &["_startDay"];
const CREW_KEYS: &[&str] = &["crewSize", "crew_size"];
const SEGMENT_KEYS: &[&str] = &["parallelSegments", "parallel_segments"];
const FRONT_KEYS: &[&str] = &["frontParallelDays", "front_parallel_days"];
const BACK_KEYS: &[&str] = &["backParallelDays", "back_parallel_days"];
const RATE_KEYS: &[&str] = &["applicationRate", "application_rate"];
const REMARKS_KEYS: &[&str] = &["remarks"];
const GROUP_KEYS: &[&str] = &["parallelGroup", "_parallelGroup", "parallel_group"];
const PARALLELISM_KEYS: &[&str] = &["is_parallelism", "isParallelism"];

const ITEM_ID_KEYS: &[&str] = &["itemId", "item_id"];
const START_KEYS: &[&str] = &["startDay", "start_day"];
const SUB_DURATION_KEYS: &[&str] = &["durationDays", "duration_days"];
const LABEL_KEYS: &[&str] = &["label"];

/// Schedule item, the unit of the timing pass
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,

    // === Display labels ===
    #[serde(default)]
    pub main_category: String,
    #[serde(default)]
    pub process: String,
    #[serde(default)]
    pub work_type: String,

    // === Timing input ===
    /// Calendar length in days, never negative
    #[serde(default)]
    pub duration_days: f64,

    /// Manually fixed start day. Pinned tasks never derive from the
    /// running critical-path end.
    #[serde(rename = "_startDay", default)]
    pub pinned_start: Option<f64>,

    /// Heatmap only, does not affect the critical path
    #[serde(default)]
    pub crew_size: f64,

    // === Parallel time ===
    #[serde(default)]
    pub parallel_segments: Option<Vec<Segment>>,
    #[serde(default)]
    pub front_parallel_days: Option<f64>,
    #[serde(default)]
    pub back_parallel_days: Option<f64>,
    /// Criteria-entry critical percentage, used when no segments or
    /// legacy scalars are present
    #[serde(default)]
    pub application_rate: Option<f64>,

    // === Classification ===
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub parallel_group: Option<String>,
    #[serde(default)]
    pub is_parallelism: bool,
}

impl Task {
    pub fn new(id: impl Into<String>, duration_days: f64) -> Self {
        Self {
            id: id.into(),
            duration_days,
            ..Self::default()
        }
    }
}

/// Child bar of a task. `start_day` is absolute, not relative to the parent.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubTask {
    pub id: String,
    pub item_id: String,
    pub start_day: f64,
    pub duration_days: f64,
    #[serde(default)]
    pub label: String,
}

impl SubTask {
    pub fn end_day(&self) -> f64 {
        self.start_day + self.duration_days
    }

    pub fn range(&self) -> Segment {
        Segment::new(self.start_day, self.end_day())
    }
}

/// Dependency link type
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum LinkType {
    #[default]
    #[serde(rename = "FS")]
    FinishToStart,
    #[serde(rename = "SS")]
    StartToStart,
    #[serde(rename = "FF")]
    FinishToFinish,
    #[serde(rename = "SF")]
    StartToFinish,
}

impl LinkType {
    /// Lenient parse, anything unrecognised is FS
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "SS" => Self::StartToStart,
            "FF" => Self::FinishToFinish,
            "SF" => Self::StartToFinish,
            _ => Self::FinishToStart,
        }
    }
}

/// Start or end edge of a bar, used as a link endpoint
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Start,
    End,
}

impl Anchor {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "start" | "s" => Some(Self::Start),
            "end" | "finish" | "e" | "f" => Some(Self::End),
            _ => None,
        }
    }
}

/// Dependency edge between tasks or sub-tasks. Visual only, does not feed
/// back into computed start days.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Link {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub link_type: LinkType,
    /// Days, may be negative
    #[serde(default)]
    pub lag: f64,
}

/// Working-day calendar used for date labels
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Calendar {
    /// Day 0 of the timeline, "YYYY-MM-DD"
    #[serde(default)]
    pub project_start: Option<String>,

    /// Working days (0=Sun, 1=Mon, ..., 6=Sat)
    #[serde(default = "default_working_days")]
    pub working_days: Vec<i32>,

    /// Date-specific exceptions (CalendarException object or string)
    #[serde(default)]
    pub exceptions: Value,
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            project_start: None,
            working_days: default_working_days(),
            exceptions: Value::Null,
        }
    }
}

/// Durations are calendar days, so every weekday works unless told otherwise
fn default_working_days() -> Vec<i32> {
    (0..7).collect()
}

// === Output ===

/// One row of the computed timeline
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRow {
    pub id: String,
    pub row: usize,
    pub main_category: String,
    pub process: String,
    pub work_type: String,

    pub start_day: f64,
    pub duration_days: f64,
    pub finish_day: f64,
    pub pinned: bool,

    pub red_start: f64,
    pub red_end: f64,
    pub logical_red_end: f64,
    pub cumulative_cp_end: f64,

    pub parallel_days: f64,
    pub critical_days: f64,
    pub application_rate: f64,
    pub front_parallel_days: f64,
    pub back_parallel_days: f64,
    /// Relative to `start_day`
    pub parallel_segments: Vec<Segment>,
    /// Absolute
    pub critical_segments: Vec<Segment>,

    pub is_parallel: bool,
    pub is_contained: bool,
    /// Ids of critical tasks whose red range lies inside this one
    pub contains: Vec<String>,
    pub successor: Option<String>,

    pub subtasks: Vec<SubTask>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_days: Option<i32>,
}

/// Calculation statistics
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineStats {
    pub calc_time: f64,
    pub task_count: usize,
    pub critical_count: usize,
    pub total_duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_end: Option<String>,
}

/// Derived view model, rebuilt from scratch on every calculation
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub rows: Vec<TimelineRow>,
    pub connectors: Vec<Connector>,
    /// Crew count per whole day index
    pub daily_load: Vec<f64>,
    pub stats: TimelineStats,
}

// === Input adapters ===

fn pick<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().filter_map(|name| obj.get(*name)).find(|v| !v.is_null())
}

fn has_any(obj: &Map<String, Value>, names: &[&str]) -> bool {
    names.iter().any(|name| obj.contains_key(*name))
}

/// Numbers, numeric strings and booleans. Non-finite values are rejected.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

pub fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "y"
        ),
        _ => false,
    }
}

pub fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn segment_from_value(value: &Value) -> Option<Segment> {
    match value {
        Value::Object(obj) => {
            let start = obj.get("start").and_then(coerce_f64).unwrap_or(0.0);
            let end = obj.get("end").and_then(coerce_f64).unwrap_or(0.0);
            Some(Segment::new(start, end))
        }
        Value::Array(pair) if pair.len() == 2 => {
            Some(Segment::new(coerce_f64(&pair[0])?, coerce_f64(&pair[1])?))
        }
        _ => None,
    }
}

/// Structured array or a JSON-encoded string of one. Decoded once here so
/// the segment math only sees structured lists.
pub fn coerce_segments(value: &Value) -> Option<Vec<Segment>> {
    match value {
        Value::Array(items) => Some(items.iter().filter_map(segment_from_value).collect()),
        Value::String(text) => {
            let parsed: Value = serde_json::from_str(text).ok()?;
            match parsed {
                Value::Array(_) => coerce_segments(&parsed),
                _ => None,
            }
        }
        _ => None,
    }
}

fn non_negative(value: Option<&Value>) -> f64 {
    value.and_then(coerce_f64).unwrap_or(0.0).max(0.0)
}

fn optional_text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(coerce_string)
        .filter(|s| !s.trim().is_empty())
}

fn as_object<'a>(value: &'a Value, what: &'static str) -> Result<&'a Map<String, Value>, EngineError> {
    value.as_object().ok_or_else(|| EngineError::InvalidRecord {
        what,
        reason: "expected an object".to_string(),
    })
}

fn require_id(obj: &Map<String, Value>, what: &'static str) -> Result<String, EngineError> {
    pick(obj, ID_KEYS)
        .and_then(coerce_string)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| EngineError::InvalidRecord {
            what,
            reason: "missing id".to_string(),
        })
}

/// Apply every task field present in `obj`. Fields that are absent keep their
/// value, fields explicitly set to null reset to their default.
pub fn apply_task_fields(task: &mut Task, obj: &Map<String, Value>) {
    if has_any(obj, MAIN_CATEGORY_KEYS) {
        task.main_category = pick(obj, MAIN_CATEGORY_KEYS).and_then(coerce_string).unwrap_or_default();
    }
    if has_any(obj, PROCESS_KEYS) {
        task.process = pick(obj, PROCESS_KEYS).and_then(coerce_string).unwrap_or_default();
    }
    if has_any(obj, WORK_TYPE_KEYS) {
        task.work_type = pick(obj, WORK_TYPE_KEYS).and_then(coerce_string).unwrap_or_default();
    }
    if has_any(obj, DURATION_KEYS) {
        task.duration_days = non_negative(pick(obj, DURATION_KEYS));
    }
    if has_any(obj, PIN_KEYS) {
        task.pinned_start = pick(obj, PIN_KEYS).and_then(coerce_f64).map(|v| v.max(0.0));
    }
    if has_any(obj, CREW_KEYS) {
        task.crew_size = non_negative(pick(obj, CREW_KEYS));
    }
    if has_any(obj, SEGMENT_KEYS) {
        task.parallel_segments = pick(obj, SEGMENT_KEYS).and_then(coerce_segments);
    }
    if has_any(obj, FRONT_KEYS) {
        task.front_parallel_days = pick(obj, FRONT_KEYS).and_then(coerce_f64);
    }
    if has_any(obj, BACK_KEYS) {
        task.back_parallel_days = pick(obj, BACK_KEYS).and_then(coerce_f64);
    }
    if has_any(obj, RATE_KEYS) {
        task.application_rate = pick(obj, RATE_KEYS).and_then(coerce_f64);
    }
    if has_any(obj, REMARKS_KEYS) {
        task.remarks = optional_text(pick(obj, REMARKS_KEYS));
    }
    if has_any(obj, GROUP_KEYS) {
        task.parallel_group = optional_text(pick(obj, GROUP_KEYS));
    }
    if has_any(obj, PARALLELISM_KEYS) {
        task.is_parallelism = pick(obj, PARALLELISM_KEYS).is_some_and(coerce_bool);
    }
}

pub fn task_from_value(value: &Value) -> Result<Task, EngineError> {
    let obj = as_object(value, "task")?;
    let mut task = Task {
        id: require_id(obj, "task")?,
        ..Task::default()
    };
    apply_task_fields(&mut task, obj);
    Ok(task)
}

pub fn apply_subtask_fields(subtask: &mut SubTask, obj: &Map<String, Value>) {
    if let Some(item_id) = pick(obj, ITEM_ID_KEYS).and_then(coerce_string) {
        subtask.item_id = item_id;
    }
    if has_any(obj, START_KEYS) {
        subtask.start_day = non_negative(pick(obj, START_KEYS));
    }
    if has_any(obj, SUB_DURATION_KEYS) {
        subtask.duration_days = non_negative(pick(obj, SUB_DURATION_KEYS));
    }
    if has_any(obj, LABEL_KEYS) {
        subtask.label = pick(obj, LABEL_KEYS).and_then(coerce_string).unwrap_or_default();
    }
}

pub fn subtask_from_value(value: &Value) -> Result<SubTask, EngineError> {
    let obj = as_object(value, "sub-task")?;
    require_id(obj, "sub-task")?;
    subtask_draft_from_value(value)
}

/// Sub-task record whose id may be absent, for drafts the engine names
pub fn subtask_draft_from_value(value: &Value) -> Result<SubTask, EngineError> {
    let obj = as_object(value, "sub-task")?;
    let mut subtask = SubTask {
        id: pick(obj, ID_KEYS).and_then(coerce_string).unwrap_or_default(),
        ..SubTask::default()
    };
    apply_subtask_fields(&mut subtask, obj);
    if subtask.item_id.is_empty() {
        return Err(EngineError::InvalidRecord {
            what: "sub-task",
            reason: format!("{} has no itemId", subtask.id),
        });
    }
    Ok(subtask)
}

pub fn link_from_value(value: &Value) -> Result<Link, EngineError> {
    let obj = as_object(value, "link")?;
    let endpoint = |key: &str| {
        obj.get(key)
            .and_then(coerce_string)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| EngineError::InvalidRecord {
                what: "link",
                reason: format!("missing {key}"),
            })
    };
    Ok(Link {
        id: require_id(obj, "link")?,
        from: endpoint("from")?,
        to: endpoint("to")?,
        link_type: obj
            .get("type")
            .and_then(Value::as_str)
            .map(crate::links::parse_type)
            .unwrap_or_default(),
        lag: obj.get("lag").and_then(coerce_f64).unwrap_or(0.0),
    })
}

/// Adapt an array of records, failing on the first bad one
pub fn list_from_value<T>(
    value: &Value,
    what: &'static str,
    adapt: impl Fn(&Value) -> Result<T, EngineError>,
) -> Result<Vec<T>, EngineError> {
    match value {
        Value::Array(items) => items.iter().map(adapt).collect(),
        Value::Null => Ok(Vec::new()),
        _ => Err(EngineError::InvalidRecord {
            what,
            reason: "expected an array".to_string(),
        }),
    }
}
