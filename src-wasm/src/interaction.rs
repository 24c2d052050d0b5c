//! Pointer interaction sessions
//!
//! Every gesture (drag, resize, draw sub-task, link draft, selection box)
//! lives in one `Session` value created on pointer-down and dropped on
//! release or cancel. Starting a new gesture discards the active one.
//!
//! The controller never mutates tasks. It reads the current layout through a
//! `LayoutContext`, emits previews while the pointer moves, and returns an
//! `Outcome` on release that the project state commits or ignores. Invalid
//! proposals come back as `Outcome::Rejected` and leave everything untouched.

use serde::Serialize;

use crate::config::TimelineConfig;
use crate::layout::{bar_rect, Rect, Scale};
use crate::links;
use crate::segments::{Segment, EPSILON};
use crate::timing::{Schedule, TaskTiming};
use crate::types::{Anchor, Link, SubTask};

/// Thing being dragged or resized
#[derive(Serialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(tag = "type", content = "id", rename_all = "camelCase")]
pub enum Target {
    Task(String),
    SubTask(String),
}

impl Target {
    pub fn parse(kind: &str, id: impl Into<String>) -> Option<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "task" | "item" => Some(Self::Task(id.into())),
            "subtask" | "sub-task" | "sub_task" => Some(Self::SubTask(id.into())),
            _ => None,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Task(id) | Self::SubTask(id) => id,
        }
    }
}

/// Link endpoint: a task or sub-task edge
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub id: String,
    pub anchor: Anchor,
}

/// Read-only layout consulted during a gesture
pub struct LayoutContext<'a> {
    pub schedule: &'a Schedule,
    pub subtasks: &'a [SubTask],
    pub links: &'a [Link],
    pub config: &'a TimelineConfig,
}

impl<'a> LayoutContext<'a> {
    fn scale(&self) -> Scale {
        self.config.scale()
    }

    fn snap_days(&self) -> f64 {
        self.scale().x_to_day(self.config.snap_threshold_px.max(0.0))
    }

    fn timing(&self, id: &str) -> Option<&'a TaskTiming> {
        self.schedule.get(id)
    }

    fn subtask(&self, id: &str) -> Option<&'a SubTask> {
        self.subtasks.iter().find(|s| s.id == id)
    }

    fn siblings<'b>(&'b self, item_id: &'b str) -> impl Iterator<Item = &'a SubTask> + 'b {
        self.subtasks.iter().filter(move |s| s.item_id == item_id)
    }

    fn endpoint_exists(&self, id: &str) -> bool {
        self.timing(id).is_some() || self.subtask(id).is_some()
    }

    /// Current start and duration of a target
    fn span(&self, target: &Target) -> Option<(f64, f64)> {
        match target {
            Target::Task(id) => self.timing(id).map(|t| (t.start_day, t.duration_days)),
            Target::SubTask(id) => self.subtask(id).map(|s| (s.start_day, s.duration_days)),
        }
    }
}

// === Preview & outcome ===

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub target: Target,
    pub start_day: f64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MovePreview {
    pub placements: Vec<Placement>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResizePreview {
    pub target: Target,
    pub duration_days: f64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubTaskDraft {
    pub item_id: String,
    pub start_day: f64,
    pub duration_days: f64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DraftPreview {
    pub draft: SubTaskDraft,
    pub valid: bool,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LinkLinePreview {
    pub from: Endpoint,
    pub x: f64,
    pub y: f64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelectionBoxPreview {
    pub rect: Rect,
}

/// Frame emitted while the pointer moves
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Preview {
    Move(MovePreview),
    Resize(ResizePreview),
    Draft(DraftPreview),
    LinkLine(LinkLinePreview),
    SelectionBox(SelectionBoxPreview),
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RejectReason {
    /// Overlaps a sibling sub-task or the parent's red range
    Overlap,
    /// Sub-task draft shorter than the minimum
    TooShort,
    DuplicateLink,
    SameEndpoint,
    UnknownTarget,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClickOutcome {
    pub target: Target,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelectionOutcome {
    pub task_ids: Vec<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    pub reason: RejectReason,
}

/// Result of a finished gesture
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Outcome {
    /// Nothing to report (no session, or the session keeps going)
    Noop,
    Clicked(ClickOutcome),
    Moved(MovePreview),
    Resized(ResizePreview),
    SubTaskDrafted(SubTaskDraft),
    Linked(Link),
    Selected(SelectionOutcome),
    SelectionCleared,
    Rejected(Rejection),
    Cancelled,
}

impl Outcome {
    fn rejected(reason: RejectReason) -> Self {
        Self::Rejected(Rejection { reason })
    }
}

// === Sessions ===

#[derive(Debug, Clone)]
struct DragMember {
    target: Target,
    start_day: f64,
    duration_days: f64,
}

#[derive(Debug, Clone)]
struct DragSession {
    primary: DragMember,
    /// Every entity moving with the primary, primary included
    members: Vec<DragMember>,
    origin_x: f64,
    moved: bool,
}

#[derive(Debug, Clone)]
struct ResizeSession {
    target: Target,
    start_day: f64,
    duration_days: f64,
    origin_x: f64,
    moved: bool,
}

#[derive(Debug, Clone)]
struct DrawSession {
    item_id: String,
    anchor_day: f64,
    current_day: f64,
}

#[derive(Debug, Clone)]
struct LinkSession {
    from: Endpoint,
}

#[derive(Debug, Clone)]
struct SelectSession {
    origin: (f64, f64),
    current: (f64, f64),
}

#[derive(Debug, Clone)]
enum Session {
    Drag(DragSession),
    Resize(ResizeSession),
    Draw(DrawSession),
    Link(LinkSession),
    Select(SelectSession),
}

impl Session {
    fn name(&self) -> &'static str {
        match self {
            Self::Drag(_) => "drag",
            Self::Resize(_) => "resize",
            Self::Draw(_) => "draw",
            Self::Link(_) => "link",
            Self::Select(_) => "selection",
        }
    }
}

/// Multi-selection, kept across gestures
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub tasks: Vec<String>,
    pub subtasks: Vec<String>,
}

impl Selection {
    pub fn contains(&self, target: &Target) -> bool {
        match target {
            Target::Task(id) => self.tasks.contains(id),
            Target::SubTask(id) => self.subtasks.contains(id),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.subtasks.is_empty()
    }

    fn toggle(&mut self, target: &Target) {
        let list = match target {
            Target::Task(_) => &mut self.tasks,
            Target::SubTask(_) => &mut self.subtasks,
        };
        let id = target.id().to_string();
        match list.iter().position(|s| *s == id) {
            Some(index) => {
                list.remove(index);
            }
            None => list.push(id),
        }
    }
}

// === Snapping & overlap ===

/// Closest candidate within `threshold`, else the raw value
pub fn snap(value: f64, candidates: &[f64], threshold: f64) -> f64 {
    value + snap_offset(&[value], candidates, threshold)
}

/// Smallest shift that lands any of `edges` on a candidate within
/// `threshold`, or 0
fn snap_offset(edges: &[f64], candidates: &[f64], threshold: f64) -> f64 {
    let mut best: Option<f64> = None;
    for &edge in edges {
        for &candidate in candidates {
            let offset = candidate - edge;
            if offset.abs() > threshold {
                continue;
            }
            if best.map_or(true, |b| offset.abs() < b.abs()) {
                best = Some(offset);
            }
        }
    }
    best.unwrap_or(0.0)
}

fn red_bounds(timing: &TaskTiming) -> [f64; 2] {
    [timing.red_start, timing.red_end]
}

/// Snap targets for moving or resizing `target`
fn snap_candidates(target: &Target, ctx: &LayoutContext<'_>) -> Vec<f64> {
    match target {
        Target::SubTask(id) => {
            let Some(sub) = ctx.subtask(id) else {
                return Vec::new();
            };
            let mut candidates: Vec<f64> = ctx
                .timing(&sub.item_id)
                .map(|parent| red_bounds(parent).to_vec())
                .unwrap_or_default();
            for sibling in ctx.siblings(&sub.item_id).filter(|s| s.id != sub.id) {
                candidates.push(sibling.start_day);
                candidates.push(sibling.end_day());
            }
            candidates
        }
        Target::Task(id) => ctx
            .schedule
            .timings
            .iter()
            .filter(|t| t.id != *id)
            .flat_map(|t| [t.start_day, t.end_day(), t.red_start, t.red_end])
            .collect(),
    }
}

/// Snap targets while drawing a new sub-task under `item_id`
fn draw_candidates(item_id: &str, ctx: &LayoutContext<'_>) -> Vec<f64> {
    let mut candidates: Vec<f64> = ctx
        .timing(item_id)
        .map(|parent| red_bounds(parent).to_vec())
        .unwrap_or_default();
    for sibling in ctx.siblings(item_id) {
        candidates.push(sibling.start_day);
        candidates.push(sibling.end_day());
    }
    candidates
}

/// A sub-task range may only occupy the parallel time inside its parent's bar
/// and must not touch a sibling.
pub fn subtask_fits<'s>(range: Segment, parent: &TaskTiming, mut siblings: impl Iterator<Item = &'s Segment>) -> bool {
    within_bar(range, parent) && !range.overlaps(&parent.red_range()) && !siblings.any(|other| range.overlaps(other))
}

fn within_bar(range: Segment, parent: &TaskTiming) -> bool {
    range.start >= parent.start_day - EPSILON && range.end <= parent.end_day() + EPSILON
}

/// Validate a set of proposed sub-task ranges together: moving members are
/// checked against their new positions, everyone else against where they are.
pub fn placements_fit(proposed: &[(&SubTask, Segment)], subtasks: &[SubTask], schedule: &Schedule) -> bool {
    proposed.iter().all(|(sub, range)| {
        let Some(parent) = schedule.get(&sub.item_id) else {
            return false;
        };
        let mut others: Vec<Segment> = subtasks
            .iter()
            .filter(|s| s.item_id == sub.item_id)
            .filter(|s| !proposed.iter().any(|(moving, _)| moving.id == s.id))
            .map(SubTask::range)
            .collect();
        others.extend(
            proposed
                .iter()
                .filter(|(moving, _)| moving.id != sub.id && moving.item_id == sub.item_id)
                .map(|(_, r)| *r),
        );
        subtask_fits(*range, parent, others.iter())
    })
}

// === Controller ===

#[derive(Debug, Default)]
pub struct InteractionController {
    session: Option<Session>,
    selection: Selection,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn active_gesture(&self) -> Option<&'static str> {
        self.session.as_ref().map(Session::name)
    }

    pub fn select(&mut self, target: &Target, additive: bool) {
        if additive {
            self.selection.toggle(target);
        } else {
            self.selection = Selection::default();
            self.selection.toggle(target);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection = Selection::default();
    }

    /// Drop selected ids that no longer exist
    pub fn retain_selection(&mut self, task_exists: impl Fn(&str) -> bool, subtask_exists: impl Fn(&str) -> bool) {
        self.selection.tasks.retain(|id| task_exists(id));
        self.selection.subtasks.retain(|id| subtask_exists(id));
    }

    fn start(&mut self, session: Session) {
        if let Some(previous) = self.session.replace(session) {
            log::debug!("discarding unfinished {} gesture", previous.name());
        }
    }

    /// Pointer-down on a bar body
    pub fn begin_drag(&mut self, target: Target, x: f64, ctx: &LayoutContext<'_>) -> bool {
        let Some((start_day, duration_days)) = ctx.span(&target) else {
            return false;
        };
        let primary = DragMember {
            target: target.clone(),
            start_day,
            duration_days,
        };

        let group: Vec<Target> = if self.selection.contains(&target) {
            match &target {
                Target::Task(_) => self.selection.tasks.iter().cloned().map(Target::Task).collect(),
                Target::SubTask(_) => self.selection.subtasks.iter().cloned().map(Target::SubTask).collect(),
            }
        } else {
            vec![target]
        };
        let members = group
            .into_iter()
            .filter_map(|member| {
                let (start_day, duration_days) = ctx.span(&member)?;
                Some(DragMember {
                    target: member,
                    start_day,
                    duration_days,
                })
            })
            .collect();

        self.start(Session::Drag(DragSession {
            primary,
            members,
            origin_x: x,
            moved: false,
        }));
        true
    }

    /// Pointer-down on a bar's end handle
    pub fn begin_resize(&mut self, target: Target, x: f64, ctx: &LayoutContext<'_>) -> bool {
        let Some((start_day, duration_days)) = ctx.span(&target) else {
            return false;
        };
        self.start(Session::Resize(ResizeSession {
            target,
            start_day,
            duration_days,
            origin_x: x,
            moved: false,
        }));
        true
    }

    /// Pointer-down on an empty part of a row in sub-task mode
    pub fn begin_draw(&mut self, item_id: &str, x: f64, ctx: &LayoutContext<'_>) -> bool {
        if ctx.timing(item_id).is_none() {
            return false;
        }
        let day = snap(
            ctx.scale().x_to_day(x).max(0.0),
            &draw_candidates(item_id, ctx),
            ctx.snap_days(),
        );
        self.start(Session::Draw(DrawSession {
            item_id: item_id.to_string(),
            anchor_day: day,
            current_day: day,
        }));
        true
    }

    /// Pointer-down on an anchor dot in link mode
    pub fn begin_link(&mut self, from: Endpoint) {
        self.start(Session::Link(LinkSession { from }));
    }

    /// Pointer-down on empty canvas
    pub fn begin_selection(&mut self, x: f64, y: f64) {
        self.start(Session::Select(SelectSession {
            origin: (x, y),
            current: (x, y),
        }));
    }

    pub fn pointer_move(&mut self, x: f64, y: f64, ctx: &LayoutContext<'_>) -> Option<Preview> {
        let click_px = ctx.config.click_threshold_px;
        match self.session.as_mut()? {
            Session::Drag(drag) => {
                drag.moved |= (x - drag.origin_x).abs() > click_px;
                Some(Preview::Move(drag_placements(drag, x, ctx)))
            }
            Session::Resize(resize) => {
                resize.moved |= (x - resize.origin_x).abs() > click_px;
                Some(Preview::Resize(ResizePreview {
                    target: resize.target.clone(),
                    duration_days: resized_duration(resize, x, ctx),
                }))
            }
            Session::Draw(draw) => {
                draw.current_day = snap(
                    ctx.scale().x_to_day(x).max(0.0),
                    &draw_candidates(&draw.item_id, ctx),
                    ctx.snap_days(),
                );
                let draft = draft_of(draw);
                let valid = draft_fits(&draft, ctx);
                Some(Preview::Draft(DraftPreview { draft, valid }))
            }
            Session::Link(link) => Some(Preview::LinkLine(LinkLinePreview {
                from: link.from.clone(),
                x,
                y,
            })),
            Session::Select(select) => {
                select.current = (x, y);
                Some(Preview::SelectionBox(SelectionBoxPreview {
                    rect: Rect::from_corners(select.origin, select.current),
                }))
            }
        }
    }

    pub fn pointer_up(&mut self, x: f64, y: f64, ctx: &LayoutContext<'_>) -> Outcome {
        // Link drafts survive the release, they finish on a second anchor
        if matches!(self.session, Some(Session::Link(_))) {
            return Outcome::Noop;
        }
        let Some(session) = self.session.take() else {
            return Outcome::Noop;
        };
        let click_px = ctx.config.click_threshold_px;

        match session {
            Session::Drag(mut drag) => {
                drag.moved |= (x - drag.origin_x).abs() > click_px;
                if !drag.moved {
                    let target = drag.primary.target;
                    if !self.selection.contains(&target) {
                        self.select(&target, false);
                    }
                    return Outcome::Clicked(ClickOutcome { target });
                }
                let placements = drag_placements(&drag, x, ctx);
                if !moved_subtasks_fit(&placements, ctx) {
                    log::debug!("drag rejected: sub-task overlap");
                    return Outcome::rejected(RejectReason::Overlap);
                }
                Outcome::Moved(placements)
            }
            Session::Resize(mut resize) => {
                resize.moved |= (x - resize.origin_x).abs() > click_px;
                if !resize.moved {
                    return Outcome::Noop;
                }
                let duration_days = resized_duration(&resize, x, ctx);
                if let Target::SubTask(id) = &resize.target {
                    let fits = ctx.subtask(id).is_some_and(|sub| {
                        let range = Segment::new(resize.start_day, resize.start_day + duration_days);
                        placements_fit(&[(sub, range)], ctx.subtasks, ctx.schedule)
                    });
                    if !fits {
                        log::debug!("resize rejected: sub-task overlap");
                        return Outcome::rejected(RejectReason::Overlap);
                    }
                }
                Outcome::Resized(ResizePreview {
                    target: resize.target,
                    duration_days,
                })
            }
            Session::Draw(mut draw) => {
                draw.current_day = snap(
                    ctx.scale().x_to_day(x).max(0.0),
                    &draw_candidates(&draw.item_id, ctx),
                    ctx.snap_days(),
                );
                let draft = draft_of(&draw);
                if draft.duration_days < ctx.config.min_subtask_days - EPSILON {
                    return Outcome::rejected(RejectReason::TooShort);
                }
                if !draft_fits(&draft, ctx) {
                    log::debug!("sub-task draft rejected: overlap");
                    return Outcome::rejected(RejectReason::Overlap);
                }
                Outcome::SubTaskDrafted(draft)
            }
            Session::Select(mut select) => {
                select.current = (x, y);
                let (dx, dy) = (x - select.origin.0, y - select.origin.1);
                if dx.abs().max(dy.abs()) <= click_px {
                    self.clear_selection();
                    return Outcome::SelectionCleared;
                }
                let rect = Rect::from_corners(select.origin, select.current);
                let scale = ctx.scale();
                let task_ids: Vec<String> = ctx
                    .schedule
                    .timings
                    .iter()
                    .enumerate()
                    .filter(|(row, t)| {
                        bar_rect(*row, t.start_day, t.duration_days, scale, ctx.config.row_height).intersects(&rect)
                    })
                    .map(|(_, t)| t.id.clone())
                    .collect();
                self.selection = Selection {
                    tasks: task_ids.clone(),
                    subtasks: Vec::new(),
                };
                Outcome::Selected(SelectionOutcome { task_ids })
            }
            Session::Link(_) => Outcome::Noop,
        }
    }

    /// Click on an anchor in link mode: starts a draft, or finishes the
    /// active one through the link controller.
    pub fn click_anchor(&mut self, to: Endpoint, ctx: &LayoutContext<'_>) -> Outcome {
        let Some(Session::Link(draft)) = self.session.take() else {
            self.start(Session::Link(LinkSession { from: to }));
            return Outcome::Noop;
        };
        let from = draft.from;

        if from == to {
            return Outcome::rejected(RejectReason::SameEndpoint);
        }
        if !ctx.endpoint_exists(&from.id) || !ctx.endpoint_exists(&to.id) {
            return Outcome::rejected(RejectReason::UnknownTarget);
        }
        let link = links::build(&from.id, from.anchor, &to.id, to.anchor);
        if links::is_duplicate(ctx.links, &link) {
            log::debug!("link {} -> {} rejected: duplicate", from.id, to.id);
            return Outcome::rejected(RejectReason::DuplicateLink);
        }
        Outcome::Linked(link)
    }

    /// Click on the background: cancels a link draft
    pub fn click_background(&mut self) -> Outcome {
        if matches!(self.session, Some(Session::Link(_))) {
            self.session = None;
            return Outcome::Cancelled;
        }
        Outcome::Noop
    }

    /// External cancel, e.g. a competing pointer-down elsewhere
    pub fn cancel(&mut self) -> Outcome {
        match self.session.take() {
            Some(_) => Outcome::Cancelled,
            None => Outcome::Noop,
        }
    }
}

/// Proposed group positions for a drag at pointer `x`. The primary is
/// snapped, the rest follow with the same delta.
fn drag_placements(drag: &DragSession, x: f64, ctx: &LayoutContext<'_>) -> MovePreview {
    let raw_delta = ctx.scale().x_to_day(x - drag.origin_x);
    let primary = &drag.primary;
    let proposed = (primary.start_day + raw_delta).max(0.0);
    let offset = snap_offset(
        &[proposed, proposed + primary.duration_days],
        &snap_candidates(&primary.target, ctx),
        ctx.snap_days(),
    );
    let delta = (proposed + offset).max(0.0) - primary.start_day;

    MovePreview {
        placements: drag
            .members
            .iter()
            .map(|member| Placement {
                target: member.target.clone(),
                start_day: (member.start_day + delta).max(0.0),
            })
            .collect(),
    }
}

fn moved_subtasks_fit(preview: &MovePreview, ctx: &LayoutContext<'_>) -> bool {
    let proposed: Vec<(&SubTask, Segment)> = preview
        .placements
        .iter()
        .filter_map(|p| match &p.target {
            Target::SubTask(id) => ctx
                .subtask(id)
                .map(|sub| (sub, Segment::new(p.start_day, p.start_day + sub.duration_days))),
            Target::Task(_) => None,
        })
        .collect();
    proposed.is_empty() || placements_fit(&proposed, ctx.subtasks, ctx.schedule)
}

fn resized_duration(resize: &ResizeSession, x: f64, ctx: &LayoutContext<'_>) -> f64 {
    let min_days = match resize.target {
        Target::Task(_) => ctx.config.min_task_days,
        Target::SubTask(_) => ctx.config.min_subtask_days,
    };
    let raw_end = resize.start_day + resize.duration_days + ctx.scale().x_to_day(x - resize.origin_x);
    let end = snap(raw_end, &snap_candidates(&resize.target, ctx), ctx.snap_days());
    (end - resize.start_day).max(min_days)
}

fn draft_of(draw: &DrawSession) -> SubTaskDraft {
    let start_day = draw.anchor_day.min(draw.current_day);
    SubTaskDraft {
        item_id: draw.item_id.clone(),
        start_day,
        duration_days: draw.anchor_day.max(draw.current_day) - start_day,
    }
}

fn draft_fits(draft: &SubTaskDraft, ctx: &LayoutContext<'_>) -> bool {
    let Some(parent) = ctx.timing(&draft.item_id) else {
        return false;
    };
    let siblings: Vec<Segment> = ctx.siblings(&draft.item_id).map(SubTask::range).collect();
    let range = Segment::new(draft.start_day, draft.start_day + draft.duration_days);
    subtask_fits(range, parent, siblings.iter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::compute;
    use crate::types::{LinkType, Task};
    use pretty_assertions::assert_eq;

    /// 10 px per day, 14 px snap = 1.4 days, 3 px click = 0.3 days
    fn config() -> TimelineConfig {
        TimelineConfig {
            pixels_per_unit: 10.0,
            date_scale: 1.0,
            row_height: 20.0,
            ..TimelineConfig::default()
        }
    }

    struct Fixture {
        schedule: Schedule,
        subtasks: Vec<SubTask>,
        links: Vec<Link>,
        config: TimelineConfig,
    }

    impl Fixture {
        /// A: 20 days, parallel front [0,5] and back [15,20] => red [5,15]
        /// B: 10 days from the critical end, [15,25]
        fn new() -> Self {
            let a = Task {
                parallel_segments: Some(vec![Segment::new(0.0, 5.0), Segment::new(15.0, 20.0)]),
                ..Task::new("A", 20.0)
            };
            let tasks = vec![a, Task::new("B", 10.0)];
            let schedule = compute(&tasks);
            Self {
                schedule,
                subtasks: vec![sub("s1", "A", 0.0, 2.0)],
                links: Vec::new(),
                config: config(),
            }
        }

        fn ctx(&self) -> LayoutContext<'_> {
            LayoutContext {
                schedule: &self.schedule,
                subtasks: &self.subtasks,
                links: &self.links,
                config: &self.config,
            }
        }
    }

    fn sub(id: &str, item: &str, start: f64, duration: f64) -> SubTask {
        SubTask {
            id: id.into(),
            item_id: item.into(),
            start_day: start,
            duration_days: duration,
            label: String::new(),
        }
    }

    fn task(id: &str) -> Target {
        Target::Task(id.into())
    }

    #[test]
    fn small_drag_is_a_click() {
        let fx = Fixture::new();
        let mut ctl = InteractionController::new();
        assert!(ctl.begin_drag(task("B"), 100.0, &fx.ctx()));
        let outcome = ctl.pointer_up(102.0, 0.0, &fx.ctx());
        assert_eq!(outcome, Outcome::Clicked(ClickOutcome { target: task("B") }));
        assert_eq!(ctl.selection().tasks, vec!["B".to_string()]);
        assert!(!ctl.is_active());
    }

    #[test]
    fn task_drag_snaps_to_other_task_edges() {
        let fx = Fixture::new();
        let mut ctl = InteractionController::new();
        ctl.begin_drag(task("B"), 0.0, &fx.ctx());
        // B starts at 15; +52 px proposes 20.2, which snaps to A's finish 20
        let preview = ctl.pointer_move(52.0, 0.0, &fx.ctx()).unwrap();
        assert_eq!(
            preview,
            Preview::Move(MovePreview {
                placements: vec![Placement { target: task("B"), start_day: 20.0 }]
            })
        );
        match ctl.pointer_up(52.0, 0.0, &fx.ctx()) {
            Outcome::Moved(moved) => assert_eq!(moved.placements[0].start_day, 20.0),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn drag_floors_at_day_zero() {
        let fx = Fixture::new();
        let mut ctl = InteractionController::new();
        ctl.begin_drag(task("A"), 50.0, &fx.ctx());
        match ctl.pointer_up(-500.0, 0.0, &fx.ctx()) {
            Outcome::Moved(moved) => assert_eq!(moved.placements[0].start_day, 0.0),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn group_drag_moves_selected_tasks_together() {
        let fx = Fixture::new();
        let mut ctl = InteractionController::new();
        ctl.select(&task("A"), true);
        ctl.select(&task("B"), true);
        ctl.begin_drag(task("A"), 0.0, &fx.ctx());
        match ctl.pointer_up(300.0, 0.0, &fx.ctx()) {
            Outcome::Moved(moved) => {
                let starts: Vec<f64> = moved.placements.iter().map(|p| p.start_day).collect();
                assert_eq!(starts, vec![30.0, 45.0]);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn subtask_drag_into_red_range_is_rejected() {
        let fx = Fixture::new();
        let mut ctl = InteractionController::new();
        ctl.begin_drag(Target::SubTask("s1".into()), 0.0, &fx.ctx());
        // s1 [0,2] -> [6,8], inside red [5,15]
        let outcome = ctl.pointer_up(60.0, 0.0, &fx.ctx());
        assert_eq!(outcome, Outcome::rejected(RejectReason::Overlap));
        assert!(!ctl.is_active());
    }

    #[test]
    fn subtask_drag_snaps_to_red_boundary_and_fits() {
        let fx = Fixture::new();
        let mut ctl = InteractionController::new();
        ctl.begin_drag(Target::SubTask("s1".into()), 0.0, &fx.ctx());
        // raw [2.5,4.5]; end snaps to red start 5 => [3,5]
        match ctl.pointer_up(25.0, 0.0, &fx.ctx()) {
            Outcome::Moved(moved) => assert_eq!(moved.placements[0].start_day, 3.0),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn resize_respects_minimum_and_overlap() {
        let fx = Fixture::new();
        let mut ctl = InteractionController::new();

        ctl.begin_resize(task("B"), 0.0, &fx.ctx());
        match ctl.pointer_up(-500.0, 0.0, &fx.ctx()) {
            Outcome::Resized(r) => assert_eq!(r.duration_days, 1.0),
            other => panic!("unexpected outcome {other:?}"),
        }

        ctl.begin_resize(Target::SubTask("s1".into()), 0.0, &fx.ctx());
        // [0,2] -> end 8 lands in the red range
        assert_eq!(ctl.pointer_up(60.0, 0.0, &fx.ctx()), Outcome::rejected(RejectReason::Overlap));
    }

    #[test]
    fn drawing_commits_only_in_parallel_time() {
        let fx = Fixture::new();
        let mut ctl = InteractionController::new();

        // back parallel window of A is [15,20]
        assert!(ctl.begin_draw("A", 170.0, &fx.ctx()));
        match ctl.pointer_move(190.0, 0.0, &fx.ctx()) {
            Some(Preview::Draft(d)) => assert!(d.valid),
            other => panic!("unexpected preview {other:?}"),
        }
        assert_eq!(
            ctl.pointer_up(190.0, 0.0, &fx.ctx()),
            Outcome::SubTaskDrafted(SubTaskDraft {
                item_id: "A".into(),
                start_day: 17.0,
                duration_days: 2.0,
            })
        );

        // crossing into the red range is discarded
        ctl.begin_draw("A", 100.0, &fx.ctx());
        assert_eq!(ctl.pointer_up(180.0, 0.0, &fx.ctx()), Outcome::rejected(RejectReason::Overlap));

        // click without extent
        ctl.begin_draw("A", 180.0, &fx.ctx());
        assert_eq!(ctl.pointer_up(180.0, 0.0, &fx.ctx()), Outcome::rejected(RejectReason::TooShort));

        assert!(!ctl.begin_draw("missing", 0.0, &fx.ctx()));
    }

    #[test]
    fn drawing_past_the_parent_bar_is_rejected() {
        let fx = Fixture::new();
        let mut ctl = InteractionController::new();
        // A ends at day 20; [26,29] is clear of red and siblings but off the bar
        ctl.begin_draw("A", 260.0, &fx.ctx());
        match ctl.pointer_move(290.0, 0.0, &fx.ctx()) {
            Some(Preview::Draft(d)) => assert!(!d.valid),
            other => panic!("unexpected preview {other:?}"),
        }
        assert_eq!(ctl.pointer_up(290.0, 0.0, &fx.ctx()), Outcome::rejected(RejectReason::Overlap));
    }

    #[test]
    fn drawing_over_a_sibling_is_rejected() {
        let fx = Fixture::new();
        let mut ctl = InteractionController::new();
        // s1 occupies [0,2]
        ctl.begin_draw("A", 10.0, &fx.ctx());
        assert_eq!(ctl.pointer_up(35.0, 0.0, &fx.ctx()), Outcome::rejected(RejectReason::Overlap));
    }

    #[test]
    fn link_draft_completes_on_second_anchor() {
        let mut fx = Fixture::new();
        let mut ctl = InteractionController::new();
        let from = Endpoint { id: "A".into(), anchor: Anchor::End };
        let to = Endpoint { id: "B".into(), anchor: Anchor::Start };

        ctl.begin_link(from.clone());
        assert!(matches!(ctl.pointer_move(5.0, 5.0, &fx.ctx()), Some(Preview::LinkLine(_))));
        assert_eq!(ctl.pointer_up(5.0, 5.0, &fx.ctx()), Outcome::Noop);
        assert!(ctl.is_active());

        let link = match ctl.click_anchor(to.clone(), &fx.ctx()) {
            Outcome::Linked(link) => link,
            other => panic!("unexpected outcome {other:?}"),
        };
        assert_eq!(link.link_type, LinkType::FinishToStart);
        fx.links.push(link);

        ctl.click_anchor(from.clone(), &fx.ctx());
        assert_eq!(ctl.click_anchor(to, &fx.ctx()), Outcome::rejected(RejectReason::DuplicateLink));

        ctl.click_anchor(from.clone(), &fx.ctx());
        assert_eq!(ctl.click_anchor(from, &fx.ctx()), Outcome::rejected(RejectReason::SameEndpoint));
    }

    #[test]
    fn background_click_cancels_link_draft() {
        let fx = Fixture::new();
        let mut ctl = InteractionController::new();
        ctl.begin_link(Endpoint { id: "A".into(), anchor: Anchor::Start });
        assert_eq!(ctl.click_background(), Outcome::Cancelled);
        assert!(!ctl.is_active());
        assert_eq!(ctl.pointer_up(0.0, 0.0, &fx.ctx()), Outcome::Noop);
    }

    #[test]
    fn selection_box_selects_intersecting_bars() {
        let fx = Fixture::new();
        let mut ctl = InteractionController::new();
        // row 1 (B) spans x 150..250, y 20..40
        ctl.begin_selection(210.0, 25.0);
        assert_eq!(
            ctl.pointer_up(230.0, 35.0, &fx.ctx()),
            Outcome::Selected(SelectionOutcome { task_ids: vec!["B".into()] })
        );
        assert_eq!(ctl.selection().tasks, vec!["B".to_string()]);

        ctl.begin_selection(500.0, 500.0);
        assert_eq!(ctl.pointer_up(501.0, 501.0, &fx.ctx()), Outcome::SelectionCleared);
        assert!(ctl.selection().is_empty());
    }

    #[test]
    fn new_gesture_replaces_active_one() {
        let fx = Fixture::new();
        let mut ctl = InteractionController::new();
        ctl.begin_drag(task("A"), 0.0, &fx.ctx());
        ctl.begin_selection(0.0, 0.0);
        assert_eq!(ctl.active_gesture(), Some("selection"));
        assert_eq!(ctl.cancel(), Outcome::Cancelled);
        assert_eq!(ctl.cancel(), Outcome::Noop);
    }

    #[test]
    fn snap_picks_closest_candidate_within_threshold() {
        assert_eq!(snap(10.3, &[9.0, 10.0, 11.0], 1.0), 10.0);
        assert_eq!(snap(10.3, &[13.0], 1.0), 10.3);
        assert_eq!(snap(10.3, &[], 1.0), 10.3);
    }
}
