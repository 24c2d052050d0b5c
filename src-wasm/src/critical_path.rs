//! Critical-path analysis
//!
//! Classifies every row as critical or parallel, finds critical rows whose
//! red range sits inside another's, and routes the connector lines the chart
//! draws between consecutive critical rows.
//!
//! A contained row interrupts the outer row's line: the path leaves the outer
//! row where the first contained row starts and detours down into each
//! contained row and back up again.

use serde::Serialize;

use crate::segments::EPSILON;
use crate::timing::{Schedule, TaskTiming};
use crate::types::Task;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ConnectorKind {
    /// Horizontal-then-vertical line to the next critical row
    Successor,
    /// Down from the outer row into a contained row at its red start
    DetourDown,
    /// Back up from a contained row at its red end
    DetourUp,
}

/// Connector in day/row space
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    pub kind: ConnectorKind,
    pub from_row: usize,
    pub to_row: usize,
    pub from_day: f64,
    pub to_day: f64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RowAnalysis {
    pub row: usize,
    pub is_parallel: bool,
    pub is_contained: bool,
    /// Rows contained in this one, ascending by red start
    pub contains: Vec<usize>,
    pub logical_red_end: f64,
    pub successor: Option<usize>,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CriticalPathReport {
    pub rows: Vec<RowAnalysis>,
    pub connectors: Vec<Connector>,
}

impl CriticalPathReport {
    pub fn critical_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.is_parallel).count()
    }
}

/// Parallel (grey) classification of one task
pub fn is_parallel(task: &Task, timing: &TaskTiming, parallel_remark: &str) -> bool {
    let remark_hit = !parallel_remark.is_empty()
        && task.remarks.as_deref().map(str::trim) == Some(parallel_remark);
    let grouped = task
        .parallel_group
        .as_deref()
        .is_some_and(|group| !group.trim().is_empty());
    let fully_covered = timing.duration_days > EPSILON
        && timing.meta.parallel_days >= timing.duration_days - EPSILON;

    remark_hit || grouped || task.is_parallelism || timing.red_len() <= EPSILON || fully_covered
}

/// Whether `inner`'s red range lies inside `outer`'s. Identical ranges belong
/// to the earlier row.
fn encloses(outer: &TaskTiming, outer_row: usize, inner: &TaskTiming, inner_row: usize) -> bool {
    let within = inner.red_start >= outer.red_start - EPSILON && inner.red_end <= outer.red_end + EPSILON;
    if !within {
        return false;
    }
    let identical = (inner.red_start - outer.red_start).abs() <= EPSILON
        && (inner.red_end - outer.red_end).abs() <= EPSILON;
    !identical || outer_row < inner_row
}

/// Red end trimmed to the first contained row's red start
pub fn logical_red_end(timings: &[TaskTiming], row: usize, contains: &[usize]) -> f64 {
    let own = timings[row].red_end;
    contains
        .first()
        .map(|&inner| timings[inner].red_start.min(own))
        .unwrap_or(own)
}

/// Closest forward critical row starting at or after `logical_end`.
///
/// Smallest x gap wins; equal gaps keep the nearest row. Rows before `row`
/// are never considered.
pub fn find_successor(timings: &[TaskTiming], eligible: &[bool], row: usize, logical_end: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for candidate in row + 1..timings.len() {
        if !eligible[candidate] {
            continue;
        }
        let gap = timings[candidate].red_start - logical_end;
        if gap < -EPSILON {
            continue;
        }
        match best {
            Some((_, best_gap)) if gap >= best_gap - EPSILON => {}
            _ => best = Some((candidate, gap)),
        }
    }
    best.map(|(candidate, _)| candidate)
}

pub fn analyze(tasks: &[Task], schedule: &Schedule, parallel_remark: &str) -> CriticalPathReport {
    let timings = &schedule.timings;
    let n = timings.len().min(tasks.len());

    let parallel: Vec<bool> = (0..n)
        .map(|i| is_parallel(&tasks[i], &timings[i], parallel_remark))
        .collect();

    let mut contains: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut contained = vec![false; n];
    for outer in (0..n).filter(|&i| !parallel[i]) {
        for inner in (0..n).filter(|&j| j != outer && !parallel[j]) {
            if encloses(&timings[outer], outer, &timings[inner], inner) {
                contains[outer].push(inner);
                contained[inner] = true;
            }
        }
    }
    for list in contains.iter_mut() {
        list.sort_by(|a, b| {
            timings[*a]
                .red_start
                .total_cmp(&timings[*b].red_start)
                .then(a.cmp(b))
        });
    }

    let eligible: Vec<bool> = (0..n).map(|i| !parallel[i] && !contained[i]).collect();

    let mut rows = Vec::with_capacity(n);
    let mut connectors = Vec::new();
    for row in 0..n {
        let logical_end = logical_red_end(timings, row, &contains[row]);
        let successor = if eligible[row] {
            find_successor(&timings[..n], &eligible, row, logical_end)
        } else {
            None
        };

        if let Some(next) = successor {
            connectors.push(Connector {
                kind: ConnectorKind::Successor,
                from_row: row,
                to_row: next,
                from_day: logical_end,
                to_day: timings[next].red_start,
            });
        }
        if eligible[row] {
            for &inner in &contains[row] {
                let detour = &timings[inner];
                connectors.push(Connector {
                    kind: ConnectorKind::DetourDown,
                    from_row: row,
                    to_row: inner,
                    from_day: detour.red_start,
                    to_day: detour.red_start,
                });
                connectors.push(Connector {
                    kind: ConnectorKind::DetourUp,
                    from_row: inner,
                    to_row: row,
                    from_day: detour.red_end,
                    to_day: detour.red_end,
                });
            }
        }

        rows.push(RowAnalysis {
            row,
            is_parallel: parallel[row],
            is_contained: contained[row],
            contains: std::mem::take(&mut contains[row]),
            logical_red_end: logical_end,
            successor,
        });
    }

    log::debug!(
        "critical path: {} rows, {} connectors",
        rows.len(),
        connectors.len()
    );

    CriticalPathReport { rows, connectors }
}
