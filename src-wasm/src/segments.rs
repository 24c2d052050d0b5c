//! Parallel segment math
//!
//! Pure helpers that turn the parallel (grey) day-ranges of a task into a
//! normalized list and derive the critical (red) quantities from it.
//! Every function substitutes 0 for non-finite input and never panics.

use serde::{Deserialize, Serialize};

use crate::types::Task;

/// Lengths at or below this are treated as zero
pub const EPSILON: f64 = 1e-6;

/// A `{start, end}` day range.
///
/// Relative to the owning task's start unless a function says otherwise.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
}

impl Segment {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= EPSILON
    }

    /// Positive-length intersection test. Touching ranges do not overlap.
    pub fn overlaps(&self, other: &Segment) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.start < other.end - EPSILON && other.start < self.end - EPSILON
    }
}

/// Derived parallel/critical quantities for one task
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SegmentMeta {
    /// Normalized relative parallel segments
    pub segments: Vec<Segment>,
    pub parallel_days: f64,
    pub critical_days: f64,
    /// Critical share of the duration, in percent
    pub application_rate: f64,
    pub front_parallel_days: f64,
    pub back_parallel_days: f64,
}

pub(crate) fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Clamp that tolerates `lo > hi` and NaN instead of panicking like `f64::clamp`.
pub(crate) fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Rounding can carry a value past `duration`, so clamp on both sides of it
fn clamp_rounded(value: f64, duration: f64) -> f64 {
    clamp(round3(clamp(finite_or(value, 0.0), 0.0, duration)), 0.0, duration)
}

/// Clamp, round, sort and merge a segment list.
///
/// Rounding to 3 decimals happens before zero-length segments are dropped and
/// neighbours merged, so the output is a fixed point of this function.
pub fn normalize(segments: &[Segment], duration: f64) -> Vec<Segment> {
    let duration = finite_or(duration, 0.0);
    if duration <= EPSILON || segments.is_empty() {
        return Vec::new();
    }

    let mut cleaned: Vec<Segment> = segments
        .iter()
        .filter_map(|seg| {
            let a = clamp_rounded(seg.start, duration);
            let b = clamp_rounded(seg.end, duration);
            let (start, end) = if a <= b { (a, b) } else { (b, a) };
            (end - start > EPSILON).then_some(Segment { start, end })
        })
        .collect();
    cleaned.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut merged: Vec<Segment> = Vec::with_capacity(cleaned.len());
    for seg in cleaned {
        match merged.last_mut() {
            Some(last) if seg.start <= last.end + EPSILON => {
                last.end = last.end.max(seg.end);
            }
            _ => merged.push(seg),
        }
    }
    merged
}

/// Sum of segment lengths. Assumes the list does not overlap.
pub fn union_length(segments: &[Segment]) -> f64 {
    segments.iter().map(Segment::len).sum()
}

/// Parallel time contiguous with day 0
fn leading_run(segments: &[Segment]) -> f64 {
    let Some(first) = segments.first() else {
        return 0.0;
    };
    if first.start > EPSILON {
        return 0.0;
    }
    let mut run_end = first.end;
    for seg in &segments[1..] {
        if seg.start > run_end + EPSILON {
            break;
        }
        run_end = run_end.max(seg.end);
    }
    run_end
}

/// Parallel time contiguous with the task end
fn trailing_run(segments: &[Segment], duration: f64) -> f64 {
    let Some(last) = segments.last() else {
        return 0.0;
    };
    if duration - last.end > EPSILON {
        return 0.0;
    }
    let mut run_start = last.start;
    for seg in segments.iter().rev().skip(1) {
        if seg.end < run_start - EPSILON {
            break;
        }
        run_start = run_start.min(seg.start);
    }
    (duration - run_start).max(0.0)
}

/// Derive parallel/critical totals and the front/back runs.
///
/// A segment in the middle of the task reduces `critical_days` but leaves the
/// front and back runs alone: the red range is only trimmed from its ends.
pub fn derive_meta(duration: f64, segments: &[Segment]) -> SegmentMeta {
    let duration = finite_or(duration, 0.0).max(0.0);
    let segments = normalize(segments, duration);
    let parallel_days = union_length(&segments).min(duration);
    let critical_days = (duration - parallel_days).max(0.0);
    let application_rate = if duration <= EPSILON {
        100.0
    } else {
        critical_days / duration * 100.0
    };
    let front_parallel_days = leading_run(&segments).min(duration);
    let back_parallel_days = trailing_run(&segments, duration).min(duration);

    SegmentMeta {
        segments,
        parallel_days,
        critical_days,
        application_rate,
        front_parallel_days,
        back_parallel_days,
    }
}

/// Resolve a task's parallel segments.
///
/// Order: a non-empty explicit list, then the legacy front/back scalars, then
/// nothing. `duration_override` replaces the task's own duration.
pub fn from_item(task: &Task, duration_override: Option<f64>) -> Vec<Segment> {
    let duration = duration_override
        .map(|d| finite_or(d, 0.0))
        .unwrap_or(task.duration_days)
        .max(0.0);

    if let Some(explicit) = task.parallel_segments.as_deref().filter(|s| !s.is_empty()) {
        return normalize(explicit, duration);
    }

    let front = clamp(finite_or(task.front_parallel_days.unwrap_or(0.0), 0.0), 0.0, duration);
    let back = clamp(finite_or(task.back_parallel_days.unwrap_or(0.0), 0.0), 0.0, duration);

    let mut legacy = Vec::with_capacity(2);
    if front > EPSILON {
        legacy.push(Segment::new(0.0, front));
    }
    if back > EPSILON {
        legacy.push(Segment::new(duration - back, duration));
    }
    normalize(&legacy, duration)
}

pub fn to_absolute(segments: &[Segment], task_start: f64) -> Vec<Segment> {
    let offset = finite_or(task_start, 0.0);
    segments
        .iter()
        .map(|seg| Segment::new(seg.start + offset, seg.end + offset))
        .collect()
}

/// Absolute critical sub-ranges: the complement of the parallel segments
/// within `[task_start, task_start + duration]`.
pub fn build_critical_segments_from_parallel(
    task_start: f64,
    duration: f64,
    relative_segments: &[Segment],
) -> Vec<Segment> {
    let start = finite_or(task_start, 0.0);
    let duration = finite_or(duration, 0.0).max(0.0);
    if duration <= EPSILON {
        return Vec::new();
    }
    let end = start + duration;
    let parallel = to_absolute(&normalize(relative_segments, duration), start);

    let mut critical = Vec::new();
    let mut cursor = start;
    for seg in parallel {
        if seg.start > cursor + EPSILON {
            critical.push(Segment::new(cursor, seg.start));
        }
        cursor = cursor.max(seg.end);
    }
    if end > cursor + EPSILON {
        critical.push(Segment::new(cursor, end));
    }
    critical
}

/// One trailing parallel segment sized from a critical application rate.
///
/// A missing rate counts as fully critical.
pub fn build_right_aligned_parallel_segments(duration: f64, application_rate: f64) -> Vec<Segment> {
    let duration = finite_or(duration, 0.0).max(0.0);
    let rate = clamp(finite_or(application_rate, 100.0), 0.0, 100.0);
    let parallel = duration * (1.0 - rate / 100.0);
    if parallel <= EPSILON {
        return Vec::new();
    }
    normalize(&[Segment::new(duration - parallel, duration)], duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn seg(start: f64, end: f64) -> Segment {
        Segment::new(start, end)
    }

    #[test]
    fn normalize_clamps_swaps_and_merges() {
        let out = normalize(&[seg(8.0, 12.0), seg(3.0, 1.0), seg(2.0, 4.0), seg(-5.0, 0.0)], 10.0);
        assert_eq!(out, vec![seg(1.0, 4.0), seg(8.0, 10.0)]);
    }

    #[test]
    fn normalize_merges_touching_segments() {
        let out = normalize(&[seg(0.0, 2.0), seg(2.0, 3.0)], 5.0);
        assert_eq!(out, vec![seg(0.0, 3.0)]);
    }

    #[test]
    fn normalize_rejects_degenerate_input() {
        assert!(normalize(&[seg(0.0, 1.0)], 0.0).is_empty());
        assert!(normalize(&[seg(0.0, 1.0)], f64::NAN).is_empty());
        assert!(normalize(&[], 10.0).is_empty());
        assert!(normalize(&[seg(f64::NAN, f64::INFINITY)], 10.0).is_empty());
    }

    #[test]
    fn normalize_rounds_to_three_decimals() {
        let out = normalize(&[seg(0.12345, 1.98765)], 5.0);
        assert_eq!(out, vec![seg(0.123, 1.988)]);
    }

    #[test]
    fn rounding_never_passes_duration() {
        let out = normalize(&[seg(0.5, 2.0)], 1.0006);
        assert_eq!(out, vec![seg(0.5, 1.0006)]);
        assert_eq!(normalize(&out, 1.0006), out);
    }

    #[test]
    fn meta_tracks_front_and_back_runs() {
        let meta = derive_meta(10.0, &[seg(0.0, 2.0), seg(7.0, 10.0)]);
        assert_eq!(meta.front_parallel_days, 2.0);
        assert_eq!(meta.back_parallel_days, 3.0);
        assert_eq!(meta.parallel_days, 5.0);
        assert_eq!(meta.critical_days, 5.0);
        assert!((meta.application_rate - 50.0).abs() < 1e-9);
    }

    #[test]
    fn middle_segment_only_reduces_totals() {
        let meta = derive_meta(10.0, &[seg(4.0, 6.0)]);
        assert_eq!(meta.front_parallel_days, 0.0);
        assert_eq!(meta.back_parallel_days, 0.0);
        assert_eq!(meta.critical_days, 8.0);
    }

    #[test]
    fn zero_duration_is_fully_critical() {
        let meta = derive_meta(0.0, &[seg(0.0, 1.0)]);
        assert_eq!(meta.application_rate, 100.0);
        assert_eq!(meta.parallel_days, 0.0);
        assert!(meta.segments.is_empty());
    }

    #[test]
    fn from_item_prefers_explicit_segments() {
        let task = Task {
            duration_days: 10.0,
            parallel_segments: Some(vec![seg(5.0, 6.0)]),
            front_parallel_days: Some(3.0),
            ..Task::default()
        };
        assert_eq!(from_item(&task, None), vec![seg(5.0, 6.0)]);
    }

    #[test]
    fn from_item_falls_back_to_legacy_scalars() {
        let task = Task {
            duration_days: 10.0,
            parallel_segments: Some(Vec::new()),
            front_parallel_days: Some(2.0),
            back_parallel_days: Some(15.0),
            ..Task::default()
        };
        // back is clamped to the duration and swallows the front run
        assert_eq!(from_item(&task, None), vec![seg(0.0, 10.0)]);
        assert_eq!(from_item(&task, Some(4.0)), vec![seg(0.0, 4.0)]);
        assert!(from_item(&Task::default(), None).is_empty());
    }

    #[test]
    fn critical_segments_are_the_complement() {
        let critical = build_critical_segments_from_parallel(
            5.0,
            10.0,
            &[seg(0.0, 2.0), seg(4.0, 5.0)],
        );
        assert_eq!(critical, vec![seg(7.0, 9.0), seg(10.0, 15.0)]);

        let none = build_critical_segments_from_parallel(0.0, 4.0, &[seg(0.0, 4.0)]);
        assert!(none.is_empty());
    }

    #[test]
    fn right_aligned_segment_follows_rate() {
        assert_eq!(build_right_aligned_parallel_segments(10.0, 70.0), vec![seg(7.0, 10.0)]);
        assert!(build_right_aligned_parallel_segments(10.0, 100.0).is_empty());
        assert!(build_right_aligned_parallel_segments(10.0, f64::NAN).is_empty());
        assert_eq!(build_right_aligned_parallel_segments(10.0, -20.0), vec![seg(0.0, 10.0)]);
    }

    #[test]
    fn overlaps_ignores_touching_and_empty_ranges() {
        assert!(seg(0.0, 5.0).overlaps(&seg(4.0, 6.0)));
        assert!(!seg(0.0, 5.0).overlaps(&seg(5.0, 6.0)));
        assert!(!seg(0.0, 5.0).overlaps(&seg(3.0, 3.0)));
    }

    fn segment_strategy() -> impl Strategy<Value = Segment> {
        (-20.0f64..120.0, -20.0f64..120.0).prop_map(|(a, b)| Segment::new(a, b))
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(
            segments in proptest::collection::vec(segment_strategy(), 0..12),
            duration in 0.0f64..100.0,
        ) {
            let once = normalize(&segments, duration);
            let twice = normalize(&once, duration);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_parallel_and_critical_sum_to_duration(
            segments in proptest::collection::vec(segment_strategy(), 0..12),
            duration in 0.0f64..100.0,
        ) {
            let meta = derive_meta(duration, &segments);
            prop_assert!(meta.parallel_days >= 0.0);
            prop_assert!(meta.critical_days >= 0.0);
            prop_assert!((meta.parallel_days + meta.critical_days - duration).abs() <= EPSILON);
            prop_assert!(meta.front_parallel_days <= duration + EPSILON);
            prop_assert!(meta.back_parallel_days <= duration + EPSILON);
        }
    }
}
