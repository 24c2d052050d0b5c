//! Timing pass
//!
//! Walks the ordered task list once. List order is the dependency chain:
//! each unpinned task starts where the running critical-path end is, pulled
//! earlier by its own front parallel time.

use serde::Serialize;

use crate::segments::{self, clamp, finite_or, Segment, SegmentMeta, EPSILON};
use crate::types::Task;

/// Upper bound on day-load buckets so a wild pin cannot allocate forever
const MAX_LOAD_DAYS: usize = 36_500;

/// Computed placement of one task
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskTiming {
    pub id: String,
    pub start_day: f64,
    pub duration_days: f64,
    pub red_start: f64,
    pub red_end: f64,
    /// Running critical-path end after this task
    pub cumulative_cp_end: f64,
    pub pinned: bool,
    pub meta: SegmentMeta,
}

impl TaskTiming {
    pub fn end_day(&self) -> f64 {
        self.start_day + self.duration_days
    }

    pub fn red_range(&self) -> Segment {
        Segment::new(self.red_start, self.red_end)
    }

    pub fn red_len(&self) -> f64 {
        self.red_end - self.red_start
    }
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub timings: Vec<TaskTiming>,
    pub total_duration: f64,
}

impl Schedule {
    pub fn row_of(&self, id: &str) -> Option<usize> {
        self.timings.iter().position(|t| t.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&TaskTiming> {
        self.timings.iter().find(|t| t.id == id)
    }
}

/// Segments used by the timing pass: explicit list or legacy scalars, then a
/// right-aligned segment from the criteria application rate.
pub fn resolve_segments(task: &Task) -> Vec<Segment> {
    let segments = segments::from_item(task, None);
    match task.application_rate {
        Some(rate) if segments.is_empty() => {
            segments::build_right_aligned_parallel_segments(task.duration_days, rate)
        }
        _ => segments,
    }
}

pub fn compute(tasks: &[Task]) -> Schedule {
    let mut cumulative_cp_end: f64 = 0.0;
    let mut timings = Vec::with_capacity(tasks.len());

    for task in tasks {
        let duration = finite_or(task.duration_days, 0.0).max(0.0);
        let meta = segments::derive_meta(duration, &resolve_segments(task));
        let pin = task.pinned_start.filter(|v| v.is_finite());

        let start_day = match pin {
            Some(day) => day,
            None => (cumulative_cp_end - meta.front_parallel_days).max(0.0),
        };
        let finish = start_day + duration;
        let red_start = clamp(start_day + meta.front_parallel_days, start_day, finish);
        let red_end = clamp(finish - meta.back_parallel_days, red_start, finish);

        cumulative_cp_end = cumulative_cp_end.max(red_end);

        timings.push(TaskTiming {
            id: task.id.clone(),
            start_day,
            duration_days: duration,
            red_start,
            red_end,
            cumulative_cp_end,
            pinned: pin.is_some(),
            meta,
        });
    }

    let total_duration = timings.iter().map(TaskTiming::end_day).fold(0.0, f64::max);
    log::debug!(
        "timing pass: {} tasks, critical path ends at day {:.3}, total {:.3}",
        timings.len(),
        cumulative_cp_end,
        total_duration
    );

    Schedule {
        timings,
        total_duration,
    }
}

/// Crew count per whole day index, folded over an already computed schedule.
///
/// A task adds its crew to every day from `floor(start)` to
/// `ceil(start + duration) - 1`.
pub fn daily_load(tasks: &[Task], schedule: &Schedule) -> Vec<f64> {
    let days = (schedule.total_duration.ceil().max(0.0) as usize).min(MAX_LOAD_DAYS);
    let mut load = vec![0.0; days];

    for (task, timing) in tasks.iter().zip(&schedule.timings) {
        let crew = finite_or(task.crew_size, 0.0);
        if crew <= 0.0 || timing.duration_days <= EPSILON {
            continue;
        }
        let first = timing.start_day.floor().max(0.0) as usize;
        let last = (timing.end_day().ceil().max(0.0) as usize).min(days);
        for day in first..last {
            load[day] += crew;
        }
    }
    load
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn task(id: &str, duration: f64) -> Task {
        Task::new(id, duration)
    }

    #[test]
    fn sequential_tasks_chain_end_to_start() {
        let schedule = compute(&[task("A", 10.0), task("B", 5.0)]);
        let a = &schedule.timings[0];
        let b = &schedule.timings[1];
        assert_eq!((a.start_day, a.red_end), (0.0, 10.0));
        assert_eq!((b.start_day, b.red_end), (10.0, 15.0));
        assert_eq!(schedule.total_duration, 15.0);
    }

    #[test]
    fn front_parallel_time_pulls_start_earlier() {
        let a = Task {
            front_parallel_days: Some(0.0),
            back_parallel_days: Some(3.0),
            ..task("A", 10.0)
        };
        let b = Task {
            front_parallel_days: Some(2.0),
            ..task("B", 6.0)
        };
        let schedule = compute(&[a, b]);
        assert_eq!(schedule.timings[0].red_end, 7.0);
        let b = &schedule.timings[1];
        assert_eq!(b.start_day, 5.0);
        assert_eq!((b.red_start, b.red_end), (7.0, 11.0));
    }

    #[test]
    fn pinned_task_ignores_running_end_but_feeds_it() {
        let pinned = Task {
            pinned_start: Some(30.0),
            ..task("P", 4.0)
        };
        let schedule = compute(&[task("A", 10.0), pinned, task("C", 2.0)]);
        assert_eq!(schedule.timings[1].start_day, 30.0);
        assert!(schedule.timings[1].pinned);
        assert_eq!(schedule.timings[2].start_day, 34.0);
    }

    #[test]
    fn application_rate_synthesizes_trailing_parallel_time() {
        let rated = Task {
            application_rate: Some(60.0),
            ..task("A", 10.0)
        };
        let schedule = compute(&[rated, task("B", 1.0)]);
        assert_eq!(schedule.timings[0].red_end, 6.0);
        assert_eq!(schedule.timings[1].start_day, 6.0);
    }

    #[test]
    fn daily_load_spreads_crew_over_touched_days() {
        let tasks = vec![
            Task {
                crew_size: 3.0,
                ..task("A", 2.5)
            },
            Task {
                crew_size: 2.0,
                ..task("B", 1.0)
            },
        ];
        let schedule = compute(&tasks);
        // A covers days 0..2.5, B covers 2.5..3.5
        assert_eq!(daily_load(&tasks, &schedule), vec![3.0, 3.0, 5.0, 2.0]);
    }

    #[test]
    fn empty_list_is_empty_schedule() {
        let schedule = compute(&[]);
        assert!(schedule.timings.is_empty());
        assert_eq!(schedule.total_duration, 0.0);
        assert!(daily_load(&[], &schedule).is_empty());
    }

    fn task_strategy() -> impl Strategy<Value = Task> {
        (0.0f64..30.0, 0.0f64..10.0, 0.0f64..10.0).prop_map(|(duration, front, back)| Task {
            duration_days: duration,
            front_parallel_days: Some(front),
            back_parallel_days: Some(back),
            ..Task::default()
        })
    }

    proptest! {
        #[test]
        fn prop_timing_is_deterministic_and_monotonic(
            tasks in proptest::collection::vec(task_strategy(), 0..15)
        ) {
            let first = compute(&tasks);
            let second = compute(&tasks);
            prop_assert_eq!(&first, &second);

            let mut previous = 0.0;
            for timing in &first.timings {
                prop_assert!(timing.cumulative_cp_end >= previous);
                prop_assert!(timing.start_day >= 0.0);
                prop_assert!(timing.red_start <= timing.red_end);
                previous = timing.cumulative_cp_end;
            }
        }
    }
}
