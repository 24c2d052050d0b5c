//! Timeline assembly
//!
//! Runs the timing pass, the critical-path analysis and the day-load fold over
//! the ordered task list and merges them, with sub-tasks and date labels, into
//! one `Timeline` per calculation.

use std::collections::HashMap;

use crate::config::TimelineConfig;
use crate::critical_path;
use crate::date_utils;
use crate::segments;
use crate::timing;
use crate::types::{SubTask, Task, Timeline, TimelineRow, TimelineStats};
use crate::utils;

pub fn build(tasks: &[Task], subtasks: &[SubTask], config: &TimelineConfig) -> Timeline {
    let started = utils::now_ms();
    let schedule = timing::compute(tasks);
    let report = critical_path::analyze(tasks, &schedule, &config.parallel_remark);
    let daily_load = timing::daily_load(tasks, &schedule);

    let mut children: HashMap<&str, Vec<SubTask>> = HashMap::new();
    for sub in subtasks {
        children.entry(sub.item_id.as_str()).or_default().push(sub.clone());
    }
    for list in children.values_mut() {
        list.sort_by(|a, b| a.start_day.total_cmp(&b.start_day));
    }

    let id_of = |row: usize| schedule.timings[row].id.clone();
    let calendar = config.calendar.as_ref();

    let rows: Vec<TimelineRow> = tasks
        .iter()
        .zip(&schedule.timings)
        .zip(&report.rows)
        .map(|((task, timing), analysis)| {
            let meta = &timing.meta;
            let labels = calendar.and_then(|cal| date_utils::label_bar(cal, timing.start_day, timing.duration_days));
            TimelineRow {
                id: task.id.clone(),
                row: analysis.row,
                main_category: task.main_category.clone(),
                process: task.process.clone(),
                work_type: task.work_type.clone(),
                start_day: timing.start_day,
                duration_days: timing.duration_days,
                finish_day: timing.end_day(),
                pinned: timing.pinned,
                red_start: timing.red_start,
                red_end: timing.red_end,
                logical_red_end: analysis.logical_red_end,
                cumulative_cp_end: timing.cumulative_cp_end,
                parallel_days: meta.parallel_days,
                critical_days: meta.critical_days,
                application_rate: meta.application_rate,
                front_parallel_days: meta.front_parallel_days,
                back_parallel_days: meta.back_parallel_days,
                parallel_segments: meta.segments.clone(),
                critical_segments: segments::build_critical_segments_from_parallel(
                    timing.start_day,
                    timing.duration_days,
                    &meta.segments,
                ),
                is_parallel: analysis.is_parallel,
                is_contained: analysis.is_contained,
                contains: analysis.contains.iter().map(|&row| id_of(row)).collect(),
                successor: analysis.successor.map(id_of),
                subtasks: children.remove(task.id.as_str()).unwrap_or_default(),
                start_date: labels.as_ref().map(|l| l.start_date.clone()),
                finish_date: labels.as_ref().map(|l| l.finish_date.clone()),
                work_days: labels.map(|l| l.work_days),
            }
        })
        .collect();

    let project_end = calendar.and_then(|cal| {
        let start = date_utils::parse_date(cal.project_start.as_deref()?)?;
        let last_day = (schedule.total_duration.ceil() - 1.0).max(0.0);
        date_utils::day_to_date(start, last_day).map(date_utils::format_date)
    });

    let stats = TimelineStats {
        calc_time: (utils::now_ms() - started).max(0.0),
        task_count: rows.len(),
        critical_count: report.critical_count(),
        total_duration: schedule.total_duration,
        project_end,
    };

    log::debug!(
        "timeline built: {} rows, {} critical, {} connectors",
        stats.task_count,
        stats.critical_count,
        report.connectors.len()
    );

    Timeline {
        rows,
        connectors: report.connectors,
        daily_load,
        stats,
    }
}
