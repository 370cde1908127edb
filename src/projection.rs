//! Display projections over the canonical sequence: sorted lists, day buckets for the list
//! view, calendar events and summary counters. Nothing here mutates the sequence.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::labels::{day_label, labels, Language};
use crate::models::{Priority, SortMode, Task, TaskId};

/// List-view bucket. The derived `Ord` is the display order of the groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "date", rename_all = "snake_case")]
pub enum Bucket {
    Overdue,
    Today,
    Tomorrow,
    Day(NaiveDate),
    NoDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    List,
    Calendar,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskGroup<'a> {
    pub bucket: Bucket,
    pub label: String,
    pub tasks: Vec<&'a Task>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "layout", content = "items", rename_all = "snake_case")]
pub enum Projection<'a> {
    Grouped(Vec<TaskGroup<'a>>),
    Flat(Vec<&'a Task>),
}

impl Projection<'_> {
    /// Number of task entries across the whole projection.
    pub fn task_count(&self) -> usize {
        match self {
            Projection::Grouped(groups) => groups.iter().map(|g| g.tasks.len()).sum(),
            Projection::Flat(tasks) => tasks.len(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Projector {
    pub language: Language,
    /// When false the store's response order is trusted as already sorted.
    pub local_sort: bool,
}

impl Projector {
    pub fn new(language: Language, local_sort: bool) -> Self {
        Self {
            language,
            local_sort,
        }
    }

    pub fn project<'a>(
        &self,
        tasks: &'a [Task],
        mode: SortMode,
        view: ViewKind,
        now: NaiveDateTime,
    ) -> Projection<'a> {
        let ordered = if self.local_sort {
            sort_for_display(tasks, mode)
        } else {
            tasks.iter().collect()
        };
        match view {
            ViewKind::List => Projection::Grouped(group_tasks(ordered, now, self.language)),
            ViewKind::Calendar => Projection::Flat(ordered),
        }
    }
}

/// Total and deterministic in `(date_time, status, now)`.
pub fn classify(task: &Task, now: NaiveDateTime) -> Bucket {
    let Some(when) = task.date_time else {
        return Bucket::NoDate;
    };
    if !task.status && when < now {
        return Bucket::Overdue;
    }
    let today = now.date();
    let date = when.date();
    if date == today {
        Bucket::Today
    } else if today.succ_opt() == Some(date) {
        Bucket::Tomorrow
    } else {
        Bucket::Day(date)
    }
}

/// Stable display ordering; `Position` keeps the canonical order as is.
pub fn sort_for_display(tasks: &[Task], mode: SortMode) -> Vec<&Task> {
    let mut ordered: Vec<&Task> = tasks.iter().collect();
    match mode {
        SortMode::Position => {}
        SortMode::Date => ordered.sort_by(|a, b| compare_dates(a, b)),
        SortMode::Priority => ordered.sort_by_key(|t| t.priority.rank()),
        SortMode::Title => ordered.sort_by_cached_key(|t| t.title.to_lowercase()),
    }
    ordered
}

fn compare_dates(a: &Task, b: &Task) -> Ordering {
    match (a.date_time, b.date_time) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Partitions already-ordered tasks into labeled buckets; order inside a bucket is kept.
pub fn group_tasks(ordered: Vec<&Task>, now: NaiveDateTime, lang: Language) -> Vec<TaskGroup<'_>> {
    let mut buckets: BTreeMap<Bucket, Vec<&Task>> = BTreeMap::new();
    for task in ordered {
        buckets.entry(classify(task, now)).or_default().push(task);
    }

    let text = labels(lang);
    let current_year = now.year();
    buckets
        .into_iter()
        .map(|(bucket, tasks)| {
            let label = match bucket {
                Bucket::Overdue => text.overdue.to_string(),
                Bucket::Today => text.today.to_string(),
                Bucket::Tomorrow => text.tomorrow.to_string(),
                Bucket::Day(date) => day_label(lang, date, current_year),
                Bucket::NoDate => text.no_date.to_string(),
            };
            TaskGroup {
                bucket,
                label,
                tasks,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEvent {
    pub id: TaskId,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub done: bool,
    pub priority: Priority,
}

/// One-hour events for every dated task, canonical order. Undated tasks have no slot.
pub fn calendar_events(tasks: &[Task]) -> Vec<CalendarEvent> {
    tasks
        .iter()
        .filter_map(|task| {
            let start = task.date_time?;
            Some(CalendarEvent {
                id: task.id.clone(),
                title: task.title.clone(),
                start,
                end: start + Duration::hours(1),
                done: task.status,
                priority: task.priority,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub high_priority: usize,
    pub normal_priority: usize,
    pub low_priority: usize,
    pub today: usize,
    pub overdue: usize,
    /// Whole percent.
    pub completion_rate: u32,
}

impl TaskStats {
    pub fn collect(tasks: &[Task], now: NaiveDateTime) -> Self {
        let today = now.date();
        let mut stats = TaskStats {
            total: tasks.len(),
            ..TaskStats::default()
        };
        for task in tasks {
            if task.status {
                stats.completed += 1;
            } else {
                stats.active += 1;
                match task.priority {
                    Priority::High => stats.high_priority += 1,
                    Priority::Normal => stats.normal_priority += 1,
                    Priority::Low => stats.low_priority += 1,
                }
            }
            if task.date() == Some(today) {
                stats.today += 1;
            }
            if !task.status && task.date_time.is_some_and(|dt| dt < now) {
                stats.overdue += 1;
            }
        }
        if stats.total > 0 {
            stats.completion_rate =
                ((stats.completed as f64 / stats.total as f64) * 100.0).round() as u32;
        }
        stats
    }
}
