//! Client-side task board: ordering, grouped projection, optimistic mutations and
//! debounced filtering on top of a remote task store.

mod board;
mod config;
mod coordinator;
mod error;
mod events;
mod labels;
pub mod logging;
pub mod models;
mod ordering;
mod projection;
mod store;

pub use board::{BoardSnapshot, FetchOutcome, FilterOutcome, Mutation, TaskBoard};
pub use config::{ClientConfig, ConfigStore, ReorderPolicy, API_URL_ENV};
pub use coordinator::{Coordinator, MutationKind, MutationState, Ticket};
pub use error::{ClientError, ConfigError};
pub use events::{LogNotifier, Notice, NoticeKind, Notifier};
pub use labels::{day_label, labels, resolve_language, Labels, Language};
pub use models::{
    Priority, Recurrence, RecurrenceKind, Reminder, SortMode, StatusFilter, Task, TaskDraft,
    TaskFilter, TaskId, TaskPatch,
};
pub use ordering::{move_task, MoveOutcome, TaskSequence};
pub use projection::{
    calendar_events, Bucket, CalendarEvent, Projection, Projector, TaskGroup, TaskStats, ViewKind,
};
#[cfg(feature = "app")]
pub use store::HttpTaskStore;
pub use store::{list_query, TaskStore};
