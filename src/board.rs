//! The board: single owner of the canonical sequence, the active filter and sort, and the
//! mutation coordinator. All state sits behind one mutex that is only held for short
//! synchronous sections, never across a store call, so any number of board futures can be
//! in flight on the same (single-threaded) executor.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::config::{ClientConfig, ReorderPolicy};
use crate::coordinator::{Coordinator, MutationKind, MutationState, Ticket};
use crate::error::ClientError;
use crate::events::{Notice, NoticeKind, Notifier};
use crate::labels::{labels, resolve_language, Labels};
use crate::models::{SortMode, Task, TaskDraft, TaskFilter, TaskId, TaskPatch};
use crate::ordering::TaskSequence;
use crate::projection::{calendar_events, CalendarEvent, Projection, Projector, TaskStats, ViewKind};
use crate::store::TaskStore;

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    ToggleStatus(TaskId),
    Delete(TaskId),
    Edit(TaskId, TaskDraft),
    Create(TaskDraft),
}

impl Mutation {
    fn kind(&self) -> MutationKind {
        match self {
            Mutation::ToggleStatus(_) => MutationKind::ToggleStatus,
            Mutation::Delete(_) => MutationKind::Delete,
            Mutation::Edit(..) => MutationKind::Edit,
            Mutation::Create(_) => MutationKind::Create,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "count", rename_all = "snake_case")]
pub enum FetchOutcome {
    /// The sequence was replaced with this many tasks.
    Applied(usize),
    /// A newer fetch was issued while this one was in flight; its result was dropped.
    Superseded,
    /// The store failed; the previous sequence is still shown.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOutcome {
    Fetched(FetchOutcome),
    /// Another filter edit arrived inside the quiet window.
    Debounced,
}

/// Read-only copy of the board state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardSnapshot {
    pub tasks: Vec<Task>,
    pub filter: TaskFilter,
    pub sort: SortMode,
    /// Tasks with a store request still in flight.
    pub pending: Vec<TaskId>,
}

impl BoardSnapshot {
    pub fn project(&self, projector: &Projector, view: ViewKind, now: NaiveDateTime) -> Projection<'_> {
        projector.project(&self.tasks, self.sort, view, now)
    }

    pub fn stats(&self, now: NaiveDateTime) -> TaskStats {
        TaskStats::collect(&self.tasks, now)
    }

    pub fn calendar_events(&self) -> Vec<CalendarEvent> {
        calendar_events(&self.tasks)
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.iter().any(|pending| pending == id)
    }
}

#[derive(Debug, Default)]
struct BoardData {
    sequence: TaskSequence,
    coordinator: Coordinator,
    filter: TaskFilter,
    sort: SortMode,
    filter_generation: u64,
    fetch_seq: u64,
}

pub struct TaskBoard<S> {
    store: Arc<S>,
    notifier: Arc<dyn Notifier>,
    state: Arc<Mutex<BoardData>>,
    debounce: Duration,
    reorder_policy: ReorderPolicy,
    projector: Projector,
}

impl<S> Clone for TaskBoard<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
            state: Arc::clone(&self.state),
            debounce: self.debounce,
            reorder_policy: self.reorder_policy,
            projector: self.projector,
        }
    }
}

impl<S: TaskStore> TaskBoard<S> {
    pub fn new(store: Arc<S>, notifier: Arc<dyn Notifier>, config: &ClientConfig) -> Self {
        let language = resolve_language(&config.language);
        Self {
            store,
            notifier,
            state: Arc::new(Mutex::new(BoardData::default())),
            debounce: Duration::from_millis(config.debounce_ms),
            reorder_policy: config.reorder_policy,
            projector: Projector::new(language, config.local_sort),
        }
    }

    pub fn projector(&self) -> Projector {
        self.projector
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        let data = self.lock();
        BoardSnapshot {
            tasks: data.sequence.tasks().to_vec(),
            filter: data.filter.clone(),
            sort: data.sort,
            pending: data.coordinator.pending_ids(),
        }
    }

    /// Fetches with the current filter and sort. Only the newest fetch may replace the
    /// sequence; a failure keeps the previous one on screen.
    pub async fn refresh(&self) -> FetchOutcome {
        let (fetch_seq, filter, sort) = {
            let mut data = self.lock();
            data.fetch_seq += 1;
            (data.fetch_seq, data.filter.clone(), data.sort)
        };

        let result = self.store.list_tasks(&filter, sort).await;

        let mut data = self.lock();
        if data.fetch_seq != fetch_seq {
            log::debug!(
                "board: dropping superseded fetch seq={fetch_seq} latest={}",
                data.fetch_seq
            );
            return FetchOutcome::Superseded;
        }
        match result {
            Ok(tasks) => {
                let count = tasks.len();
                data.sequence.replace(tasks);
                log::info!("board: fetched count={count} sort={}", sort.as_str());
                FetchOutcome::Applied(count)
            }
            Err(err) => {
                log::warn!("board: fetch failed, keeping previous tasks: {err}");
                FetchOutcome::Failed
            }
        }
    }

    /// Records the filter right away and fetches once no other edit arrived for the
    /// debounce window.
    pub async fn apply_filter(&self, filter: TaskFilter) -> FilterOutcome {
        let generation = {
            let mut data = self.lock();
            data.filter = filter;
            data.filter_generation += 1;
            data.filter_generation
        };

        tokio::time::sleep(self.debounce).await;

        if self.lock().filter_generation != generation {
            return FilterOutcome::Debounced;
        }
        FilterOutcome::Fetched(self.refresh().await)
    }

    pub async fn apply_sort(&self, sort: SortMode) -> FetchOutcome {
        self.lock().sort = sort;
        self.refresh().await
    }

    /// Drag reorder. `None` when the move is a no-op (unknown id or same task).
    pub async fn apply_move(&self, source_id: &str, target_id: &str) -> Option<MutationState> {
        if self.reorder_policy == ReorderPolicy::SessionOnly {
            let mut data = self.lock();
            data.sequence.apply_move(source_id, target_id)?;
            return Some(MutationState::Confirmed);
        }

        let (ticket, outcome) = {
            let mut data = self.lock();
            let BoardData {
                sequence,
                coordinator,
                ..
            } = &mut *data;
            coordinator.begin_move(sequence, source_id, target_id)?
        };

        let mut result = Ok(());
        for (id, position) in &outcome.changed {
            if let Err(err) = self.store.update_task(id, &TaskPatch::position(*position)).await {
                result = Err(err);
                break;
            }
        }

        let state = self.finish(ticket, result.as_ref().map(|_| ()));
        if let Err(err) = &result {
            if state == MutationState::RolledBack {
                let text = self.labels();
                self.notify_failure(Some(source_id), failure_message(&text, text.reorder_failed, err));
            }
            // Positions written before the failure stay on the store.
            self.refresh().await;
        }
        Some(state)
    }

    /// Runs one user mutation through the store. `Err` means nothing was attempted:
    /// the input failed validation or the task is not on the board.
    pub async fn apply_mutation(&self, mutation: Mutation) -> Result<MutationState, ClientError> {
        let kind = mutation.kind();
        let state = match mutation {
            Mutation::ToggleStatus(id) => self.toggle_status(&id).await?,
            Mutation::Delete(id) => self.delete(&id).await?,
            Mutation::Edit(id, draft) => self.edit(&id, &draft).await?,
            Mutation::Create(draft) => self.create(&draft).await?,
        };
        log::info!("board: mutation kind={kind:?} state={state:?}");
        Ok(state)
    }

    async fn toggle_status(&self, id: &str) -> Result<MutationState, ClientError> {
        let (ticket, status) = {
            let mut data = self.lock();
            let BoardData {
                sequence,
                coordinator,
                ..
            } = &mut *data;
            coordinator
                .begin_toggle(sequence, id)
                .ok_or_else(|| unknown_task(id))?
        };

        let result = self.store.update_task(id, &TaskPatch::status(status)).await;
        let state = self.finish(ticket, result.as_ref().map(|_| ()));
        if let Err(err) = &result {
            log::warn!("board: status update failed id={id}: {err}");
            if state == MutationState::RolledBack {
                let text = self.labels();
                self.notify_failure(Some(id), failure_message(&text, text.status_failed, err));
            }
        }
        Ok(state)
    }

    async fn delete(&self, id: &str) -> Result<MutationState, ClientError> {
        let ticket = {
            let mut data = self.lock();
            let BoardData {
                sequence,
                coordinator,
                ..
            } = &mut *data;
            coordinator
                .begin_delete(sequence, id)
                .ok_or_else(|| unknown_task(id))?
        };

        let result = self.store.delete_task(id).await;
        let state = self.finish(ticket, result.as_ref().map(|_| ()));
        let text = self.labels();
        match &result {
            Ok(()) => self.notify_success(Some(id), text.task_deleted),
            Err(err) => {
                log::warn!("board: delete failed id={id}: {err}");
                if state == MutationState::RolledBack {
                    self.notify_failure(Some(id), failure_message(&text, text.delete_failed, err));
                }
            }
        }
        Ok(state)
    }

    async fn edit(&self, id: &str, draft: &TaskDraft) -> Result<MutationState, ClientError> {
        draft.validate()?;
        let patch = TaskPatch::from_draft(draft);
        let ticket = {
            let mut data = self.lock();
            let BoardData {
                sequence,
                coordinator,
                ..
            } = &mut *data;
            coordinator
                .begin_edit(sequence, id)
                .ok_or_else(|| unknown_task(id))?
        };

        let result = self.store.update_task(id, &patch).await;
        let state = self.finish(ticket, result.as_ref().map(|_| ()));
        let text = self.labels();
        match &result {
            Ok(()) => {
                self.refresh().await;
                self.notify_success(Some(id), text.task_updated);
            }
            Err(err) => {
                log::warn!("board: edit failed id={id}: {err}");
                if state == MutationState::RolledBack {
                    self.notify_failure(Some(id), failure_message(&text, text.update_failed, err));
                }
            }
        }
        Ok(state)
    }

    async fn create(&self, draft: &TaskDraft) -> Result<MutationState, ClientError> {
        draft.validate()?;
        let (ticket, position) = {
            let mut data = self.lock();
            let position = data.sequence.len() as i64;
            (data.coordinator.begin_create(), position)
        };

        let result = self.store.create_task(draft, position).await;
        let state = self.finish(ticket, result.as_ref().map(|_| ()));
        let text = self.labels();
        match &result {
            Ok(task) => {
                log::info!("board: created id={} position={}", task.id, task.position);
                self.refresh().await;
                self.notify_success(Some(&task.id), text.task_created);
            }
            Err(err) => {
                log::warn!("board: create failed: {err}");
                self.notify_failure(None, failure_message(&text, text.create_failed, err));
            }
        }
        Ok(state)
    }

    fn finish(
        &self,
        ticket: Ticket,
        result: Result<(), &ClientError>,
    ) -> MutationState {
        let mut data = self.lock();
        let BoardData {
            sequence,
            coordinator,
            ..
        } = &mut *data;
        coordinator.finish(sequence, ticket, result)
    }

    fn lock(&self) -> MutexGuard<'_, BoardData> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn labels(&self) -> Labels {
        labels(self.projector.language)
    }

    fn notify_success(&self, task_id: Option<&str>, message: &str) {
        self.notifier.notify(Notice {
            kind: NoticeKind::Success,
            title: self.labels().done_title.to_string(),
            message: message.to_string(),
            task_id: task_id.map(str::to_string),
        });
    }

    fn notify_failure(&self, task_id: Option<&str>, message: String) {
        self.notifier.notify(Notice {
            kind: NoticeKind::Failure,
            title: self.labels().error_title.to_string(),
            message,
            task_id: task_id.map(str::to_string),
        });
    }
}

fn unknown_task(id: &str) -> ClientError {
    ClientError::Validation(format!("task not found: {id}"))
}

/// Network failures get the generic network text; rejections name the failed action.
fn failure_message(text: &Labels, action: &str, err: &ClientError) -> String {
    match err {
        ClientError::Network(_) => text.network_problem.to_string(),
        _ => action.to_string(),
    }
}
