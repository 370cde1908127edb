//! Optimistic mutation bookkeeping.
//!
//! Every mutation is split into a synchronous `begin_*` step that applies whatever local
//! change the action allows and hands out a [`Ticket`], and a synchronous [`Coordinator::finish`]
//! step run when the store answers. Tickets carry a per-task request number; a response is
//! only allowed to touch local state if its number is still the newest one issued for
//! that task.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::ClientError;
use crate::models::TaskId;
use crate::ordering::{MoveOutcome, TaskSequence};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationState {
    Pending,
    Confirmed,
    RolledBack,
    /// A newer request for the same task was issued before this one resolved.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    ToggleStatus,
    Delete,
    Edit,
    Create,
    Move,
}

#[derive(Debug, Clone, PartialEq)]
enum Undo {
    Nothing,
    Status,
    Move(MoveOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub kind: MutationKind,
    pub task_id: Option<TaskId>,
    pub seq: u64,
    undo: Undo,
}

#[derive(Debug, Clone, Default)]
struct Requests {
    latest: u64,
    in_flight: usize,
    /// Status the store is known to hold for this task.
    confirmed_status: bool,
    /// Toggles still awaiting an answer, oldest first, with the value each one sent.
    toggles: Vec<(u64, bool)>,
}

#[derive(Debug, Default)]
pub struct Coordinator {
    next_seq: u64,
    requests: HashMap<TaskId, Requests>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids with at least one request still in flight.
    pub fn pending_ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.requests.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.requests.contains_key(id)
    }

    /// Flips `status` right away. Returns the ticket and the value to send.
    pub fn begin_toggle(&mut self, seq: &mut TaskSequence, id: &str) -> Option<(Ticket, bool)> {
        let task = seq.get_mut(id)?;
        let previous = task.status;
        task.status = !previous;
        let ticket = self.issue(MutationKind::ToggleStatus, Some(id), Undo::Status);
        let entry = self.requests.entry(id.to_string()).or_default();
        if entry.toggles.is_empty() {
            entry.confirmed_status = previous;
        }
        entry.toggles.push((ticket.seq, !previous));
        Some((ticket, !previous))
    }

    /// Delete is not applied locally until the store confirms it.
    pub fn begin_delete(&mut self, seq: &TaskSequence, id: &str) -> Option<Ticket> {
        seq.get(id)?;
        Some(self.issue(MutationKind::Delete, Some(id), Undo::Nothing))
    }

    /// Edits wait for confirmation and a refetch; nothing changes locally.
    pub fn begin_edit(&mut self, seq: &TaskSequence, id: &str) -> Option<Ticket> {
        seq.get(id)?;
        Some(self.issue(MutationKind::Edit, Some(id), Undo::Nothing))
    }

    pub fn begin_create(&mut self) -> Ticket {
        self.issue(MutationKind::Create, None, Undo::Nothing)
    }

    /// Applies the move locally; the ticket remembers how to put it back.
    pub fn begin_move(
        &mut self,
        seq: &mut TaskSequence,
        source_id: &str,
        target_id: &str,
    ) -> Option<(Ticket, MoveOutcome)> {
        let outcome = seq.apply_move(source_id, target_id)?;
        let ticket = self.issue(
            MutationKind::Move,
            Some(source_id),
            Undo::Move(outcome.clone()),
        );
        Some((ticket, outcome))
    }

    /// Resolves a ticket against the sequence as it is now.
    pub fn finish(
        &mut self,
        seq: &mut TaskSequence,
        ticket: Ticket,
        result: Result<(), &ClientError>,
    ) -> MutationState {
        if ticket.undo == Undo::Status {
            return self.finish_toggle(seq, ticket, result);
        }

        let latest = match &ticket.task_id {
            Some(id) => self.settle(id, ticket.seq),
            None => true,
        };

        match result {
            Ok(()) => {
                if ticket.kind == MutationKind::Delete {
                    // The store no longer has the task, whatever else was issued since.
                    if let Some(id) = &ticket.task_id {
                        seq.remove(id);
                    }
                    return MutationState::Confirmed;
                }
                if latest {
                    MutationState::Confirmed
                } else {
                    MutationState::Superseded
                }
            }
            Err(error) => {
                if !latest {
                    log::debug!(
                        "coordinator: dropping stale failure kind={:?} id={:?} seq={} error={error}",
                        ticket.kind,
                        ticket.task_id,
                        ticket.seq
                    );
                    return MutationState::Superseded;
                }
                if let Undo::Move(outcome) = &ticket.undo {
                    seq.revert_move(outcome);
                }
                MutationState::RolledBack
            }
        }
    }

    /// Toggles stack on each other, so a failure falls back to the value sent by the newest
    /// toggle still in flight, or to the confirmed status once none is left. Only the newest
    /// toggle's failure changes what is shown.
    fn finish_toggle(
        &mut self,
        seq: &mut TaskSequence,
        ticket: Ticket,
        result: Result<(), &ClientError>,
    ) -> MutationState {
        let Some(id) = ticket.task_id.as_deref() else {
            return MutationState::Superseded;
        };

        let mut state = MutationState::Superseded;
        let mut restore = None;
        if let Some(entry) = self.requests.get_mut(id) {
            match result {
                Ok(()) => {
                    if let Some(&(_, sent)) = entry.toggles.iter().find(|(s, _)| *s == ticket.seq) {
                        entry.confirmed_status = sent;
                    }
                    // Older toggles can no longer decide what the store holds.
                    entry.toggles.retain(|(s, _)| *s > ticket.seq);
                    if entry.latest == ticket.seq {
                        state = MutationState::Confirmed;
                    }
                }
                Err(error) => {
                    let newest = entry.toggles.last().map(|(s, _)| *s) == Some(ticket.seq);
                    entry.toggles.retain(|(s, _)| *s != ticket.seq);
                    if newest {
                        state = MutationState::RolledBack;
                        restore = Some(
                            entry
                                .toggles
                                .last()
                                .map_or(entry.confirmed_status, |(_, sent)| *sent),
                        );
                    } else {
                        log::debug!(
                            "coordinator: failed toggle covered by a newer one id={id} seq={} error={error}",
                            ticket.seq
                        );
                    }
                }
            }
        }
        self.settle(id, ticket.seq);

        if let Some(status) = restore {
            if let Some(task) = seq.get_mut(id) {
                task.status = status;
            }
        }
        state
    }

    fn issue(&mut self, kind: MutationKind, task_id: Option<&str>, undo: Undo) -> Ticket {
        self.next_seq += 1;
        let seq = self.next_seq;
        if let Some(id) = task_id {
            let entry = self.requests.entry(id.to_string()).or_default();
            entry.latest = seq;
            entry.in_flight += 1;
        }
        log::debug!("coordinator: issued kind={kind:?} id={task_id:?} seq={seq}");
        Ticket {
            kind,
            task_id: task_id.map(str::to_string),
            seq,
            undo,
        }
    }

    /// Marks one request for `id` as answered; true when it was the newest one issued.
    fn settle(&mut self, id: &str, seq: u64) -> bool {
        let Some(entry) = self.requests.get_mut(id) else {
            return true;
        };
        let latest = entry.latest == seq;
        entry.in_flight = entry.in_flight.saturating_sub(1);
        if entry.in_flight == 0 {
            self.requests.remove(id);
        }
        latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, Task};

    fn make_task(id: &str, position: i64) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task-{id}"),
            description: Some("notes".to_string()),
            date_time: None,
            priority: Priority::High,
            category: Some("work".to_string()),
            status: false,
            position,
            created_at: None,
        }
    }

    fn network_error() -> ClientError {
        ClientError::Network("connection reset".to_string())
    }

    fn make_sequence() -> TaskSequence {
        TaskSequence::new(vec![make_task("A", 0), make_task("B", 1), make_task("C", 2)])
    }

    #[test]
    fn toggle_applies_immediately_and_confirms() {
        let mut seq = make_sequence();
        let mut coordinator = Coordinator::new();
        let (ticket, sent) = coordinator.begin_toggle(&mut seq, "A").unwrap();
        assert!(sent);
        assert!(seq.get("A").unwrap().status);
        assert!(coordinator.is_pending("A"));

        let state = coordinator.finish(&mut seq, ticket, Ok(()));
        assert_eq!(state, MutationState::Confirmed);
        assert!(seq.get("A").unwrap().status);
        assert!(coordinator.pending_ids().is_empty());
    }

    #[test]
    fn failed_toggle_restores_only_status() {
        let mut seq = make_sequence();
        let before = seq.get("B").unwrap().clone();
        let mut coordinator = Coordinator::new();
        let (ticket, _) = coordinator.begin_toggle(&mut seq, "B").unwrap();

        let error = network_error();
        let state = coordinator.finish(&mut seq, ticket, Err(&error));
        assert_eq!(state, MutationState::RolledBack);
        assert_eq!(seq.get("B").unwrap(), &before);
    }

    #[test]
    fn stale_failure_does_not_undo_newer_toggle() {
        let mut seq = make_sequence();
        let mut coordinator = Coordinator::new();
        let (first, _) = coordinator.begin_toggle(&mut seq, "A").unwrap();
        let (second, _) = coordinator.begin_toggle(&mut seq, "A").unwrap();
        assert!(second.seq > first.seq);
        assert!(!seq.get("A").unwrap().status);

        // Second answers first and succeeds; the late failure of the first is dropped.
        assert_eq!(
            coordinator.finish(&mut seq, second, Ok(())),
            MutationState::Confirmed
        );
        let error = network_error();
        assert_eq!(
            coordinator.finish(&mut seq, first, Err(&error)),
            MutationState::Superseded
        );
        assert!(!seq.get("A").unwrap().status);
    }

    #[test]
    fn stale_success_is_reported_as_superseded() {
        let mut seq = make_sequence();
        let mut coordinator = Coordinator::new();
        let (first, _) = coordinator.begin_toggle(&mut seq, "A").unwrap();
        let (second, _) = coordinator.begin_toggle(&mut seq, "A").unwrap();
        assert_eq!(
            coordinator.finish(&mut seq, first, Ok(())),
            MutationState::Superseded
        );
        let error = network_error();
        assert_eq!(
            coordinator.finish(&mut seq, second, Err(&error)),
            MutationState::RolledBack
        );
        // Rolled back to the value observed before the second toggle.
        assert!(seq.get("A").unwrap().status);
    }

    #[test]
    fn two_failed_toggles_restore_the_original_status() {
        let mut seq = make_sequence();
        let mut coordinator = Coordinator::new();
        let (first, _) = coordinator.begin_toggle(&mut seq, "A").unwrap();
        let (second, _) = coordinator.begin_toggle(&mut seq, "A").unwrap();

        let error = network_error();
        assert_eq!(
            coordinator.finish(&mut seq, first, Err(&error)),
            MutationState::Superseded
        );
        // The second toggle is still in flight and stays on screen.
        assert!(!seq.get("A").unwrap().status);
        assert_eq!(
            coordinator.finish(&mut seq, second, Err(&error)),
            MutationState::RolledBack
        );
        assert!(!seq.get("A").unwrap().status);
        assert!(coordinator.pending_ids().is_empty());
    }

    #[test]
    fn newest_toggle_failing_first_falls_back_to_the_older_one() {
        let mut seq = make_sequence();
        let mut coordinator = Coordinator::new();
        let (first, _) = coordinator.begin_toggle(&mut seq, "A").unwrap();
        let (second, _) = coordinator.begin_toggle(&mut seq, "A").unwrap();

        let error = network_error();
        assert_eq!(
            coordinator.finish(&mut seq, second, Err(&error)),
            MutationState::RolledBack
        );
        assert!(seq.get("A").unwrap().status);
        assert_eq!(
            coordinator.finish(&mut seq, first, Err(&error)),
            MutationState::RolledBack
        );
        assert!(!seq.get("A").unwrap().status);
    }

    #[test]
    fn three_toggles_with_the_middle_one_confirmed() {
        let mut seq = make_sequence();
        let mut coordinator = Coordinator::new();
        let (first, _) = coordinator.begin_toggle(&mut seq, "A").unwrap();
        let (second, sent) = coordinator.begin_toggle(&mut seq, "A").unwrap();
        let (third, _) = coordinator.begin_toggle(&mut seq, "A").unwrap();
        assert!(!sent);
        assert!(seq.get("A").unwrap().status);

        let error = network_error();
        assert_eq!(
            coordinator.finish(&mut seq, second, Ok(())),
            MutationState::Superseded
        );
        assert_eq!(
            coordinator.finish(&mut seq, first, Err(&error)),
            MutationState::Superseded
        );
        assert_eq!(
            coordinator.finish(&mut seq, third, Err(&error)),
            MutationState::RolledBack
        );
        // The store holds what the second toggle sent.
        assert!(!seq.get("A").unwrap().status);
    }

    #[test]
    fn overlapping_moves_keep_positions_unique_after_rollback() {
        let mut seq = TaskSequence::new(vec![
            make_task("A", 0),
            make_task("B", 1),
            make_task("C", 2),
            make_task("D", 3),
        ]);
        let mut coordinator = Coordinator::new();
        let (first, _) = coordinator.begin_move(&mut seq, "A", "C").unwrap();
        let (_second, _) = coordinator.begin_move(&mut seq, "D", "B").unwrap();

        let error = network_error();
        assert_eq!(
            coordinator.finish(&mut seq, first, Err(&error)),
            MutationState::RolledBack
        );
        assert_eq!(seq.len(), 4);
        let mut positions: Vec<i64> = seq.tasks().iter().map(|t| t.position).collect();
        positions.sort_unstable();
        positions.dedup();
        assert_eq!(positions.len(), 4);
    }

    #[test]
    fn delete_removes_only_after_confirmation() {
        let mut seq = make_sequence();
        let mut coordinator = Coordinator::new();
        let ticket = coordinator.begin_delete(&seq, "C").unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(
            coordinator.finish(&mut seq, ticket, Ok(())),
            MutationState::Confirmed
        );
        assert!(seq.get("C").is_none());
    }

    #[test]
    fn failed_delete_leaves_task_untouched() {
        let mut seq = make_sequence();
        let before = seq.clone();
        let mut coordinator = Coordinator::new();
        let ticket = coordinator.begin_delete(&seq, "C").unwrap();
        let error = ClientError::RemoteRejection {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(
            coordinator.finish(&mut seq, ticket, Err(&error)),
            MutationState::RolledBack
        );
        assert_eq!(seq, before);
    }

    #[test]
    fn failed_move_is_put_back() {
        let mut seq = make_sequence();
        let before = seq.clone();
        let mut coordinator = Coordinator::new();
        let (ticket, outcome) = coordinator.begin_move(&mut seq, "C", "A").unwrap();
        assert_eq!(outcome.to, 0);
        assert_eq!(seq.tasks()[0].id, "C");

        let error = network_error();
        assert_eq!(
            coordinator.finish(&mut seq, ticket, Err(&error)),
            MutationState::RolledBack
        );
        assert_eq!(seq, before);
    }

    #[test]
    fn begin_on_missing_task_issues_nothing() {
        let mut seq = make_sequence();
        let mut coordinator = Coordinator::new();
        assert!(coordinator.begin_toggle(&mut seq, "missing").is_none());
        assert!(coordinator.begin_delete(&seq, "missing").is_none());
        assert!(coordinator.begin_edit(&seq, "missing").is_none());
        assert!(coordinator.begin_move(&mut seq, "A", "A").is_none());
        assert!(coordinator.pending_ids().is_empty());

        let create = coordinator.begin_create();
        assert_eq!(create.task_id, None);
        assert_eq!(
            coordinator.finish(&mut seq, create, Ok(())),
            MutationState::Confirmed
        );
    }
}
