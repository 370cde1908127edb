use std::collections::HashSet;

use crate::models::{Task, TaskId};

/// The canonical, ordered task list for the current filter scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskSequence {
    tasks: Vec<Task>,
}

/// Record of one applied move, enough to persist it or to undo it.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    pub source_id: TaskId,
    pub from: usize,
    pub to: usize,
    /// Tasks whose `position` changed, with their new value.
    pub changed: Vec<(TaskId, i64)>,
    /// The same tasks with the value they had before the move.
    pub previous: Vec<(TaskId, i64)>,
}

impl TaskSequence {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Wholesale replacement after a refetch.
    pub fn replace(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    pub fn remove(&mut self, id: &str) -> Option<Task> {
        let index = self.index_of(id)?;
        Some(self.tasks.remove(index))
    }

    /// Moves `source_id` into the slot held by `target_id`. Returns `None` (and leaves the
    /// sequence untouched) when either id is missing or both are the same.
    pub fn apply_move(&mut self, source_id: &str, target_id: &str) -> Option<MoveOutcome> {
        move_in_place(&mut self.tasks, source_id, target_id)
    }

    /// Puts the moved task back at its old index (clamped) and restores the old positions.
    /// Used to undo a move whose persistence failed. A newer move may have shifted the same
    /// tasks in the meantime; if the restored values collide, the sequence is renumbered.
    pub fn revert_move(&mut self, outcome: &MoveOutcome) {
        if let Some(current) = self.index_of(&outcome.source_id) {
            let task = self.tasks.remove(current);
            let index = outcome.from.min(self.tasks.len());
            self.tasks.insert(index, task);
        }
        for (id, position) in &outcome.previous {
            if let Some(task) = self.get_mut(id) {
                task.position = *position;
            }
        }

        let positions: Vec<(TaskId, i64)> = self
            .tasks
            .iter()
            .map(|t| (t.id.clone(), t.position))
            .collect();
        if has_duplicate_positions(&positions) {
            log::debug!(
                "ordering: revert of id={} collided with a newer move, renumbering",
                outcome.source_id
            );
            renumber(&mut self.tasks);
        }
    }
}

/// Pure form of the reorder gesture: returns a new sequence with `source_id` relocated.
pub fn move_task(tasks: &[Task], source_id: &str, target_id: &str) -> Vec<Task> {
    let mut next = tasks.to_vec();
    move_in_place(&mut next, source_id, target_id);
    next
}

fn move_in_place(tasks: &mut Vec<Task>, source_id: &str, target_id: &str) -> Option<MoveOutcome> {
    if source_id == target_id {
        return None;
    }
    let from = tasks.iter().position(|t| t.id == source_id)?;
    let to = tasks.iter().position(|t| t.id == target_id)?;

    let before: Vec<(TaskId, i64)> = tasks.iter().map(|t| (t.id.clone(), t.position)).collect();

    let task = tasks.remove(from);
    tasks.insert(to, task);

    if has_duplicate_positions(&before) {
        renumber(tasks);
    } else {
        let (lo, hi) = (from.min(to), from.max(to));
        let mut slots: Vec<i64> = before[lo..=hi].iter().map(|(_, p)| *p).collect();
        slots.sort_unstable();
        for (task, slot) in tasks[lo..=hi].iter_mut().zip(slots) {
            task.position = slot;
        }
    }

    let mut changed = Vec::new();
    let mut previous = Vec::new();
    for (task, (id, old)) in tasks.iter().zip(reordered(&before, from, to)) {
        debug_assert_eq!(&task.id, id);
        if task.position != *old {
            changed.push((task.id.clone(), task.position));
            previous.push((task.id.clone(), *old));
        }
    }

    log::debug!(
        "ordering: moved id={source_id} from={from} to={to} changed_positions={}",
        changed.len()
    );

    Some(MoveOutcome {
        source_id: source_id.to_string(),
        from,
        to,
        changed,
        previous,
    })
}

/// `before` with the same remove/insert applied, so it lines up with the moved sequence.
fn reordered(before: &[(TaskId, i64)], from: usize, to: usize) -> Vec<&(TaskId, i64)> {
    let mut refs: Vec<&(TaskId, i64)> = before.iter().collect();
    let entry = refs.remove(from);
    refs.insert(to, entry);
    refs
}

fn renumber(tasks: &mut [Task]) {
    for (index, task) in tasks.iter_mut().enumerate() {
        task.position = index as i64;
    }
}

fn has_duplicate_positions(entries: &[(TaskId, i64)]) -> bool {
    let mut seen = HashSet::with_capacity(entries.len());
    entries.iter().any(|(_, position)| !seen.insert(*position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;

    fn make_task(id: &str, position: i64) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task-{id}"),
            description: None,
            date_time: None,
            priority: Priority::Normal,
            category: None,
            status: false,
            position,
            created_at: None,
        }
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    fn sequence(ids: &[&str]) -> Vec<Task> {
        ids.iter()
            .enumerate()
            .map(|(index, id)| make_task(id, index as i64))
            .collect()
    }

    #[test]
    fn dragging_b_onto_a_puts_b_first() {
        let tasks = sequence(&["A", "B", "C"]);
        let out = move_task(&tasks, "B", "A");
        assert_eq!(ids(&out), vec!["B", "A", "C"]);
        let positions: Vec<i64> = out.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn moving_down_takes_the_target_slot() {
        let tasks = sequence(&["A", "B", "C", "D"]);
        let out = move_task(&tasks, "A", "C");
        assert_eq!(ids(&out), vec!["B", "C", "A", "D"]);
        // D sits outside the shifted window and keeps its position.
        assert_eq!(out[3].position, 3);
    }

    #[test]
    fn self_move_and_missing_ids_are_noops() {
        let tasks = sequence(&["A", "B", "C"]);
        assert_eq!(move_task(&tasks, "A", "A"), tasks);
        assert_eq!(move_task(&tasks, "A", "missing"), tasks);
        assert_eq!(move_task(&tasks, "missing", "C"), tasks);

        let mut seq = TaskSequence::new(tasks.clone());
        assert!(seq.apply_move("C", "C").is_none());
        assert_eq!(seq.tasks(), tasks.as_slice());
    }

    #[test]
    fn every_move_preserves_length_and_ids() {
        let names = ["A", "B", "C", "D", "E"];
        let tasks = sequence(&names);
        for source in names {
            for target in names {
                let out = move_task(&tasks, source, target);
                assert_eq!(out.len(), tasks.len());
                let mut got = ids(&out);
                got.sort_unstable();
                assert_eq!(got, names.to_vec());

                let mut positions: Vec<i64> = out.iter().map(|t| t.position).collect();
                positions.dedup();
                assert_eq!(positions, vec![0, 1, 2, 3, 4], "{source}->{target}");
            }
        }
    }

    #[test]
    fn move_back_restores_original_order() {
        let tasks = sequence(&["A", "B", "C", "D"]);
        let moved = move_task(&tasks, "D", "B");
        assert_eq!(ids(&moved), vec!["A", "D", "B", "C"]);
        let back = move_task(&moved, "D", "C");
        assert_eq!(back, tasks);
    }

    #[test]
    fn sparse_positions_are_redistributed_within_the_window() {
        let tasks = vec![make_task("A", 10), make_task("B", 20), make_task("C", 30)];
        let out = move_task(&tasks, "C", "A");
        assert_eq!(ids(&out), vec!["C", "A", "B"]);
        let positions: Vec<i64> = out.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![10, 20, 30]);
    }

    #[test]
    fn duplicate_positions_are_renumbered() {
        let tasks = vec![make_task("A", 0), make_task("B", 0), make_task("C", 0)];
        let mut seq = TaskSequence::new(tasks);
        let outcome = seq.apply_move("C", "B").expect("both ids present");
        assert_eq!(ids(seq.tasks()), vec!["A", "C", "B"]);
        let positions: Vec<i64> = seq.tasks().iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert_eq!(
            outcome.changed,
            vec![("C".to_string(), 1), ("B".to_string(), 2)]
        );
    }

    #[test]
    fn outcome_reports_changed_and_previous_positions() {
        let mut seq = TaskSequence::new(sequence(&["A", "B", "C"]));
        let outcome = seq.apply_move("A", "B").unwrap();
        assert_eq!(outcome.from, 0);
        assert_eq!(outcome.to, 1);
        assert_eq!(
            outcome.changed,
            vec![("B".to_string(), 0), ("A".to_string(), 1)]
        );
        assert_eq!(
            outcome.previous,
            vec![("B".to_string(), 1), ("A".to_string(), 0)]
        );
    }

    #[test]
    fn revert_move_restores_order_and_positions() {
        let original = sequence(&["A", "B", "C", "D"]);
        let mut seq = TaskSequence::new(original.clone());
        let outcome = seq.apply_move("A", "D").unwrap();
        assert_eq!(ids(seq.tasks()), vec!["B", "C", "D", "A"]);
        seq.revert_move(&outcome);
        assert_eq!(seq.tasks(), original.as_slice());
    }

    #[test]
    fn revert_after_a_newer_overlapping_move_renumbers() {
        let mut seq = TaskSequence::new(sequence(&["A", "B", "C", "D"]));
        let older = seq.apply_move("A", "C").unwrap();
        seq.apply_move("D", "B").unwrap();
        assert_eq!(ids(seq.tasks()), vec!["D", "B", "C", "A"]);

        seq.revert_move(&older);
        assert_eq!(ids(seq.tasks()), vec!["A", "D", "B", "C"]);
        let positions: Vec<i64> = seq.tasks().iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3]);
    }

    #[test]
    fn sequence_lookup_and_removal() {
        let mut seq = TaskSequence::new(sequence(&["A", "B"]));
        assert_eq!(seq.index_of("B"), Some(1));
        assert!(seq.get("missing").is_none());
        seq.get_mut("A").unwrap().title = "renamed".to_string();
        assert_eq!(seq.get("A").unwrap().title, "renamed");
        assert_eq!(seq.remove("A").map(|t| t.id), Some("A".to_string()));
        assert!(seq.remove("A").is_none());
        assert_eq!(seq.len(), 1);
        seq.replace(Vec::new());
        assert!(seq.is_empty());
    }
}
