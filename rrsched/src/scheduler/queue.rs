//! FIFO ready queue.
//!
//! Holds every task that is neither running nor completed.  Preempted and
//! memory-blocked tasks both re-enter at the tail, so one untagged queue
//! encodes round-robin fairness and retry-after-blocking at once.  The reason
//! a task was requeued is visible in its status and in the event log.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::task::TaskId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadyQueue {
    entries: VecDeque<TaskId>,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, id: TaskId) {
        self.entries.push_back(id);
    }

    pub fn pop_front(&mut self) -> Option<TaskId> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.entries.contains(&id)
    }

    /// Queue contents, head first.
    pub fn iter(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.entries.iter().copied()
    }
}

impl FromIterator<TaskId> for ReadyQueue {
    fn from_iter<I: IntoIterator<Item = TaskId>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_insertion_order() {
        let mut q: ReadyQueue = [TaskId(1), TaskId(2)].into_iter().collect();
        q.push_back(TaskId(3));
        assert_eq!(q.pop_front(), Some(TaskId(1)));
        assert_eq!(q.pop_front(), Some(TaskId(2)));
        assert_eq!(q.pop_front(), Some(TaskId(3)));
        assert_eq!(q.pop_front(), None);
    }

    #[test]
    fn requeued_task_goes_behind_waiting_ones() {
        let mut q: ReadyQueue = [TaskId(1), TaskId(2), TaskId(3)].into_iter().collect();
        let head = q.pop_front().unwrap();
        q.push_back(head);
        let order: Vec<TaskId> = q.iter().collect();
        assert_eq!(order, vec![TaskId(2), TaskId(3), TaskId(1)]);
        assert!(q.contains(TaskId(1)));
        assert_eq!(q.len(), 3);
    }
}
