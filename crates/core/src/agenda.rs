//! Timer entries for a session, ordered by due instant and then by the order
//! they were scheduled. Entries fire one at a time; nothing here sleeps.

use std::collections::{BTreeMap, HashMap};
use tokio::time::Instant;

/// Handle to a scheduled entry, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepId(u64);

#[derive(Debug)]
pub struct Agenda<T> {
    entries: BTreeMap<(Instant, u64), T>,
    due_by_id: HashMap<u64, Instant>,
    next_seq: u64,
}

impl<T> Default for Agenda<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            due_by_id: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<T> Agenda<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: Instant, task: T) -> StepId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert((due, seq), task);
        self.due_by_id.insert(seq, due);
        StepId(seq)
    }

    /// Removes an entry before it fires. Returns `None` if it already fired
    /// or was cancelled.
    pub fn cancel(&mut self, id: StepId) -> Option<T> {
        let due = self.due_by_id.remove(&id.0)?;
        self.entries.remove(&(due, id.0))
    }

    pub fn get(&self, id: StepId) -> Option<&T> {
        let due = self.due_by_id.get(&id.0)?;
        self.entries.get(&(*due, id.0))
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.entries.keys().next().map(|(due, _)| *due)
    }

    /// Takes the earliest entry if it is due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<(StepId, T)> {
        let (due, _) = *self.entries.keys().next()?;
        if due > now {
            return None;
        }
        let ((_, seq), task) = self.entries.pop_first()?;
        self.due_by_id.remove(&seq);
        Some((StepId(seq), task))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.due_by_id.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_pops_in_due_order_then_schedule_order() {
        let now = Instant::now();
        let mut agenda = Agenda::new();
        agenda.schedule(now + Duration::from_millis(20), "late");
        agenda.schedule(now, "first");
        agenda.schedule(now, "second");

        assert_eq!(agenda.pop_due(now).map(|(_, t)| t), Some("first"));
        assert_eq!(agenda.pop_due(now).map(|(_, t)| t), Some("second"));
        assert!(agenda.pop_due(now).is_none());
        assert_eq!(agenda.next_due(), Some(now + Duration::from_millis(20)));
        assert_eq!(
            agenda
                .pop_due(now + Duration::from_millis(25))
                .map(|(_, t)| t),
            Some("late")
        );
        assert!(agenda.is_empty());
    }

    #[test]
    fn test_cancel_removes_only_that_entry() {
        let now = Instant::now();
        let mut agenda = Agenda::new();
        let keep = agenda.schedule(now, 1);
        let drop = agenda.schedule(now, 2);

        assert_eq!(agenda.cancel(drop), Some(2));
        assert_eq!(agenda.cancel(drop), None);
        assert_eq!(agenda.get(keep), Some(&1));
        assert_eq!(agenda.len(), 1);

        let (id, task) = agenda.pop_due(now).unwrap();
        assert_eq!((id, task), (keep, 1));
        assert_eq!(agenda.cancel(keep), None);
    }

    #[test]
    fn test_clear() {
        let now = Instant::now();
        let mut agenda = Agenda::new();
        let id = agenda.schedule(now, ());
        agenda.clear();
        assert!(agenda.is_empty());
        assert!(agenda.get(id).is_none());
        assert!(agenda.next_due().is_none());
    }
}
