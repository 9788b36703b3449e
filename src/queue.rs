// src/queue.rs

//! FIFO recipient queue with removal by identity
//!
//! Recipients are served in arrival order, but collection can complete for
//! any queued recipient, so removal targets one entry by its sequence
//! number rather than whatever happens to be at the head.

use crate::models::RecipientRecord;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct RecipientQueue {
    entries: VecDeque<RecipientRecord>,
}

impl RecipientQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail. The sequence number is assigned by the caller.
    pub fn enqueue(&mut self, recipient: RecipientRecord) {
        self.entries.push_back(recipient);
    }

    /// Drop the front entry. Returns false on an empty queue.
    pub fn dequeue_head(&mut self) -> bool {
        self.entries.pop_front().is_some()
    }

    /// Remove the entry with this sequence number, wherever it sits
    pub fn remove(&mut self, sequence: u64) -> Option<RecipientRecord> {
        let pos = self.entries.iter().position(|r| r.sequence == sequence)?;
        self.entries.remove(pos)
    }

    pub fn contains(&self, recipient: &RecipientRecord) -> bool {
        self.entries.contains(recipient)
    }

    /// Earliest queued recipient for a package
    pub fn find_for_package(&self, package_id: &str) -> Option<&RecipientRecord> {
        self.entries.iter().find(|r| r.package_id == package_id)
    }

    pub fn find(&self, surname: &str, package_id: &str) -> Option<&RecipientRecord> {
        self.entries.iter().find(|r| r.matches(surname, package_id))
    }

    pub fn get_mut(&mut self, sequence: u64) -> Option<&mut RecipientRecord> {
        self.entries.iter_mut().find(|r| r.sequence == sequence)
    }

    pub fn head(&self) -> Option<&RecipientRecord> {
        self.entries.front()
    }

    /// Owned copy in queue order
    pub fn snapshot(&self) -> Vec<RecipientRecord> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient(surname: &str, package_id: &str, sequence: u64) -> RecipientRecord {
        RecipientRecord::new(surname.to_string(), package_id.to_string(), sequence)
    }

    fn queue() -> RecipientQueue {
        let mut q = RecipientQueue::new();
        q.enqueue(recipient("Smith", "P1", 1));
        q.enqueue(recipient("Jones", "P2", 2));
        q.enqueue(recipient("Brown", "P3", 3));
        q
    }

    #[test]
    fn test_enqueue_is_fifo() {
        let q = queue();
        let names: Vec<String> = q.snapshot().into_iter().map(|r| r.surname).collect();
        assert_eq!(names, vec!["Smith", "Jones", "Brown"]);
        assert_eq!(q.head().unwrap().surname, "Smith");
    }

    #[test]
    fn test_dequeue_head() {
        let mut q = queue();
        assert!(q.dequeue_head());
        assert_eq!(q.head().unwrap().surname, "Jones");

        let mut empty = RecipientQueue::new();
        assert!(!empty.dequeue_head());
    }

    #[test]
    fn test_remove_by_identity_leaves_head_alone() {
        let mut q = queue();
        let removed = q.remove(2).unwrap();
        assert_eq!(removed.surname, "Jones");
        assert_eq!(q.len(), 2);
        assert_eq!(q.head().unwrap().surname, "Smith");
        assert!(q.find_for_package("P2").is_none());
        assert!(q.remove(2).is_none());
    }

    #[test]
    fn test_find_prefers_earliest_entry() {
        let mut q = queue();
        q.enqueue(recipient("Green", "P1", 4));
        assert_eq!(q.find_for_package("P1").unwrap().sequence, 1);
        assert_eq!(q.find("Green", "P1").unwrap().sequence, 4);
        assert!(q.find("Green", "P2").is_none());
    }

    #[test]
    fn test_contains_and_snapshot_isolation() {
        let mut q = queue();
        let mut snapshot = q.snapshot();
        snapshot.clear();
        assert_eq!(q.len(), 3);
        assert!(q.contains(&recipient("Brown", "P3", 3)));

        q.get_mut(3).unwrap().mark_collected();
        assert!(!q.contains(&recipient("Brown", "P3", 3)));
    }
}
