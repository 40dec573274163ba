//! Bounded queue of progress reports that could not be delivered.
//!
//! Eviction is drop-oldest: when the queue is full, pushing a new report
//! discards the report at the front and bumps the eviction counter.

use std::collections::VecDeque;

use crate::pipeline::operation::ProgressReport;

/// A queued report with a stable id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub id: u64,
    pub report: ProgressReport,
}

#[derive(Debug)]
pub struct PendingQueue {
    entries: VecDeque<PendingEntry>,
    capacity: usize,
    next_id: u64,
    evicted: u64,
}

impl PendingQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 0,
            evicted: 0,
        }
    }

    /// Queue a report, returning the evicted one if the queue was full.
    pub fn push(&mut self, report: ProgressReport) -> Option<PendingEntry> {
        let evicted = if self.entries.len() >= self.capacity {
            self.evicted += 1;
            self.entries.pop_front()
        } else {
            None
        };

        self.entries.push_back(PendingEntry {
            id: self.next_id,
            report,
        });
        self.next_id += 1;
        evicted
    }

    pub fn front(&self) -> Option<&PendingEntry> {
        self.entries.front()
    }

    /// Remove the entry with `id`, wherever it is.
    pub fn remove(&mut self, id: u64) -> Option<PendingEntry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        self.entries.remove(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reports dropped since creation.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(n: u8) -> ProgressReport {
        ProgressReport::new(format!("t-{}", n), n)
    }

    #[test]
    fn test_evicts_oldest_at_capacity() {
        let mut queue = PendingQueue::new(2);
        assert!(queue.push(report(1)).is_none());
        assert!(queue.push(report(2)).is_none());

        let evicted = queue.push(report(3)).unwrap();
        assert_eq!(evicted.report.task_id, "t-1");
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.evicted(), 1);

        let order: Vec<_> = queue.iter().map(|e| e.report.percent).collect();
        assert_eq!(order, [2, 3]);
    }

    #[test]
    fn test_remove_by_id() {
        let mut queue = PendingQueue::new(4);
        queue.push(report(1));
        queue.push(report(2));
        let id = queue.front().unwrap().id;

        assert_eq!(queue.remove(id).unwrap().report.task_id, "t-1");
        assert!(queue.remove(id).is_none());
        assert_eq!(queue.front().unwrap().report.task_id, "t-2");
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut queue = PendingQueue::new(0);
        queue.push(report(1));
        queue.push(report(2));
        assert_eq!(queue.capacity(), 1);
        assert_eq!(queue.len(), 1);
    }
}
