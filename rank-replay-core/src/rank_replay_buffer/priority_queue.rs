//! Binary max-heap of priorities with lookup by slot.
//!
//! The heap array doubles as the rank order used for sampling: rank `r` is the entry at
//! array position `r - 1`. Between calls of [`PriorityQueue::rebalance`] the array only
//! satisfies the heap property, so this mapping is an approximation of the true rank
//! order. It is exact right after a rebalance, when the array is fully sorted.
use crate::{error::ReplayBufferError, Slot};
use std::cmp::Ordering;

/// Priority given to the first entry of an empty queue.
pub const DEFAULT_PRIORITY: f32 = 1.0;

/// A pair of priority and slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriorityEntry {
    /// Non-negative priority.
    pub priority: f32,

    /// Slot of the transition.
    pub slot: Slot,
}

/// Binary max-heap over [`PriorityEntry`] with a reverse index from slot to heap position.
pub struct PriorityQueue {
    heap: Vec<PriorityEntry>,
    pos: Vec<Option<usize>>,
}

impl PriorityQueue {
    /// Creates an empty queue accepting slots in `[1, capacity]`.
    pub fn new(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
            pos: vec![None; capacity],
        }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if the queue has no entries.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns the maximum priority, or [`DEFAULT_PRIORITY`] if the queue is empty.
    pub fn max_priority(&self) -> f32 {
        self.heap
            .first()
            .map_or(DEFAULT_PRIORITY, |entry| entry.priority)
    }

    /// Returns the priority of the entry for `slot`.
    pub fn priority(&self, slot: Slot) -> Option<f32> {
        self.position(slot).map(|i| self.heap[i].priority)
    }

    /// Returns the entries in heap array order, i.e., in approximate rank order.
    pub fn entries(&self) -> &[PriorityEntry] {
        &self.heap
    }

    /// Gives `slot` the current maximum priority and returns that priority.
    ///
    /// If `slot` already has an entry, the entry is replaced; this happens when the
    /// transition in the slot is overwritten.
    pub fn insert_max(&mut self, slot: Slot) -> Result<f32, ReplayBufferError> {
        let priority = self.max_priority();
        let ix = self.index(slot)?;
        match self.pos[ix] {
            Some(_) => self.update(slot, priority)?,
            None => {
                let i = self.heap.len();
                self.heap.push(PriorityEntry { priority, slot });
                self.pos[ix] = Some(i);
                self.sift_up(i);
            }
        }
        Ok(priority)
    }

    /// Sets the priority of the entry for `slot` and restores the heap property.
    ///
    /// The priority must be finite and non-negative.
    pub fn update(&mut self, slot: Slot, priority: f32) -> Result<(), ReplayBufferError> {
        let i = self
            .position(slot)
            .ok_or(ReplayBufferError::UnknownSlot(slot))?;
        if !priority.is_finite() || priority < 0.0 {
            return Err(ReplayBufferError::InvalidPriority { slot, priority });
        }
        let old = self.heap[i].priority;
        self.heap[i].priority = priority;
        if priority > old {
            self.sift_up(i);
        } else {
            self.sift_down(i);
        }
        Ok(())
    }

    /// Maps 1-indexed ranks to slots using the heap array order.
    pub fn rank_to_slot(&self, ranks: &[usize]) -> Result<Vec<Slot>, ReplayBufferError> {
        ranks
            .iter()
            .map(|&rank| {
                rank.checked_sub(1)
                    .and_then(|i| self.heap.get(i))
                    .map(|entry| entry.slot)
                    .ok_or(ReplayBufferError::UnknownRank(rank))
            })
            .collect()
    }

    /// Sorts all entries by descending priority, so that array order equals rank order.
    ///
    /// Ties are ordered by slot. A descending array satisfies the heap property, so the
    /// heap is valid again without further percolation.
    pub fn rebalance(&mut self) {
        self.heap.sort_by(|a, b| {
            b.priority
                .total_cmp(&a.priority)
                .then_with(|| a.slot.cmp(&b.slot))
        });
        for (i, entry) in self.heap.iter().enumerate() {
            self.pos[entry.slot - 1] = Some(i);
        }
    }

    fn index(&self, slot: Slot) -> Result<usize, ReplayBufferError> {
        if (1..=self.pos.len()).contains(&slot) {
            Ok(slot - 1)
        } else {
            Err(ReplayBufferError::UnknownSlot(slot))
        }
    }

    fn position(&self, slot: Slot) -> Option<usize> {
        self.index(slot).ok().and_then(|ix| self.pos[ix])
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        self.pos[self.heap[i].slot - 1] = Some(i);
        self.pos[self.heap[j].slot - 1] = Some(j);
    }

    fn greater(&self, i: usize, j: usize) -> bool {
        self.heap[i].priority.total_cmp(&self.heap[j].priority) == Ordering::Greater
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if !self.greater(i, parent) {
                break;
            }
            self.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let n = self.heap.len();
        loop {
            let left = 2 * i + 1;
            let right = left + 1;
            let mut largest = i;
            if left < n && self.greater(left, largest) {
                largest = left;
            }
            if right < n && self.greater(right, largest) {
                largest = right;
            }
            if largest == i {
                break;
            }
            self.swap(i, largest);
            i = largest;
        }
    }
}
