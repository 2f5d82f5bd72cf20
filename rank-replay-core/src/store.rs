//! Fixed-capacity storage of transitions addressed by slot.
use crate::{error::ReplayBufferError, Transition};
use serde::{Deserialize, Serialize};

/// A storage position in `[1, capacity]`.
pub type Slot = usize;

/// What a replay buffer does when a transition arrives while it is full.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
pub enum OverwritePolicy {
    /// Overwrite the transition in the next slot in circular order.
    Overwrite,

    /// Refuse the transition with [`ReplayBufferError::BufferFull`].
    RejectWhenFull,
}

impl Default for OverwritePolicy {
    fn default() -> Self {
        Self::Overwrite
    }
}

/// Returns the slot following `slot` in circular order.
///
/// `slot == 0` denotes that nothing has been written yet, so the first slot is `1`.
#[inline]
pub(crate) fn next_slot(slot: Slot, capacity: usize) -> Slot {
    (slot % capacity) + 1
}

/// Fixed-capacity mapping from slot to transition.
///
/// Slots are 1-indexed. A slot becomes live when it is written for the first time and
/// stays live afterwards; writing it again replaces the transition.
pub struct TransitionStore<O, A> {
    slots: Vec<Option<Transition<O, A>>>,
    len: usize,
}

impl<O, A> TransitionStore<O, A> {
    /// Creates an empty store.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            len: 0,
        }
    }

    /// Returns the maximum number of transitions.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of live slots.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no slot has been written.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if every slot is live.
    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Writes a transition to `slot`, dropping the one previously stored there.
    pub fn put(&mut self, slot: Slot, tr: Transition<O, A>) -> Result<(), ReplayBufferError> {
        let entry = slot
            .checked_sub(1)
            .and_then(|ix| self.slots.get_mut(ix))
            .ok_or(ReplayBufferError::UnknownSlot(slot))?;
        if entry.replace(tr).is_none() {
            self.len += 1;
        }
        Ok(())
    }

    /// Returns the transition at `slot`.
    pub fn get(&self, slot: Slot) -> Result<&Transition<O, A>, ReplayBufferError> {
        slot.checked_sub(1)
            .and_then(|ix| self.slots.get(ix))
            .and_then(|entry| entry.as_ref())
            .ok_or(ReplayBufferError::UnknownSlot(slot))
    }

    /// Returns the transitions at `slots` in the requested order.
    ///
    /// Fails without partial results if any slot has never been written.
    pub fn get_many(&self, slots: &[Slot]) -> Result<Vec<&Transition<O, A>>, ReplayBufferError> {
        slots.iter().map(|&slot| self.get(slot)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{next_slot, TransitionStore};
    use crate::{error::ReplayBufferError, Transition};

    fn tr(x: i32) -> Transition<i32, i32> {
        Transition::new(x, x, x as f32, x + 1, false)
    }

    #[test]
    fn test_next_slot_wraps_around() {
        assert_eq!(next_slot(0, 3), 1);
        assert_eq!(next_slot(1, 3), 2);
        assert_eq!(next_slot(2, 3), 3);
        assert_eq!(next_slot(3, 3), 1);
        assert_eq!(next_slot(1, 1), 1);
    }

    #[test]
    fn test_put_overwrites() -> Result<(), ReplayBufferError> {
        let mut store = TransitionStore::new(2);
        store.put(1, tr(10))?;
        store.put(2, tr(20))?;
        assert!(store.is_full());
        store.put(1, tr(30))?;
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1)?.obs, 30);
        assert_eq!(store.get(2)?.obs, 20);
        Ok(())
    }

    #[test]
    fn test_get_many_keeps_order() -> Result<(), ReplayBufferError> {
        let mut store = TransitionStore::new(4);
        for slot in 1..=3 {
            store.put(slot, tr(slot as i32))?;
        }
        let obs = store
            .get_many(&[3, 1, 3, 2])?
            .iter()
            .map(|tr| tr.obs)
            .collect::<Vec<_>>();
        assert_eq!(obs, vec![3, 1, 3, 2]);
        Ok(())
    }

    #[test]
    fn test_unknown_slots() {
        let mut store = TransitionStore::new(2);
        assert_eq!(store.put(0, tr(0)), Err(ReplayBufferError::UnknownSlot(0)));
        assert_eq!(store.put(3, tr(0)), Err(ReplayBufferError::UnknownSlot(3)));
        assert!(store.put(1, tr(1)).is_ok());
        assert_eq!(
            store.get_many(&[1, 2]).err(),
            Some(ReplayBufferError::UnknownSlot(2))
        );
    }
}
