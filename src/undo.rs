use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::models::{Item, Timestamp};

/// How long a deleted item stays recoverable unless the service is
/// configured otherwise.
pub const DEFAULT_UNDO_WINDOW: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct Deleted {
    pub item: Item,
    pub deleted_at: Timestamp,
}

#[derive(Debug)]
struct Slot {
    occupant: Option<Deleted>,
    generation: u64,
}

/// Single-slot buffer for the most recently deleted item.
///
/// Every deposit, restore, or clear bumps the generation counter. An expiry
/// timer armed with an older generation finds the counter moved on and does
/// nothing, so an explicit undo always beats a racing timer and a second
/// deletion invalidates the first deletion's timer.
#[derive(Clone)]
pub struct UndoBuffer {
    inner: Arc<Mutex<Slot>>,
}

impl Default for UndoBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoBuffer {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Slot {
                occupant: None,
                generation: 0,
            })),
        }
    }

    /// Stores a deleted item, silently discarding any previous occupant.
    /// Returns the generation to arm the expiry timer with.
    pub fn deposit(&self, item: Item, deleted_at: Timestamp) -> u64 {
        let mut guard = self.inner.lock().expect("undo buffer poisoned");
        guard.generation += 1;
        guard.occupant = Some(Deleted { item, deleted_at });
        guard.generation
    }

    /// Takes the buffered item out, making the deletion undone.
    /// Any pending expiry timer for it becomes a no-op.
    pub fn restore(&self) -> Option<Item> {
        let mut guard = self.inner.lock().expect("undo buffer poisoned");
        let taken = guard.occupant.take();
        if taken.is_some() {
            guard.generation += 1;
        }
        taken.map(|deleted| deleted.item)
    }

    /// Clears the buffer if it still holds the deletion the timer was armed
    /// for. Returns whether anything was discarded.
    pub fn expire(&self, generation: u64) -> bool {
        let mut guard = self.inner.lock().expect("undo buffer poisoned");
        if guard.generation != generation || guard.occupant.is_none() {
            return false;
        }
        guard.occupant = None;
        guard.generation += 1;
        true
    }

    pub fn peek(&self) -> Option<Deleted> {
        let guard = self.inner.lock().expect("undo buffer poisoned");
        guard.occupant.clone()
    }

    pub fn clear(&self) {
        let mut guard = self.inner.lock().expect("undo buffer poisoned");
        if guard.occupant.take().is_some() {
            guard.generation += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Priority};

    fn make_item(id: &str) -> Item {
        Item {
            id: id.to_string(),
            title: format!("item-{id}"),
            note: Some("a note".to_string()),
            category: Category::Household,
            priority: Priority::High,
            due_at: Some(5000),
            completed: false,
            created_at: 1,
            updated_at: 2,
        }
    }

    #[test]
    fn restore_returns_the_deposited_item_unchanged() {
        let buffer = UndoBuffer::new();
        let item = make_item("a");
        buffer.deposit(item.clone(), 100);

        let restored = buffer.restore().expect("occupant present");
        assert_eq!(restored, item);
        assert!(buffer.peek().is_none());
    }

    #[test]
    fn restore_on_empty_buffer_is_none() {
        let buffer = UndoBuffer::new();
        assert!(buffer.restore().is_none());
    }

    #[test]
    fn second_deposit_discards_the_first_occupant() {
        let buffer = UndoBuffer::new();
        buffer.deposit(make_item("a"), 100);
        buffer.deposit(make_item("b"), 200);

        let restored = buffer.restore().expect("occupant present");
        assert_eq!(restored.id, "b");
        // "a" is permanently lost.
        assert!(buffer.restore().is_none());
    }

    #[test]
    fn expire_clears_only_a_matching_generation() {
        let buffer = UndoBuffer::new();
        let generation = buffer.deposit(make_item("a"), 100);

        assert!(buffer.expire(generation));
        assert!(buffer.peek().is_none());
        // A second fire of the same timer finds nothing to do.
        assert!(!buffer.expire(generation));
    }

    #[test]
    fn stale_timer_does_not_clear_a_newer_deletion() {
        let buffer = UndoBuffer::new();
        let first = buffer.deposit(make_item("a"), 100);
        buffer.deposit(make_item("b"), 200);

        assert!(!buffer.expire(first));
        assert_eq!(buffer.peek().unwrap().item.id, "b");
    }

    #[test]
    fn explicit_restore_wins_over_a_racing_timer() {
        let buffer = UndoBuffer::new();
        let generation = buffer.deposit(make_item("a"), 100);

        assert!(buffer.restore().is_some());
        assert!(!buffer.expire(generation));
    }

    #[test]
    fn undo_after_expiry_is_a_no_op() {
        let buffer = UndoBuffer::new();
        let generation = buffer.deposit(make_item("a"), 100);
        buffer.expire(generation);
        assert!(buffer.restore().is_none());
    }

    #[test]
    fn deposit_records_the_deletion_moment() {
        let buffer = UndoBuffer::new();
        buffer.deposit(make_item("a"), 4242);
        assert_eq!(buffer.peek().unwrap().deleted_at, 4242);
    }
}
