use std::sync::Arc;

use chrono::{TimeZone, Timelike, Utc};

use crate::models::{Item, Timestamp};

pub const REMINDER_KEY_PREFIX: &str = "reminder_";

#[derive(Debug)]
pub struct NotificationError(pub String);

impl std::fmt::Display for NotificationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "notification store error: {}", self.0)
    }
}

impl std::error::Error for NotificationError {}

/// External store of pending local notifications. Delivery and presentation
/// are entirely its business; the scheduler only decides when and what.
pub trait NotificationStore: Send + Sync {
    fn upsert(
        &self,
        key: &str,
        title: &str,
        body: &str,
        trigger_at: Timestamp,
    ) -> Result<(), NotificationError>;
    fn remove(&self, key: &str) -> Result<(), NotificationError>;
    fn remove_all(&self) -> Result<(), NotificationError>;
}

pub fn reminder_key(item_id: &str) -> String {
    format!("{REMINDER_KEY_PREFIX}{item_id}")
}

/// Keeps pending notification requests in one-to-one correspondence with
/// items that have a due date and reminders enabled. Store failures are
/// logged and swallowed; they never fail the item mutation that caused them.
#[derive(Clone)]
pub struct ReminderScheduler {
    store: Arc<dyn NotificationStore>,
}

impl ReminderScheduler {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    /// Schedules (or re-schedules) the reminder for an item. Items without a
    /// due date are skipped.
    pub fn schedule(&self, item: &Item) {
        let Some(due_at) = item.due_at else {
            return;
        };

        // Cancel-then-create keeps re-schedules idempotent even if the store
        // treats upsert as insert-only.
        self.cancel(&item.id);

        let key = reminder_key(&item.id);
        let body = format!("{} is due now", item.title);
        let trigger_at = truncate_to_minute(due_at);
        if let Err(err) = self
            .store
            .upsert(&key, "Due date reached", &body, trigger_at)
        {
            log::warn!("reminders: failed to schedule {key}: {err}");
        }
    }

    /// Removes any pending request for the item; no-op if none exists.
    pub fn cancel(&self, item_id: &str) {
        let key = reminder_key(item_id);
        if let Err(err) = self.store.remove(&key) {
            log::warn!("reminders: failed to cancel {key}: {err}");
        }
    }

    /// Removes every request this scheduler created. For application-level
    /// resets, not routine edits.
    pub fn cancel_all(&self) {
        if let Err(err) = self.store.remove_all() {
            log::warn!("reminders: failed to cancel all pending reminders: {err}");
        }
    }
}

fn truncate_to_minute(ts: Timestamp) -> Timestamp {
    match Utc.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.with_second(0).map(|t| t.timestamp()).unwrap_or(ts),
        None => ts - ts.rem_euclid(60),
    }
}
