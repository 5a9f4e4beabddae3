use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::models::{Category, Item, Priority, Timestamp};
use crate::pipeline::{visible_items, SortOption, StatusFilter};
use crate::reminders::{NotificationStore, ReminderScheduler};
use crate::storage::{ItemStore, StorageError};
use crate::undo::{UndoBuffer, DEFAULT_UNDO_WINDOW};

pub const MIN_TITLE_CHARS: usize = 3;

/// User-entered fields for a create or edit. `remind` is the per-save opt-in
/// from the form; it only takes effect when a due date is set.
#[derive(Debug, Clone, Default)]
pub struct ItemDraft {
    pub title: String,
    pub note: Option<String>,
    pub category: Category,
    pub priority: Priority,
    pub due_at: Option<Timestamp>,
    pub remind: bool,
}

#[derive(Debug)]
pub enum ServiceError {
    InvalidTitle(String),
    NotFound(String),
    Store(StorageError),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::InvalidTitle(reason) => write!(f, "invalid title: {reason}"),
            ServiceError::NotFound(id) => write!(f, "no item with id {id}"),
            ServiceError::Store(err) => write!(f, "store error: {err}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<StorageError> for ServiceError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::NotFound(id) => ServiceError::NotFound(id),
            other => ServiceError::Store(other),
        }
    }
}

/// Handle for one pending deletion, used to arm its expiry timer.
#[derive(Debug, Clone, Copy)]
pub struct UndoToken {
    generation: u64,
}

/// Controller the UI layer calls into. Explicitly constructed with its
/// collaborators so tests can substitute fake stores; holds no process-wide
/// state.
pub struct ListService {
    store: Arc<dyn ItemStore>,
    scheduler: ReminderScheduler,
    undo: UndoBuffer,
    undo_window: Duration,
}

impl ListService {
    pub fn new(store: Arc<dyn ItemStore>, notifications: Arc<dyn NotificationStore>) -> Self {
        Self {
            store,
            scheduler: ReminderScheduler::new(notifications),
            undo: UndoBuffer::new(),
            undo_window: DEFAULT_UNDO_WINDOW,
        }
    }

    pub fn with_undo_window(mut self, window: Duration) -> Self {
        self.undo_window = window;
        self
    }

    /// The filtered, sorted list for the current selections. Reads the store
    /// fresh every time; the store is the source of truth.
    pub fn visible(
        &self,
        category: Option<Category>,
        status: StatusFilter,
        sort: SortOption,
    ) -> Result<Vec<Item>, ServiceError> {
        let items = self.store.fetch_all()?;
        Ok(visible_items(&items, category, status, sort))
    }

    pub fn create(&self, draft: ItemDraft) -> Result<Item, ServiceError> {
        let title = validate_title(&draft.title)?;
        let now = Utc::now().timestamp();
        let item = Item {
            id: Uuid::new_v4().to_string(),
            title,
            note: normalize_note(draft.note),
            category: draft.category,
            priority: draft.priority,
            due_at: draft.due_at,
            completed: false,
            created_at: now,
            updated_at: now,
        };
        self.store.add(&item)?;
        if draft.remind {
            // Non-fatal: a rejected notification request never rolls back
            // the created item.
            self.scheduler.schedule(&item);
        }
        Ok(item)
    }

    pub fn update(&self, item_id: &str, draft: ItemDraft) -> Result<Item, ServiceError> {
        let title = validate_title(&draft.title)?;
        let mut item = self.find(item_id)?;
        item.title = title;
        item.note = normalize_note(draft.note);
        item.category = draft.category;
        item.priority = draft.priority;
        item.due_at = draft.due_at;
        item.updated_at = Utc::now().timestamp();
        self.store.update(&item)?;

        if draft.remind && item.due_at.is_some() {
            self.scheduler.schedule(&item);
        } else {
            self.scheduler.cancel(&item.id);
        }
        Ok(item)
    }

    pub fn toggle_completed(&self, item_id: &str) -> Result<Item, ServiceError> {
        let mut item = self.find(item_id)?;
        item.completed = !item.completed;
        item.updated_at = Utc::now().timestamp();
        self.store.update(&item)?;
        if item.completed {
            self.scheduler.cancel(&item.id);
        }
        Ok(item)
    }

    /// Removes the item and parks it in the undo buffer. The previous buffer
    /// occupant, if any, is permanently lost. Call `schedule_undo_expiry`
    /// with the returned token to make the deletion permanent after the
    /// undo window.
    pub fn delete(&self, item_id: &str) -> Result<UndoToken, ServiceError> {
        let item = self.find(item_id)?;
        self.store.remove(&item.id)?;
        self.scheduler.cancel(&item.id);
        let generation = self.undo.deposit(item, Utc::now().timestamp());
        Ok(UndoToken { generation })
    }

    /// Arms the expiry timer for a deletion. The spawned task only holds a
    /// clone of the buffer handle, so it is safe to fire after the screen
    /// that triggered the deletion is gone. Must be called from within a
    /// tokio runtime.
    pub fn schedule_undo_expiry(&self, token: UndoToken) {
        let undo = self.undo.clone();
        let window = self.undo_window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if undo.expire(token.generation) {
                log::debug!("undo: window elapsed, deletion is now permanent");
            }
        });
    }

    /// Restores the most recently deleted item, or `None` when the window
    /// has expired (or nothing was deleted). Open items with a due date get
    /// their reminder re-scheduled.
    pub fn undo(&self) -> Result<Option<Item>, ServiceError> {
        let Some(item) = self.undo.restore() else {
            return Ok(None);
        };
        if let Err(err) = self.store.add(&item) {
            // Keep the item recoverable so a failed restore loses nothing.
            self.undo.deposit(item, Utc::now().timestamp());
            return Err(err.into());
        }
        if !item.completed {
            self.scheduler.schedule(&item);
        }
        Ok(Some(item))
    }

    /// Drops every pending reminder this core created. For application-level
    /// resets, not routine edits.
    pub fn reset_reminders(&self) {
        self.scheduler.cancel_all();
    }

    fn find(&self, item_id: &str) -> Result<Item, ServiceError> {
        self.store
            .fetch_all()?
            .into_iter()
            .find(|item| item.id == item_id)
            .ok_or_else(|| ServiceError::NotFound(item_id.to_string()))
    }
}

fn validate_title(raw: &str) -> Result<String, ServiceError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidTitle(
            "title must not be empty".to_string(),
        ));
    }
    if trimmed.chars().count() < MIN_TITLE_CHARS {
        return Err(ServiceError::InvalidTitle(format!(
            "title must be at least {MIN_TITLE_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_note(note: Option<String>) -> Option<String> {
    note.filter(|text| !text.trim().is_empty())
}
