//! Core of a single-user task/reminder list: the item model, the pure
//! filter/sort pipeline, a single-slot undo buffer for deletions, and a
//! scheduler that keeps local notification requests in step with item
//! due dates. Persistence and notification delivery are collaborators
//! injected through the `ItemStore` and `NotificationStore` traits.

pub mod logging;
pub mod models;
pub mod pipeline;
pub mod reminders;
pub mod service;
pub mod storage;
pub mod undo;

pub use models::{Category, Item, ItemsFile, Priority, Timestamp};
pub use pipeline::{visible_items, SortOption, StatusFilter};
pub use reminders::{NotificationError, NotificationStore, ReminderScheduler};
pub use service::{ItemDraft, ListService, ServiceError, UndoToken};
pub use storage::{ItemStore, JsonStore, StorageError};
pub use undo::{UndoBuffer, DEFAULT_UNDO_WINDOW};
