use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::{Category, Item};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Open,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    #[default]
    Priority,
    Title,
    DueDate,
    CreatedAt,
}

/// Filters and sorts the full collection into the list the UI should show.
///
/// Pure: the input is never mutated and the same selections always produce
/// the same order. Ties on the primary sort key fall back to newest-created
/// first, then to `id`, so the output is fully deterministic.
pub fn visible_items(
    items: &[Item],
    category: Option<Category>,
    status: StatusFilter,
    sort: SortOption,
) -> Vec<Item> {
    let mut out: Vec<Item> = items
        .iter()
        .filter(|item| match category {
            Some(selected) => item.category == selected,
            None => true,
        })
        .filter(|item| match status {
            StatusFilter::All => true,
            StatusFilter::Open => !item.completed,
            StatusFilter::Completed => item.completed,
        })
        .cloned()
        .collect();

    out.sort_by(|a, b| compare(a, b, sort).then_with(|| tie_break(a, b)));
    out
}

fn compare(a: &Item, b: &Item, sort: SortOption) -> Ordering {
    match sort {
        SortOption::Priority => a.priority.sort_index().cmp(&b.priority.sort_index()),
        SortOption::Title => a
            .title
            .to_lowercase()
            .cmp(&b.title.to_lowercase()),
        SortOption::DueDate => match (a.due_at, b.due_at) {
            (None, None) => Ordering::Equal,
            // An absent due date never sorts before a present one.
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(first), Some(second)) => first.cmp(&second),
        },
        SortOption::CreatedAt => b.created_at.cmp(&a.created_at),
    }
}

fn tie_break(a: &Item, b: &Item) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}
