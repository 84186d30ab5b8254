//! Read-only content store.
//!
//! Loaded once at startup from a JSON array and shared by every request. There is
//! no mutation API after construction.

use crate::models::{ContentItem, ContentKind};
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// Immutable collection of content items with O(1) id lookup.
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    /// Items in source order.
    items: Vec<ContentItem>,
    /// Id to position in `items`.
    index: HashMap<String, usize>,
}

impl ContentStore {
    /// Loads the store from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or unreadable, is not a JSON array of
    /// objects with `id` and `title`, or contains duplicate ids.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_content".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let store = Self::from_json(&contents)?;
        tracing::info!(
            path = %path.display(),
            projects = store.projects().count(),
            research = store.research().count(),
            "Loaded content store"
        );
        Ok(store)
    }

    /// Parses the store from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or contains duplicate ids.
    pub fn from_json(json: &str) -> Result<Self> {
        let items: Vec<ContentItem> =
            serde_json::from_str(json).map_err(|e| Error::OperationFailed {
                operation: "parse_content".to_string(),
                cause: e.to_string(),
            })?;
        Self::from_items(items)
    }

    /// Builds the store from in-memory items.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if an id is empty or appears twice.
    pub fn from_items(items: Vec<ContentItem>) -> Result<Self> {
        let mut index = HashMap::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            if item.id.trim().is_empty() {
                return Err(Error::InvalidInput(format!(
                    "content item at position {position} has an empty id"
                )));
            }
            if index.insert(item.id.clone(), position).is_some() {
                return Err(Error::InvalidInput(format!(
                    "duplicate content id: {}",
                    item.id
                )));
            }
        }
        Ok(Self { items, index })
    }

    /// Looks up an item by exact id.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<&ContentItem> {
        self.index.get(id).and_then(|&position| self.items.get(position))
    }

    /// Returns all items in source order.
    pub fn all(&self) -> impl Iterator<Item = &ContentItem> {
        self.items.iter()
    }

    /// Returns the items of one kind in source order.
    pub fn of_kind(&self, kind: ContentKind) -> impl Iterator<Item = &ContentItem> {
        self.items.iter().filter(move |item| item.kind() == kind)
    }

    /// Returns projects in source order.
    pub fn projects(&self) -> impl Iterator<Item = &ContentItem> {
        self.of_kind(ContentKind::Project)
    }

    /// Returns research papers in source order.
    pub fn research(&self) -> impl Iterator<Item = &ContentItem> {
        self.of_kind(ContentKind::Research)
    }

    /// Splits the store into `(projects, research)`, each in source order.
    #[must_use]
    pub fn partition(&self) -> (Vec<&ContentItem>, Vec<&ContentItem>) {
        self.items
            .iter()
            .partition(|item| item.kind() == ContentKind::Project)
    }

    /// Returns the given ids in the given order, skipping ids that do not exist.
    #[must_use]
    pub fn featured<S: AsRef<str>>(&self, ids: &[S]) -> Vec<&ContentItem> {
        ids.iter().filter_map(|id| self.lookup(id.as_ref())).collect()
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the store holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
