//! Content item and kind types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Id prefix that marks an item as a research paper.
pub const RESEARCH_ID_PREFIX: &str = "paper_";

/// Id prefix that project detail pages carry.
const PROJECT_PAGE_PREFIX: &str = "project_";

/// Which listing an item belongs to.
///
/// Derived from the id prefix, so every item has exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// A portfolio project.
    Project,
    /// A research paper (`paper_` id prefix).
    Research,
}

impl ContentKind {
    /// Classifies an item id.
    #[must_use]
    pub fn from_id(id: &str) -> Self {
        if id.starts_with(RESEARCH_ID_PREFIX) {
            Self::Research
        } else {
            Self::Project
        }
    }

    /// Returns the kind as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Research => "research",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One project or research-paper record from the content file.
///
/// Unknown fields in the source document are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Unique identifier; a `paper_` prefix marks a research paper.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Technologies used, in display order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_stack: Option<Vec<String>>,
    /// Long-form details.
    #[serde(default)]
    pub details: String,
}

impl ContentItem {
    /// Creates an item with only the required fields.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            tech_stack: None,
            details: String::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the technology stack.
    #[must_use]
    pub fn with_tech_stack<I, S>(mut self, stack: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tech_stack = Some(stack.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the details text.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    /// Returns the listing this item belongs to.
    #[must_use]
    pub fn kind(&self) -> ContentKind {
        ContentKind::from_id(&self.id)
    }

    /// Returns the technology stack if present and non-empty.
    #[must_use]
    pub fn non_empty_tech_stack(&self) -> Option<&[String]> {
        self.tech_stack.as_deref().filter(|stack| !stack.is_empty())
    }

    /// Returns the detail page label used by listing views.
    ///
    /// Research papers link to their own id; projects link to `project_<id>` unless
    /// the id already carries that prefix.
    #[must_use]
    pub fn details_page(&self) -> String {
        match self.kind() {
            ContentKind::Research => self.id.clone(),
            ContentKind::Project if self.id.starts_with(PROJECT_PAGE_PREFIX) => self.id.clone(),
            ContentKind::Project => format!("{PROJECT_PAGE_PREFIX}{}", self.id),
        }
    }
}

/// Render-time view of an item for listing endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ItemView<'a> {
    /// Item id.
    pub id: &'a str,
    /// Item title.
    pub title: &'a str,
    /// Item description.
    pub description: &'a str,
    /// Technologies used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tech_stack: Option<&'a [String]>,
    /// Listing kind.
    pub kind: ContentKind,
    /// Detail page label, computed per request.
    pub details_page: String,
}

impl<'a> From<&'a ContentItem> for ItemView<'a> {
    fn from(item: &'a ContentItem) -> Self {
        Self {
            id: &item.id,
            title: &item.title,
            description: &item.description,
            tech_stack: item.tech_stack.as_deref(),
            kind: item.kind(),
            details_page: item.details_page(),
        }
    }
}
