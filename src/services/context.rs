//! Context assembly for grounded answers.
//!
//! The labels and their order are what the grounding prompt tells the model to rely
//! on, so they are fixed.

use crate::models::ContentItem;
use std::fmt::Write;

/// Builds the context block for one item.
///
/// ```text
/// Title: <title>
/// Description: <description>
/// Technology Stack: <a, b>      (only for a non-empty stack)
///
/// Details: <details>
/// ```
#[must_use]
pub fn build_context(item: &ContentItem) -> String {
    let mut context = String::with_capacity(
        item.title.len() + item.description.len() + item.details.len() + 64,
    );

    let _ = writeln!(context, "Title: {}", item.title);
    let _ = writeln!(context, "Description: {}", item.description);
    if let Some(stack) = item.non_empty_tech_stack() {
        let _ = writeln!(context, "Technology Stack: {}", stack.join(", "));
    }
    let _ = write!(context, "\nDetails: {}", item.details);

    context
}
