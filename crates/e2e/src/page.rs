//! Read-only page capability surface consumed by the detector
//!
//! Any browser binding that can answer these five questions is substitutable:
//! [`crate::playwright::PlaywrightPage`] talks to a live browser, the integration
//! tests use a scripted in-memory page.

use std::time::Duration;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PageResult;

/// Condition a page waits on before [`PageAccessor::wait_for_function`] resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WaitPredicate {
    /// No element matching `selector` is visible
    Hidden { selector: String },

    /// No element matches `selector` at all
    Absent { selector: String },

    /// One of `selectors` is visible and its text is longer than `min_text_len` chars
    VisibleWithText {
        selectors: Vec<String>,
        min_text_len: usize,
    },

    /// Exactly `expected` elements match `selector`
    CountEquals { selector: String, expected: usize },

    /// Any of `texts` is visible somewhere on the page
    TextVisible { texts: Vec<String> },
}

/// Minimal page surface the response detector needs.
///
/// Implementations must never mutate page state.
#[async_trait]
pub trait PageAccessor: Send + Sync {
    /// Whether an element matching `selector` is currently visible.
    async fn is_visible(&self, selector: &str, timeout: Duration) -> PageResult<bool>;

    /// Text of the first element matching `selector`, `None` when nothing matches.
    async fn text_content(&self, selector: &str) -> PageResult<Option<String>>;

    /// Evaluate a JavaScript expression in the page.
    async fn evaluate(&self, script: &str) -> PageResult<serde_json::Value>;

    /// Resolve once `predicate` holds, or fail with [`crate::error::PageError::Timeout`].
    async fn wait_for_function(&self, predicate: &WaitPredicate, timeout: Duration) -> PageResult<()>;

    /// Number of elements matching `selector`.
    async fn count(&self, selector: &str) -> PageResult<usize>;
}

/// Input side of the chat UI, used by the scenario runner to trigger a response.
#[async_trait]
pub trait ChatInput: Send + Sync {
    /// Type a prompt into the chat input and submit it.
    async fn send_prompt(&self, text: &str) -> PageResult<()>;

    /// Click a template button.
    async fn click(&self, selector: &str) -> PageResult<()>;
}

/// Expression returning the visible text of the whole page.
pub const PAGE_TEXT_SCRIPT: &str = "document.body ? document.body.innerText : ''";
