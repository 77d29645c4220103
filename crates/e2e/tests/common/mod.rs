//! Scripted in-memory chat page shared by the integration tests.
//!
//! Every DOM fact is a function of time since the page was built, so tests drive
//! it with `#[tokio::test(start_paused = true)]` and get exact millisecond timings.

#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;
use async_trait::async_trait;
use tokio::time::Instant;

use finchat_e2e::page::PAGE_TEXT_SCRIPT;
use finchat_e2e::{ChatInput, DetectionSelectors, PageAccessor, PageError, WaitPredicate};

pub const MARKET_STATUS_REPLY: &str =
    "📈 Market Status: NYSE trading session open, 💰 exchange active, volume rising";

/// When something shown at page load goes away
#[derive(Debug, Clone, Copy)]
pub enum Shown {
    Never,
    Until(Duration),
    Always,
}

impl Shown {
    fn at(&self, t: Duration) -> bool {
        match self {
            Shown::Never => false,
            Shown::Until(d) => t < *d,
            Shown::Always => true,
        }
    }

    fn gone_at(&self) -> Option<Duration> {
        match self {
            Shown::Never => Some(Duration::ZERO),
            Shown::Until(d) => Some(*d),
            Shown::Always => None,
        }
    }
}

pub struct ScriptedPage {
    start: Instant,
    selectors: DetectionSelectors,
    loading: Shown,
    loading_class: Shown,
    content: String,
    response_at: Option<Duration>,
    base_messages: usize,
    message_added_at: Option<Duration>,
    message_jump: usize,
    markers_at: Option<Duration>,
    calls: Mutex<Vec<String>>,
    inputs: Mutex<Vec<String>>,
}

impl ScriptedPage {
    /// A page whose reply text is `content`, with nothing scheduled yet
    pub fn new(content: &str) -> Self {
        Self {
            start: Instant::now(),
            selectors: DetectionSelectors::default(),
            loading: Shown::Never,
            loading_class: Shown::Never,
            content: content.to_string(),
            response_at: None,
            base_messages: 2,
            message_added_at: None,
            message_jump: 1,
            markers_at: None,
            calls: Mutex::new(Vec::new()),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn loading(mut self, shown: Shown) -> Self {
        self.loading = shown;
        self
    }

    pub fn loading_class(mut self, shown: Shown) -> Self {
        self.loading_class = shown;
        self
    }

    /// Reply container becomes visible with the content at `ms`
    pub fn response_at(mut self, ms: u64) -> Self {
        self.response_at = Some(Duration::from_millis(ms));
        self
    }

    /// One chat message is appended at `ms`
    pub fn message_added_at(mut self, ms: u64) -> Self {
        self.message_added_at = Some(Duration::from_millis(ms));
        self
    }

    /// Messages appended at once when the reply lands (default 1)
    pub fn message_jump(mut self, n: usize) -> Self {
        self.message_jump = n;
        self
    }

    pub fn markers_at(mut self, ms: u64) -> Self {
        self.markers_at = Some(Duration::from_millis(ms));
        self
    }

    /// Typical reply: loading shown until `ms`, then reply text and one new message
    pub fn replying_at(content: &str, ms: u64) -> Self {
        Self::new(content)
            .loading(Shown::Until(Duration::from_millis(ms)))
            .response_at(ms)
            .message_added_at(ms)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }

    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn is_loading_selector(&self, selector: &str) -> bool {
        self.selectors.loading.first().map(String::as_str) == Some(selector)
    }

    fn is_response_selector(&self, selector: &str) -> bool {
        self.selectors.response.iter().any(|s| s == selector)
    }

    fn response_shown(&self, t: Duration) -> bool {
        matches!(self.response_at, Some(at) if at <= t) && !self.content.is_empty()
    }

    fn messages(&self, t: Duration) -> usize {
        match self.message_added_at {
            Some(at) if at <= t => self.base_messages + self.message_jump,
            _ => self.base_messages,
        }
    }

    /// Earliest time `predicate` holds, `None` if it never will
    fn holds_from(&self, predicate: &WaitPredicate) -> Option<Duration> {
        match predicate {
            WaitPredicate::Hidden { selector } if self.is_loading_selector(selector) => {
                self.loading.gone_at()
            }
            WaitPredicate::Hidden { .. } => Some(Duration::ZERO),
            WaitPredicate::Absent { selector } if *selector == self.selectors.loading_root_selector() => {
                self.loading_class.gone_at()
            }
            WaitPredicate::Absent { .. } => Some(Duration::ZERO),
            WaitPredicate::VisibleWithText { min_text_len, .. } => {
                if self.content.chars().count() > *min_text_len {
                    self.response_at
                } else {
                    None
                }
            }
            WaitPredicate::CountEquals { expected, .. } => {
                if *expected == self.base_messages {
                    Some(Duration::ZERO)
                } else if *expected == self.base_messages + self.message_jump {
                    self.message_added_at
                } else {
                    None
                }
            }
            WaitPredicate::TextVisible { texts } => {
                if texts.iter().any(|t| self.content.contains(t.as_str())) {
                    self.markers_at
                } else {
                    None
                }
            }
        }
    }
}

#[async_trait]
impl PageAccessor for ScriptedPage {
    async fn is_visible(&self, selector: &str, _timeout: Duration) -> Result<bool, PageError> {
        self.log(format!("is_visible {}", selector));
        let t = self.now();
        if self.is_loading_selector(selector) {
            return Ok(self.loading.at(t));
        }
        Ok(self.is_response_selector(selector) && self.response_shown(t))
    }

    async fn text_content(&self, selector: &str) -> Result<Option<String>, PageError> {
        self.log(format!("text_content {}", selector));
        if self.is_response_selector(selector) && self.response_shown(self.now()) {
            return Ok(Some(self.content.clone()));
        }
        Ok(None)
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, PageError> {
        self.log("evaluate".to_string());
        if script != PAGE_TEXT_SCRIPT {
            return Err(PageError::Driver(format!("unexpected script: {}", script)));
        }
        let body = if self.response_shown(self.now()) {
            self.content.clone()
        } else {
            String::new()
        };
        Ok(serde_json::Value::String(body))
    }

    async fn wait_for_function(&self, predicate: &WaitPredicate, timeout: Duration) -> Result<(), PageError> {
        self.log(format!("wait_for_function {:?}", predicate));
        let now = self.now();
        match self.holds_from(predicate) {
            Some(at) if at <= now => Ok(()),
            Some(at) if at - now <= timeout => {
                tokio::time::sleep_until(self.start + at).await;
                Ok(())
            }
            _ => {
                tokio::time::sleep(timeout).await;
                Err(PageError::Timeout(timeout))
            }
        }
    }

    async fn count(&self, selector: &str) -> Result<usize, PageError> {
        self.log(format!("count {}", selector));
        let t = self.now();
        if selector == self.selectors.message {
            return Ok(self.messages(t));
        }
        if selector == self.selectors.loading_root_selector() {
            return Ok(usize::from(self.loading_class.at(t)));
        }
        Ok(0)
    }
}

#[async_trait]
impl ChatInput for ScriptedPage {
    async fn send_prompt(&self, text: &str) -> Result<(), PageError> {
        self.inputs.lock().unwrap().push(format!("prompt {}", text));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), PageError> {
        if selector.contains("missing") {
            return Err(PageError::SelectorNotFound(selector.to_string()));
        }
        self.inputs.lock().unwrap().push(format!("click {}", selector));
        Ok(())
    }
}
