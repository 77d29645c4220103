//! Playwright-backed page accessor
//!
//! A small Node script attaches to an already running browser over CDP and
//! answers JSON-line requests on stdin/stdout. Finding the browser and its debug
//! port is left to whoever launched it; the endpoint comes from configuration.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult, PageError, PageResult};
use crate::page::{ChatInput, PageAccessor, WaitPredicate};

const BRIDGE_SCRIPT: &str = r#"
const { chromium } = require(require.resolve('playwright', { paths: [process.cwd()] }));
const readline = require('readline');

const reply = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');

(async () => {
  const browser = await chromium.connectOverCDP(process.env.FINCHAT_CDP_ENDPOINT);
  const match = process.env.FINCHAT_PAGE_MATCH || '';
  const pages = browser.contexts().flatMap((c) => c.pages());
  const page = pages.find((p) => match && p.url().includes(match)) || pages[0];
  if (!page) {
    reply({ ready: false, error: 'no open page on ' + process.env.FINCHAT_CDP_ENDPOINT });
    process.exit(1);
  }
  reply({ ready: true, value: page.url() });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    let req;
    try {
      req = JSON.parse(line);
    } catch (e) {
      continue;
    }
    try {
      let value = null;
      switch (req.op) {
        case 'is_visible':
          value = await page.locator(req.selector).first().isVisible();
          break;
        case 'text_content': {
          const el = await page.$(req.selector);
          value = el ? await el.textContent() : null;
          break;
        }
        case 'evaluate':
          value = await page.evaluate(req.script);
          break;
        case 'wait_for_function':
          await page.waitForFunction(req.script, null, { timeout: req.timeout_ms, polling: 250 });
          value = true;
          break;
        case 'count':
          value = await page.locator(req.selector).count();
          break;
        case 'fill':
          await page.fill(req.selector, req.text);
          break;
        case 'press':
          await page.press(req.selector, req.key);
          break;
        case 'click':
          await page.click(req.selector, { timeout: req.timeout_ms });
          break;
        default:
          throw new Error('unknown op ' + req.op);
      }
      reply({ id: req.id, ok: true, value });
    } catch (error) {
      reply({ id: req.id, ok: false, timeout: error.name === 'TimeoutError', error: error.message });
    }
  }
  await browser.close();
})().catch((error) => {
  reply({ ready: false, error: error.message });
  process.exit(1);
});
"#;

/// JavaScript used by every visibility predicate
const VISIBLE_FN: &str =
    "const visible = (el) => !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);";

/// Configuration for the Playwright bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    /// Node executable
    pub node_binary: PathBuf,

    /// CDP endpoint of the browser running the chat app
    pub cdp_endpoint: String,

    /// Attach to the first page whose URL contains this
    pub page_url_contains: Option<String>,

    /// Chat input used by [`ChatInput::send_prompt`]
    pub chat_input_selector: String,

    /// Key that submits the chat input
    pub submit_key: String,

    /// Timeout for requests without their own (reads, clicks)
    pub action_timeout_ms: u64,

    /// Slack on top of a request's own timeout before the bridge is considered hung
    pub bridge_grace_ms: u64,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            node_binary: PathBuf::from("node"),
            cdp_endpoint: "http://127.0.0.1:9222".to_string(),
            page_url_contains: None,
            chat_input_selector: r#"[data-testid="chat-input"]"#.to_string(),
            submit_key: "Enter".to_string(),
            action_timeout_ms: 10_000,
            bridge_grace_ms: 5_000,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum BridgeRequest<'a> {
    IsVisible { selector: &'a str },
    TextContent { selector: &'a str },
    Evaluate { script: &'a str },
    WaitForFunction { script: String, timeout_ms: u64 },
    Count { selector: &'a str },
    Fill { selector: &'a str, text: &'a str },
    Press { selector: &'a str, key: &'a str },
    Click { selector: &'a str, timeout_ms: u64 },
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    id: u64,
    #[serde(flatten)]
    request: BridgeRequest<'a>,
}

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    ready: Option<bool>,
    #[serde(default)]
    timeout: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

struct Bridge {
    _child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl Bridge {
    async fn next_message(&mut self) -> PageResult<BridgeResponse> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await
                .map_err(|e| PageError::Driver(format!("bridge read failed: {}", e)))?
                .ok_or_else(|| PageError::Driver("bridge process exited".to_string()))?;

            match serde_json::from_str::<BridgeResponse>(&line) {
                Ok(msg) => return Ok(msg),
                Err(_) => debug!("[bridge] {}", line),
            }
        }
    }
}

/// Page handle backed by a Node Playwright bridge process
pub struct PlaywrightPage {
    bridge: Mutex<Bridge>,
    config: PlaywrightConfig,
    next_id: AtomicU64,
    _script_dir: TempDir,
}

impl PlaywrightPage {
    /// Spawn the bridge and attach to the configured browser.
    pub async fn connect(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed(&config).await?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        info!("Attaching to browser at {}", config.cdp_endpoint);

        let mut cmd = Command::new(&config.node_binary);
        cmd.arg(&script_path)
            .env("FINCHAT_CDP_ENDPOINT", &config.cdp_endpoint)
            .env("FINCHAT_PAGE_MATCH", config.page_url_contains.as_deref().unwrap_or(""))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            E2eError::Playwright(format!(
                "Failed to spawn {}: {}",
                config.node_binary.display(),
                e
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdout unavailable".to_string()))?;

        let mut bridge = Bridge {
            _child: child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        };

        let connect_timeout = Duration::from_millis(config.action_timeout_ms + config.bridge_grace_ms);
        let hello = tokio::time::timeout(connect_timeout, bridge.next_message())
            .await
            .map_err(|_| E2eError::Timeout(format!("browser at {}", config.cdp_endpoint)))??;

        if hello.ready != Some(true) {
            return Err(E2eError::Playwright(
                hello.error.unwrap_or_else(|| "bridge failed to attach".to_string()),
            ));
        }

        info!("Attached to page {}", hello.value.as_str().unwrap_or("(unknown url)"));

        Ok(Self {
            bridge: Mutex::new(bridge),
            config,
            next_id: AtomicU64::new(1),
            _script_dir: script_dir,
        })
    }

    async fn check_playwright_installed(config: &PlaywrightConfig) -> E2eResult<()> {
        let status = Command::new(&config.node_binary)
            .args(["-e", "require.resolve('playwright')"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    async fn call(&self, request: BridgeRequest<'_>, timeout: Duration) -> PageResult<serde_json::Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut line = serde_json::to_string(&Envelope { id, request })
            .map_err(|e| PageError::Driver(e.to_string()))?;
        line.push('\n');

        let mut bridge = self.bridge.lock().await;
        bridge
            .stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| PageError::Driver(format!("bridge write failed: {}", e)))?;
        bridge
            .stdin
            .flush()
            .await
            .map_err(|e| PageError::Driver(format!("bridge write failed: {}", e)))?;

        let deadline = timeout + Duration::from_millis(self.config.bridge_grace_ms);
        let response = tokio::time::timeout(deadline, async {
            loop {
                let msg = bridge.next_message().await?;
                if msg.id == Some(id) {
                    return Ok::<_, PageError>(msg);
                }
                warn!("Discarding stale bridge reply {:?}", msg.id);
            }
        })
        .await
        .map_err(|_| PageError::Timeout(deadline))??;

        if response.ok {
            Ok(response.value)
        } else if response.timeout {
            Err(PageError::Timeout(timeout))
        } else {
            Err(PageError::Driver(
                response.error.unwrap_or_else(|| "unknown bridge error".to_string()),
            ))
        }
    }

    fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.config.action_timeout_ms)
    }
}

#[async_trait]
impl PageAccessor for PlaywrightPage {
    async fn is_visible(&self, selector: &str, timeout: Duration) -> PageResult<bool> {
        let value = self.call(BridgeRequest::IsVisible { selector }, timeout).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn text_content(&self, selector: &str) -> PageResult<Option<String>> {
        let value = self
            .call(BridgeRequest::TextContent { selector }, self.action_timeout())
            .await?;
        Ok(value.as_str().map(String::from))
    }

    async fn evaluate(&self, script: &str) -> PageResult<serde_json::Value> {
        self.call(BridgeRequest::Evaluate { script }, self.action_timeout()).await
    }

    async fn wait_for_function(&self, predicate: &WaitPredicate, timeout: Duration) -> PageResult<()> {
        let request = BridgeRequest::WaitForFunction {
            script: predicate_script(predicate),
            // Playwright treats 0 as "no timeout"
            timeout_ms: (timeout.as_millis() as u64).max(1),
        };
        self.call(request, timeout).await.map(|_| ())
    }

    async fn count(&self, selector: &str) -> PageResult<usize> {
        let value = self.call(BridgeRequest::Count { selector }, self.action_timeout()).await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }
}

#[async_trait]
impl ChatInput for PlaywrightPage {
    async fn send_prompt(&self, text: &str) -> PageResult<()> {
        let selector = self.config.chat_input_selector.as_str();
        debug!("Sending prompt ({} chars)", text.chars().count());
        self.call(BridgeRequest::Fill { selector, text }, self.action_timeout())
            .await?;
        let key = self.config.submit_key.as_str();
        self.call(BridgeRequest::Press { selector, key }, self.action_timeout())
            .await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> PageResult<()> {
        let timeout_ms = self.config.action_timeout_ms;
        self.call(BridgeRequest::Click { selector, timeout_ms }, self.action_timeout())
            .await
            .map(|_| ())
    }
}

/// Render a wait predicate as a JavaScript expression for `page.waitForFunction`.
pub fn predicate_script(predicate: &WaitPredicate) -> String {
    match predicate {
        WaitPredicate::Hidden { selector } => format!(
            "(() => {{ {} return Array.from(document.querySelectorAll({})).every((el) => !visible(el)); }})()",
            VISIBLE_FN,
            js_string(selector)
        ),
        WaitPredicate::Absent { selector } => {
            format!("document.querySelectorAll({}).length === 0", js_string(selector))
        }
        WaitPredicate::VisibleWithText { selectors, min_text_len } => format!(
            "(() => {{ {} for (const sel of {}) {{ for (const el of document.querySelectorAll(sel)) {{ \
             if (visible(el) && (el.innerText || '').trim().length > {}) return true; }} }} return false; }})()",
            VISIBLE_FN,
            js_array(selectors),
            min_text_len
        ),
        WaitPredicate::CountEquals { selector, expected } => format!(
            "document.querySelectorAll({}).length === {}",
            js_string(selector),
            expected
        ),
        WaitPredicate::TextVisible { texts } => format!(
            "(() => {{ const body = document.body ? document.body.innerText : ''; \
             return {}.some((t) => body.includes(t)); }})()",
            js_array(texts)
        ),
    }
}

fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn js_array(values: &[String]) -> String {
    serde_json::Value::from(values.to_vec()).to_string()
}
