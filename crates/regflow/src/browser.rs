//! Browser control over the Chrome DevTools Protocol.
//!
//! With the `browser` feature, [`CdpDriver`] implements [`PageDriver`] on a
//! chromiumoxide page and [`CdpSession`] owns the browser process. DOM queries
//! are JavaScript snippets that walk a [`NodePath`]; clicks, typing and key
//! presses are real CDP input events so the client's handlers fire as they
//! would for a user.
//!
//! The script builders in [`script`] are plain string functions and are
//! compiled without the feature.

use crate::locator::{NodePath, PathStep, Selector};

/// Browser configuration
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Window width
    pub viewport_width: u32,
    /// Window height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    /// A visible, maximized window: the one-time code is typed by a person.
    fn default() -> Self {
        Self {
            headless: false,
            viewport_width: 1920,
            viewport_height: 1080,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set window dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// JavaScript snippets evaluated by [`CdpDriver`]
pub mod script {
    use super::{NodePath, PathStep, Selector};

    /// Quote text as a JavaScript string literal
    #[must_use]
    pub fn js_string(text: &str) -> String {
        serde_json::Value::String(text.to_string()).to_string()
    }

    fn snapshot(xpath: &str, context: &str) -> String {
        format!(
            "document.evaluate({}, {context}, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null)",
            js_string(xpath)
        )
    }

    /// Number of nodes matching a selector
    #[must_use]
    pub fn count(selector: &Selector) -> String {
        match selector {
            Selector::XPath(x) => format!("{}.snapshotLength", snapshot(x, "document")),
            Selector::Css(c) => format!("document.querySelectorAll({}).length", js_string(c)),
        }
    }

    fn root(path: &NodePath) -> String {
        match &path.root {
            Selector::XPath(x) => format!("{}.snapshotItem({})", snapshot(x, "document"), path.index),
            Selector::Css(c) => format!("document.querySelectorAll({})[{}]", js_string(c), path.index),
        }
    }

    fn step(step: &PathStep) -> String {
        match step {
            PathStep::Parent => "n = n && n.parentElement;".to_string(),
            PathStep::Child(Selector::XPath(x)) => format!(
                "n = n && document.evaluate({}, n, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;",
                js_string(x)
            ),
            PathStep::Child(Selector::Css(c)) => {
                format!("n = n && n.querySelector({});", js_string(c))
            }
        }
    }

    /// Resolve `path` into `n`, return `missing` if it does not resolve, else run `body`
    #[must_use]
    pub fn with_node(path: &NodePath, missing: &str, body: &str) -> String {
        let steps: String = path.steps.iter().map(step).collect::<Vec<_>>().join(" ");
        format!(
            "(() => {{ let n = {} || null; {steps} if (!n) return {missing}; {body} }})()",
            root(path)
        )
    }

    /// `{state: {tag, visible, editable, selected} | null}`
    #[must_use]
    pub fn probe(path: &NodePath) -> String {
        with_node(
            path,
            "{ state: null }",
            "const r = n.getBoundingClientRect(); const s = getComputedStyle(n); \
             const tag = n.tagName.toLowerCase(); \
             const visible = r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; \
             const editable = visible && !n.disabled && !n.readOnly && \
               (n.isContentEditable || ['input', 'textarea', 'select'].includes(tag)); \
             return { state: { tag, visible, editable, selected: !!(n.checked || n.selected) } };",
        )
    }

    /// `{stale, value}`
    #[must_use]
    pub fn attribute(path: &NodePath, name: &str) -> String {
        with_node(
            path,
            "{ stale: true, value: null }",
            &format!("return {{ stale: false, value: n.getAttribute({}) }};", js_string(name)),
        )
    }

    /// `{stale, value}` with the live value of a control or the node's text
    #[must_use]
    pub fn field_value(path: &NodePath) -> String {
        with_node(
            path,
            "{ stale: true, value: null }",
            "return { stale: false, value: typeof n.value === 'string' ? n.value : n.textContent };",
        )
    }

    /// Scroll into view and report the center point: `{ok, x, y}`
    #[must_use]
    pub fn center(path: &NodePath) -> String {
        with_node(
            path,
            "{ ok: false, x: 0, y: 0 }",
            "n.scrollIntoView({ block: 'center', inline: 'center' }); \
             const r = n.getBoundingClientRect(); \
             return { ok: true, x: r.left + r.width / 2, y: r.top + r.height / 2 };",
        )
    }

    /// Focus with the caret at the end: `{ok}`
    #[must_use]
    pub fn focus(path: &NodePath) -> String {
        with_node(
            path,
            "{ ok: false }",
            "n.focus(); \
             if (typeof n.setSelectionRange === 'function' && typeof n.value === 'string') { \
               n.setSelectionRange(n.value.length, n.value.length); \
             } else if (n.isContentEditable) { \
               const range = document.createRange(); range.selectNodeContents(n); range.collapse(false); \
               const sel = window.getSelection(); sel.removeAllRanges(); sel.addRange(range); \
             } \
             return { ok: true };",
        )
    }

    /// Focus and select all content: `{ok}`
    #[must_use]
    pub fn select_all(path: &NodePath) -> String {
        with_node(
            path,
            "{ ok: false }",
            "n.focus(); \
             if (typeof n.select === 'function') { n.select(); } else { \
               const range = document.createRange(); range.selectNodeContents(n); \
               const sel = window.getSelection(); sel.removeAllRanges(); sel.addRange(range); \
             } \
             return { ok: true };",
        )
    }

    /// Empty the node and notify listeners: `{ok}`
    #[must_use]
    pub fn clear(path: &NodePath) -> String {
        with_node(
            path,
            "{ ok: false }",
            "n.focus(); \
             if (typeof n.value === 'string') { n.value = ''; } else { n.textContent = ''; } \
             n.dispatchEvent(new Event('input', { bubbles: true })); \
             return { ok: true };",
        )
    }
}

#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc, clippy::significant_drop_tightening)]
mod cdp {
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::input::{
        DispatchKeyEventParams, DispatchKeyEventType, InsertTextParams,
    };
    use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
    use chromiumoxide::error::CdpError;
    use chromiumoxide::layout::Point;
    use chromiumoxide::page::{Page, ScreenshotParams};
    use futures::StreamExt;
    use serde::de::DeserializeOwned;
    use serde::Deserialize;
    use tokio::task::JoinHandle;
    use tracing::{debug, warn};

    use super::{script, BrowserConfig};
    use crate::driver::{Key, NodeState, PageDriver, Screenshot};
    use crate::locator::{NodePath, Selector};
    use crate::result::{RegflowError, RegflowResult};
    use crate::session::BrowserSession;

    #[derive(Deserialize)]
    struct Probe {
        state: Option<NodeState>,
    }

    #[derive(Deserialize)]
    struct Attribute {
        stale: bool,
        value: Option<String>,
    }

    #[derive(Deserialize)]
    struct Done {
        ok: bool,
    }

    #[derive(Deserialize)]
    struct Center {
        ok: bool,
        x: f64,
        y: f64,
    }

    fn driver_err(e: impl std::fmt::Display) -> RegflowError {
        RegflowError::driver(e.to_string())
    }

    /// The page is navigating and the JS context it was evaluated in is gone
    fn context_lost(err: &CdpError) -> bool {
        let message = err.to_string();
        message.contains("Execution context was destroyed")
            || message.contains("Cannot find context with specified id")
    }

    fn stale(path: &NodePath, action: &str) -> RegflowError {
        RegflowError::StaleElement {
            role: path.to_string(),
            action: action.to_string(),
        }
    }

    /// [`PageDriver`] over a chromiumoxide page
    #[derive(Debug, Default)]
    pub struct CdpDriver {
        page: Option<Page>,
    }

    impl CdpDriver {
        /// Driver for an open page
        #[must_use]
        pub const fn new(page: Page) -> Self {
            Self { page: Some(page) }
        }

        fn page(&self) -> RegflowResult<&Page> {
            self.page
                .as_ref()
                .ok_or_else(|| RegflowError::driver("no page open"))
        }

        /// Evaluate a script; `None` when the context went away mid-navigation
        async fn eval<T: DeserializeOwned>(&self, script: String) -> RegflowResult<Option<T>> {
            match self.page()?.evaluate(script).await {
                Ok(result) => result.into_value().map(Some).map_err(driver_err),
                Err(err) if context_lost(&err) => {
                    debug!(error = %err, "evaluation raced a navigation");
                    Ok(None)
                }
                Err(err) => Err(driver_err(err)),
            }
        }

        async fn run(&self, path: &NodePath, script: String, action: &str) -> RegflowResult<()> {
            match self.eval::<Done>(script).await? {
                Some(Done { ok: true }) => Ok(()),
                _ => Err(stale(path, action)),
            }
        }

        async fn key_event(&self, down: bool, key: Key) -> RegflowResult<()> {
            let builder = DispatchKeyEventParams::builder()
                .key(key.key())
                .code(key.code())
                .windows_virtual_key_code(key.key_code());
            let builder = if down {
                builder.r#type(DispatchKeyEventType::KeyDown).text(key.text())
            } else {
                builder.r#type(DispatchKeyEventType::KeyUp)
            };
            let params = builder.build().map_err(driver_err)?;
            self.page()?.execute(params).await.map_err(driver_err)?;
            Ok(())
        }
    }

    #[async_trait]
    impl PageDriver for CdpDriver {
        async fn navigate(&self, url: &str) -> RegflowResult<()> {
            self.page()?
                .goto(url)
                .await
                .map_err(|e| RegflowError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok(())
        }

        async fn count(&self, selector: &Selector) -> RegflowResult<usize> {
            Ok(self
                .eval::<usize>(script::count(selector))
                .await?
                .unwrap_or(0))
        }

        async fn probe(&self, path: &NodePath) -> RegflowResult<Option<NodeState>> {
            Ok(self
                .eval::<Probe>(script::probe(path))
                .await?
                .and_then(|p| p.state))
        }

        async fn attribute(&self, path: &NodePath, name: &str) -> RegflowResult<Option<String>> {
            Ok(self
                .eval::<Attribute>(script::attribute(path, name))
                .await?
                .filter(|a| !a.stale)
                .and_then(|a| a.value))
        }

        async fn field_value(&self, path: &NodePath) -> RegflowResult<Option<String>> {
            Ok(self
                .eval::<Attribute>(script::field_value(path))
                .await?
                .filter(|a| !a.stale)
                .and_then(|a| a.value))
        }

        async fn click(&self, path: &NodePath) -> RegflowResult<()> {
            let center = match self.eval::<Center>(script::center(path)).await? {
                Some(c) if c.ok => c,
                _ => return Err(stale(path, "click")),
            };
            self.page()?
                .click(Point::new(center.x, center.y))
                .await
                .map_err(driver_err)?;
            Ok(())
        }

        async fn clear(&self, path: &NodePath) -> RegflowResult<()> {
            self.run(path, script::clear(path), "clear").await
        }

        async fn select_all(&self, path: &NodePath) -> RegflowResult<()> {
            self.run(path, script::select_all(path), "select-all").await
        }

        async fn type_text(&self, path: &NodePath, text: &str) -> RegflowResult<()> {
            self.run(path, script::focus(path), "type").await?;
            self.page()?
                .execute(InsertTextParams::new(text))
                .await
                .map_err(driver_err)?;
            Ok(())
        }

        async fn press_key(&self, path: &NodePath, key: Key) -> RegflowResult<()> {
            self.run(path, script::focus(path), "key press").await?;
            self.key_event(true, key).await?;
            self.key_event(false, key).await
        }

        async fn current_url(&self) -> RegflowResult<String> {
            Ok(self
                .page()?
                .url()
                .await
                .map_err(driver_err)?
                .unwrap_or_default())
        }

        async fn screenshot(&self) -> RegflowResult<Screenshot> {
            let params = ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build();
            let data = self
                .page()?
                .screenshot(params)
                .await
                .map_err(driver_err)?;
            Ok(Screenshot::new(data))
        }

        async fn close(&self) -> RegflowResult<()> {
            self.page()?.clone().close().await.map_err(driver_err)
        }
    }

    /// [`BrowserSession`] that launches chromium on `open`
    #[derive(Debug)]
    pub struct CdpSession {
        config: BrowserConfig,
        browser: Option<Browser>,
        handler: Option<JoinHandle<()>>,
        driver: CdpDriver,
    }

    impl CdpSession {
        /// Session with the given configuration; nothing is launched yet
        #[must_use]
        pub fn new(config: BrowserConfig) -> Self {
            Self {
                config,
                browser: None,
                handler: None,
                driver: CdpDriver::default(),
            }
        }

        async fn launch(&mut self) -> RegflowResult<()> {
            let launch_err = |e: &dyn std::fmt::Display| RegflowError::BrowserLaunch {
                message: e.to_string(),
            };
            let mut builder = CdpConfig::builder()
                .window_size(self.config.viewport_width, self.config.viewport_height)
                .viewport(None)
                .arg("--start-maximized");
            if !self.config.headless {
                builder = builder.with_head();
            }
            if !self.config.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(ref path) = self.config.chromium_path {
                builder = builder.chrome_executable(path);
            }
            let cdp_config = builder.build().map_err(|e| launch_err(&e))?;

            let (browser, mut handler) = Browser::launch(cdp_config)
                .await
                .map_err(|e| launch_err(&e))?;
            self.handler = Some(tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            }));
            self.browser = Some(browser);
            Ok(())
        }
    }

    #[async_trait]
    impl BrowserSession for CdpSession {
        async fn open(&mut self, url: &str) -> RegflowResult<()> {
            if self.browser.is_none() {
                self.launch().await?;
            }
            let browser = self
                .browser
                .as_ref()
                .ok_or_else(|| RegflowError::driver("browser not running"))?;
            let page = browser
                .new_page(url)
                .await
                .map_err(|e| RegflowError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            self.driver = CdpDriver::new(page);
            Ok(())
        }

        fn driver(&self) -> &dyn PageDriver {
            &self.driver
        }

        async fn close(&mut self) -> RegflowResult<()> {
            self.driver = CdpDriver::default();
            let result = match self.browser.take() {
                Some(mut browser) => {
                    let closed = browser.close().await.map(|_| ()).map_err(driver_err);
                    if let Err(err) = browser.wait().await {
                        warn!(error = %err, "browser process did not exit cleanly");
                    }
                    closed
                }
                None => Ok(()),
            };
            if let Some(handler) = self.handler.take() {
                handler.abort();
            }
            result
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{CdpDriver, CdpSession};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::script::*;
    use super::*;

    #[test]
    fn test_default_is_headed() {
        let config = BrowserConfig::default();
        assert!(!config.headless);
        assert!(config.sandbox);
        let ci = config.with_headless(true).with_no_sandbox().with_viewport(800, 600);
        assert!(ci.headless);
        assert!(!ci.sandbox);
        assert_eq!(ci.viewport_width, 800);
    }

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(js_string("//*[text()='Далее']"), "\"//*[text()='Далее']\"");
        assert_eq!(js_string(r#"say "hi""#), r#""say \"hi\"""#);
    }

    #[test]
    fn test_count_xpath_and_css() {
        assert_eq!(
            count(&Selector::xpath("//button")),
            "document.evaluate(\"//button\", document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null).snapshotLength"
        );
        assert_eq!(
            count(&Selector::css("#search")),
            "document.querySelectorAll(\"#search\").length"
        );
    }

    #[test]
    fn test_with_node_walks_steps() {
        let path = NodePath::nth(Selector::css(".phone"), 2)
            .child(Selector::xpath("./div[@inputmode='decimal']"))
            .parent();
        let js = with_node(&path, "null", "return n.id;");
        assert!(js.starts_with("(() => { let n = document.querySelectorAll(\".phone\")[2] || null;"));
        assert!(js.contains(
            "n = n && document.evaluate(\"./div[@inputmode='decimal']\", n, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;"
        ));
        assert!(js.contains("n = n && n.parentElement;"));
        assert!(js.ends_with("if (!n) return null; return n.id; })()"));
    }

    #[test]
    fn test_probe_reports_missing_as_null_state() {
        let js = probe(&NodePath::new(Selector::xpath("//input")));
        assert!(js.contains("snapshotItem(0)"));
        assert!(js.contains("return { state: null }"));
    }

    #[test]
    fn test_attribute_quotes_name() {
        let js = attribute(&NodePath::new(Selector::xpath("//input")), "class");
        assert!(js.contains("n.getAttribute(\"class\")"));
    }

    #[test]
    fn test_field_value_reads_live_value() {
        let js = field_value(&NodePath::new(Selector::xpath("//input")));
        assert!(js.contains("n.value"));
        assert!(js.contains("n.textContent"));
        assert!(js.contains("{ stale: true, value: null }"));
    }
}
