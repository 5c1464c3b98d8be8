//! In-memory DOM for testing page objects and flows without a browser.
//!
//! Nodes match selectors by registration rather than by evaluating XPath or
//! CSS, the same way probar's `MockDriver` matches on ids. Visibility and DOM
//! membership are time windows measured from driver creation on the tokio
//! clock, so `#[tokio::test(start_paused = true)]` makes every timeout
//! deterministic. Clicks and key presses can trigger [`Reaction`]s that
//! reschedule other nodes, which is enough to script a whole login flow.
//!
//! # Example
//!
//! ```
//! use regflow::{MockDom, MockDriver, Reaction, Selector};
//! use std::time::Duration;
//!
//! let mut dom = MockDom::new();
//! let dialog = dom.node("div").matches(Selector::css(".dialog")).hidden().insert();
//! let button = dom.node("button").matches(Selector::css("#open")).insert();
//! dom.on_click(button, Reaction::show(dialog, Duration::from_millis(300)));
//! let driver = MockDriver::new(dom);
//! assert!(driver.events().is_empty());
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::driver::{Key, NodeState, PageDriver, Screenshot};
use crate::locator::{NodePath, PathStep, Selector};
use crate::result::{RegflowError, RegflowResult};
use crate::session::BrowserSession;

/// PNG file signature, returned as mock screenshot data
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Handle to a mock node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Recorded driver interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    /// Navigation
    Navigate(String),
    /// Click on a node
    Click(NodeId),
    /// Content cleared
    Clear(NodeId),
    /// Content selected
    SelectAll(NodeId),
    /// Text typed
    Type(NodeId, String),
    /// Key pressed
    Key(NodeId, Key),
    /// Session closed
    Close,
}

/// State change triggered by a click or key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// Attach to the DOM after a delay
    Attach(NodeId, Duration),
    /// Remove from the DOM after a delay
    Detach(NodeId, Duration),
    /// Become visible after a delay
    Show(NodeId, Duration),
    /// Become hidden after a delay
    Hide(NodeId, Duration),
    /// Set the checked state
    SetSelected(NodeId, bool),
}

impl Reaction {
    /// Show `node` after `delay`
    #[must_use]
    pub const fn show(node: NodeId, delay: Duration) -> Self {
        Self::Show(node, delay)
    }

    /// Hide `node` after `delay`
    #[must_use]
    pub const fn hide(node: NodeId, delay: Duration) -> Self {
        Self::Hide(node, delay)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Window {
    from: Option<Duration>,
    until: Option<Duration>,
}

impl Window {
    const fn always() -> Self {
        Self {
            from: Some(Duration::ZERO),
            until: None,
        }
    }

    fn contains(&self, t: Duration) -> bool {
        self.from.is_some_and(|from| t >= from) && self.until.map_or(true, |until| t < until)
    }
}

#[derive(Debug, Clone)]
struct MockNode {
    tag: String,
    selectors: Vec<Selector>,
    attributes: BTreeMap<String, String>,
    parent: Option<NodeId>,
    attached: Window,
    shown: Window,
    editable: bool,
    selected: bool,
    submits_on_enter: bool,
    value: String,
    selection: bool,
}

/// Builder returned by [`MockDom::node`]
#[derive(Debug)]
pub struct NodeBuilder<'a> {
    dom: &'a mut MockDom,
    node: MockNode,
}

impl NodeBuilder<'_> {
    /// Selector this node matches
    #[must_use]
    pub fn matches(mut self, selector: Selector) -> Self {
        self.node.selectors.push(selector);
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        let _ = self
            .node
            .attributes
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Nest under a parent
    #[must_use]
    pub const fn child_of(mut self, parent: NodeId) -> Self {
        self.node.parent = Some(parent);
        self
    }

    /// Accepts text input
    #[must_use]
    pub const fn editable(mut self) -> Self {
        self.node.editable = true;
        self
    }

    /// Checked checkbox
    #[must_use]
    pub const fn selected(mut self, selected: bool) -> Self {
        self.node.selected = selected;
        self
    }

    /// Initial content
    #[must_use]
    pub fn value(mut self, value: &str) -> Self {
        self.node.value = value.to_string();
        self
    }

    /// Enter sends the content and empties the field
    #[must_use]
    pub const fn submits_on_enter(mut self) -> Self {
        self.node.submits_on_enter = true;
        self
    }

    /// In the DOM but invisible until a reaction shows it
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.node.shown.from = None;
        self
    }

    /// Becomes visible after `delay`
    #[must_use]
    pub const fn shown_after(mut self, delay: Duration) -> Self {
        self.node.shown.from = Some(delay);
        self
    }

    /// Becomes invisible after `delay`
    #[must_use]
    pub const fn hidden_after(mut self, delay: Duration) -> Self {
        self.node.shown.until = Some(delay);
        self
    }

    /// Not in the DOM until a reaction attaches it
    #[must_use]
    pub const fn detached(mut self) -> Self {
        self.node.attached.from = None;
        self
    }

    /// Removed from the DOM after `delay`
    #[must_use]
    pub const fn detached_after(mut self, delay: Duration) -> Self {
        self.node.attached.until = Some(delay);
        self
    }

    /// Add the node to the DOM description
    pub fn insert(self) -> NodeId {
        self.dom.nodes.push(self.node);
        NodeId(self.dom.nodes.len() - 1)
    }
}

/// Description of a page: nodes plus click and key reactions
#[derive(Debug, Clone, Default)]
pub struct MockDom {
    nodes: Vec<MockNode>,
    on_click: HashMap<NodeId, Vec<Reaction>>,
    on_key: HashMap<(NodeId, Key), Vec<Reaction>>,
}

impl MockDom {
    /// Empty document
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start describing a node with the given tag
    pub fn node(&mut self, tag: &str) -> NodeBuilder<'_> {
        NodeBuilder {
            dom: self,
            node: MockNode {
                tag: tag.to_ascii_lowercase(),
                selectors: Vec::new(),
                attributes: BTreeMap::new(),
                parent: None,
                attached: Window::always(),
                shown: Window::always(),
                editable: false,
                selected: false,
                submits_on_enter: false,
                value: String::new(),
                selection: false,
            },
        }
    }

    /// React to clicks on `node`
    pub fn on_click(&mut self, node: NodeId, reaction: Reaction) {
        self.on_click.entry(node).or_default().push(reaction);
    }

    /// React to `key` pressed in `node`
    pub fn on_key(&mut self, node: NodeId, key: Key, reaction: Reaction) {
        self.on_key.entry((node, key)).or_default().push(reaction);
    }

    fn in_dom(&self, id: NodeId, t: Duration) -> bool {
        let node = &self.nodes[id.0];
        node.attached.contains(t) && node.parent.map_or(true, |p| self.in_dom(p, t))
    }

    fn visible(&self, id: NodeId, t: Duration) -> bool {
        let node = &self.nodes[id.0];
        self.in_dom(id, t)
            && node.shown.contains(t)
            && node.parent.map_or(true, |p| self.visible(p, t))
    }

    fn descends_from(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.nodes[id.0].parent;
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.nodes[p.0].parent;
        }
        false
    }

    fn matching<'s>(
        &'s self,
        selector: &'s Selector,
        t: Duration,
    ) -> impl Iterator<Item = NodeId> + 's {
        (0..self.nodes.len())
            .map(NodeId)
            .filter(move |&id| self.in_dom(id, t) && self.nodes[id.0].selectors.contains(selector))
    }

    fn resolve(&self, path: &NodePath, t: Duration) -> Option<NodeId> {
        let mut current = self.matching(&path.root, t).nth(path.index)?;
        for step in &path.steps {
            current = match step {
                PathStep::Parent => self.nodes[current.0]
                    .parent
                    .filter(|&p| self.in_dom(p, t))?,
                PathStep::Child(selector) => {
                    let base = current;
                    self.matching(selector, t)
                        .find(|&id| self.descends_from(id, base))?
                }
            };
        }
        Some(current)
    }

    fn react(&mut self, reactions: &[Reaction], t: Duration) {
        for reaction in reactions {
            match *reaction {
                Reaction::Attach(id, delay) => {
                    self.nodes[id.0].attached = Window {
                        from: Some(t + delay),
                        until: None,
                    };
                }
                Reaction::Detach(id, delay) => self.nodes[id.0].attached.until = Some(t + delay),
                Reaction::Show(id, delay) => {
                    self.nodes[id.0].shown = Window {
                        from: Some(t + delay),
                        until: None,
                    };
                }
                Reaction::Hide(id, delay) => self.nodes[id.0].shown.until = Some(t + delay),
                Reaction::SetSelected(id, selected) => self.nodes[id.0].selected = selected,
            }
        }
    }
}

#[derive(Debug)]
struct MockState {
    dom: MockDom,
    events: Vec<MockEvent>,
    sent: Vec<String>,
    current_url: String,
    closed: bool,
}

/// [`PageDriver`] over a [`MockDom`], recording every interaction
#[derive(Debug)]
pub struct MockDriver {
    epoch: Instant,
    state: Mutex<MockState>,
}

impl MockDriver {
    /// Create a driver; node time windows start now
    #[must_use]
    pub fn new(dom: MockDom) -> Self {
        Self {
            epoch: Instant::now(),
            state: Mutex::new(MockState {
                dom,
                events: Vec::new(),
                sent: Vec::new(),
                current_url: String::from("about:blank"),
                closed: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    /// Recorded interactions, oldest first
    #[must_use]
    pub fn events(&self) -> Vec<MockEvent> {
        self.lock().events.clone()
    }

    /// Nodes that received clicks, oldest first
    #[must_use]
    pub fn clicks(&self) -> Vec<NodeId> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                MockEvent::Click(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Current content of a node
    #[must_use]
    pub fn value(&self, node: NodeId) -> String {
        self.lock().dom.nodes[node.0].value.clone()
    }

    /// Checked state of a node
    #[must_use]
    pub fn is_selected(&self, node: NodeId) -> bool {
        self.lock().dom.nodes[node.0].selected
    }

    /// Messages sent with Enter from `submits_on_enter` nodes
    #[must_use]
    pub fn sent_messages(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    /// Whether `close` was called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Resolve a path and check the session is open
    fn target(
        &self,
        state: &MockState,
        path: &NodePath,
        action: &str,
    ) -> RegflowResult<NodeId> {
        if state.closed {
            return Err(RegflowError::driver("session closed"));
        }
        state
            .dom
            .resolve(path, self.now())
            .ok_or_else(|| RegflowError::StaleElement {
                role: path.to_string(),
                action: action.to_string(),
            })
    }

    fn interactable(&self, state: &MockState, path: &NodePath, action: &str) -> RegflowResult<NodeId> {
        let id = self.target(state, path, action)?;
        if state.dom.visible(id, self.now()) {
            Ok(id)
        } else {
            Err(RegflowError::driver(format!(
                "{action} on {path}: element not interactable"
            )))
        }
    }

    fn ensure_open(state: &MockState) -> RegflowResult<()> {
        if state.closed {
            Err(RegflowError::driver("session closed"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn navigate(&self, url: &str) -> RegflowResult<()> {
        let mut state = self.lock();
        Self::ensure_open(&state)?;
        state.events.push(MockEvent::Navigate(url.to_string()));
        state.current_url = url.to_string();
        Ok(())
    }

    async fn count(&self, selector: &Selector) -> RegflowResult<usize> {
        let state = self.lock();
        Self::ensure_open(&state)?;
        Ok(state.dom.matching(selector, self.now()).count())
    }

    async fn probe(&self, path: &NodePath) -> RegflowResult<Option<NodeState>> {
        let state = self.lock();
        Self::ensure_open(&state)?;
        let t = self.now();
        Ok(state.dom.resolve(path, t).map(|id| {
            let node = &state.dom.nodes[id.0];
            let visible = state.dom.visible(id, t);
            NodeState {
                tag: node.tag.clone(),
                visible,
                editable: visible && node.editable,
                selected: node.selected,
            }
        }))
    }

    async fn attribute(&self, path: &NodePath, name: &str) -> RegflowResult<Option<String>> {
        let state = self.lock();
        Self::ensure_open(&state)?;
        Ok(state
            .dom
            .resolve(path, self.now())
            .and_then(|id| state.dom.nodes[id.0].attributes.get(name).cloned()))
    }

    async fn field_value(&self, path: &NodePath) -> RegflowResult<Option<String>> {
        let state = self.lock();
        Self::ensure_open(&state)?;
        Ok(state
            .dom
            .resolve(path, self.now())
            .map(|id| state.dom.nodes[id.0].value.clone()))
    }

    async fn click(&self, path: &NodePath) -> RegflowResult<()> {
        let mut state = self.lock();
        let id = self.interactable(&state, path, "click")?;
        state.events.push(MockEvent::Click(id));
        let reactions = state.dom.on_click.get(&id).cloned().unwrap_or_default();
        state.dom.react(&reactions, self.now());
        Ok(())
    }

    async fn clear(&self, path: &NodePath) -> RegflowResult<()> {
        let mut state = self.lock();
        let id = self.interactable(&state, path, "clear")?;
        state.events.push(MockEvent::Clear(id));
        let node = &mut state.dom.nodes[id.0];
        node.value.clear();
        node.selection = false;
        Ok(())
    }

    async fn select_all(&self, path: &NodePath) -> RegflowResult<()> {
        let mut state = self.lock();
        let id = self.interactable(&state, path, "select-all")?;
        state.events.push(MockEvent::SelectAll(id));
        state.dom.nodes[id.0].selection = true;
        Ok(())
    }

    async fn type_text(&self, path: &NodePath, text: &str) -> RegflowResult<()> {
        let mut state = self.lock();
        let id = self.interactable(&state, path, "type")?;
        state.events.push(MockEvent::Type(id, text.to_string()));
        let node = &mut state.dom.nodes[id.0];
        if std::mem::take(&mut node.selection) {
            node.value = text.to_string();
        } else {
            node.value.push_str(text);
        }
        Ok(())
    }

    async fn press_key(&self, path: &NodePath, key: Key) -> RegflowResult<()> {
        let mut state = self.lock();
        let id = self.interactable(&state, path, "key press")?;
        state.events.push(MockEvent::Key(id, key));
        let node = &mut state.dom.nodes[id.0];
        if key == Key::Enter && node.submits_on_enter {
            let message = std::mem::take(&mut node.value);
            state.sent.push(message);
        }
        let reactions = state.dom.on_key.get(&(id, key)).cloned().unwrap_or_default();
        state.dom.react(&reactions, self.now());
        Ok(())
    }

    async fn current_url(&self) -> RegflowResult<String> {
        Ok(self.lock().current_url.clone())
    }

    async fn screenshot(&self) -> RegflowResult<Screenshot> {
        let state = self.lock();
        Self::ensure_open(&state)?;
        Ok(Screenshot::new(PNG_SIGNATURE.to_vec()))
    }

    async fn close(&self) -> RegflowResult<()> {
        let mut state = self.lock();
        state.events.push(MockEvent::Close);
        state.closed = true;
        Ok(())
    }
}

/// [`BrowserSession`] backed by a [`MockDriver`]
#[derive(Debug)]
pub struct MockSession {
    driver: MockDriver,
}

impl MockSession {
    /// Session over a mock document
    #[must_use]
    pub fn new(dom: MockDom) -> Self {
        Self {
            driver: MockDriver::new(dom),
        }
    }

    /// The mock driver, for assertions
    #[must_use]
    pub const fn mock(&self) -> &MockDriver {
        &self.driver
    }
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn open(&mut self, url: &str) -> RegflowResult<()> {
        self.driver.navigate(url).await
    }

    fn driver(&self) -> &dyn PageDriver {
        &self.driver
    }

    async fn close(&mut self) -> RegflowResult<()> {
        self.driver.close().await
    }
}
