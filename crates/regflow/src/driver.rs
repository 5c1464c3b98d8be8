//! PageDriver - the browser capability the page objects depend on.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  PageDriver (async trait)                                    │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────┐        ┌─────────────────────────┐  │
//! │  │  CdpDriver          │        │  MockDriver             │  │
//! │  │  chromiumoxide      │        │  in-memory DOM          │  │
//! │  │  (feature browser)  │        │  (unit + flow tests)    │  │
//! │  └─────────────────────┘        └─────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Drivers only see [`NodePath`]s. Waiting, candidate fallback and variant
//! detection live above this seam, so a fake DOM exercises the same code paths
//! as a real browser.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::locator::{NodePath, Selector};
use crate::result::RegflowResult;

/// Observed state of a live node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeState {
    /// Lower-case tag name
    pub tag: String,
    /// Rendered with a non-empty box
    pub visible: bool,
    /// Accepts text input (focusable, not disabled or read-only)
    pub editable: bool,
    /// Checked/selected (checkboxes, options)
    pub selected: bool,
}

impl NodeState {
    /// Visible, non-editable node with the given tag
    #[must_use]
    pub fn visible(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            visible: true,
            editable: false,
            selected: false,
        }
    }
}

/// Keys sent as real key events rather than inserted text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Enter / Return
    Enter,
}

impl Key {
    /// DOM `KeyboardEvent.key`
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Enter => "Enter",
        }
    }

    /// DOM `KeyboardEvent.code`
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Enter => "Enter",
        }
    }

    /// Windows virtual key code
    #[must_use]
    pub const fn key_code(self) -> i64 {
        match self {
            Self::Enter => 13,
        }
    }

    /// Text produced by the key press
    #[must_use]
    pub const fn text(self) -> &'static str {
        match self {
            Self::Enter => "\r",
        }
    }
}

/// A side effect applied to a resolved node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Mouse click at the node's center
    Click,
    /// Remove current content
    Clear,
    /// Select all content so the next input overwrites it
    SelectAll,
    /// Insert text at the caret
    Type(String),
    /// Press a key
    Press(Key),
}

impl Effect {
    /// Short name for logs and stale-element errors
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Clear => "clear",
            Self::SelectAll => "select-all",
            Self::Type(_) => "type",
            Self::Press(_) => "key press",
        }
    }
}

/// Screenshot data with metadata
#[derive(Debug, Clone)]
pub struct Screenshot {
    /// Raw PNG data
    pub data: Vec<u8>,
    /// Timestamp when screenshot was taken
    pub timestamp: std::time::SystemTime,
}

impl Screenshot {
    /// Create a new screenshot
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            timestamp: std::time::SystemTime::now(),
        }
    }

    /// Get the size in bytes
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Check if screenshot is valid (has data)
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.data.is_empty()
    }
}

/// Browser capability used by the wait policy and page objects.
///
/// Every method is a single, non-waiting DOM operation. A path that no longer
/// resolves yields `RegflowError::StaleElement` from the mutating methods and
/// `None` from the query methods.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to URL and wait for the load event
    async fn navigate(&self, url: &str) -> RegflowResult<()>;

    /// Number of live nodes matching a selector
    async fn count(&self, selector: &Selector) -> RegflowResult<usize>;

    /// State of the node at `path`, `None` when it does not resolve
    async fn probe(&self, path: &NodePath) -> RegflowResult<Option<NodeState>>;

    /// Attribute value, `None` when the node or attribute is missing
    async fn attribute(&self, path: &NodePath, name: &str) -> RegflowResult<Option<String>>;

    /// Live content of the node: `value` of form controls, text otherwise
    async fn field_value(&self, path: &NodePath) -> RegflowResult<Option<String>>;

    /// Click the node
    async fn click(&self, path: &NodePath) -> RegflowResult<()>;

    /// Remove the node's content
    async fn clear(&self, path: &NodePath) -> RegflowResult<()>;

    /// Select all content of the node
    async fn select_all(&self, path: &NodePath) -> RegflowResult<()>;

    /// Type text into the node (replaces a selection, otherwise appends)
    async fn type_text(&self, path: &NodePath, text: &str) -> RegflowResult<()>;

    /// Press a key with the node focused
    async fn press_key(&self, path: &NodePath, key: Key) -> RegflowResult<()>;

    /// Current page URL
    async fn current_url(&self) -> RegflowResult<String>;

    /// Capture the viewport
    async fn screenshot(&self) -> RegflowResult<Screenshot>;

    /// Close the page and browser
    async fn close(&self) -> RegflowResult<()>;
}

/// Apply an [`Effect`] through the driver
pub async fn apply_effect(
    driver: &dyn PageDriver,
    path: &NodePath,
    effect: &Effect,
) -> RegflowResult<()> {
    match effect {
        Effect::Click => driver.click(path).await,
        Effect::Clear => driver.clear(path).await,
        Effect::SelectAll => driver.select_all(path).await,
        Effect::Type(text) => driver.type_text(path, text).await,
        Effect::Press(key) => driver.press_key(path, *key).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_key_codes() {
        assert_eq!(Key::Enter.key(), "Enter");
        assert_eq!(Key::Enter.code(), "Enter");
        assert_eq!(Key::Enter.key_code(), 13);
        assert_eq!(Key::Enter.text(), "\r");
    }

    #[test]
    fn test_effect_names() {
        assert_eq!(Effect::Click.name(), "click");
        assert_eq!(Effect::Type("x".into()).name(), "type");
        assert_eq!(Effect::Press(Key::Enter).name(), "key press");
    }

    #[test]
    fn test_screenshot_is_valid() {
        assert!(Screenshot::new(vec![0x89, 0x50, 0x4E, 0x47]).is_valid());
        assert!(!Screenshot::new(vec![]).is_valid());
        assert_eq!(Screenshot::new(vec![0; 1024]).size_bytes(), 1024);
    }

    #[test]
    fn test_node_state_deserializes_from_probe_json() {
        let json = r#"{"tag":"span","visible":true,"editable":false,"selected":false}"#;
        let state: NodeState = serde_json::from_str(json).unwrap();
        assert_eq!(state, NodeState::visible("span"));
    }
}
