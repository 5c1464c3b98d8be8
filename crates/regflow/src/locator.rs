//! Locator abstraction for element selection.
//!
//! A [`LogicalElement`] names a UI role and carries an ordered list of
//! candidate selectors. The live web client renders several markup variants
//! for the same control, so candidates are tried in priority order and the
//! first one with a live match wins.
//!
//! # Design Philosophy
//!
//! - **Strict Selection**: `Unique` elements only resolve to exactly one node
//! - **Fallback Chains**: markup variants are alternate candidates, not `or` soup
//! - **Structured Paths**: parent/child hops are data, so every driver can
//!   interpret them

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::{NodeState, PageDriver};
use crate::result::RegflowResult;

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    /// XPath expression
    XPath(String),
    /// CSS selector
    Css(String),
}

impl Selector {
    /// Create an XPath selector
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Raw expression text
    #[must_use]
    pub fn expression(&self) -> &str {
        match self {
            Self::XPath(s) | Self::Css(s) => s,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::XPath(s) => write!(f, "xpath={s}"),
            Self::Css(s) => write!(f, "css={s}"),
        }
    }
}

/// Quote text as an XPath string literal.
///
/// XPath 1.0 has no escape sequences, so text containing both quote kinds is
/// split and joined with `concat()`.
#[must_use]
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{text}'");
    }
    if !text.contains('"') {
        return format!("\"{text}\"");
    }
    let parts: Vec<String> = text
        .split('\'')
        .map(|part| format!("'{part}'"))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// One hop relative to a resolved node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// The node's parent element
    Parent,
    /// First descendant matching the selector, evaluated with the node as context
    Child(Selector),
}

/// Address of a live node: the n-th match of a root selector plus relative hops
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodePath {
    /// Root selector, evaluated against the document
    pub root: Selector,
    /// Index among the root selector's matches
    pub index: usize,
    /// Hops applied after the root
    pub steps: Vec<PathStep>,
}

impl NodePath {
    /// Path to the first match of a selector
    #[must_use]
    pub fn new(root: Selector) -> Self {
        Self::nth(root, 0)
    }

    /// Path to the n-th match of a selector
    #[must_use]
    pub fn nth(root: Selector, index: usize) -> Self {
        Self {
            root,
            index,
            steps: Vec::new(),
        }
    }

    /// The parent of this node
    #[must_use]
    pub fn parent(&self) -> Self {
        self.with_step(PathStep::Parent)
    }

    /// First descendant matching `selector`
    #[must_use]
    pub fn child(&self, selector: Selector) -> Self {
        self.with_step(PathStep::Child(selector))
    }

    fn with_step(&self, step: PathStep) -> Self {
        let mut path = self.clone();
        path.steps.push(step);
        path
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.root, self.index)?;
        for step in &self.steps {
            match step {
                PathStep::Parent => write!(f, "/..")?,
                PathStep::Child(sel) => write!(f, " >> {sel}")?,
            }
        }
        Ok(())
    }
}

/// How many live matches a candidate may have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Exactly one live node
    #[default]
    Unique,
    /// At least one; the first in document order is used
    First,
}

/// A named UI target independent of its concrete markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalElement {
    role: String,
    candidates: Vec<Selector>,
    mode: MatchMode,
}

impl LogicalElement {
    /// Create an element with a single candidate
    #[must_use]
    pub fn new(role: impl Into<String>, selector: Selector) -> Self {
        Self {
            role: role.into(),
            candidates: vec![selector],
            mode: MatchMode::Unique,
        }
    }

    /// Add a lower-priority candidate
    #[must_use]
    pub fn or(mut self, selector: Selector) -> Self {
        self.candidates.push(selector);
        self
    }

    /// Accept several matches and use the first
    #[must_use]
    pub const fn first_match(mut self) -> Self {
        self.mode = MatchMode::First;
        self
    }

    /// Role label
    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Candidates in priority order
    #[must_use]
    pub fn candidates(&self) -> &[Selector] {
        &self.candidates
    }

    /// Match mode
    #[must_use]
    pub const fn mode(&self) -> MatchMode {
        self.mode
    }
}

/// A logical element bound to one live node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Role of the logical element
    pub role: String,
    /// Address of the node
    pub path: NodePath,
    /// Index of the candidate that matched
    pub candidate: usize,
    /// State observed when the node was resolved
    pub state: NodeState,
}

/// Try each candidate once, in priority order.
///
/// Returns `None` when no candidate currently has an acceptable match. A
/// `Unique` candidate with several matches is skipped, not truncated.
pub async fn resolve_once(
    driver: &dyn PageDriver,
    element: &LogicalElement,
) -> RegflowResult<Option<Resolved>> {
    for (candidate, selector) in element.candidates.iter().enumerate() {
        let matches = driver.count(selector).await?;
        let acceptable = match element.mode {
            MatchMode::Unique => matches == 1,
            MatchMode::First => matches >= 1,
        };
        if !acceptable {
            if matches > 1 {
                debug!(role = %element.role, %selector, matches, "ambiguous candidate skipped");
            }
            continue;
        }
        let path = NodePath::new(selector.clone());
        if let Some(state) = driver.probe(&path).await? {
            return Ok(Some(Resolved {
                role: element.role.clone(),
                path,
                candidate,
                state,
            }));
        }
    }
    Ok(None)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mock::{MockDom, MockDriver};

    mod xpath_literal_tests {
        use super::*;

        #[test]
        fn test_plain_text() {
            assert_eq!(xpath_literal("Русский "), "'Русский '");
        }

        #[test]
        fn test_single_quote() {
            assert_eq!(xpath_literal("it's"), "\"it's\"");
        }

        #[test]
        fn test_both_quotes() {
            assert_eq!(
                xpath_literal(r#"say "it's""#),
                r#"concat('say "it', "'", 's"')"#
            );
        }
    }

    mod node_path_tests {
        use super::*;

        #[test]
        fn test_parent_and_child_display() {
            let path = NodePath::new(Selector::xpath("//span"))
                .parent()
                .child(Selector::xpath("./div"));
            assert_eq!(path.to_string(), "xpath=//span[0]/.. >> xpath=./div");
        }

        #[test]
        fn test_steps_do_not_mutate_original() {
            let path = NodePath::new(Selector::css("button"));
            let parent = path.parent();
            assert!(path.steps.is_empty());
            assert_eq!(parent.steps, vec![PathStep::Parent]);
        }
    }

    mod resolve_tests {
        use super::*;

        #[tokio::test]
        async fn test_first_candidate_wins() {
            let mut dom = MockDom::new();
            dom.node("input").matches(Selector::xpath("//a")).insert();
            dom.node("div").matches(Selector::xpath("//b")).insert();
            let driver = MockDriver::new(dom);

            let element = LogicalElement::new("field", Selector::xpath("//a"))
                .or(Selector::xpath("//b"));
            let resolved = resolve_once(&driver, &element).await.unwrap().unwrap();
            assert_eq!(resolved.candidate, 0);
            assert_eq!(resolved.state.tag, "input");
        }

        #[tokio::test]
        async fn test_falls_back_to_second_variant() {
            let mut dom = MockDom::new();
            dom.node("div").matches(Selector::xpath("//b")).insert();
            let driver = MockDriver::new(dom);

            let element = LogicalElement::new("field", Selector::xpath("//a"))
                .or(Selector::xpath("//b"));
            let resolved = resolve_once(&driver, &element).await.unwrap().unwrap();
            assert_eq!(resolved.candidate, 1);
            assert_eq!(resolved.path, NodePath::new(Selector::xpath("//b")));
        }

        #[tokio::test]
        async fn test_unique_rejects_ambiguous_match() {
            let mut dom = MockDom::new();
            dom.node("div").matches(Selector::xpath("//row")).insert();
            dom.node("div").matches(Selector::xpath("//row")).insert();
            let driver = MockDriver::new(dom);

            let strict = LogicalElement::new("row", Selector::xpath("//row"));
            assert!(resolve_once(&driver, &strict).await.unwrap().is_none());

            let first = strict.first_match();
            let resolved = resolve_once(&driver, &first).await.unwrap().unwrap();
            assert_eq!(resolved.path.index, 0);
        }

        #[tokio::test]
        async fn test_nothing_matches() {
            let driver = MockDriver::new(MockDom::new());
            let element = LogicalElement::new("ghost", Selector::css(".ghost"));
            assert!(resolve_once(&driver, &element).await.unwrap().is_none());
        }
    }
}
