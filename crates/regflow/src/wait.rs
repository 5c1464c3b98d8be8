//! Wait Mechanisms
//!
//! Polling synchronization against a single-page app whose DOM mutates after
//! every user action.
//!
//! - **Typed timeouts**: a never-found element is a `LocatorTimeout`, a found
//!   element in the wrong state is a `ConditionTimeout`
//! - **Act on fresh state**: [`Waiter::perform`] applies a side effect right
//!   after the predicate held and re-awaits when the node went stale, inside
//!   the same budget
//! - **External events**: human-gated waits report `ExternalEventTimeout`

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use crate::driver::{apply_effect, Effect, NodeState, PageDriver};
use crate::locator::{resolve_once, LogicalElement, NodePath, Resolved};
use crate::result::{RegflowError, RegflowResult};

/// Default timeout for wait operations (15 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 15_000;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// State a located element must reach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Rendered and visible
    Visible,
    /// Hidden or gone from the DOM
    NotVisible,
    /// Visible and accepting text input
    Editable,
    /// Present in the DOM, visible or not
    Exists,
}

impl Predicate {
    /// Check a probed state; `None` means the element did not resolve
    #[must_use]
    pub fn holds(self, state: Option<&NodeState>) -> bool {
        match (self, state) {
            (Self::NotVisible, None) => true,
            (_, None) => false,
            (Self::Visible, Some(s)) => s.visible,
            (Self::NotVisible, Some(s)) => !s.visible,
            (Self::Editable, Some(s)) => s.visible && s.editable,
            (Self::Exists, Some(_)) => true,
        }
    }

    /// Predicate name used in messages
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::NotVisible => "not visible",
            Self::Editable => "editable",
            Self::Exists => "present",
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// An element, the state it must reach, and how long to wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitCondition {
    /// Target element
    pub element: LogicalElement,
    /// Required state
    pub predicate: Predicate,
    /// Budget for the whole wait
    pub timeout: Duration,
}

impl WaitCondition {
    /// Create a condition
    #[must_use]
    pub const fn new(element: LogicalElement, predicate: Predicate, timeout: Duration) -> Self {
        Self {
            element,
            predicate,
            timeout,
        }
    }
}

/// Result of a wait operation
#[derive(Debug, Clone)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Node the predicate held on; `None` for a satisfied `NotVisible` on an absent node
    pub resolved: Option<Resolved>,
}

impl WaitResult {
    /// The resolved node, required for positive predicates
    pub fn into_resolved(self, role: &str) -> RegflowResult<Resolved> {
        self.resolved.ok_or_else(|| RegflowError::StaleElement {
            role: role.to_string(),
            action: "use".to_string(),
        })
    }
}

/// Polls a driver until a [`WaitCondition`] holds
#[derive(Clone, Copy)]
pub struct Waiter<'d> {
    driver: &'d dyn PageDriver,
    poll_interval: Duration,
}

impl fmt::Debug for Waiter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiter")
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl<'d> Waiter<'d> {
    /// Create a waiter over a driver
    #[must_use]
    pub fn new(driver: &'d dyn PageDriver, options: WaitOptions) -> Self {
        Self {
            driver,
            poll_interval: options.poll_interval(),
        }
    }

    /// The underlying driver
    #[must_use]
    pub fn driver(&self) -> &'d dyn PageDriver {
        self.driver
    }

    /// Block until the condition holds or its timeout elapses
    pub async fn await_condition(&self, condition: &WaitCondition) -> RegflowResult<WaitResult> {
        self.await_within(condition, condition.timeout).await
    }

    /// Wait until the element is present; never returns an empty handle
    pub async fn resolve(
        &self,
        element: &LogicalElement,
        timeout: Duration,
    ) -> RegflowResult<Resolved> {
        let condition = WaitCondition::new(element.clone(), Predicate::Exists, timeout);
        self.await_condition(&condition)
            .await?
            .into_resolved(element.role())
    }

    async fn await_within(
        &self,
        condition: &WaitCondition,
        budget: Duration,
    ) -> RegflowResult<WaitResult> {
        let start = Instant::now();
        let role = condition.element.role();
        let mut located = false;

        loop {
            let found = resolve_once(self.driver, &condition.element).await?;
            located |= found.is_some();
            if condition.predicate.holds(found.as_ref().map(|r| &r.state)) {
                let elapsed = start.elapsed();
                debug!(role, predicate = %condition.predicate, ?elapsed, "condition met");
                return Ok(WaitResult {
                    elapsed,
                    resolved: found,
                });
            }

            let elapsed = start.elapsed();
            if elapsed >= budget {
                debug!(role, predicate = %condition.predicate, located, ?elapsed, "wait timed out");
                return Err(
                    if located || condition.predicate == Predicate::NotVisible {
                        RegflowError::ConditionTimeout {
                            role: role.to_string(),
                            predicate: condition.predicate,
                            elapsed,
                        }
                    } else {
                        RegflowError::LocatorTimeout {
                            role: role.to_string(),
                            elapsed,
                        }
                    },
                );
            }
            tokio::time::sleep(self.poll_interval.min(budget - elapsed)).await;
        }
    }

    /// Wait on an out-of-band actor; timeouts become `ExternalEventTimeout`
    pub async fn await_external(
        &self,
        event: &str,
        condition: &WaitCondition,
    ) -> RegflowResult<WaitResult> {
        self.await_condition(condition).await.map_err(|err| match err {
            RegflowError::ConditionTimeout { elapsed, .. }
            | RegflowError::LocatorTimeout { elapsed, .. } => RegflowError::ExternalEventTimeout {
                event: event.to_string(),
                elapsed,
            },
            other => other,
        })
    }

    /// Await the condition, then apply `effects` to the node chosen by `target`.
    ///
    /// If the node is gone when the first effect lands, the condition is
    /// awaited again with whatever budget remains. Later effects are not
    /// retried, so partial input is never replayed.
    pub async fn perform<F>(
        &self,
        condition: &WaitCondition,
        effects: &[Effect],
        target: F,
    ) -> RegflowResult<Resolved>
    where
        F: Fn(&Resolved) -> NodePath + Send + Sync,
    {
        let start = Instant::now();
        loop {
            let budget = condition.timeout.saturating_sub(start.elapsed());
            let resolved = self
                .await_within(condition, budget)
                .await?
                .into_resolved(condition.element.role())?;
            let path = target(&resolved);

            match self.apply_all(&path, effects).await {
                Ok(()) => return Ok(resolved),
                Err((0, RegflowError::StaleElement { .. })) if start.elapsed() < condition.timeout => {
                    debug!(role = %resolved.role, %path, "node went stale, awaiting again");
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err((_, RegflowError::StaleElement { action, .. })) => {
                    return Err(RegflowError::StaleElement {
                        role: resolved.role,
                        action,
                    });
                }
                Err((_, err)) => return Err(err),
            }
        }
    }

    async fn apply_all(
        &self,
        path: &NodePath,
        effects: &[Effect],
    ) -> Result<(), (usize, RegflowError)> {
        for (i, effect) in effects.iter().enumerate() {
            apply_effect(self.driver, path, effect)
                .await
                .map_err(|err| (i, err))?;
        }
        Ok(())
    }
}
