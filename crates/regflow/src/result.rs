//! Result and error types for regflow.

use std::time::Duration;

use thiserror::Error;

use crate::wait::Predicate;

/// Result type for regflow operations
pub type RegflowResult<T> = Result<T, RegflowError>;

/// Errors that can occur while driving the web client
#[derive(Debug, Error)]
pub enum RegflowError {
    /// No candidate selector resolved within the timeout
    #[error("Locator timeout: '{role}' not found after {}ms", elapsed.as_millis())]
    LocatorTimeout {
        /// Role of the logical element
        role: String,
        /// Time spent waiting
        elapsed: Duration,
    },

    /// Element was located but never reached the required state
    #[error("Condition timeout: '{role}' never became {predicate} after {}ms", elapsed.as_millis())]
    ConditionTimeout {
        /// Role of the logical element
        role: String,
        /// Predicate that did not hold
        predicate: Predicate,
        /// Time spent waiting
        elapsed: Duration,
    },

    /// Discriminating attributes matched no known DOM variant
    #[error("Unexpected variant for '{role}': {observed}")]
    UnexpectedVariant {
        /// Role of the logical element
        role: String,
        /// What was observed on the node
        observed: String,
    },

    /// An out-of-band (human) action did not happen in time
    #[error("Gave up waiting for {event} after {}s", elapsed.as_secs())]
    ExternalEventTimeout {
        /// Name of the external event
        event: String,
        /// Time spent waiting
        elapsed: Duration,
    },

    /// Node disappeared between observation and action
    #[error("Element '{role}' went stale before {action}")]
    StaleElement {
        /// Role of the logical element
        role: String,
        /// Action that was attempted
        action: String,
    },

    /// Scenario step is not legal on the current screen
    #[error("Step {index} ({action}) cannot run on the {screen} screen")]
    InvalidTransition {
        /// Step index (0-based)
        index: usize,
        /// Action name
        action: String,
        /// Screen the flow was on
        screen: String,
    },

    /// A scenario step failed
    #[error("Step {} '{label}' failed: {source}", index + 1)]
    StepFailed {
        /// Step index (0-based)
        index: usize,
        /// Human-readable step label
        label: String,
        /// Underlying failure
        #[source]
        source: Box<RegflowError>,
    },

    /// Low-level driver failure
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Settings or scenario definition error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl RegflowError {
    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Innermost error, looking through `StepFailed`
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::StepFailed { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the failure is a timeout on a human-mediated event
    #[must_use]
    pub fn is_external(&self) -> bool {
        matches!(self.root(), Self::ExternalEventTimeout { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_timeout_message() {
        let err = RegflowError::LocatorTimeout {
            role: "phone input".to_string(),
            elapsed: Duration::from_millis(1500),
        };
        let msg = err.to_string();
        assert!(msg.contains("phone input"));
        assert!(msg.contains("1500ms"));
    }

    #[test]
    fn test_condition_timeout_names_predicate() {
        let err = RegflowError::ConditionTimeout {
            role: "password input".to_string(),
            predicate: Predicate::Editable,
            elapsed: Duration::from_secs(15),
        };
        assert!(err.to_string().contains("editable"));
    }

    #[test]
    fn test_step_failed_root() {
        let inner = RegflowError::ExternalEventTimeout {
            event: "one-time code entry".to_string(),
            elapsed: Duration::from_secs(180),
        };
        let err = RegflowError::StepFailed {
            index: 2,
            label: "Enter code".to_string(),
            source: Box::new(inner),
        };
        assert!(err.to_string().starts_with("Step 3 'Enter code' failed"));
        assert!(err.is_external());
        assert!(matches!(
            err.root(),
            RegflowError::ExternalEventTimeout { .. }
        ));
    }

    #[test]
    fn test_automation_failure_is_not_external() {
        let err = RegflowError::driver("socket closed");
        assert!(!err.is_external());
        assert!(err.to_string().contains("socket closed"));
    }
}
