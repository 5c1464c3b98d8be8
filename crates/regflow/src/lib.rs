//! Regflow: page-object regression flow for a messaging web client.
//!
//! Drives the bot registration journey end to end: log in by phone through a
//! one-time code and cloud password, open the bot's chat, walk the
//! registration dialogue with inline buttons and free-text answers, then
//! delete the chat history.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    REGFLOW Architecture                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Scenario   │    │ Page       │    │ Waiter +   │            │
//! │   │ (steps)    │───►│ Objects    │───►│ Locator    │            │
//! │   │            │    │            │    │            │            │
//! │   └────────────┘    └────────────┘    └─────┬──────┘            │
//! │         │                                   │                   │
//! │         ▼                                   ▼                   │
//! │   ┌────────────┐                     ┌────────────┐             │
//! │   │ Reporter   │                     │ PageDriver │             │
//! │   │ (tracing,  │                     │ (CDP or    │             │
//! │   │  JSON)     │                     │  mock DOM) │             │
//! │   └────────────┘                     └────────────┘             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use regflow::{run_in_session, MockDom, MockSession, Scenario, Settings, TracingReporter};
//!
//! # async fn demo() -> regflow::RegflowResult<()> {
//! let settings = Settings::load(std::path::Path::new("regflow.yaml"))?;
//! let scenario = Scenario::registration(&settings);
//! let mut session = MockSession::new(MockDom::new());
//! let summary = run_in_session(&mut session, &settings, &scenario, TracingReporter).await?;
//! println!("{} steps passed", summary.steps);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod actions;

/// Real browser control over the Chrome DevTools Protocol
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::cast_possible_truncation
)]
pub mod browser;

mod catalog;

#[allow(clippy::missing_errors_doc)]
mod config;

#[allow(clippy::missing_errors_doc)]
mod driver;

#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod locator;

/// In-memory DOM and driver for browserless tests
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_panics_doc,
    clippy::indexing_slicing
)]
pub mod mock;

/// Page objects, one per screen of the web client
#[allow(clippy::missing_errors_doc)]
pub mod pages;

#[allow(
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::module_name_repetitions
)]
mod reporter;

mod result;

#[allow(clippy::missing_errors_doc, clippy::too_many_lines)]
mod scenario;

#[allow(clippy::missing_errors_doc)]
mod session;

#[allow(clippy::missing_errors_doc)]
mod variant;

#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod wait;

pub use actions::{click_target, Ui, WRAPPER_TAGS};
pub use browser::BrowserConfig;
#[cfg(feature = "browser")]
pub use browser::{CdpDriver, CdpSession};
pub use catalog::{in_chat_button, locate, Role};
pub use config::{
    PhoneNumber, Settings, Timeouts, ENV_BASE_URL, ENV_BOT_USERNAME, ENV_NUMBER_PHONE,
    ENV_PASSWORD,
};
pub use driver::{apply_effect, Effect, Key, NodeState, PageDriver, Screenshot};
pub use locator::{
    resolve_once, xpath_literal, LogicalElement, MatchMode, NodePath, PathStep, Resolved,
    Selector,
};
pub use mock::{MockDom, MockDriver, MockEvent, MockSession, NodeId, Reaction};
pub use pages::{
    ConversationPage, LoginPage, MainChatListPage, PageObject, ScreenKind, StartPage,
};
pub use reporter::{JsonReporter, StepRecord, StepReporter, StepStatus, TracingReporter};
pub use result::{RegflowError, RegflowResult};
pub use scenario::{substitute, FlowStep, Orchestrator, RunSummary, Scenario, Screen};
pub use session::{run_in_session, BrowserSession};
pub use variant::{InputVariant, NATIVE_ID, RICH_TEXT_CLASS, RICH_TEXT_DIGITS};
pub use wait::{
    Predicate, WaitCondition, WaitOptions, WaitResult, Waiter, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_WAIT_TIMEOUT_MS,
};
