//! Scenarios: ordered page-object actions and the orchestrator that runs them.
//!
//! A [`Scenario`] is data. It can be built in code, loaded from YAML with
//! `${key}` placeholders, and checked against the screen state machine before a
//! browser is started. The [`Orchestrator`] walks the steps once, in order,
//! creating the page object each step needs and stopping at the first failure.
//!
//! ```yaml
//! name: registration
//! steps:
//!   - action: start_by_phone
//!   - action: input_number
//!     number: ${number.phone}
//!   - action: input_code
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::actions::Ui;
use crate::config::Settings;
use crate::pages::{
    ConversationPage, LoginPage, MainChatListPage, PageObject, ScreenKind, StartPage,
};
use crate::reporter::StepReporter;
use crate::result::{RegflowError, RegflowResult};

const PLACEHOLDER: &str = r"\$\{([A-Za-z0-9_.]+)\}";

/// One page-object action with its literal arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FlowStep {
    /// Start screen: continue in Russian, log in by phone
    StartByPhone,
    /// Login: enter the phone number
    InputNumber {
        /// Phone number
        number: String,
    },
    /// Login: wait for a human to enter the one-time code
    InputCode,
    /// Login: enter the cloud password
    InputPassword {
        /// Password, never shown in labels
        password: String,
    },
    /// Chat list: open the chat found by tag
    FindByTag {
        /// Bot tag
        tag: String,
    },
    /// Conversation: press START
    StartBot,
    /// Conversation: click an inline button by exact label
    ClickButtonInChat {
        /// Button label
        label: String,
    },
    /// Conversation: send a message
    SendMessage {
        /// Message text
        text: String,
    },
    /// Conversation: delete the chat history
    DeleteHistory,
}

impl FlowStep {
    /// Action name as written in scenario files
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::StartByPhone => "start_by_phone",
            Self::InputNumber { .. } => "input_number",
            Self::InputCode => "input_code",
            Self::InputPassword { .. } => "input_password",
            Self::FindByTag { .. } => "find_by_tag",
            Self::StartBot => "start_bot",
            Self::ClickButtonInChat { .. } => "click_button_in_chat",
            Self::SendMessage { .. } => "send_message",
            Self::DeleteHistory => "delete_history",
        }
    }

    /// Human-readable label for reports, with arguments but never the password
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::StartByPhone => "Start login by phone".to_string(),
            Self::InputNumber { number } => format!("Enter phone number '{number}'"),
            Self::InputCode => "Enter one-time code".to_string(),
            Self::InputPassword { .. } => "Enter password".to_string(),
            Self::FindByTag { tag } => format!("Find chat by tag '{tag}'"),
            Self::StartBot => "Start the bot".to_string(),
            Self::ClickButtonInChat { label } => format!("Click button '{label}' in chat"),
            Self::SendMessage { text } => format!("Send message '{text}'"),
            Self::DeleteHistory => "Delete chat history".to_string(),
        }
    }

    /// Screen reached by running this step on `screen`, `None` if illegal there
    #[must_use]
    pub const fn next_screen(&self, screen: ScreenKind) -> Option<ScreenKind> {
        use ScreenKind as S;
        match (screen, self) {
            (S::Start, Self::StartByPhone) => Some(S::LoginPhone),
            (S::LoginPhone, Self::InputNumber { .. }) => Some(S::LoginCode),
            (S::LoginCode, Self::InputCode) => Some(S::LoginPassword),
            (S::LoginPassword, Self::InputPassword { .. }) => Some(S::MainChatList),
            (S::MainChatList, Self::FindByTag { .. }) => Some(S::Conversation),
            (
                S::Conversation,
                Self::StartBot | Self::ClickButtonInChat { .. } | Self::SendMessage { .. },
            ) => Some(S::Conversation),
            (S::Conversation, Self::DeleteHistory) => Some(S::Finished),
            _ => None,
        }
    }

    fn arguments_mut(&mut self) -> Option<&mut String> {
        match self {
            Self::InputNumber { number } => Some(number),
            Self::InputPassword { password } => Some(password),
            Self::FindByTag { tag } => Some(tag),
            Self::ClickButtonInChat { label } => Some(label),
            Self::SendMessage { text } => Some(text),
            Self::StartByPhone | Self::InputCode | Self::StartBot | Self::DeleteHistory => None,
        }
    }
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Replace `${key}` placeholders with `values`
pub fn substitute(text: &str, values: &BTreeMap<&str, String>) -> RegflowResult<String> {
    let pattern = Regex::new(PLACEHOLDER)
        .map_err(|e| RegflowError::config(format!("placeholder pattern: {e}")))?;
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in pattern.captures_iter(text) {
        let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = values
            .get(key.as_str())
            .ok_or_else(|| RegflowError::config(format!("unknown placeholder '${{{}}}'", key.as_str())))?;
        out.push_str(&text[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// An immutable, ordered list of steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name
    pub name: String,
    /// Steps in execution order
    pub steps: Vec<FlowStep>,
}

impl Scenario {
    /// Build a scenario
    #[must_use]
    pub fn new(name: impl Into<String>, steps: Vec<FlowStep>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    /// The bot registration journey for the given settings
    #[must_use]
    pub fn registration(settings: &Settings) -> Self {
        let click = |label: &str| FlowStep::ClickButtonInChat {
            label: label.to_string(),
        };
        let send = |text: &str| FlowStep::SendMessage {
            text: text.to_string(),
        };
        Self::new(
            "registration",
            vec![
                FlowStep::StartByPhone,
                FlowStep::InputNumber {
                    number: settings.phone.to_string(),
                },
                FlowStep::InputCode,
                FlowStep::InputPassword {
                    password: settings.password.clone(),
                },
                FlowStep::FindByTag {
                    tag: settings.bot_username.clone(),
                },
                FlowStep::StartBot,
                click("Русский "),
                click(" Регистрация участника"),
                click("Мои личные данные"),
                click("Пройти регистрацию"),
                send("Фамилия Имя Отчествович"),
                send("89992119999"),
                send("asdas@mail.ru"),
                FlowStep::DeleteHistory,
            ],
        )
    }

    /// Parse a scenario file, leaving placeholders in place
    pub fn from_yaml(yaml: &str) -> RegflowResult<Self> {
        let scenario: Self = serde_yaml_ng::from_str(yaml)?;
        if scenario.steps.is_empty() {
            return Err(RegflowError::config(format!(
                "scenario '{}' has no steps",
                scenario.name
            )));
        }
        Ok(scenario)
    }

    /// Copy with `${key}` placeholders filled from settings
    pub fn resolve(&self, settings: &Settings) -> RegflowResult<Self> {
        let values = settings.placeholders();
        let mut resolved = self.clone();
        for step in &mut resolved.steps {
            if let Some(argument) = step.arguments_mut() {
                *argument = substitute(argument, &values)?;
            }
        }
        Ok(resolved)
    }

    /// Check every step is legal on the screen it will run on; returns the final screen
    pub fn validate(&self) -> RegflowResult<ScreenKind> {
        self.steps
            .iter()
            .enumerate()
            .try_fold(ScreenKind::Start, |screen, (index, step)| {
                step.next_screen(screen)
                    .ok_or_else(|| RegflowError::InvalidTransition {
                        index,
                        action: step.action().to_string(),
                        screen: screen.to_string(),
                    })
            })
    }

    /// Number of steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether there are no steps
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// The page object the flow is on
#[derive(Debug, Clone, Copy)]
pub enum Screen<'d> {
    /// Start page
    Start(StartPage<'d>),
    /// Login page at the given stage
    Login(LoginPage<'d>, ScreenKind),
    /// Chat list
    ChatList(MainChatListPage<'d>),
    /// Conversation, possibly after history deletion
    Conversation(ConversationPage<'d>, ScreenKind),
}

impl<'d> Screen<'d> {
    /// Fresh flow on the start page
    #[must_use]
    pub const fn start(ui: Ui<'d>) -> Self {
        Self::Start(StartPage::new(ui))
    }

    /// Where the flow is
    #[must_use]
    pub const fn kind(&self) -> ScreenKind {
        match self {
            Self::Start(_) => StartPage::KIND,
            Self::ChatList(_) => MainChatListPage::KIND,
            Self::Login(_, kind) | Self::Conversation(_, kind) => *kind,
        }
    }

    /// Name of the page in charge, with the login or conversation stage
    #[must_use]
    pub fn page_name(&self) -> &'static str {
        match self {
            Self::Start(page) => page.page_name(),
            Self::ChatList(page) => page.page_name(),
            Self::Login(_, kind) | Self::Conversation(_, kind) => kind.name(),
        }
    }

    /// Run one step, returning the page object for the next one
    pub async fn execute(self, index: usize, step: &FlowStep) -> RegflowResult<Self> {
        let current = self.kind();
        debug!(step = index + 1, action = step.action(), page = self.page_name(), "executing");
        let next = step
            .next_screen(current)
            .ok_or_else(|| RegflowError::InvalidTransition {
                index,
                action: step.action().to_string(),
                screen: current.to_string(),
            })?;

        Ok(match (self, step) {
            (Self::Start(page), FlowStep::StartByPhone) => {
                Self::Login(page.start_by_phone().await?, next)
            }
            (Self::Login(page, _), FlowStep::InputNumber { number }) => {
                Self::Login(page.input_number(number).await?, next)
            }
            (Self::Login(page, _), FlowStep::InputCode) => {
                Self::Login(page.input_code().await?, next)
            }
            (Self::Login(page, _), FlowStep::InputPassword { password }) => {
                Self::ChatList(page.input_password(password).await?)
            }
            (Self::ChatList(page), FlowStep::FindByTag { tag }) => {
                Self::Conversation(page.find_by_tag(tag).await?, next)
            }
            (Self::Conversation(page, _), FlowStep::StartBot) => {
                Self::Conversation(page.start_bot().await?, next)
            }
            (Self::Conversation(page, _), FlowStep::ClickButtonInChat { label }) => {
                Self::Conversation(page.click_button_in_chat(label).await?, next)
            }
            (Self::Conversation(page, _), FlowStep::SendMessage { text }) => {
                Self::Conversation(page.send_message(text).await?, next)
            }
            (Self::Conversation(page, _), FlowStep::DeleteHistory) => {
                Self::Conversation(page.delete_history().await?, next)
            }
            (screen, step) => {
                return Err(RegflowError::InvalidTransition {
                    index,
                    action: step.action().to_string(),
                    screen: screen.kind().to_string(),
                })
            }
        })
    }
}

/// Outcome of a completed scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Scenario name
    pub scenario: String,
    /// Steps executed
    pub steps: usize,
    /// Wall time of the run
    pub duration: Duration,
    /// Screen the flow ended on
    pub final_screen: ScreenKind,
}

/// Runs a scenario step by step against one UI context
#[derive(Debug)]
pub struct Orchestrator<'d, R> {
    ui: Ui<'d>,
    reporter: R,
}

impl<'d, R: StepReporter> Orchestrator<'d, R> {
    /// Bind a UI context and a reporter
    #[must_use]
    pub const fn new(ui: Ui<'d>, reporter: R) -> Self {
        Self { ui, reporter }
    }

    /// Borrow the reporter
    #[must_use]
    pub const fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Give back the reporter
    #[must_use]
    pub fn into_reporter(self) -> R {
        self.reporter
    }

    /// Execute every step in order; the first failure ends the run
    pub async fn run(&mut self, scenario: &Scenario) -> RegflowResult<RunSummary> {
        scenario.validate()?;
        info!(scenario = %scenario.name, steps = scenario.len(), "scenario started");
        let started = Instant::now();
        let mut screen = Screen::start(self.ui);

        for (index, step) in scenario.steps.iter().enumerate() {
            let label = step.label();
            self.reporter.step_started(index, &label);
            let step_started = Instant::now();

            match screen.execute(index, step).await {
                Ok(next) => {
                    let elapsed = step_started.elapsed();
                    info!(step = index + 1, %label, ?elapsed, screen = %next.kind(), "step passed");
                    self.reporter.step_passed(index, &label, elapsed);
                    screen = next;
                }
                Err(source) => {
                    let screenshot = match self.ui.driver().screenshot().await {
                        Ok(shot) => Some(shot),
                        Err(err) => {
                            warn!(error = %err, "failure screenshot unavailable");
                            None
                        }
                    };
                    self.reporter.step_failed(
                        index,
                        &label,
                        step_started.elapsed(),
                        &source,
                        screenshot.as_ref(),
                    );
                    return Err(RegflowError::StepFailed {
                        index,
                        label,
                        source: Box::new(source),
                    });
                }
            }
        }

        let summary = RunSummary {
            scenario: scenario.name.clone(),
            steps: scenario.len(),
            duration: started.elapsed(),
            final_screen: screen.kind(),
        };
        info!(scenario = %summary.scenario, duration = ?summary.duration, "scenario passed");
        Ok(summary)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::Timeouts;
    use crate::mock::{MockDom, MockDriver};
    use crate::reporter::JsonReporter;

    fn settings() -> Settings {
        Settings::from_yaml(
            "base.url: https://web.telegram.org\nbot.username: reg_bot\nnumber.phone: '89992119999'\npassword: s3cret\n",
        )
        .unwrap()
    }

    mod step_tests {
        use super::*;

        #[test]
        fn test_password_never_in_label() {
            let step = FlowStep::InputPassword {
                password: "s3cret".to_string(),
            };
            assert!(!step.label().contains("s3cret"));
            assert!(!step.to_string().contains("s3cret"));
        }

        #[test]
        fn test_yaml_tagging() {
            let step: FlowStep =
                serde_yaml_ng::from_str("action: click_button_in_chat\nlabel: 'Русский '\n").unwrap();
            assert_eq!(
                step,
                FlowStep::ClickButtonInChat {
                    label: "Русский ".to_string()
                }
            );
        }
    }

    mod scenario_tests {
        use super::*;

        #[test]
        fn test_registration_is_valid() {
            let scenario = Scenario::registration(&settings());
            assert_eq!(scenario.len(), 14);
            assert_eq!(scenario.validate().unwrap(), ScreenKind::Finished);
            assert_eq!(
                scenario.steps[1],
                FlowStep::InputNumber {
                    number: "+79992119999".to_string()
                }
            );
        }

        #[test]
        fn test_skipping_code_is_invalid() {
            let scenario = Scenario::new(
                "broken",
                vec![
                    FlowStep::StartByPhone,
                    FlowStep::InputNumber {
                        number: "1".to_string(),
                    },
                    FlowStep::InputPassword {
                        password: "p".to_string(),
                    },
                ],
            );
            match scenario.validate().unwrap_err() {
                RegflowError::InvalidTransition {
                    index,
                    action,
                    screen,
                } => {
                    assert_eq!(index, 2);
                    assert_eq!(action, "input_password");
                    assert_eq!(screen, "login (code)");
                }
                other => panic!("expected InvalidTransition, got {other:?}"),
            }
        }

        #[test]
        fn test_nothing_after_history_deletion() {
            let mut scenario = Scenario::registration(&settings());
            scenario.steps.push(FlowStep::StartBot);
            assert!(scenario.validate().is_err());
        }

        #[test]
        fn test_yaml_with_placeholders() {
            let yaml = r"
name: short
steps:
  - action: start_by_phone
  - action: input_number
    number: ${number.phone}
  - action: input_code
  - action: input_password
    password: ${password}
  - action: find_by_tag
    tag: '@${bot.username}'
";
            let scenario = Scenario::from_yaml(yaml).unwrap().resolve(&settings()).unwrap();
            assert_eq!(
                scenario.steps[4],
                FlowStep::FindByTag {
                    tag: "@reg_bot".to_string()
                }
            );
            assert_eq!(scenario.validate().unwrap(), ScreenKind::Conversation);
        }

        #[test]
        fn test_unknown_placeholder() {
            let yaml = "name: x\nsteps:\n  - action: find_by_tag\n    tag: ${bot.tag}\n";
            let err = Scenario::from_yaml(yaml)
                .unwrap()
                .resolve(&settings())
                .unwrap_err();
            assert!(err.to_string().contains("bot.tag"));
        }

        #[test]
        fn test_empty_scenario_rejected() {
            assert!(Scenario::from_yaml("name: empty\nsteps: []\n").is_err());
        }

        #[test]
        fn test_substitute_leaves_plain_text() {
            let values = BTreeMap::from([("password", "x".to_string())]);
            assert_eq!(substitute("no placeholders", &values).unwrap(), "no placeholders");
            assert_eq!(substitute("a${password}b", &values).unwrap(), "axb");
        }
    }

    mod orchestrator_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_first_failure_stops_run_and_is_attributed() {
            let driver = MockDriver::new(MockDom::new());
            let ui = Ui::new(&driver, Timeouts::uniform(1_000));
            let mut orchestrator = Orchestrator::new(ui, JsonReporter::new("registration"));

            let err = orchestrator
                .run(&Scenario::registration(&settings()))
                .await
                .unwrap_err();
            match &err {
                RegflowError::StepFailed { index, label, .. } => {
                    assert_eq!(*index, 0);
                    assert_eq!(label, "Start login by phone");
                }
                other => panic!("expected StepFailed, got {other:?}"),
            }
            assert!(matches!(err.root(), RegflowError::LocatorTimeout { .. }));

            let reporter = orchestrator.into_reporter();
            assert_eq!(reporter.records().len(), 1);
            assert!(reporter.records()[0].screenshot.is_some());
        }

        #[tokio::test(start_paused = true)]
        async fn test_invalid_scenario_never_touches_driver() {
            let driver = MockDriver::new(MockDom::new());
            let ui = Ui::new(&driver, Timeouts::default());
            let mut orchestrator = Orchestrator::new(ui, JsonReporter::new("bad"));
            let scenario = Scenario::new("bad", vec![FlowStep::DeleteHistory]);

            let err = orchestrator.run(&scenario).await.unwrap_err();
            assert!(matches!(err, RegflowError::InvalidTransition { .. }));
            assert!(driver.events().is_empty());
            assert!(orchestrator.reporter().records().is_empty());
        }

        #[test]
        fn test_screen_names_its_page() {
            let driver = MockDriver::new(MockDom::new());
            let ui = Ui::new(&driver, Timeouts::default());
            let screen = Screen::start(ui);
            assert_eq!(screen.kind(), ScreenKind::Start);
            assert_eq!(screen.page_name(), "start");
        }

        #[test]
        fn test_login_screen_names_its_stage() {
            let driver = MockDriver::new(MockDom::new());
            let ui = Ui::new(&driver, Timeouts::default());
            let code = Screen::Login(LoginPage::new(ui), ScreenKind::LoginCode);
            assert_eq!(code.page_name(), "login (code)");
            let password = Screen::Login(LoginPage::new(ui), ScreenKind::LoginPassword);
            assert_eq!(password.page_name(), "login (password)");
            let done = Screen::Conversation(ConversationPage::new(ui), ScreenKind::Finished);
            assert_eq!(done.page_name(), "conversation (history deleted)");
        }
    }
}
