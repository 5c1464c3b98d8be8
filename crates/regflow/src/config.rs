//! Run settings: target URL, bot tag, account credentials and per-step timeouts.
//!
//! Settings come from a YAML file using the flat dotted keys the suite has
//! always used, with environment overrides for CI:
//!
//! ```yaml
//! base.url: https://web.telegram.org
//! bot.username: registration_bot
//! number.phone: "+79992119999"
//! password: hunter2
//! timeouts:
//!   code_entry_ms: 300000
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::result::{RegflowError, RegflowResult};
use crate::wait::{WaitOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};

/// Environment variable overriding `base.url`
pub const ENV_BASE_URL: &str = "REGFLOW_BASE_URL";
/// Environment variable overriding `bot.username`
pub const ENV_BOT_USERNAME: &str = "REGFLOW_BOT_USERNAME";
/// Environment variable overriding `number.phone`
pub const ENV_NUMBER_PHONE: &str = "REGFLOW_NUMBER_PHONE";
/// Environment variable overriding `password`
pub const ENV_PASSWORD: &str = "REGFLOW_PASSWORD";

const PHONE_PATTERN: &str = r"^(?:\+(\d{7,15})|8(\d{10}))$";

/// A phone number in international form: `+`, country code, subscriber digits.
///
/// The domestic Russian form `8XXXXXXXXXX` is accepted and rewritten to
/// `+7XXXXXXXXXX`. Any other number must carry its `+` and country code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PhoneValue", into = "String")]
pub struct PhoneNumber(String);

/// YAML reads an unquoted number as an integer
#[derive(Deserialize)]
#[serde(untagged)]
enum PhoneValue {
    Text(String),
    Digits(u64),
}

impl TryFrom<PhoneValue> for PhoneNumber {
    type Error = RegflowError;

    fn try_from(value: PhoneValue) -> Result<Self, Self::Error> {
        match value {
            PhoneValue::Text(text) => Self::parse(&text),
            PhoneValue::Digits(digits) => Err(RegflowError::config(format!(
                "number.phone was read as the integer {digits}, which drops a leading '+' or '0'; quote it as a string"
            ))),
        }
    }
}

impl From<PhoneNumber> for String {
    fn from(number: PhoneNumber) -> Self {
        number.0
    }
}

impl PhoneNumber {
    /// Validate a phone number and bring it to international form,
    /// ignoring surrounding whitespace
    pub fn parse(text: &str) -> RegflowResult<Self> {
        let text = text.trim();
        let pattern = Regex::new(PHONE_PATTERN)
            .map_err(|e| RegflowError::config(format!("phone pattern: {e}")))?;
        let caps = pattern.captures(text).ok_or_else(|| {
            RegflowError::config(format!(
                "number.phone '{text}' is not a phone number (expected '+' and 7-15 digits, or 8 and 10 digits)"
            ))
        })?;
        match (caps.get(1), caps.get(2)) {
            (Some(international), _) => Ok(Self(format!("+{}", international.as_str()))),
            (None, Some(trunk)) => Ok(Self(format!("+7{}", trunk.as_str()))),
            (None, None) => Err(RegflowError::config(format!(
                "number.phone '{text}' is not a phone number"
            ))),
        }
    }

    /// The number in international form, always starting with `+`
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-step wait budgets in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Any wait without a dedicated budget
    pub default_ms: u64,
    /// Interval between DOM polls
    pub poll_interval_ms: u64,
    /// Start screen controls
    pub start_ms: u64,
    /// Phone number input
    pub phone_input_ms: u64,
    /// One-time code field appearing
    pub code_appear_ms: u64,
    /// Human entering the one-time code
    pub code_entry_ms: u64,
    /// Password field
    pub password_ms: u64,
    /// Chat list after login
    pub chat_list_ms: u64,
    /// Controls inside a conversation
    pub chat_control_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            default_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            start_ms: 20_000,
            phone_input_ms: 20_000,
            code_appear_ms: 30_000,
            code_entry_ms: 180_000,
            password_ms: 15_000,
            chat_list_ms: 120_000,
            chat_control_ms: 20_000,
        }
    }
}

impl Timeouts {
    /// Every budget set to `ms`; handy for tests
    #[must_use]
    pub const fn uniform(ms: u64) -> Self {
        Self {
            default_ms: ms,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            start_ms: ms,
            phone_input_ms: ms,
            code_appear_ms: ms,
            code_entry_ms: ms,
            password_ms: ms,
            chat_list_ms: ms,
            chat_control_ms: ms,
        }
    }

    /// Polling options for the waiter
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            timeout_ms: self.default_ms,
            poll_interval_ms: self.poll_interval_ms,
        }
    }

    /// Budget for waits without a dedicated one
    #[must_use]
    pub const fn default_wait(&self) -> Duration {
        Duration::from_millis(self.default_ms)
    }

    /// Start screen budget
    #[must_use]
    pub const fn start(&self) -> Duration {
        Duration::from_millis(self.start_ms)
    }

    /// Phone input budget
    #[must_use]
    pub const fn phone_input(&self) -> Duration {
        Duration::from_millis(self.phone_input_ms)
    }

    /// Budget for the code field to appear
    #[must_use]
    pub const fn code_appear(&self) -> Duration {
        Duration::from_millis(self.code_appear_ms)
    }

    /// Budget for a human to enter the code
    #[must_use]
    pub const fn code_entry(&self) -> Duration {
        Duration::from_millis(self.code_entry_ms)
    }

    /// Password field budget
    #[must_use]
    pub const fn password(&self) -> Duration {
        Duration::from_millis(self.password_ms)
    }

    /// Chat list budget
    #[must_use]
    pub const fn chat_list(&self) -> Duration {
        Duration::from_millis(self.chat_list_ms)
    }

    /// Conversation controls budget
    #[must_use]
    pub const fn chat_control(&self) -> Duration {
        Duration::from_millis(self.chat_control_ms)
    }

    fn validate(&self) -> RegflowResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(RegflowError::config("timeouts.poll_interval_ms must be positive"));
        }
        if self.code_entry_ms < self.code_appear_ms {
            return Err(RegflowError::config(
                "timeouts.code_entry_ms must not be shorter than code_appear_ms",
            ));
        }
        Ok(())
    }
}

/// Settings for one run
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Web client URL
    #[serde(rename = "base.url")]
    pub base_url: String,
    /// Tag of the bot under test
    #[serde(rename = "bot.username")]
    pub bot_username: String,
    /// Account phone number
    #[serde(rename = "number.phone")]
    pub phone: PhoneNumber,
    /// Cloud password of the account
    pub password: String,
    /// Wait budgets
    #[serde(default)]
    pub timeouts: Timeouts,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("base_url", &self.base_url)
            .field("bot_username", &self.bot_username)
            .field("phone", &self.phone)
            .field("password", &"<redacted>")
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl Settings {
    /// Parse and validate settings from YAML
    pub fn from_yaml(yaml: &str) -> RegflowResult<Self> {
        let settings: Self = serde_yaml_ng::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from a file, then apply environment overrides
    pub fn load(path: &Path) -> RegflowResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RegflowError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut settings: Self = serde_yaml_ng::from_str(&text)?;
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Override fields from a variable lookup (the process environment in `load`)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> RegflowResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(tag) = lookup(ENV_BOT_USERNAME) {
            self.bot_username = tag;
        }
        if let Some(number) = lookup(ENV_NUMBER_PHONE) {
            self.phone = PhoneNumber::parse(&number)?;
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.password = password;
        }
        Ok(())
    }

    /// Check field contents
    pub fn validate(&self) -> RegflowResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(RegflowError::config(format!(
                "base.url '{}' must start with http:// or https://",
                self.base_url
            )));
        }
        if self.bot_username.trim().is_empty() {
            return Err(RegflowError::config("bot.username is empty"));
        }
        if self.password.is_empty() {
            return Err(RegflowError::config("password is empty"));
        }
        self.timeouts.validate()
    }

    /// Values for `${key}` placeholders in scenario files
    #[must_use]
    pub fn placeholders(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("base.url", self.base_url.clone()),
            ("bot.username", self.bot_username.clone()),
            ("number.phone", self.phone.to_string()),
            ("password", self.password.clone()),
        ])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const YAML: &str = r#"
base.url: https://web.telegram.org
bot.username: registration_bot
number.phone: "89992119999"
password: s3cret
"#;

    mod phone_tests {
        use super::*;

        #[test]
        fn test_accepts_local_and_international() {
            assert_eq!(PhoneNumber::parse(" +79992119999 ").unwrap().as_str(), "+79992119999");
            assert_eq!(PhoneNumber::parse("+442071838750").unwrap().as_str(), "+442071838750");
        }

        #[test]
        fn test_trunk_prefix_becomes_country_code() {
            assert_eq!(PhoneNumber::parse("89992119999").unwrap().as_str(), "+79992119999");
        }

        #[test]
        fn test_rejects_garbage() {
            for bad in [
                "",
                "+",
                "12345",
                "8-999-211-99-99",
                "+1234567890123456",
                "abc1234567",
                "79992119999",
                "8999211999",
            ] {
                assert!(PhoneNumber::parse(bad).is_err(), "{bad} should be rejected");
            }
        }

        #[test]
        fn test_unquoted_yaml_number_is_rejected() {
            for unquoted in ["+79992119999", "89992119999"] {
                let yaml = YAML.replace("\"89992119999\"", unquoted);
                let err = Settings::from_yaml(&yaml).unwrap_err();
                assert!(err.to_string().contains("quote it"), "{unquoted}: {err}");
            }
        }
    }

    mod settings_tests {
        use super::*;

        #[test]
        fn test_parses_dotted_keys() {
            let settings = Settings::from_yaml(YAML).unwrap();
            assert_eq!(settings.base_url, "https://web.telegram.org");
            assert_eq!(settings.bot_username, "registration_bot");
            assert_eq!(settings.timeouts, Timeouts::default());
        }

        #[test]
        fn test_partial_timeouts_keep_defaults() {
            let yaml = format!("{YAML}timeouts:\n  code_entry_ms: 300000\n");
            let settings = Settings::from_yaml(&yaml).unwrap();
            assert_eq!(settings.timeouts.code_entry(), Duration::from_secs(300));
            assert_eq!(settings.timeouts.chat_list(), Duration::from_secs(120));
        }

        #[test]
        fn test_rejects_bad_url() {
            let yaml = YAML.replace("https://web.telegram.org", "web.telegram.org");
            let err = Settings::from_yaml(&yaml).unwrap_err();
            assert!(err.to_string().contains("base.url"));
        }

        #[test]
        fn test_rejects_missing_key() {
            let yaml = YAML.replace("password: s3cret\n", "");
            assert!(matches!(
                Settings::from_yaml(&yaml).unwrap_err(),
                RegflowError::Yaml(_)
            ));
        }

        #[test]
        fn test_rejects_code_entry_shorter_than_appearance() {
            let yaml = format!("{YAML}timeouts:\n  code_entry_ms: 1000\n");
            assert!(Settings::from_yaml(&yaml).is_err());
        }

        #[test]
        fn test_debug_redacts_password() {
            let settings = Settings::from_yaml(YAML).unwrap();
            let debug = format!("{settings:?}");
            assert!(!debug.contains("s3cret"));
            assert!(debug.contains("<redacted>"));
        }

        #[test]
        fn test_overrides() {
            let mut settings = Settings::from_yaml(YAML).unwrap();
            settings
                .apply_overrides(|key| match key {
                    ENV_BOT_USERNAME => Some("other_bot".to_string()),
                    ENV_NUMBER_PHONE => Some("+79990000000".to_string()),
                    _ => None,
                })
                .unwrap();
            assert_eq!(settings.bot_username, "other_bot");
            assert_eq!(settings.phone.as_str(), "+79990000000");
            assert_eq!(settings.password, "s3cret");
        }

        #[test]
        fn test_invalid_override_is_rejected() {
            let mut settings = Settings::from_yaml(YAML).unwrap();
            let result = settings.apply_overrides(|key| {
                (key == ENV_NUMBER_PHONE).then(|| "call me".to_string())
            });
            assert!(result.is_err());
        }

        #[test]
        fn test_load_from_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("regflow.yaml");
            std::fs::write(&path, YAML).unwrap();
            let settings = Settings::load(&path).unwrap();
            assert_eq!(settings.password, "s3cret");
        }

        #[test]
        fn test_placeholders() {
            let settings = Settings::from_yaml(YAML).unwrap();
            let values = settings.placeholders();
            assert_eq!(values["number.phone"], "+79992119999");
            assert_eq!(values.len(), 4);
        }
    }
}
