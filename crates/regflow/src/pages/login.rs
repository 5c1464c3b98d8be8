use tracing::{debug, info};

use super::{MainChatListPage, PageObject, ScreenKind};
use crate::actions::Ui;
use crate::catalog::{locate, Role};
use crate::config::PhoneNumber;
use crate::result::RegflowResult;
use crate::variant::InputVariant;
use crate::wait::{Predicate, WaitCondition};

/// Event name for the human-gated code entry
pub const CODE_ENTRY_EVENT: &str = "one-time code entry";

/// Login form: phone number, one-time code, cloud password
#[derive(Debug, Clone, Copy)]
pub struct LoginPage<'d> {
    ui: Ui<'d>,
}

impl<'d> LoginPage<'d> {
    /// Page object over a UI context
    #[must_use]
    pub const fn new(ui: Ui<'d>) -> Self {
        Self { ui }
    }

    /// Enter the phone number using the strategy of the rendered variant,
    /// clear "remember me" and submit.
    pub async fn input_number(self, number: &str) -> RegflowResult<Self> {
        let timeouts = self.ui.timeouts();
        let element = locate(Role::PhoneInput);
        let field = self
            .ui
            .wait(&element, Predicate::Visible, timeouts.phone_input())
            .await?;
        let variant = InputVariant::detect(self.ui.driver(), &field).await?;
        let number = PhoneNumber::parse(number)?;
        let shown = self
            .ui
            .driver()
            .field_value(&variant.input_path(&field.path))
            .await?
            .unwrap_or_default();
        debug!(%variant, %shown, "phone input variant detected");

        let effects = variant.input_effects(number.as_str(), &shown);
        let condition = WaitCondition::new(element, Predicate::Visible, timeouts.phone_input());
        self.ui
            .waiter()
            .perform(&condition, &effects, |r| {
                variant.input_path(&r.path)
            })
            .await?;

        self.uncheck_remember_me().await?;
        self.ui
            .click(&locate(Role::Submit), timeouts.default_wait())
            .await?;
        Ok(self)
    }

    /// Uncheck "remember me" when it is present and checked.
    ///
    /// Returns whether a click was made; absent or unchecked boxes are left alone.
    pub async fn uncheck_remember_me(&self) -> RegflowResult<bool> {
        match self.ui.find(&locate(Role::RememberMe)).await? {
            Some(checkbox) if checkbox.state.selected => {
                self.ui.driver().click(&checkbox.path.parent()).await?;
                debug!("remember me unchecked");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Wait for the code field to appear, then for a human to consume it
    pub async fn input_code(self) -> RegflowResult<Self> {
        let timeouts = self.ui.timeouts();
        let code = locate(Role::CodeInput);
        self.ui
            .wait(&code, Predicate::Visible, timeouts.code_appear())
            .await?;

        info!(
            timeout_s = timeouts.code_entry().as_secs(),
            "waiting for the one-time code to be entered in the browser"
        );
        let condition = WaitCondition::new(code, Predicate::NotVisible, timeouts.code_entry());
        self.ui
            .waiter()
            .await_external(CODE_ENTRY_EVENT, &condition)
            .await?;
        Ok(self)
    }

    /// Type the cloud password and submit
    pub async fn input_password(self, password: &str) -> RegflowResult<MainChatListPage<'d>> {
        let timeouts = self.ui.timeouts();
        self.ui
            .type_into(&locate(Role::PasswordInput), password, timeouts.password())
            .await?;
        self.ui
            .click(&locate(Role::Submit), timeouts.default_wait())
            .await?;
        info!("logged in");
        Ok(MainChatListPage::new(self.ui))
    }
}

impl<'d> PageObject<'d> for LoginPage<'d> {
    const KIND: ScreenKind = ScreenKind::LoginPhone;

    fn ui(&self) -> &Ui<'d> {
        &self.ui
    }
}
