use tracing::info;

use super::{LoginPage, PageObject, ScreenKind};
use crate::actions::Ui;
use crate::catalog::{locate, Role};
use crate::result::RegflowResult;

/// Landing screen: language choice and login method
#[derive(Debug, Clone, Copy)]
pub struct StartPage<'d> {
    ui: Ui<'d>,
}

impl<'d> StartPage<'d> {
    /// Page object over a UI context
    #[must_use]
    pub const fn new(ui: Ui<'d>) -> Self {
        Self { ui }
    }

    /// Continue in Russian, then choose login by phone number
    pub async fn start_by_phone(self) -> RegflowResult<LoginPage<'d>> {
        let timeout = self.ui.timeouts().start();
        self.ui.click(&locate(Role::ContinueInRussian), timeout).await?;
        self.ui.click(&locate(Role::PhoneLogin), timeout).await?;
        info!("phone login selected");
        Ok(LoginPage::new(self.ui))
    }
}

impl<'d> PageObject<'d> for StartPage<'d> {
    const KIND: ScreenKind = ScreenKind::Start;

    fn ui(&self) -> &Ui<'d> {
        &self.ui
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::Timeouts;
    use crate::mock::{MockDom, MockDriver, Reaction};

    fn first(role: Role) -> crate::locator::Selector {
        locate(role).candidates()[0].clone()
    }

    #[tokio::test(start_paused = true)]
    async fn test_clicks_both_controls_in_order() {
        let mut dom = MockDom::new();
        let lang_button = dom.node("button").insert();
        let lang_text = dom
            .node("span")
            .matches(first(Role::ContinueInRussian))
            .child_of(lang_button)
            .insert();
        let phone_button = dom
            .node("button")
            .matches(first(Role::PhoneLogin))
            .hidden()
            .insert();
        dom.on_click(lang_button, Reaction::show(phone_button, Duration::from_secs(1)));
        let driver = MockDriver::new(dom);

        let page = StartPage::new(Ui::new(&driver, Timeouts::default()));
        let login = page.start_by_phone().await.unwrap();
        assert_eq!(login.page_name(), "login (phone)");
        assert_eq!(driver.clicks(), vec![lang_button, phone_button]);
        assert!(!driver.clicks().contains(&lang_text));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_phone_login_times_out() {
        let mut dom = MockDom::new();
        dom.node("button").matches(first(Role::ContinueInRussian)).insert();
        let driver = MockDriver::new(dom);

        let page = StartPage::new(Ui::new(&driver, Timeouts::uniform(2_000)));
        let err = page.start_by_phone().await.unwrap_err();
        assert!(matches!(
            err,
            crate::RegflowError::LocatorTimeout { ref role, .. } if role == "log in by phone"
        ));
    }
}
