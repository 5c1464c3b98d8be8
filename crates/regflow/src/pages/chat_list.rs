use tracing::info;

use super::{ConversationPage, PageObject, ScreenKind};
use crate::actions::Ui;
use crate::catalog::{locate, Role};
use crate::driver::Effect;
use crate::locator::Resolved;
use crate::result::RegflowResult;
use crate::wait::Predicate;

/// Chat list shown after login
#[derive(Debug, Clone, Copy)]
pub struct MainChatListPage<'d> {
    ui: Ui<'d>,
}

impl<'d> MainChatListPage<'d> {
    /// Page object over a UI context
    #[must_use]
    pub const fn new(ui: Ui<'d>) -> Self {
        Self { ui }
    }

    /// Replace the search query with `tag` and wait for the first result.
    ///
    /// The box is cleared first, so repeating a search never concatenates
    /// queries.
    pub async fn search(&self, tag: &str) -> RegflowResult<Resolved> {
        let timeouts = self.ui.timeouts();
        self.ui
            .apply(
                &locate(Role::SearchInput),
                Predicate::Visible,
                &[Effect::Clear, Effect::Type(tag.to_string())],
                timeouts.chat_list(),
            )
            .await?;
        self.ui
            .wait(
                &locate(Role::FirstSearchResult),
                Predicate::Visible,
                timeouts.default_wait(),
            )
            .await
    }

    /// Search for `tag` and open the first match
    pub async fn find_by_tag(self, tag: &str) -> RegflowResult<ConversationPage<'d>> {
        self.search(tag).await?;
        self.ui
            .click(&locate(Role::FirstSearchResult), self.ui.timeouts().default_wait())
            .await?;
        info!(tag, "conversation opened");
        Ok(ConversationPage::new(self.ui))
    }
}

impl<'d> PageObject<'d> for MainChatListPage<'d> {
    const KIND: ScreenKind = ScreenKind::MainChatList;

    fn ui(&self) -> &Ui<'d> {
        &self.ui
    }
}
