use tracing::info;

use super::{PageObject, ScreenKind};
use crate::actions::Ui;
use crate::catalog::{in_chat_button, locate, Role};
use crate::driver::{Effect, Key};
use crate::result::RegflowResult;

/// Open conversation with the bot under test
#[derive(Debug, Clone, Copy)]
pub struct ConversationPage<'d> {
    ui: Ui<'d>,
}

impl<'d> ConversationPage<'d> {
    /// Page object over a UI context
    #[must_use]
    pub const fn new(ui: Ui<'d>) -> Self {
        Self { ui }
    }

    /// Press the bot's START button
    pub async fn start_bot(self) -> RegflowResult<Self> {
        self.ui
            .click(&locate(Role::StartBot), self.ui.timeouts().chat_control())
            .await?;
        Ok(self)
    }

    /// Type into the composer and send with Enter
    pub async fn send_message(self, text: &str) -> RegflowResult<Self> {
        self.ui
            .edit(
                &locate(Role::MessageInput),
                &[Effect::Type(text.to_string()), Effect::Press(Key::Enter)],
                self.ui.timeouts().chat_control(),
            )
            .await?;
        Ok(self)
    }

    /// Click the inline button whose label is exactly `label`
    pub async fn click_button_in_chat(self, label: &str) -> RegflowResult<Self> {
        self.ui
            .click(&in_chat_button(label), self.ui.timeouts().chat_control())
            .await?;
        Ok(self)
    }

    /// More actions, delete chat, confirm; each menu is awaited before its click
    pub async fn delete_history(self) -> RegflowResult<Self> {
        let timeout = self.ui.timeouts().chat_control();
        for role in [Role::MoreActions, Role::DeleteChat, Role::ConfirmDelete] {
            self.ui.click(&locate(role), timeout).await?;
        }
        info!("chat history deleted");
        Ok(self)
    }
}

impl<'d> PageObject<'d> for ConversationPage<'d> {
    const KIND: ScreenKind = ScreenKind::Conversation;

    fn ui(&self) -> &Ui<'d> {
        &self.ui
    }
}
