//! Page objects for the web client's registration journey.
//!
//! One type per logical screen. Actions consume the page and return either
//! the same page or the next one, so a finished screen can't be driven again:
//!
//! ```text
//! StartPage ──start_by_phone──► LoginPage ──input_password──► MainChatListPage
//!                               (number, code)                      │
//!                                                              find_by_tag
//!                                                                   ▼
//!                                                          ConversationPage
//! ```

mod chat_list;
mod conversation;
mod login;
mod start;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::actions::Ui;

pub use chat_list::MainChatListPage;
pub use conversation::ConversationPage;
pub use login::LoginPage;
pub use start::StartPage;

/// Where the flow currently is, including the sub-stages of the login form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenKind {
    /// Language and login method choice
    Start,
    /// Login form, phone number stage
    LoginPhone,
    /// Login form, waiting for the one-time code
    LoginCode,
    /// Login form, cloud password stage
    LoginPassword,
    /// Chat list after login
    MainChatList,
    /// Open conversation with the bot
    Conversation,
    /// Conversation after its history was deleted
    Finished,
}

impl ScreenKind {
    /// Screen name for messages
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::LoginPhone => "login (phone)",
            Self::LoginCode => "login (code)",
            Self::LoginPassword => "login (password)",
            Self::MainChatList => "main chat list",
            Self::Conversation => "conversation",
            Self::Finished => "conversation (history deleted)",
        }
    }
}

impl fmt::Display for ScreenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A page or component of the web client
pub trait PageObject<'d> {
    /// Screen this page object drives when freshly created
    const KIND: ScreenKind;

    /// Shared UI context
    fn ui(&self) -> &Ui<'d>;

    /// Page name for logging
    fn page_name(&self) -> &'static str {
        Self::KIND.name()
    }
}
