//! Selector catalog for the web client's registration screens.
//!
//! Each [`Role`] maps to one [`LogicalElement`]. Where the client renders
//! more than one markup shape for a control, every shape is a separate
//! candidate, highest priority first.

use std::fmt;

use crate::locator::{xpath_literal, LogicalElement, Selector};

/// Logical UI targets used by the page objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// "Continue in Russian" on the start screen
    ContinueInRussian,
    /// "Log in by phone number" on the start screen
    PhoneLogin,
    /// Phone number field, native or rich-text
    PhoneInput,
    /// "Keep me signed in" checkbox
    RememberMe,
    /// One-time code field
    CodeInput,
    /// Cloud password field
    PasswordInput,
    /// Submit / "Next" button on login forms
    Submit,
    /// Chat list search box
    SearchInput,
    /// First row of the search results
    FirstSearchResult,
    /// Bot "START" button
    StartBot,
    /// Message composer
    MessageInput,
    /// Conversation overflow menu
    MoreActions,
    /// "Delete chat" menu item
    DeleteChat,
    /// Confirm button of the delete dialog
    ConfirmDelete,
}

impl Role {
    /// Every static role
    pub const ALL: [Self; 14] = [
        Self::ContinueInRussian,
        Self::PhoneLogin,
        Self::PhoneInput,
        Self::RememberMe,
        Self::CodeInput,
        Self::PasswordInput,
        Self::Submit,
        Self::SearchInput,
        Self::FirstSearchResult,
        Self::StartBot,
        Self::MessageInput,
        Self::MoreActions,
        Self::DeleteChat,
        Self::ConfirmDelete,
    ];

    /// Human-readable role label used in errors and logs
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ContinueInRussian => "continue in Russian",
            Self::PhoneLogin => "log in by phone",
            Self::PhoneInput => "phone input",
            Self::RememberMe => "remember me",
            Self::CodeInput => "code input",
            Self::PasswordInput => "password input",
            Self::Submit => "submit button",
            Self::SearchInput => "search input",
            Self::FirstSearchResult => "first search result",
            Self::StartBot => "start bot button",
            Self::MessageInput => "message input",
            Self::MoreActions => "more actions",
            Self::DeleteChat => "delete chat",
            Self::ConfirmDelete => "confirm delete",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bind a role to its candidate selectors
#[must_use]
pub fn locate(role: Role) -> LogicalElement {
    fn x(expression: &str) -> Selector {
        Selector::xpath(expression)
    }
    let element = |first: &str| LogicalElement::new(role.label(), x(first));
    match role {
        Role::ContinueInRussian => element("//*[text()='Продолжить на русском']"),
        Role::PhoneLogin => element("//*[text()='Вход по номеру телефона']"),
        Role::PhoneInput => element("//*[@id='sign-in-phone-number']")
            .or(x("//*[@class='input-field input-field-phone']")),
        Role::RememberMe => element("//input[@id='sign-in-keep-session']"),
        Role::CodeInput => element("//input[@id='sign-in-code']")
            .or(x("//input[@class='input-field-input is-empty']")),
        Role::PasswordInput => element("//input[@name='notsearch_password']")
            .or(x("//input[@type='password' and not(@class='stealthy')]")),
        Role::Submit => element("//*[@type='submit']").or(x("//*[text()='Далее']")),
        Role::SearchInput => element("//input[@id='telegram-search-input']").or(x(
            "//input[@class='input-field-input is-empty input-search-input with-focus-effect']",
        )),
        Role::FirstSearchResult => element(
            "//div[@class='search-section']//div[@class='info' or \
             @class='row no-wrap row-with-padding row-clickable hover-effect rp chatlist-chat chatlist-chat-abitbigger']",
        )
        .first_match(),
        Role::StartBot => element("//button[text()='СТАРТ']"),
        Role::MessageInput => element("//div[@id='editable-message-text']"),
        Role::MoreActions => element("//button[@aria-label='More actions']"),
        Role::DeleteChat => element("//div[text()='Удалить чат']"),
        Role::ConfirmDelete => element("//h3[text()='Удалить чат']/../..//button[text()='Удалить']"),
    }
}

/// Inline keyboard button in a bot message, matched by exact label.
///
/// The label span sits inside the button, so the selector already steps up
/// to the clickable parent.
#[must_use]
pub fn in_chat_button(label: &str) -> LogicalElement {
    LogicalElement::new(
        format!("in-chat button '{label}'"),
        Selector::xpath(format!(
            "//span[@class='inline-button-text' and text()={}]/..",
            xpath_literal(label)
        )),
    )
}
