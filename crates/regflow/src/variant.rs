//! Markup variants of the phone number field.
//!
//! The client renders either a native `<input>` or a rich-text widget for the
//! same control. The variant is classified once from the resolved node's
//! attributes and then picks the input strategy.

use std::fmt;

use crate::driver::{Effect, PageDriver};
use crate::locator::{NodePath, Resolved, Selector};
use crate::result::{RegflowError, RegflowResult};

/// `id` of the native phone input
pub const NATIVE_ID: &str = "sign-in-phone-number";

/// Class marking the rich-text phone widget
pub const RICH_TEXT_CLASS: &str = "input-field-phone";

/// Digit surface inside the rich-text widget
pub const RICH_TEXT_DIGITS: &str = "./div[@inputmode='decimal']";

/// Phone input variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputVariant {
    /// Plain `<input>` pre-filled with the dialing prefix
    Native,
    /// Contenteditable widget with a nested digit surface
    RichText,
}

impl InputVariant {
    /// Classify from discriminating attributes, `None` for unknown markup
    #[must_use]
    pub fn classify(id: Option<&str>, class: Option<&str>) -> Option<Self> {
        if id == Some(NATIVE_ID) {
            return Some(Self::Native);
        }
        class
            .filter(|c| c.split_whitespace().any(|token| token == RICH_TEXT_CLASS))
            .map(|_| Self::RichText)
    }

    /// Read the node's attributes and classify it
    pub async fn detect(driver: &dyn PageDriver, resolved: &Resolved) -> RegflowResult<Self> {
        let id = driver.attribute(&resolved.path, "id").await?;
        let class = driver.attribute(&resolved.path, "class").await?;
        Self::classify(id.as_deref(), class.as_deref()).ok_or_else(|| {
            RegflowError::UnexpectedVariant {
                role: resolved.role.clone(),
                observed: format!(
                    "tag={} id={} class={}",
                    resolved.state.tag,
                    id.as_deref().unwrap_or("-"),
                    class.as_deref().unwrap_or("-")
                ),
            }
        })
    }

    /// Node that receives the keystrokes
    #[must_use]
    pub fn input_path(self, field: &NodePath) -> NodePath {
        match self {
            Self::Native => field.clone(),
            Self::RichText => field.child(Selector::xpath(RICH_TEXT_DIGITS)),
        }
    }

    /// Effects that enter `number` into this variant.
    ///
    /// `shown` is what the field holds before input. The native input comes
    /// pre-filled with a dialing code, so only the rest of the number is
    /// typed when it matches; otherwise the field is cleared first.
    #[must_use]
    pub fn input_effects(self, number: &str, shown: &str) -> Vec<Effect> {
        match self {
            Self::Native => match number.strip_prefix(shown) {
                Some(rest) => vec![Effect::Type(rest.to_string())],
                None => vec![Effect::Clear, Effect::Type(number.to_string())],
            },
            Self::RichText => vec![
                Effect::Clear,
                Effect::SelectAll,
                Effect::Type(number.to_string()),
            ],
        }
    }
}

impl fmt::Display for InputVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::RichText => f.write_str("rich-text"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::locator::{resolve_once, LogicalElement};
    use crate::mock::{MockDom, MockDriver};

    #[test]
    fn test_classify() {
        assert_eq!(
            InputVariant::classify(Some(NATIVE_ID), Some("input-field-input")),
            Some(InputVariant::Native)
        );
        assert_eq!(
            InputVariant::classify(None, Some("input-field input-field-phone")),
            Some(InputVariant::RichText)
        );
        assert_eq!(InputVariant::classify(Some("other"), Some("input-field")), None);
        assert_eq!(InputVariant::classify(None, Some("input-field-phoney")), None);
    }

    #[test]
    fn test_native_types_after_shown_dialing_code() {
        assert_eq!(
            InputVariant::Native.input_effects("+79992119999", "+7"),
            vec![Effect::Type("9992119999".to_string())]
        );
        assert_eq!(
            InputVariant::Native.input_effects("+442071838750", "+44"),
            vec![Effect::Type("2071838750".to_string())]
        );
    }

    #[test]
    fn test_native_replaces_foreign_dialing_code() {
        assert_eq!(
            InputVariant::Native.input_effects("+442071838750", "+7"),
            vec![Effect::Clear, Effect::Type("+442071838750".to_string())]
        );
    }

    #[test]
    fn test_rich_text_overwrites_full_number() {
        assert_eq!(
            InputVariant::RichText.input_effects("+79992119999", "+7 "),
            vec![
                Effect::Clear,
                Effect::SelectAll,
                Effect::Type("+79992119999".to_string())
            ]
        );
    }

    #[test]
    fn test_rich_text_targets_digit_surface() {
        let field = NodePath::new(Selector::xpath("//phone"));
        assert_eq!(InputVariant::Native.input_path(&field), field);
        assert_eq!(
            InputVariant::RichText.input_path(&field),
            field.child(Selector::xpath(RICH_TEXT_DIGITS))
        );
    }

    #[tokio::test]
    async fn test_unknown_markup_is_unexpected_variant() {
        let mut dom = MockDom::new();
        dom.node("input")
            .matches(Selector::xpath("//phone"))
            .attr("id", "login-phone")
            .insert();
        let driver = MockDriver::new(dom);
        let element = LogicalElement::new("phone input", Selector::xpath("//phone"));
        let resolved = resolve_once(&driver, &element).await.unwrap().unwrap();

        let err = InputVariant::detect(&driver, &resolved).await.unwrap_err();
        match err {
            RegflowError::UnexpectedVariant { role, observed } => {
                assert_eq!(role, "phone input");
                assert!(observed.contains("login-phone"));
            }
            other => panic!("expected UnexpectedVariant, got {other:?}"),
        }
    }
}
