#![forbid(unsafe_code)]

//! Host signals consumed by the guard and the effects it reports back.
//!
//! DOM strings are normalized here (`document.visibilityState`,
//! `KeyboardEvent.key`) so the state machine only sees closed enums.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// `document.visibilityState`, collapsed to the two states the guard handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

impl Visibility {
    /// Anything other than `"hidden"` (including `"prerender"`) counts as visible.
    #[must_use]
    pub fn from_dom_str(state: &str) -> Self {
        if state.eq_ignore_ascii_case("hidden") {
            Self::Hidden
        } else {
            Self::Visible
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Hidden => "hidden",
        }
    }
}

/// Keys with a meaning while the overlay is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardKey {
    /// `E` / `e`: dismiss the overlay.
    Dismiss,
    /// Space: redirect immediately.
    RedirectNow,
    /// Anything else.
    Other,
}

impl GuardKey {
    /// Normalize a DOM `KeyboardEvent.key` value.
    #[must_use]
    pub fn from_dom_key(key: &str) -> Self {
        match key {
            " " => Self::RedirectNow,
            k if k.eq_ignore_ascii_case("e") => Self::Dismiss,
            _ => Self::Other,
        }
    }
}

/// One browser signal, as delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// `beforeunload` on the window.
    BeforeUnload,
    /// `visibilitychange` on the document, with the new state.
    VisibilityChange(Visibility),
    /// `focus` on the window.
    Focus,
    /// `keydown` on the document.
    KeyDown(GuardKey),
}

impl Signal {
    /// DOM event name, for logs.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::BeforeUnload => "beforeunload",
            Self::VisibilityChange(_) => "visibilitychange",
            Self::Focus => "focus",
            Self::KeyDown(_) => "keydown",
        }
    }
}

bitflags! {
    /// What a dispatch did. The host acts on [`Effects::CONFIRM_UNLOAD`] and
    /// [`Effects::CONSUMED`]; the rest are for logs and tests.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Effects: u8 {
        /// Block the close: `preventDefault()` and set an empty `returnValue`.
        const CONFIRM_UNLOAD = 0b0000_0001;
        const TIMER_ARMED    = 0b0000_0010;
        const TIMER_CANCELLED = 0b0000_0100;
        const OVERLAY_SHOWN  = 0b0000_1000;
        const OVERLAY_HIDDEN = 0b0001_0000;
        const NAVIGATED      = 0b0010_0000;
        /// The event was handled; the host should `preventDefault()`.
        const CONSUMED       = 0b0100_0000;
    }
}

impl Effects {
    /// Whether the host must call `preventDefault()` on the event.
    #[must_use]
    pub const fn prevents_default(self) -> bool {
        self.intersects(Self::CONFIRM_UNLOAD.union(Self::CONSUMED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn visibility_from_dom() {
        assert_eq!(Visibility::from_dom_str("hidden"), Visibility::Hidden);
        assert_eq!(Visibility::from_dom_str("visible"), Visibility::Visible);
        assert_eq!(Visibility::from_dom_str("prerender"), Visibility::Visible);
        assert_eq!(Visibility::Hidden.as_str(), "hidden");
    }

    #[test]
    fn keys_are_case_insensitive_for_dismiss() {
        assert_eq!(GuardKey::from_dom_key("e"), GuardKey::Dismiss);
        assert_eq!(GuardKey::from_dom_key("E"), GuardKey::Dismiss);
        assert_eq!(GuardKey::from_dom_key(" "), GuardKey::RedirectNow);
        assert_eq!(GuardKey::from_dom_key("Spacebar"), GuardKey::Other);
        assert_eq!(GuardKey::from_dom_key("Escape"), GuardKey::Other);
        assert_eq!(GuardKey::from_dom_key(""), GuardKey::Other);
    }

    #[test]
    fn prevents_default_only_for_confirm_or_consumed() {
        assert!(!Effects::empty().prevents_default());
        assert!(!(Effects::TIMER_ARMED | Effects::OVERLAY_SHOWN).prevents_default());
        assert!(Effects::CONFIRM_UNLOAD.prevents_default());
        assert!((Effects::CONSUMED | Effects::NAVIGATED).prevents_default());
    }

    #[test]
    fn event_names() {
        assert_eq!(Signal::BeforeUnload.event_name(), "beforeunload");
        assert_eq!(
            Signal::VisibilityChange(Visibility::Hidden).event_name(),
            "visibilitychange"
        );
        assert_eq!(Signal::KeyDown(GuardKey::Other).event_name(), "keydown");
    }
}
