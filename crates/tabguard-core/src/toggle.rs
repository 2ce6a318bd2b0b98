#![forbid(unsafe_code)]

//! Binding between the close-protection flag and its on-page switch.
//!
//! The binding holds no copy of the flag: every call reads the store, so a
//! switch rendered from [`ToggleBinding::toggle`] always shows what was
//! actually persisted.
//!
//! The first-enable notice is queued rather than shown. Hosts collect it with
//! [`ToggleBinding::take_notice`] once they have released any borrow of the
//! guard, since showing it may run page code that calls back into the guard.

use crate::prefs::{PreferenceStore, Preferences};

/// Shown once per origin, the first time close protection is seen enabled.
pub const FIRST_ENABLE_NOTICE: &str =
    "If redirect is on, it will still redirect, it will not prevent manual closing.";

/// Rendered state of the switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToggleState {
    Active,
    Disabled,
}

impl ToggleState {
    #[must_use]
    pub const fn from_enabled(enabled: bool) -> Self {
        if enabled { Self::Active } else { Self::Disabled }
    }

    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Status label next to the switch.
    #[must_use]
    pub const fn status_text(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Disabled => "DISABLED",
        }
    }

    /// SVG path for the switch icon: a check mark when active, a struck circle
    /// otherwise.
    #[must_use]
    pub const fn icon_path(self) -> &'static str {
        match self {
            Self::Active => "M9 12l2 2 4-4m6 2a9 9 0 11-18 0 9 9 0 0118 0z",
            Self::Disabled => {
                "M18.364 18.364A9 9 0 005.636 5.636m12.728 12.728A9 9 0 015.636 5.636m12.728 12.728L5.636 5.636"
            }
        }
    }
}

/// Visible switch, status text and icon.
pub trait ToggleView {
    fn render(&mut self, state: ToggleState);
}

/// Reflects and mutates the close-protection flag through a [`ToggleView`].
#[derive(Debug)]
pub struct ToggleBinding<V> {
    view: V,
    pending_notice: Option<&'static str>,
}

impl<V: ToggleView> ToggleBinding<V> {
    #[must_use]
    pub fn new(view: V) -> Self {
        Self {
            view,
            pending_notice: None,
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Render the persisted state, as on page load.
    pub fn sync<S: PreferenceStore>(&mut self, prefs: &mut Preferences<S>) -> ToggleState {
        let state = ToggleState::from_enabled(prefs.close_protection());
        self.render(prefs, state)
    }

    /// Flip the persisted flag and render the result.
    pub fn toggle<S: PreferenceStore>(&mut self, prefs: &mut Preferences<S>) -> ToggleState {
        let enabled = !prefs.close_protection();
        self.set(prefs, enabled)
    }

    /// Persist an explicit value and render the result.
    pub fn set<S: PreferenceStore>(&mut self, prefs: &mut Preferences<S>, enabled: bool) -> ToggleState {
        prefs.set_close_protection(enabled);
        let state = ToggleState::from_enabled(prefs.close_protection());
        if state.is_active() != enabled {
            crate::warn!(enabled, "close protection change was not persisted");
        }
        self.render(prefs, state)
    }

    fn render<S: PreferenceStore>(&mut self, prefs: &mut Preferences<S>, state: ToggleState) -> ToggleState {
        if state.is_active() && prefs.mark_warning_shown() {
            crate::info!("first close protection notice queued");
            self.pending_notice = Some(FIRST_ENABLE_NOTICE);
        }
        self.view.render(state);
        state
    }

    /// Hand over the queued one-time notice, if any.
    pub fn take_notice(&mut self) -> Option<&'static str> {
        self.pending_notice.take()
    }
}

/// View that records renders.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordingToggleView {
    pub renders: Vec<ToggleState>,
}

impl RecordingToggleView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn last(&self) -> Option<ToggleState> {
        self.renders.last().copied()
    }
}

impl ToggleView for RecordingToggleView {
    fn render(&mut self, state: ToggleState) {
        self.renders.push(state);
    }
}
