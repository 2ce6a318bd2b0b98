#![forbid(unsafe_code)]

//! Full-viewport cover shown while a hidden tab is not being redirected.
//!
//! [`OverlayController`] owns at most one [`OverlaySurface`]. The surface is
//! installed lazily, once, and then only toggled. A surface that cannot be
//! installed is dropped and the overlay feature stays inert for the rest of the
//! page lifetime.

use std::fmt;

/// Errors reported by an [`OverlaySurface`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayError {
    /// A required element (document body, head) does not exist.
    MissingTarget(String),
    /// The host rejected a DOM mutation.
    Dom(String),
}

impl fmt::Display for OverlayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTarget(what) => write!(f, "overlay target missing: {what}"),
            Self::Dom(msg) => write!(f, "overlay dom error: {msg}"),
        }
    }
}

impl std::error::Error for OverlayError {}

/// Host element that can cover the page.
pub trait OverlaySurface {
    /// Create the element and its styling. Called at most once per controller.
    fn install(&mut self) -> Result<(), OverlayError>;

    /// Show or hide the installed element.
    fn set_visible(&mut self, visible: bool) -> Result<(), OverlayError>;
}

/// Lazily-installed, idempotent overlay.
#[derive(Debug)]
pub struct OverlayController<O> {
    surface: Option<O>,
    installed: bool,
    visible: bool,
}

impl<O: OverlaySurface> OverlayController<O> {
    #[must_use]
    pub fn new(surface: O) -> Self {
        Self {
            surface: Some(surface),
            installed: false,
            visible: false,
        }
    }

    /// A controller with no surface; every call is a no-op.
    #[must_use]
    pub fn inert() -> Self {
        Self {
            surface: None,
            installed: false,
            visible: false,
        }
    }

    /// Install the surface if not done yet. Returns whether it is usable.
    pub fn ensure_created(&mut self) -> bool {
        if self.installed {
            return true;
        }
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        match surface.install() {
            Ok(()) => {
                self.installed = true;
                crate::debug!("overlay installed");
                true
            }
            Err(err) => {
                crate::warn!(error = %err, "overlay unavailable, cover disabled");
                self.surface = None;
                false
            }
        }
    }

    /// Cover the page. Returns `true` if the overlay was hidden before.
    pub fn show(&mut self) -> bool {
        self.set_visible(true)
    }

    /// Uncover the page. Returns `true` if the overlay was shown before.
    pub fn hide(&mut self) -> bool {
        self.set_visible(false)
    }

    fn set_visible(&mut self, visible: bool) -> bool {
        if self.visible == visible || !self.ensure_created() {
            return false;
        }
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        match surface.set_visible(visible) {
            Ok(()) => {
                self.visible = visible;
                true
            }
            Err(err) => {
                crate::warn!(error = %err, visible, "overlay toggle failed");
                false
            }
        }
    }

    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether a surface is still attached (it may not be installed yet).
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.surface.is_some()
    }

    #[must_use]
    pub fn surface(&self) -> Option<&O> {
        self.surface.as_ref()
    }
}

/// Surface that records calls instead of touching a DOM.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HeadlessOverlay {
    pub installs: u32,
    pub visible: bool,
    pub toggles: u32,
}

impl HeadlessOverlay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OverlaySurface for HeadlessOverlay {
    fn install(&mut self) -> Result<(), OverlayError> {
        self.installs += 1;
        Ok(())
    }

    fn set_visible(&mut self, visible: bool) -> Result<(), OverlayError> {
        self.visible = visible;
        self.toggles += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    struct BrokenSurface;

    impl OverlaySurface for BrokenSurface {
        fn install(&mut self) -> Result<(), OverlayError> {
            Err(OverlayError::MissingTarget("body".into()))
        }

        fn set_visible(&mut self, _visible: bool) -> Result<(), OverlayError> {
            unreachable!("never installed")
        }
    }

    #[test]
    fn ensure_created_installs_once() {
        let mut overlay = OverlayController::new(HeadlessOverlay::new());
        assert!(overlay.ensure_created());
        assert!(overlay.ensure_created());
        overlay.show();
        overlay.hide();
        overlay.show();
        assert_eq!(overlay.surface().unwrap().installs, 1);
    }

    #[test]
    fn show_and_hide_are_idempotent() {
        let mut overlay = OverlayController::new(HeadlessOverlay::new());
        assert!(!overlay.hide());
        assert!(overlay.show());
        assert!(!overlay.show());
        assert!(overlay.is_visible());
        assert!(overlay.hide());
        assert!(!overlay.hide());
        assert!(!overlay.is_visible());
        assert_eq!(overlay.surface().unwrap().toggles, 2);
    }

    #[test]
    fn failed_install_makes_overlay_inert() {
        let mut overlay = OverlayController::new(BrokenSurface);
        assert!(overlay.is_available());
        assert!(!overlay.show());
        assert!(!overlay.is_available());
        assert!(!overlay.is_visible());
        assert!(!overlay.ensure_created());
    }

    #[test]
    fn inert_controller_ignores_calls() {
        let mut overlay = OverlayController::<HeadlessOverlay>::inert();
        assert!(!overlay.show());
        assert!(!overlay.is_visible());
        assert!(overlay.surface().is_none());
    }
}
