#![forbid(unsafe_code)]

//! The guard state machine.
//!
//! [`GuardMachine`] turns the four host signals into calls on the
//! [`Preferences`], [`OverlayController`] and [`RedirectTimer`] it owns.
//!
//! # Transitions
//!
//! | Signal | Precondition (read fresh) | Effect |
//! |--------|---------------------------|--------|
//! | `beforeunload` | close protection on | confirm unload |
//! | hidden | redirect on (or absent) | arm redirect, hide overlay |
//! | hidden | redirect off | show overlay |
//! | visible | - | cancel redirect, hide overlay |
//! | focus | - | cancel redirect |
//! | `E` / `e` | overlay shown | hide overlay |
//! | Space | overlay shown | cancel redirect, navigate now |
//!
//! Preferences are re-read from the store at the start of every dispatch; the
//! machine never carries a flag value from one event to the next.
//!
//! # Invariants
//!
//! 1. At most one redirect is pending, and it is armed at most once per hidden
//!    period. Nothing is armed while a guard-initiated navigation is in flight.
//! 2. After a `visible` dispatch, no redirect is pending and the overlay is
//!    hidden.
//! 3. The overlay is never shown while a redirect is pending.
//! 4. A redirect the guard starts itself is never blocked by its own unload
//!    confirmation.

use core::time::Duration;

use serde::Serialize;

use crate::config::GuardConfig;
use crate::overlay::{OverlayController, OverlaySurface};
use crate::prefs::{PreferenceSnapshot, PreferenceStore, Preferences};
use crate::signal::{Effects, GuardKey, Signal, Visibility};
use crate::timer::{ManualScheduler, Navigator, RedirectTimer, TimerScheduler, TimerToken};

/// Redirect axis of the observable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectPhase {
    Idle,
    Armed,
}

/// Observable state after a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardState {
    pub visibility: Visibility,
    pub redirect: RedirectPhase,
    pub overlay_visible: bool,
}

/// Host pieces a [`GuardMachine`] is built from.
///
/// `overlay` is `None` when the host found no place to mount a cover; the
/// overlay feature is then inert.
#[derive(Debug)]
pub struct GuardParts<S, O, T, N> {
    pub store: S,
    pub overlay: Option<O>,
    pub timers: T,
    pub navigator: N,
}

/// Event-driven coordinator of preferences, overlay and redirect timer.
#[derive(Debug)]
pub struct GuardMachine<S, O, T, N>
where
    S: PreferenceStore,
    O: OverlaySurface,
    T: TimerScheduler,
    N: Navigator,
{
    config: GuardConfig,
    prefs: Preferences<S>,
    overlay: OverlayController<O>,
    timer: RedirectTimer<T, N>,
    visibility: Visibility,
    leaving: bool,
    started: bool,
}

impl<S, O, T, N> GuardMachine<S, O, T, N>
where
    S: PreferenceStore,
    O: OverlaySurface,
    T: TimerScheduler,
    N: Navigator,
{
    #[must_use]
    pub fn new(config: GuardConfig, parts: GuardParts<S, O, T, N>) -> Self {
        let overlay = match parts.overlay {
            Some(surface) => OverlayController::new(surface),
            None => {
                crate::warn!("no overlay surface, cover disabled");
                OverlayController::inert()
            }
        };
        let timer = RedirectTimer::new(parts.timers, parts.navigator, &config.destination_url);
        Self {
            config,
            prefs: Preferences::new(parts.store),
            overlay,
            timer,
            visibility: Visibility::Visible,
            leaving: false,
            started: false,
        }
    }

    /// One-time page initialization: default flags and the overlay element.
    ///
    /// Safe to call more than once; only the first call does work.
    pub fn start(&mut self, initial: Visibility) {
        if self.started {
            return;
        }
        self.started = true;
        self.visibility = initial;
        if self.prefs.ensure_defaults() {
            crate::debug!("close protection default written");
        }
        let overlay_ready = self.overlay.ensure_created();
        crate::info!(
            overlay_ready,
            delay_ms = self.config.delay.as_millis() as u64,
            "guard active"
        );
    }

    /// Handle one host signal.
    pub fn dispatch(&mut self, signal: Signal) -> Effects {
        let span = crate::debug_span!("guard_dispatch", event = signal.event_name());
        let _guard = span.enter();

        let prefs = self.prefs.snapshot();
        let effects = match signal {
            Signal::BeforeUnload => self.on_before_unload(prefs),
            Signal::VisibilityChange(visibility) => self.on_visibility(visibility, prefs),
            Signal::Focus => self.on_focus(),
            Signal::KeyDown(key) => self.on_key(key),
        };
        crate::trace!(effects = effects.bits(), "dispatch complete");
        effects
    }

    fn on_before_unload(&mut self, prefs: PreferenceSnapshot) -> Effects {
        if self.leaving {
            return Effects::empty();
        }
        if prefs.close_protection {
            crate::debug!("unload confirmation requested");
            Effects::CONFIRM_UNLOAD
        } else {
            Effects::empty()
        }
    }

    fn on_visibility(&mut self, visibility: Visibility, prefs: PreferenceSnapshot) -> Effects {
        self.visibility = visibility;
        let mut effects = Effects::empty();
        match visibility {
            Visibility::Hidden if prefs.redirect_enabled => {
                if !self.leaving && !self.timer.is_armed() && self.timer.arm(self.config.delay) {
                    effects |= Effects::TIMER_ARMED;
                }
                if self.overlay.hide() {
                    effects |= Effects::OVERLAY_HIDDEN;
                }
            }
            Visibility::Hidden => {
                if self.timer.cancel() {
                    effects |= Effects::TIMER_CANCELLED;
                }
                if self.overlay.show() {
                    effects |= Effects::OVERLAY_SHOWN;
                }
            }
            Visibility::Visible => {
                self.leaving = false;
                if self.timer.cancel() {
                    effects |= Effects::TIMER_CANCELLED;
                }
                if self.overlay.hide() {
                    effects |= Effects::OVERLAY_HIDDEN;
                }
            }
        }
        effects
    }

    fn on_focus(&mut self) -> Effects {
        if self.timer.cancel() {
            Effects::TIMER_CANCELLED
        } else {
            Effects::empty()
        }
    }

    fn on_key(&mut self, key: GuardKey) -> Effects {
        if !self.overlay.is_visible() {
            return Effects::empty();
        }
        match key {
            GuardKey::Dismiss => {
                self.overlay.hide();
                Effects::OVERLAY_HIDDEN | Effects::CONSUMED
            }
            GuardKey::RedirectNow => self.redirect_now() | Effects::CONSUMED,
            GuardKey::Other => Effects::empty(),
        }
    }

    /// Cancel any pending timer and navigate immediately.
    pub fn redirect_now(&mut self) -> Effects {
        let mut effects = Effects::empty();
        if self.timer.cancel() {
            effects |= Effects::TIMER_CANCELLED;
        }
        if self.navigate() {
            effects |= Effects::NAVIGATED;
        }
        effects
    }

    /// Host notification that a scheduled redirect elapsed.
    pub fn on_timer_fired(&mut self, token: TimerToken) -> Effects {
        if self.timer.pending_token() != Some(token) {
            crate::trace!(token = token.get(), "ignoring stale timer");
            return Effects::empty();
        }
        if self.navigate_with(|timer| timer.on_fired(token)) {
            Effects::NAVIGATED
        } else {
            Effects::empty()
        }
    }

    fn navigate(&mut self) -> bool {
        self.navigate_with(RedirectTimer::fire)
    }

    // The unload prompt must already be disarmed when the host starts the
    // navigation, since `beforeunload` may be delivered while it runs.
    fn navigate_with(&mut self, go: impl FnOnce(&mut RedirectTimer<T, N>) -> bool) -> bool {
        self.leaving = true;
        let navigated = go(&mut self.timer);
        self.leaving = navigated;
        navigated
    }

    /// Cancel any pending redirect and uncover the page.
    pub fn teardown(&mut self) {
        self.timer.cancel();
        self.overlay.hide();
    }

    #[must_use]
    pub fn state(&self) -> GuardState {
        GuardState {
            visibility: self.visibility,
            redirect: if self.timer.is_armed() {
                RedirectPhase::Armed
            } else {
                RedirectPhase::Idle
            },
            overlay_visible: self.overlay.is_visible(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Whether a guard-initiated navigation is in flight.
    #[must_use]
    pub const fn is_leaving(&self) -> bool {
        self.leaving
    }

    pub fn preferences(&self) -> &Preferences<S> {
        &self.prefs
    }

    pub fn preferences_mut(&mut self) -> &mut Preferences<S> {
        &mut self.prefs
    }

    pub fn overlay(&self) -> &OverlayController<O> {
        &self.overlay
    }

    pub fn timer(&self) -> &RedirectTimer<T, N> {
        &self.timer
    }
}

impl<S, O, N> GuardMachine<S, O, ManualScheduler, N>
where
    S: PreferenceStore,
    O: OverlaySurface,
    N: Navigator,
{
    /// Advance the deterministic clock and fire every redirect now due.
    pub fn advance_time(&mut self, dt: Duration) -> Effects {
        let due = self.timer.scheduler_mut().advance(dt);
        due.into_iter()
            .fold(Effects::empty(), |acc, token| acc | self.on_timer_fired(token))
    }
}
