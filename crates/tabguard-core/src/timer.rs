#![forbid(unsafe_code)]

//! Single-shot, cancellable redirect.
//!
//! # Invariants
//!
//! 1. At most one redirect is pending. Arming while armed cancels the old
//!    timer first.
//! 2. Every armed timer carries a fresh [`TimerToken`]. A fire notification
//!    whose token is not the pending one is ignored, so a cancelled timer can
//!    never navigate even if the host delivers its callback late.
//! 3. Firing releases the pending handle before navigating.
//! 4. Dropping the timer cancels whatever is pending.

use core::time::Duration;
use std::fmt;

/// Identity of one armed timer. Never reused within a [`RedirectTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

impl TimerToken {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Errors reported by a [`TimerScheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The host has no timer facility (no window).
    Unavailable(String),
    /// The host refused to schedule.
    Rejected(String),
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "timers unavailable: {msg}"),
            Self::Rejected(msg) => write!(f, "timer rejected: {msg}"),
        }
    }
}

impl std::error::Error for ScheduleError {}

/// Host timer facility.
///
/// When a scheduled timer elapses, the host reports its token back through
/// the owner's fire entry point (`GuardMachine::on_timer_fired`).
pub trait TimerScheduler {
    fn schedule(&mut self, token: TimerToken, delay: Duration) -> Result<(), ScheduleError>;

    /// Cancel a scheduled timer. Unknown tokens are ignored.
    fn cancel(&mut self, token: TimerToken);
}

/// Navigation failure reported by a [`Navigator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationError(pub String);

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "navigation failed: {}", self.0)
    }
}

impl std::error::Error for NavigationError {}

/// Performs hard, history-replacing navigations.
pub trait Navigator {
    fn replace(&mut self, url: &str) -> Result<(), NavigationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingRedirect {
    token: TimerToken,
    delay: Duration,
}

/// Owns the single optional pending redirect.
#[derive(Debug)]
pub struct RedirectTimer<T: TimerScheduler, N: Navigator> {
    scheduler: T,
    navigator: N,
    destination: String,
    pending: Option<PendingRedirect>,
    next_token: u64,
}

impl<T: TimerScheduler, N: Navigator> RedirectTimer<T, N> {
    #[must_use]
    pub fn new(scheduler: T, navigator: N, destination: impl Into<String>) -> Self {
        Self {
            scheduler,
            navigator,
            destination: destination.into(),
            pending: None,
            next_token: 1,
        }
    }

    /// Schedule the redirect, replacing any pending one.
    ///
    /// Returns `false` if the host refused to schedule; the timer is then idle.
    pub fn arm(&mut self, delay: Duration) -> bool {
        self.cancel();
        let token = TimerToken(self.next_token);
        self.next_token = self.next_token.wrapping_add(1);
        match self.scheduler.schedule(token, delay) {
            Ok(()) => {
                crate::debug!(token = token.get(), delay_ms = delay.as_millis() as u64, "redirect armed");
                self.pending = Some(PendingRedirect { token, delay });
                true
            }
            Err(err) => {
                crate::warn!(error = %err, "redirect timer unavailable");
                false
            }
        }
    }

    /// Cancel the pending redirect. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        self.scheduler.cancel(pending.token);
        crate::debug!(token = pending.token.get(), "redirect cancelled");
        true
    }

    /// Host notification that a scheduled timer elapsed.
    ///
    /// Returns `true` if this token was the pending one and the redirect ran.
    pub fn on_fired(&mut self, token: TimerToken) -> bool {
        match self.pending {
            Some(pending) if pending.token == token => self.fire(),
            _ => {
                crate::trace!(token = token.get(), "stale redirect timer ignored");
                false
            }
        }
    }

    /// Release any pending handle, then navigate to the destination.
    ///
    /// Returns whether the navigation was accepted by the host.
    pub fn fire(&mut self) -> bool {
        self.cancel();
        match self.navigator.replace(&self.destination) {
            Ok(()) => {
                crate::info!(destination = %self.destination, "redirecting");
                true
            }
            Err(err) => {
                crate::warn!(error = %err, "redirect navigation failed");
                false
            }
        }
    }

    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub fn pending_token(&self) -> Option<TimerToken> {
        self.pending.map(|p| p.token)
    }

    /// Delay the pending redirect was armed with.
    #[must_use]
    pub fn pending_delay(&self) -> Option<Duration> {
        self.pending.map(|p| p.delay)
    }

    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn scheduler(&self) -> &T {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut T {
        &mut self.scheduler
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }
}

impl<T: TimerScheduler, N: Navigator> Drop for RedirectTimer<T, N> {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Deterministic host pieces
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScheduledEntry {
    token: TimerToken,
    due: Duration,
}

/// Timer facility driven by an explicit monotonic clock.
///
/// Time only moves through [`ManualScheduler::advance`], so tests and
/// headless hosts control exactly which timers elapse.
#[derive(Debug, Default, Clone)]
pub struct ManualScheduler {
    now: Duration,
    entries: Vec<ScheduledEntry>,
    scheduled_total: u64,
}

impl ManualScheduler {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
            entries: Vec::new(),
            scheduled_total: 0,
        }
    }

    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Advance the clock and drain every timer that is now due, earliest first.
    pub fn advance(&mut self, dt: Duration) -> Vec<TimerToken> {
        self.now = self.now.saturating_add(dt);
        let now = self.now;
        let mut due: Vec<ScheduledEntry> = Vec::new();
        self.entries.retain(|entry| {
            if entry.due <= now {
                due.push(*entry);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|entry| (entry.due, entry.token));
        due.into_iter().map(|entry| entry.token).collect()
    }

    /// Timers scheduled and neither cancelled nor elapsed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    /// Absolute deadline of a scheduled timer.
    #[must_use]
    pub fn deadline(&self, token: TimerToken) -> Option<Duration> {
        self.entries
            .iter()
            .find(|entry| entry.token == token)
            .map(|entry| entry.due)
    }

    /// Total number of `schedule` calls ever accepted.
    #[must_use]
    pub const fn scheduled_total(&self) -> u64 {
        self.scheduled_total
    }
}

impl TimerScheduler for ManualScheduler {
    fn schedule(&mut self, token: TimerToken, delay: Duration) -> Result<(), ScheduleError> {
        self.entries.push(ScheduledEntry {
            token,
            due: self.now.saturating_add(delay),
        });
        self.scheduled_total += 1;
        Ok(())
    }

    fn cancel(&mut self, token: TimerToken) {
        self.entries.retain(|entry| entry.token != token);
    }
}

/// Navigator that records destinations instead of leaving the page.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordingNavigator {
    pub visits: Vec<String>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Navigator for RecordingNavigator {
    fn replace(&mut self, url: &str) -> Result<(), NavigationError> {
        self.visits.push(url.to_owned());
        Ok(())
    }
}
