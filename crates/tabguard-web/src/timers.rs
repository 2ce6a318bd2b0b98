#![forbid(unsafe_code)]

use core::time::Duration;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Weak;

use gloo_timers::callback::Timeout;
use tabguard_core::timer::{ScheduleError, TimerScheduler, TimerToken};

use crate::delivery::{Delivery, deliver};
use crate::wasm::WebGuard;

/// Largest delay `setTimeout` honors; longer values overflow to immediate.
const MAX_TIMEOUT_MS: u32 = i32::MAX as u32;

/// `setTimeout`-backed scheduler that reports elapsed tokens to the guard.
///
/// Dropping a [`Timeout`] clears it, so removing an entry is the cancel.
pub(crate) struct WebTimers {
    guard: Weak<RefCell<WebGuard>>,
    pending: HashMap<TimerToken, Timeout>,
}

impl WebTimers {
    pub(crate) fn new(guard: Weak<RefCell<WebGuard>>) -> Self {
        Self {
            guard,
            pending: HashMap::new(),
        }
    }
}

impl TimerScheduler for WebTimers {
    fn schedule(&mut self, token: TimerToken, delay: Duration) -> Result<(), ScheduleError> {
        if web_sys::window().is_none() {
            return Err(ScheduleError::Unavailable("no window".into()));
        }
        let millis = u32::try_from(delay.as_millis())
            .unwrap_or(MAX_TIMEOUT_MS)
            .min(MAX_TIMEOUT_MS);
        let guard = Weak::clone(&self.guard);
        let timeout = Timeout::new(millis, move || elapsed(&guard, token));
        self.pending.insert(token, timeout);
        Ok(())
    }

    fn cancel(&mut self, token: TimerToken) {
        self.pending.remove(&token);
    }
}

// A fire that finds the guard mid-dispatch is re-queued at zero delay rather
// than dropped; otherwise the token would stay pending with no timer behind it.
fn elapsed(guard: &Weak<RefCell<WebGuard>>, token: TimerToken) {
    if deliver(guard, |machine| {
        machine.on_timer_fired(token);
    }) == Delivery::Busy
    {
        tracing::debug!(token = token.get(), "guard busy, redelivering redirect timer");
        let guard = Weak::clone(guard);
        let _ = Timeout::new(0, move || elapsed(&guard, token)).forget();
    }
}
