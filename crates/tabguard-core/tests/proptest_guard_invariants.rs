//! Property-based invariant tests for the guard state machine.
//!
//! Verifies, over arbitrary interleavings of signals, clock advances and
//! preference changes:
//! 1. The scheduler never holds more than one timer, and holds one exactly
//!    when the machine reports `Armed`.
//! 2. After a `visible` dispatch nothing is armed and the overlay is hidden.
//! 3. The overlay is only ever shown while the tab is hidden, and never while
//!    a redirect is pending.
//! 4. No navigation happens while the tab is visible.
//! 5. Without preference changes or focus events, the redirect is armed at
//!    most once between consecutive `visible` events.
//! 6. An absent redirect flag behaves exactly like `"true"`.

use core::time::Duration;

use proptest::prelude::*;
use tabguard_core::overlay::HeadlessOverlay;
use tabguard_core::prefs::MemoryStore;
use tabguard_core::timer::{ManualScheduler, RecordingNavigator};
use tabguard_core::{
    Effects, GuardConfig, GuardKey, GuardMachine, GuardParts, RedirectPhase, Signal, Visibility,
};

type HeadlessGuard = GuardMachine<MemoryStore, HeadlessOverlay, ManualScheduler, RecordingNavigator>;

#[derive(Debug, Clone)]
enum Op {
    Hide,
    Show,
    Focus,
    Key(GuardKey),
    BeforeUnload,
    Advance(u64),
    SetRedirect(bool),
    SetProtection(bool),
}

// ── Strategy helpers ──────────────────────────────────────────────────

fn arb_key() -> impl Strategy<Value = GuardKey> {
    prop_oneof![
        Just(GuardKey::Dismiss),
        Just(GuardKey::RedirectNow),
        Just(GuardKey::Other),
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Hide),
        3 => Just(Op::Show),
        1 => Just(Op::Focus),
        2 => arb_key().prop_map(Op::Key),
        1 => Just(Op::BeforeUnload),
        3 => (0u64..=150).prop_map(Op::Advance),
        1 => any::<bool>().prop_map(Op::SetRedirect),
        1 => any::<bool>().prop_map(Op::SetProtection),
    ]
}

fn arb_visibility_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Hide),
        Just(Op::Show),
        arb_key().prop_map(Op::Key),
        (0u64..=150).prop_map(Op::Advance),
    ]
}

fn guard(store: MemoryStore) -> HeadlessGuard {
    let mut guard = GuardMachine::new(
        GuardConfig::default().with_delay(Duration::from_millis(65)),
        GuardParts {
            store,
            overlay: Some(HeadlessOverlay::new()),
            timers: ManualScheduler::new(),
            navigator: RecordingNavigator::new(),
        },
    );
    guard.start(Visibility::Visible);
    guard
}

fn apply(guard: &mut HeadlessGuard, op: &Op) -> Effects {
    match op {
        Op::Hide => guard.dispatch(Signal::VisibilityChange(Visibility::Hidden)),
        Op::Show => guard.dispatch(Signal::VisibilityChange(Visibility::Visible)),
        Op::Focus => guard.dispatch(Signal::Focus),
        Op::Key(key) => guard.dispatch(Signal::KeyDown(*key)),
        Op::BeforeUnload => guard.dispatch(Signal::BeforeUnload),
        Op::Advance(ms) => guard.advance_time(Duration::from_millis(*ms)),
        Op::SetRedirect(on) => {
            guard.preferences_mut().set_redirect_enabled(*on);
            Effects::empty()
        }
        Op::SetProtection(on) => {
            guard.preferences_mut().set_close_protection(*on);
            Effects::empty()
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1–4. Structural invariants under arbitrary interleavings
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn structural_invariants_hold(ops in proptest::collection::vec(arb_op(), 0..64)) {
        let mut guard = guard(MemoryStore::new());
        for op in &ops {
            let was_visible = guard.state().visibility == Visibility::Visible;
            let effects = apply(&mut guard, op);
            let state = guard.state();

            let pending = guard.timer().scheduler().pending();
            prop_assert!(pending <= 1, "more than one timer after {:?}", op);
            prop_assert_eq!(pending == 1, state.redirect == RedirectPhase::Armed);

            if matches!(op, Op::Show) {
                prop_assert_eq!(state.redirect, RedirectPhase::Idle);
                prop_assert!(!state.overlay_visible);
            }

            if state.overlay_visible {
                prop_assert_eq!(state.visibility, Visibility::Hidden);
                prop_assert_eq!(state.redirect, RedirectPhase::Idle, "covered while armed after {:?}", op);
            }

            if was_visible && state.visibility == Visibility::Visible {
                prop_assert!(
                    !effects.contains(Effects::NAVIGATED),
                    "navigated while visible on {:?}", op
                );
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Armed at most once per hidden period
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn armed_at_most_once_between_visible_events(
        ops in proptest::collection::vec(arb_visibility_op(), 0..64),
    ) {
        let mut guard = guard(MemoryStore::new());
        let mut arms_since_visible = 0u32;
        for op in &ops {
            let effects = apply(&mut guard, op);
            if effects.contains(Effects::TIMER_ARMED) {
                arms_since_visible += 1;
            }
            prop_assert!(arms_since_visible <= 1, "re-armed within one hidden period");
            if matches!(op, Op::Show) {
                arms_since_visible = 0;
                prop_assert_eq!(guard.timer().scheduler().pending(), 0);
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Absent redirect flag == "true"
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn absent_redirect_flag_matches_true(
        ops in proptest::collection::vec(arb_visibility_op(), 0..48),
    ) {
        let mut absent = guard(MemoryStore::new());
        let mut explicit = guard(MemoryStore::with_entries([("redirectToggleState", "true")]));
        for op in &ops {
            let a = apply(&mut absent, op);
            let b = apply(&mut explicit, op);
            prop_assert_eq!(a, b, "diverged on {:?}", op);
            prop_assert_eq!(absent.state(), explicit.state());
        }
        prop_assert_eq!(
            &absent.timer().navigator().visits,
            &explicit.timer().navigator().visits
        );
    }
}
