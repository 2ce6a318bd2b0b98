#![forbid(unsafe_code)]
#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

//! Handing a browser callback to a guard the callback does not own.

use std::cell::RefCell;
use std::rc::Weak;

/// Outcome of [`deliver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// The guard ran the callback.
    Delivered,
    /// The guard is gone; nothing left to notify.
    Orphaned,
    /// The guard is mid-dispatch. The caller must deliver again later, or
    /// whatever the callback reports stays outstanding.
    Busy,
}

/// Run `run` on the guard if it is still alive and not already borrowed.
pub(crate) fn deliver<G>(target: &Weak<RefCell<G>>, run: impl FnOnce(&mut G)) -> Delivery {
    let Some(guard) = target.upgrade() else {
        return Delivery::Orphaned;
    };
    let Ok(mut borrowed) = guard.try_borrow_mut() else {
        return Delivery::Busy;
    };
    run(&mut borrowed);
    Delivery::Delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    #[test]
    fn delivers_to_idle_guard() {
        let guard = Rc::new(RefCell::new(Vec::<u64>::new()));
        let weak = Rc::downgrade(&guard);
        assert_eq!(deliver(&weak, |fired| fired.push(7)), Delivery::Delivered);
        assert_eq!(*guard.borrow(), vec![7]);
    }

    #[test]
    fn busy_guard_keeps_the_callback_for_a_later_attempt() {
        let guard = Rc::new(RefCell::new(Vec::<u64>::new()));
        let weak = Rc::downgrade(&guard);
        {
            let _dispatching = guard.borrow_mut();
            assert_eq!(deliver(&weak, |fired| fired.push(7)), Delivery::Busy);
        }
        assert!(guard.borrow().is_empty());

        // The retry after the dispatch returns lands.
        assert_eq!(deliver(&weak, |fired| fired.push(7)), Delivery::Delivered);
        assert_eq!(*guard.borrow(), vec![7]);
    }

    #[test]
    fn dropped_guard_is_orphaned() {
        let guard = Rc::new(RefCell::new(Vec::<u64>::new()));
        let weak = Rc::downgrade(&guard);
        drop(guard);
        assert_eq!(deliver(&weak, |fired| fired.push(7)), Delivery::Orphaned);
    }
}
