#![forbid(unsafe_code)]

//! Guard diagnostics.
//!
//! Call sites write `crate::warn!(...)` and friends. With the `tracing`
//! feature these are the `tracing` macros and events carry structured fields
//! (`token`, `delay_ms`, `store`, `key`, `error`). Without it the same names
//! expand to nothing, so a wasm bundle that does not want logging pays for
//! none of it.
//!
//! | Level | Used for |
//! |-------|----------|
//! | `warn` | store degradation, missing DOM targets, refused timers |
//! | `info` | guard start, guard-initiated navigation, queued notice |
//! | `debug` | arm and cancel, unload confirmation, overlay install |
//! | `trace` | stale timer tokens, per-dispatch effects |
//!
//! Each [`GuardMachine::dispatch`](crate::guard::GuardMachine::dispatch) runs
//! inside a `guard_dispatch` debug span tagged with the DOM event name.

#[cfg(feature = "tracing")]
pub use tracing::{debug, debug_span, info, trace, warn};

#[cfg(not(feature = "tracing"))]
mod disabled {
    /// Discarded when the `tracing` feature is off.
    #[macro_export]
    macro_rules! trace {
        ($($field:tt)*) => {};
    }

    /// Discarded when the `tracing` feature is off.
    #[macro_export]
    macro_rules! debug {
        ($($field:tt)*) => {};
    }

    /// Discarded when the `tracing` feature is off.
    #[macro_export]
    macro_rules! info {
        ($($field:tt)*) => {};
    }

    /// Discarded when the `tracing` feature is off.
    #[macro_export]
    macro_rules! warn {
        ($($field:tt)*) => {};
    }

    /// Yields a [`DispatchSpan`](crate::logging::DispatchSpan) placeholder.
    #[macro_export]
    macro_rules! debug_span {
        ($($field:tt)*) => {
            $crate::logging::DispatchSpan
        };
    }
}

/// Placeholder for the dispatch span when the `tracing` feature is off.
#[cfg(not(feature = "tracing"))]
#[derive(Debug, Clone, Copy)]
pub struct DispatchSpan;

#[cfg(not(feature = "tracing"))]
impl DispatchSpan {
    /// Mirrors `tracing::Span::enter`; the returned guard does nothing.
    #[must_use]
    pub fn enter(&self) -> EnteredDispatch {
        EnteredDispatch
    }
}

/// Guard returned by [`DispatchSpan::enter`].
#[cfg(not(feature = "tracing"))]
#[derive(Debug)]
pub struct EnteredDispatch;

#[cfg(test)]
mod tests {
    #[test]
    fn call_sites_compile_with_structured_fields() {
        let key = "tabProtectionState";
        crate::warn!(store = "MemoryStore", key, error = %"quota", "preference write dropped");
        crate::debug!(token = 3_u64, delay_ms = 65_u64, "redirect armed");
        crate::info!(overlay_ready = true, "guard active");
        crate::trace!(effects = 0_u8, "dispatch complete");

        let span = crate::debug_span!("guard_dispatch", event = "focus");
        let _entered = span.enter();
        let _ = key;
    }
}
