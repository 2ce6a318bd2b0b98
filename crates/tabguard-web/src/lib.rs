#![forbid(unsafe_code)]

//! WASM frontend for tabguard.
//!
//! Binds the host seams of `tabguard-core` to the browser:
//! - preferences to `localStorage`,
//! - the cover to a fixed, full-viewport element,
//! - redirect timers to `setTimeout`,
//! - navigation to `location.replace`,
//!
//! and installs the `beforeunload`, `visibilitychange`, `focus` and `keydown`
//! listeners that feed the state machine.

mod delivery;
pub mod options;

#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod store;
#[cfg(target_arch = "wasm32")]
mod timers;
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::TabGuardWeb;

pub use options::WebGuardOptions;

/// Native builds compile this crate as a stub so `cargo check --workspace` stays
/// green on non-wasm targets.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Default)]
pub struct TabGuardWeb;

#[cfg(not(target_arch = "wasm32"))]
impl TabGuardWeb {
    pub fn new() -> Self {
        Self
    }
}
