#![forbid(unsafe_code)]

//! Core of the stay-on-page guard.
//!
//! Everything here is host-agnostic and deterministic: the embedding
//! environment supplies a key-value store, an overlay surface, a timer
//! facility and a navigator through the traits in [`prefs`], [`overlay`] and
//! [`timer`], then feeds browser signals into [`guard::GuardMachine`].
//!
//! - **Host-driven I/O**: the host pushes signals; the machine reports
//!   [`signal::Effects`] the host must apply to the DOM event.
//! - **No blocking, no threads**: suitable for `wasm32-unknown-unknown`.
//! - **Deterministic time**: with [`timer::ManualScheduler`] the host advances
//!   the clock explicitly.

pub mod config;
pub mod guard;
pub mod logging;
pub mod overlay;
pub mod prefs;
pub mod signal;
pub mod timer;
pub mod toggle;

// Same paths as the no-op macros, which `#[macro_export]` places at the root.
#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, info, trace, warn};

pub use config::{ConfigError, GuardConfig};
pub use guard::{GuardMachine, GuardParts, GuardState, RedirectPhase};
pub use prefs::{Flag, PreferenceStore, Preferences, StoreError};
pub use signal::{Effects, GuardKey, Signal, Visibility};
pub use toggle::{ToggleBinding, ToggleState, ToggleView};
