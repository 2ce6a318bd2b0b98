#![forbid(unsafe_code)]

//! Persisted guard preferences.
//!
//! The guard reads three boolean flags from a per-origin key-value store
//! (`localStorage` on the web). Values are strings; only the literal `"true"`
//! counts as enabled.
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | Store unavailable on read | Flag reads as absent, i.e. its default |
//! | Store rejects a write | Write dropped, logged at `warn` |
//! | Unrecognized value | Reads as `false` |
//!
//! Store errors never reach the caller of [`Preferences`]; the typed accessors
//! always return a usable value.

use std::collections::HashMap;
use std::fmt;

/// Errors reported by a [`PreferenceStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store is missing or disabled by the host.
    Unavailable(String),
    /// The store refused a write (quota, security policy).
    Rejected { key: String, reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "preference store unavailable: {msg}"),
            Self::Rejected { key, reason } => write!(f, "write to {key} rejected: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A durable string key-value store scoped to one origin.
pub trait PreferenceStore {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Read a value. `Ok(None)` means the key was never written.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&mut self, key: &str, value: &str) -> StoreResult<()>;
}

/// The flags the guard persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// Ask for confirmation before the tab closes.
    CloseProtection,
    /// Redirect (rather than cover) the page when the tab is hidden.
    Redirect,
    /// One-time notice about close protection was already shown.
    WarningShown,
}

impl Flag {
    /// Storage key for this flag.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::CloseProtection => "tabProtectionState",
            Self::Redirect => "redirectToggleState",
            Self::WarningShown => "closepreventionwarning",
        }
    }

    /// Value used when the key is absent or the store is unreadable.
    #[must_use]
    pub const fn default_value(self) -> bool {
        match self {
            Self::CloseProtection => false,
            Self::Redirect => true,
            Self::WarningShown => false,
        }
    }
}

const fn encode(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Flag values read in one pass at the start of a signal dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreferenceSnapshot {
    pub close_protection: bool,
    pub redirect_enabled: bool,
}

/// Typed, failure-absorbing view over a [`PreferenceStore`].
#[derive(Debug)]
pub struct Preferences<S> {
    store: S,
}

impl<S: PreferenceStore> Preferences<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutably borrow the underlying store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Raw read. Store failures read as absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(err) => {
                crate::warn!(store = self.store.name(), key, error = %err, "preference read failed");
                None
            }
        }
    }

    /// Raw write. Returns whether the value was persisted.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        match self.store.set(key, value) {
            Ok(()) => true,
            Err(err) => {
                crate::warn!(store = self.store.name(), key, error = %err, "preference write dropped");
                false
            }
        }
    }

    /// Read a flag, applying its default when absent.
    #[must_use]
    pub fn flag(&self, flag: Flag) -> bool {
        match self.get(flag.key()) {
            Some(value) => value == "true",
            None => flag.default_value(),
        }
    }

    /// Persist a flag value.
    pub fn set_flag(&mut self, flag: Flag, value: bool) -> bool {
        self.set(flag.key(), encode(value))
    }

    #[must_use]
    pub fn close_protection(&self) -> bool {
        self.flag(Flag::CloseProtection)
    }

    pub fn set_close_protection(&mut self, enabled: bool) -> bool {
        self.set_flag(Flag::CloseProtection, enabled)
    }

    /// Whether a hidden tab is redirected. Absent means enabled.
    #[must_use]
    pub fn redirect_enabled(&self) -> bool {
        self.flag(Flag::Redirect)
    }

    pub fn set_redirect_enabled(&mut self, enabled: bool) -> bool {
        self.set_flag(Flag::Redirect, enabled)
    }

    #[must_use]
    pub fn warning_shown(&self) -> bool {
        self.get(Flag::WarningShown.key()).is_some()
    }

    /// Write the one-time notice sentinel.
    ///
    /// Returns `true` only when this call wrote it; an existing sentinel is
    /// never rewritten.
    pub fn mark_warning_shown(&mut self) -> bool {
        if self.warning_shown() {
            return false;
        }
        self.set_flag(Flag::WarningShown, true)
    }

    /// Write `tabProtectionState = "false"` if the key is absent.
    ///
    /// Returns `true` when a default was written. Never overwrites.
    pub fn ensure_defaults(&mut self) -> bool {
        let key = Flag::CloseProtection.key();
        if self.get(key).is_some() {
            return false;
        }
        self.set(key, encode(Flag::CloseProtection.default_value()))
    }

    /// Fresh read of the flags that drive signal handling.
    #[must_use]
    pub fn snapshot(&self) -> PreferenceSnapshot {
        PreferenceSnapshot {
            close_protection: self.close_protection(),
            redirect_enabled: self.redirect_enabled(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stores
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory store for tests and headless hosts.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    writes: usize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `(key, value)` pairs.
    #[must_use]
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            writes: 0,
        }
    }

    /// Raw value, bypassing the typed layer.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Remove a key, as a settings page clearing storage would.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Number of writes accepted since creation.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl PreferenceStore for MemoryStore {
    fn name(&self) -> &str {
        "MemoryStore"
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.writes += 1;
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Store stand-in for hosts where persistent storage is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStore;

impl PreferenceStore for UnavailableStore {
    fn name(&self) -> &str {
        "UnavailableStore"
    }

    fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        Err(StoreError::Unavailable("storage disabled".into()))
    }

    fn set(&mut self, _key: &str, _value: &str) -> StoreResult<()> {
        Err(StoreError::Unavailable("storage disabled".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn absent_flags_read_as_defaults() {
        let prefs = Preferences::new(MemoryStore::new());
        assert!(!prefs.close_protection());
        assert!(prefs.redirect_enabled());
        assert!(!prefs.warning_shown());
    }

    #[test]
    fn only_literal_true_enables() {
        let prefs = Preferences::new(MemoryStore::with_entries([
            ("tabProtectionState", "TRUE"),
            ("redirectToggleState", "1"),
        ]));
        assert!(!prefs.close_protection());
        assert!(!prefs.redirect_enabled());
    }

    #[test]
    fn set_flag_writes_string_literals() {
        let mut prefs = Preferences::new(MemoryStore::new());
        assert!(prefs.set_close_protection(true));
        assert!(prefs.set_redirect_enabled(false));
        assert_eq!(prefs.store().raw("tabProtectionState"), Some("true"));
        assert_eq!(prefs.store().raw("redirectToggleState"), Some("false"));
        assert_eq!(
            prefs.snapshot(),
            PreferenceSnapshot {
                close_protection: true,
                redirect_enabled: false,
            }
        );
    }

    #[test]
    fn ensure_defaults_writes_once_and_never_overwrites() {
        let mut prefs = Preferences::new(MemoryStore::new());
        assert!(prefs.ensure_defaults());
        assert_eq!(prefs.store().raw("tabProtectionState"), Some("false"));
        assert!(!prefs.ensure_defaults());
        assert_eq!(prefs.store().write_count(), 1);

        let mut enabled =
            Preferences::new(MemoryStore::with_entries([("tabProtectionState", "true")]));
        assert!(!enabled.ensure_defaults());
        assert!(enabled.close_protection());
    }

    #[test]
    fn ensure_defaults_leaves_redirect_absent() {
        let mut prefs = Preferences::new(MemoryStore::new());
        prefs.ensure_defaults();
        assert_eq!(prefs.store().raw("redirectToggleState"), None);
    }

    #[test]
    fn warning_sentinel_is_write_once() {
        let mut prefs = Preferences::new(MemoryStore::new());
        assert!(prefs.mark_warning_shown());
        assert!(!prefs.mark_warning_shown());
        assert!(prefs.warning_shown());
        assert_eq!(prefs.store().raw("closepreventionwarning"), Some("true"));
        assert_eq!(prefs.store().write_count(), 1);
    }

    #[test]
    fn unavailable_store_degrades_to_defaults() {
        let mut prefs = Preferences::new(UnavailableStore);
        assert!(!prefs.close_protection());
        assert!(prefs.redirect_enabled());
        assert!(!prefs.set_close_protection(true));
        assert!(!prefs.close_protection());
        assert!(!prefs.ensure_defaults());
        assert!(!prefs.mark_warning_shown());
    }

    #[test]
    fn store_error_display() {
        let err = StoreError::Rejected {
            key: "tabProtectionState".into(),
            reason: "QuotaExceededError".into(),
        };
        assert_eq!(
            err.to_string(),
            "write to tabProtectionState rejected: QuotaExceededError"
        );
    }
}
