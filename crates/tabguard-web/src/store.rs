#![forbid(unsafe_code)]

use tabguard_core::prefs::{PreferenceStore, StoreError, StoreResult};
use web_sys::{Storage, Window};

use crate::wasm::js_error_text;

/// `window.localStorage`, or nothing when the host disables it.
///
/// Reading `localStorage` throws a `SecurityError` in some privacy modes; that
/// case is captured once here and every later call reports `Unavailable`.
pub(crate) struct LocalStorageStore {
    storage: Option<Storage>,
}

impl LocalStorageStore {
    pub(crate) fn from_window(window: &Window) -> Self {
        let storage = match window.local_storage() {
            Ok(storage) => storage,
            Err(err) => {
                tracing::warn!(error = %js_error_text(&err), "localStorage unavailable");
                None
            }
        };
        Self { storage }
    }

    fn storage(&self) -> StoreResult<&Storage> {
        self.storage
            .as_ref()
            .ok_or_else(|| StoreError::Unavailable("localStorage is disabled".into()))
    }
}

impl PreferenceStore for LocalStorageStore {
    fn name(&self) -> &str {
        "localStorage"
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.storage()?
            .get_item(key)
            .map_err(|err| StoreError::Unavailable(js_error_text(&err)))
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.storage()?
            .set_item(key, value)
            .map_err(|err| StoreError::Rejected {
                key: key.to_owned(),
                reason: js_error_text(&err),
            })
    }
}
