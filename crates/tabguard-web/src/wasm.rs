#![forbid(unsafe_code)]

use core::fmt;
use std::cell::RefCell;
use std::rc::Rc;

use tabguard_core::toggle::ToggleBinding;
use tabguard_core::{
    ConfigError, Effects, GuardKey, GuardMachine, GuardParts, Preferences, Signal, Visibility,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{BeforeUnloadEvent, Document, EventTarget, KeyboardEvent, Window};

use crate::dom::{DomOverlay, DomToggleView, LocationNavigator, dispatch_notice};
use crate::options::WebGuardOptions;
use crate::store::LocalStorageStore;
use crate::timers::WebTimers;

pub(crate) type WebGuard = GuardMachine<LocalStorageStore, DomOverlay, WebTimers, LocationNavigator>;

/// Best-effort text for a thrown JS value.
pub(crate) fn js_error_text(value: &JsValue) -> String {
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

/// Initialization failures surfaced to the JS caller.
#[derive(Debug)]
pub(crate) enum WebGuardError {
    NoWindow,
    NoDocument,
    Options(ConfigError),
    Listener { event: &'static str, reason: String },
}

impl fmt::Display for WebGuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoWindow => write!(f, "tabguard: no window"),
            Self::NoDocument => write!(f, "tabguard: no document"),
            Self::Options(err) => write!(f, "tabguard: {err}"),
            Self::Listener { event, reason } => {
                write!(f, "tabguard: cannot listen for {event}: {reason}")
            }
        }
    }
}

impl std::error::Error for WebGuardError {}

impl From<WebGuardError> for JsValue {
    fn from(err: WebGuardError) -> Self {
        js_sys::Error::new(&err.to_string()).into()
    }
}

/// One installed DOM listener; removed from its target on drop.
struct Listener {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(web_sys::Event)>,
}

impl Listener {
    fn install(
        target: &EventTarget,
        event: &'static str,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) -> Result<Self, WebGuardError> {
        let callback = Closure::<dyn FnMut(web_sys::Event)>::new(handler);
        target
            .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
            .map_err(|err| WebGuardError::Listener {
                event,
                reason: js_error_text(&err),
            })?;
        Ok(Self {
            target: target.clone(),
            event,
            callback,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref());
    }
}

/// Run a signal through the guard.
///
/// A guard that is already borrowed is mid-dispatch, which only happens when
/// its own navigation synchronously raises `beforeunload`; such signals are
/// dropped so the guard never blocks itself.
fn dispatch(guard: &RefCell<WebGuard>, signal: Signal) -> Effects {
    match guard.try_borrow_mut() {
        Ok(mut guard) => guard.dispatch(signal),
        Err(_) => {
            tracing::trace!(event = signal.event_name(), "re-entrant signal ignored");
            Effects::empty()
        }
    }
}

type SharedToggle = Rc<RefCell<ToggleBinding<DomToggleView>>>;

/// Flip close protection and render the switch, if one is bound.
///
/// The one-time notice goes out only after both borrows are released, so a
/// page listener on it may call any method of the guard. Returns the
/// persisted value after the flip, or `None` when the guard is mid-dispatch.
fn flip_protection(
    guard: &RefCell<WebGuard>,
    toggle: Option<&SharedToggle>,
    document: &Document,
) -> Option<bool> {
    let (enabled, notice) = {
        let mut guard = guard.try_borrow_mut().ok()?;
        let prefs = guard.preferences_mut();
        match toggle {
            Some(toggle) => {
                let mut binding = toggle.try_borrow_mut().ok()?;
                let enabled = binding.toggle(prefs).is_active();
                (enabled, binding.take_notice())
            }
            None => {
                let enabled = !prefs.close_protection();
                prefs.set_close_protection(enabled);
                (prefs.close_protection(), None)
            }
        }
    };
    if let Some(text) = notice {
        dispatch_notice(document, text);
    }
    Some(enabled)
}

fn visibility_of(document: &Document) -> Visibility {
    if document.hidden() {
        Visibility::Hidden
    } else {
        Visibility::Visible
    }
}

/// Route Rust panics to the browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Stay-on-page guard bound to the current document.
///
/// Construct once the DOM is ready (`DOMContentLoaded`), then call `start`.
/// Every method takes `&self` and only ever try-borrows the guard, so page
/// code running synchronously inside a guard callback (a `tabguard-notice`
/// listener, a `beforeunload` listener during a redirect) can call back in.
#[wasm_bindgen]
pub struct TabGuardWeb {
    window: Window,
    document: Document,
    guard: Rc<RefCell<WebGuard>>,
    toggle: Option<SharedToggle>,
    listeners: RefCell<Vec<Listener>>,
}

#[wasm_bindgen]
impl TabGuardWeb {
    /// Accepts an optional options object; see `WebGuardOptions`.
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<TabGuardWeb, JsValue> {
        let options = if options.is_undefined() || options.is_null() {
            WebGuardOptions::default()
        } else {
            serde_wasm_bindgen::from_value::<WebGuardOptions>(options)
                .map_err(|err| WebGuardError::Options(ConfigError::Parse(err.to_string())))?
        };
        options.validate().map_err(WebGuardError::Options)?;

        let window = web_sys::window().ok_or(WebGuardError::NoWindow)?;
        let document = window.document().ok_or(WebGuardError::NoDocument)?;

        let overlay = DomOverlay::locate(&document, &options.overlay_id);
        if overlay.is_none() {
            web_sys::console::warn_1(&"[tabguard] no document body, overlay disabled".into());
        }
        let toggle = match DomToggleView::locate(
            &document,
            &options.toggle_id,
            &options.icon_id,
            &options.status_id,
        ) {
            Ok(view) => Some(Rc::new(RefCell::new(ToggleBinding::new(view)))),
            Err(missing) => {
                tracing::warn!(missing = %missing, "toggle element missing, switch unbound");
                web_sys::console::warn_1(
                    &format!("[tabguard] {missing} not found, protection switch disabled").into(),
                );
                None
            }
        };

        let store = LocalStorageStore::from_window(&window);
        let navigator = LocationNavigator::new(window.clone());
        let config = options.guard;
        let guard = Rc::new_cyclic(|weak| {
            RefCell::new(GuardMachine::new(
                config,
                GuardParts {
                    store,
                    overlay,
                    timers: WebTimers::new(weak.clone()),
                    navigator,
                },
            ))
        });

        Ok(Self {
            window,
            document,
            guard,
            toggle,
            listeners: RefCell::new(Vec::new()),
        })
    }

    /// Initialize preferences, mount the overlay, render the switch and begin
    /// listening. Calling it again is a no-op.
    pub fn start(&self) -> Result<(), JsValue> {
        if !self.listeners.borrow().is_empty() {
            return Ok(());
        }
        let notice = {
            let mut guard = self.guard.try_borrow_mut().map_err(|_| busy())?;
            guard.start(visibility_of(&self.document));
            self.toggle.as_ref().and_then(|toggle| {
                let mut binding = toggle.try_borrow_mut().ok()?;
                binding.sync(guard.preferences_mut());
                binding.take_notice()
            })
        };
        let listeners = self.install_listeners()?;
        *self.listeners.borrow_mut() = listeners;
        web_sys::console::log_1(&"[tabguard] guard is active and monitoring.".into());
        if let Some(text) = notice {
            dispatch_notice(&self.document, text);
        }
        Ok(())
    }

    /// Flip close protection, persist it and update the switch.
    ///
    /// `start` already makes a click on the bound switch do this; pages must
    /// not also call it from their own click handler on that switch.
    ///
    /// Returns the persisted value after the flip.
    #[wasm_bindgen(js_name = toggleProtection)]
    pub fn toggle_protection(&self) -> bool {
        flip_protection(&self.guard, self.toggle.as_ref(), &self.document)
            .unwrap_or_else(|| self.close_protection())
    }

    #[wasm_bindgen(js_name = closeProtection)]
    pub fn close_protection(&self) -> bool {
        match self.guard.try_borrow() {
            Ok(guard) => guard.preferences().close_protection(),
            Err(_) => self.fresh_preferences().close_protection(),
        }
    }

    /// Settings hook: choose redirect (`true`) or overlay (`false`) mode.
    ///
    /// Returns whether the value was persisted.
    #[wasm_bindgen(js_name = setRedirectEnabled)]
    pub fn set_redirect_enabled(&self, enabled: bool) -> bool {
        match self.guard.try_borrow_mut() {
            Ok(mut guard) => guard.preferences_mut().set_redirect_enabled(enabled),
            Err(_) => self.fresh_preferences().set_redirect_enabled(enabled),
        }
    }

    #[wasm_bindgen(js_name = redirectEnabled)]
    pub fn redirect_enabled(&self) -> bool {
        match self.guard.try_borrow() {
            Ok(guard) => guard.preferences().redirect_enabled(),
            Err(_) => self.fresh_preferences().redirect_enabled(),
        }
    }

    /// Snapshot of `{ visibility, redirect, overlayVisible }`.
    ///
    /// Throws while the guard is mid-dispatch.
    pub fn state(&self) -> Result<JsValue, JsValue> {
        let state = self.guard.try_borrow().map_err(|_| busy())?.state();
        serde_wasm_bindgen::to_value(&state).map_err(|err| JsValue::from_str(&err.to_string()))
    }

    /// Remove every listener, cancel a pending redirect and uncover the page.
    pub fn destroy(&self) {
        let listeners = self.listeners.take();
        drop(listeners);
        if let Ok(mut guard) = self.guard.try_borrow_mut() {
            guard.teardown();
        }
    }
}

impl TabGuardWeb {
    /// Preferences read straight from `localStorage`, for calls that arrive
    /// while the guard itself is borrowed.
    fn fresh_preferences(&self) -> Preferences<LocalStorageStore> {
        Preferences::new(LocalStorageStore::from_window(&self.window))
    }

    fn install_listeners(&self) -> Result<Vec<Listener>, WebGuardError> {
        let window: &EventTarget = self.window.as_ref();
        let document: &EventTarget = self.document.as_ref();

        let guard = Rc::clone(&self.guard);
        let before_unload = Listener::install(window, "beforeunload", move |event| {
            if dispatch(&guard, Signal::BeforeUnload).contains(Effects::CONFIRM_UNLOAD) {
                event.prevent_default();
                if let Some(event) = event.dyn_ref::<BeforeUnloadEvent>() {
                    event.set_return_value("");
                }
            }
        })?;

        let guard = Rc::clone(&self.guard);
        let doc = self.document.clone();
        let visibility = Listener::install(document, "visibilitychange", move |_event| {
            dispatch(&guard, Signal::VisibilityChange(visibility_of(&doc)));
        })?;

        let guard = Rc::clone(&self.guard);
        let focus = Listener::install(window, "focus", move |_event| {
            dispatch(&guard, Signal::Focus);
        })?;

        let guard = Rc::clone(&self.guard);
        let keydown = Listener::install(document, "keydown", move |event| {
            let Some(key_event) = event.dyn_ref::<KeyboardEvent>() else {
                return;
            };
            let key = GuardKey::from_dom_key(&key_event.key());
            if dispatch(&guard, Signal::KeyDown(key)).prevents_default() {
                event.prevent_default();
            }
        })?;

        let mut listeners = vec![before_unload, visibility, focus, keydown];
        if let Some(toggle) = &self.toggle {
            let switch: EventTarget = toggle.borrow().view().switch().clone().into();
            let guard = Rc::clone(&self.guard);
            let binding = Rc::clone(toggle);
            let doc = self.document.clone();
            listeners.push(Listener::install(&switch, "click", move |_event| {
                flip_protection(&guard, Some(&binding), &doc);
            })?);
        }
        Ok(listeners)
    }
}

fn busy() -> JsValue {
    js_sys::Error::new("tabguard: guard is busy handling an event").into()
}

impl Drop for TabGuardWeb {
    fn drop(&mut self) {
        self.destroy();
    }
}
