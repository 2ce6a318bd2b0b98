#![forbid(unsafe_code)]

//! DOM-backed host pieces: the cover element, the protection switch and
//! `location.replace`.

use tabguard_core::overlay::{OverlayError, OverlaySurface};
use tabguard_core::timer::{NavigationError, Navigator};
use tabguard_core::toggle::{ToggleState, ToggleView};
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use web_sys::{CustomEvent, CustomEventInit, Document, Element, HtmlElement, Window};

use crate::wasm::js_error_text;

/// Event dispatched on `document` with the notice text as `detail`.
pub(crate) const NOTICE_EVENT: &str = "tabguard-notice";

fn overlay_css(id: &str) -> String {
    format!(
        "#{id} {{
    position: fixed;
    top: 0;
    left: 0;
    width: 100%;
    height: 100%;
    background-color: white;
    z-index: 99999;
    display: none;
    flex-direction: column;
    justify-content: center;
    align-items: center;
    color: black;
    font-family: sans-serif;
}}
#{id} h1 {{
    font-size: 2em;
    margin-bottom: 0.5em;
}}
"
    )
}

fn dom_err(err: JsValue) -> OverlayError {
    OverlayError::Dom(js_error_text(&err))
}

/// Fixed, full-viewport cover. Reuses an element with the configured id when
/// the page already has one.
pub(crate) struct DomOverlay {
    document: Document,
    element_id: String,
    element: Option<HtmlElement>,
}

impl DomOverlay {
    /// Returns `None` when the document has no body to mount into.
    pub(crate) fn locate(document: &Document, element_id: &str) -> Option<Self> {
        document.body()?;
        Some(Self {
            document: document.clone(),
            element_id: element_id.to_owned(),
            element: None,
        })
    }

    fn inject_style(&self) -> Result<(), OverlayError> {
        let style = self.document.create_element("style").map_err(dom_err)?;
        style.set_text_content(Some(&overlay_css(&self.element_id)));
        match self.document.head() {
            Some(head) => head.append_child(&style).map_err(dom_err)?,
            None => self
                .document
                .body()
                .ok_or_else(|| OverlayError::MissingTarget("head".into()))?
                .append_child(&style)
                .map_err(dom_err)?,
        };
        Ok(())
    }

    fn find_or_create(&self) -> Result<Element, OverlayError> {
        if let Some(existing) = self.document.get_element_by_id(&self.element_id) {
            return Ok(existing);
        }
        let body = self
            .document
            .body()
            .ok_or_else(|| OverlayError::MissingTarget("body".into()))?;
        let element = self.document.create_element("div").map_err(dom_err)?;
        element.set_id(&self.element_id);
        element.set_inner_html(r#"<div style="text-align: center;"></div>"#);
        body.append_child(&element).map_err(dom_err)?;
        Ok(element)
    }
}

impl OverlaySurface for DomOverlay {
    fn install(&mut self) -> Result<(), OverlayError> {
        self.inject_style()?;
        let element = self
            .find_or_create()?
            .dyn_into::<HtmlElement>()
            .map_err(|_| OverlayError::Dom(format!("#{} is not an HTML element", self.element_id)))?;
        self.element = Some(element);
        Ok(())
    }

    fn set_visible(&mut self, visible: bool) -> Result<(), OverlayError> {
        let element = self
            .element
            .as_ref()
            .ok_or_else(|| OverlayError::MissingTarget(self.element_id.clone()))?;
        let display = if visible { "flex" } else { "none" };
        element
            .style()
            .set_property("display", display)
            .map_err(dom_err)
    }
}

/// Switch, icon and status text of the close-protection control.
pub(crate) struct DomToggleView {
    switch: Element,
    icon: Element,
    status: Element,
}

impl DomToggleView {
    /// All three elements must exist; otherwise the switch stays unbound.
    pub(crate) fn locate(
        document: &Document,
        switch_id: &str,
        icon_id: &str,
        status_id: &str,
    ) -> Result<Self, String> {
        let find = |id: &str| {
            document
                .get_element_by_id(id)
                .ok_or_else(|| format!("#{id}"))
        };
        Ok(Self {
            switch: find(switch_id)?,
            icon: find(icon_id)?,
            status: find(status_id)?,
        })
    }

    /// The clickable switch element.
    pub(crate) fn switch(&self) -> &Element {
        &self.switch
    }

    fn apply(&self, state: ToggleState) -> Result<(), JsValue> {
        let active = state.is_active();
        let switch_classes = self.switch.class_list();
        let icon_classes = self.icon.class_list();
        let status_classes = self.status.class_list();

        if active {
            switch_classes.add_1("switch-on")?;
            icon_classes.add_1("text-white")?;
            icon_classes.remove_1("text-[#bdc3c7]")?;
            status_classes.add_1("text-[#3498db]")?;
            status_classes.remove_1("text-white/80")?;
        } else {
            switch_classes.remove_1("switch-on")?;
            icon_classes.remove_1("text-white")?;
            icon_classes.add_1("text-[#bdc3c7]")?;
            status_classes.remove_1("text-[#3498db]")?;
            status_classes.add_1("text-white/80")?;
        }
        self.icon.set_inner_html(&format!(
            r#"<path stroke-linecap="round" stroke-linejoin="round" stroke-width="2" d="{}" />"#,
            state.icon_path()
        ));
        self.status.set_text_content(Some(state.status_text()));
        Ok(())
    }
}

impl ToggleView for DomToggleView {
    fn render(&mut self, state: ToggleState) {
        if let Err(err) = self.apply(state) {
            tracing::warn!(error = %js_error_text(&err), "toggle render failed");
        }
    }
}

/// Fire [`NOTICE_EVENT`] on `document`.
///
/// Page listeners run synchronously inside this call and may call back into
/// the guard, so no borrow of the guard or the binding may be held here.
pub(crate) fn dispatch_notice(document: &Document, message: &str) {
    let init = CustomEventInit::new();
    init.set_detail(&JsValue::from_str(message));
    let dispatched = CustomEvent::new_with_event_init_dict(NOTICE_EVENT, &init)
        .and_then(|event| document.dispatch_event(&event));
    if let Err(err) = dispatched {
        tracing::warn!(error = %js_error_text(&err), "notice dispatch failed");
    }
}

/// Hard navigation that replaces the current history entry.
pub(crate) struct LocationNavigator {
    window: Window,
}

impl LocationNavigator {
    pub(crate) fn new(window: Window) -> Self {
        Self { window }
    }
}

impl Navigator for LocationNavigator {
    fn replace(&mut self, url: &str) -> Result<(), NavigationError> {
        self.window
            .location()
            .replace(url)
            .map_err(|err| NavigationError(js_error_text(&err)))
    }
}
