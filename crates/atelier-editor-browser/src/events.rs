//! Event subscriptions scoped to a mounted editor.
//!
//! Listeners live exactly as long as the [`EditorSubscriptions`] value that
//! owns them: dropping it on unmount removes every listener, including the
//! document-level outside-click listener.

use std::rc::Rc;

use atelier_editor_core::Popover;
use gloo_events::{EventListener, EventListenerOptions};
use wasm_bindgen::JsCast;
use web_sys::{Element, EventTarget, KeyboardEvent};

/// Attribute marking a popover container (and its toggle button). The value
/// is the popover id, e.g. `data-atelier-popover="color"`.
pub const POPOVER_ATTR: &str = "data-atelier-popover";

/// Receives editor DOM events.
pub trait EditorEventSink {
    fn composition_start(&self);
    fn composition_end(&self);
    fn input(&self);
    /// Click inside the editable element.
    fn surface_click(&self, target: Option<Element>);
    /// Returns true if the key was handled and the default should be prevented.
    fn keydown(&self, key: &str, primary_modifier: bool) -> bool;
    /// Mouse press anywhere in the document.
    fn document_press(&self, inside: Option<Popover>);
}

/// Popover container enclosing the event target, if any.
pub fn popover_for_target(target: Option<EventTarget>) -> Option<Popover> {
    let element = target?.dyn_into::<Element>().ok()?;
    let container = element
        .closest(&format!("[{}]", POPOVER_ATTR))
        .ok()
        .flatten()?;
    Popover::from_id(&container.get_attribute(POPOVER_ATTR)?)
}

/// Live listeners for one mounted editor.
pub struct EditorSubscriptions {
    _listeners: Vec<EventListener>,
}

impl EditorSubscriptions {
    pub fn attach<S>(root: &EventTarget, document: &EventTarget, sink: Rc<S>) -> Self
    where
        S: EditorEventSink + 'static,
    {
        let mut listeners = Vec::with_capacity(6);

        let s = Rc::clone(&sink);
        listeners.push(EventListener::new(root, "compositionstart", move |_| {
            s.composition_start()
        }));

        let s = Rc::clone(&sink);
        listeners.push(EventListener::new(root, "compositionend", move |_| {
            s.composition_end()
        }));

        let s = Rc::clone(&sink);
        listeners.push(EventListener::new(root, "input", move |_| s.input()));

        let s = Rc::clone(&sink);
        listeners.push(EventListener::new(root, "click", move |event| {
            let target = event
                .target()
                .and_then(|t| t.dyn_into::<Element>().ok());
            s.surface_click(target)
        }));

        let s = Rc::clone(&sink);
        listeners.push(EventListener::new_with_options(
            root,
            "keydown",
            EventListenerOptions::enable_prevent_default(),
            move |event| {
                let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
                    return;
                };
                if event.is_composing() {
                    return;
                }
                let primary = event.ctrl_key() || event.meta_key();
                if s.keydown(&event.key(), primary) {
                    event.prevent_default();
                }
            },
        ));

        let s = sink;
        listeners.push(EventListener::new(document, "mousedown", move |event| {
            s.document_press(popover_for_target(event.target()))
        }));

        tracing::debug!(target: "atelier::events", count = listeners.len(), "editor listeners attached");
        Self {
            _listeners: listeners,
        }
    }
}

impl Drop for EditorSubscriptions {
    fn drop(&mut self) {
        tracing::debug!(target: "atelier::events", "editor listeners detached");
    }
}
