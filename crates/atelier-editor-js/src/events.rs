//! DOM event handling and host callbacks for a mounted editor.
//!
//! The browser crate's listeners call into [`EditorBridge`], which forwards
//! each event to the shared core editor. Host callbacks (`onChange`,
//! `onUiChange`) are queued while the editor is borrowed and delivered once
//! the borrow is released, so a callback may call straight back into the
//! editor.

use std::cell::RefCell;
use std::rc::Rc;

use atelier_editor_browser::{DomSurface, EditorEventSink, Popover};
use atelier_editor_core::{Editor, MediaKind};
use wasm_bindgen::JsValue;
use web_sys::Element;

use crate::types::JsUiState;

pub(crate) type SharedEditor = Rc<RefCell<Editor<DomSurface>>>;

pub(crate) fn ui_snapshot(editor: &Editor<DomSurface>) -> JsUiState {
    JsUiState::new(
        editor.ui_state(),
        editor.is_uploading(MediaKind::Image),
        editor.is_uploading(MediaKind::Attachment),
    )
}

/// Pending host notifications.
#[derive(Default)]
pub(crate) struct HostCallbacks {
    on_change: RefCell<Option<js_sys::Function>>,
    on_ui_change: RefCell<Option<js_sys::Function>>,
    changes: RefCell<Vec<String>>,
    ui: RefCell<Option<JsUiState>>,
    latest: RefCell<String>,
}

impl HostCallbacks {
    pub(crate) fn set_on_change(&self, callback: Option<js_sys::Function>) {
        *self.on_change.borrow_mut() = callback;
    }

    pub(crate) fn set_on_ui_change(&self, callback: Option<js_sys::Function>) {
        *self.on_ui_change.borrow_mut() = callback;
    }

    /// Called from inside the editor's change callback.
    pub(crate) fn queue_change(&self, content: &str) {
        *self.latest.borrow_mut() = content.to_string();
        self.changes.borrow_mut().push(content.to_string());
    }

    pub(crate) fn queue_ui(&self, state: JsUiState) {
        *self.ui.borrow_mut() = Some(state);
    }

    /// Content from the most recent change, for reads during a callback.
    pub(crate) fn latest(&self) -> String {
        self.latest.borrow().clone()
    }

    pub(crate) fn reset(&self, content: &str) {
        *self.latest.borrow_mut() = content.to_string();
        self.changes.borrow_mut().clear();
        *self.ui.borrow_mut() = None;
    }

    /// Deliver everything queued. Must run with the editor unborrowed.
    pub(crate) fn flush(&self) {
        let changes = std::mem::take(&mut *self.changes.borrow_mut());
        let on_change = self.on_change.borrow().clone();
        if let Some(callback) = on_change {
            for content in changes {
                if let Err(e) = callback.call1(&JsValue::NULL, &JsValue::from_str(&content)) {
                    tracing::warn!(target: "atelier::events", "onChange threw: {:?}", e);
                }
            }
        }

        let ui = self.ui.borrow_mut().take();
        let on_ui_change = self.on_ui_change.borrow().clone();
        if let (Some(state), Some(callback)) = (ui, on_ui_change) {
            match serde_wasm_bindgen::to_value(&state) {
                Ok(value) => {
                    if let Err(e) = callback.call1(&JsValue::NULL, &value) {
                        tracing::warn!(target: "atelier::events", "onUiChange threw: {:?}", e);
                    }
                }
                Err(e) => {
                    tracing::warn!(target: "atelier::events", "ui state serialization failed: {}", e)
                }
            }
        }
    }
}

pub(crate) struct EditorBridge {
    pub(crate) editor: SharedEditor,
    pub(crate) host: Rc<HostCallbacks>,
}

impl EditorBridge {
    fn with_editor<T>(&self, event: &str, f: impl FnOnce(&mut Editor<DomSurface>) -> T) -> Option<T> {
        let result = match self.editor.try_borrow_mut() {
            Ok(mut editor) => Some(f(&mut editor)),
            Err(_) => {
                tracing::debug!(target: "atelier::events", event, "editor busy, event dropped");
                None
            }
        };
        self.host.flush();
        result
    }
}

impl EditorEventSink for EditorBridge {
    fn composition_start(&self) {
        self.with_editor("compositionstart", |e| e.composition_start());
    }

    fn composition_end(&self) {
        self.with_editor("compositionend", |e| e.composition_end());
    }

    fn input(&self) {
        self.with_editor("input", |e| e.handle_input());
    }

    fn surface_click(&self, target: Option<Element>) {
        self.with_editor("click", |e| {
            e.handle_surface_click(target.as_ref());
        });
    }

    fn keydown(&self, key: &str, primary_modifier: bool) -> bool {
        self.with_editor("keydown", |e| {
            let handled = e.handle_shortcut(key, primary_modifier);
            if handled {
                self.host.queue_ui(ui_snapshot(e));
            }
            handled
        })
        .unwrap_or(false)
    }

    fn document_press(&self, inside: Option<Popover>) {
        self.with_editor("mousedown", |e| {
            if e.handle_document_click(inside) {
                self.host.queue_ui(ui_snapshot(e));
            }
        });
    }
}
