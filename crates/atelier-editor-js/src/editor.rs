//! JsEditor - the main editor wrapper for JavaScript.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::HtmlElement;

use atelier_editor_browser::{
    DomSurface, EditorSubscriptions, prompt_link_url, read_file, resolve_endpoint,
};
use atelier_editor_core::{
    EditableSurface, Editor, EditorConfig, HttpUploader, MediaKind, ResizeDirection, UploadError,
    UploadOutcome, Uploader,
};

use crate::commands::{parse_command, parse_media_kind, parse_popover};
use crate::events::{EditorBridge, HostCallbacks, SharedEditor, ui_snapshot};
use crate::types::JsUploadResult;

const LINK_PROMPT: &str = "Link URL";

struct Mounted {
    element: HtmlElement,
    editor: SharedEditor,
    uploader: HttpUploader,
    _subscriptions: EditorSubscriptions,
}

/// The editor instance exposed to JavaScript.
///
/// All methods take `&self` so host callbacks may call back into the editor
/// while a previous call is still on the stack.
#[wasm_bindgen]
pub struct JsEditor {
    config: EditorConfig,
    mounted: RefCell<Option<Mounted>>,
    host: Rc<HostCallbacks>,
}

#[wasm_bindgen]
impl JsEditor {
    /// Create an editor. `config` is an optional plain object; missing fields
    /// take their defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<JsEditor, JsError> {
        let config = if config.is_undefined() || config.is_null() {
            EditorConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsError::new(&format!("Invalid config: {}", e)))?
        };
        Ok(Self {
            config,
            mounted: RefCell::new(None),
            host: Rc::new(HostCallbacks::default()),
        })
    }

    /// The resolved configuration, including picker palettes.
    #[wasm_bindgen(js_name = getConfig)]
    pub fn get_config(&self) -> Result<JsValue, JsError> {
        serde_wasm_bindgen::to_value(&self.config)
            .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
    }

    // === Mounting ===

    /// Mount the editor into a container element.
    ///
    /// Creates a contenteditable div inside the container, seeds it with
    /// `initialContent` and wires event handlers. `onChange(content)` is
    /// called once per committed change, never during IME composition.
    #[wasm_bindgen]
    pub fn mount(
        &self,
        container: &HtmlElement,
        initial_content: Option<String>,
        on_change: Option<js_sys::Function>,
    ) -> Result<(), JsError> {
        self.unmount();

        let document = container
            .owner_document()
            .ok_or_else(|| JsError::new("Container has no document"))?;
        let element: HtmlElement = document
            .create_element("div")
            .map_err(|e| JsError::new(&format!("Failed to create element: {:?}", e)))?
            .dyn_into()
            .map_err(|_| JsError::new("Created element is not an HtmlElement"))?;
        element.set_class_name("atelier-editor-content");
        container
            .append_child(&element)
            .map_err(|e| JsError::new(&format!("Failed to append child: {:?}", e)))?;

        let surface = DomSurface::new(element.clone())
            .map_err(|e| JsError::new(&format!("Failed to set up surface: {}", e)))?;
        let mut editor = Editor::with_initial_content(
            surface,
            self.config.clone(),
            initial_content.as_deref().unwrap_or(""),
        );
        let host = Rc::clone(&self.host);
        editor.set_on_change(move |content| host.queue_change(content));
        self.host.reset(&editor.content());
        self.host.set_on_change(on_change);

        let endpoint = resolve_endpoint(&self.config.upload.endpoint)
            .map_err(|e| JsError::new(&format!("Invalid upload endpoint: {}", e)))?;
        let editor = Rc::new(RefCell::new(editor));
        let bridge = Rc::new(EditorBridge {
            editor: Rc::clone(&editor),
            host: Rc::clone(&self.host),
        });
        let subscriptions = EditorSubscriptions::attach(&element, &document, bridge);

        tracing::debug!(target: "atelier::editor", endpoint = %endpoint, "editor mounted");
        *self.mounted.borrow_mut() = Some(Mounted {
            element,
            editor,
            uploader: HttpUploader::new(endpoint),
            _subscriptions: subscriptions,
        });
        Ok(())
    }

    /// Check if the editor is mounted.
    #[wasm_bindgen(js_name = isMounted)]
    pub fn is_mounted(&self) -> bool {
        self.mounted.borrow().is_some()
    }

    /// Unmount the editor: remove listeners and the editable element.
    ///
    /// An upload still in flight finishes but inserts nothing visible.
    #[wasm_bindgen]
    pub fn unmount(&self) {
        let Some(mounted) = self.mounted.borrow_mut().take() else {
            return;
        };
        if let Ok(mut editor) = mounted.editor.try_borrow_mut() {
            editor.clear_on_change();
            editor.surface().detach();
        }
        mounted.element.remove();
        self.host.set_on_change(None);
        tracing::debug!(target: "atelier::editor", "editor unmounted");
    }

    // === Content access ===

    /// Current content markup. Empty when not mounted.
    #[wasm_bindgen(js_name = getContent)]
    pub fn get_content(&self) -> String {
        let mounted = self.mounted.borrow();
        let Some(mounted) = mounted.as_ref() else {
            return String::new();
        };
        match mounted.editor.try_borrow() {
            Ok(editor) => editor.content(),
            Err(_) => self.host.latest(),
        }
    }

    /// Replace the content without firing `onChange`.
    #[wasm_bindgen(js_name = setContent)]
    pub fn set_content(&self, markup: &str) -> Result<(), JsError> {
        self.with_editor(|editor| editor.set_content(markup))?;
        self.host.reset(&self.get_content());
        Ok(())
    }

    /// Focus the editable element.
    #[wasm_bindgen]
    pub fn focus(&self) -> Result<(), JsError> {
        self.with_editor(|editor| editor.surface_mut().focus())
    }

    // === Commands ===

    /// Snapshot the selection. Call before anything that steals focus, such
    /// as opening a file picker.
    #[wasm_bindgen(js_name = saveSelection)]
    pub fn save_selection(&self) -> Result<(), JsError> {
        self.with_editor(|editor| editor.save_selection())
    }

    /// Execute an editor command, e.g. `{ type: "bold" }` or
    /// `{ type: "color", value: "#e53935" }`. Returns whether the content may
    /// have changed.
    #[wasm_bindgen(js_name = executeCommand)]
    pub fn execute_command(&self, command: JsValue) -> Result<bool, JsError> {
        let js_command = parse_command(command)?;
        let prompted = if js_command.needs_prompt() {
            self.save_selection()?;
            prompt_link_url(LINK_PROMPT)
        } else {
            None
        };
        let command = js_command.to_command(prompted);
        self.with_editor(|editor| {
            let applied = editor.apply_command(&command);
            self.host.queue_ui(ui_snapshot(editor));
            applied
        })
    }

    // === Popovers ===

    /// Open a picker (`font-family`, `font-size`, `color`, `emoji`), closing
    /// any other. The selection is saved first.
    #[wasm_bindgen(js_name = openPopover)]
    pub fn open_popover(&self, id: &str) -> Result<(), JsError> {
        let popover = parse_popover(id)?;
        self.with_editor(|editor| {
            editor.open_popover(popover);
            self.host.queue_ui(ui_snapshot(editor));
        })
    }

    #[wasm_bindgen(js_name = togglePopover)]
    pub fn toggle_popover(&self, id: &str) -> Result<(), JsError> {
        let popover = parse_popover(id)?;
        self.with_editor(|editor| {
            editor.toggle_popover(popover);
            self.host.queue_ui(ui_snapshot(editor));
        })
    }

    #[wasm_bindgen(js_name = closePopovers)]
    pub fn close_popovers(&self) -> Result<(), JsError> {
        self.with_editor(|editor| {
            editor.close_popovers();
            self.host.queue_ui(ui_snapshot(editor));
        })
    }

    /// Toolbar state as a `JsUiState` object.
    #[wasm_bindgen(js_name = uiState)]
    pub fn ui_state(&self) -> Result<JsValue, JsError> {
        let mounted = self.mounted.borrow();
        let mounted = mounted
            .as_ref()
            .ok_or_else(|| JsError::new("Editor is not mounted"))?;
        let editor = mounted
            .editor
            .try_borrow()
            .map_err(|_| JsError::new("Editor is busy"))?;
        serde_wasm_bindgen::to_value(&ui_snapshot(&editor))
            .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
    }

    /// Called with a `JsUiState` whenever popovers open or close, a style is
    /// picked, or an upload starts or ends.
    #[wasm_bindgen(js_name = setOnUiChange)]
    pub fn set_on_ui_change(&self, callback: Option<js_sys::Function>) {
        self.host.set_on_ui_change(callback);
    }

    // === Images ===

    /// Grow or shrink the selected image. Returns false with no image selected.
    #[wasm_bindgen(js_name = resizeImage)]
    pub fn resize_image(&self, grow: bool) -> Result<bool, JsError> {
        let direction = if grow {
            ResizeDirection::Grow
        } else {
            ResizeDirection::Shrink
        };
        self.with_editor(|editor| editor.resize_image(direction))
    }

    /// Return the selected image to its intrinsic size.
    #[wasm_bindgen(js_name = resetImageSize)]
    pub fn reset_image_size(&self) -> Result<bool, JsError> {
        self.with_editor(|editor| editor.reset_image_size())
    }

    // === Uploads ===

    /// Upload a picked file (`kind` is `image` or `attachment`) and insert it
    /// at the saved caret. Resolves to a `JsUploadResult`; rejects with a
    /// user-facing message when validation or the upload fails.
    #[wasm_bindgen(js_name = uploadFile)]
    pub fn upload_file(&self, file: web_sys::File, kind: &str) -> Result<js_sys::Promise, JsError> {
        let kind = parse_media_kind(kind)?;
        let (editor, uploader) = {
            let mounted = self.mounted.borrow();
            let mounted = mounted
                .as_ref()
                .ok_or_else(|| JsError::new("Editor is not mounted"))?;
            (Rc::clone(&mounted.editor), mounted.uploader.clone())
        };
        let host = Rc::clone(&self.host);
        Ok(future_to_promise(async move {
            let outcome = upload(&editor, &uploader, &host, file, kind).await;
            if let Ok(editor) = editor.try_borrow() {
                host.queue_ui(ui_snapshot(&editor));
            }
            host.flush();
            match outcome {
                Ok(outcome) => serde_wasm_bindgen::to_value(&JsUploadResult::from(outcome))
                    .map_err(|e| JsError::new(&format!("Serialization error: {}", e)).into()),
                Err(message) => Err(JsError::new(&message).into()),
            }
        }))
    }

    /// Whether an upload through the given control is in flight.
    #[wasm_bindgen(js_name = isUploading)]
    pub fn is_uploading(&self, kind: &str) -> Result<bool, JsError> {
        let kind = parse_media_kind(kind)?;
        let mounted = self.mounted.borrow();
        Ok(mounted
            .as_ref()
            .and_then(|m| m.editor.try_borrow().ok().map(|e| e.is_uploading(kind)))
            .unwrap_or(false))
    }
}

// Internal methods (not exposed to JS)
impl JsEditor {
    /// Run `f` against the mounted editor, then deliver queued callbacks.
    fn with_editor<T>(&self, f: impl FnOnce(&mut Editor<DomSurface>) -> T) -> Result<T, JsError> {
        let editor = {
            let mounted = self.mounted.borrow();
            let mounted = mounted
                .as_ref()
                .ok_or_else(|| JsError::new("Editor is not mounted"))?;
            Rc::clone(&mounted.editor)
        };
        let result = {
            let mut editor = editor
                .try_borrow_mut()
                .map_err(|_| JsError::new("Editor is busy"))?;
            f(&mut editor)
        };
        self.host.flush();
        Ok(result)
    }
}

/// Read, validate, upload and insert one file. Errors come back as the
/// message to show the user.
async fn upload(
    editor: &SharedEditor,
    uploader: &HttpUploader,
    host: &HostCallbacks,
    file: web_sys::File,
    kind: MediaKind,
) -> Result<UploadOutcome, String> {
    // Reject on metadata first so an oversized file is never read into memory.
    let admitted = {
        let editor = editor.try_borrow().map_err(|_| "Editor is busy".to_string())?;
        editor
            .check_upload(&file.name(), &file.type_(), file.size() as u64, kind)
            .map_err(|e: UploadError| e.to_string())?
    };
    if !admitted {
        return Ok(UploadOutcome::Ignored);
    }
    let media = read_file(&file).await.map_err(|e| e.to_string())?;

    let ticket = {
        let mut editor = editor.try_borrow_mut().map_err(|_| "Editor is busy".to_string())?;
        let ticket = editor
            .begin_upload(&media, kind)
            .map_err(|e: UploadError| e.to_string())?;
        host.queue_ui(ui_snapshot(&editor));
        ticket
    };
    host.flush();
    let Some(ticket) = ticket else {
        return Ok(UploadOutcome::Ignored);
    };

    let result = uploader.upload(&media, &ticket.folder).await;

    let mut editor = editor.try_borrow_mut().map_err(|_| "Editor is busy".to_string())?;
    editor
        .finish_upload(ticket, &media, result)
        .map_err(|e| e.to_string())
}
