//! The editing engine: a surface plus the state that coordinates it.

use std::cell::RefCell;
use std::mem;

use tracing::{debug, trace, warn};

use crate::command::{self, Command, shortcut_command};
use crate::composition::{CompositionGuard, InputDisposition};
use crate::config::EditorConfig;
use crate::error::UploadError;
use crate::image::{ImageController, ResizeDirection};
use crate::media::{
    MediaAsset, MediaFile, MediaKind, UploadOutcome, UploadSlot, UploadTicket, Uploader, validate,
    validate_meta,
};
use crate::selection::SelectionTracker;
use crate::surface::{EditableSurface, NativeCommand};
use crate::toolbar::{EditorUiState, Popover};

type ChangeCallback = Box<dyn FnMut(&str)>;

/// Rich text editor over an [`EditableSurface`].
///
/// The surface owns the document; every read of content goes to it. The
/// editor only holds transient interaction state and the change callback.
pub struct Editor<S: EditableSurface> {
    surface: S,
    config: EditorConfig,
    tracker: SelectionTracker<S::Range>,
    ui: EditorUiState,
    images: ImageController<S::Node>,
    composition: CompositionGuard,
    image_slot: UploadSlot,
    attachment_slot: UploadSlot,
    on_change: Option<ChangeCallback>,
    last_emitted: Option<String>,
}

impl<S: EditableSurface> Editor<S> {
    pub fn new(surface: S, config: EditorConfig) -> Self {
        let images = ImageController::new(config.image);
        let last_emitted = Some(surface.content());
        Self {
            surface,
            config,
            tracker: SelectionTracker::new(),
            ui: EditorUiState::default(),
            images,
            composition: CompositionGuard::new(),
            image_slot: UploadSlot::default(),
            attachment_slot: UploadSlot::default(),
            on_change: None,
            last_emitted,
        }
    }

    /// Seed the surface with `initial` content. Seeding never notifies.
    pub fn with_initial_content(mut surface: S, config: EditorConfig, initial: &str) -> Self {
        surface.set_content(initial);
        Self::new(surface, config)
    }

    pub fn set_on_change(&mut self, callback: impl FnMut(&str) + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    pub fn clear_on_change(&mut self) {
        self.on_change = None;
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn ui_state(&self) -> &EditorUiState {
        &self.ui
    }

    pub fn selected_image(&self) -> Option<&S::Node> {
        self.images.selected()
    }

    pub fn is_composing(&self) -> bool {
        self.composition.is_composing()
    }

    /// Current document content, read from the surface.
    pub fn content(&self) -> String {
        self.surface.content()
    }

    /// Replace the document without notifying. Saved selection and image
    /// selection are dropped since they refer to the old tree.
    pub fn set_content(&mut self, markup: &str) {
        self.images.clear(&mut self.surface);
        self.tracker.clear();
        self.surface.set_content(markup);
        self.last_emitted = Some(self.surface.content());
    }

    // === Notification ===

    /// Read the surface and pass it to the change callback.
    ///
    /// Never fires mid-composition. Unless `force` is set, content identical
    /// to the last notification is not sent again.
    fn notify(&mut self, force: bool) {
        if self.composition.is_composing() {
            trace!(target: "atelier::editor", "change held back during composition");
            return;
        }
        let content = self.surface.content();
        if !force && self.last_emitted.as_deref() == Some(content.as_str()) {
            return;
        }
        if let Some(callback) = self.on_change.as_mut() {
            callback(&content);
        }
        self.last_emitted = Some(content);
    }

    // === Selection & commands ===

    /// Snapshot the selection ahead of something that will steal focus.
    pub fn save_selection(&mut self) {
        self.tracker.save(&self.surface);
    }

    /// Run a command against the saved (or live) selection.
    pub fn apply_command(&mut self, command: &Command) -> bool {
        // A live selection inside the surface is newer than any snapshot.
        self.tracker.save(&self.surface);
        let mut ui = mem::take(&mut self.ui).close_all();
        if let Some(style) = command.inline_style() {
            ui = ui.with_style(&style);
        }
        self.ui = ui;

        let applied = command::apply_command(&mut self.surface, &mut self.tracker, command);
        debug!(target: "atelier::editor", command = command.name(), applied, "command finished");
        if applied {
            self.notify(false);
        }
        applied
    }

    /// Ctrl/Cmd shortcuts. Returns whether the key was handled.
    pub fn handle_shortcut(&mut self, key: &str, primary_modifier: bool) -> bool {
        match shortcut_command(key, primary_modifier) {
            Some(command) => {
                self.apply_command(&command);
                true
            }
            None => false,
        }
    }

    // === Popovers ===

    pub fn open_popover(&mut self, popover: Popover) {
        self.save_selection();
        self.ui = mem::take(&mut self.ui).open(popover);
    }

    pub fn toggle_popover(&mut self, popover: Popover) {
        if !self.ui.is_open(popover) {
            self.save_selection();
        }
        self.ui = mem::take(&mut self.ui).toggle(popover);
    }

    pub fn close_popovers(&mut self) {
        self.ui = mem::take(&mut self.ui).close_all();
    }

    /// A click anywhere in the document. Returns whether a popover closed.
    pub fn handle_document_click(&mut self, inside: Option<Popover>) -> bool {
        let was_open = self.ui.open;
        self.ui = mem::take(&mut self.ui).on_click(inside);
        was_open != self.ui.open
    }

    // === Images ===

    /// A click inside the surface on `target`. Returns whether the image
    /// selection changed.
    pub fn handle_surface_click(&mut self, target: Option<&S::Node>) -> bool {
        self.images.click(&mut self.surface, target)
    }

    pub fn resize_image(&mut self, direction: ResizeDirection) -> bool {
        match self.images.resize(&mut self.surface, direction) {
            Ok(Some(_)) => {
                self.notify(false);
                true
            }
            Ok(None) => false,
            Err(err) => {
                warn!(target: "atelier::image", %err, "resize failed");
                false
            }
        }
    }

    pub fn reset_image_size(&mut self) -> bool {
        match self.images.reset_size(&mut self.surface) {
            Ok(true) => {
                self.notify(false);
                true
            }
            Ok(false) => false,
            Err(err) => {
                warn!(target: "atelier::image", %err, "size reset failed");
                false
            }
        }
    }

    // === Input ===

    pub fn composition_start(&mut self) {
        self.composition.start();
    }

    /// Ends composition and always notifies once with the composed content.
    pub fn composition_end(&mut self) {
        if self.composition.end() == InputDisposition::Commit {
            self.notify(true);
        }
    }

    /// The surface's content changed through typing.
    pub fn handle_input(&mut self) {
        match self.composition.on_input() {
            InputDisposition::Commit => self.notify(false),
            InputDisposition::Suppress => {}
        }
    }

    // === Uploads ===

    fn slot(&self, kind: MediaKind) -> &UploadSlot {
        match kind {
            MediaKind::Image => &self.image_slot,
            MediaKind::Attachment => &self.attachment_slot,
        }
    }

    pub fn is_uploading(&self, kind: MediaKind) -> bool {
        self.slot(kind).is_busy()
    }

    /// Validate `file` and claim its control's upload slot.
    ///
    /// `Ok(None)` means the control is busy and the file was ignored. The
    /// ticket carries the selection to insert at once the upload finishes.
    pub fn begin_upload(
        &mut self,
        file: &MediaFile,
        kind: MediaKind,
    ) -> Result<Option<UploadTicket<S::Range>>, UploadError> {
        if self.slot(kind).is_busy() {
            debug!(target: "atelier::upload", ?kind, name = %file.name, "upload in flight, ignoring");
            return Ok(None);
        }
        if let Err(err) = validate(file, kind, &self.config.upload) {
            warn!(target: "atelier::upload", %err, "file rejected");
            return Err(err.into());
        }
        let Some(permit) = self.slot(kind).try_acquire() else {
            return Ok(None);
        };
        self.tracker.save(&self.surface);
        Ok(Some(UploadTicket {
            kind,
            folder: kind.folder(&self.config.upload).to_string(),
            snapshot: self.tracker.take(),
            _permit: permit,
        }))
    }

    /// Check a file from its metadata before its bytes are read.
    ///
    /// `Ok(false)` means the control is busy and the file would be ignored.
    pub fn check_upload(&self, name: &str, mime_type: &str, size: u64, kind: MediaKind) -> Result<bool, UploadError> {
        if self.slot(kind).is_busy() {
            debug!(target: "atelier::upload", ?kind, name, "upload in flight, ignoring");
            return Ok(false);
        }
        if let Err(err) = validate_meta(name, mime_type, size, kind, &self.config.upload) {
            warn!(target: "atelier::upload", %err, "file rejected");
            return Err(err.into());
        }
        Ok(true)
    }

    /// Insert the uploaded file, or report the failure with the document untouched.
    pub fn finish_upload(
        &mut self,
        ticket: UploadTicket<S::Range>,
        file: &MediaFile,
        result: Result<String, UploadError>,
    ) -> Result<UploadOutcome, UploadError> {
        let url = match result {
            Ok(url) => url,
            Err(err) => {
                warn!(target: "atelier::upload", %err, detail = err.detail(), "upload failed");
                return Err(err);
            }
        };
        let asset = MediaAsset {
            url,
            name: file.name.clone(),
            size: file.size(),
        };
        let markup = asset.markup(ticket.kind);

        self.surface.focus();
        if let Some(snapshot) = &ticket.snapshot {
            if let Err(err) = self.surface.restore_range(snapshot) {
                debug!(target: "atelier::upload", %err, "upload caret gone, inserting at default caret");
                self.surface.focus();
            }
        }
        if let Err(err) = self.surface.exec_native(NativeCommand::InsertHtml(&markup)) {
            warn!(target: "atelier::upload", %err, "could not insert uploaded file");
            return Err(UploadError::Insert(err.to_string()));
        }
        self.surface.focus();
        debug!(target: "atelier::upload", url = %asset.url, "upload inserted");
        self.notify(false);
        Ok(UploadOutcome::Inserted(asset))
    }
}

/// Validate, upload, and insert `file` through `editor`.
///
/// The editor is only borrowed on either side of the network round trip, so
/// commands keep working while the upload is pending.
pub async fn upload_and_insert<S, U>(
    editor: &RefCell<Editor<S>>,
    uploader: &U,
    file: MediaFile,
    kind: MediaKind,
) -> Result<UploadOutcome, UploadError>
where
    S: EditableSurface,
    U: Uploader,
{
    let Some(ticket) = editor.borrow_mut().begin_upload(&file, kind)? else {
        return Ok(UploadOutcome::Ignored);
    };
    let result = uploader.upload(&file, &ticket.folder).await;
    editor.borrow_mut().finish_upload(ticket, &file, result)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::future::Future;
    use std::rc::Rc;

    use super::*;
    use crate::error::ValidationError;
    use crate::memory::MemorySurface;

    const MB: usize = 1024 * 1024;

    fn editor(initial: &str) -> (Editor<MemorySurface>, Rc<RefCell<Vec<String>>>) {
        let mut editor =
            Editor::with_initial_content(MemorySurface::new(), EditorConfig::default(), initial);
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&changes);
        editor.set_on_change(move |content| sink.borrow_mut().push(content.to_string()));
        (editor, changes)
    }

    struct FakeUploader {
        calls: Cell<usize>,
        result: Result<String, UploadError>,
    }

    impl FakeUploader {
        fn ok(url: &str) -> Self {
            Self {
                calls: Cell::new(0),
                result: Ok(url.to_string()),
            }
        }

        fn failing(err: UploadError) -> Self {
            Self {
                calls: Cell::new(0),
                result: Err(err),
            }
        }
    }

    impl Uploader for FakeUploader {
        fn upload(&self, _file: &MediaFile, _folder: &str) -> impl Future<Output = Result<String, UploadError>> {
            self.calls.set(self.calls.get() + 1);
            let result = self.result.clone();
            async move { result }
        }
    }

    fn image(len: usize) -> MediaFile {
        MediaFile::new("photo.png", "image/png", vec![1u8; len])
    }

    #[test]
    fn test_seeding_does_not_notify() {
        let (editor, changes) = editor("<p>seed</p>");
        assert_eq!(editor.content(), "<p>seed</p>");
        assert!(changes.borrow().is_empty());
    }

    #[test]
    fn test_composition_notifies_once_with_final_text() {
        let (mut editor, changes) = editor("<p></p>");
        editor.surface_mut().place_caret(0);
        editor.composition_start();
        for step in ["ㅎ", "하", "한"] {
            let s = editor.surface_mut();
            s.select_text(0, s.tree().text_content(s.tree().root()).chars().count());
            if s.selected_text().is_empty() {
                s.place_caret(0);
            }
            s.exec_native(NativeCommand::InsertText(step)).unwrap();
            editor.handle_input();
        }
        assert!(changes.borrow().is_empty());
        editor.composition_end();
        // A trailing input event after compositionend must not repeat it.
        editor.handle_input();
        assert_eq!(changes.borrow().as_slice(), ["<p>한</p>"]);
    }

    #[test]
    fn test_plain_input_notifies_on_change_only() {
        let (mut editor, changes) = editor("<p>a</p>");
        editor.handle_input();
        assert!(changes.borrow().is_empty());
        editor.surface_mut().place_caret(1);
        editor
            .surface_mut()
            .exec_native(NativeCommand::InsertText("b"))
            .unwrap();
        editor.handle_input();
        assert_eq!(changes.borrow().as_slice(), ["<p>ab</p>"]);
    }

    #[test]
    fn test_popover_keeps_selection_for_style() {
        let (mut editor, changes) = editor("<p>pick a colour</p>");
        editor.surface_mut().select_substring("colour");
        editor.open_popover(Popover::Color);
        editor.surface_mut().blur();
        assert!(editor.ui_state().is_open(Popover::Color));

        editor.apply_command(&Command::Color {
            value: "#1e88e5".into(),
        });
        assert_eq!(editor.ui_state().open, None);
        assert_eq!(editor.ui_state().color.as_deref(), Some("#1e88e5"));
        assert_eq!(
            changes.borrow().last().map(String::as_str),
            Some("<p>pick a <span style=\"color: #1e88e5;\">colour</span></p>")
        );
    }

    #[test]
    fn test_collapsed_style_records_state_only() {
        let (mut editor, changes) = editor("<p>abc</p>");
        editor.surface_mut().place_caret(1);
        assert!(!editor.apply_command(&Command::FontSize {
            value: "24px".into()
        }));
        assert_eq!(editor.ui_state().font_size.as_deref(), Some("24px"));
        assert_eq!(editor.content(), "<p>abc</p>");
        assert!(changes.borrow().is_empty());
    }

    #[test]
    fn test_popover_exclusivity_and_outside_click() {
        let (mut editor, _) = editor("<p>x</p>");
        editor.open_popover(Popover::FontSize);
        editor.open_popover(Popover::Color);
        assert!(!editor.ui_state().is_open(Popover::FontSize));
        assert!(editor.ui_state().is_open(Popover::Color));
        assert!(!editor.handle_document_click(Some(Popover::Color)));
        assert!(editor.handle_document_click(None));
        assert_eq!(editor.ui_state().open, None);
    }

    #[test]
    fn test_image_resize_notifies() {
        let (mut editor, changes) = editor("<p><img src=\"a.png\" style=\"width: 100px;\"></p>");
        let img = editor.surface().images()[0];
        assert!(!editor.resize_image(ResizeDirection::Grow));
        editor.handle_surface_click(Some(&img));
        assert!(editor.resize_image(ResizeDirection::Grow));
        assert_eq!(
            changes.borrow().last().map(String::as_str),
            Some("<p><img src=\"a.png\" style=\"width: 120px; height: auto;\"></p>")
        );
        assert!(editor.reset_image_size());
        assert_eq!(
            changes.borrow().last().map(String::as_str),
            Some("<p><img src=\"a.png\"></p>")
        );
    }

    #[test]
    fn test_shortcut_runs_command() {
        let (mut editor, changes) = editor("<p>key</p>");
        editor.surface_mut().select_substring("key");
        assert!(editor.handle_shortcut("b", true));
        assert!(!editor.handle_shortcut("x", true));
        assert_eq!(changes.borrow().as_slice(), ["<p><b>key</b></p>"]);
    }

    #[test]
    fn test_round_trip_through_initial_content() {
        let (mut editor, changes) = editor("<p>one two three</p>");
        editor.surface_mut().select_substring("two");
        editor.apply_command(&Command::Bold);
        editor.surface_mut().select_substring("three");
        editor.apply_command(&Command::FontFamily {
            value: "Georgia".into(),
        });
        editor.surface_mut().select_substring("one");
        editor.apply_command(&Command::BulletList);
        editor.apply_command(&Command::InsertLink {
            url: Some("https://a.example/?x=1&y=2".into()),
        });
        let produced = changes.borrow().last().cloned().unwrap();

        let (reloaded, reload_changes) = self::editor(&produced);
        assert_eq!(reloaded.content(), produced);
        assert!(reload_changes.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_image_upload_rejects_non_image_before_network() {
        let (editor, changes) = editor("<p>A</p>");
        let editor = RefCell::new(editor);
        let uploader = FakeUploader::ok("https://cdn.example/x.png");
        let file = MediaFile::new("notes.txt", "text/plain", b"hello".to_vec());
        let err = upload_and_insert(&editor, &uploader, file, MediaKind::Image)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            UploadError::Validation(ValidationError::NotAnImage { .. })
        ));
        assert_eq!(uploader.calls.get(), 0);
        assert_eq!(editor.borrow().content(), "<p>A</p>");
        assert!(changes.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_size_limits_per_control() {
        let (editor, _) = editor("<p>A</p>");
        let editor = RefCell::new(editor);
        let uploader = FakeUploader::ok("https://cdn.example/big.png");

        let err = upload_and_insert(&editor, &uploader, image(6 * MB), MediaKind::Image)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            UploadError::Validation(ValidationError::TooLarge { .. })
        ));
        assert_eq!(uploader.calls.get(), 0);

        let outcome = upload_and_insert(&editor, &uploader, image(6 * MB), MediaKind::Attachment)
            .await
            .unwrap();
        assert_eq!(uploader.calls.get(), 1);
        assert!(matches!(outcome, UploadOutcome::Inserted(_)));
        assert!(editor.borrow().content().contains("📎 photo.png (6 MB)"));
    }

    #[tokio::test]
    async fn test_failed_upload_leaves_content_untouched() {
        let (editor, changes) = editor("<p>A</p>");
        let editor = RefCell::new(editor);
        editor.borrow_mut().surface_mut().place_caret(1);
        let uploader = FakeUploader::failing(UploadError::Transport("connection reset".into()));
        let err = upload_and_insert(&editor, &uploader, image(1024), MediaKind::Image)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Transport(_)));
        assert_eq!(editor.borrow().content(), "<p>A</p>");
        assert!(!editor.borrow().is_uploading(MediaKind::Image));
        assert!(changes.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_upload_inserts_at_saved_caret() {
        let (editor, changes) = editor("<p>before after</p>");
        let editor = RefCell::new(editor);
        editor.borrow_mut().surface_mut().place_caret(7);
        let uploader = FakeUploader::ok("https://cdn.example/a.png");
        upload_and_insert(&editor, &uploader, image(1024), MediaKind::Image)
            .await
            .unwrap();
        insta::assert_snapshot!(
            changes.borrow().last().cloned().unwrap(),
            @r#"<p>before <img src="https://cdn.example/a.png" alt="photo.png" draggable="false" data-resizable="true" style="max-width: 100%; height: auto;">after</p>"#
        );
    }

    #[test]
    fn test_second_upload_while_busy_is_ignored() {
        let (mut editor, _) = editor("<p>A</p>");
        let file = image(1024);
        let first = editor.begin_upload(&file, MediaKind::Image).unwrap();
        assert!(first.is_some());
        assert!(editor.is_uploading(MediaKind::Image));
        assert!(editor.begin_upload(&file, MediaKind::Image).unwrap().is_none());
        // The other control has its own slot.
        assert!(editor.begin_upload(&file, MediaKind::Attachment).unwrap().is_some());

        let ticket = first.unwrap();
        editor
            .finish_upload(ticket, &file, Err(UploadError::Status(500)))
            .unwrap_err();
        assert!(!editor.is_uploading(MediaKind::Image));
    }

    #[test]
    fn test_pending_upload_keeps_its_own_caret() {
        let (mut editor, _) = editor("<p>left right</p>");
        editor.surface_mut().place_caret(4);
        let file = image(16);
        let ticket = editor.begin_upload(&file, MediaKind::Image).unwrap().unwrap();

        editor.surface_mut().select_substring("right");
        editor.apply_command(&Command::Italic);

        editor
            .finish_upload(ticket, &file, Ok("https://cdn.example/p.png".into()))
            .unwrap();
        let content = editor.content();
        assert!(content.starts_with("<p>left<img src=\"https://cdn.example/p.png\""));
        assert!(content.ends_with(" <i>right</i></p>"));
    }

    #[test]
    fn test_upload_check_from_metadata() {
        let (mut editor, _) = editor("<p>A</p>");
        let err = editor
            .check_upload("huge.png", "image/png", (6 * MB) as u64, MediaKind::Image)
            .unwrap_err();
        assert!(matches!(
            err,
            UploadError::Validation(ValidationError::TooLarge { .. })
        ));
        assert!(editor.check_upload("a.png", "image/png", 1024, MediaKind::Image).unwrap());

        let file = image(16);
        let _ticket = editor.begin_upload(&file, MediaKind::Image).unwrap().unwrap();
        assert!(!editor.check_upload("b.png", "image/png", 16, MediaKind::Image).unwrap());
    }

    #[tokio::test]
    async fn test_empty_attachment_is_uploaded() {
        let (editor, _) = editor("<p>A</p>");
        let editor = RefCell::new(editor);
        let uploader = FakeUploader::ok("https://cdn.example/empty.txt");
        let file = MediaFile::new("empty.txt", "text/plain", Vec::new());
        let outcome = upload_and_insert(&editor, &uploader, file, MediaKind::Attachment)
            .await
            .unwrap();
        assert_eq!(uploader.calls.get(), 1);
        assert!(matches!(outcome, UploadOutcome::Inserted(_)));
        assert!(editor.borrow().content().contains("📎 empty.txt (0 B)"));
    }

    #[test]
    fn test_insert_failure_is_not_a_server_error() {
        let (mut editor, changes) = editor("<p>A</p>");
        editor.surface_mut().place_caret(1);
        let file = image(16);
        let ticket = editor.begin_upload(&file, MediaKind::Image).unwrap().unwrap();
        editor.surface_mut().set_read_only(true);

        let err = editor
            .finish_upload(ticket, &file, Ok("https://cdn.example/p.png".into()))
            .unwrap_err();
        assert!(matches!(err, UploadError::Insert(_)));
        assert_ne!(
            err.to_string(),
            UploadError::Response(String::new()).to_string()
        );
        assert_eq!(editor.content(), "<p>A</p>");
        assert!(!editor.is_uploading(MediaKind::Image));
        assert!(changes.borrow().is_empty());
    }

    #[test]
    fn test_shortcut_bolds_first_word() {
        let (mut editor, changes) = editor("<p>hello world</p>");
        editor.surface_mut().select_substring("hello");
        assert!(editor.handle_shortcut("b", true));
        assert_eq!(changes.borrow().as_slice(), ["<p><b>hello</b> world</p>"]);
    }
}
