//! Editable surface abstraction.
//!
//! [`EditableSurface`] is the interface between the editing engine and
//! whatever actually holds the document: a browser `contenteditable`
//! element (`atelier-editor-browser`), or the headless
//! [`MemorySurface`](crate::MemorySurface). The surface is the single source
//! of truth for content; the engine never keeps its own copy.

use std::fmt;

use crate::error::SurfaceError;

/// Marker attribute carried by the image currently selected for resizing.
/// Surfaces must strip it from serialized content.
pub const SELECTED_IMAGE_ATTR: &str = "data-atelier-selected";

/// Native editing commands, named after their `document.execCommand` ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NativeCommand<'a> {
    Bold,
    Italic,
    Underline,
    JustifyLeft,
    JustifyCenter,
    JustifyRight,
    InsertUnorderedList,
    InsertOrderedList,
    ForeColor(&'a str),
    FontName(&'a str),
    FontSize(&'a str),
    InsertHtml(&'a str),
    InsertText(&'a str),
}

impl NativeCommand<'_> {
    /// The `execCommand` command id.
    pub fn name(&self) -> &'static str {
        match self {
            NativeCommand::Bold => "bold",
            NativeCommand::Italic => "italic",
            NativeCommand::Underline => "underline",
            NativeCommand::JustifyLeft => "justifyLeft",
            NativeCommand::JustifyCenter => "justifyCenter",
            NativeCommand::JustifyRight => "justifyRight",
            NativeCommand::InsertUnorderedList => "insertUnorderedList",
            NativeCommand::InsertOrderedList => "insertOrderedList",
            NativeCommand::ForeColor(_) => "foreColor",
            NativeCommand::FontName(_) => "fontName",
            NativeCommand::FontSize(_) => "fontSize",
            NativeCommand::InsertHtml(_) => "insertHTML",
            NativeCommand::InsertText(_) => "insertText",
        }
    }

    /// The command's value argument, if it takes one.
    pub fn value(&self) -> Option<&str> {
        match self {
            NativeCommand::ForeColor(v)
            | NativeCommand::FontName(v)
            | NativeCommand::FontSize(v)
            | NativeCommand::InsertHtml(v)
            | NativeCommand::InsertText(v) => Some(v),
            _ => None,
        }
    }
}

/// Capability interface over a live editable tree.
///
/// `Range` is an opaque selection snapshot; `Node` is a non-owning element
/// handle. Both may go stale when the document changes, and every method
/// taking one must report that as an error rather than panic.
pub trait EditableSurface {
    /// Snapshot of a (possibly collapsed) text range.
    type Range: Clone + fmt::Debug;

    /// Handle to an element inside the surface.
    type Node: Clone + PartialEq + fmt::Debug;

    // === Selection ===

    /// The active range, if the selection is inside the surface.
    fn current_range(&self) -> Option<Self::Range>;

    /// Make `range` the active selection.
    ///
    /// Fails with [`SurfaceError::RestoreMiss`] if the range refers to nodes
    /// that have left the document.
    fn restore_range(&mut self, range: &Self::Range) -> Result<(), SurfaceError>;

    /// Whether the range selects nothing.
    fn is_collapsed(&self, range: &Self::Range) -> bool;

    /// Plain text of the active selection (empty when collapsed or absent).
    fn selected_text(&self) -> String;

    /// Give the surface input focus. With no usable selection the caret lands
    /// at the surface's default position (start of content).
    fn focus(&mut self);

    // === Editing ===

    /// Run a native editing command against the active selection.
    fn exec_native(&mut self, command: NativeCommand<'_>) -> Result<(), SurfaceError>;

    /// Wrap the contents of `range` in a new `<span style="{css}">`, selecting
    /// the span's contents afterwards.
    ///
    /// Fails with [`SurfaceError::WrapRejected`] if the range partially
    /// selects an element.
    fn wrap_range(&mut self, range: &Self::Range, css: &str) -> Result<Self::Node, SurfaceError>;

    /// Legacy `<font>` elements produced by native styling commands.
    fn legacy_font_nodes(&self) -> Vec<Self::Node>;

    /// Replace `node` with a new `<{tag} style="{css}">` that adopts its children.
    fn replace_element(
        &mut self,
        node: &Self::Node,
        tag: &str,
        css: &str,
    ) -> Result<Self::Node, SurfaceError>;

    /// Read an attribute of `node`.
    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    // === Content ===

    /// Serialized document content, without transient editor markers.
    fn content(&self) -> String;

    /// Replace all content. Every previously issued range and node goes stale.
    fn set_content(&mut self, markup: &str);

    // === Elements ===

    /// Whether `node` is still part of this surface's document.
    fn contains(&self, node: &Self::Node) -> bool;

    fn is_image(&self, node: &Self::Node) -> bool;

    /// Current rendered width in CSS pixels.
    fn rendered_width(&self, node: &Self::Node) -> Option<f64>;

    /// Set an explicit pixel width, letting height follow the aspect ratio.
    /// `None` clears explicit sizing so the element returns to its intrinsic size.
    fn set_width(&mut self, node: &Self::Node, width: Option<f64>) -> Result<(), SurfaceError>;

    /// Toggle the visual "selected" marker on `node`.
    fn set_selected_marker(&mut self, node: &Self::Node, selected: bool);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_command_ids() {
        assert_eq!(NativeCommand::InsertHtml("<b>x</b>").name(), "insertHTML");
        assert_eq!(NativeCommand::InsertHtml("<b>x</b>").value(), Some("<b>x</b>"));
        assert_eq!(NativeCommand::JustifyCenter.name(), "justifyCenter");
        assert_eq!(NativeCommand::Bold.value(), None);
    }
}
