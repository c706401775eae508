//! `EditableSurface` over a live `contenteditable` element.
//!
//! Ranges are `web_sys::Range` clones taken from the window selection, and
//! nodes are plain `Element` handles. Native commands go through
//! `document.execCommand` with `styleWithCSS` off, so colour and font commands
//! leave `<font>` elements for the engine to normalize.

use atelier_editor_core::{EditableSurface, NativeCommand, SELECTED_IMAGE_ATTR, SurfaceError};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlDocument, HtmlElement, Range, Selection};

/// Outline drawn around the selected image. Stripped from serialized content.
const SELECTED_OUTLINE: &str = "2px solid #1e88e5";

pub struct DomSurface {
    root: HtmlElement,
    document: Document,
}

impl DomSurface {
    /// Make `root` editable and wrap it.
    pub fn new(root: HtmlElement) -> Result<Self, SurfaceError> {
        let document = root.owner_document().ok_or("element has no document")?;
        root.set_content_editable("true");
        Ok(Self { root, document })
    }

    pub fn root(&self) -> &HtmlElement {
        &self.root
    }

    /// Turn editing off. Content is left in place.
    pub fn detach(&self) {
        self.root.set_content_editable("false");
    }

    fn selection(&self) -> Option<Selection> {
        gloo_utils::window().get_selection().ok().flatten()
    }

    fn html_document(&self) -> Result<HtmlDocument, SurfaceError> {
        self.document
            .clone()
            .dyn_into::<HtmlDocument>()
            .map_err(|_| SurfaceError::from("document is not an HTML document"))
    }

    fn owns(&self, node: &web_sys::Node) -> bool {
        self.root.contains(Some(node))
    }

    fn select(&self, range: &Range) -> Result<(), SurfaceError> {
        let selection = self.selection().ok_or("no selection object")?;
        selection
            .remove_all_ranges()
            .map_err(|e| format!("remove_all_ranges failed: {:?}", e))?;
        selection
            .add_range(range)
            .map_err(|e| format!("add_range failed: {:?}", e))?;
        Ok(())
    }

    fn select_contents(&self, node: &Element) -> Result<(), SurfaceError> {
        let range = self
            .document
            .create_range()
            .map_err(|e| format!("create_range failed: {:?}", e))?;
        range
            .select_node_contents(node)
            .map_err(|e| format!("select_node_contents failed: {:?}", e))?;
        self.select(&range)
    }

    fn exec(&self, name: &str, value: &str) -> Result<(), SurfaceError> {
        let applied = self
            .html_document()?
            .exec_command_with_show_ui_and_value(name, false, value)
            .map_err(|e| format!("execCommand({}) threw: {:?}", name, e))?;
        if applied {
            Ok(())
        } else {
            Err(format!("execCommand({}) not applied", name).into())
        }
    }

    fn styled_element(&self, tag: &str, css: &str) -> Result<Element, SurfaceError> {
        let element = self
            .document
            .create_element(tag)
            .map_err(|e| format!("create_element failed: {:?}", e))?;
        if !css.is_empty() {
            element
                .set_attribute("style", css)
                .map_err(|e| format!("set_attribute failed: {:?}", e))?;
        }
        Ok(element)
    }
}

/// Remove one inline style property, dropping the attribute once empty.
fn clear_style_property(element: &Element, property: &str) {
    let Some(html) = element.dyn_ref::<HtmlElement>() else {
        return;
    };
    let style = html.style();
    let _ = style.remove_property(property);
    if style.length() == 0 {
        let _ = element.remove_attribute("style");
    }
}

impl EditableSurface for DomSurface {
    type Range = Range;
    type Node = Element;

    fn current_range(&self) -> Option<Range> {
        let selection = self.selection()?;
        if selection.range_count() == 0 {
            return None;
        }
        let range = selection.get_range_at(0).ok()?;
        let ancestor = range.common_ancestor_container().ok()?;
        self.owns(&ancestor).then(|| range.clone_range())
    }

    fn restore_range(&mut self, range: &Range) -> Result<(), SurfaceError> {
        let start = range
            .start_container()
            .map_err(|e| format!("start_container failed: {:?}", e))?;
        let end = range
            .end_container()
            .map_err(|e| format!("end_container failed: {:?}", e))?;
        if !self.owns(&start) || !self.owns(&end) {
            return Err(SurfaceError::RestoreMiss);
        }
        self.select(range)
    }

    fn is_collapsed(&self, range: &Range) -> bool {
        range.collapsed()
    }

    fn selected_text(&self) -> String {
        if self.current_range().is_none() {
            return String::new();
        }
        self.selection()
            .map(|s| String::from(s.to_string()))
            .unwrap_or_default()
    }

    fn focus(&mut self) {
        if let Err(e) = self.root.focus() {
            tracing::debug!(target: "atelier::surface", "focus failed: {:?}", e);
        }
        if self.current_range().is_some() {
            return;
        }
        let caret = self.document.create_range().and_then(|range| {
            range.set_start(&self.root, 0)?;
            range.collapse_with_to_start(true);
            Ok(range)
        });
        match caret {
            Ok(range) => {
                if let Err(err) = self.select(&range) {
                    tracing::debug!(target: "atelier::surface", %err, "could not place default caret");
                }
            }
            Err(e) => tracing::debug!(target: "atelier::surface", "create_range failed: {:?}", e),
        }
    }

    fn exec_native(&mut self, command: NativeCommand<'_>) -> Result<(), SurfaceError> {
        tracing::trace!(target: "atelier::surface", command = command.name(), "execCommand");
        if matches!(
            command,
            NativeCommand::ForeColor(_) | NativeCommand::FontName(_) | NativeCommand::FontSize(_)
        ) {
            // Ask for <font> output rather than browser-specific spans.
            self.exec("styleWithCSS", "false")?;
        }
        self.exec(command.name(), command.value().unwrap_or(""))
    }

    fn wrap_range(&mut self, range: &Range, css: &str) -> Result<Element, SurfaceError> {
        let span = self.styled_element("span", css)?;
        // Throws InvalidStateError when an element is partially selected.
        range
            .surround_contents(&span)
            .map_err(|_| SurfaceError::WrapRejected)?;
        self.select_contents(&span)?;
        Ok(span)
    }

    fn legacy_font_nodes(&self) -> Vec<Element> {
        let Ok(list) = self.root.query_selector_all("font") else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.get(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn replace_element(&mut self, node: &Element, tag: &str, css: &str) -> Result<Element, SurfaceError> {
        if !self.contains(node) {
            return Err(SurfaceError::NodeGone);
        }
        let was_selected = self
            .current_range()
            .is_some_and(|r| r.intersects_node(node).unwrap_or(false));
        let replacement = self.styled_element(tag, css)?;
        while let Some(child) = node.first_child() {
            replacement
                .append_child(&child)
                .map_err(|e| format!("append_child failed: {:?}", e))?;
        }
        node.replace_with_with_node_1(&replacement)
            .map_err(|e| format!("replace_with failed: {:?}", e))?;
        if was_selected {
            self.select_contents(&replacement)?;
        }
        Ok(replacement)
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn content(&self) -> String {
        let Ok(copy) = self.root.clone_node_with_deep(true) else {
            return self.root.inner_html();
        };
        let Ok(copy) = copy.dyn_into::<Element>() else {
            return self.root.inner_html();
        };
        let selector = format!("[{}]", SELECTED_IMAGE_ATTR);
        if let Ok(marked) = copy.query_selector_all(&selector) {
            for node in (0..marked.length()).filter_map(|i| marked.get(i)) {
                if let Ok(el) = node.dyn_into::<Element>() {
                    let _ = el.remove_attribute(SELECTED_IMAGE_ATTR);
                    clear_style_property(&el, "outline");
                }
            }
        }
        copy.inner_html()
    }

    fn set_content(&mut self, markup: &str) {
        self.root.set_inner_html(markup);
    }

    fn contains(&self, node: &Element) -> bool {
        let root: &Element = self.root.as_ref();
        node != root && self.owns(node)
    }

    fn is_image(&self, node: &Element) -> bool {
        self.contains(node) && node.tag_name().eq_ignore_ascii_case("img")
    }

    fn rendered_width(&self, node: &Element) -> Option<f64> {
        if !self.contains(node) {
            return None;
        }
        Some(node.get_bounding_client_rect().width())
    }

    fn set_width(&mut self, node: &Element, width: Option<f64>) -> Result<(), SurfaceError> {
        if !self.contains(node) {
            return Err(SurfaceError::NodeGone);
        }
        let html = node.dyn_ref::<HtmlElement>().ok_or("element is not an HtmlElement")?;
        let _ = node.remove_attribute("width");
        let _ = node.remove_attribute("height");
        match width {
            Some(w) => {
                let style = html.style();
                style
                    .set_property("width", &format!("{}px", w))
                    .map_err(|e| format!("set_property failed: {:?}", e))?;
                style
                    .set_property("height", "auto")
                    .map_err(|e| format!("set_property failed: {:?}", e))?;
            }
            None => {
                clear_style_property(node, "width");
                clear_style_property(node, "height");
            }
        }
        Ok(())
    }

    fn set_selected_marker(&mut self, node: &Element, selected: bool) {
        if selected {
            if !self.contains(node) {
                return;
            }
            let _ = node.set_attribute(SELECTED_IMAGE_ATTR, "true");
            if let Some(html) = node.dyn_ref::<HtmlElement>() {
                let _ = html.style().set_property("outline", SELECTED_OUTLINE);
            }
        } else {
            let _ = node.remove_attribute(SELECTED_IMAGE_ATTR);
            clear_style_property(node, "outline");
        }
    }
}
