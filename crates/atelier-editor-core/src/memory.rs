//! Headless [`EditableSurface`] over a [`MarkupTree`].
//!
//! `MemorySurface` behaves like a browser `contenteditable` closely enough to
//! drive the engine without a DOM: native commands produce the markup browsers
//! produce (`<b>`, `text-align` on the containing block, `<font>` for
//! colour/face/size), and [`EditableSurface::wrap_range`] follows DOM
//! `surroundContents`, rejecting ranges that partially select an element.
//!
//! Positions are measured on a linear axis: each text char and each void
//! element occupies one unit, tags occupy none. Formatting never changes that
//! axis, so a selection can be re-placed after any structural edit from its
//! linear span alone.

use std::collections::HashMap;

use tracing::trace;

use crate::error::SurfaceError;
use crate::markup::{Element, MarkupTree, NodeId, NodeKind};
use crate::surface::{EditableSurface, NativeCommand, SELECTED_IMAGE_ATTR};

/// Width reported for images with no explicit size, standing in for layout.
pub const DEFAULT_IMAGE_WIDTH: f64 = 300.0;

const BOLD_TAGS: &[&str] = &["b", "strong"];
const ITALIC_TAGS: &[&str] = &["i", "em"];
const UNDERLINE_TAGS: &[&str] = &["u"];

/// A point in the tree. `offset` counts chars in a text node and children in
/// an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryRange {
    pub start: Boundary,
    pub end: Boundary,
}

impl MemoryRange {
    pub fn caret(at: Boundary) -> Self {
        Self { start: at, end: at }
    }
}

/// Which neighbour wins when a linear position sits between two nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    /// Prefer the start of the following text.
    Forward,
    /// Prefer the end of the preceding text.
    Backward,
}

/// Linear spans for every attached node, plus document order.
struct Layout {
    spans: HashMap<NodeId, (usize, usize)>,
    order: Vec<NodeId>,
}

impl Layout {
    fn span(&self, id: NodeId) -> Option<(usize, usize)> {
        self.spans.get(&id).copied()
    }
}

/// In-memory editable document with a single selection.
#[derive(Clone, Debug, Default)]
pub struct MemorySurface {
    tree: MarkupTree,
    selection: Option<MemoryRange>,
    focused: bool,
    read_only: bool,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_markup(markup: &str) -> Self {
        Self {
            tree: MarkupTree::parse(markup),
            selection: None,
            focused: false,
            read_only: false,
        }
    }

    pub fn tree(&self) -> &MarkupTree {
        &self.tree
    }

    pub fn selection(&self) -> Option<MemoryRange> {
        self.selection
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// A read-only surface refuses every native command, like a host that
    /// turned `contenteditable` off.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Move focus (and with it the selection) out of the surface, the way
    /// clicking a toolbar input does.
    pub fn blur(&mut self) {
        self.focused = false;
        self.selection = None;
    }

    /// Select the linear span `[start, end)`. Void elements count as one unit.
    pub fn select_text(&mut self, start: usize, end: usize) {
        self.place(start.min(end), start.max(end));
        self.focused = true;
    }

    /// Select the first occurrence of `needle`. Returns false when absent.
    pub fn select_substring(&mut self, needle: &str) -> bool {
        let haystack = self.linear_text();
        let Some(byte) = haystack.find(needle) else {
            return false;
        };
        let start = haystack[..byte].chars().count();
        self.select_text(start, start + needle.chars().count());
        true
    }

    /// Collapse the selection to a linear position.
    pub fn place_caret(&mut self, at: usize) {
        self.select_text(at, at);
    }

    /// Caret at the very end of the document.
    pub fn place_caret_at_end(&mut self) {
        let end = self.layout().span(self.tree.root()).map_or(0, |(_, e)| e);
        self.place_caret(end);
    }

    /// Image elements in document order.
    pub fn images(&self) -> Vec<NodeId> {
        self.tree.elements_by_tag(self.tree.root(), "img")
    }

    /// Whether `node` carries the selected-image marker.
    pub fn is_marked(&self, node: NodeId) -> bool {
        self.tree
            .element(node)
            .is_some_and(|el| el.attr(SELECTED_IMAGE_ATTR).is_some())
    }

    /// Document text with void elements as U+FFFC, so char index == linear position.
    fn linear_text(&self) -> String {
        let mut out = String::new();
        for id in self.tree.descendants(self.tree.root()) {
            match self.tree.kind(id) {
                Some(NodeKind::Text(t)) => out.push_str(t),
                Some(NodeKind::Element(el)) if el.is_void() => out.push('\u{fffc}'),
                _ => {}
            }
        }
        out
    }

    // === Linear positions ===

    fn layout(&self) -> Layout {
        let mut layout = Layout {
            spans: HashMap::new(),
            order: Vec::new(),
        };
        let mut pos = 0;
        self.measure(self.tree.root(), &mut pos, &mut layout);
        layout
    }

    fn measure(&self, id: NodeId, pos: &mut usize, layout: &mut Layout) {
        let start = *pos;
        layout.order.push(id);
        match self.tree.kind(id) {
            Some(NodeKind::Text(t)) => *pos += t.chars().count(),
            Some(NodeKind::Element(el)) if el.is_void() => *pos += 1,
            Some(NodeKind::Element(_)) => {
                for child in self.tree.children(id) {
                    self.measure(*child, pos, layout);
                }
            }
            None => {}
        }
        layout.spans.insert(id, (start, *pos));
    }

    fn linear(&self, layout: &Layout, b: Boundary) -> Option<usize> {
        let (start, end) = layout.span(b.node)?;
        if self.tree.is_text(b.node) {
            return Some(start + b.offset.min(end - start));
        }
        match self.tree.children(b.node).get(b.offset) {
            Some(child) => layout.span(*child).map(|(s, _)| s),
            None => Some(end),
        }
    }

    /// The current selection as an ordered linear span.
    fn selection_span(&self) -> Option<(usize, usize)> {
        let range = self.selection?;
        if !self.range_is_live(&range) {
            return None;
        }
        let layout = self.layout();
        let a = self.linear(&layout, range.start)?;
        let b = self.linear(&layout, range.end)?;
        Some((a.min(b), a.max(b)))
    }

    fn range_is_live(&self, range: &MemoryRange) -> bool {
        [range.start, range.end].iter().all(|b| {
            self.tree.is_attached(b.node) && b.offset <= self.tree.node_len(b.node)
        })
    }

    fn locate(&self, layout: &Layout, pos: usize, side: Side) -> Boundary {
        let texts: Vec<(NodeId, usize, usize)> = layout
            .order
            .iter()
            .filter(|id| self.tree.is_text(**id))
            .filter_map(|id| layout.span(*id).map(|(s, e)| (*id, s, e)))
            .collect();
        let forward = texts.iter().find(|(_, s, e)| *s <= pos && pos < *e);
        let backward = texts.iter().find(|(_, s, e)| *s < pos && pos <= *e);
        let preferred = match side {
            Side::Forward => forward.or(backward),
            Side::Backward => backward.or(forward),
        };
        let any = || texts.iter().find(|(_, s, e)| *s <= pos && pos <= *e);
        if let Some((id, s, _)) = preferred.or_else(any) {
            return Boundary::new(*id, pos - s);
        }
        // No text at this position: fall back to the deepest element boundary.
        let mut container = self.tree.root();
        loop {
            let children = self.tree.children(container);
            let index = children
                .iter()
                .take_while(|c| {
                    layout.span(**c).is_some_and(|(s, e)| {
                        e < pos || (e == pos && s < e && !self.is_container(**c))
                    })
                })
                .count();
            let descend = children.get(index).copied().filter(|c| {
                self.is_container(*c)
                    && layout.span(*c).is_some_and(|(s, e)| s <= pos && pos <= e)
            });
            match descend {
                Some(child) => container = child,
                None => return Boundary::new(container, index),
            }
        }
    }

    /// Non-void element.
    fn is_container(&self, id: NodeId) -> bool {
        self.tree.element(id).is_some_and(|el| !el.is_void())
    }

    fn place(&mut self, start: usize, end: usize) {
        let layout = self.layout();
        let range = if start == end {
            MemoryRange::caret(self.locate(&layout, start, Side::Backward))
        } else {
            MemoryRange {
                start: self.locate(&layout, start, Side::Forward),
                end: self.locate(&layout, end, Side::Backward),
            }
        };
        self.selection = Some(range);
    }

    /// Ensure no text node straddles `pos`.
    fn split_at(&mut self, pos: usize) {
        let layout = self.layout();
        let straddling = layout.order.iter().find_map(|id| {
            let (s, e) = layout.span(*id)?;
            (self.tree.is_text(*id) && s < pos && pos < e).then(|| (*id, pos - s))
        });
        if let Some((id, offset)) = straddling {
            self.tree.split_text(id, offset);
        }
    }

    /// Text nodes and void elements wholly inside `[a, b)`, in document order.
    fn leaves_within(&self, layout: &Layout, a: usize, b: usize, text_only: bool) -> Vec<NodeId> {
        layout
            .order
            .iter()
            .copied()
            .filter(|id| {
                let is_leaf = match self.tree.kind(*id) {
                    Some(NodeKind::Text(_)) => true,
                    Some(NodeKind::Element(el)) => el.is_void() && !text_only,
                    None => false,
                };
                is_leaf
                    && layout
                        .span(*id)
                        .is_some_and(|(s, e)| s < e && a <= s && e <= b)
            })
            .collect()
    }

    /// Leaves touched by `[a, b)`; for a caret, the leaf it sits in or next to.
    fn leaves_touching(&self, layout: &Layout, a: usize, b: usize) -> Vec<NodeId> {
        let leaves = layout.order.iter().copied().filter(|id| match self.tree.kind(*id) {
            Some(NodeKind::Text(_)) => true,
            Some(NodeKind::Element(el)) => el.is_void(),
            None => false,
        });
        if a == b {
            return leaves
                .filter(|id| layout.span(*id).is_some_and(|(s, e)| s <= a && a <= e))
                .take(1)
                .collect();
        }
        leaves
            .filter(|id| layout.span(*id).is_some_and(|(s, e)| s < b && a < e))
            .collect()
    }

    // === Structural helpers ===

    /// Wrap `leaf` in a new `tag`, merging into an identical previous sibling.
    fn wrap_leaf(&mut self, leaf: NodeId, element: Element) -> NodeId {
        let prev = self
            .tree
            .index_in_parent(leaf)
            .filter(|i| *i > 0)
            .and_then(|i| {
                let parent = self.tree.parent(leaf)?;
                self.tree.children(parent).get(i - 1).copied()
            });
        if let Some(prev) = prev {
            if self.tree.element(prev) == Some(&element) {
                self.tree.append_child(prev, leaf);
                return prev;
            }
        }
        let wrapper = self.tree.create_element(element);
        self.tree.insert_before(leaf, wrapper);
        self.tree.append_child(wrapper, leaf);
        wrapper
    }

    /// Split `node` at linear `pos`, moving everything from `pos` onward into
    /// a copy inserted right after it. Straddling children split recursively.
    /// Returns the copy, or `None` when `pos` is not strictly inside `node`.
    fn split_element(&mut self, node: NodeId, pos: usize) -> Option<NodeId> {
        let layout = self.layout();
        let (start, end) = layout.span(node)?;
        if pos <= start || pos >= end {
            return None;
        }
        let element = self.tree.element(node)?.clone();
        let copy = self.tree.create_element(element);
        self.tree.insert_after(node, copy);
        for child in self.tree.children(node).to_vec() {
            let Some((s, e)) = layout.span(child) else {
                continue;
            };
            if s >= pos {
                self.tree.append_child(copy, child);
            } else if e > pos {
                if let Some(tail) = self.split_element(child, pos) {
                    self.tree.append_child(copy, tail);
                }
            }
        }
        Some(copy)
    }

    fn toggle_inline(&mut self, tags: &[&str]) -> Result<(), SurfaceError> {
        let (a, b) = self.selection_span().ok_or(SurfaceError::NoSelection)?;
        if a == b {
            return Ok(());
        }
        self.split_at(b);
        self.split_at(a);
        let layout = self.layout();
        let leaves = self.leaves_within(&layout, a, b, true);
        let formatting = |leaf: NodeId| {
            self.tree
                .closest(leaf, |el| tags.contains(&el.tag.as_str()))
        };
        let all_formatted = !leaves.is_empty() && leaves.iter().all(|l| formatting(*l).is_some());
        if all_formatted {
            // Unwrap only the selected slice of each wrapper. Nested
            // wrappers surface one level per pass.
            loop {
                let mut wrappers: Vec<NodeId> = Vec::new();
                for leaf in &leaves {
                    let found = self
                        .tree
                        .closest(*leaf, |el| tags.contains(&el.tag.as_str()));
                    if let Some(wrapper) = found.filter(|w| !wrappers.contains(w)) {
                        wrappers.push(wrapper);
                    }
                }
                if wrappers.is_empty() {
                    break;
                }
                for wrapper in wrappers {
                    self.split_element(wrapper, b);
                    let middle = self.split_element(wrapper, a).unwrap_or(wrapper);
                    self.tree.unwrap(middle);
                }
            }
        } else {
            let bare: Vec<NodeId> = leaves
                .into_iter()
                .filter(|l| formatting(*l).is_none())
                .collect();
            for leaf in bare {
                self.wrap_leaf(leaf, Element::new(tags[0]));
            }
        }
        self.place(a, b);
        Ok(())
    }

    fn closest_block(&self, leaf: NodeId) -> Option<NodeId> {
        self.tree
            .closest(leaf, |el| el.is_block() && el.tag != "ul" && el.tag != "ol")
    }

    /// Wrap the run of root-level inline content around `leaf` in a `<div>`.
    fn ensure_block(&mut self, leaf: NodeId) -> NodeId {
        if let Some(block) = self.closest_block(leaf) {
            return block;
        }
        let root = self.tree.root();
        let mut top = leaf;
        while let Some(parent) = self.tree.parent(top) {
            if parent == root {
                break;
            }
            top = parent;
        }
        let siblings = self.tree.children(root).to_vec();
        let Some(index) = siblings.iter().position(|c| *c == top) else {
            return top;
        };
        let is_inline = |id: &NodeId| self.tree.element(*id).is_none_or(|el| !el.is_block());
        let first = siblings[..index]
            .iter()
            .rposition(|c| !is_inline(c))
            .map_or(0, |i| i + 1);
        let last = siblings[index..]
            .iter()
            .position(|c| !is_inline(c))
            .map_or(siblings.len(), |i| index + i);
        let div = self.tree.create_element(Element::new("div"));
        self.tree.insert_before(siblings[first], div);
        for node in &siblings[first..last] {
            self.tree.append_child(div, *node);
        }
        div
    }

    fn blocks_for_selection(&mut self) -> Result<(usize, usize, Vec<NodeId>), SurfaceError> {
        let (a, b) = self.selection_span().ok_or(SurfaceError::NoSelection)?;
        let layout = self.layout();
        let leaves = self.leaves_touching(&layout, a, b);
        let mut blocks = Vec::new();
        for leaf in leaves {
            let block = self.ensure_block(leaf);
            if !blocks.contains(&block) {
                blocks.push(block);
            }
        }
        Ok((a, b, blocks))
    }

    fn align(&mut self, value: &str) -> Result<(), SurfaceError> {
        let (a, b, blocks) = self.blocks_for_selection()?;
        for block in blocks {
            if let Some(el) = self.tree.element_mut(block) {
                el.set_style("text-align", value);
            }
        }
        self.place(a, b);
        Ok(())
    }

    fn toggle_list(&mut self, tag: &str) -> Result<(), SurfaceError> {
        let (a, b) = self.selection_span().ok_or(SurfaceError::NoSelection)?;
        let layout = self.layout();
        let leaves = self.leaves_touching(&layout, a, b);
        let items: Vec<Option<NodeId>> = leaves
            .iter()
            .map(|l| self.tree.closest(*l, |el| el.tag == "li"))
            .collect();

        if !items.is_empty() && items.iter().all(Option::is_some) {
            let touched: Vec<NodeId> = items.into_iter().flatten().collect();
            let mut lists: Vec<NodeId> = Vec::new();
            for item in &touched {
                if let Some(list) = self.tree.parent(*item) {
                    if !lists.contains(&list) {
                        lists.push(list);
                    }
                }
            }
            let same_kind = lists.iter().all(|l| self.tree.tag(*l) == Some(tag));
            let retag = (!same_kind).then_some(tag);
            for list in lists {
                self.restructure_list(list, &touched, retag);
            }
        } else {
            let mut blocks = Vec::new();
            for (leaf, item) in leaves.iter().zip(items) {
                if item.is_some() {
                    continue;
                }
                let block = self.ensure_block(*leaf);
                if !blocks.contains(&block) {
                    blocks.push(block);
                }
            }
            if let Some(first) = blocks.first().copied() {
                let list = self.tree.create_element(Element::new(tag));
                self.tree.insert_before(first, list);
                for block in blocks {
                    let li = self.tree.create_element(Element::new("li"));
                    self.tree.adopt_children(block, li);
                    self.tree.append_child(list, li);
                    self.tree.remove(block);
                }
            }
        }
        self.place(a, b);
        Ok(())
    }

    /// Rebuild `list` around its `touched` items. With no `retag` they leave
    /// the list as paragraphs; otherwise they move into a list of that tag.
    /// Untouched items keep the original list element, split into runs.
    fn restructure_list(&mut self, list: NodeId, touched: &[NodeId], retag: Option<&str>) {
        let Some(original) = self.tree.element(list).cloned() else {
            return;
        };
        let mut run: Option<(bool, NodeId)> = None;
        for item in self.tree.children(list).to_vec() {
            let is_touched = touched.contains(&item);
            let element = match (is_touched, retag) {
                (true, None) => {
                    run = None;
                    let p = self.tree.create_element(Element::new("p"));
                    self.tree.insert_before(list, p);
                    self.tree.adopt_children(item, p);
                    self.tree.remove(item);
                    continue;
                }
                (true, Some(tag)) => Element::new(tag),
                (false, _) => original.clone(),
            };
            let container = match run {
                Some((kind, node)) if kind == is_touched => node,
                _ => {
                    let node = self.tree.create_element(element);
                    self.tree.insert_before(list, node);
                    run = Some((is_touched, node));
                    node
                }
            };
            self.tree.append_child(container, item);
        }
        self.tree.remove(list);
    }

    fn apply_font(&mut self, attr: &str, value: &str) -> Result<(), SurfaceError> {
        let (a, b) = self.selection_span().ok_or(SurfaceError::NoSelection)?;
        if a == b {
            return Ok(());
        }
        self.split_at(b);
        self.split_at(a);
        let layout = self.layout();
        for leaf in self.leaves_within(&layout, a, b, true) {
            let sole_font_parent = self.tree.parent(leaf).filter(|p| {
                self.tree.tag(*p) == Some("font") && self.tree.children(*p).len() == 1
            });
            if let Some(font) = sole_font_parent {
                if let Some(el) = self.tree.element_mut(font) {
                    el.set_attr(attr, value);
                }
            } else {
                self.wrap_leaf(leaf, Element::new("font").with_attr(attr, value));
            }
        }
        self.place(a, b);
        Ok(())
    }

    /// Remove everything inside `[a, b)`, pruning inline elements left empty.
    fn delete_span(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.split_at(b);
        self.split_at(a);
        let layout = self.layout();
        for leaf in self.leaves_within(&layout, a, b, false) {
            let mut parent = self.tree.parent(leaf);
            self.tree.remove(leaf);
            while let Some(p) = parent {
                let prunable = p != self.tree.root()
                    && self.tree.children(p).is_empty()
                    && self.tree.element(p).is_some_and(|el| !el.is_block());
                if !prunable {
                    break;
                }
                parent = self.tree.parent(p);
                self.tree.remove(p);
            }
        }
    }

    /// Turn a boundary into a `(parent, index)` insertion point, splitting a
    /// text node if the boundary falls inside one.
    fn insertion_point(&mut self, at: Boundary) -> (NodeId, usize) {
        if !self.tree.is_text(at.node) {
            return (at.node, at.offset);
        }
        let parent = self.tree.parent(at.node).unwrap_or(self.tree.root());
        let index = self.tree.index_in_parent(at.node).unwrap_or(0);
        match at.offset {
            0 => (parent, index),
            o if o >= self.tree.node_len(at.node) => (parent, index + 1),
            o => {
                self.tree.split_text(at.node, o);
                (parent, index + 1)
            }
        }
    }

    /// Clear the selection's contents and return the caret left behind.
    fn collapse_selection(&mut self) -> Result<Boundary, SurfaceError> {
        let range = self.current_range().ok_or(SurfaceError::NoSelection)?;
        if range.start == range.end {
            return Ok(range.start);
        }
        let (a, b) = self.selection_span().ok_or(SurfaceError::NoSelection)?;
        self.delete_span(a, b);
        let layout = self.layout();
        Ok(self.locate(&layout, a, Side::Backward))
    }

    fn insert_html(&mut self, html: &str) -> Result<(), SurfaceError> {
        let at = self.collapse_selection()?;
        let (parent, index) = self.insertion_point(at);
        let nodes = self.tree.parse_fragment(html);
        let count = nodes.len();
        for (i, node) in nodes.into_iter().enumerate() {
            self.tree.insert_child(parent, index + i, node);
        }
        self.selection = Some(MemoryRange::caret(Boundary::new(parent, index + count)));
        Ok(())
    }

    fn insert_text(&mut self, text: &str) -> Result<(), SurfaceError> {
        let mut at = self.collapse_selection()?;
        if !self.tree.is_text(at.node) && at.offset > 0 {
            // Append to a text node sitting right before an element caret.
            let prev = self.tree.children(at.node).get(at.offset - 1).copied();
            if let Some(prev) = prev.filter(|p| self.tree.is_text(*p)) {
                at = Boundary::new(prev, self.tree.node_len(prev));
            }
        }
        let inserted = text.chars().count();
        if let Some(existing) = self.tree.text(at.node) {
            let byte = existing
                .char_indices()
                .nth(at.offset)
                .map_or(existing.len(), |(i, _)| i);
            let mut updated = existing.to_string();
            updated.insert_str(byte, text);
            self.tree.set_text(at.node, updated);
            let caret = Boundary::new(at.node, at.offset + inserted);
            self.selection = Some(MemoryRange::caret(caret));
            return Ok(());
        }
        let node = self.tree.create_text(text);
        self.tree.insert_child(at.node, at.offset, node);
        self.selection = Some(MemoryRange::caret(Boundary::new(node, inserted)));
        Ok(())
    }

    fn live_element(&self, node: NodeId) -> Result<&Element, SurfaceError> {
        if !self.contains(&node) {
            return Err(SurfaceError::NodeGone);
        }
        self.tree.element(node).ok_or(SurfaceError::NodeGone)
    }
}

impl EditableSurface for MemorySurface {
    type Range = MemoryRange;
    type Node = NodeId;

    fn current_range(&self) -> Option<MemoryRange> {
        self.selection.filter(|r| self.range_is_live(r))
    }

    fn restore_range(&mut self, range: &MemoryRange) -> Result<(), SurfaceError> {
        if !self.range_is_live(range) {
            return Err(SurfaceError::RestoreMiss);
        }
        self.selection = Some(*range);
        Ok(())
    }

    fn is_collapsed(&self, range: &MemoryRange) -> bool {
        if range.start == range.end {
            return true;
        }
        let layout = self.layout();
        match (self.linear(&layout, range.start), self.linear(&layout, range.end)) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }

    fn selected_text(&self) -> String {
        let Some((a, b)) = self.selection_span() else {
            return String::new();
        };
        self.linear_text().chars().skip(a).take(b - a).filter(|c| *c != '\u{fffc}').collect()
    }

    fn focus(&mut self) {
        self.focused = true;
        if self.current_range().is_none() {
            self.place(0, 0);
        }
    }

    fn exec_native(&mut self, command: NativeCommand<'_>) -> Result<(), SurfaceError> {
        trace!(target: "atelier::surface", command = command.name(), "memory exec");
        if self.read_only {
            return Err(format!("{} not applied, surface is read-only", command.name()).into());
        }
        match command {
            NativeCommand::Bold => self.toggle_inline(BOLD_TAGS),
            NativeCommand::Italic => self.toggle_inline(ITALIC_TAGS),
            NativeCommand::Underline => self.toggle_inline(UNDERLINE_TAGS),
            NativeCommand::JustifyLeft => self.align("left"),
            NativeCommand::JustifyCenter => self.align("center"),
            NativeCommand::JustifyRight => self.align("right"),
            NativeCommand::InsertUnorderedList => self.toggle_list("ul"),
            NativeCommand::InsertOrderedList => self.toggle_list("ol"),
            NativeCommand::ForeColor(value) => self.apply_font("color", value),
            NativeCommand::FontName(value) => self.apply_font("face", value),
            NativeCommand::FontSize(value) => self.apply_font("size", value),
            NativeCommand::InsertHtml(html) => self.insert_html(html),
            NativeCommand::InsertText(text) => self.insert_text(text),
        }
    }

    fn wrap_range(&mut self, range: &MemoryRange, css: &str) -> Result<NodeId, SurfaceError> {
        if !self.range_is_live(range) {
            return Err(SurfaceError::RestoreMiss);
        }
        let container = |b: &Boundary| {
            if self.tree.is_text(b.node) {
                self.tree.parent(b.node)
            } else {
                Some(b.node)
            }
        };
        let parent = container(&range.start).ok_or(SurfaceError::WrapRejected)?;
        if container(&range.end) != Some(parent) {
            return Err(SurfaceError::WrapRejected);
        }

        let mut end = range.end;
        let start_index = if self.tree.is_text(range.start.node) {
            let index = self
                .tree
                .index_in_parent(range.start.node)
                .ok_or(SurfaceError::NodeGone)?;
            let len = self.tree.node_len(range.start.node);
            match range.start.offset {
                0 => index,
                o if o >= len => index + 1,
                o => {
                    let tail = self
                        .tree
                        .split_text(range.start.node, o)
                        .ok_or(SurfaceError::NodeGone)?;
                    if end.node == range.start.node {
                        end = Boundary::new(tail, end.offset.saturating_sub(o));
                    }
                    index + 1
                }
            }
        } else {
            range.start.offset
        };
        let end_index = if self.tree.is_text(end.node) {
            let index = self
                .tree
                .index_in_parent(end.node)
                .ok_or(SurfaceError::NodeGone)?;
            let len = self.tree.node_len(end.node);
            match end.offset {
                0 => index,
                o if o >= len => index + 1,
                o => {
                    self.tree.split_text(end.node, o);
                    index + 1
                }
            }
        } else {
            end.offset
        };
        if start_index > end_index {
            return Err(SurfaceError::WrapRejected);
        }

        let moved = self.tree.children(parent)[start_index..end_index].to_vec();
        let mut span = Element::new("span");
        if !css.is_empty() {
            span.set_attr("style", css);
        }
        let span = self.tree.create_element(span);
        self.tree.insert_child(parent, start_index, span);
        for node in &moved {
            self.tree.append_child(span, *node);
        }
        self.selection = Some(MemoryRange {
            start: Boundary::new(span, 0),
            end: Boundary::new(span, moved.len()),
        });
        Ok(span)
    }

    fn legacy_font_nodes(&self) -> Vec<NodeId> {
        self.tree.elements_by_tag(self.tree.root(), "font")
    }

    fn replace_element(&mut self, node: &NodeId, tag: &str, css: &str) -> Result<NodeId, SurfaceError> {
        self.live_element(*node)?;
        let span = self.selection_span();
        let mut element = Element::new(tag);
        if !css.is_empty() {
            element.set_attr("style", css);
        }
        let replacement = self.tree.create_element(element);
        self.tree.insert_before(*node, replacement);
        self.tree.adopt_children(*node, replacement);
        self.tree.remove(*node);
        if let Some((a, b)) = span {
            self.place(a, b);
        }
        Ok(replacement)
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.live_element(*node).ok()?.attr(name).map(str::to_string)
    }

    fn content(&self) -> String {
        self.tree.serialize()
    }

    fn set_content(&mut self, markup: &str) {
        let root = self.tree.root();
        self.tree.set_inner_html(root, markup);
        self.selection = None;
    }

    fn contains(&self, node: &NodeId) -> bool {
        *node != self.tree.root() && self.tree.is_attached(*node)
    }

    fn is_image(&self, node: &NodeId) -> bool {
        self.contains(node) && self.tree.tag(*node) == Some("img")
    }

    fn rendered_width(&self, node: &NodeId) -> Option<f64> {
        let el = self.live_element(*node).ok()?;
        let from_style = el
            .style("width")
            .and_then(|w| w.strip_suffix("px").and_then(|n| n.trim().parse().ok()));
        let from_attr = || el.attr("width").and_then(|w| w.trim().parse().ok());
        Some(from_style.or_else(from_attr).unwrap_or(DEFAULT_IMAGE_WIDTH))
    }

    fn set_width(&mut self, node: &NodeId, width: Option<f64>) -> Result<(), SurfaceError> {
        self.live_element(*node)?;
        let el = self.tree.element_mut(*node).ok_or(SurfaceError::NodeGone)?;
        el.remove_attr("width");
        el.remove_attr("height");
        match width {
            Some(w) => {
                el.set_style("width", &format!("{}px", w));
                el.set_style("height", "auto");
            }
            None => {
                el.remove_style("width");
                el.remove_style("height");
            }
        }
        Ok(())
    }

    fn set_selected_marker(&mut self, node: &NodeId, selected: bool) {
        if !self.contains(node) {
            return;
        }
        if let Some(el) = self.tree.element_mut(*node) {
            if selected {
                el.set_attr(SELECTED_IMAGE_ATTR, "true");
            } else {
                el.remove_attr(SELECTED_IMAGE_ATTR);
            }
        }
    }
}
