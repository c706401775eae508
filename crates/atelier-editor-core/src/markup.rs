//! In-memory markup tree.
//!
//! An arena of element and text nodes with stable [`NodeId`]s. Ids are never
//! reused: removing a node marks its slot dead, so a handle taken before an
//! edit can always be checked for liveness afterwards.
//!
//! The parser is deliberately tolerant. It accepts the fragment subset the
//! editor emits (and that browsers serialize from a `contenteditable`), never
//! fails, and treats anything it does not understand as text.

use std::fmt;

use pulldown_cmark_escape::{escape_href, escape_html, escape_html_body_text};
use smol_str::SmolStr;

/// Elements without children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements that start a new line box.
const BLOCK_ELEMENTS: &[&str] = &[
    "address",
    "article",
    "blockquote",
    "div",
    "dl",
    "figure",
    "footer",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "li",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "ul",
];

/// Attributes that only exist while the editor is live and never reach
/// serialized content.
pub const TRANSIENT_ATTRS: &[&str] = &[crate::surface::SELECTED_IMAGE_ATTR];

/// Tag of the synthetic container every tree hangs off.
const ROOT_TAG: &str = "#root";

/// Stable handle to a node in a [`MarkupTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// An element's tag and attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub tag: SmolStr,
    pub attrs: Vec<(SmolStr, String)>,
}

impl Element {
    /// Create an element with no attributes. Tag names are lowercased.
    pub fn new(tag: &str) -> Self {
        Self {
            tag: SmolStr::new(tag.to_ascii_lowercase()),
            attrs: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((SmolStr::new(name), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|(n, _)| n == name)?;
        Some(self.attrs.remove(pos).1)
    }

    /// Read one declaration from the inline `style` attribute.
    pub fn style(&self, property: &str) -> Option<String> {
        parse_style(self.attr("style")?)
            .into_iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v)
    }

    /// Set one declaration in the inline `style` attribute, keeping the rest.
    pub fn set_style(&mut self, property: &str, value: &str) {
        let mut decls = self.attr("style").map(parse_style).unwrap_or_default();
        match decls.iter_mut().find(|(p, _)| p == property) {
            Some((_, v)) => *v = value.to_string(),
            None => decls.push((property.to_string(), value.to_string())),
        }
        self.set_attr("style", write_style(&decls));
    }

    /// Drop one declaration; removes the attribute once it is empty.
    pub fn remove_style(&mut self, property: &str) {
        let Some(style) = self.attr("style") else {
            return;
        };
        let mut decls = parse_style(style);
        decls.retain(|(p, _)| p != property);
        if decls.is_empty() {
            self.remove_attr("style");
        } else {
            self.set_attr("style", write_style(&decls));
        }
    }

    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.tag.as_str())
    }

    pub fn is_block(&self) -> bool {
        BLOCK_ELEMENTS.contains(&self.tag.as_str())
    }
}

/// Node payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
}

#[derive(Clone, Debug)]
struct Slot {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    alive: bool,
}

/// Arena-backed markup tree rooted at a synthetic container.
#[derive(Clone, Debug)]
pub struct MarkupTree {
    slots: Vec<Slot>,
    root: NodeId,
}

impl Default for MarkupTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            root: NodeId(0),
        };
        tree.root = tree.alloc(NodeKind::Element(Element::new(ROOT_TAG)));
        tree
    }

    /// Parse a markup fragment into a fresh tree.
    pub fn parse(src: &str) -> Self {
        let mut tree = Self::new();
        let root = tree.root;
        tree.set_inner_html(root, src);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    // === Node access ===

    fn slot(&self, id: NodeId) -> Option<&Slot> {
        self.slots.get(id.index()).filter(|s| s.alive)
    }

    fn slot_mut(&mut self, id: NodeId) -> Option<&mut Slot> {
        self.slots.get_mut(id.index()).filter(|s| s.alive)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.slot(id).map(|s| &s.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id)? {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.slot_mut(id)?.kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Text(t) => Some(t),
            NodeKind::Element(_) => None,
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.text(id).is_some()
    }

    /// Length of a text node in chars; child count for elements.
    pub fn node_len(&self, id: NodeId) -> usize {
        match self.kind(id) {
            Some(NodeKind::Text(t)) => t.chars().count(),
            Some(NodeKind::Element(_)) => self.children(id).len(),
            None => 0,
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let Some(slot) = self.slot_mut(id) {
            if let NodeKind::Text(t) = &mut slot.kind {
                *t = text.into();
            }
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.slot(id).map(|s| s.children.as_slice()).unwrap_or(&[])
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.slot(id).is_some()
    }

    /// Alive and reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// `ancestor` is a strict ancestor of `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Nearest inclusive ancestor matching `pred`, stopping below the root.
    pub fn closest(&self, id: NodeId, mut pred: impl FnMut(&Element) -> bool) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return None;
            }
            if let Some(el) = self.element(node) {
                if pred(el) {
                    return Some(node);
                }
            }
            current = self.parent(node);
        }
        None
    }

    /// All descendants of `id` in document (pre-)order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Text node descendants of `id` in document order.
    pub fn text_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|n| self.is_text(*n))
            .collect()
    }

    /// Element descendants of `id` with the given tag, in document order.
    pub fn elements_by_tag(&self, id: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|n| self.tag(*n) == Some(tag))
            .collect()
    }

    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.text_nodes(id)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    // === Construction & mutation ===

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(Slot {
            kind,
            parent: None,
            children: Vec::new(),
            alive: true,
        });
        id
    }

    /// Create a detached element.
    pub fn create_element(&mut self, element: Element) -> NodeId {
        self.alloc(NodeKind::Element(element))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    /// Remove `id` from its parent without destroying it.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(slot) = self.slot_mut(parent) {
            slot.children.retain(|c| *c != id);
        }
        if let Some(slot) = self.slot_mut(id) {
            slot.parent = None;
        }
    }

    /// Insert `child` into `parent` at `index` (clamped), moving it if attached elsewhere.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if !self.is_alive(parent) || !self.is_alive(child) || child == parent {
            return;
        }
        self.detach(child);
        if let Some(slot) = self.slot_mut(parent) {
            let index = index.min(slot.children.len());
            slot.children.insert(index, child);
        }
        if let Some(slot) = self.slot_mut(child) {
            slot.parent = Some(parent);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let len = self.children(parent).len();
        self.insert_child(parent, len, child);
    }

    /// Insert `node` as the next sibling of `reference`.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) {
        let (Some(parent), Some(index)) = (self.parent(reference), self.index_in_parent(reference))
        else {
            return;
        };
        self.insert_child(parent, index + 1, node);
    }

    /// Insert `node` as the previous sibling of `reference`.
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) {
        let (Some(parent), Some(index)) = (self.parent(reference), self.index_in_parent(reference))
        else {
            return;
        };
        self.insert_child(parent, index, node);
    }

    /// Detach `id` and kill its whole subtree.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        self.detach(id);
        let mut doomed = self.descendants(id);
        doomed.push(id);
        for node in doomed {
            if let Some(slot) = self.slots.get_mut(node.index()) {
                slot.alive = false;
                slot.children.clear();
                slot.parent = None;
            }
        }
    }

    /// Replace an element with its children.
    pub fn unwrap(&mut self, id: NodeId) {
        let (Some(parent), Some(index)) = (self.parent(id), self.index_in_parent(id)) else {
            return;
        };
        let children = self.children(id).to_vec();
        for (offset, child) in children.into_iter().enumerate() {
            self.insert_child(parent, index + offset, child);
        }
        self.remove(id);
    }

    /// Move every child of `from` to the end of `to`.
    pub fn adopt_children(&mut self, from: NodeId, to: NodeId) {
        for child in self.children(from).to_vec() {
            self.append_child(to, child);
        }
    }

    /// Split a text node at a char offset. The head keeps `id`; the tail is
    /// a new node inserted right after it and is returned.
    pub fn split_text(&mut self, id: NodeId, char_offset: usize) -> Option<NodeId> {
        let text = self.text(id)?;
        let byte = text
            .char_indices()
            .nth(char_offset)
            .map(|(i, _)| i)
            .unwrap_or(text.len());
        let tail = text[byte..].to_string();
        let head = text[..byte].to_string();
        self.set_text(id, head);
        let tail_id = self.create_text(tail);
        if self.parent(id).is_some() {
            self.insert_after(id, tail_id);
        }
        Some(tail_id)
    }

    /// Replace the children of `id` with a parsed fragment. Old children die.
    pub fn set_inner_html(&mut self, id: NodeId, src: &str) {
        for child in self.children(id).to_vec() {
            self.remove(child);
        }
        for node in self.parse_fragment(src) {
            self.append_child(id, node);
        }
    }

    /// Parse a fragment into detached nodes owned by this tree.
    pub fn parse_fragment(&mut self, src: &str) -> Vec<NodeId> {
        let holder = self.create_element(Element::new("template"));
        self.parse_into(holder, src);
        let nodes = self.children(holder).to_vec();
        for node in &nodes {
            self.detach(*node);
        }
        self.remove(holder);
        nodes
    }

    fn parse_into(&mut self, container: NodeId, src: &str) {
        let bytes = src.as_bytes();
        let mut stack = vec![container];
        let mut pos = 0;
        let mut text_start = 0;

        while pos < bytes.len() {
            if bytes[pos] != b'<' {
                pos += 1;
                continue;
            }
            let rest = &src[pos..];
            let top = stack.last().copied().unwrap_or(container);

            if rest.starts_with("<!--") {
                self.push_text(top, &src[text_start..pos]);
                pos = rest.find("-->").map(|i| pos + i + 3).unwrap_or(bytes.len());
                text_start = pos;
                continue;
            }

            if rest.starts_with("<!") || rest.starts_with("<?") {
                self.push_text(top, &src[text_start..pos]);
                pos = rest.find('>').map(|i| pos + i + 1).unwrap_or(bytes.len());
                text_start = pos;
                continue;
            }

            if let Some(after_slash) = rest.strip_prefix("</") {
                let Some(close) = after_slash.find('>') else {
                    pos += 1;
                    continue;
                };
                self.push_text(top, &src[text_start..pos]);
                let name = after_slash[..close].trim().to_ascii_lowercase();
                // Unmatched closers are dropped; matched ones also close anything left open inside.
                if let Some(depth) = stack.iter().rposition(|id| self.tag(*id) == Some(name.as_str())) {
                    if depth > 0 {
                        stack.truncate(depth);
                    }
                }
                pos += 2 + close + 1;
                text_start = pos;
                continue;
            }

            match parse_open_tag(rest) {
                Some((element, self_closing, consumed)) => {
                    self.push_text(top, &src[text_start..pos]);
                    let is_void = element.is_void();
                    let id = self.create_element(element);
                    self.append_child(top, id);
                    if !is_void && !self_closing {
                        stack.push(id);
                    }
                    pos += consumed;
                    text_start = pos;
                }
                None => pos += 1,
            }
        }

        let top = stack.last().copied().unwrap_or(container);
        self.push_text(top, &src[text_start..]);
    }

    /// Append decoded text to `parent`, merging with a trailing text node.
    fn push_text(&mut self, parent: NodeId, raw: &str) {
        if raw.is_empty() {
            return;
        }
        let text = decode_entities(raw);
        if let Some(&last) = self.children(parent).last() {
            if let Some(existing) = self.text(last) {
                let merged = format!("{}{}", existing, text);
                self.set_text(last, merged);
                return;
            }
        }
        let id = self.create_text(text);
        self.append_child(parent, id);
    }

    // === Serialization ===

    /// Serialize the whole document (the root's children).
    pub fn serialize(&self) -> String {
        self.inner_html(self.root)
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_node(*child, &mut out);
        }
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => push_text_escaped(out, text),
            Some(NodeKind::Element(el)) => {
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in &el.attrs {
                    if TRANSIENT_ATTRS.contains(&name.as_str()) {
                        continue;
                    }
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    let _ = escape_html(&mut *out, value);
                    out.push('"');
                }
                out.push('>');
                if el.is_void() {
                    return;
                }
                for child in self.children(id) {
                    self.write_node(*child, out);
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
            None => {}
        }
    }
}

/// Escape text for element content, writing U+00A0 back as `&nbsp;` the way
/// browsers serialize it.
fn push_text_escaped(out: &mut String, text: &str) {
    for (i, part) in text.split('\u{a0}').enumerate() {
        if i > 0 {
            out.push_str("&nbsp;");
        }
        let _ = escape_html_body_text(&mut *out, part);
    }
}

/// Escape a string for use as element content.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    push_text_escaped(&mut out, text);
    out
}

/// Escape a string for use inside a double-quoted attribute.
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let _ = escape_html(&mut out, value);
    out
}

/// Escape a URL for an `href`/`src` attribute.
pub fn escape_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    let _ = escape_href(&mut out, url);
    out
}

/// Split an inline style into `(property, value)` pairs. Properties are lowercased.
pub fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim().to_ascii_lowercase();
            let value = value.trim();
            if prop.is_empty() || value.is_empty() {
                return None;
            }
            Some((prop, value.to_string()))
        })
        .collect()
}

/// Inverse of [`parse_style`]; always ends with a semicolon.
pub fn write_style(decls: &[(String, String)]) -> String {
    decls
        .iter()
        .map(|(p, v)| format!("{}: {};", p, v))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse an opening tag at the start of `s`.
///
/// Returns the element, whether it was written self-closing, and the number
/// of bytes consumed. `None` means `<` did not start a tag.
fn parse_open_tag(s: &str) -> Option<(Element, bool, usize)> {
    let bytes = s.as_bytes();
    let mut i = 1;
    if !bytes.get(i)?.is_ascii_alphabetic() {
        return None;
    }
    let name_start = i;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
        i += 1;
    }
    let mut element = Element::new(&s[name_start..i]);

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match *bytes.get(i)? {
            b'>' => return Some((element, false, i + 1)),
            b'/' => {
                if bytes.get(i + 1) == Some(&b'>') {
                    return Some((element, true, i + 2));
                }
                i += 1;
                continue;
            }
            _ => {}
        }

        let attr_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let name = s[attr_start..i].to_ascii_lowercase();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let mut value = String::new();
        if bytes.get(i) == Some(&b'=') {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            let quote = *bytes.get(i)?;
            if quote == b'"' || quote == b'\'' {
                let start = i + 1;
                let end = start + s[start..].find(quote as char)?;
                value = decode_entities(&s[start..end]);
                i = end + 1;
            } else {
                let start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    i += 1;
                }
                value = decode_entities(&s[start..i]);
            }
        }

        if !name.is_empty() && element.attr(&name).is_none() {
            element.attrs.push((SmolStr::new(name), value));
        }
    }
}

/// Decode the character references the editor and browsers emit.
/// Unknown references are left as written.
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp..];
        let decoded = after
            .find(';')
            .filter(|end| *end <= 10)
            .and_then(|end| decode_entity(&after[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &after[end + 1..];
            }
            None => {
                out.push('&');
                rest = &after[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(|c: char| c == 'x' || c == 'X') {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_serialize() {
        let tree = MarkupTree::parse("<p>Hello <b>world</b></p>");
        assert_eq!(tree.serialize(), "<p>Hello <b>world</b></p>");
        let p = tree.children(tree.root())[0];
        assert_eq!(tree.tag(p), Some("p"));
        assert_eq!(tree.text_content(p), "Hello world");
    }

    #[test]
    fn test_void_elements_and_attributes() {
        let tree = MarkupTree::parse(
            "<p>a<br>b<img src='x.png' alt=cat draggable=\"false\"/></p>",
        );
        insta::assert_snapshot!(
            tree.serialize(),
            @r#"<p>a<br>b<img src="x.png" alt="cat" draggable="false"></p>"#
        );
    }

    #[test]
    fn test_entities_round_trip() {
        let src = "<p>a &amp; b &lt;c&gt;&nbsp;d &#169; &#x41;</p>";
        let tree = MarkupTree::parse(src);
        let p = tree.children(tree.root())[0];
        assert_eq!(tree.text_content(p), "a & b <c>\u{a0}d \u{a9} A");
        assert_eq!(tree.serialize(), "<p>a &amp; b &lt;c&gt;&nbsp;d \u{a9} A</p>");
    }

    #[test]
    fn test_unknown_entity_kept() {
        let tree = MarkupTree::parse("fish &chips; & more");
        assert_eq!(tree.text_content(tree.root()), "fish &chips; & more");
    }

    #[test]
    fn test_comments_dropped_and_text_merged() {
        let tree = MarkupTree::parse("a<!-- note -->b");
        assert_eq!(tree.children(tree.root()).len(), 1);
        assert_eq!(tree.serialize(), "ab");
    }

    #[test]
    fn test_unclosed_and_stray_tags() {
        let tree = MarkupTree::parse("<div><p>one</div></span>two");
        assert_eq!(tree.serialize(), "<div><p>one</p></div>two");
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        let tree = MarkupTree::parse("1 < 2");
        assert_eq!(tree.serialize(), "1 &lt; 2");
    }

    #[test]
    fn test_reparse_is_stable() {
        let src = "<ul><li style=\"text-align: center;\">x</li></ul><p><a href=\"https://a.example/?q=1&amp;r=2\" target=\"_blank\">l</a></p>";
        let once = MarkupTree::parse(src).serialize();
        let twice = MarkupTree::parse(&once).serialize();
        assert_eq!(once, twice);
        assert_eq!(once, src);
    }

    #[test]
    fn test_split_text() {
        let mut tree = MarkupTree::parse("<p>héllo</p>");
        let p = tree.children(tree.root())[0];
        let text = tree.children(p)[0];
        let tail = tree.split_text(text, 2).unwrap();
        assert_eq!(tree.text(text), Some("hé"));
        assert_eq!(tree.text(tail), Some("llo"));
        assert_eq!(tree.children(p), &[text, tail]);
    }

    #[test]
    fn test_removed_ids_are_not_reused() {
        let mut tree = MarkupTree::parse("<p>a</p>");
        let p = tree.children(tree.root())[0];
        tree.remove(p);
        assert!(!tree.is_alive(p));
        let root = tree.root();
        tree.set_inner_html(root, "<p>b</p>");
        let new_p = tree.children(root)[0];
        assert_ne!(p, new_p);
        assert!(!tree.is_alive(p));
    }

    #[test]
    fn test_unwrap_keeps_children_in_place() {
        let mut tree = MarkupTree::parse("<p>a<b>b<i>c</i></b>d</p>");
        let b = tree.elements_by_tag(tree.root(), "b")[0];
        tree.unwrap(b);
        assert_eq!(tree.serialize(), "<p>ab<i>c</i>d</p>");
    }

    #[test]
    fn test_style_helpers() {
        let mut el = Element::new("span").with_attr("style", "color: red; font-size:12px");
        assert_eq!(el.style("font-size").as_deref(), Some("12px"));
        el.set_style("color", "#00ff00");
        assert_eq!(el.attr("style"), Some("color: #00ff00; font-size: 12px;"));
        el.remove_style("color");
        el.remove_style("font-size");
        assert_eq!(el.attr("style"), None);
    }

    #[test]
    fn test_transient_attrs_not_serialized() {
        let mut tree = MarkupTree::parse("<img src=\"a.png\">");
        let img = tree.children(tree.root())[0];
        tree.element_mut(img)
            .unwrap()
            .set_attr(crate::surface::SELECTED_IMAGE_ATTR, "true");
        assert_eq!(tree.serialize(), "<img src=\"a.png\">");
    }
}
