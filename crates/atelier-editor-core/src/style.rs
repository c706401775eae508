//! Inline style application by node surgery.
//!
//! Colour, font family and font size have no native command that produces
//! consistent markup, so the selection is wrapped in a `<span style>` directly.
//! When the range cannot be wrapped whole, the native command runs instead and
//! the `<font>` elements it leaves behind are rewritten into the same spans.

use tracing::debug;

use crate::surface::{EditableSurface, NativeCommand};

/// Size passed to the native `fontSize` command. A new `<font size>` carrying it
/// afterwards was produced by this module and maps back to the requested CSS size.
pub const FONT_SIZE_SENTINEL: &str = "7";

/// CSS sizes for the legacy `<font size="1..7">` scale.
const LEGACY_FONT_SIZES: [&str; 7] = ["10px", "13px", "16px", "18px", "24px", "32px", "48px"];

/// A CSS property applied to a selected run of text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InlineStyle {
    Color(String),
    FontFamily(String),
    FontSize(String),
}

impl InlineStyle {
    pub fn property(&self) -> &'static str {
        match self {
            InlineStyle::Color(_) => "color",
            InlineStyle::FontFamily(_) => "font-family",
            InlineStyle::FontSize(_) => "font-size",
        }
    }

    /// Declaration value with anything that could break out of a style
    /// attribute removed. Bare numbers become pixel sizes.
    pub fn value(&self) -> String {
        let raw = match self {
            InlineStyle::Color(v) | InlineStyle::FontFamily(v) | InlineStyle::FontSize(v) => v,
        };
        let clean: String = raw
            .chars()
            .filter(|c| !matches!(c, ';' | '"' | '<' | '>' | '{' | '}'))
            .collect();
        let clean = clean.trim().to_string();
        match self {
            InlineStyle::FontSize(_)
                if !clean.is_empty() && clean.chars().all(|c| c.is_ascii_digit()) =>
            {
                format!("{}px", clean)
            }
            _ => clean,
        }
    }

    /// `property: value;`
    pub fn css(&self) -> String {
        format!("{}: {};", self.property(), self.value())
    }

    fn native<'a>(&self, value: &'a str) -> NativeCommand<'a> {
        match self {
            InlineStyle::Color(_) => NativeCommand::ForeColor(value),
            InlineStyle::FontFamily(_) => NativeCommand::FontName(value),
            InlineStyle::FontSize(_) => NativeCommand::FontSize(FONT_SIZE_SENTINEL),
        }
    }
}

/// How a style ended up in the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StyleOutcome {
    /// Nothing selected; document untouched.
    Collapsed,
    /// Selection wrapped in a new span.
    Wrapped,
    /// Native command ran and its markup was normalized.
    Fallback,
    /// Neither path could style the selection.
    Failed,
}

impl StyleOutcome {
    pub fn changed(self) -> bool {
        matches!(self, StyleOutcome::Wrapped | StyleOutcome::Fallback)
    }
}

/// Apply `style` to the surface's active selection.
pub fn apply_inline_style<S: EditableSurface>(surface: &mut S, style: &InlineStyle) -> StyleOutcome {
    let Some(range) = surface.current_range() else {
        debug!(target: "atelier::style", "no selection to style");
        return StyleOutcome::Collapsed;
    };
    if surface.is_collapsed(&range) {
        debug!(target: "atelier::style", property = style.property(), "collapsed selection, style not applied");
        return StyleOutcome::Collapsed;
    }
    let value = style.value();
    if value.is_empty() {
        return StyleOutcome::Failed;
    }

    match surface.wrap_range(&range, &style.css()) {
        Ok(_) => StyleOutcome::Wrapped,
        Err(err) => {
            debug!(target: "atelier::style", %err, "wrap rejected, falling back to native command");
            // A failed wrap may have touched the selection.
            if let Err(err) = surface.restore_range(&range) {
                debug!(target: "atelier::style", %err, "could not reselect after wrap failure");
            }
            let before = FontSnapshot::take(surface);
            if let Err(err) = surface.exec_native(style.native(&value)) {
                tracing::warn!(target: "atelier::style", %err, "native style command failed");
                return StyleOutcome::Failed;
            }
            normalize_legacy_fonts(surface, style, &before);
            StyleOutcome::Fallback
        }
    }
}

const FONT_ATTRS: [&str; 4] = ["face", "color", "size", "style"];

/// The `<font>` elements of a surface and their attributes at one moment.
pub struct FontSnapshot<N> {
    fonts: Vec<(N, Vec<Option<String>>)>,
}

impl<N: Clone + PartialEq> FontSnapshot<N> {
    pub fn take<S: EditableSurface<Node = N>>(surface: &S) -> Self {
        let fonts = surface
            .legacy_font_nodes()
            .into_iter()
            .map(|node| {
                let attrs = font_attrs(surface, &node);
                (node, attrs)
            })
            .collect();
        Self { fonts }
    }

    /// True when `node` is new since the snapshot or its attributes moved.
    fn is_touched<S: EditableSurface<Node = N>>(&self, surface: &S, node: &N) -> bool {
        match self.fonts.iter().find(|(n, _)| n == node) {
            Some((_, attrs)) => *attrs != font_attrs(surface, node),
            None => true,
        }
    }
}

fn font_attrs<S: EditableSurface>(surface: &S, node: &S::Node) -> Vec<Option<String>> {
    FONT_ATTRS.iter().map(|name| surface.attribute(node, name)).collect()
}

/// Replace each `<font>` created or changed since `before` with an
/// equivalent `<span style>`. Fonts already in the content stay as they are.
///
/// `requested` resolves the sentinel size back to the CSS size that was asked for.
pub fn normalize_legacy_fonts<S: EditableSurface>(
    surface: &mut S,
    requested: &InlineStyle,
    before: &FontSnapshot<S::Node>,
) -> usize {
    let nodes: Vec<S::Node> = surface
        .legacy_font_nodes()
        .into_iter()
        .filter(|node| before.is_touched(surface, node))
        .collect();
    let mut replaced = 0;
    for node in nodes {
        let css = legacy_font_css(surface, &node, requested);
        match surface.replace_element(&node, "span", &css) {
            Ok(_) => replaced += 1,
            Err(err) => debug!(target: "atelier::style", %err, "font element vanished before normalizing"),
        }
    }
    replaced
}

fn legacy_font_css<S: EditableSurface>(surface: &S, node: &S::Node, requested: &InlineStyle) -> String {
    let mut decls = Vec::new();
    if let Some(face) = surface.attribute(node, "face") {
        decls.push(format!("font-family: {};", face));
    }
    if let Some(color) = surface.attribute(node, "color") {
        decls.push(format!("color: {};", color));
    }
    if let Some(size) = surface.attribute(node, "size") {
        let css = match requested {
            InlineStyle::FontSize(_) if size.trim() == FONT_SIZE_SENTINEL => requested.value(),
            _ => legacy_size_to_css(&size).to_string(),
        };
        decls.push(format!("font-size: {};", css));
    }
    if let Some(style) = surface.attribute(node, "style") {
        let style = style.trim();
        if !style.is_empty() {
            decls.push(if style.ends_with(';') {
                style.to_string()
            } else {
                format!("{};", style)
            });
        }
    }
    decls.join(" ")
}

/// CSS size for a `<font size>` value, clamped to the 1..=7 scale.
pub fn legacy_size_to_css(size: &str) -> &'static str {
    let index = size.trim().parse::<usize>().unwrap_or(3).clamp(1, 7);
    LEGACY_FONT_SIZES[index - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySurface;

    #[test]
    fn test_wrap_path() {
        let mut s = MemorySurface::from_markup("<p>make this red</p>");
        s.select_substring("this");
        let outcome = apply_inline_style(&mut s, &InlineStyle::Color("#ff0000".into()));
        assert_eq!(outcome, StyleOutcome::Wrapped);
        insta::assert_snapshot!(
            s.content(),
            @r#"<p>make <span style="color: #ff0000;">this</span> red</p>"#
        );
    }

    #[test]
    fn test_fallback_path_emits_same_span_shape() {
        let mut s = MemorySurface::from_markup("<p>ab<b>cd</b>ef</p>");
        s.select_text(1, 3);
        let outcome = apply_inline_style(&mut s, &InlineStyle::FontSize("24px".into()));
        assert_eq!(outcome, StyleOutcome::Fallback);
        assert!(!s.content().contains("<font"));
        insta::assert_snapshot!(
            s.content(),
            @r#"<p>a<span style="font-size: 24px;">b</span><b><span style="font-size: 24px;">c</span>d</b>ef</p>"#
        );
    }

    #[test]
    fn test_fallback_leaves_existing_fonts_alone() {
        let mut s = MemorySurface::from_markup(
            r#"<p><font color="red" size="7">legacy</font> ab<b>cd</b>ef</p>"#,
        );
        s.select_text(8, 10);
        let outcome = apply_inline_style(&mut s, &InlineStyle::FontSize("12px".into()));
        assert_eq!(outcome, StyleOutcome::Fallback);
        insta::assert_snapshot!(
            s.content(),
            @r#"<p><font color="red" size="7">legacy</font> a<span style="font-size: 12px;">b</span><b><span style="font-size: 12px;">c</span>d</b>ef</p>"#
        );
    }

    #[test]
    fn test_collapsed_is_noop() {
        let mut s = MemorySurface::from_markup("<p>abc</p>");
        s.place_caret(1);
        let outcome = apply_inline_style(&mut s, &InlineStyle::FontFamily("Georgia".into()));
        assert_eq!(outcome, StyleOutcome::Collapsed);
        assert_eq!(s.content(), "<p>abc</p>");
    }

    #[test]
    fn test_value_sanitizing() {
        assert_eq!(InlineStyle::FontSize("18".into()).css(), "font-size: 18px;");
        assert_eq!(
            InlineStyle::Color("red\"; background: url(x)".into()).value(),
            "red background: url(x)"
        );
    }

    #[test]
    fn test_legacy_sizes() {
        assert_eq!(legacy_size_to_css("1"), "10px");
        assert_eq!(legacy_size_to_css("9"), "48px");
        assert_eq!(legacy_size_to_css("huge"), "16px");
    }
}
