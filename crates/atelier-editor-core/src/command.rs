//! Formatting commands and their execution against a surface.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::markup::{escape_text, escape_url};
use crate::selection::SelectionTracker;
use crate::style::{InlineStyle, apply_inline_style};
use crate::surface::{EditableSurface, NativeCommand};

/// URL schemes never inserted as link targets.
const BLOCKED_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:"];

/// A discrete operation on the current selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Command {
    Bold,
    Italic,
    Underline,
    AlignLeft,
    AlignCenter,
    AlignRight,
    BulletList,
    NumberedList,
    /// `url` is whatever the link prompt returned; `None` means it was dismissed.
    InsertLink {
        #[serde(default)]
        url: Option<String>,
    },
    InsertHtml {
        html: String,
    },
    Color {
        value: String,
    },
    FontFamily {
        value: String,
    },
    FontSize {
        value: String,
    },
    Emoji {
        emoji: String,
    },
}

impl Command {
    /// The inline style this command applies, for the span-wrapping path.
    pub fn inline_style(&self) -> Option<InlineStyle> {
        match self {
            Command::Color { value } => Some(InlineStyle::Color(value.clone())),
            Command::FontFamily { value } => Some(InlineStyle::FontFamily(value.clone())),
            Command::FontSize { value } => Some(InlineStyle::FontSize(value.clone())),
            _ => None,
        }
    }

    fn native(&self) -> Option<NativeCommand<'static>> {
        Some(match self {
            Command::Bold => NativeCommand::Bold,
            Command::Italic => NativeCommand::Italic,
            Command::Underline => NativeCommand::Underline,
            Command::AlignLeft => NativeCommand::JustifyLeft,
            Command::AlignCenter => NativeCommand::JustifyCenter,
            Command::AlignRight => NativeCommand::JustifyRight,
            Command::BulletList => NativeCommand::InsertUnorderedList,
            Command::NumberedList => NativeCommand::InsertOrderedList,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Bold => "bold",
            Command::Italic => "italic",
            Command::Underline => "underline",
            Command::AlignLeft => "align-left",
            Command::AlignCenter => "align-center",
            Command::AlignRight => "align-right",
            Command::BulletList => "bullet-list",
            Command::NumberedList => "numbered-list",
            Command::InsertLink { .. } => "insert-link",
            Command::InsertHtml { .. } => "insert-html",
            Command::Color { .. } => "color",
            Command::FontFamily { .. } => "font-family",
            Command::FontSize { .. } => "font-size",
            Command::Emoji { .. } => "emoji",
        }
    }
}

/// Map a Ctrl/Cmd key chord to its command.
pub fn shortcut_command(key: &str, primary_modifier: bool) -> Option<Command> {
    if !primary_modifier {
        return None;
    }
    match key.to_ascii_lowercase().as_str() {
        "b" => Some(Command::Bold),
        "i" => Some(Command::Italic),
        "u" => Some(Command::Underline),
        _ => None,
    }
}

/// Trimmed URL, or `None` if it is empty or uses a blocked scheme.
pub fn sanitize_link_url(url: &str) -> Option<&str> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    let lower = url.to_ascii_lowercase();
    if BLOCKED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return None;
    }
    Some(url)
}

/// Anchor markup opening `url` in a new browsing context.
pub fn link_markup(url: &str, label: &str) -> String {
    format!(
        "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
        escape_url(url),
        escape_text(label)
    )
}

/// Restore the saved selection, run `command`, and re-focus the surface.
///
/// Returns whether the document may have changed. A stale snapshot is not an
/// error: the command then applies at the surface's default caret.
pub fn apply_command<S: EditableSurface>(
    surface: &mut S,
    tracker: &mut SelectionTracker<S::Range>,
    command: &Command,
) -> bool {
    if !tracker.restore(surface) {
        surface.focus();
    }
    trace!(target: "atelier::command", command = command.name(), "applying");

    let applied = match command {
        Command::InsertLink { url } => insert_link(surface, url.as_deref()),
        Command::InsertHtml { html } => run_native(surface, NativeCommand::InsertHtml(html)),
        Command::Emoji { emoji } => run_native(surface, NativeCommand::InsertText(emoji)),
        Command::Color { .. } | Command::FontFamily { .. } | Command::FontSize { .. } => {
            match command.inline_style() {
                Some(style) => apply_inline_style(surface, &style).changed(),
                None => false,
            }
        }
        _ => match command.native() {
            Some(native) => run_native(surface, native),
            None => false,
        },
    };

    surface.focus();
    applied
}

fn run_native<S: EditableSurface>(surface: &mut S, native: NativeCommand<'_>) -> bool {
    match surface.exec_native(native) {
        Ok(()) => true,
        Err(err) => {
            debug!(target: "atelier::command", command = native.name(), %err, "native command failed");
            false
        }
    }
}

fn insert_link<S: EditableSurface>(surface: &mut S, url: Option<&str>) -> bool {
    let Some(url) = url.and_then(sanitize_link_url) else {
        debug!(target: "atelier::command", "no usable link url, nothing inserted");
        return false;
    };
    let selected = surface.selected_text();
    let label = if selected.trim().is_empty() {
        url
    } else {
        selected.as_str()
    };
    run_native(surface, NativeCommand::InsertHtml(&link_markup(url, label)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySurface;

    fn run(surface: &mut MemorySurface, command: Command) -> bool {
        let mut tracker = SelectionTracker::new();
        tracker.save(surface);
        surface.blur();
        apply_command(surface, &mut tracker, &command)
    }

    #[test]
    fn test_command_wire_format() {
        let cmd: Command = serde_json::from_str(r#"{"type":"align-center"}"#).unwrap();
        assert_eq!(cmd, Command::AlignCenter);
        let cmd: Command =
            serde_json::from_str(r##"{"type":"color","value":"#333333"}"##).unwrap();
        assert_eq!(
            cmd,
            Command::Color {
                value: "#333333".into()
            }
        );
        let cmd: Command = serde_json::from_str(r#"{"type":"insert-link"}"#).unwrap();
        assert_eq!(cmd, Command::InsertLink { url: None });
        assert_eq!(
            serde_json::to_string(&Command::NumberedList).unwrap(),
            r#"{"type":"numbered-list"}"#
        );
    }

    #[test]
    fn test_restores_selection_before_applying() {
        let mut s = MemorySurface::from_markup("<p>one two</p>");
        s.select_substring("two");
        assert!(run(&mut s, Command::Underline));
        assert_eq!(s.content(), "<p>one <u>two</u></p>");
        assert!(s.is_focused());
    }

    #[test]
    fn test_sequential_commands_accumulate() {
        let mut s = MemorySurface::from_markup("<p>one two</p>");
        let mut tracker = SelectionTracker::new();
        s.select_substring("two");
        tracker.save(&s);
        apply_command(&mut s, &mut tracker, &Command::Bold);
        tracker.save(&s);
        apply_command(&mut s, &mut tracker, &Command::Italic);
        tracker.save(&s);
        apply_command(&mut s, &mut tracker, &Command::AlignCenter);
        s.select_substring("one");
        tracker.save(&s);
        apply_command(&mut s, &mut tracker, &Command::Underline);
        insta::assert_snapshot!(
            s.content(),
            @r#"<p style="text-align: center;"><u>one</u> <b><i>two</i></b></p>"#
        );
    }

    #[test]
    fn test_sequential_commands_from_document_start() {
        let mut s = MemorySurface::from_markup("<p>one two</p>");
        let mut tracker = SelectionTracker::new();
        s.select_substring("one");
        tracker.save(&s);
        apply_command(&mut s, &mut tracker, &Command::Bold);
        tracker.save(&s);
        apply_command(&mut s, &mut tracker, &Command::Underline);
        tracker.save(&s);
        apply_command(&mut s, &mut tracker, &Command::AlignRight);
        insta::assert_snapshot!(
            s.content(),
            @r#"<p style="text-align: right;"><b><u>one</u></b> two</p>"#
        );
    }

    #[test]
    fn test_link_uses_selection_as_label() {
        let mut s = MemorySurface::from_markup("<p>see docs</p>");
        s.select_substring("docs");
        let applied = run(
            &mut s,
            Command::InsertLink {
                url: Some("https://example.com/a?b=1&c=2".into()),
            },
        );
        assert!(applied);
        insta::assert_snapshot!(
            s.content(),
            @r#"<p>see <a href="https://example.com/a?b=1&amp;c=2" target="_blank" rel="noopener noreferrer">docs</a></p>"#
        );
    }

    #[test]
    fn test_link_without_selection_uses_url() {
        let mut s = MemorySurface::from_markup("<p>x</p>");
        s.place_caret(1);
        run(
            &mut s,
            Command::InsertLink {
                url: Some("https://a.example".into()),
            },
        );
        assert_eq!(
            s.content(),
            "<p>x<a href=\"https://a.example\" target=\"_blank\" rel=\"noopener noreferrer\">https://a.example</a></p>"
        );
    }

    #[test]
    fn test_link_prompt_dismissed_inserts_nothing() {
        let mut s = MemorySurface::from_markup("<p>x</p>");
        s.select_substring("x");
        assert!(!run(&mut s, Command::InsertLink { url: None }));
        assert!(!run(
            &mut s,
            Command::InsertLink {
                url: Some("   ".into())
            }
        ));
        assert!(!run(
            &mut s,
            Command::InsertLink {
                url: Some("JavaScript:alert(1)".into())
            }
        ));
        assert_eq!(s.content(), "<p>x</p>");
    }

    #[test]
    fn test_stale_snapshot_applies_at_default_caret() {
        let mut s = MemorySurface::from_markup("<p>abc</p>");
        let mut tracker = SelectionTracker::new();
        s.select_text(1, 2);
        tracker.save(&s);
        s.set_content("<p>abc</p>");
        let applied = apply_command(
            &mut s,
            &mut tracker,
            &Command::Emoji {
                emoji: "😀".into(),
            },
        );
        assert!(applied);
        assert_eq!(s.content(), "<p>😀abc</p>");
    }

    #[test]
    fn test_emoji_replaces_selection() {
        let mut s = MemorySurface::from_markup("<p>I am happy</p>");
        s.select_substring("happy");
        run(&mut s, Command::Emoji { emoji: "🙂".into() });
        assert_eq!(s.content(), "<p>I am 🙂</p>");
    }

    #[test]
    fn test_shortcuts() {
        assert_eq!(shortcut_command("B", true), Some(Command::Bold));
        assert_eq!(shortcut_command("u", true), Some(Command::Underline));
        assert_eq!(shortcut_command("b", false), None);
        assert_eq!(shortcut_command("k", true), None);
    }
}
