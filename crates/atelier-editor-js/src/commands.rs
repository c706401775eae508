//! Command conversion for JavaScript.

use atelier_editor_core::{Command, MediaKind, Popover};
use serde::{Deserialize, Serialize};
use tsify_next::Tsify;
use wasm_bindgen::prelude::*;

/// JavaScript-friendly editor command.
///
/// Mirrors `Command` from core. `insertLink` without a `url` asks the user
/// with the browser prompt.
#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum JsEditorCommand {
    Bold,
    Italic,
    Underline,
    AlignLeft,
    AlignCenter,
    AlignRight,
    BulletList,
    NumberedList,
    InsertLink {
        #[serde(default)]
        url: Option<String>,
    },
    InsertHtml { html: String },
    Color { value: String },
    FontFamily { value: String },
    FontSize { value: String },
    Emoji { emoji: String },
}

impl JsEditorCommand {
    /// True when the command needs the link prompt before it can run.
    pub fn needs_prompt(&self) -> bool {
        matches!(self, Self::InsertLink { url: None })
    }

    /// Convert to a core command. `prompted` fills in a missing link url.
    pub fn to_command(&self, prompted: Option<String>) -> Command {
        match self {
            Self::Bold => Command::Bold,
            Self::Italic => Command::Italic,
            Self::Underline => Command::Underline,
            Self::AlignLeft => Command::AlignLeft,
            Self::AlignCenter => Command::AlignCenter,
            Self::AlignRight => Command::AlignRight,
            Self::BulletList => Command::BulletList,
            Self::NumberedList => Command::NumberedList,
            Self::InsertLink { url } => Command::InsertLink {
                url: url.clone().or(prompted),
            },
            Self::InsertHtml { html } => Command::InsertHtml { html: html.clone() },
            Self::Color { value } => Command::Color {
                value: value.clone(),
            },
            Self::FontFamily { value } => Command::FontFamily {
                value: value.clone(),
            },
            Self::FontSize { value } => Command::FontSize {
                value: value.clone(),
            },
            Self::Emoji { emoji } => Command::Emoji {
                emoji: emoji.clone(),
            },
        }
    }
}

/// Parse a JsValue into JsEditorCommand.
pub fn parse_command(value: JsValue) -> Result<JsEditorCommand, JsError> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsError::new(&format!("Invalid command: {}", e)))
}

/// Parse a popover id (`font-family`, `font-size`, `color`, `emoji`).
pub fn parse_popover(id: &str) -> Result<Popover, JsError> {
    Popover::from_id(id).ok_or_else(|| JsError::new(&format!("Unknown popover: {}", id)))
}

/// Parse an upload control kind (`image` or `attachment`).
pub fn parse_media_kind(kind: &str) -> Result<MediaKind, JsError> {
    match kind {
        "image" => Ok(MediaKind::Image),
        "attachment" => Ok(MediaKind::Attachment),
        other => Err(JsError::new(&format!("Unknown upload kind: {}", other))),
    }
}
