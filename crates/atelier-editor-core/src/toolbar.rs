//! Toolbar popover state.

use serde::{Deserialize, Serialize};

use crate::style::InlineStyle;

/// Pickers rendered outside the surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Popover {
    FontFamily,
    FontSize,
    Color,
    Emoji,
}

impl Popover {
    pub const ALL: [Popover; 4] = [
        Popover::FontFamily,
        Popover::FontSize,
        Popover::Color,
        Popover::Emoji,
    ];

    /// Value of the `data-atelier-popover` attribute on the picker container.
    pub fn id(self) -> &'static str {
        match self {
            Popover::FontFamily => "font-family",
            Popover::FontSize => "font-size",
            Popover::Color => "color",
            Popover::Emoji => "emoji",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Popover::ALL.into_iter().find(|p| p.id() == id)
    }
}

/// Which popover is open plus the last style chosen from each picker.
///
/// A value object: transitions return the next state. The recorded style is
/// for toolbar display only and is never applied to newly typed text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorUiState {
    pub open: Option<Popover>,
    pub font_family: Option<String>,
    pub font_size: Option<String>,
    pub color: Option<String>,
}

impl EditorUiState {
    pub fn is_open(&self, popover: Popover) -> bool {
        self.open == Some(popover)
    }

    /// Open `popover`, closing any other.
    pub fn open(self, popover: Popover) -> Self {
        Self {
            open: Some(popover),
            ..self
        }
    }

    pub fn toggle(self, popover: Popover) -> Self {
        if self.is_open(popover) {
            self.close_all()
        } else {
            self.open(popover)
        }
    }

    pub fn close_all(self) -> Self {
        Self { open: None, ..self }
    }

    /// A document click. `inside` is the popover containing the target, if any.
    pub fn on_click(self, inside: Option<Popover>) -> Self {
        match inside {
            Some(_) => self,
            None => self.close_all(),
        }
    }

    /// Record a style applied from a picker.
    pub fn with_style(self, style: &InlineStyle) -> Self {
        match style {
            InlineStyle::Color(v) => Self {
                color: Some(v.clone()),
                ..self
            },
            InlineStyle::FontFamily(v) => Self {
                font_family: Some(v.clone()),
                ..self
            },
            InlineStyle::FontSize(v) => Self {
                font_size: Some(v.clone()),
                ..self
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_one_popover_open() {
        let state = EditorUiState::default()
            .open(Popover::FontSize)
            .open(Popover::Color);
        assert!(state.is_open(Popover::Color));
        assert!(!state.is_open(Popover::FontSize));
    }

    #[test]
    fn test_outside_click_closes() {
        let state = EditorUiState::default().open(Popover::Color);
        let state = state.on_click(Some(Popover::Color));
        assert!(state.is_open(Popover::Color));
        let state = state.on_click(None);
        assert_eq!(state.open, None);
    }

    #[test]
    fn test_toggle_and_style_record() {
        let state = EditorUiState::default()
            .toggle(Popover::Emoji)
            .toggle(Popover::Emoji)
            .with_style(&InlineStyle::FontSize("18px".into()));
        assert_eq!(state.open, None);
        assert_eq!(state.font_size.as_deref(), Some("18px"));
        assert_eq!(Popover::from_id("font-family"), Some(Popover::FontFamily));
    }
}
