//! Editor configuration.
//!
//! Every field has a default, so hosts only pass what they change:
//!
//! ```json
//! { "upload": { "endpoint": "/admin/api/upload" }, "image": { "maxWidth": 640 } }
//! ```

use serde::{Deserialize, Serialize};

use crate::image::ResizeDirection;

const MIB: u64 = 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub upload: UploadConfig,
    pub image: ImageSizing,
    pub font_families: Vec<String>,
    pub font_sizes: Vec<String>,
    pub colors: Vec<String>,
    pub emojis: Vec<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            upload: UploadConfig::default(),
            image: ImageSizing::default(),
            font_families: to_strings(&[
                "Arial",
                "Georgia",
                "Times New Roman",
                "Courier New",
                "Noto Sans KR",
                "Nanum Gothic",
            ]),
            font_sizes: to_strings(&["12px", "14px", "16px", "18px", "24px", "32px"]),
            colors: to_strings(&[
                "#000000", "#333333", "#666666", "#999999", "#e53935", "#fb8c00", "#fdd835",
                "#43a047", "#1e88e5", "#3949ab", "#8e24aa", "#ffffff",
            ]),
            emojis: to_strings(&[
                "😀", "😂", "😊", "😍", "🤔", "😢", "👍", "👏", "🙏", "🎉", "❤️", "✅", "⭐", "🔥",
                "📌", "📎",
            ]),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Upload endpoint and per-kind limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadConfig {
    pub endpoint: String,
    pub image_folder: String,
    pub attachment_folder: String,
    pub max_image_bytes: u64,
    pub max_attachment_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: "/api/upload".to_string(),
            image_folder: "editor/images".to_string(),
            attachment_folder: "editor/files".to_string(),
            max_image_bytes: 5 * MIB,
            max_attachment_bytes: 10 * MIB,
        }
    }
}

/// Resize steps and bounds for inserted images, in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageSizing {
    pub min_width: f64,
    pub max_width: f64,
    pub grow_factor: f64,
    pub shrink_factor: f64,
}

impl Default for ImageSizing {
    fn default() -> Self {
        Self {
            min_width: 50.0,
            max_width: 800.0,
            grow_factor: 1.2,
            shrink_factor: 0.8,
        }
    }
}

impl ImageSizing {
    /// Width after one resize step, rounded to whole pixels and clamped.
    pub fn next_width(&self, current: f64, direction: ResizeDirection) -> f64 {
        let factor = match direction {
            ResizeDirection::Grow => self.grow_factor,
            ResizeDirection::Shrink => self.shrink_factor,
        };
        let (lo, hi) = if self.min_width <= self.max_width {
            (self.min_width, self.max_width)
        } else {
            (self.max_width, self.min_width)
        };
        (current * factor).round().clamp(lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            EditorConfig::from_json(r#"{"upload":{"endpoint":"/x"},"image":{"maxWidth":640}}"#)
                .unwrap();
        assert_eq!(config.upload.endpoint, "/x");
        assert_eq!(config.upload.max_image_bytes, 5 * MIB);
        assert_eq!(config.upload.max_attachment_bytes, 10 * MIB);
        assert_eq!(config.image.max_width, 640.0);
        assert_eq!(config.image.min_width, 50.0);
        assert!(!config.font_families.is_empty());
    }

    #[test]
    fn test_next_width() {
        let sizing = ImageSizing::default();
        assert_eq!(sizing.next_width(700.0, ResizeDirection::Grow), 800.0);
        assert_eq!(sizing.next_width(500.0, ResizeDirection::Grow), 600.0);
        assert_eq!(sizing.next_width(60.0, ResizeDirection::Shrink), 50.0);
        assert_eq!(sizing.next_width(301.0, ResizeDirection::Shrink), 241.0);
    }
}
