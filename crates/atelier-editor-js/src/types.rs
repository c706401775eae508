//! Types exposed to JavaScript via wasm-bindgen.

use atelier_editor_core::{EditorUiState, MediaAsset, UploadOutcome};
use serde::{Deserialize, Serialize};
use tsify_next::Tsify;
use wasm_bindgen::prelude::*;

/// Toolbar state: the open popover and the last picked styles.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct JsUiState {
    /// Popover id, e.g. `"color"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub uploading_image: bool,
    pub uploading_attachment: bool,
}

impl JsUiState {
    pub fn new(state: &EditorUiState, uploading_image: bool, uploading_attachment: bool) -> Self {
        Self {
            open: state.open.map(|p| p.id().to_string()),
            font_family: state.font_family.clone(),
            font_size: state.font_size.clone(),
            color: state.color.clone(),
            uploading_image,
            uploading_attachment,
        }
    }
}

/// Result of `uploadFile`.
#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum JsUploadResult {
    /// The file was uploaded and inserted at the saved caret.
    Inserted { url: String, name: String, size: u64 },
    /// Another upload through the same control was still running.
    Ignored,
}

impl From<UploadOutcome> for JsUploadResult {
    fn from(outcome: UploadOutcome) -> Self {
        match outcome {
            UploadOutcome::Inserted(MediaAsset { url, name, size }) => {
                JsUploadResult::Inserted { url, name, size }
            }
            UploadOutcome::Ignored => JsUploadResult::Ignored,
        }
    }
}
