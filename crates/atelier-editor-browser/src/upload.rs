//! Browser-side helpers for the upload path: reading picked files, resolving
//! the endpoint, and the link prompt.

use atelier_editor_core::{MediaFile, SurfaceError};
use js_sys::Uint8Array;
use wasm_bindgen_futures::JsFuture;

/// Read a picked `File` into memory.
pub async fn read_file(file: &web_sys::File) -> Result<MediaFile, SurfaceError> {
    let buffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(|e| format!("reading {} failed: {:?}", file.name(), e))?;
    let data = Uint8Array::new(&buffer).to_vec();
    Ok(MediaFile::new(file.name(), file.type_(), data))
}

/// Resolve a possibly relative endpoint against the page URL.
pub fn resolve_endpoint(endpoint: &str) -> Result<String, SurfaceError> {
    let base = gloo_utils::window()
        .location()
        .href()
        .map_err(|e| format!("location.href failed: {:?}", e))?;
    let url = web_sys::Url::new_with_base(endpoint, &base)
        .map_err(|e| format!("invalid upload endpoint {}: {:?}", endpoint, e))?;
    Ok(url.href())
}

/// Default text in the link prompt; submitting it unchanged counts as no URL.
const LINK_PROMPT_DEFAULT: &str = "https://";

/// Ask for a link URL with a blocking prompt. `None` if dismissed or left empty.
pub fn prompt_link_url(message: &str) -> Option<String> {
    let answer = gloo_utils::window()
        .prompt_with_message_and_default(message, LINK_PROMPT_DEFAULT)
        .ok()
        .flatten()?;
    let answer = answer.trim();
    if answer.is_empty() || answer == LINK_PROMPT_DEFAULT {
        return None;
    }
    Some(answer.to_string())
}
