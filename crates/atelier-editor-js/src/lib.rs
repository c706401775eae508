//! WASM bindings for the atelier rich text editor.
//!
//! `JsEditor` mounts a contenteditable surface into a host element and
//! exposes commands, popover state, image sizing and uploads to
//! JavaScript/TypeScript back-office screens.

mod commands;
mod editor;
mod events;
mod types;

pub use commands::*;
pub use editor::*;
pub use types::*;

use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}
