//! Browser DOM layer for the atelier editor.
//!
//! This crate provides the `contenteditable` implementation of
//! `EditableSurface` and scoped browser event wiring. It assumes a
//! `wasm32-unknown-unknown` target environment.
//!
//! # Architecture
//!
//! - `surface`: `DomSurface`, Selection/Range handling and `execCommand`
//! - `events`: composition, input, click and keydown listeners plus the
//!   document-level outside-click listener, torn down on drop
//! - `upload`: `File` reading, endpoint resolution, the link prompt
//!
//! Popover containers and the buttons that toggle them must carry
//! `data-atelier-popover="<id>"` so presses inside them are not treated as
//! outside clicks.
//!
//! # Re-exports
//!
//! This crate re-exports `atelier-editor-core` for convenience, so consumers
//! only need to depend on `atelier-editor-browser`.

// Re-export core crate
pub use atelier_editor_core;
pub use atelier_editor_core::*;

pub mod events;
pub mod surface;
pub mod upload;

pub use events::{EditorEventSink, EditorSubscriptions, POPOVER_ATTR, popover_for_target};
pub use surface::DomSurface;
pub use upload::{prompt_link_url, read_file, resolve_endpoint};
