//! atelier-editor-core: framework-free rich text editing engine.
//!
//! This crate provides:
//! - `EditableSurface` trait over a live editable tree
//! - `MemorySurface` - headless surface backed by `MarkupTree`
//! - `Editor<S>` - selection, commands, image sizing, composition and upload
//!   coordination, all generic over the surface

pub mod command;
pub mod composition;
pub mod config;
pub mod editor;
pub mod error;
pub mod image;
pub mod markup;
pub mod media;
pub mod memory;
pub mod selection;
pub mod style;
pub mod surface;
pub mod toolbar;

pub use command::{Command, apply_command, link_markup, sanitize_link_url, shortcut_command};
pub use composition::{CompositionGuard, InputDisposition};
pub use config::{EditorConfig, ImageSizing, UploadConfig};
pub use editor::{Editor, upload_and_insert};
pub use error::{ByteSize, SurfaceError, UploadError, ValidationError};
pub use image::{ImageController, ResizeDirection};
pub use markup::{Element, MarkupTree, NodeId};
pub use media::{
    HttpUploader, MediaAsset, MediaFile, MediaKind, UploadOutcome, UploadTicket, Uploader,
    parse_upload_response, validate, validate_meta,
};
pub use memory::{Boundary, MemoryRange, MemorySurface};
pub use selection::SelectionTracker;
pub use smol_str::SmolStr;
pub use style::{InlineStyle, StyleOutcome, apply_inline_style};
pub use surface::{EditableSurface, NativeCommand, SELECTED_IMAGE_ATTR};
pub use toolbar::{EditorUiState, Popover};
