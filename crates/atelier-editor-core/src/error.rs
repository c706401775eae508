//! Error types for the editing engine.
//!
//! Two families live here. [`UploadError`] covers everything the user must be
//! told about (bad file, failed upload); its `Display` output is the message
//! shown in the UI. [`SurfaceError`] covers failures the engine recovers from
//! locally (a stale selection, a range that cannot be wrapped) and is only
//! ever logged.

use std::fmt;

use miette::Diagnostic;

/// Byte count rendered for humans (`5 MB`, `612 KB`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ByteSize(pub u64);

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        let bytes = self.0;
        if bytes >= MB {
            let whole = bytes / MB;
            let tenths = (bytes % MB) * 10 / MB;
            if tenths == 0 {
                write!(f, "{} MB", whole)
            } else {
                write!(f, "{}.{} MB", whole, tenths)
            }
        } else if bytes >= KB {
            write!(f, "{} KB", bytes / KB)
        } else {
            write!(f, "{} B", bytes)
        }
    }
}

/// A file was rejected before any network call was made.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ValidationError {
    /// The image control only accepts `image/*` files.
    #[error("\"{name}\" is not an image. Only image files can be inserted here.")]
    #[diagnostic(code(atelier::upload::not_an_image))]
    NotAnImage { name: String, mime_type: String },

    /// The file is over the size limit for its control.
    #[error("\"{name}\" is {size}, which exceeds the {limit} limit.")]
    #[diagnostic(
        code(atelier::upload::too_large),
        help("compress the file or choose a smaller one")
    )]
    TooLarge {
        name: String,
        size: ByteSize,
        limit: ByteSize,
    },
}

/// Upload failures, each with a distinct user-facing message.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum UploadError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    /// The request never produced a response.
    #[error("The upload could not reach the server. Check your connection and try again.")]
    #[diagnostic(code(atelier::upload::transport))]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("The server rejected the upload (HTTP {0}).")]
    #[diagnostic(code(atelier::upload::status))]
    Status(u16),

    /// A success status whose body did not carry a usable URL.
    #[error("The server accepted the upload but did not return a file address.")]
    #[diagnostic(code(atelier::upload::response))]
    Response(String),

    /// The file was stored but the surface refused the inserted markup.
    #[error("The file was uploaded but could not be inserted into the document.")]
    #[diagnostic(code(atelier::upload::insert))]
    Insert(String),
}

impl UploadError {
    /// Underlying detail for logs; the `Display` text is for users.
    pub fn detail(&self) -> Option<&str> {
        match self {
            UploadError::Transport(detail) | UploadError::Response(detail) | UploadError::Insert(detail) => {
                Some(detail)
            }
            UploadError::Validation(_) | UploadError::Status(_) => None,
        }
    }
}

/// Recoverable failures reported by an [`EditableSurface`](crate::EditableSurface).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum SurfaceError {
    /// A saved range points at nodes that are no longer in the document.
    #[error("saved selection no longer exists in the document")]
    #[diagnostic(code(atelier::surface::restore_miss))]
    RestoreMiss,

    /// The range partially selects an element and cannot be wrapped whole.
    #[error("range crosses an element boundary and cannot be wrapped")]
    #[diagnostic(code(atelier::surface::wrap_rejected))]
    WrapRejected,

    /// A node handle outlived its element.
    #[error("node is no longer attached to the document")]
    #[diagnostic(code(atelier::surface::node_gone))]
    NodeGone,

    /// There is no caret or range to act on.
    #[error("no selection in the editor")]
    #[diagnostic(code(atelier::surface::no_selection))]
    NoSelection,

    /// Anything the host platform threw.
    #[error("platform error: {0}")]
    #[diagnostic(code(atelier::surface::platform))]
    Platform(String),
}

impl From<&str> for SurfaceError {
    fn from(s: &str) -> Self {
        SurfaceError::Platform(s.to_string())
    }
}

impl From<String> for SurfaceError {
    fn from(s: String) -> Self {
        SurfaceError::Platform(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_size_display() {
        assert_eq!(ByteSize(512).to_string(), "512 B");
        assert_eq!(ByteSize(2048).to_string(), "2 KB");
        assert_eq!(ByteSize(5 * 1024 * 1024).to_string(), "5 MB");
        assert_eq!(ByteSize(6 * 1024 * 1024 + 512 * 1024).to_string(), "6.5 MB");
    }

    #[test]
    fn test_upload_messages_are_distinct() {
        let messages = [
            UploadError::from(ValidationError::NotAnImage {
                name: "a.txt".into(),
                mime_type: "text/plain".into(),
            })
            .to_string(),
            UploadError::Transport("dns".into()).to_string(),
            UploadError::Status(502).to_string(),
            UploadError::Response("missing url".into()).to_string(),
            UploadError::Insert("node detached".into()).to_string(),
        ];
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_too_large_message() {
        let err = ValidationError::TooLarge {
            name: "photo.jpg".into(),
            size: ByteSize(6 * 1024 * 1024),
            limit: ByteSize(5 * 1024 * 1024),
        };
        assert_eq!(
            err.to_string(),
            "\"photo.jpg\" is 6 MB, which exceeds the 5 MB limit."
        );
    }
}
