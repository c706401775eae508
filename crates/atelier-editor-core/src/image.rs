//! Selection and resizing of images inside the surface.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ImageSizing;
use crate::error::SurfaceError;
use crate::surface::EditableSurface;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResizeDirection {
    Grow,
    Shrink,
}

/// Tracks the one image currently active for resizing.
///
/// The handle is weak: every operation first checks the surface still
/// contains it and drops the selection if not.
#[derive(Debug)]
pub struct ImageController<N> {
    selected: Option<N>,
    sizing: ImageSizing,
}

impl<N: Clone + PartialEq> ImageController<N> {
    pub fn new(sizing: ImageSizing) -> Self {
        Self {
            selected: None,
            sizing,
        }
    }

    pub fn selected(&self) -> Option<&N> {
        self.selected.as_ref()
    }

    /// Handle a click inside the surface. `target` is the clicked element,
    /// if any. Returns whether the selection changed.
    pub fn click<S>(&mut self, surface: &mut S, target: Option<&N>) -> bool
    where
        S: EditableSurface<Node = N>,
    {
        let next = target
            .filter(|node| surface.is_image(node))
            .cloned();
        if next == self.selected {
            return false;
        }
        if let Some(previous) = self.selected.take() {
            surface.set_selected_marker(&previous, false);
        }
        if let Some(node) = &next {
            surface.set_selected_marker(node, true);
            debug!(target: "atelier::image", "image selected");
        }
        self.selected = next;
        true
    }

    /// Forget the selection, removing its marker.
    pub fn clear<S>(&mut self, surface: &mut S)
    where
        S: EditableSurface<Node = N>,
    {
        if let Some(previous) = self.selected.take() {
            surface.set_selected_marker(&previous, false);
        }
    }

    /// The selected node if it is still in the document.
    fn live<S>(&mut self, surface: &S) -> Option<N>
    where
        S: EditableSurface<Node = N>,
    {
        match &self.selected {
            Some(node) if surface.contains(node) => Some(node.clone()),
            Some(_) => {
                debug!(target: "atelier::image", "selected image left the document");
                self.selected = None;
                None
            }
            None => None,
        }
    }

    /// Scale the selected image's rendered width. Returns the new width, or
    /// `None` when no image is selected.
    pub fn resize<S>(&mut self, surface: &mut S, direction: ResizeDirection) -> Result<Option<f64>, SurfaceError>
    where
        S: EditableSurface<Node = N>,
    {
        let Some(node) = self.live(surface) else {
            return Ok(None);
        };
        let current = surface.rendered_width(&node).ok_or(SurfaceError::NodeGone)?;
        let width = self.sizing.next_width(current, direction);
        surface.set_width(&node, Some(width))?;
        debug!(target: "atelier::image", current, width, "image resized");
        Ok(Some(width))
    }

    /// Return the selected image to its intrinsic size. Returns whether an
    /// image was selected.
    pub fn reset_size<S>(&mut self, surface: &mut S) -> Result<bool, SurfaceError>
    where
        S: EditableSurface<Node = N>,
    {
        let Some(node) = self.live(surface) else {
            return Ok(false);
        };
        surface.set_width(&node, None)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySurface;

    fn two_images() -> MemorySurface {
        MemorySurface::from_markup(
            "<p><img src=\"a.png\" style=\"width: 700px;\"><img src=\"b.png\" style=\"width: 60px;\">text</p>",
        )
    }

    #[test]
    fn test_selection_is_exclusive() {
        let mut s = two_images();
        let mut images = ImageController::new(ImageSizing::default());
        let [a, b] = [s.images()[0], s.images()[1]];

        assert!(images.click(&mut s, Some(&a)));
        assert!(s.is_marked(a));
        images.click(&mut s, Some(&b));
        assert!(!s.is_marked(a));
        assert!(s.is_marked(b));
        assert_eq!(images.selected(), Some(&b));

        let p = s.tree().parent(a).unwrap();
        images.click(&mut s, Some(&p));
        assert!(!s.is_marked(a));
        assert!(!s.is_marked(b));
        assert_eq!(images.selected(), None);
    }

    #[test]
    fn test_grow_clamps_at_max() {
        let mut s = two_images();
        let mut images = ImageController::new(ImageSizing::default());
        let a = s.images()[0];
        images.click(&mut s, Some(&a));
        let mut widths = Vec::new();
        for _ in 0..3 {
            widths.push(images.resize(&mut s, ResizeDirection::Grow).unwrap().unwrap());
        }
        assert_eq!(widths, vec![800.0, 800.0, 800.0]);
        assert_eq!(s.rendered_width(&a), Some(800.0));
    }

    #[test]
    fn test_shrink_clamps_at_min() {
        let mut s = two_images();
        let mut images = ImageController::new(ImageSizing::default());
        let b = s.images()[1];
        images.click(&mut s, Some(&b));
        assert_eq!(images.resize(&mut s, ResizeDirection::Shrink).unwrap(), Some(50.0));
        assert_eq!(images.resize(&mut s, ResizeDirection::Shrink).unwrap(), Some(50.0));
    }

    #[test]
    fn test_reset_clears_explicit_size() {
        let mut s = two_images();
        let mut images = ImageController::new(ImageSizing::default());
        let a = s.images()[0];
        images.click(&mut s, Some(&a));
        assert!(images.reset_size(&mut s).unwrap());
        assert!(s.content().starts_with("<p><img src=\"a.png\"><img"));
    }

    #[test]
    fn test_resize_without_selection_is_noop() {
        let mut s = two_images();
        let before = s.content();
        let mut images = ImageController::new(ImageSizing::default());
        assert_eq!(images.resize(&mut s, ResizeDirection::Grow).unwrap(), None);
        assert_eq!(s.content(), before);
    }

    #[test]
    fn test_removed_image_drops_selection() {
        let mut s = two_images();
        let mut images = ImageController::new(ImageSizing::default());
        let a = s.images()[0];
        images.click(&mut s, Some(&a));
        s.set_content("<p>gone</p>");
        assert_eq!(images.resize(&mut s, ResizeDirection::Grow).unwrap(), None);
        assert_eq!(images.selected(), None);
    }
}
