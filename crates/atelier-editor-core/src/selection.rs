//! Selection snapshots that survive focus-stealing UI.

use tracing::debug;

use crate::surface::EditableSurface;

/// Holds at most one saved range for a surface.
///
/// A snapshot is single-use: [`restore`](Self::restore) consumes it whether
/// or not it could be applied.
#[derive(Debug)]
pub struct SelectionTracker<R> {
    saved: Option<R>,
}

impl<R> Default for SelectionTracker<R> {
    fn default() -> Self {
        Self { saved: None }
    }
}

impl<R: Clone> SelectionTracker<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the surface's active range. Without one this is a no-op and
    /// any earlier snapshot is kept.
    pub fn save<S>(&mut self, surface: &S)
    where
        S: EditableSurface<Range = R>,
    {
        if let Some(range) = surface.current_range() {
            self.saved = Some(range);
        }
    }

    /// Re-apply and discard the saved range. Returns whether a range was applied.
    pub fn restore<S>(&mut self, surface: &mut S) -> bool
    where
        S: EditableSurface<Range = R>,
    {
        let Some(range) = self.saved.take() else {
            return false;
        };
        match surface.restore_range(&range) {
            Ok(()) => true,
            Err(err) => {
                debug!(target: "atelier::selection", %err, "selection restore missed");
                false
            }
        }
    }

    /// Remove and return the snapshot without applying it.
    pub fn take(&mut self) -> Option<R> {
        self.saved.take()
    }

    pub fn has_snapshot(&self) -> bool {
        self.saved.is_some()
    }

    pub fn clear(&mut self) {
        self.saved = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySurface;

    #[test]
    fn test_save_and_restore_across_blur() {
        let mut surface = MemorySurface::from_markup("<p>hello world</p>");
        let mut tracker = SelectionTracker::new();
        surface.select_substring("world");
        tracker.save(&surface);
        surface.blur();
        assert!(surface.current_range().is_none());

        assert!(tracker.restore(&mut surface));
        assert_eq!(surface.selected_text(), "world");
        assert!(!tracker.has_snapshot());
    }

    #[test]
    fn test_save_without_selection_is_noop() {
        let mut surface = MemorySurface::from_markup("<p>x</p>");
        let mut tracker = SelectionTracker::new();
        tracker.save(&surface);
        assert!(!tracker.has_snapshot());
        assert!(!tracker.restore(&mut surface));
    }

    #[test]
    fn test_stale_snapshot_is_dropped_silently() {
        let mut surface = MemorySurface::from_markup("<p>abc</p>");
        let mut tracker = SelectionTracker::new();
        surface.select_text(0, 2);
        tracker.save(&surface);
        surface.set_content("<p>other</p>");
        assert!(!tracker.restore(&mut surface));
        assert!(!tracker.has_snapshot());
        assert_eq!(surface.content(), "<p>other</p>");
    }
}
